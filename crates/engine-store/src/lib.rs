//! SQLite persistence for the process schedule.
//!
//! A checkpoint is the run's config plus the full ordered schedule snapshot.
//! Loads are tolerant: malformed rows are skipped with a warning and the
//! rest of the schedule still comes back.

use std::fmt;
use std::path::Path;

use contracts::{ScheduledProcessRecord, SimulationConfig};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

#[derive(Debug)]
pub struct SqliteScheduleStore {
    conn: Connection,
}

impl SqliteScheduleStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    fn configure(&self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(())
    }

    fn migrate(&self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT PRIMARY KEY,
                config_json TEXT NOT NULL,
                last_tick INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS process_schedule (
                run_id TEXT NOT NULL,
                template TEXT NOT NULL,
                owner TEXT NOT NULL DEFAULT '',
                next_fire_tick INTEGER NOT NULL,
                PRIMARY KEY (run_id, template, owner)
             );",
        )?;
        Ok(())
    }

    /// Persist one checkpoint: upsert the run row, rewrite its schedule.
    pub fn save_checkpoint(
        &mut self,
        config: &SimulationConfig,
        tick: u64,
        records: &[ScheduledProcessRecord],
    ) -> Result<(), PersistenceError> {
        let config_json = serde_json::to_string(config)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO runs (run_id, config_json, last_tick) VALUES (?1, ?2, ?3)
             ON CONFLICT(run_id) DO UPDATE SET
                config_json = excluded.config_json,
                last_tick = excluded.last_tick",
            params![
                config.run_id.as_str(),
                config_json,
                i64::try_from(tick).unwrap_or(i64::MAX)
            ],
        )?;
        tx.execute(
            "DELETE FROM process_schedule WHERE run_id = ?1",
            params![config.run_id.as_str()],
        )?;
        for record in records {
            tx.execute(
                "INSERT INTO process_schedule (run_id, template, owner, next_fire_tick)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    config.run_id.as_str(),
                    record.template.as_str(),
                    record.owner.as_deref().unwrap_or(""),
                    i64::try_from(record.next_fire_tick).unwrap_or(i64::MAX)
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// The run's config and last checkpointed tick. A malformed config row
    /// degrades to `None` with a warning rather than failing the load.
    pub fn load_run(
        &self,
        run_id: &str,
    ) -> Result<Option<(SimulationConfig, u64)>, PersistenceError> {
        let row = self
            .conn
            .query_row(
                "SELECT config_json, last_tick FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        let Some((config_json, last_tick)) = row else {
            return Ok(None);
        };
        match serde_json::from_str::<SimulationConfig>(&config_json) {
            Ok(config) => Ok(Some((config, last_tick.max(0) as u64))),
            Err(err) => {
                warn!(run_id, error = %err, "malformed run config, ignoring");
                Ok(None)
            }
        }
    }

    /// The persisted schedule in key order (template, then owner with global
    /// rows first), matching the engine's snapshot ordering. Malformed rows
    /// are skipped with a warning; the load never aborts.
    pub fn load_schedule(
        &self,
        run_id: &str,
    ) -> Result<Vec<ScheduledProcessRecord>, PersistenceError> {
        let mut statement = self.conn.prepare(
            "SELECT template, owner, next_fire_tick FROM process_schedule
             WHERE run_id = ?1 ORDER BY template, owner",
        )?;
        let rows = statement.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (template, owner, next_fire_tick) = match row {
                Ok(values) => values,
                Err(err) => {
                    warn!(run_id, error = %err, "skipping unreadable schedule row");
                    continue;
                }
            };
            if template.trim().is_empty() || next_fire_tick < 0 {
                warn!(
                    run_id,
                    template, next_fire_tick, "skipping malformed schedule row"
                );
                continue;
            }
            records.push(ScheduledProcessRecord {
                template,
                owner: if owner.is_empty() { None } else { Some(owner) },
                next_fire_tick: next_fire_tick as u64,
            });
        }
        Ok(records)
    }
}
