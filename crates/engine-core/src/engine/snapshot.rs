use contracts::ScheduledProcessRecord;
use tracing::warn;

use super::*;

impl ProcessEngine {
    /// The full schedule as ordered records (key order, so the sequence is
    /// canonical and round-trips exactly).
    pub fn snapshot(&self) -> Vec<ScheduledProcessRecord> {
        self.schedule
            .iter()
            .map(|(key, fire_tick)| ScheduledProcessRecord {
                template: key.template.clone(),
                owner: key.owner.clone(),
                next_fire_tick: *fire_tick,
            })
            .collect()
    }

    /// Re-seed the registry and schedule from persisted records.
    ///
    /// A record for a live key only overwrites that key's fire tick; anything
    /// else is registered fresh at the recorded tick (unknown templates take
    /// the usual fallback path). Malformed records are skipped with a
    /// warning; a restore never aborts. Returns how many records applied.
    pub fn restore(&mut self, records: &[ScheduledProcessRecord], now: u64) -> usize {
        let mut applied = 0;
        for record in records {
            if record.template.trim().is_empty() {
                warn!(
                    owner = record.owner.as_deref().unwrap_or(""),
                    "skipping malformed schedule record with blank template"
                );
                continue;
            }
            let key = record.key();
            if self.registry.contains_key(&key) {
                self.schedule.insert(key, record.next_fire_tick);
            } else {
                self.register_inner(
                    &record.template,
                    record.owner.as_deref(),
                    Some(record.next_fire_tick),
                    now,
                );
            }
            applied += 1;
        }
        self.refresh_next_wake();
        applied
    }
}
