use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;

use contracts::{EngineCommand, ProcessKey, SimulationConfig, TICKS_PER_DAY};
use engine_core::{EventRouter, NoContext, ProcessEngine, TemplateCatalog};
use engine_store::SqliteScheduleStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_ACTORS: [&str; 3] = ["actor:vela", "actor:brant", "actor:ines"];

fn print_usage() {
    println!("engine-cli <command>");
    println!("commands:");
    println!("  simulate <run_id> <seed> [ticks] [sqlite_path]");
    println!("    runs a fresh simulation to the target tick and checkpoints to sqlite");
    println!("  resume <run_id> [ticks] [sqlite_path]");
    println!("    reloads a persisted run and continues it to the target tick");
    println!("  inspect <run_id> [sqlite_path]");
    println!("    prints the run config and persisted schedule");
    println!();
    println!("default sqlite path: {} (override via NARRATIVE_SQLITE_PATH)", default_sqlite_path());
}

fn parse_u64(value: Option<&String>, label: &str) -> Result<u64, String> {
    let raw = value.ok_or_else(|| format!("missing {label}"))?;
    raw.parse::<u64>()
        .map_err(|_| format!("invalid {label}: {raw}"))
}

fn parse_ticks(value: Option<&String>) -> Result<u64, String> {
    value
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|_| format!("invalid ticks: {raw}"))
        })
        .transpose()
        .map(|ticks| ticks.unwrap_or(720))
}

fn default_sqlite_path() -> String {
    env::var("NARRATIVE_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "narrative_runs.sqlite".to_string())
}

fn parse_sqlite_path(value: Option<&String>) -> String {
    value
        .map(String::to_string)
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path)
}

/// Handlers for every label the default catalog can emit. Scandals spawn a
/// feud for the implicated actor; a public clash ends that feud. Everything
/// else is logged as a plain narrative beat.
fn build_router() -> EventRouter {
    let mut router = EventRouter::new();
    router.on("scandal", |_, owner| match owner {
        Some(owner) => vec![EngineCommand::Register {
            template: "feud".to_string(),
            owner: Some(owner.to_string()),
            at_tick: None,
        }],
        None => Vec::new(),
    });
    router.on("public_clash", |_, owner| match owner {
        Some(owner) => vec![EngineCommand::Unregister {
            key: ProcessKey::owned(owner, "feud"),
        }],
        None => Vec::new(),
    });
    for label in ["whisper", "audit_finding", "commendation", "windfall", "shortfall"] {
        router.on(label, |label, owner| {
            info!(label, owner = owner.unwrap_or("-"), "narrative event");
            Vec::new()
        });
    }
    router
}

fn seed_registry(engine: &mut ProcessEngine) {
    engine.register("audit", None, 0);
    engine.register("fund_drive", None, 0);
    for actor in DEMO_ACTORS {
        engine.register("rumor_mill", Some(actor), 0);
    }
}

fn run_to(
    engine: &mut ProcessEngine,
    router: &mut EventRouter,
    config: &SimulationConfig,
    store: &mut SqliteScheduleStore,
    start_tick: u64,
    target_tick: u64,
) -> Result<u64, String> {
    let directory: BTreeSet<String> = DEMO_ACTORS.iter().map(|actor| actor.to_string()).collect();
    let mut fired = 0;
    for now in (start_tick + 1)..=target_tick {
        let metrics = engine.update(now, &directory, &mut NoContext, router);
        fired += metrics.fired;
        if now % config.snapshot_every_ticks == 0 || now == target_tick {
            store
                .save_checkpoint(config, now, &engine.snapshot())
                .map_err(|err| format!("checkpoint at tick {now} failed: {err}"))?;
        }
    }
    Ok(fired)
}

fn run_simulate(args: &[String]) -> Result<(), String> {
    let run_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing run_id".to_string())?;
    let seed = parse_u64(args.get(3), "seed")?;
    let target_tick = parse_ticks(args.get(4))?;
    let sqlite_path = parse_sqlite_path(args.get(5));

    let config = SimulationConfig {
        run_id: run_id.clone(),
        seed,
        duration_days: (target_tick.div_ceil(TICKS_PER_DAY)).max(1) as u32,
        ..SimulationConfig::default()
    };

    let catalog = TemplateCatalog::default_catalog();
    let mut router = build_router();
    router
        .verify_coverage(&catalog)
        .map_err(|missing| format!("unhandled emission labels: {}", missing.join(", ")))?;

    let mut engine = ProcessEngine::new(catalog, seed);
    seed_registry(&mut engine);

    let mut store = SqliteScheduleStore::open(PathBuf::from(&sqlite_path))
        .map_err(|err| format!("failed to open sqlite store: {err}"))?;
    let fired = run_to(&mut engine, &mut router, &config, &mut store, 0, target_tick)?;

    println!(
        "simulated {} fired={} processes={} tick={} sqlite={}",
        config,
        fired,
        engine.len(),
        target_tick,
        sqlite_path
    );
    Ok(())
}

fn run_resume(args: &[String]) -> Result<(), String> {
    let run_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing run_id".to_string())?;
    let target_tick = parse_ticks(args.get(3))?;
    let sqlite_path = parse_sqlite_path(args.get(4));

    let mut store = SqliteScheduleStore::open(PathBuf::from(&sqlite_path))
        .map_err(|err| format!("failed to open sqlite store: {err}"))?;
    let (config, last_tick) = store
        .load_run(&run_id)
        .map_err(|err| format!("failed to load run: {err}"))?
        .ok_or_else(|| format!("no persisted run with run_id {run_id}"))?;
    if target_tick <= last_tick {
        return Err(format!(
            "run is already at tick {last_tick}, nothing to do before tick {target_tick}"
        ));
    }
    let records = store
        .load_schedule(&run_id)
        .map_err(|err| format!("failed to load schedule: {err}"))?;

    let catalog = TemplateCatalog::default_catalog();
    let mut router = build_router();
    router
        .verify_coverage(&catalog)
        .map_err(|missing| format!("unhandled emission labels: {}", missing.join(", ")))?;

    let mut engine = ProcessEngine::new(catalog, config.seed);
    let restored = engine.restore(&records, last_tick);
    info!(run_id = %run_id, restored, last_tick, "restored persisted schedule");

    let fired = run_to(
        &mut engine,
        &mut router,
        &config,
        &mut store,
        last_tick,
        target_tick,
    )?;

    println!(
        "resumed {} fired={} processes={} tick={}..{} sqlite={}",
        config,
        fired,
        engine.len(),
        last_tick,
        target_tick,
        sqlite_path
    );
    Ok(())
}

fn run_inspect(args: &[String]) -> Result<(), String> {
    let run_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing run_id".to_string())?;
    let sqlite_path = parse_sqlite_path(args.get(3));

    let store = SqliteScheduleStore::open(PathBuf::from(&sqlite_path))
        .map_err(|err| format!("failed to open sqlite store: {err}"))?;
    let (config, last_tick) = store
        .load_run(&run_id)
        .map_err(|err| format!("failed to load run: {err}"))?
        .ok_or_else(|| format!("no persisted run with run_id {run_id}"))?;
    let records = store
        .load_schedule(&run_id)
        .map_err(|err| format!("failed to load schedule: {err}"))?;

    println!("{config} last_tick={last_tick}");
    println!("schedule ({} entries):", records.len());
    for record in records {
        println!("  {} -> tick {}", record.key(), record.next_fire_tick);
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    let result = match command {
        Some("simulate") => run_simulate(&args),
        Some("resume") => run_resume(&args),
        Some("inspect") => run_inspect(&args),
        _ => {
            print_usage();
            return;
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        print_usage();
        std::process::exit(2);
    }
}
