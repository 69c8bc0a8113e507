use std::collections::BTreeSet;

use contracts::{
    EngineCommand, ProcessKey, ScheduledProcessRecord, SimulationConfig,
};
use engine_core::{EventSink, NoContext, ProcessEngine, TemplateCatalog};
use proptest::prelude::*;

const TEMPLATES: [&str; 4] = ["rumor_mill", "audit", "fund_drive", "feud"];
const OWNERS: [&str; 3] = ["actor:vela", "actor:brant", "actor:ines"];

#[derive(Default)]
struct RecordingSink {
    log: Vec<(String, Option<String>)>,
}

impl EventSink for RecordingSink {
    fn handle(&mut self, label: &str, owner: Option<&str>) -> Vec<EngineCommand> {
        self.log.push((label.to_string(), owner.map(str::to_string)));
        Vec::new()
    }
}

fn roster() -> BTreeSet<String> {
    OWNERS.iter().map(|owner| owner.to_string()).collect()
}

fn seeded_run(seed: u64, ticks: u64) -> (Vec<(String, Option<String>)>, Vec<ScheduledProcessRecord>) {
    let mut engine = ProcessEngine::new(TemplateCatalog::default_catalog(), seed);
    engine.register("rumor_mill", None, 0);
    engine.register("audit", None, 0);
    engine.register("fund_drive", Some("actor:vela"), 0);
    engine.register("rumor_mill", Some("actor:brant"), 0);

    let directory = roster();
    let mut sink = RecordingSink::default();
    for now in 1..=ticks {
        engine.update(now, &directory, &mut NoContext, &mut sink);
    }
    (sink.log, engine.snapshot())
}

#[test]
fn identical_seeds_replay_identical_runs() {
    let (log_a, snapshot_a) = seeded_run(1337, 500);
    let (log_b, snapshot_b) = seeded_run(1337, 500);
    assert_eq!(log_a, log_b);
    assert_eq!(snapshot_a, snapshot_b);
    assert!(!log_a.is_empty(), "500 ticks should emit something");
}

#[test]
fn restore_overwrites_time_for_live_keys_only() {
    let mut engine = ProcessEngine::new(TemplateCatalog::default_catalog(), 7);
    let key = engine.register_at("audit", None, 100);

    let records = vec![
        ScheduledProcessRecord {
            template: "audit".to_string(),
            owner: None,
            next_fire_tick: 7,
        },
        ScheduledProcessRecord {
            template: "feud".to_string(),
            owner: Some("actor:vela".to_string()),
            next_fire_tick: 12,
        },
    ];
    let applied = engine.restore(&records, 0);
    assert_eq!(applied, 2);
    assert_eq!(engine.fire_tick(&key), Some(7));
    assert_eq!(
        engine.fire_tick(&ProcessKey::owned("actor:vela", "feud")),
        Some(12)
    );
    assert_eq!(engine.len(), 2);
}

#[test]
fn restore_skips_malformed_records_and_continues() {
    let mut engine = ProcessEngine::new(TemplateCatalog::default_catalog(), 7);
    let records = vec![
        ScheduledProcessRecord {
            template: String::new(),
            owner: None,
            next_fire_tick: 3,
        },
        ScheduledProcessRecord {
            template: "unheard_of".to_string(),
            owner: None,
            next_fire_tick: 9,
        },
        ScheduledProcessRecord {
            template: "audit".to_string(),
            owner: None,
            next_fire_tick: 21,
        },
    ];
    let applied = engine.restore(&records, 0);
    // The blank template is dropped; the unknown one registers a fallback.
    assert_eq!(applied, 2);
    assert_eq!(engine.len(), 2);
    assert_eq!(
        engine.fire_tick(&ProcessKey::global("unheard_of")),
        Some(9)
    );
    assert_eq!(engine.fire_tick(&ProcessKey::global("audit")), Some(21));
}

fn assert_maps_in_sync(engine: &ProcessEngine) {
    let registry_keys = engine.keys().cloned().collect::<Vec<_>>();
    let schedule_keys = engine
        .snapshot()
        .iter()
        .map(ScheduledProcessRecord::key)
        .collect::<Vec<_>>();
    assert_eq!(registry_keys, schedule_keys);
}

proptest! {
    #[test]
    fn snapshot_restore_round_trips_exactly(
        entries in prop::collection::vec(
            (0_usize..TEMPLATES.len(), prop::option::of(0_usize..OWNERS.len()), 0_u64..10_000),
            1..24,
        ),
        seed in 1_u64..10_000,
    ) {
        let mut engine = ProcessEngine::new(TemplateCatalog::default_catalog(), seed);
        for (template_idx, owner_idx, tick) in entries {
            engine.register_at(TEMPLATES[template_idx], owner_idx.map(|idx| OWNERS[idx]), tick);
        }
        let records = engine.snapshot();

        let mut revived = ProcessEngine::new(TemplateCatalog::default_catalog(), seed + 1);
        revived.restore(&records, 0);
        prop_assert_eq!(revived.snapshot(), records);
        prop_assert_eq!(revived.len(), engine.len());
    }

    #[test]
    fn registry_and_schedule_keys_stay_equal(
        ops in prop::collection::vec(
            (0_u8..3, 0_usize..TEMPLATES.len(), prop::option::of(0_usize..OWNERS.len()), 0_u64..500),
            1..40,
        ),
        seed in 1_u64..10_000,
    ) {
        let mut engine = ProcessEngine::new(TemplateCatalog::default_catalog(), seed);
        let directory = roster();
        let mut sink = RecordingSink::default();

        for (op, template_idx, owner_idx, tick) in ops {
            let template = TEMPLATES[template_idx];
            let owner = owner_idx.map(|idx| OWNERS[idx]);
            match op {
                0 => {
                    engine.register_at(template, owner, tick);
                }
                1 => {
                    let key = match owner {
                        Some(owner) => ProcessKey::owned(owner, template),
                        None => ProcessKey::global(template),
                    };
                    engine.unregister(&key);
                }
                _ => {
                    engine.update(tick, &directory, &mut NoContext, &mut sink);
                }
            }
            assert_maps_in_sync(&engine);
        }
    }

    #[test]
    fn simulation_config_round_trips(
        seed in any::<u64>(),
        duration_days in 1_u32..365,
        snapshot_every_ticks in 1_u64..240,
    ) {
        let config = SimulationConfig {
            seed,
            duration_days,
            snapshot_every_ticks,
            ..SimulationConfig::default()
        };
        let encoded = serde_json::to_string(&config).expect("serialize");
        let decoded: SimulationConfig = serde_json::from_str(&encoded).expect("deserialize");
        prop_assert_eq!(config, decoded);
    }
}
