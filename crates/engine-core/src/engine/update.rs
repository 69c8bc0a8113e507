use tracing::{info, warn};

use super::*;

impl ProcessEngine {
    /// One scheduler pass: fire every process due at or before `now`.
    ///
    /// The due set is snapshotted before any mutation, so registry edits made
    /// mid-pass never invalidate the iteration. A key removed earlier in the
    /// same pass is skipped when its turn comes; registrations requested by
    /// handlers wait for the next pass.
    pub fn update(
        &mut self,
        now: u64,
        directory: &dyn ActorDirectory,
        modifier: &mut dyn ContextModifier,
        sink: &mut dyn EventSink,
    ) -> UpdateMetrics {
        let mut metrics = UpdateMetrics::default();

        let deferred = std::mem::take(&mut self.pending_commands);
        for command in deferred {
            self.apply_command(command, now);
            metrics.commands_applied += 1;
        }

        // Snapshot the due keys, separating drifted entries: anything more
        // than one full mean period overdue fires with a stale timestamp
        // baked in, so it gets a fresh jittered slot instead of firing.
        let mut due = Vec::new();
        let mut drifted = Vec::new();
        for (key, fire_tick) in &self.schedule {
            if *fire_tick > now {
                continue;
            }
            let mean = self
                .registry
                .get(key)
                .map(ProcessInstance::mean_period_ticks)
                .unwrap_or(0.0);
            if mean > 0.0 && (now - fire_tick) as f64 > mean {
                drifted.push((key.clone(), *fire_tick, mean));
            } else {
                due.push(key.clone());
            }
        }

        for (key, stale_tick, mean) in drifted {
            let next = now + jitter::period_ticks(mean, modifier.urgency_factor(&key), &mut self.rng);
            warn!(
                key = %key,
                stale_tick,
                now,
                rescheduled_to = next,
                "schedule drift detected, rescheduling"
            );
            self.schedule.insert(key, next);
            metrics.drift_repairs += 1;
        }

        for key in due {
            if !self.registry.contains_key(&key) {
                // Removed earlier in this pass.
                continue;
            }
            if let Some(owner) = key.owner.as_deref() {
                if !directory.resolve(owner) {
                    info!(key = %key, "owner no longer resolves, purging process");
                    self.registry.remove(&key);
                    self.schedule.remove(&key);
                    metrics.purged += 1;
                    continue;
                }
            }
            metrics.fired += 1;
            let urgency = modifier.urgency_factor(&key);

            let emission = {
                let Some(instance) = self.registry.get_mut(&key) else {
                    continue;
                };
                modifier.apply(instance);
                instance.sample_emission(&mut self.rng)
            };
            if let Some(label) = emission {
                metrics.emitted += 1;
                for command in sink.handle(&label, key.owner.as_deref()) {
                    match command {
                        EngineCommand::Unregister { key: target } => {
                            self.unregister(&target);
                            metrics.commands_applied += 1;
                        }
                        register @ EngineCommand::Register { .. } => {
                            self.pending_commands.push(register);
                        }
                    }
                }
            }
            if !self.registry.contains_key(&key) {
                // The dispatcher unregistered the process that just fired.
                continue;
            }

            let (next_template, mean) = {
                let Some(instance) = self.registry.get_mut(&key) else {
                    continue;
                };
                (
                    instance.sample_transition(&mut self.rng),
                    instance.mean_period_ticks(),
                )
            };
            if next_template != key.template {
                self.registry.remove(&key);
                self.schedule.remove(&key);
                self.register_inner(&next_template, key.owner.as_deref(), None, now);
                metrics.replaced += 1;
            } else {
                let next = now + jitter::period_ticks(mean, urgency, &mut self.rng);
                self.schedule.insert(key.clone(), next);
                metrics.rescheduled += 1;
            }
        }

        self.refresh_next_wake();
        self.last_update_metrics = metrics;
        metrics
    }
}
