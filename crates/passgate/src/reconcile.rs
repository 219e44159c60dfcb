//! Tick-driven reconciliation.
//!
//! The host calls [`ReconciliationEngine::on_tick`] once per server tick.
//! Every `ticks_per_cycle` ticks one cycle runs:
//!
//! 1. ask the host to reload its local allow-list,
//! 2. apply directives the sync task pulled since the last cycle,
//! 3. drop registry entries the host no longer reports (lost disconnects).
//!
//! Nothing here touches the network or waits on a lock held across I/O.

use std::sync::Arc;

use passgate_auth::{AuthCache, DirectiveReceiver};
use passgate_protocol::{Directive, DirectiveAction};
use passgate_session::SessionRegistry;
use passgate_tick::{CycleConfig, CycleInfo, TickCounter};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, trace, warn};

use crate::ActionSink;

/// What one cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    pub reloaded: bool,
    pub directives_applied: usize,
    pub pruned: usize,
}

/// Counts host ticks and runs a reconciliation cycle at each threshold.
#[derive(Debug)]
pub struct ReconciliationEngine {
    counter: TickCounter,
    registry: Arc<SessionRegistry>,
    cache: Arc<AuthCache>,
    directives: Option<DirectiveReceiver>,
}

impl ReconciliationEngine {
    pub fn new(config: CycleConfig, registry: Arc<SessionRegistry>, cache: Arc<AuthCache>) -> Self {
        Self {
            counter: TickCounter::new(config),
            registry,
            cache,
            directives: None,
        }
    }

    /// Connects the directive queue filled by the background sync task.
    pub fn attach_directives(&mut self, directives: DirectiveReceiver) {
        self.directives = Some(directives);
    }

    pub fn counter(&self) -> &TickCounter {
        &self.counter
    }

    /// Handles one host tick. Returns a report if a cycle ran.
    ///
    /// Level-triggered: a host that stalls simply gets its cycles later.
    /// Missed cycles are never replayed.
    pub fn on_tick<S: ActionSink>(&mut self, sink: &mut S) -> Option<CycleReport> {
        let info = self.counter.tick()?;
        Some(self.run_cycle(info, sink))
    }

    fn run_cycle<S: ActionSink>(&mut self, info: CycleInfo, sink: &mut S) -> CycleReport {
        trace!(cycle = info.cycle, total_ticks = info.total_ticks, "reconciliation cycle");

        let reloaded = match sink.update_and_reload_local_auth() {
            Ok(()) => true,
            Err(e) => {
                warn!(cycle = info.cycle, error = %e, "local auth reload failed");
                false
            }
        };

        let report = CycleReport {
            cycle: info.cycle,
            reloaded,
            directives_applied: self.apply_directives(sink),
            pruned: self.prune_lost(sink),
        };

        if report.directives_applied > 0 || report.pruned > 0 {
            debug!(
                cycle = report.cycle,
                directives = report.directives_applied,
                pruned = report.pruned,
                "reconciliation cycle did work"
            );
        }
        report
    }

    /// Drains the directive queue without waiting.
    fn apply_directives<S: ActionSink>(&mut self, sink: &mut S) -> usize {
        let Some(rx) = self.directives.as_mut() else {
            return 0;
        };

        let mut pending = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(directive) => pending.push(directive),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("directive queue closed");
                    self.directives = None;
                    break;
                }
            }
        }

        if pending.is_empty() {
            return 0;
        }

        let state = self.cache.state();
        for Directive { identity, action } in &pending {
            match action {
                DirectiveAction::Kick { message } => sink.kick_player(identity, message),
                DirectiveAction::Warn { message } => sink.warn_player(identity, message),
                DirectiveAction::WarnPass { message } => {
                    sink.warn_player_pass(identity, message, state.join_url_for(identity));
                }
            }
        }
        pending.len()
    }

    /// Removes sessions for identities the host no longer lists.
    fn prune_lost<S: ActionSink>(&self, sink: &S) -> usize {
        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            return 0;
        }

        let online = sink.current_players();
        let mut pruned = 0;
        for identity in snapshot.identities() {
            if !online.contains_key(identity) {
                self.registry.remove(identity);
                debug!(%identity, "pruned session missing from host");
                pruned += 1;
            }
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use passgate_protocol::{AuthorizationRecord, Identity, ServerInfo};
    use tokio::sync::mpsc;

    use super::*;
    use crate::sink::testing::{Call, RecordingSink};

    fn id(n: u128) -> Identity {
        Identity::from_u128(n)
    }

    fn engine(cycle_seconds: u32, tps: u32) -> ReconciliationEngine {
        ReconciliationEngine::new(
            CycleConfig {
                cycle_seconds,
                host_ticks_per_second: tps,
            },
            Arc::new(SessionRegistry::new()),
            Arc::new(AuthCache::new()),
        )
    }

    // =====================================================================
    // Tick counting
    // =====================================================================

    #[test]
    fn test_on_tick_fires_on_fortieth_tick() {
        let mut engine = engine(2, 20);
        let mut sink = RecordingSink::default();

        for _ in 0..39 {
            assert!(engine.on_tick(&mut sink).is_none());
        }
        assert!(sink.calls.is_empty());

        let report = engine.on_tick(&mut sink).expect("40th tick fires");
        assert_eq!(report.cycle, 1);
        assert!(report.reloaded);
        assert_eq!(engine.counter().count(), 0);
        assert_eq!(sink.calls, vec![Call::Reload]);
    }

    #[test]
    fn test_on_tick_reload_failure_is_not_fatal() {
        let mut engine = engine(1, 1);
        let mut sink = RecordingSink {
            fail_reload: true,
            ..RecordingSink::default()
        };

        let first = engine.on_tick(&mut sink).unwrap();
        let second = engine.on_tick(&mut sink).unwrap();

        assert!(!first.reloaded);
        assert_eq!(second.cycle, 2);
    }

    // =====================================================================
    // Directives
    // =====================================================================

    #[test]
    fn test_directives_wait_for_next_cycle() {
        let mut engine = engine(1, 2);
        let (tx, rx) = mpsc::unbounded_channel();
        engine.attach_directives(rx);
        let mut sink = RecordingSink::default();

        tx.send(Directive {
            identity: id(1),
            action: DirectiveAction::Kick {
                message: "pass revoked".into(),
            },
        })
        .unwrap();

        assert!(engine.on_tick(&mut sink).is_none());
        assert!(sink.kicks().is_empty(), "nothing applied between cycles");

        let report = engine.on_tick(&mut sink).unwrap();
        assert_eq!(report.directives_applied, 1);
        assert_eq!(sink.kicks(), vec![(id(1), "pass revoked".to_string())]);
    }

    #[test]
    fn test_warn_pass_uses_record_join_url_then_server() {
        let cache = Arc::new(AuthCache::new());
        let mut with_url = AuthorizationRecord::new(id(1), vec![]);
        with_url.join_url = "https://pass.example/p/1".into();
        cache.replace(
            ServerInfo {
                join_url: "https://pass.example/server".into(),
                whitelist_imported: true,
            },
            vec![with_url],
        );
        let mut engine = ReconciliationEngine::new(
            CycleConfig {
                cycle_seconds: 1,
                host_ticks_per_second: 1,
            },
            Arc::new(SessionRegistry::new()),
            cache,
        );
        let (tx, rx) = mpsc::unbounded_channel();
        engine.attach_directives(rx);
        for n in [1, 2] {
            tx.send(Directive {
                identity: id(n),
                action: DirectiveAction::WarnPass {
                    message: "renew your pass".into(),
                },
            })
            .unwrap();
        }
        tx.send(Directive {
            identity: id(3),
            action: DirectiveAction::Warn {
                message: "maintenance soon".into(),
            },
        })
        .unwrap();
        let mut sink = RecordingSink::default();

        engine.on_tick(&mut sink);

        assert_eq!(
            &sink.calls[1..],
            &[
                Call::WarnPass(id(1), "renew your pass".into(), "https://pass.example/p/1".into()),
                Call::WarnPass(id(2), "renew your pass".into(), "https://pass.example/server".into()),
                Call::Warn(id(3), "maintenance soon".into()),
            ]
        );
    }

    #[test]
    fn test_closed_directive_queue_is_dropped() {
        let mut engine = engine(1, 1);
        let (tx, rx) = mpsc::unbounded_channel::<Directive>();
        engine.attach_directives(rx);
        drop(tx);
        let mut sink = RecordingSink::default();

        let report = engine.on_tick(&mut sink).unwrap();

        assert_eq!(report.directives_applied, 0);
        assert!(engine.directives.is_none());
    }

    // =====================================================================
    // Pruning
    // =====================================================================

    #[test]
    fn test_cycle_prunes_sessions_host_no_longer_lists() {
        let mut engine = engine(1, 1);
        engine.registry.add(id(1), "Alice");
        engine.registry.add(id(2), "Bob");
        let mut sink = RecordingSink::default();
        sink.online.insert(id(1), "Alice".into());

        let report = engine.on_tick(&mut sink).unwrap();

        assert_eq!(report.pruned, 1);
        assert!(engine.registry.contains(&id(1)));
        assert!(!engine.registry.contains(&id(2)));
    }
}
