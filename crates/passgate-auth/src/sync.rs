//! Background synchronization with the remote authority.
//!
//! One Tokio task, on its own wall-clock interval, completely decoupled from
//! the host's tick rate. Each iteration:
//!
//! ```text
//! registry.snapshot() ─┐
//! queued events ───────┴─→ push ─→ pull ─→ persist ─→ swap cache ─→ forward directives
//! └──────────── exchange (cancellable) ──┘ └────────── commit (not cancellable) ──────┘
//! ```
//!
//! A shutdown signal during the exchange abandons the iteration, so no
//! straggling network reply can write stale data after shutdown began. A
//! signal during the commit waits for it, so the cache file is never left
//! half written.

use std::sync::Arc;
use std::time::Duration;

use passgate_protocol::{Codec, Directive, JsonCodec, OutboundEvent, PresenceReport, SyncPayload};
use passgate_session::SessionRegistry;
use rand::Rng;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{AuthCache, AuthorityError, CacheState, CacheStore, RemoteAuthority};

/// Tick path → sync task.
pub type EventSender = mpsc::UnboundedSender<OutboundEvent>;
/// Sync task → tick path. Drained with `try_recv`, never awaited.
pub type DirectiveReceiver = mpsc::UnboundedReceiver<Directive>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timing for the sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Time between iteration starts. An overrunning iteration skips the
    /// missed slots instead of bursting.
    pub interval: Duration,
    /// Upper bound of the random delay before the first iteration, to keep
    /// a fleet of servers restarted together from hitting the authority in
    /// lockstep. Zero disables it.
    pub initial_jitter: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            initial_jitter: Duration::from_millis(500),
        }
    }
}

impl SyncConfig {
    fn first_delay(&self) -> Duration {
        let max_ms = millis(self.initial_jitter);
        if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..max_ms))
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// BackgroundSync
// ---------------------------------------------------------------------------

/// Channel ends handed back to the engine when a sync task is built.
#[derive(Debug)]
pub struct SyncChannels {
    /// Queue outbound events here from the tick path.
    pub events: EventSender,
    /// Directives pulled from the authority, for the next cycle.
    pub directives: DirectiveReceiver,
}

/// The sync worker. Build it, then [`spawn`](Self::spawn) it.
pub struct BackgroundSync<A: RemoteAuthority, C: Codec = JsonCodec> {
    authority: A,
    registry: Arc<SessionRegistry>,
    cache: Arc<AuthCache>,
    store: Option<CacheStore<C>>,
    events: mpsc::UnboundedReceiver<OutboundEvent>,
    directives: mpsc::UnboundedSender<Directive>,
    config: SyncConfig,
}

impl<A: RemoteAuthority> BackgroundSync<A> {
    /// Creates a worker without persistence.
    pub fn new(
        authority: A,
        registry: Arc<SessionRegistry>,
        cache: Arc<AuthCache>,
        config: SyncConfig,
    ) -> (Self, SyncChannels) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (directives_tx, directives_rx) = mpsc::unbounded_channel();

        let sync = Self {
            authority,
            registry,
            cache,
            store: None,
            events: events_rx,
            directives: directives_tx,
            config,
        };
        let channels = SyncChannels {
            events: events_tx,
            directives: directives_rx,
        };
        (sync, channels)
    }
}

impl<A: RemoteAuthority, C: Codec> BackgroundSync<A, C> {
    /// Persists every committed generation through `store`.
    pub fn with_store<C2: Codec>(self, store: CacheStore<C2>) -> BackgroundSync<A, C2> {
        BackgroundSync {
            authority: self.authority,
            registry: self.registry,
            cache: self.cache,
            store: Some(store),
            events: self.events,
            directives: self.directives,
            config: self.config,
        }
    }

    /// Runs one full iteration (exchange + commit) without any
    /// cancellation point. Returns the number of records installed.
    ///
    /// # Errors
    /// Returns the pull error. The cache is left exactly as it was.
    pub async fn run_once(&mut self) -> Result<usize, AuthorityError> {
        let payload = self.exchange().await?;
        Ok(self.commit(payload).await)
    }

    /// Push the snapshot and queued events, then pull.
    async fn exchange(&mut self) -> Result<SyncPayload, AuthorityError> {
        let snapshot = self.registry.snapshot();

        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }

        let report = PresenceReport::now(snapshot.online_players(), events);
        let online = report.identities();

        if let Err(e) = self.authority.push(&report).await {
            warn!(
                error = %e,
                dropped_events = report.events.len(),
                "presence push failed"
            );
        }

        self.authority.pull(&online).await
    }

    /// Persist, swap, forward. Returns the number of records installed.
    async fn commit(&mut self, payload: SyncPayload) -> usize {
        let SyncPayload {
            server,
            records,
            directives,
        } = payload;

        let state = CacheState::from_records(server, records, 0);
        let count = state.records.len();

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&state).await {
                warn!(error = %e, "failed to persist cache; keeping in-memory copy");
            }
        }

        let generation = self.cache.install(state);
        debug!(generation, records = count, directives = directives.len(), "cache updated");

        for directive in directives {
            // The engine may already be gone during shutdown.
            let _ = self.directives.send(directive);
        }

        count
    }

    /// Spawns the loop on `runtime` and returns its handle.
    pub fn spawn(self, runtime: &Handle) -> SyncHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = runtime.spawn(self.run(shutdown_rx));
        SyncHandle {
            shutdown: shutdown_tx,
            join,
        }
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let first = Instant::now() + self.config.first_delay();
        let mut interval = time::interval_at(first, self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_ms = millis(self.config.interval), "background sync started");

        loop {
            // A dropped handle counts as a shutdown request too.
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = interval.tick() => {}
            }

            let exchanged = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    debug!("shutdown during exchange, abandoning iteration");
                    break;
                }
                result = self.exchange() => result,
            };

            match exchanged {
                Ok(payload) => {
                    self.commit(payload).await;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        generation = self.cache.generation(),
                        "sync iteration failed, keeping cached records"
                    );
                }
            }

            if *shutdown.borrow() {
                break;
            }
        }

        info!("background sync stopped");
    }
}

// ---------------------------------------------------------------------------
// SyncHandle
// ---------------------------------------------------------------------------

/// Owner's handle on a running sync task.
#[derive(Debug)]
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SyncHandle {
    /// Whether the task has already exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signals the task to stop and waits up to `grace` for it.
    ///
    /// Returns `true` if the task exited on its own. On timeout the task is
    /// aborted and `false` is returned.
    pub async fn stop(mut self, grace: Duration) -> bool {
        let _ = self.shutdown.send(true);

        match time::timeout(grace, &mut self.join).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "background sync task failed");
                false
            }
            Err(_) => {
                warn!(grace_ms = millis(grace), "background sync did not stop in time, aborting");
                self.join.abort();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jitter(max: Duration) -> SyncConfig {
        SyncConfig {
            interval: Duration::from_secs(10),
            initial_jitter: max,
        }
    }

    #[test]
    fn test_first_delay_zero_jitter_is_immediate() {
        assert_eq!(jitter(Duration::ZERO).first_delay(), Duration::ZERO);
    }

    #[test]
    fn test_first_delay_stays_below_bound() {
        let config = jitter(Duration::from_millis(50));
        for _ in 0..200 {
            assert!(config.first_delay() < Duration::from_millis(50));
        }
    }

    #[test]
    fn test_first_delay_sub_millisecond_jitter_is_immediate() {
        assert_eq!(jitter(Duration::from_micros(900)).first_delay(), Duration::ZERO);
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
