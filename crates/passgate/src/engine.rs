//! `PassgateEngine`: the one object a host holds.
//!
//! It owns every piece of process-wide state (registry, cache, tick
//! counter, sync task handle) and exposes the host-facing entry points:
//!
//! ```text
//! host connect ──→ on_connect ──→ LoginResolver ──→ ActionSink
//! host tick ─────→ on_tick ─────→ ReconciliationEngine ──→ ActionSink
//!                                        ↑ directives
//! start() ─→ BackgroundSync task ⇄ RemoteAuthority
//!                 ↑ events (login decisions, server details)
//! ```
//!
//! The `on_*` methods are plain synchronous calls for the host's tick
//! thread. Only [`start`](PassgateEngine::start) and
//! [`shutdown`](PassgateEngine::shutdown) touch the Tokio runtime.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use passgate_auth::{
    AuthCache, BackgroundSync, CacheStore, EventSender, RemoteAuthority, SyncConfig, SyncHandle,
};
use passgate_protocol::{Identity, OutboundEvent, ServerDetails};
use passgate_session::SessionRegistry;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::{
    ActionSink, CycleReport, LoginDecision, LoginResolver, PassgateConfig, PassgateError,
    ReconciliationEngine,
};

/// Events held while no sync task is running. The oldest are dropped past
/// this bound.
pub const MAX_PENDING_EVENTS: usize = 256;

/// Access control for one game server.
pub struct PassgateEngine<S: ActionSink> {
    sink: S,
    registry: Arc<SessionRegistry>,
    cache: Arc<AuthCache>,
    resolver: LoginResolver,
    reconciler: ReconciliationEngine,
    sync_config: SyncConfig,
    cache_path: Option<PathBuf>,
    shutdown_grace: Duration,
    /// Set once the sync task is running.
    events: Option<EventSender>,
    /// Events queued before `start`, flushed when it runs.
    pending: VecDeque<OutboundEvent>,
    sync: Option<SyncHandle>,
    /// Set by `shutdown`, cleared by `start`. Events are dropped meanwhile.
    stopped: bool,
}

impl<S: ActionSink> PassgateEngine<S> {
    /// Builds an engine around the host's sink.
    ///
    /// # Errors
    /// Returns [`PassgateError::Config`] if `config` doesn't validate.
    pub fn new(config: &PassgateConfig, sink: S) -> Result<Self, PassgateError> {
        config.validate()?;

        let registry = Arc::new(SessionRegistry::new());
        let cache = Arc::new(AuthCache::new());
        let resolver = LoginResolver::new(
            Arc::clone(&registry),
            Arc::clone(&cache),
            config.login.command_policy,
        );
        let reconciler = ReconciliationEngine::new(
            config.to_cycle_config(),
            Arc::clone(&registry),
            Arc::clone(&cache),
        );

        Ok(Self {
            sink,
            registry,
            cache,
            resolver,
            reconciler,
            sync_config: config.to_sync_config(),
            cache_path: config.sync.cache_path.clone(),
            shutdown_grace: config.shutdown_grace(),
            events: None,
            pending: VecDeque::new(),
            sync: None,
            stopped: false,
        })
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Loads the persisted cache (if configured) and spawns the background
    /// sync task on `runtime`.
    ///
    /// A missing cache file is normal on first start. A corrupt one is
    /// logged and ignored; the first successful pull replaces it. The file
    /// is only read while the in-memory cache is still empty (generation
    /// 0), so a restart never rolls back newer records.
    ///
    /// # Errors
    /// [`PassgateError::AlreadyStarted`] if the sync task is running.
    pub fn start<A: RemoteAuthority>(
        &mut self,
        authority: A,
        runtime: &Handle,
    ) -> Result<(), PassgateError> {
        if self.sync.is_some() {
            return Err(PassgateError::AlreadyStarted);
        }

        let store = self.cache_path.clone().map(CacheStore::json);
        if let Some(store) = &store {
            if self.cache.generation() == 0 {
                self.restore_cache(store);
            }
        }

        let (sync, channels) = BackgroundSync::new(
            authority,
            Arc::clone(&self.registry),
            Arc::clone(&self.cache),
            self.sync_config,
        );
        let handle = match store {
            Some(store) => sync.with_store(store).spawn(runtime),
            None => sync.spawn(runtime),
        };

        for event in self.pending.drain(..) {
            let _ = channels.events.send(event);
        }
        self.events = Some(channels.events);
        self.stopped = false;
        self.reconciler.attach_directives(channels.directives);
        self.sync = Some(handle);

        info!(
            records = self.cache.len(),
            persisted = self.cache_path.is_some(),
            "passgate started"
        );
        Ok(())
    }

    fn restore_cache(&self, store: &CacheStore) {
        match store.load() {
            Ok(Some(state)) => {
                let records = state.records.len();
                let generation = self.cache.install(state);
                info!(path = %store.path().display(), records, generation, "restored cached records");
            }
            Ok(None) => debug!(path = %store.path().display(), "no cache file yet"),
            Err(e) => warn!(error = %e, "ignoring unreadable cache file"),
        }
    }

    /// Stops the sync task, waiting up to the configured grace period.
    ///
    /// Returns `true` if the task stopped on its own (or was never
    /// started), `false` if it had to be aborted. Events queued after this
    /// are dropped until the next `start`.
    pub async fn shutdown(&mut self) -> bool {
        self.events = None;
        self.stopped = true;
        self.pending.clear();
        let Some(handle) = self.sync.take() else {
            return true;
        };
        let clean = handle.stop(self.shutdown_grace).await;
        info!(clean, "passgate stopped");
        clean
    }

    pub fn is_running(&self) -> bool {
        self.sync.as_ref().is_some_and(|h| !h.is_finished())
    }

    // -----------------------------------------------------------------------
    // Host events
    // -----------------------------------------------------------------------

    /// A player connected. Decides access and applies it through the sink.
    pub fn on_connect(&mut self, identity: Identity, name: &str) -> LoginDecision {
        let decision = self.resolver.resolve(&mut self.sink, identity, name);
        self.queue(decision.to_event(identity));
        decision
    }

    /// A player disconnected. No-op if they weren't registered.
    pub fn on_disconnect(&mut self, identity: &Identity) {
        if self.registry.remove(identity).is_some() {
            debug!(%identity, "session removed");
        }
    }

    /// One host tick. Returns a report when a reconciliation cycle ran.
    pub fn on_tick(&mut self) -> Option<CycleReport> {
        self.reconciler.on_tick(&mut self.sink)
    }

    /// Queues the startup announcement for the next sync iteration.
    ///
    /// The whitelist import is dropped if the authority already has it.
    pub fn announce(&mut self, mut details: ServerDetails) {
        if self.cache.state().server.whitelist_imported && !details.whitelist_import.is_empty() {
            debug!(skipped = details.whitelist_import.len(), "whitelist already imported");
            details.whitelist_import.clear();
        }
        self.queue(OutboundEvent::ServerDetails(details));
    }

    fn queue(&mut self, event: OutboundEvent) {
        match &self.events {
            Some(tx) => {
                if tx.send(event).is_err() {
                    debug!("sync task gone, dropping event");
                }
            }
            None if self.stopped => debug!("engine stopped, dropping event"),
            None => {
                if self.pending.len() == MAX_PENDING_EVENTS {
                    self.pending.pop_front();
                    debug!(limit = MAX_PENDING_EVENTS, "pending events full, dropping oldest");
                }
                self.pending.push_back(event);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<AuthCache> {
        &self.cache
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Events waiting for `start`, oldest first.
    pub fn pending_events(&self) -> &VecDeque<OutboundEvent> {
        &self.pending
    }
}
