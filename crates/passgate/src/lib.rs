//! # Passgate
//!
//! Access control for game servers whose player permissions live with a
//! remote authority.
//!
//! The host implements [`ActionSink`] (kick, warn, set mode, run command)
//! and forwards three events to a [`PassgateEngine`]: connect, disconnect
//! and tick. A background task keeps a local copy of the authority's
//! records fresh, so every login decision is made without network I/O.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use passgate::prelude::*;
//!
//! # fn host<S: ActionSink, A: RemoteAuthority>(sink: S, authority: A) -> Result<(), PassgateError> {
//! let config = PassgateConfig::load("passgate.toml")?;
//! passgate::logging::init(config.debug);
//!
//! let runtime = tokio::runtime::Runtime::new().expect("runtime");
//! let mut engine = PassgateEngine::new(&config, sink)?;
//! engine.start(authority, runtime.handle())?;
//!
//! // From the host's event hooks:
//! // engine.on_connect(identity, "Alice");
//! // engine.on_tick();
//! // engine.on_disconnect(&identity);
//!
//! runtime.block_on(engine.shutdown());
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod error;
mod login;
mod reconcile;
mod sink;

pub mod logging;

pub use config::{AuthorityConfig, CycleSection, LoginSection, PassgateConfig, SyncSection};
pub use engine::{MAX_PENDING_EVENTS, PassgateEngine};
pub use error::{ConfigError, PassgateError};
pub use login::{CommandPolicy, LoginDecision, LoginResolver, NO_MODE_MESSAGE, NOT_PERMITTED_MESSAGE};
pub use reconcile::{CycleReport, ReconciliationEngine};
pub use sink::{ActionError, ActionSink};

/// Everything a host integration usually needs.
pub mod prelude {
    pub use crate::{
        ActionError, ActionSink, CommandPolicy, LoginDecision, PassgateConfig, PassgateEngine,
        PassgateError,
    };
    pub use passgate_auth::{AuthorityError, RemoteAuthority};
    pub use passgate_protocol::{
        AuthorizationRecord, GameMode, Identity, ModeGrant, OutboundEvent, PresenceReport,
        ServerDetails, SyncPayload,
    };
}
