//! Connected-player tracking for Passgate.
//!
//! One job: know who is online. The host's connect/disconnect notifications
//! write to the [`SessionRegistry`]; the reconciliation engine and the
//! background sync task read consistent [`RegistrySnapshot`]s of it.
//!
//! ```text
//! Engine (above)  ← registers players on connect, prunes on cycles
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Protocol layer (below)  ← Identity, OnlinePlayer
//! ```

mod registry;
mod session;

pub use registry::{RegistrySnapshot, SessionRegistry};
pub use session::Session;
