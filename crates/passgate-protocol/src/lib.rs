//! Shared data model for Passgate.
//!
//! - **Types** ([`Identity`], [`AuthorizationRecord`], [`SyncPayload`],
//!   [`PresenceReport`], ...) exchanged between the game host, the local
//!   cache, and the remote authority.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) used to persist the cache.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Remote authority ⇄ (SyncPayload / PresenceReport) ⇄ local cache → login decisions
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AuthorizationRecord, DenyReason, Directive, DirectiveAction, GameMode, Identity,
    ModeGrant, OnlinePlayer, OutboundEvent, PluginInfo, PresenceReport, ServerDetails,
    ServerInfo, SyncPayload,
};
