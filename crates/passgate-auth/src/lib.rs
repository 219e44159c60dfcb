//! Authorization data for Passgate: where it comes from and what it means.
//!
//! # Key types
//!
//! - [`parse`] / [`ParsedPrivileges`]: privilege tokens → mode grant and
//!   rendered commands
//! - [`AuthCache`]: atomically swapped local copy of the authority's records
//! - [`CacheStore`]: crash-safe persistence of that copy
//! - [`RemoteAuthority`]: the trait an authority client implements
//! - [`BackgroundSync`] / [`SyncHandle`]: the task keeping the cache fresh

#![allow(async_fn_in_trait)]

mod authority;
mod cache;
mod error;
pub mod privilege;
mod sync;

pub use authority::RemoteAuthority;
pub use cache::{AuthCache, CacheState, CacheStore};
pub use error::{AuthorityError, CacheError};
pub use privilege::{parse, render_command, ParsedPrivileges, REALM_PREFIX};
pub use sync::{
    BackgroundSync, DirectiveReceiver, EventSender, SyncChannels, SyncConfig, SyncHandle,
};
