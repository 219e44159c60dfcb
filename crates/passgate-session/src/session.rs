//! The record of one connected player.

use std::time::Instant;

use passgate_protocol::Identity;

/// A single live connection, as seen by the registry.
///
/// Created on a connect notification and dropped on disconnect. There is
/// never more than one `Session` per identity; a second connect for the
/// same identity overwrites the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Who the player is.
    pub identity: Identity,

    /// Display name (handle) reported by the host at connect time.
    pub name: String,

    /// When the host told us about the connection. Monotonic clock.
    pub connected_at: Instant,
}

impl Session {
    /// Creates a session stamped with the current instant.
    pub fn new(identity: Identity, name: impl Into<String>) -> Self {
        Self {
            identity,
            name: name.into(),
            connected_at: Instant::now(),
        }
    }
}
