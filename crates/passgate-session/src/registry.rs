//! The session registry: who is connected right now.
//!
//! Written by the host's tick path (connect/disconnect notifications) and
//! read concurrently by the background sync task.
//!
//! # Concurrency note
//!
//! The table is copy-on-write. The current map lives behind an
//! `RwLock<Arc<..>>`; writers clone the map, apply their change, and swap
//! the `Arc` in. Readers only clone the `Arc`. The lock is held for the
//! clone or the swap and nothing else, so a snapshot can never observe a
//! half-applied write and the tick path never waits on network work.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use passgate_protocol::{Identity, OnlinePlayer};

use crate::Session;

/// Thread-safe table of live sessions, keyed by identity.
///
/// ```text
/// on_connect ──→ add() ────┐
///                          ├──→ [current Arc<map>] ──→ snapshot() ──→ sync task
/// on_disconnect → remove()─┘
/// ```
#[derive(Debug, Default)]
pub struct SessionRegistry {
    current: RwLock<Arc<HashMap<Identity, Session>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a connection. Idempotent upsert.
    ///
    /// An existing entry for the same identity is overwritten. That covers a
    /// disconnect notification that was lost or arrived out of order.
    /// Returns the session that was replaced, if any.
    pub fn add(&self, identity: Identity, name: impl Into<String>) -> Option<Session> {
        let session = Session::new(identity, name);
        let replaced = self.update(|map| map.insert(identity, session));

        if let Some(stale) = &replaced {
            tracing::debug!(%identity, stale_name = %stale.name, "replaced stale session");
        } else {
            tracing::debug!(%identity, "session added");
        }
        replaced
    }

    /// Forgets a connection. No-op if the identity isn't registered.
    pub fn remove(&self, identity: &Identity) -> Option<Session> {
        if !self.contains(identity) {
            return None;
        }
        let removed = self.update(|map| map.remove(identity));
        if removed.is_some() {
            tracing::debug!(%identity, "session removed");
        }
        removed
    }

    /// A consistent view of the table at a single point in time.
    ///
    /// Later writes never show up in a snapshot already taken.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        RegistrySnapshot {
            sessions: Arc::clone(&*guard),
        }
    }

    /// Whether a session exists for this identity.
    pub fn contains(&self, identity: &Identity) -> bool {
        self.snapshot().sessions.contains_key(identity)
    }

    /// The display name registered for this identity.
    pub fn display_name(&self, identity: &Identity) -> Option<String> {
        self.snapshot().sessions.get(identity).map(|s| s.name.clone())
    }

    /// Returns a copy of the session for this identity.
    pub fn session(&self, identity: &Identity) -> Option<Session> {
        self.snapshot().sessions.get(identity).cloned()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone-modify-swap. The write lock covers the whole step so two
    /// writers can't lose each other's updates.
    fn update<R>(&self, f: impl FnOnce(&mut HashMap<Identity, Session>) -> R) -> R {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = HashMap::clone(&**guard);
        let result = f(&mut next);
        *guard = Arc::new(next);
        result
    }
}

// ---------------------------------------------------------------------------
// RegistrySnapshot
// ---------------------------------------------------------------------------

/// An immutable, cheaply clonable view of the registry.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    sessions: Arc<HashMap<Identity, Session>>,
}

impl RegistrySnapshot {
    /// Identity → display name, the shape the authority and host expect.
    pub fn names(&self) -> HashMap<Identity, String> {
        self.sessions
            .iter()
            .map(|(id, s)| (*id, s.name.clone()))
            .collect()
    }

    /// Online players sorted by identity, ready for a presence report.
    pub fn online_players(&self) -> Vec<OnlinePlayer> {
        let mut players: Vec<OnlinePlayer> = self
            .sessions
            .values()
            .map(|s| OnlinePlayer {
                identity: s.identity,
                name: s.name.clone(),
            })
            .collect();
        players.sort_by_key(|p| p.identity);
        players
    }

    pub fn get(&self, identity: &Identity) -> Option<&Session> {
        self.sessions.get(identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.sessions.contains_key(identity)
    }

    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.sessions.keys()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
