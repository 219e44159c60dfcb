//! Core data types shared by every Passgate layer.
//!
//! Everything here is plain data: identities, game modes, the records the
//! remote authority hands out, and the payloads exchanged with it during a
//! sync iteration. All of it is `Serialize + Deserialize` so the local cache
//! can be persisted and so an authority client can put it on the wire.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A player's stable, host-assigned identifier.
///
/// Newtype over a 128-bit UUID so an identity can't be confused with any
/// other UUID floating around a host (world ids, entity ids, ...).
///
/// `#[serde(transparent)]` keeps the JSON form a plain UUID string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Identity(pub Uuid);

impl Identity {
    /// Wraps an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Builds an identity from its raw 128-bit value. Handy in tests.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

/// Lowercase hyphenated form, e.g. `550e8400-e29b-41d4-a716-446655440000`.
/// This is also what `$uuid` expands to in command templates.
impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for Identity {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ---------------------------------------------------------------------------
// Game modes
// ---------------------------------------------------------------------------

/// A concrete game mode the host can put a player into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Survival => write!(f, "survival"),
            Self::Creative => write!(f, "creative"),
            Self::Adventure => write!(f, "adventure"),
            Self::Spectator => write!(f, "spectator"),
        }
    }
}

/// What a mode token grants.
///
/// `Unchanged` is the `default` sentinel: the player is allowed in and keeps
/// whatever mode the host already gave them. It is NOT the same as having no
/// mode token at all, which denies access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeGrant {
    /// Access granted, mode left alone.
    Unchanged,
    /// Access granted and the player is moved into this mode.
    Set(GameMode),
}

impl ModeGrant {
    /// Looks up a mode name from a privilege token.
    ///
    /// The recognized set is versioned by the authority, so this is a plain
    /// lookup table. Unknown names return `None` and are ignored by callers.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::Unchanged),
            "survival" => Some(Self::Set(GameMode::Survival)),
            "creative" => Some(Self::Set(GameMode::Creative)),
            "adventure" => Some(Self::Set(GameMode::Adventure)),
            "spectator" => Some(Self::Set(GameMode::Spectator)),
            _ => None,
        }
    }

    /// The concrete mode to apply, or `None` for the sentinel.
    pub fn concrete(self) -> Option<GameMode> {
        match self {
            Self::Unchanged => None,
            Self::Set(mode) => Some(mode),
        }
    }
}

// ---------------------------------------------------------------------------
// Authorization data (pulled from the authority)
// ---------------------------------------------------------------------------

/// The authority's verdict for one identity.
///
/// Privileges are kept exactly as issued, in order. Interpreting them is the
/// privilege parser's job; the record itself is never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    pub identity: Identity,
    /// Tagged privilege tokens such as `mc:survival` or `mc:/say hi $name`.
    #[serde(default)]
    pub privileges: Vec<String>,
    /// Where the player can get or renew their pass. May be empty.
    #[serde(default)]
    pub join_url: String,
    /// Whether this entry came from importing the host's old allow-list.
    #[serde(default)]
    pub imported: bool,
}

impl AuthorizationRecord {
    /// A record with the given privileges and no join URL.
    pub fn new(identity: Identity, privileges: Vec<String>) -> Self {
        Self {
            identity,
            privileges,
            join_url: String::new(),
            imported: false,
        }
    }
}

/// Server-wide settings the authority returns with every pull.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Fallback link for clickable warnings when a record has no join URL.
    #[serde(default)]
    pub join_url: String,
    /// `false` until the host's pre-existing allow-list has been imported.
    #[serde(default)]
    pub whitelist_imported: bool,
}

/// An action the authority wants applied to an online player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub identity: Identity,
    pub action: DirectiveAction,
}

/// `#[serde(tag = "type")]` gives `{ "type": "kick", "message": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectiveAction {
    /// Disconnect the player.
    Kick { message: String },
    /// Plain in-game warning.
    Warn { message: String },
    /// Warning that links to the player's join/pass URL.
    WarnPass { message: String },
}

/// Everything one successful pull returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    #[serde(default)]
    pub server: ServerInfo,
    /// The full record set for this server. Replaces the local cache.
    #[serde(default)]
    pub records: Vec<AuthorizationRecord>,
    /// Actions to apply on the next reconciliation cycle.
    #[serde(default)]
    pub directives: Vec<Directive>,
}

// ---------------------------------------------------------------------------
// Outbound data (pushed to the authority)
// ---------------------------------------------------------------------------

/// Why a login was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No record exists for the identity.
    Unregistered,
    /// A record exists but carries no recognized mode token.
    NoModeGranted,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered => write!(f, "unregistered"),
            Self::NoModeGranted => write!(f, "no mode granted"),
        }
    }
}

/// A plugin/mod loaded by the host, reported in [`ServerDetails`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    /// Entry point (main class, crate name, ...). Empty when unknown.
    #[serde(default)]
    pub entry_point: String,
}

/// Announcement the host sends once the engine is up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDetails {
    /// Kind of host adapter, e.g. `mc-forge`.
    pub plugin_type: String,
    pub plugin_version: String,
    /// Game family the privileges are scoped to, e.g. `mc`.
    pub game_realm: String,
    pub game_version: String,
    /// Free-form version string including loader details.
    #[serde(default)]
    pub game_version_raw: String,
    #[serde(default)]
    pub plugins: Vec<PluginInfo>,
    /// Identities from the host's old allow-list, sent only while the
    /// authority reports `whitelist_imported == false`.
    #[serde(default)]
    pub whitelist_import: Vec<Identity>,
}

impl ServerDetails {
    pub fn add_plugin(
        &mut self,
        name: impl Into<String>,
        version: impl Into<String>,
        entry_point: impl Into<String>,
    ) {
        self.plugins.push(PluginInfo {
            name: name.into(),
            version: version.into(),
            entry_point: entry_point.into(),
        });
    }
}

/// Events queued on the tick path and flushed by the next sync iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    LoginGranted {
        identity: Identity,
        mode: ModeGrant,
    },
    LoginDenied {
        identity: Identity,
        reason: DenyReason,
    },
    ServerDetails(ServerDetails),
}

/// One online player as reported to the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlinePlayer {
    pub identity: Identity,
    pub name: String,
}

/// The push payload: who is online right now plus any queued events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceReport {
    /// Seconds since the Unix epoch when the snapshot was taken.
    pub taken_at: u64,
    pub players: Vec<OnlinePlayer>,
    #[serde(default)]
    pub events: Vec<OutboundEvent>,
}

impl PresenceReport {
    /// Builds a report stamped with the current wall-clock time.
    pub fn now(players: Vec<OnlinePlayer>, events: Vec<OutboundEvent>) -> Self {
        let taken_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            taken_at,
            players,
            events,
        }
    }

    /// The identities in this report, in report order.
    pub fn identities(&self) -> Vec<Identity> {
        self.players.iter().map(|p| p.identity).collect()
    }
}

// =========================================================================
// Tests
// =========================================================================
