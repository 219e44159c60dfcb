//! The host adapter seam.
//!
//! Passgate never touches the game server directly. Everything it wants
//! done to a player (mode change, kick, warning, a console command) goes
//! through an [`ActionSink`] the host hands to the engine at construction.
//!
//! All calls happen on the host's tick path, so implementations must return
//! quickly and must not block on I/O.

use std::collections::HashMap;

use passgate_protocol::{GameMode, Identity};

/// Why a host action didn't happen. Logged by the caller, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The player left between the decision and the action.
    #[error("player {0} is not online")]
    PlayerOffline(Identity),

    /// The host refused or failed to perform the action.
    #[error("host action failed: {0}")]
    Host(String),
}

/// Capabilities the engine needs from the game server.
///
/// The player-facing calls (`kick_player`, `warn_player`,
/// `warn_player_pass`) are infallible by contract: if the player is gone
/// they do nothing.
pub trait ActionSink {
    /// Who the host believes is online right now, with display names.
    fn current_players(&self) -> HashMap<Identity, String>;

    /// The player's current game mode, or `None` if they aren't online.
    fn current_mode(&self, identity: &Identity) -> Option<GameMode>;

    fn set_mode(&mut self, identity: &Identity, mode: GameMode) -> Result<(), ActionError>;

    /// Refreshes the host's own allow-list from what the last sync produced.
    fn update_and_reload_local_auth(&mut self) -> Result<(), ActionError>;

    fn kick_player(&mut self, identity: &Identity, message: &str);

    fn warn_player(&mut self, identity: &Identity, message: &str);

    /// Sends a warning the player can click to open `join_url`.
    fn warn_player_pass(&mut self, identity: &Identity, message: &str, join_url: &str);

    /// Runs a fully rendered command with server privilege.
    fn execute_command(&mut self, command: &str) -> Result<(), ActionError>;
}
