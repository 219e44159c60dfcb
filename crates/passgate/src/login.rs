//! Per-connection access decisions.
//!
//! Every connect event ends in exactly one [`LoginDecision`]. The decision
//! is made from the local cache only; the connect path never waits on the
//! network.

use std::sync::Arc;

use passgate_auth::{AuthCache, privilege};
use passgate_protocol::{DenyReason, Identity, ModeGrant, OutboundEvent};
use passgate_session::SessionRegistry;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::ActionSink;

/// Kick message for identities the authority has no record of. Says
/// nothing about whether the identity is known anywhere else.
pub const NOT_PERMITTED_MESSAGE: &str = "You are not permitted to join this server.";

/// Kick message for a record that grants no game mode.
pub const NO_MODE_MESSAGE: &str = "Your current authorization does not permit access to this server.";

/// Whether record commands run when the login is denied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPolicy {
    /// Run commands whenever a record was found, even if access is denied.
    #[default]
    Always,
    /// Run commands only for granted logins.
    GrantedOnly,
}

/// The outcome of one connect event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginDecision {
    Granted {
        mode: ModeGrant,
        /// Whether `set_mode` was actually called.
        mode_changed: bool,
        commands_run: usize,
    },
    Denied {
        reason: DenyReason,
        commands_run: usize,
    },
}

impl LoginDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    pub fn commands_run(&self) -> usize {
        match self {
            Self::Granted { commands_run, .. } | Self::Denied { commands_run, .. } => *commands_run,
        }
    }

    /// The event reported to the authority for this decision.
    pub fn to_event(&self, identity: Identity) -> OutboundEvent {
        match self {
            Self::Granted { mode, .. } => OutboundEvent::LoginGranted {
                identity,
                mode: *mode,
            },
            Self::Denied { reason, .. } => OutboundEvent::LoginDenied {
                identity,
                reason: *reason,
            },
        }
    }
}

/// Turns connect events into access decisions and host actions.
#[derive(Debug)]
pub struct LoginResolver {
    registry: Arc<SessionRegistry>,
    cache: Arc<AuthCache>,
    policy: CommandPolicy,
}

impl LoginResolver {
    pub fn new(registry: Arc<SessionRegistry>, cache: Arc<AuthCache>, policy: CommandPolicy) -> Self {
        Self {
            registry,
            cache,
            policy,
        }
    }

    pub fn policy(&self) -> CommandPolicy {
        self.policy
    }

    /// Handles one connect event.
    ///
    /// The session is registered before anything else, so a denied player
    /// still shows as connected until the kick lands.
    pub fn resolve<S: ActionSink>(&self, sink: &mut S, identity: Identity, name: &str) -> LoginDecision {
        self.registry.add(identity, name);

        let Some(record) = self.cache.lookup(&identity) else {
            debug!(%identity, name, "no authorization record");
            sink.kick_player(&identity, NOT_PERMITTED_MESSAGE);
            return LoginDecision::Denied {
                reason: DenyReason::Unregistered,
                commands_run: 0,
            };
        };

        let parsed = privilege::parse(&record.privileges, identity, name);

        let mut decision = match parsed.mode {
            Some(grant) => LoginDecision::Granted {
                mode: grant,
                mode_changed: self.apply_mode(sink, identity, grant),
                commands_run: 0,
            },
            None => {
                sink.kick_player(&identity, NO_MODE_MESSAGE);
                LoginDecision::Denied {
                    reason: DenyReason::NoModeGranted,
                    commands_run: 0,
                }
            }
        };

        let run_commands = decision.is_granted() || self.policy == CommandPolicy::Always;
        if run_commands {
            let ran = run_all(sink, identity, &parsed.commands);
            match &mut decision {
                LoginDecision::Granted { commands_run, .. }
                | LoginDecision::Denied { commands_run, .. } => *commands_run = ran,
            }
        } else if !parsed.commands.is_empty() {
            debug!(%identity, skipped = parsed.commands.len(), "login denied, skipping commands");
        }

        match &decision {
            LoginDecision::Granted { mode, .. } => info!(%identity, name, ?mode, "login granted"),
            LoginDecision::Denied { reason, .. } => info!(%identity, name, %reason, "login denied"),
        }

        decision
    }

    /// Sets a concrete mode if it differs from the current one. The
    /// `default` grant never changes anything.
    fn apply_mode<S: ActionSink>(&self, sink: &mut S, identity: Identity, grant: ModeGrant) -> bool {
        let Some(mode) = grant.concrete() else {
            return false;
        };
        if sink.current_mode(&identity) == Some(mode) {
            return false;
        }
        match sink.set_mode(&identity, mode) {
            Ok(()) => true,
            Err(e) => {
                warn!(%identity, %mode, error = %e, "failed to set game mode");
                false
            }
        }
    }
}

/// Runs commands in order. A failing command doesn't stop the rest.
/// Returns how many were attempted.
fn run_all<S: ActionSink>(sink: &mut S, identity: Identity, commands: &[String]) -> usize {
    for command in commands {
        if let Err(e) = sink.execute_command(command) {
            warn!(%identity, command = %command, error = %e, "record command failed");
        }
    }
    commands.len()
}
