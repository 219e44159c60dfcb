//! Privilege parsing: authority tokens → concrete host actions.
//!
//! Two token shapes are recognized, both under the `mc:` realm prefix:
//!
//! | Token | Meaning |
//! |---|---|
//! | `mc:<mode>` | grant a game mode (`default`, `survival`, `creative`, `adventure`, `spectator`) |
//! | `mc:/<template>` | run a server command after substituting `$name` and `$uuid` |
//!
//! The shapes can't overlap: a mode name is lowercase letters only, a
//! command always starts with `/`. Anything else is skipped so newer
//! authority tags don't break older hosts.

use std::fmt::Write as _;

use passgate_protocol::{Identity, ModeGrant};

/// Realm prefix shared by every token this crate understands.
pub const REALM_PREFIX: &str = "mc:";

/// The result of parsing one record's privileges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPrivileges {
    /// The last recognized mode token, if any. `None` means no mode was
    /// granted at all, which denies access.
    pub mode: Option<ModeGrant>,
    /// Rendered commands, in record order.
    pub commands: Vec<String>,
    /// How many tokens were recognized (known modes plus commands).
    pub recognized: usize,
}

impl ParsedPrivileges {
    /// Whether at least one token was understood.
    pub fn has_recognized_token(&self) -> bool {
        self.recognized > 0
    }
}

/// A token that matched one of the two shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Mode(&'a str),
    Command(&'a str),
}

fn classify(raw: &str) -> Option<Token<'_>> {
    let rest = raw.strip_prefix(REALM_PREFIX)?;
    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_lowercase()) {
        return Some(Token::Mode(rest));
    }
    rest.strip_prefix('/').map(Token::Command)
}

/// Parses privilege tokens in order.
///
/// Later mode tokens override earlier ones; commands accumulate. Mode
/// tokens naming an unknown mode are ignored and don't clear an earlier
/// grant. An empty command template (`mc:/`) is ignored.
pub fn parse<S: AsRef<str>>(privileges: &[S], identity: Identity, name: &str) -> ParsedPrivileges {
    let mut parsed = ParsedPrivileges::default();

    for raw in privileges {
        match classify(raw.as_ref()) {
            Some(Token::Mode(mode_name)) => {
                if let Some(grant) = ModeGrant::from_name(mode_name) {
                    parsed.mode = Some(grant);
                    parsed.recognized += 1;
                }
            }
            Some(Token::Command(template)) if !template.trim().is_empty() => {
                parsed.commands.push(render_command(template, identity, name));
                parsed.recognized += 1;
            }
            _ => {}
        }
    }

    parsed
}

/// Substitutes `$name` and `$uuid` in a command template.
///
/// Single left-to-right pass: text that was substituted in is never
/// rescanned, so a display name containing `$uuid` stays as typed. Any
/// other `$` sequence is copied through untouched.
pub fn render_command(template: &str, identity: Identity, name: &str) -> String {
    let mut out = String::with_capacity(template.len() + name.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("$name") {
            out.push_str(name);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("$uuid") {
            let _ = write!(out, "{identity}");
            rest = after;
        } else {
            out.push('$');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use passgate_protocol::GameMode;

    use super::*;

    fn alice() -> Identity {
        Identity::from_u128(0xA11CE)
    }

    fn parse_alice(privs: &[&str]) -> ParsedPrivileges {
        parse(privs, alice(), "Alice")
    }

    #[test]
    fn test_parse_mode_and_command_scenario() {
        let parsed = parse_alice(&["mc:survival", "mc:/gamemode $name 1"]);

        assert_eq!(parsed.mode, Some(ModeGrant::Set(GameMode::Survival)));
        assert_eq!(parsed.commands, vec!["gamemode Alice 1".to_string()]);
        assert_eq!(parsed.recognized, 2);
    }

    #[test]
    fn test_parse_last_mode_wins() {
        let parsed = parse_alice(&["mc:creative", "mc:default"]);
        assert_eq!(parsed.mode, Some(ModeGrant::Unchanged));

        let parsed = parse_alice(&["mc:default", "mc:adventure", "mc:survival", "mc:spectator"]);
        assert_eq!(parsed.mode, Some(ModeGrant::Set(GameMode::Spectator)));
    }

    #[test]
    fn test_parse_unknown_mode_does_not_override() {
        let parsed = parse_alice(&["mc:creative", "mc:hardcore"]);
        assert_eq!(parsed.mode, Some(ModeGrant::Set(GameMode::Creative)));
        assert_eq!(parsed.recognized, 1);
    }

    #[test]
    fn test_parse_empty_input() {
        let parsed = parse_alice(&[]);
        assert_eq!(parsed, ParsedPrivileges::default());
        assert!(!parsed.has_recognized_token());
    }

    #[test]
    fn test_parse_ignores_unrecognized_tags() {
        let parsed = parse_alice(&[
            "bedrock:creative",
            "mc:",
            "mc:Creative",
            "mc:survival2",
            "MC:survival",
            "mc:/",
            "  mc:survival",
        ]);
        assert_eq!(parsed.mode, None);
        assert!(parsed.commands.is_empty());
        assert!(!parsed.has_recognized_token());
    }

    #[test]
    fn test_parse_commands_accumulate_in_order() {
        let parsed = parse_alice(&[
            "mc:/say hello $name",
            "mc:survival",
            "mc:/give $name diamond 1",
            "mc:/tag $uuid add vip",
        ]);
        assert_eq!(
            parsed.commands,
            vec![
                "say hello Alice".to_string(),
                "give Alice diamond 1".to_string(),
                format!("tag {} add vip", alice()),
            ]
        );
    }

    #[test]
    fn test_parse_commands_only_leaves_mode_unset() {
        let parsed = parse_alice(&["mc:/say hi"]);
        assert_eq!(parsed.mode, None);
        assert_eq!(parsed.commands.len(), 1);
        assert!(parsed.has_recognized_token());
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let id = Identity::from_u128(1);
        let out = render_command("$name $uuid $name$uuid", id, "Bob");
        assert_eq!(
            out,
            "Bob 00000000-0000-0000-0000-000000000001 Bob00000000-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn test_render_leaves_other_placeholders_alone() {
        let out = render_command("say $world $ $$name $UUID", alice(), "Alice");
        assert_eq!(out, "say $world $ $Alice $UUID");
    }

    #[test]
    fn test_render_does_not_rescan_substituted_name() {
        let id = Identity::from_u128(2);
        let out = render_command("msg $name", id, "$uuid");
        assert_eq!(out, "msg $uuid");
    }

    #[test]
    fn test_render_without_placeholders_is_identity() {
        assert_eq!(render_command("time set day", alice(), "Alice"), "time set day");
    }
}
