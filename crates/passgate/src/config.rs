//! TOML configuration.
//!
//! ```toml
//! debug = false
//!
//! [authority]
//! api_host = "https://api.example.net"
//! server_id = "4f1c..."
//! server_secret = "..."
//!
//! [cycle]
//! cycle_seconds = 2
//! host_ticks_per_second = 20
//!
//! [sync]
//! interval_secs = 10
//! initial_jitter_ms = 500
//! shutdown_grace_secs = 5
//! cache_path = "passgate-cache.json"
//!
//! [login]
//! command_policy = "always"   # or "granted_only"
//! ```
//!
//! Every section is optional except `[authority]`, whose three settings
//! must be present and non-empty.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use passgate_auth::SyncConfig;
use passgate_tick::CycleConfig;
use serde::Deserialize;

use crate::{CommandPolicy, ConfigError};

/// Where the authority lives and how this server identifies itself to it.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    pub api_host: String,
    pub server_id: String,
    pub server_secret: String,
}

impl fmt::Debug for AuthorityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityConfig")
            .field("api_host", &self.api_host)
            .field("server_id", &self.server_id)
            .field("server_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CycleSection {
    pub cycle_seconds: u32,
    pub host_ticks_per_second: u32,
}

impl Default for CycleSection {
    fn default() -> Self {
        Self {
            cycle_seconds: 2,
            host_ticks_per_second: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub interval_secs: u64,
    pub initial_jitter_ms: u64,
    pub shutdown_grace_secs: u64,
    /// No persistence when unset.
    pub cache_path: Option<PathBuf>,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            initial_jitter_ms: 500,
            shutdown_grace_secs: 5,
            cache_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginSection {
    pub command_policy: CommandPolicy,
}

/// Top-level Passgate configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PassgateConfig {
    /// Lowers the default log level to `debug`.
    pub debug: bool,
    pub authority: AuthorityConfig,
    pub cycle: CycleSection,
    pub sync: SyncSection,
    pub login: LoginSection,
}

impl PassgateConfig {
    /// Reads, parses and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything the engine can't run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let auth = &self.authority;
        if auth.api_host.trim().is_empty() {
            return Err(ConfigError::Missing("authority.api_host"));
        }
        if !(auth.api_host.starts_with("https://") || auth.api_host.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                field: "authority.api_host",
                reason: format!("expected an http(s) URL, got {:?}", auth.api_host),
            });
        }
        if auth.server_id.trim().is_empty() {
            return Err(ConfigError::Missing("authority.server_id"));
        }
        if auth.server_secret.is_empty() {
            return Err(ConfigError::Missing("authority.server_secret"));
        }

        if self.cycle.cycle_seconds == 0 {
            return Err(zero("cycle.cycle_seconds"));
        }
        if self.cycle.host_ticks_per_second == 0 {
            return Err(zero("cycle.host_ticks_per_second"));
        }
        if self.sync.interval_secs == 0 {
            return Err(zero("sync.interval_secs"));
        }
        Ok(())
    }

    pub fn to_cycle_config(&self) -> CycleConfig {
        CycleConfig {
            cycle_seconds: self.cycle.cycle_seconds,
            host_ticks_per_second: self.cycle.host_ticks_per_second,
        }
    }

    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            interval: Duration::from_secs(self.sync.interval_secs),
            initial_jitter: Duration::from_millis(self.sync.initial_jitter_ms),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.sync.shutdown_grace_secs)
    }
}

fn zero(field: &'static str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: "must be greater than zero".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [authority]
        api_host = "https://api.example.net"
        server_id = "srv-1"
        server_secret = "s3cret"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = PassgateConfig::from_toml_str(MINIMAL).unwrap();

        assert!(!config.debug);
        assert_eq!(config.to_cycle_config().ticks_per_cycle(), 40);
        assert_eq!(config.to_sync_config(), SyncConfig::default());
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
        assert!(config.sync.cache_path.is_none());
        assert_eq!(config.login.command_policy, CommandPolicy::Always);
    }

    #[test]
    fn test_full_config_overrides_every_section() {
        let text = format!(
            "debug = true\n{MINIMAL}\n{}",
            r#"
            [cycle]
            cycle_seconds = 5
            host_ticks_per_second = 10

            [sync]
            interval_secs = 30
            initial_jitter_ms = 0
            shutdown_grace_secs = 1
            cache_path = "/var/lib/passgate/cache.json"

            [login]
            command_policy = "granted_only"
            "#
        );

        let config = PassgateConfig::from_toml_str(&text).unwrap();

        assert!(config.debug);
        assert_eq!(config.to_cycle_config().ticks_per_cycle(), 50);
        assert_eq!(config.to_sync_config().interval, Duration::from_secs(30));
        assert_eq!(config.to_sync_config().initial_jitter, Duration::ZERO);
        assert_eq!(
            config.sync.cache_path.as_deref(),
            Some(Path::new("/var/lib/passgate/cache.json"))
        );
        assert_eq!(config.login.command_policy, CommandPolicy::GrantedOnly);
    }

    #[test]
    fn test_validate_rejects_missing_endpoint() {
        let err = PassgateConfig::from_toml_str(
            r#"
            [authority]
            server_id = "srv-1"
            server_secret = "s3cret"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("authority.api_host")));
    }

    #[test]
    fn test_validate_rejects_missing_credentials() {
        let err = PassgateConfig::from_toml_str(
            r#"
            [authority]
            api_host = "https://api.example.net"
            server_id = "srv-1"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("authority.server_secret")));

        assert!(matches!(
            PassgateConfig::default().validate(),
            Err(ConfigError::Missing("authority.api_host"))
        ));
    }

    #[test]
    fn test_validate_rejects_non_http_endpoint() {
        let err = PassgateConfig::from_toml_str(
            r#"
            [authority]
            api_host = "api.example.net"
            server_id = "srv-1"
            server_secret = "s3cret"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "authority.api_host", .. }));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let text = format!("{MINIMAL}\n[sync]\ninterval_secs = 0\n");
        let err = PassgateConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "sync.interval_secs", .. }));
    }

    #[test]
    fn test_unknown_command_policy_is_parse_error() {
        let text = format!("{MINIMAL}\n[login]\ncommand_policy = \"sometimes\"\n");
        let err = PassgateConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = PassgateConfig::load("/nonexistent/passgate.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_debug_output_redacts_secret() {
        let config = PassgateConfig::from_toml_str(MINIMAL).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("srv-1"));
    }
}
