//! Unified error type for Passgate.

use std::path::PathBuf;

use passgate_auth::{AuthorityError, CacheError};
use passgate_protocol::ProtocolError;

/// A configuration problem. Fatal: the engine refuses to start with one.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is empty or absent.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    /// A setting is present but unusable.
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PassgateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Only surfaced by direct calls; the sync task logs these itself.
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// `start` was called on an engine whose sync task is already running.
    #[error("background sync is already running")]
    AlreadyStarted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_error() {
        let err: PassgateError = ConfigError::Missing("authority.api_host").into();
        assert!(matches!(err, PassgateError::Config(_)));
        assert!(err.to_string().contains("authority.api_host"));
    }

    #[test]
    fn test_from_authority_error() {
        let err: PassgateError = AuthorityError::Unavailable("timeout".into()).into();
        assert!(matches!(err, PassgateError::Authority(_)));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: PassgateError = ProtocolError::Invalid("bad".into()).into();
        assert!(matches!(err, PassgateError::Protocol(_)));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_err = toml::from_str::<toml::Table>("debug = ").unwrap_err();
        let err: PassgateError = ConfigError::from(toml_err).into();
        assert!(err.to_string().starts_with("malformed config"));
    }
}
