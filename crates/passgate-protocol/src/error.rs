//! Error types for the protocol layer.

/// Errors raised while encoding or decoding Passgate data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed, truncated, or wrong shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Data decoded fine but breaks a protocol rule.
    #[error("invalid data: {0}")]
    Invalid(String),
}
