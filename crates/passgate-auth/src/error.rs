//! Error types for the authorization layer.

use std::path::PathBuf;

use passgate_protocol::ProtocolError;

/// Errors a [`RemoteAuthority`](crate::RemoteAuthority) can report.
///
/// None of these ever reach the tick path. The sync task logs them and
/// tries again on its next iteration.
#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    /// The authority couldn't be reached (network down, timeout, 5xx).
    #[error("authority unavailable: {0}")]
    Unavailable(String),

    /// The authority answered but refused the request (bad credentials,
    /// unknown server id).
    #[error("authority rejected request: {0}")]
    Rejected(String),

    /// The authority answered with something we couldn't interpret.
    #[error("malformed authority response: {0}")]
    Malformed(String),
}

/// Errors while loading or persisting the local cache file.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Codec(#[from] ProtocolError),
}
