//! The remote authority seam.
//!
//! Passgate doesn't speak any particular authority API. HTTP transport,
//! request signing, retries and backoff all belong to whoever implements
//! [`RemoteAuthority`]. The background sync task only needs two calls:
//! push what we know, pull what the authority decided.

use passgate_protocol::{Identity, PresenceReport, SyncPayload};

use crate::AuthorityError;

/// Source of truth for authorization data.
///
/// `Send + Sync + 'static` because the implementation lives inside the
/// background sync task for the life of the process.
///
/// # Example
///
/// ```rust
/// use passgate_auth::{AuthorityError, RemoteAuthority};
/// use passgate_protocol::{
///     AuthorizationRecord, Identity, PresenceReport, SyncPayload,
/// };
///
/// /// Lets everyone in as survival. Only for local testing.
/// struct OpenAuthority;
///
/// impl RemoteAuthority for OpenAuthority {
///     async fn pull(
///         &self,
///         online: &[Identity],
///     ) -> Result<SyncPayload, AuthorityError> {
///         let records = online
///             .iter()
///             .map(|id| AuthorizationRecord::new(*id, vec!["mc:survival".into()]))
///             .collect();
///         Ok(SyncPayload { records, ..SyncPayload::default() })
///     }
///
///     async fn push(&self, _report: &PresenceReport) -> Result<(), AuthorityError> {
///         Ok(())
///     }
/// }
/// ```
pub trait RemoteAuthority: Send + Sync + 'static {
    /// Fetches the current record set for this server.
    ///
    /// `online` lists the identities connected right now so the authority
    /// can prioritize them. The returned records replace the whole local
    /// cache, so the authority should return every record for the server,
    /// not just the online ones.
    fn pull(
        &self,
        online: &[Identity],
    ) -> impl std::future::Future<Output = Result<SyncPayload, AuthorityError>> + Send;

    /// Sends the online-player snapshot plus queued events.
    ///
    /// Best effort. A failed push is logged and its events are dropped.
    fn push(
        &self,
        report: &PresenceReport,
    ) -> impl std::future::Future<Output = Result<(), AuthorityError>> + Send;
}
