//! The local authorization cache and its on-disk copy.
//!
//! Readers (the login path) and the writer (the sync task) never share a
//! mutable record set. The writer builds a complete [`CacheState`] and swaps
//! the `Arc` in one step; readers keep whatever `Arc` they already hold.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use passgate_protocol::{AuthorizationRecord, Codec, Identity, JsonCodec, ProtocolError, ServerInfo};
use serde::{Deserialize, Serialize};

use crate::CacheError;

// ---------------------------------------------------------------------------
// CacheState
// ---------------------------------------------------------------------------

/// One complete, immutable generation of authorization data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheState {
    pub server: ServerInfo,
    pub records: HashMap<Identity, AuthorizationRecord>,
    /// Bumped on every swap. 0 means nothing has been loaded yet.
    pub generation: u64,
}

impl CacheState {
    /// Builds a state from a pulled record list. A later record for the
    /// same identity replaces an earlier one.
    pub fn from_records(
        server: ServerInfo,
        records: impl IntoIterator<Item = AuthorizationRecord>,
        generation: u64,
    ) -> Self {
        let records = records.into_iter().map(|r| (r.identity, r)).collect();
        Self {
            server,
            records,
            generation,
        }
    }

    /// The join URL to show this player: their own, else the server's.
    pub fn join_url_for(&self, identity: &Identity) -> &str {
        self.records
            .get(identity)
            .map(|r| r.join_url.as_str())
            .filter(|url| !url.is_empty())
            .unwrap_or(self.server.join_url.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuthCache
// ---------------------------------------------------------------------------

/// Read-through cache of [`AuthorizationRecord`]s.
#[derive(Debug, Default)]
pub struct AuthCache {
    current: RwLock<Arc<CacheState>>,
}

impl AuthCache {
    /// An empty cache (generation 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache pre-filled from a previously persisted state.
    pub fn with_state(state: CacheState) -> Self {
        Self {
            current: RwLock::new(Arc::new(state)),
        }
    }

    /// The current generation. Never blocks on the writer's network work.
    pub fn state(&self) -> Arc<CacheState> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Looks up one identity. `None` is a normal answer: the player simply
    /// isn't registered with the authority.
    pub fn lookup(&self, identity: &Identity) -> Option<AuthorizationRecord> {
        self.state().records.get(identity).cloned()
    }

    /// Swaps in a new record set and returns its generation.
    pub fn replace(
        &self,
        server: ServerInfo,
        records: impl IntoIterator<Item = AuthorizationRecord>,
    ) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let generation = guard.generation + 1;
        *guard = Arc::new(CacheState::from_records(server, records, generation));
        generation
    }

    /// Swaps in an already-built state, stamping it with the next
    /// generation.
    pub fn install(&self, mut state: CacheState) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        state.generation = guard.generation + 1;
        let generation = state.generation;
        *guard = Arc::new(state);
        generation
    }

    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    pub fn len(&self) -> usize {
        self.state().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// CacheStore (persistence)
// ---------------------------------------------------------------------------

/// On-disk shape. Records are a sorted list so the file diffs cleanly.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    server: ServerInfo,
    #[serde(default)]
    records: Vec<AuthorizationRecord>,
}

/// Persists cache states to a file.
///
/// Writes go to `<path>.tmp` first and are renamed over the real file, so a
/// crash mid-write leaves the previous file intact instead of a truncated
/// one.
#[derive(Debug, Clone)]
pub struct CacheStore<C: Codec = JsonCodec> {
    path: PathBuf,
    codec: C,
}

impl CacheStore<JsonCodec> {
    /// A JSON store at `path`.
    pub fn json(path: impl Into<PathBuf>) -> Self {
        Self::new(path, JsonCodec)
    }
}

impl<C: Codec> CacheStore<C> {
    pub fn new(path: impl Into<PathBuf>, codec: C) -> Self {
        Self {
            path: path.into(),
            codec,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Reads the persisted state. `Ok(None)` if no file exists yet.
    ///
    /// The loaded state has generation 0; installing it into a cache bumps
    /// it like any other swap. `save` writes each identity once, so a file
    /// listing one twice was edited or damaged and is rejected.
    pub fn load(&self) -> Result<Option<CacheState>, CacheError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let file: CacheFile = self.codec.decode(&bytes)?;

        let mut seen = HashSet::with_capacity(file.records.len());
        if let Some(dup) = file.records.iter().find(|r| !seen.insert(r.identity)) {
            return Err(ProtocolError::Invalid(format!("duplicate record for {}", dup.identity)).into());
        }

        Ok(Some(CacheState::from_records(file.server, file.records, 0)))
    }

    /// Writes a state to disk (temp file, then rename).
    pub async fn save(&self, state: &CacheState) -> Result<(), CacheError> {
        let mut records: Vec<AuthorizationRecord> = state.records.values().cloned().collect();
        records.sort_by_key(|r| r.identity);
        let file = CacheFile {
            server: state.server.clone(),
            records,
        };
        let bytes = self.codec.encode(&file)?;

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        tracing::debug!(path = %self.path.display(), records = file.records.len(), "cache persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Identity {
        Identity::from_u128(n)
    }

    fn record(n: u128, privs: &[&str]) -> AuthorizationRecord {
        AuthorizationRecord::new(id(n), privs.iter().map(|s| s.to_string()).collect())
    }

    fn temp_file(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("passgate-{tag}-{}.json", uuid::Uuid::new_v4()))
    }

    // =====================================================================
    // AuthCache
    // =====================================================================

    #[test]
    fn test_new_cache_is_empty_generation_zero() {
        let cache = AuthCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.generation(), 0);
        assert!(cache.lookup(&id(1)).is_none());
    }

    #[test]
    fn test_replace_swaps_whole_set_and_bumps_generation() {
        let cache = AuthCache::new();
        cache.replace(ServerInfo::default(), vec![record(1, &["mc:survival"])]);

        let generation = cache.replace(ServerInfo::default(), vec![record(2, &["mc:creative"])]);

        assert_eq!(generation, 2);
        assert!(cache.lookup(&id(1)).is_none(), "old records must be gone");
        assert_eq!(cache.lookup(&id(2)).unwrap().privileges, vec!["mc:creative"]);
    }

    #[test]
    fn test_reader_keeps_old_state_across_swap() {
        let cache = AuthCache::new();
        cache.replace(ServerInfo::default(), vec![record(1, &["mc:survival"])]);
        let held = cache.state();

        cache.replace(ServerInfo::default(), Vec::new());

        assert_eq!(held.records.len(), 1);
        assert_eq!(held.generation, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_install_stamps_next_generation() {
        let cache = AuthCache::new();
        cache.replace(ServerInfo::default(), Vec::new());

        let state = CacheState::from_records(ServerInfo::default(), vec![record(1, &[])], 99);
        assert_eq!(cache.install(state), 2);
        assert_eq!(cache.generation(), 2);
    }

    #[test]
    fn test_join_url_for_falls_back_to_server() {
        let mut with_url = record(1, &[]);
        with_url.join_url = "https://pass.example/p/1".into();
        let state = CacheState::from_records(
            ServerInfo {
                join_url: "https://pass.example/server".into(),
                whitelist_imported: true,
            },
            vec![with_url, record(2, &[])],
            1,
        );

        assert_eq!(state.join_url_for(&id(1)), "https://pass.example/p/1");
        assert_eq!(state.join_url_for(&id(2)), "https://pass.example/server");
        assert_eq!(state.join_url_for(&id(3)), "https://pass.example/server");
    }

    // =====================================================================
    // CacheStore
    // =====================================================================

    #[test]
    fn test_load_missing_file_is_none() {
        let store = CacheStore::json(temp_file("missing"));
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_restores_records() {
        let path = temp_file("roundtrip");
        let store = CacheStore::json(&path);
        let state = CacheState::from_records(
            ServerInfo {
                join_url: "https://pass.example".into(),
                whitelist_imported: false,
            },
            vec![record(2, &["mc:creative"]), record(1, &["mc:survival", "mc:/say hi"])],
            5,
        );

        store.save(&state).await.unwrap();
        let loaded = store.load().unwrap().expect("file should exist");

        assert_eq!(loaded.server, state.server);
        assert_eq!(loaded.records, state.records);
        assert_eq!(loaded.generation, 0);
        assert!(!store.temp_path().exists(), "temp file should be renamed away");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_corrupt_file_is_codec_error() {
        let path = temp_file("corrupt");
        std::fs::write(&path, b"{\"records\": [").unwrap();

        let result = CacheStore::json(&path).load();

        assert!(matches!(result, Err(CacheError::Codec(_))));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_duplicate_identity_is_invalid() {
        let path = temp_file("duplicate");
        let one = id(1);
        let body = format!(
            r#"{{"records": [{{"identity": "{one}", "privileges": ["mc:survival"]}}, {{"identity": "{one}", "privileges": []}}]}}"#
        );
        std::fs::write(&path, body).unwrap();

        let result = CacheStore::json(&path).load();

        assert!(matches!(result, Err(CacheError::Codec(ProtocolError::Invalid(_)))));
        let _ = std::fs::remove_file(&path);
    }
}
