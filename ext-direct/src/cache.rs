//! Discovery cache: persistent class-map storage with TTL.
//!
//! Discovery is cheap but not free, and the class map is immutable between
//! registry changes, so it is persisted under a single key with a lifetime.
//! Within the TTL every request is served the stored snapshot verbatim; on
//! expiry (or a cold store) exactly one concurrent caller re-runs discovery
//! while the rest wait on its result.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::CacheSettings;
use crate::error::{ConfigError, RouteError};
use crate::registry::{ActionRegistry, ClassMap};

/// Failure inside a cache store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    /// A persisted entry could not be encoded or decoded.
    #[error("store codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<StoreError> for RouteError {
    fn from(err: StoreError) -> Self {
        RouteError::Store(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent key/value store with TTL semantics.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Whether an unexpired entry exists for `key`.
    async fn contains(&self, key: &str) -> bool {
        matches!(self.fetch(key).await, Ok(Some(_)))
    }

    /// Fetch the entry for `key`, if present and unexpired.
    async fn fetch(&self, key: &str) -> StoreResult<Option<ClassMap>>;

    /// Persist `map` under `key` for `ttl`.
    async fn save(&self, key: &str, map: &ClassMap, ttl: Duration) -> StoreResult<()>;
}

struct StoredEntry {
    map: ClassMap,
    created_at: Instant,
    ttl: Duration,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// In-process cache store.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredEntry>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn fetch(&self, key: &str) -> StoreResult<Option<ClassMap>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                tracing::debug!(key = %key, "cache hit");
                return Ok(Some(entry.map.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired());
        tracing::debug!(key = %key, "cache miss");
        Ok(None)
    }

    async fn save(&self, key: &str, map: &ClassMap, ttl: Duration) -> StoreResult<()> {
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                map: map.clone(),
                created_at: Instant::now(),
                ttl,
            },
        );
        tracing::trace!(key = %key, ttl_ms = %ttl.as_millis(), "cache entry stored");
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct FileEntry {
    expires_at_ms: u64,
    map: ClassMap,
}

/// File-backed cache store: one JSON file per key under a directory.
///
/// Expiry is tracked as an absolute wall-clock timestamp so entries survive
/// process restarts.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store under `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ConfigError::CacheDir {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn fetch(&self, key: &str) -> StoreResult<Option<ClassMap>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(key = %key, "cache miss");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let entry: FileEntry = serde_json::from_slice(&bytes)?;
        if Self::now_ms() >= entry.expires_at_ms {
            tracing::debug!(key = %key, "cache entry expired");
            let _ = tokio::fs::remove_file(&path).await;
            return Ok(None);
        }

        tracing::debug!(key = %key, "cache hit");
        Ok(Some(entry.map))
    }

    async fn save(&self, key: &str, map: &ClassMap, ttl: Duration) -> StoreResult<()> {
        let entry = FileEntry {
            expires_at_ms: Self::now_ms().saturating_add(ttl.as_millis() as u64),
            map: map.clone(),
        };
        let bytes = serde_json::to_vec(&entry)?;
        tokio::fs::write(self.path_for(key), bytes).await?;
        tracing::trace!(key = %key, ttl_ms = %ttl.as_millis(), "cache entry stored");
        Ok(())
    }
}

/// Class-map resolution with caching and single-flight discovery.
pub struct DiscoveryCache {
    registry: Arc<ActionRegistry>,
    store: Arc<dyn CacheStore>,
    key: String,
    ttl: Duration,
    flight: Mutex<()>,
}

impl DiscoveryCache {
    /// Wrap a registry and store with the given settings.
    pub fn new(
        registry: Arc<ActionRegistry>,
        store: Arc<dyn CacheStore>,
        settings: &CacheSettings,
    ) -> Self {
        Self {
            registry,
            store,
            key: settings.key.clone(),
            ttl: settings.ttl,
            flight: Mutex::new(()),
        }
    }

    /// Resolve the class map: stored snapshot within the TTL, else one
    /// discovery pass.
    ///
    /// Concurrent misses serialize on an internal guard and re-check the
    /// store after acquiring it, so at most one discovery pass runs per
    /// expiry window.
    pub async fn resolve(&self) -> Result<ClassMap, RouteError> {
        if let Some(map) = self.store.fetch(&self.key).await? {
            return Ok(map);
        }

        let _guard = self.flight.lock().await;
        if let Some(map) = self.store.fetch(&self.key).await? {
            return Ok(map);
        }

        let map = self.registry.snapshot();
        self.store.save(&self.key, &map, self.ttl).await?;
        Ok(map)
    }
}
