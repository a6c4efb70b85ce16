//! Embedding cache keyed by exact text equality.
//!
//! A cache hit means a previously *successful* embedding call — failed
//! calls never populate the cache. Entries are append-only with no TTL;
//! content strings are low-cardinality per business record, so unbounded
//! growth is acceptable.
//!
//! The file-backed cache is write-through: every `put` persists before it
//! returns, so a crash mid-batch loses at most the in-flight entry. It
//! assumes a **single writer** — concurrent sync runs against the same
//! cache file are out of contract and must be serialized by the
//! deployment, not by this code.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info};

use crate::error::EmbeddingError;

/// Text→vector memo shared by the embedding pipeline.
pub trait EmbeddingCache: Send + Sync {
    /// Look up a previously embedded text.
    fn get(&self, text: &str) -> Option<Vec<f32>>;

    /// Store a successful embedding. Write-through implementations
    /// persist before returning.
    fn put(&self, text: &str, vector: Vec<f32>) -> Result<(), EmbeddingError>;

    /// Number of cached entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Volatile cache for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EmbeddingCache for InMemoryCache {
    fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(text).cloned())
    }

    fn put(&self, text: &str, vector: Vec<f32>) -> Result<(), EmbeddingError> {
        self.entries
            .write()
            .map_err(|_| EmbeddingError::Cache("cache lock poisoned".into()))?
            .insert(text.to_string(), vector);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }
}

/// Durable JSON-file cache, loaded once at open and flushed after every
/// successful write.
pub struct FileCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

impl FileCache {
    /// Open (or create) a cache file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EmbeddingError> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let bytes = std::fs::read(&path)?;
            let loaded: HashMap<String, Vec<f32>> = serde_json::from_slice(&bytes)?;
            info!(path = %path.display(), entries = loaded.len(), "Loaded embedding cache");
            loaded
        } else {
            debug!(path = %path.display(), "Starting with empty embedding cache");
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn flush(&self, entries: &HashMap<String, Vec<f32>>) -> Result<(), EmbeddingError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec(entries)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

impl EmbeddingCache for FileCache {
    fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(text).cloned())
    }

    fn put(&self, text: &str, vector: Vec<f32>) -> Result<(), EmbeddingError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| EmbeddingError::Cache("cache lock poisoned".into()))?;
        entries.insert(text.to_string(), vector);
        self.flush(&entries)
    }

    fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }
}
