//! Key-value persistence for fitted models.
//!
//! The selector only sees [`ModelStore`]: a scope key maps to an opaque blob.
//! The encoding lives in [`crate::artifact`].

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;

/// File extension of artifacts written by [`FileModelStore`]
pub const ARTIFACT_EXTENSION: &str = "model.json";

/// Errors from a model store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Key unusable as a storage name
    #[error("Invalid store key: {0:?}")]
    InvalidKey(String),

    /// Blob present but unreadable or incompatible
    #[error("Corrupt artifact for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Encoding error: {0}")]
    Encode(String),
}

/// Storage backend for fitted-model blobs, keyed by forecast scope
pub trait ModelStore: Send + Sync {
    /// Blob saved under `key`, if any
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the blob under `key`; concurrent writers to one key must not interleave
    fn save(&self, key: &str, blob: &[u8]) -> Result<(), StoreError>;

    /// Forget the blob under `key`; missing keys are not an error
    fn invalidate(&self, key: &str) -> Result<(), StoreError>;
}

fn check_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileModelStore {
    root: PathBuf,
}

impl FileModelStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact for `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        check_key(key)?;
        Ok(self.root.join(format!("{}.{}", key, ARTIFACT_EXTENSION)))
    }
}

impl ModelStore for FileModelStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, blob: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        // Write beside the target and rename, so readers never see a partial file
        let mut file = NamedTempFile::new_in(&self.root)?;
        file.write_all(blob)?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        log::debug!("Saved model artifact {}", path.display());
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Removed model artifact {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store, mostly for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }
}

impl ModelStore for MemoryModelStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        check_key(key)?;
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.get(key).cloned())
    }

    fn save(&self, key: &str, blob: &[u8]) -> Result<(), StoreError> {
        check_key(key)?;
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.insert(key.to_string(), blob.to_vec());
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), StoreError> {
        check_key(key)?;
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.remove(key);
        Ok(())
    }
}

/// Store that keeps nothing; every forecast fits from scratch
#[derive(Debug, Default, Clone, Copy)]
pub struct NullModelStore;

impl ModelStore for NullModelStore {
    fn load(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(None)
    }

    fn save(&self, _key: &str, _blob: &[u8]) -> Result<(), StoreError> {
        Ok(())
    }

    fn invalidate(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }
}
