//! The backend contract (`KVStore`) and two ready-to-use implementations.
//!
//! The backend is explicitly out of scope for the chunk-tree engine itself
//! (see the crate-level docs) — it is any untrusted point get/put/delete/contains
//! store. This module defines the trait the engine is generic over, plus an
//! in-memory implementation for tests/embedding and a filesystem-backed one
//! for standalone use.

use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Synchronous point key-value store contract.
///
/// Keys and values are opaque byte sequences. All four operations are
/// synchronous; the engine never performs concurrent backend calls from a
/// single operation (see the crate-level concurrency notes).
pub trait KVStore {
    /// Error type surfaced by this backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the value stored under `key`, or `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Store `value` under `key`, overwriting any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), Self::Error>;

    /// Remove `key` and its value, if present.
    fn delete(&self, key: &[u8]) -> Result<(), Self::Error>;

    /// Return whether `key` is present.
    fn contains(&self, key: &[u8]) -> Result<bool, Self::Error>;
}

/// An in-process `HashMap`-backed store.
///
/// Useful for tests and for embedding the engine without persistence. Not
/// thread-safe (`RefCell`, matching the engine's single-writer-per-instance
/// model) — wrap in a `Mutex` at the caller if shared across threads.
#[derive(Debug, Default)]
pub struct MemoryKVStore {
    map: RefCell<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKVStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored (test/diagnostic helper).
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    /// Whether the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }

    /// Total bytes of stored keys plus values (test/diagnostic helper).
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.map.borrow().iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// All keys currently stored (test/diagnostic helper).
    #[must_use]
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.map.borrow().keys().cloned().collect()
    }
}

impl KVStore for MemoryKVStore {
    type Error = Infallible;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.map.borrow_mut().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), Self::Error> {
        self.map.borrow_mut().remove(key);
        Ok(())
    }

    fn contains(&self, key: &[u8]) -> Result<bool, Self::Error> {
        Ok(self.map.borrow().contains_key(key))
    }
}

/// A directory-sharded, atomically-written filesystem backend.
///
/// Keys are hex-encoded and sharded two levels deep (`root/aa/bb/<hex key>`)
/// to avoid giant flat directories. Writes go to a `.incomplete` sibling
/// file, `fsync`, then an atomic rename — the same durability recipe this
/// crate's teacher used for its own content-addressed store, adapted from
/// whole-blob CAS to per-node key/value storage.
#[derive(Debug, Clone)]
pub struct FsKVStore {
    root: PathBuf,
}

impl FsKVStore {
    /// Open (creating if necessary) a filesystem-backed store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &[u8]) -> PathBuf {
        let hex = hex::encode(key);
        if hex.len() >= 4 {
            self.root.join(&hex[0..2]).join(&hex[2..4]).join(&hex)
        } else {
            self.root.join(&hex)
        }
    }

    /// Remove any leftover `.incomplete` artifacts from a crash mid-write.
    /// Returns the number of files removed.
    pub fn cleanup_incomplete(&self) -> io::Result<usize> {
        fn walk(dir: &Path, count: &mut usize) -> io::Result<()> {
            if !dir.exists() {
                return Ok(());
            }
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    walk(&path, count)?;
                } else if path.extension().map(|e| e == "incomplete").unwrap_or(false) {
                    fs::remove_file(&path)?;
                    *count += 1;
                }
            }
            Ok(())
        }
        let mut removed = 0;
        walk(&self.root, &mut removed)?;
        Ok(removed)
    }
}

impl KVStore for FsKVStore {
    type Error = io::Error;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        let final_path = self.path_for(key);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = final_path.with_extension("incomplete");
        {
            let mut f = fs::File::create(&tmp_path)?;
            use io::Write;
            f.write_all(value)?;
            f.sync_all()?;
        }
        fs::rename(&tmp_path, &final_path)?;
        if let Some(parent) = final_path.parent() {
            if let Ok(dirf) = fs::File::open(parent) {
                let _ = dirf.sync_all();
            }
        }
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), Self::Error> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn contains(&self, key: &[u8]) -> Result<bool, Self::Error> {
        Ok(self.path_for(key).exists())
    }
}
