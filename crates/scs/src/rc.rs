//! Reference counting (§4.5).
//!
//! A reference counter maps a key to a non-negative count: `inc`/`dec`
//! return the new count, and count `0` means the entry is absent (both from
//! the counter's own storage and, by construction of the engine above it,
//! from the content backend).

use crate::error::{Result, ScsError};
use crate::kvstore::KVStore;

/// The reference-counter contract used by the chunk-tree engine.
pub trait ReferenceCounter {
    /// Increment the counter for `key`, creating it at `1` if absent.
    /// Returns the new count.
    fn inc(&self, key: &[u8]) -> Result<u64>;

    /// Decrement the counter for `key`. Returns the new count; when it
    /// reaches `0` the counter entry is removed. Decrementing a counter that
    /// is absent is a caller error (see `spec.md` §7/§9) and surfaces as
    /// [`ScsError::Backend`].
    fn dec(&self, key: &[u8]) -> Result<u64>;
}

/// A reference counter that always reports `1` and never persists anything.
///
/// Disables deletion-safety: every `dec` looks like "still referenced
/// elsewhere" never happened, so callers using this must never issue
/// `delete_content` expecting real reclamation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReferenceCounter;

impl ReferenceCounter for NoReferenceCounter {
    fn inc(&self, _key: &[u8]) -> Result<u64> {
        Ok(1)
    }

    fn dec(&self, _key: &[u8]) -> Result<u64> {
        Ok(1)
    }
}

fn encode_count(n: u64) -> [u8; 8] {
    n.to_be_bytes()
}

fn decode_count(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| ScsError::Backend("malformed reference counter value".into()))?;
    Ok(u64::from_be_bytes(arr))
}

/// A reference counter backed directly by a [`KVStore`], storing counts under
/// the key unchanged.
///
/// This is the "dedicated backend" alternate policy mentioned in §4.5: point
/// it at a `KVStore` distinct from the content backend to keep counter and
/// content key spaces on separate storage entirely.
pub struct MapReferenceCounter<'a, S: KVStore> {
    store: &'a S,
}

impl<'a, S: KVStore> MapReferenceCounter<'a, S> {
    /// Build a reference counter over `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: KVStore> ReferenceCounter for MapReferenceCounter<'_, S> {
    fn inc(&self, key: &[u8]) -> Result<u64> {
        let current = self
            .store
            .get(key)
            .map_err(|e| ScsError::Backend(e.to_string()))?
            .map(|v| decode_count(&v))
            .transpose()?
            .unwrap_or(0);
        let next = current + 1;
        self.store
            .put(key, &encode_count(next))
            .map_err(|e| ScsError::Backend(e.to_string()))?;
        Ok(next)
    }

    fn dec(&self, key: &[u8]) -> Result<u64> {
        let current = self
            .store
            .get(key)
            .map_err(|e| ScsError::Backend(e.to_string()))?
            .map(|v| decode_count(&v))
            .transpose()?
            .ok_or_else(|| {
                ScsError::Backend(format!("dec of absent reference counter key {}", hex::encode(key)))
            })?;
        if current == 1 {
            self.store.delete(key).map_err(|e| ScsError::Backend(e.to_string()))?;
            Ok(0)
        } else {
            let next = current - 1;
            self.store
                .put(key, &encode_count(next))
                .map_err(|e| ScsError::Backend(e.to_string()))?;
            Ok(next)
        }
    }
}

/// The default reference counter: counts are overlaid onto the content
/// backend itself, under key `k || suffix` (default suffix `"r"`), keeping
/// counter keys (`R + suffix.len()` bytes) disjoint from content keys
/// (`R` bytes).
pub struct KeySuffixReferenceCounter<'a, S: KVStore> {
    store: &'a S,
    suffix: Vec<u8>,
}

impl<'a, S: KVStore> KeySuffixReferenceCounter<'a, S> {
    /// Build a key-suffix reference counter over `store` using the default
    /// suffix `b"r"`.
    pub fn new(store: &'a S) -> Self {
        Self::with_suffix(store, b"r".to_vec())
    }

    /// Build a key-suffix reference counter over `store` with a custom
    /// suffix.
    pub fn with_suffix(store: &'a S, suffix: Vec<u8>) -> Self {
        Self { store, suffix }
    }

    fn suffixed(&self, key: &[u8]) -> Vec<u8> {
        let mut k = Vec::with_capacity(key.len() + self.suffix.len());
        k.extend_from_slice(key);
        k.extend_from_slice(&self.suffix);
        k
    }
}

impl<S: KVStore> ReferenceCounter for KeySuffixReferenceCounter<'_, S> {
    fn inc(&self, key: &[u8]) -> Result<u64> {
        MapReferenceCounter::new(self.store).inc(&self.suffixed(key))
    }

    fn dec(&self, key: &[u8]) -> Result<u64> {
        MapReferenceCounter::new(self.store).dec(&self.suffixed(key))
    }
}
