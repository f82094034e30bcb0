//! Secure Content Store (SCS): a content-defined chunk-tree engine
//!
//! Overview
//! - Stores arbitrary byte-sequences ("contents") into an untrusted
//!   key-value backend by decomposing them into a content-defined,
//!   multi-level Merkle-style tree.
//! - Each tree node is authenticated/encrypted independently and stored
//!   under a cryptographic digest; shared nodes across contents are
//!   reference-counted and deduplicated automatically.
//! - `put_content`/`get_content`/`delete_content` are the only operations a
//!   caller needs; the backend, chunker, crypto wrapper, and reference
//!   counter are all pluggable via traits (see [`kvstore::KVStore`],
//!   [`chunker::Chunker`], [`crypto::CryptoWrapper`], [`rc::ReferenceCounter`]).
//!
//! Security Model
//! - Confidentiality and authenticity of stored bytes against a backend
//!   adversary are provided by the configured [`crypto::CryptoWrapper`],
//!   not by this crate directly — pick a keyed/AEAD variant
//!   ([`crypto::HmacSha256`] family, [`crypto::AesSiv256`] family) for an
//!   untrusted backend; the unkeyed [`crypto::Sha256Wrapper`] only detects
//!   accidental corruption.
//! - Every ciphertext is bound to its position in the tree (`height`, and
//!   for distinguished-root variants, `is_root`) so a node cannot be
//!   replayed at a different position without detection.
//! - Deduplication is a direct consequence of content-addressing: identical
//!   plaintext at the same tree position always produces the same
//!   ciphertext and digest under a given wrapper.
//!
//! Determinism Guarantees
//! - `put_content` is idempotent for identical input under a keyed wrapper:
//!   inserting the same bytes twice yields the same handle, and the second
//!   insertion touches no new backend entries.
//! - The level schedule (content length → tree height, tree level → target
//!   chunk size) is computed with integer arithmetic, not floating-point
//!   logarithms, so it is byte-exact across platforms.
//!
//! Usage example
//! ```rust
//! use scs::{ChunkTreeEngine, MemoryKVStore};
//! use scs::crypto::Sha256Wrapper;
//! use scs::chunker::RabinKarpMultiLevelChunker;
//! use scs::rc::KeySuffixReferenceCounter;
//!
//! let backend = MemoryKVStore::new();
//! let engine = ChunkTreeEngine::new(
//!     128,
//!     &backend,
//!     Sha256Wrapper::new(),
//!     RabinKarpMultiLevelChunker::default(),
//!     KeySuffixReferenceCounter::new(&backend),
//! )
//! .unwrap();
//!
//! let handle = engine.put_content(b"hello, world", false).unwrap();
//! assert_eq!(engine.get_content(&handle).unwrap(), b"hello, world");
//! engine.delete_content(&handle, false).unwrap();
//! ```

#![warn(missing_docs)]

pub mod chunker;
pub mod content_ref;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod kvstore;
pub mod rc;
pub mod schedule;

pub use engine::ChunkTreeEngine;
pub use error::{Result, ScsError};
pub use kvstore::{FsKVStore, KVStore, MemoryKVStore};
pub use schedule::{HeightToChunkSizeFn, LengthToHeightFn, LevelSchedule};

/// Construction-time configuration for a [`ChunkTreeEngine`].
///
/// All configuration happens at construction — there are no environment
/// variables and no persisted config file, matching §6's explicit
/// constructor-time-only configuration model.
pub struct Config {
    pub(crate) target_chunk_size: u64,
    pub(crate) height_to_chunksize_fn: Option<HeightToChunkSizeFn>,
    length_to_height_fn: Option<LengthToHeightFn>,
}

impl Config {
    /// Start from a target chunk size `S` (bytes). Subject to the `S >= 2R`
    /// precondition unless a custom chunk-size function is supplied via
    /// [`Self::with_height_to_chunksize_fn`].
    #[must_use]
    pub fn new(target_chunk_size: u64) -> Self {
        Self { target_chunk_size, height_to_chunksize_fn: None, length_to_height_fn: None }
    }

    /// Override the tree-level → target-chunk-size function, waiving the
    /// `S >= 2R` precondition.
    #[must_use]
    pub fn with_height_to_chunksize_fn(mut self, f: HeightToChunkSizeFn) -> Self {
        self.height_to_chunksize_fn = Some(f);
        self
    }

    /// Override the content-length → tree-height function.
    #[must_use]
    pub fn with_length_to_height_fn(mut self, f: LengthToHeightFn) -> Self {
        self.length_to_height_fn = Some(f);
        self
    }

    pub(crate) fn into_schedule(self, digest_size: u64) -> LevelSchedule {
        let mut schedule = LevelSchedule::new(self.target_chunk_size, digest_size);
        if let Some(f) = self.height_to_chunksize_fn {
            schedule = schedule.with_chunksize_fn(f);
        }
        if let Some(f) = self.length_to_height_fn {
            schedule = schedule.with_height_fn(f);
        }
        schedule
    }
}
