//! Crate-wide error type.

use thiserror::Error;

/// Errors surfaced by every public operation of this crate.
///
/// All five kinds mirror the spec's error taxonomy directly: configuration
/// errors are raised at construction time, `Integrity`/`Authenticity` are
/// raised by [`crate::crypto::CryptoWrapper::unwrap`] implementations,
/// `Backend` wraps whatever the pluggable [`crate::kvstore::KVStore`]
/// surfaces (including "key missing on a read that expected it to be
/// present"), and `Decode` covers malformed content-reference handles.
#[derive(Debug, Error)]
pub enum ScsError {
    /// Raised at engine construction when the configuration is unsupported,
    /// e.g. a target chunk size smaller than `2 * digest_size` with no
    /// custom chunk-size function supplied.
    #[error("unsupported chunk size: {0}")]
    UnsupportedChunkSize(String),

    /// A content-addressed (unkeyed) wrapper detected tampering that is not
    /// cryptographically unforgeable.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// A keyed wrapper detected a forgery.
    #[error("authenticity check failed: {0}")]
    Authenticity(String),

    /// The backend returned an error, or a key expected to be present was
    /// missing.
    #[error("backend error: {0}")]
    Backend(String),

    /// A content-reference handle was malformed (wrong length, etc.).
    #[error("malformed content reference: {0}")]
    Decode(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ScsError>;
