//! Crypto wrapper contract and the six required variants (§4.2).

mod aes_siv;
mod hash;
mod hmac;

pub use aes_siv::{AesSiv256, AesSiv256DistinguishedRoot};
pub use hash::Sha256Wrapper;
pub use hmac::{HmacSha256, HmacSha256DistinguishedRoot, HmacSha256DistinguishedRootLeafPadding};

use crate::error::Result;

/// Transforms a chunk-tree node's plaintext payload into a `(ciphertext,
/// digest)` pair bound to the node's position (`height`, `is_root`), and
/// back.
///
/// Implementations must be deterministic in `plain`, `height`, `is_root` and
/// the wrapper's own key material only — identical inputs must always
/// produce identical `(cipher, digest)` so that deduplication works
/// (property 2 in `spec.md` §8).
pub trait CryptoWrapper {
    /// Digest length in bytes produced by this wrapper (`R`).
    fn digest_size(&self) -> usize;

    /// Wrap `plain` for a node at `height`, which is the tree's root iff
    /// `is_root`. Returns the bytes to store in the backend and the digest
    /// to store it under.
    fn wrap(&self, plain: &[u8], height: u32, is_root: bool) -> (Vec<u8>, Vec<u8>);

    /// Recover the plaintext for a node previously produced by [`Self::wrap`].
    ///
    /// `length` must be supplied when the wrapper pads (leaf-padding
    /// variants); other variants ignore it. Tampering with `cipher`,
    /// `digest`, `height`, or `is_root` relative to the values used at
    /// `wrap` time must be detected and surfaced as
    /// [`crate::error::ScsError::Integrity`] (unkeyed wrappers) or
    /// [`crate::error::ScsError::Authenticity`] (keyed wrappers).
    fn unwrap(
        &self,
        cipher: &[u8],
        digest: &[u8],
        height: u32,
        is_root: bool,
        length: Option<u64>,
    ) -> Result<Vec<u8>>;
}

/// Serialize `height` as the single associated-data byte every variant mixes
/// into its digest computation.
pub(crate) fn height_byte(height: u32) -> [u8; 4] {
    height.to_be_bytes()
}

/// Serialize `is_root` as the single associated-data byte distinguished-root
/// variants additionally mix in.
pub(crate) fn is_root_byte(is_root: bool) -> u8 {
    u8::from(is_root)
}
