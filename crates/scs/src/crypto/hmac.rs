//! HMAC-SHA-256 wrapper family: keyed, authenticating, optionally binding
//! `is_root` and/or leaf-padding to the target chunk size.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{height_byte, is_root_byte, CryptoWrapper};
use crate::error::{Result, ScsError};

type HmacSha256Mac = Hmac<Sha256>;

fn new_mac(key: &[u8]) -> HmacSha256Mac {
    HmacSha256Mac::new_from_slice(key).expect("HMAC accepts keys of any length")
}

/// Keyed, authenticating wrapper. Binds `height` but not `is_root` — a
/// root node's ciphertext is indistinguishable from an inner node's at the
/// same height.
#[derive(Clone)]
pub struct HmacSha256 {
    key: Vec<u8>,
}

impl HmacSha256 {
    /// Build the wrapper from a MAC key.
    #[must_use]
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    fn tag_of(&self, height: u32, cipher: &[u8]) -> Vec<u8> {
        let mut mac = new_mac(&self.key);
        mac.update(&height_byte(height));
        mac.update(cipher);
        mac.finalize().into_bytes().to_vec()
    }
}

impl CryptoWrapper for HmacSha256 {
    fn digest_size(&self) -> usize {
        32
    }

    fn wrap(&self, plain: &[u8], height: u32, _is_root: bool) -> (Vec<u8>, Vec<u8>) {
        (plain.to_vec(), self.tag_of(height, plain))
    }

    fn unwrap(
        &self,
        cipher: &[u8],
        digest: &[u8],
        height: u32,
        _is_root: bool,
        _length: Option<u64>,
    ) -> Result<Vec<u8>> {
        let mut mac = new_mac(&self.key);
        mac.update(&height_byte(height));
        mac.update(cipher);
        mac.verify_slice(digest)
            .map_err(|_| ScsError::Authenticity("HMAC-SHA-256 verification failed".into()))?;
        Ok(cipher.to_vec())
    }
}

/// Distinguished-root variant of [`HmacSha256`]: additionally binds
/// `is_root`, so a root node's ciphertext cannot be replayed as an inner
/// node's, or vice versa.
#[derive(Clone)]
pub struct HmacSha256DistinguishedRoot {
    key: Vec<u8>,
}

impl HmacSha256DistinguishedRoot {
    /// Build the wrapper from a MAC key.
    #[must_use]
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    fn tag_of(&self, height: u32, is_root: bool, cipher: &[u8]) -> Vec<u8> {
        let mut mac = new_mac(&self.key);
        mac.update(&height_byte(height));
        mac.update(&[is_root_byte(is_root)]);
        mac.update(cipher);
        mac.finalize().into_bytes().to_vec()
    }
}

impl CryptoWrapper for HmacSha256DistinguishedRoot {
    fn digest_size(&self) -> usize {
        32
    }

    fn wrap(&self, plain: &[u8], height: u32, is_root: bool) -> (Vec<u8>, Vec<u8>) {
        (plain.to_vec(), self.tag_of(height, is_root, plain))
    }

    fn unwrap(
        &self,
        cipher: &[u8],
        digest: &[u8],
        height: u32,
        is_root: bool,
        _length: Option<u64>,
    ) -> Result<Vec<u8>> {
        let mut mac = new_mac(&self.key);
        mac.update(&height_byte(height));
        mac.update(&[is_root_byte(is_root)]);
        mac.update(cipher);
        mac.verify_slice(digest).map_err(|_| {
            ScsError::Authenticity("HMAC-SHA-256-DR verification failed".into())
        })?;
        Ok(cipher.to_vec())
    }
}

/// Distinguished-root, leaf-padded variant: leaves (`height == 0`) are
/// zero-padded up to `leaf_pad_size` before storage, so every leaf ciphertext
/// in a backend has the same length regardless of its true content length.
/// Superchunks (`height > 0`) are never padded.
///
/// A leaf's true length is not otherwise recoverable from its position in
/// the tree — a superchunk lists only child digests, no side channel for a
/// child's plaintext length — so every leaf ciphertext is self-describing:
/// an 8-byte big-endian length prefix precedes the (possibly zero-padded)
/// content. `unwrap`'s `length` parameter, when supplied, is checked against
/// this prefix as a caller-side sanity assertion; it is never required, so a
/// leaf deep inside a tree can be unwrapped during traversal the same way as
/// the root.
#[derive(Clone)]
pub struct HmacSha256DistinguishedRootLeafPadding {
    key: Vec<u8>,
    leaf_pad_size: u64,
}

const LENGTH_PREFIX_SIZE: usize = 8;

impl HmacSha256DistinguishedRootLeafPadding {
    /// Build the wrapper. `leaf_pad_size` should match the engine's target
    /// chunk size `S`, so that every leaf's stored ciphertext is exactly
    /// `max(S, 8 + true_len)` bytes.
    #[must_use]
    pub fn new(key: impl Into<Vec<u8>>, leaf_pad_size: u64) -> Self {
        Self { key: key.into(), leaf_pad_size }
    }

    fn tag_of(&self, height: u32, is_root: bool, cipher: &[u8]) -> Vec<u8> {
        let mut mac = new_mac(&self.key);
        mac.update(&height_byte(height));
        mac.update(&[is_root_byte(is_root)]);
        mac.update(cipher);
        mac.finalize().into_bytes().to_vec()
    }
}

impl CryptoWrapper for HmacSha256DistinguishedRootLeafPadding {
    fn digest_size(&self) -> usize {
        32
    }

    fn wrap(&self, plain: &[u8], height: u32, is_root: bool) -> (Vec<u8>, Vec<u8>) {
        if height == 0 {
            let true_len = plain.len() as u64;
            let mut framed = Vec::with_capacity(LENGTH_PREFIX_SIZE + plain.len());
            framed.extend_from_slice(&true_len.to_be_bytes());
            framed.extend_from_slice(plain);
            if (framed.len() as u64) < self.leaf_pad_size {
                framed.resize(self.leaf_pad_size as usize, 0u8);
            }
            let digest = self.tag_of(height, is_root, &framed);
            (framed, digest)
        } else {
            let digest = self.tag_of(height, is_root, plain);
            (plain.to_vec(), digest)
        }
    }

    fn unwrap(
        &self,
        cipher: &[u8],
        digest: &[u8],
        height: u32,
        is_root: bool,
        length: Option<u64>,
    ) -> Result<Vec<u8>> {
        let mut mac = new_mac(&self.key);
        mac.update(&height_byte(height));
        mac.update(&[is_root_byte(is_root)]);
        mac.update(cipher);
        mac.verify_slice(digest)
            .map_err(|_| ScsError::Authenticity("HMAC-SHA-256-DR-LP verification failed".into()))?;

        if height != 0 {
            return Ok(cipher.to_vec());
        }

        if cipher.len() < LENGTH_PREFIX_SIZE {
            return Err(ScsError::Decode("leaf-padding frame shorter than its length prefix".into()));
        }
        let mut len_bytes = [0u8; LENGTH_PREFIX_SIZE];
        len_bytes.copy_from_slice(&cipher[..LENGTH_PREFIX_SIZE]);
        let true_len = u64::from_be_bytes(len_bytes);
        if let Some(expected) = length {
            if expected != true_len {
                return Err(ScsError::Decode(format!(
                    "leaf-padding length mismatch: stored {true_len}, expected {expected}"
                )));
            }
        }
        let end = LENGTH_PREFIX_SIZE + true_len as usize;
        if end > cipher.len() {
            return Err(ScsError::Decode("leaf-padding true length exceeds stored frame".into()));
        }
        Ok(cipher[LENGTH_PREFIX_SIZE..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_binds_height_not_root() {
        let cw = HmacSha256::new(b"key".to_vec());
        let (cipher, digest) = cw.wrap(b"payload", 2, false);
        assert!(cw.unwrap(&cipher, &digest, 2, true, None).is_ok());
        assert!(cw.unwrap(&cipher, &digest, 3, true, None).is_err());
    }

    #[test]
    fn hmac_dr_binds_root() {
        let cw = HmacSha256DistinguishedRoot::new(b"key".to_vec());
        let (cipher, digest) = cw.wrap(b"payload", 0, true);
        assert!(cw.unwrap(&cipher, &digest, 0, true, None).is_ok());
        assert!(cw.unwrap(&cipher, &digest, 0, false, None).is_err());
    }

    #[test]
    fn hmac_dr_lp_pads_leaves_and_roundtrips() {
        let cw = HmacSha256DistinguishedRootLeafPadding::new(b"key".to_vec(), 64);
        let plain = b"short leaf".to_vec();
        let (cipher, digest) = cw.wrap(&plain, 0, true);
        assert_eq!(cipher.len(), 64);
        let recovered = cw.unwrap(&cipher, &digest, 0, true, Some(plain.len() as u64)).unwrap();
        assert_eq!(recovered, plain);
    }

    #[test]
    fn hmac_dr_lp_does_not_pad_superchunks() {
        let cw = HmacSha256DistinguishedRootLeafPadding::new(b"key".to_vec(), 64);
        let plain = vec![7u8; 10];
        let (cipher, digest) = cw.wrap(&plain, 1, false);
        assert_eq!(cipher.len(), plain.len());
        let recovered = cw.unwrap(&cipher, &digest, 1, false, None).unwrap();
        assert_eq!(recovered, plain);
    }

    #[test]
    fn hmac_dr_lp_unwraps_without_external_length() {
        let cw = HmacSha256DistinguishedRootLeafPadding::new(b"key".to_vec(), 64);
        let plain = b"leaf".to_vec();
        let (cipher, digest) = cw.wrap(&plain, 0, true);
        let recovered = cw.unwrap(&cipher, &digest, 0, true, None).unwrap();
        assert_eq!(recovered, plain);
    }

    #[test]
    fn hmac_dr_lp_rejects_wrong_asserted_length() {
        let cw = HmacSha256DistinguishedRootLeafPadding::new(b"key".to_vec(), 64);
        let (cipher, digest) = cw.wrap(b"leaf", 0, true);
        assert!(cw.unwrap(&cipher, &digest, 0, true, Some(999)).is_err());
    }
}
