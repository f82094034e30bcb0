//! `SHA-256` wrapper: content-addressed, unkeyed.

use sha2::{Digest as _, Sha256};

use super::{height_byte, CryptoWrapper};
use crate::error::{Result, ScsError};

/// Plain-hash wrapper: no confidentiality, no authenticity — only
/// tamper-detection (`IntegrityError`). Digest binds `height` but, matching
/// every non-DR variant, never binds `is_root`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Wrapper;

impl Sha256Wrapper {
    /// Construct the wrapper. Stateless — there is no key material.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn digest_of(height: u32, cipher: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(height_byte(height));
        hasher.update(cipher);
        hasher.finalize().to_vec()
    }
}

impl CryptoWrapper for Sha256Wrapper {
    fn digest_size(&self) -> usize {
        32
    }

    fn wrap(&self, plain: &[u8], height: u32, _is_root: bool) -> (Vec<u8>, Vec<u8>) {
        let digest = Self::digest_of(height, plain);
        (plain.to_vec(), digest)
    }

    fn unwrap(
        &self,
        cipher: &[u8],
        digest: &[u8],
        height: u32,
        _is_root: bool,
        _length: Option<u64>,
    ) -> Result<Vec<u8>> {
        let expected = Self::digest_of(height, cipher);
        if expected != digest {
            return Err(ScsError::Integrity("SHA-256 digest mismatch".into()));
        }
        Ok(cipher.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_binding() {
        let cw = Sha256Wrapper::new();
        let value = b"some plaintext".to_vec();

        let (cipher, digest) = cw.wrap(&value, 0, false);
        assert_eq!(cipher, value);
        assert_eq!(cw.unwrap(&cipher, &digest, 0, false, None).unwrap(), value);

        // tampered ciphertext
        let mut bad_cipher = cipher.clone();
        bad_cipher.push(b'x');
        assert!(cw.unwrap(&bad_cipher, &digest, 0, false, None).is_err());

        // tampered digest
        let mut bad_digest = digest.clone();
        let last = bad_digest.len() - 1;
        bad_digest[last] ^= 0xFF;
        assert!(cw.unwrap(&cipher, &bad_digest, 0, false, None).is_err());

        // height binding
        assert!(cw.unwrap(&cipher, &digest, 1, false, None).is_err());

        // is_root is NOT bound for this non-DR variant
        assert!(cw.unwrap(&cipher, &digest, 0, true, None).is_ok());
    }
}
