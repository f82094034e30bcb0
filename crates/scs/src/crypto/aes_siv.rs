//! AES-SIV-256 wrapper family: deterministic AEAD (RFC 5297). The synthetic
//! IV produced by SIV doubles as the node's digest, so ciphertext length
//! equals plaintext length — no separate tag appended on top of the digest.

use aes_siv::aead::generic_array::GenericArray;
use aes_siv::{Aes256Siv, KeyInit};

use super::{height_byte, is_root_byte, CryptoWrapper};
use crate::error::{Result, ScsError};

const KEY_SIZE: usize = 64;
const IV_SIZE: usize = 16;

fn cipher_for(key: &[u8; KEY_SIZE]) -> Aes256Siv {
    Aes256Siv::new(GenericArray::from_slice(key))
}

/// Deterministic AEAD wrapper. Binds `height` as associated data but not
/// `is_root`.
#[derive(Clone)]
pub struct AesSiv256 {
    key: [u8; KEY_SIZE],
}

impl AesSiv256 {
    /// Build the wrapper from a 64-byte SIV key (two concatenated 256-bit
    /// subkeys, per RFC 5297).
    #[must_use]
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }
}

impl CryptoWrapper for AesSiv256 {
    fn digest_size(&self) -> usize {
        IV_SIZE
    }

    fn wrap(&self, plain: &[u8], height: u32, _is_root: bool) -> (Vec<u8>, Vec<u8>) {
        let mut cipher = cipher_for(&self.key);
        let combined = cipher
            .encrypt(&[&height_byte(height)[..]], plain)
            .expect("AES-SIV encryption is infallible for well-formed inputs");
        let (iv, ct) = combined.split_at(IV_SIZE);
        (ct.to_vec(), iv.to_vec())
    }

    fn unwrap(
        &self,
        cipher_bytes: &[u8],
        digest: &[u8],
        height: u32,
        _is_root: bool,
        _length: Option<u64>,
    ) -> Result<Vec<u8>> {
        if digest.len() != IV_SIZE {
            return Err(ScsError::Authenticity("AES-SIV digest has wrong length".into()));
        }
        let mut combined = Vec::with_capacity(IV_SIZE + cipher_bytes.len());
        combined.extend_from_slice(digest);
        combined.extend_from_slice(cipher_bytes);
        let mut cipher = cipher_for(&self.key);
        cipher
            .decrypt(&[&height_byte(height)[..]], &combined)
            .map_err(|_| ScsError::Authenticity("AES-SIV-256 verification failed".into()))
    }
}

/// Distinguished-root variant of [`AesSiv256`]: additionally binds `is_root`
/// as a second associated-data field.
#[derive(Clone)]
pub struct AesSiv256DistinguishedRoot {
    key: [u8; KEY_SIZE],
}

impl AesSiv256DistinguishedRoot {
    /// Build the wrapper from a 64-byte SIV key.
    #[must_use]
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }
}

impl CryptoWrapper for AesSiv256DistinguishedRoot {
    fn digest_size(&self) -> usize {
        IV_SIZE
    }

    fn wrap(&self, plain: &[u8], height: u32, is_root: bool) -> (Vec<u8>, Vec<u8>) {
        let mut cipher = cipher_for(&self.key);
        let ad: [&[u8]; 2] = [&height_byte(height)[..], &[is_root_byte(is_root)]];
        let combined = cipher
            .encrypt(&ad, plain)
            .expect("AES-SIV encryption is infallible for well-formed inputs");
        let (iv, ct) = combined.split_at(IV_SIZE);
        (ct.to_vec(), iv.to_vec())
    }

    fn unwrap(
        &self,
        cipher_bytes: &[u8],
        digest: &[u8],
        height: u32,
        is_root: bool,
        _length: Option<u64>,
    ) -> Result<Vec<u8>> {
        if digest.len() != IV_SIZE {
            return Err(ScsError::Authenticity("AES-SIV digest has wrong length".into()));
        }
        let mut combined = Vec::with_capacity(IV_SIZE + cipher_bytes.len());
        combined.extend_from_slice(digest);
        combined.extend_from_slice(cipher_bytes);
        let mut cipher = cipher_for(&self.key);
        let ad: [&[u8]; 2] = [&height_byte(height)[..], &[is_root_byte(is_root)]];
        cipher
            .decrypt(&ad, &combined)
            .map_err(|_| ScsError::Authenticity("AES-SIV-256-DR verification failed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; KEY_SIZE] {
        [0x42u8; KEY_SIZE]
    }

    #[test]
    fn roundtrip_same_length_ciphertext() {
        let cw = AesSiv256::new(key());
        let plain = b"some node payload".to_vec();
        let (cipher, digest) = cw.wrap(&plain, 3, false);
        assert_eq!(cipher.len(), plain.len());
        assert_eq!(digest.len(), IV_SIZE);
        let recovered = cw.unwrap(&cipher, &digest, 3, false, None).unwrap();
        assert_eq!(recovered, plain);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let cw = AesSiv256::new(key());
        let plain = b"dedup me".to_vec();
        let (c1, d1) = cw.wrap(&plain, 0, false);
        let (c2, d2) = cw.wrap(&plain, 0, false);
        assert_eq!(c1, c2);
        assert_eq!(d1, d2);
    }

    #[test]
    fn height_is_bound_but_not_root() {
        let cw = AesSiv256::new(key());
        let (cipher, digest) = cw.wrap(b"payload", 2, false);
        assert!(cw.unwrap(&cipher, &digest, 2, true, None).is_ok());
        assert!(cw.unwrap(&cipher, &digest, 5, false, None).is_err());
    }

    #[test]
    fn dr_variant_binds_root() {
        let cw = AesSiv256DistinguishedRoot::new(key());
        let (cipher, digest) = cw.wrap(b"payload", 0, true);
        assert!(cw.unwrap(&cipher, &digest, 0, true, None).is_ok());
        assert!(cw.unwrap(&cipher, &digest, 0, false, None).is_err());
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let cw = AesSiv256::new(key());
        let (mut cipher, digest) = cw.wrap(b"payload", 0, false);
        cipher[0] ^= 0xFF;
        assert!(cw.unwrap(&cipher, &digest, 0, false, None).is_err());
    }
}
