//! Content reference (handle) codec (§4.4).
//!
//! A handle is exactly `digest (R bytes) || length (u64 big-endian)`,
//! `R + 8` bytes total — bit-exact across implementations per `spec.md` §6.

use crate::error::{Result, ScsError};

/// Pack a root digest and content length into an opaque handle.
#[must_use]
pub fn encode(root_digest: &[u8], length: u64) -> Vec<u8> {
    let mut handle = Vec::with_capacity(root_digest.len() + 8);
    handle.extend_from_slice(root_digest);
    handle.extend_from_slice(&length.to_be_bytes());
    handle
}

/// Unpack a handle into its root digest and content length.
///
/// Rejects handles whose length is not at least 8 bytes (there must be room
/// for the big-endian length suffix); the digest is whatever precedes it.
pub fn decode(handle: &[u8]) -> Result<(Vec<u8>, u64)> {
    if handle.len() < 8 {
        return Err(ScsError::Decode(format!(
            "handle too short: {} bytes, need at least 8",
            handle.len()
        )));
    }
    let split = handle.len() - 8;
    let (digest, length_bytes) = handle.split_at(split);
    let mut arr = [0u8; 8];
    arr.copy_from_slice(length_bytes);
    Ok((digest.to_vec(), u64::from_be_bytes(arr)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let digest = vec![0xAB; 32];
        let handle = encode(&digest, 123_456);
        assert_eq!(handle.len(), 32 + 8);
        let (d, l) = decode(&handle).unwrap();
        assert_eq!(d, digest);
        assert_eq!(l, 123_456);
    }

    #[test]
    fn empty_content_handle_is_forty_bytes_for_r32() {
        let digest = vec![0u8; 32];
        let handle = encode(&digest, 0);
        assert_eq!(handle.len(), 40);
        assert!(handle[32..].iter().all(|&b| b == 0));
    }

    #[test]
    fn decode_rejects_too_short() {
        assert!(decode(&[0u8; 4]).is_err());
    }
}
