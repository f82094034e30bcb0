//! End-to-end scenarios S1-S6 from the spec's testable-properties section,
//! run with S=128, the plain SHA-256 wrapper, R=32.

use scs::chunker::RabinKarpMultiLevelChunker;
use scs::content_ref;
use scs::crypto::{AesSiv256DistinguishedRoot, CryptoWrapper, HmacSha256DistinguishedRoot, Sha256Wrapper};
use scs::rc::KeySuffixReferenceCounter;
use scs::{ChunkTreeEngine, MemoryKVStore};

const S: u64 = 128;

fn sha_engine(
    backend: &MemoryKVStore,
) -> ChunkTreeEngine<'_, MemoryKVStore, Sha256Wrapper, RabinKarpMultiLevelChunker, KeySuffixReferenceCounter<'_, MemoryKVStore>>
{
    ChunkTreeEngine::new(
        S,
        backend,
        Sha256Wrapper::new(),
        RabinKarpMultiLevelChunker::default(),
        KeySuffixReferenceCounter::new(backend),
    )
    .unwrap()
}

#[test]
fn s1_empty_content() {
    let backend = MemoryKVStore::new();
    let e = sha_engine(&backend);
    let handle = e.put_content(b"", false).unwrap();

    assert_eq!(handle.len(), 40);
    assert!(handle[32..].iter().all(|&b| b == 0));
    assert_eq!(backend.len(), 2); // one node entry, one counter entry

    let (digest, length) = content_ref::decode(&handle).unwrap();
    assert_eq!(length, 0);
    assert_eq!(backend.get(&digest).unwrap().unwrap(), Vec::<u8>::new());
}

#[test]
fn s2_exactly_one_chunk() {
    let backend = MemoryKVStore::new();
    let e = sha_engine(&backend);
    let data = vec![0u8; S as usize];
    let handle = e.put_content(&data, false).unwrap();

    assert_eq!(backend.len(), 2);
    assert_eq!(e.get_content(&handle).unwrap(), data);
}

#[test]
fn s3_one_byte_over_forms_a_superchunk() {
    let backend = MemoryKVStore::new();
    let e = sha_engine(&backend);
    let data = vec![0u8; (S + 1) as usize];
    let handle = e.put_content(&data, false).unwrap();

    assert!(backend.len() > 2);
    assert_eq!(e.get_content(&handle).unwrap(), data);
}

#[test]
fn s4_delete_one_of_two_identical_handles_preserves_the_other() {
    let backend = MemoryKVStore::new();
    let e = sha_engine(&backend);
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

    let h1 = e.put_content(&data, false).unwrap();
    let h2 = e.put_content(&data, false).unwrap();
    assert_eq!(h1, h2);

    e.delete_content(&h1, false).unwrap();
    assert_eq!(e.get_content(&h2).unwrap(), data);
}

#[test]
fn s5_small_diff_costs_roughly_the_diff_plus_log_overhead() {
    let backend = MemoryKVStore::new();
    let e = sha_engine(&backend);

    let len = 2 * 1024 * 1024;
    let a: Vec<u8> = (0..len as u32).map(|i| ((i.wrapping_mul(2654435761)) % 256) as u8).collect();
    let before = backend.byte_size();
    e.put_content(&a, false).unwrap();
    let after_a = backend.byte_size();

    let mut b = a.clone();
    let offset = 1_000_000usize;
    for byte in &mut b[offset..offset + 100] {
        *byte = byte.wrapping_add(1);
    }
    e.put_content(&b, false).unwrap();
    let after_b = backend.byte_size();

    let r = 32.0;
    let s = S as f64;
    let log_term = ((len as f64 / s).log(s / r)).ceil() + 1.0;
    let bound = 4.0 * (log_term * (s + r) + 100.0);

    let extra = (after_b - after_a) as f64;
    assert!(extra < bound, "extra bytes {extra} exceeded bound {bound}");
    assert!(before <= after_a);
}

#[test]
fn s6_forged_root_from_non_root_superchunk_is_rejected_under_dr() {
    let wrapper = HmacSha256DistinguishedRoot::new(b"a shared mac key".to_vec());
    let (cipher, digest) = wrapper.wrap(b"a superchunk's worth of child digests", 2, false);

    // A node genuinely written at height 2 as a non-root must unwrap fine
    // at that same position, but a backend adversary replaying it as the
    // root of some other content (`is_root = true`) must be rejected,
    // because `is_root` is bound into the MAC alongside `height`.
    assert!(wrapper.unwrap(&cipher, &digest, 2, false, None).is_ok());
    assert!(wrapper.unwrap(&cipher, &digest, 2, true, None).is_err());
}

#[test]
fn s6_aes_siv_dr_rejects_root_replayed_as_non_root() {
    let key = [0x11u8; 64];
    let wrapper = AesSiv256DistinguishedRoot::new(key);
    let (cipher, digest) = wrapper.wrap(b"root payload", 2, true);
    assert!(wrapper.unwrap(&cipher, &digest, 2, false, None).is_err());
    assert!(wrapper.unwrap(&cipher, &digest, 2, true, None).is_ok());
}
