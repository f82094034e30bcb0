//! The chunk-tree engine (§4.6): builds trees on insert, walks them on
//! retrieve, and prunes them on delete under reference-count rules.

use tracing::{debug, instrument};

use crate::chunker::Chunker;
use crate::content_ref;
use crate::crypto::CryptoWrapper;
use crate::error::{Result, ScsError};
use crate::kvstore::KVStore;
use crate::rc::ReferenceCounter;
use crate::schedule::LevelSchedule;

fn backend_err<E: std::error::Error>(e: E) -> ScsError {
    ScsError::Backend(e.to_string())
}

/// The chunk-tree engine: the component that decomposes content into a
/// content-defined multi-level tree, stores each node under a cryptographic
/// digest in `B`, reference-counts shared nodes via `Rc`, and provides
/// insert/retrieve/delete with exact storage reclamation.
///
/// Single-threaded per instance — see the crate-level concurrency notes.
/// Callers needing concurrent access must serialize calls externally (e.g.
/// behind a `Mutex`).
pub struct ChunkTreeEngine<'a, B, W, Ch, Rc>
where
    B: KVStore,
    W: CryptoWrapper,
    Ch: Chunker,
    Rc: ReferenceCounter,
{
    backend: &'a B,
    wrapper: W,
    chunker: Ch,
    rc: Rc,
    schedule: LevelSchedule,
}

impl<'a, B, W, Ch, Rc> ChunkTreeEngine<'a, B, W, Ch, Rc>
where
    B: KVStore,
    W: CryptoWrapper,
    Ch: Chunker,
    Rc: ReferenceCounter,
{
    /// Build an engine with the default level schedule for `target_chunk_size`.
    ///
    /// Fails with [`ScsError::UnsupportedChunkSize`] if `target_chunk_size <
    /// 2 * wrapper.digest_size()`; use [`Self::with_custom_schedule`] with an
    /// overriding `height_to_chunksize_fn` to waive this precondition.
    pub fn new(target_chunk_size: u64, backend: &'a B, wrapper: W, chunker: Ch, rc: Rc) -> Result<Self> {
        let r = wrapper.digest_size() as u64;
        if target_chunk_size < 2 * r {
            return Err(ScsError::UnsupportedChunkSize(format!(
                "target chunk size {target_chunk_size} is below 2 * digest_size ({r}); \
                 supply a custom chunksize function via with_custom_schedule to override"
            )));
        }
        let schedule = LevelSchedule::new(target_chunk_size, r);
        Ok(Self { backend, wrapper, chunker, rc, schedule })
    }

    /// Build an engine with a caller-supplied [`LevelSchedule`], bypassing
    /// the `S >= 2R` precondition check (the spec's documented waiver for
    /// custom chunk-size functions).
    pub fn with_custom_schedule(
        backend: &'a B,
        wrapper: W,
        chunker: Ch,
        rc: Rc,
        schedule: LevelSchedule,
    ) -> Self {
        Self { backend, wrapper, chunker, rc, schedule }
    }

    /// Build an engine from a [`crate::Config`], honoring its precondition
    /// waiver when overrides are supplied.
    pub fn with_config(config: crate::Config, backend: &'a B, wrapper: W, chunker: Ch, rc: Rc) -> Result<Self> {
        let r = wrapper.digest_size() as u64;
        let has_override = config.height_to_chunksize_fn.is_some();
        if !has_override && config.target_chunk_size < 2 * r {
            return Err(ScsError::UnsupportedChunkSize(format!(
                "target chunk size {} is below 2 * digest_size ({r})",
                config.target_chunk_size
            )));
        }
        let schedule = config.into_schedule(r);
        Ok(Self { backend, wrapper, chunker, rc, schedule })
    }

    /// Decode a content reference, rejecting one whose digest width doesn't
    /// match this engine's wrapper (§4.4/§6: a handle is exactly
    /// `digest (R bytes) || length`, not merely "at least 8 bytes").
    fn decode_handle(&self, handle: &[u8]) -> Result<(Vec<u8>, u64)> {
        let (digest, length) = content_ref::decode(handle)?;
        let r = self.wrapper.digest_size();
        if digest.len() != r {
            return Err(ScsError::Decode(format!(
                "content reference digest is {} bytes, expected {r}",
                digest.len()
            )));
        }
        Ok((digest, length))
    }

    fn get_node_raw(&self, digest: &[u8], height: u32, root_height: u32) -> Result<Vec<u8>> {
        let cipher = self
            .backend
            .get(digest)
            .map_err(backend_err)?
            .ok_or_else(|| ScsError::Backend(format!("missing node {}", hex::encode(digest))))?;
        self.wrapper.unwrap(&cipher, digest, height, height == root_height, None)
    }

    fn get_children(&self, digest: &[u8], height: u32, root_height: u32) -> Result<Vec<Vec<u8>>> {
        let payload = self.get_node_raw(digest, height, root_height)?;
        let r = self.wrapper.digest_size();
        Ok(payload.chunks(r).map(<[u8]>::to_vec).collect())
    }

    /// `store_node` (§4.6.1): wrap `payload`, dedup against an existing
    /// retrievable entry under the same digest, bump children's reference
    /// counts on first insertion, and write the node.
    fn store_node(&self, payload: &[u8], height: u32, root_height: u32) -> Result<(Vec<u8>, bool)> {
        let is_root = height == root_height;
        let (cipher, digest) = self.wrapper.wrap(payload, height, is_root);

        let already_present = self.backend.contains(&digest).map_err(backend_err)?;
        if already_present && self.get_node_raw(&digest, height, root_height).is_ok() {
            debug!(digest = %hex::encode(&digest), height, "node reused");
            return Ok((digest, false));
        }

        if height > 0 {
            let r = self.wrapper.digest_size();
            for child in payload.chunks(r) {
                self.rc.inc(child)?;
            }
        }
        self.backend.put(&digest, &cipher).map_err(backend_err)?;
        debug!(digest = %hex::encode(&digest), height, "node created");
        Ok((digest, true))
    }

    /// Build the multi-level tree for content of height `h > 0` and return
    /// the root's `(digest, is_new)`. See `spec.md` §4.6.3 for the boundary
    /// protocol this implements.
    fn build_tree(&self, m: &[u8], h: u32) -> Result<(Vec<u8>, bool)> {
        let chunk_sizes: Vec<u64> = (0..h).map(|level| self.schedule.chunksize_for(level)).collect();
        let lead = self.chunker.window_size().saturating_sub(1);
        let raw_boundaries = self.chunker.boundaries(m, &chunk_sizes, lead);

        let l = m.len() as u64;
        let mut boundaries: Vec<(u64, u32)> = Vec::with_capacity(raw_boundaries.len() + 2);
        boundaries.push((0, h - 1));
        boundaries.extend(raw_boundaries);
        if matches!(boundaries.last(), Some(&(pos, _)) if pos == l) {
            boundaries.pop();
        }
        boundaries.push((l, h - 1));

        // buffers[level] accumulates child digests awaiting closure into a
        // level-`level` superchunk; index 0 is unused (leaves are built
        // directly from `m`, not from a buffer).
        let mut buffers: Vec<Vec<Vec<u8>>> = vec![Vec::new(); (h + 1) as usize];

        for pair in boundaries.windows(2) {
            let (start, _) = pair[0];
            let (end, level) = pair[1];
            let (leaf_digest, _) = self.store_node(&m[start as usize..end as usize], 0, h)?;
            buffers[1].push(leaf_digest);

            for closing_level in 1..=level {
                let children = std::mem::take(&mut buffers[closing_level as usize]);
                let serialized: Vec<u8> = children.into_iter().flatten().collect();
                let (digest, _) = self.store_node(&serialized, closing_level, h)?;
                buffers[(closing_level + 1) as usize].push(digest);
            }
        }

        let root_children = std::mem::take(&mut buffers[h as usize]);
        let root_payload: Vec<u8> = root_children.into_iter().flatten().collect();
        self.store_node(&root_payload, h, h)
    }

    /// `put_content` (§4.6.3) reporting whether the root was newly created.
    #[instrument(skip(self, m), fields(len = m.len()))]
    pub fn put_content_and_check_if_new(&self, m: &[u8], ignore_root_rc: bool) -> Result<(Vec<u8>, bool)> {
        let l = m.len() as u64;
        let h = self.schedule.height_for(l);

        let (k, is_new) = if h == 0 { self.store_node(m, 0, 0)? } else { self.build_tree(m, h)? };

        if !ignore_root_rc {
            self.rc.inc(&k)?;
        }

        Ok((content_ref::encode(&k, l), is_new))
    }

    /// `put_content` (§4.6.3).
    pub fn put_content(&self, m: &[u8], ignore_root_rc: bool) -> Result<Vec<u8>> {
        self.put_content_and_check_if_new(m, ignore_root_rc).map(|(handle, _)| handle)
    }

    /// `get_content` (§4.6.4): decode the handle, walk the tree top-down
    /// decrypting each node, and concatenate leaves in order.
    #[instrument(skip(self, handle))]
    pub fn get_content(&self, handle: &[u8]) -> Result<Vec<u8>> {
        let (k, l) = self.decode_handle(handle)?;
        let h = self.schedule.height_for(l);

        let mut working = vec![k];
        for level in (1..=h).rev() {
            let mut next = Vec::with_capacity(working.len() * 2);
            for digest in &working {
                next.extend(self.get_children(digest, level, h)?);
            }
            working = next;
        }

        let mut out = Vec::with_capacity(l as usize);
        for digest in &working {
            out.extend(self.get_node_raw(digest, 0, h)?);
        }
        Ok(out)
    }

    /// `delete_content` (§4.6.5): decrement the root's reference count and,
    /// if it reaches zero, prune the tree.
    #[instrument(skip(self, handle))]
    pub fn delete_content(&self, handle: &[u8], ignore_root_rc: bool) -> Result<()> {
        let (k, l) = self.decode_handle(handle)?;
        let h = self.schedule.height_for(l);

        let should_delete = if ignore_root_rc { true } else { self.rc.dec(&k)? == 0 };
        if should_delete {
            self.delete_node(&k, h, h)?;
        }
        Ok(())
    }

    /// `delete_node` (§4.6.6), iterative (explicit stack) rather than
    /// recursive per the Design Note in §9: tree height is small in
    /// practice, but an explicit stack avoids relying on that as a
    /// correctness argument.
    fn delete_node(&self, k: &[u8], height: u32, root_height: u32) -> Result<()> {
        let mut stack = vec![(k.to_vec(), height)];
        while let Some((digest, h)) = stack.pop() {
            if h > 0 {
                for child in self.get_children(&digest, h, root_height)? {
                    if self.rc.dec(&child)? == 0 {
                        stack.push((child, h - 1));
                    }
                }
            }
            self.backend.delete(&digest).map_err(backend_err)?;
            debug!(digest = %hex::encode(&digest), height = h, "node deleted");
        }
        Ok(())
    }
}
