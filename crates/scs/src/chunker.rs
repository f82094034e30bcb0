//! Content-defined multi-level chunking (§4.3).
//!
//! The chunker is an external collaborator per the spec: any implementation
//! producing a deterministic, nested boundary stream is valid. This module
//! defines the [`Chunker`] trait and ships one default implementation,
//! [`RabinKarpMultiLevelChunker`], grounded on the original reference
//! implementation's default (`fastchunking.RabinKarpCDC(48, seed=0)`).

/// A `(position, level)` boundary: `level` is the highest tree level at
/// which a content-defined boundary occurs at `position`.
pub type Boundary = (u64, u32);

/// Multi-level content-defined chunking contract.
pub trait Chunker {
    /// Fixed window size `W` this chunker rolls its hash over.
    fn window_size(&self) -> usize;

    /// Produce ascending-position `(position, level)` boundaries over
    /// `data`, given the ordered per-level target chunk sizes
    /// `chunk_sizes[0..h)`.
    ///
    /// `lead_zero_bytes` virtual zero bytes are considered to precede
    /// `data[0]` for the purpose of filling the rolling window, without
    /// themselves being eligible boundary positions — this is the "start
    /// offset" semantic the engine relies on to make boundary emission
    /// deterministic from byte 0 (it passes `window_size() - 1`).
    fn boundaries(&self, data: &[u8], chunk_sizes: &[u64], lead_zero_bytes: usize) -> Vec<Boundary>;
}

/// Number of trailing zero bits a rolling-hash value must have to be a
/// level-`L` boundary, derived from that level's target chunk size so that
/// the expected chunk length at level `L` is approximately `chunksize`.
fn mask_for(chunksize: u64) -> u64 {
    if chunksize <= 1 {
        return 0;
    }
    // floor(log2(chunksize)): the position of chunksize's highest set bit.
    // `64 - leading_zeros` is the bit *count*, one more than the position,
    // so it must be decremented or the mask is twice as wide as intended
    // and every level's average chunk size doubles.
    let bits = (63 - chunksize.leading_zeros()).min(63);
    (1u64 << bits) - 1
}

/// Default chunker: a multiplicative polynomial rolling hash over a true
/// sliding window of `window_size` bytes, with per-level mask tests on the
/// rolling value. Deterministic across runs (fixed multiplicative constant),
/// which is load-bearing: the chunker must split identical content
/// identically for deduplication to work.
#[derive(Debug, Clone)]
pub struct RabinKarpMultiLevelChunker {
    window_size: usize,
    base: u64,
    /// `base^(window_size - 1)`, precomputed for the rolling-hash update.
    base_pow: u64,
    /// Expected-size multiplier above which a level's chunk is forced closed
    /// even without a hash-triggered boundary, bounding worst-case chunk
    /// size.
    max_multiple: u64,
}

impl RabinKarpMultiLevelChunker {
    /// Default window size used by the original reference implementation.
    pub const DEFAULT_WINDOW_SIZE: usize = 48;

    /// Build a chunker with the given window size.
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "window_size must be positive");
        let base: u64 = 1_000_000_007; // odd, large prime
        let mut base_pow = 1u64;
        for _ in 0..window_size.saturating_sub(1) {
            base_pow = base_pow.wrapping_mul(base);
        }
        Self { window_size, base, base_pow, max_multiple: 8 }
    }
}

impl Default for RabinKarpMultiLevelChunker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW_SIZE)
    }
}

impl Chunker for RabinKarpMultiLevelChunker {
    fn window_size(&self) -> usize {
        self.window_size
    }

    fn boundaries(&self, data: &[u8], chunk_sizes: &[u64], lead_zero_bytes: usize) -> Vec<Boundary> {
        if chunk_sizes.is_empty() || data.is_empty() {
            return Vec::new();
        }
        let masks: Vec<u64> = chunk_sizes.iter().map(|&cs| mask_for(cs)).collect();
        let max_lens: Vec<u64> = chunk_sizes.iter().map(|&cs| cs.saturating_mul(self.max_multiple)).collect();

        let mut out = Vec::new();
        let mut hash: u64 = 0;
        // Ring buffer of the window's actual byte values (virtual leading
        // zeros count as 0u8), used to subtract the outgoing byte's
        // contribution on each slide.
        let mut window = vec![0u8; self.window_size];
        let mut window_pos = 0usize;

        // distance since the last boundary at each level, to enforce
        // max_lens when the hash never triggers.
        let mut since_boundary = vec![0u64; chunk_sizes.len()];

        let total_lead = lead_zero_bytes;
        let total_len = total_lead as u64 + data.len() as u64;

        for virtual_pos in 0..total_len {
            let byte = if virtual_pos < total_lead as u64 {
                0u8
            } else {
                data[(virtual_pos - total_lead as u64) as usize]
            };

            let outgoing = window[window_pos];
            hash = hash.wrapping_sub((outgoing as u64).wrapping_mul(self.base_pow));
            hash = hash.wrapping_mul(self.base);
            hash = hash.wrapping_add(byte as u64);
            window[window_pos] = byte;
            window_pos = (window_pos + 1) % self.window_size;

            for v in &mut since_boundary {
                *v += 1;
            }

            if virtual_pos + 1 < self.window_size as u64 {
                // Window not yet full; no boundary decisions (the "start
                // offset" lead bytes exist precisely to avoid this case for
                // real positions at lead_zero_bytes == window_size - 1).
                continue;
            }

            if virtual_pos < total_lead as u64 {
                continue; // still inside the virtual lead, not a real position
            }

            let real_pos = virtual_pos - total_lead as u64 + 1; // position just after this byte
            let mut level: Option<u32> = None;
            for (l, mask) in masks.iter().enumerate().rev() {
                let forced = since_boundary[l] >= max_lens[l];
                if (*mask == 0) || (hash & mask == 0) || forced {
                    level = Some(l as u32);
                    break;
                }
            }
            if let Some(l) = level {
                out.push((real_pos, l));
                for v in since_boundary.iter_mut().take((l as usize) + 1) {
                    *v = 0;
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let chunker = RabinKarpMultiLevelChunker::default();
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let sizes = [128u64, 128 * 128 / 32];
        let b1 = chunker.boundaries(&data, &sizes, chunker.window_size() - 1);
        let b2 = chunker.boundaries(&data, &sizes, chunker.window_size() - 1);
        assert_eq!(b1, b2);
    }

    #[test]
    fn boundaries_are_ascending_and_nested() {
        let chunker = RabinKarpMultiLevelChunker::default();
        let data: Vec<u8> = (0..50_000u32).map(|i| ((i * 2654435761) % 256) as u8).collect();
        let sizes = [128u64, 512, 2048];
        let b = chunker.boundaries(&data, &sizes, chunker.window_size() - 1);
        let mut prev = 0u64;
        for (pos, level) in &b {
            assert!(*pos > prev || b.is_empty());
            assert!((*level as usize) < sizes.len());
            prev = *pos;
        }
    }

    #[test]
    fn identical_prefix_yields_identical_leading_boundaries() {
        let chunker = RabinKarpMultiLevelChunker::default();
        let shared: Vec<u8> = (0..20_000u32).map(|i| (i % 256) as u8).collect();
        let mut a = shared.clone();
        let mut b = shared.clone();
        a.extend_from_slice(b"AAAA-tail-for-a");
        b.extend_from_slice(b"BBBB-tail-for-b-longer");
        let sizes = [128u64];
        let ba = chunker.boundaries(&a, &sizes, chunker.window_size() - 1);
        let bb = chunker.boundaries(&b, &sizes, chunker.window_size() - 1);
        // Every boundary strictly inside the shared prefix must match.
        let shared_len = shared.len() as u64 - chunker.window_size() as u64;
        let pa: Vec<_> = ba.iter().filter(|(p, _)| *p < shared_len).collect();
        let pb: Vec<_> = bb.iter().filter(|(p, _)| *p < shared_len).collect();
        assert_eq!(pa, pb);
    }
}
