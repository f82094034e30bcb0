//! Level schedule (§4.1): content length → tree height, and tree level →
//! target chunk size.
//!
//! Both default functions are computed with integer arithmetic rather than
//! floating-point logarithms — per the Design Note in `spec.md` §9, real
//! logarithms risk placing a length in the "wrong" bucket near a threshold
//! boundary due to rounding, which would make the schedule non-byte-exact
//! across platforms. Results are memoized per instance (the engine is
//! single-threaded per instance, so a `RefCell` suffices).

use std::cell::RefCell;
use std::collections::HashMap;

/// Function type for overriding content-length → height.
pub type LengthToHeightFn = Box<dyn Fn(u64) -> u32>;
/// Function type for overriding height → target chunk size.
pub type HeightToChunkSizeFn = Box<dyn Fn(u32) -> u64>;

/// Derives tree height from content length and target chunk size from tree
/// level, memoizing both.
pub struct LevelSchedule {
    target_chunk_size: u64,
    digest_size: u64,
    height_to_chunksize_fn: Option<HeightToChunkSizeFn>,
    length_to_height_fn: Option<LengthToHeightFn>,
    chunksize_cache: RefCell<HashMap<u32, u64>>,
    height_cache: RefCell<HashMap<u64, u32>>,
}

impl LevelSchedule {
    /// Build the default schedule for target chunk size `S` and digest size
    /// `R`.
    #[must_use]
    pub fn new(target_chunk_size: u64, digest_size: u64) -> Self {
        Self {
            target_chunk_size,
            digest_size,
            height_to_chunksize_fn: None,
            length_to_height_fn: None,
            chunksize_cache: RefCell::new(HashMap::new()),
            height_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Override the height→chunksize function (waives the `S >= 2R`
    /// precondition check performed by the engine at construction).
    #[must_use]
    pub fn with_chunksize_fn(mut self, f: HeightToChunkSizeFn) -> Self {
        self.height_to_chunksize_fn = Some(f);
        self
    }

    /// Override the length→height function.
    #[must_use]
    pub fn with_height_fn(mut self, f: LengthToHeightFn) -> Self {
        self.length_to_height_fn = Some(f);
        self
    }

    /// Target chunk size (bytes) for tree level `level`, memoized.
    ///
    /// Default formula: `cs(L) = S^(L+1) / R^L`, computed with `u128`
    /// intermediates to avoid overflow for realistic `S`, `R`, `L`.
    pub fn chunksize_for(&self, level: u32) -> u64 {
        if let Some(v) = self.chunksize_cache.borrow().get(&level) {
            return *v;
        }
        let v = if let Some(f) = &self.height_to_chunksize_fn {
            f(level)
        } else {
            default_chunksize(self.target_chunk_size, self.digest_size, level)
        };
        self.chunksize_cache.borrow_mut().insert(level, v);
        v
    }

    /// Tree height for content of length `l`, memoized.
    ///
    /// Default formula: the smallest `h` such that `l <= S * (S/R)^h`,
    /// equivalent to `ceil(log(l/S) / log(S/R))` clamped at `0`, but found
    /// by iterative integer comparison rather than floating-point logs.
    pub fn height_for(&self, l: u64) -> u32 {
        if let Some(v) = self.height_cache.borrow().get(&l) {
            return *v;
        }
        let v = if let Some(f) = &self.length_to_height_fn {
            f(l)
        } else {
            default_height(self.target_chunk_size, self.digest_size, l)
        };
        self.height_cache.borrow_mut().insert(l, v);
        v
    }

    /// Target chunk size configured at construction (`S`).
    #[must_use]
    pub fn target_chunk_size(&self) -> u64 {
        self.target_chunk_size
    }
}

fn default_chunksize(s: u64, r: u64, level: u32) -> u64 {
    let s = u128::from(s);
    let r = u128::from(r);
    let mut numerator = 1u128;
    for _ in 0..=level {
        numerator = numerator.saturating_mul(s);
    }
    let mut denominator = 1u128;
    for _ in 0..level {
        denominator = denominator.saturating_mul(r);
    }
    let v = numerator / denominator.max(1);
    u64::try_from(v).unwrap_or(u64::MAX)
}

fn default_height(s: u64, r: u64, l: u64) -> u32 {
    if l == 0 {
        return 0;
    }
    if l <= s {
        return 0;
    }
    // Smallest h with l <= s * (s/r)^h, using exact integer comparison
    // `l * r^h <= s^(h+1)` to avoid any floating-point rounding near the
    // threshold.
    let s128 = u128::from(s);
    let r128 = u128::from(r).max(1);
    let l128 = u128::from(l);
    let mut h: u32 = 0;
    let mut r_pow = 1u128; // r^h
    let mut s_pow = s128; // s^(h+1)
    loop {
        let lhs = l128.saturating_mul(r_pow);
        if lhs <= s_pow {
            return h;
        }
        h += 1;
        r_pow = r_pow.saturating_mul(r128);
        s_pow = s_pow.saturating_mul(s128);
        if h > 1024 {
            // Defensive bound: no realistic content approaches this height.
            return h;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_zero_for_empty_and_small_content() {
        let sched = LevelSchedule::new(128, 32);
        assert_eq!(sched.height_for(0), 0);
        assert_eq!(sched.height_for(128), 0);
    }

    #[test]
    fn height_monotonic_non_decreasing() {
        let sched = LevelSchedule::new(128, 32);
        let mut prev = 0;
        for l in (0..1_000_000u64).step_by(1000) {
            let h = sched.height_for(l);
            assert!(h >= prev);
            prev = h;
        }
    }

    #[test]
    fn chunksize_strictly_increasing_under_default_formula() {
        let sched = LevelSchedule::new(128, 32);
        let mut prev = sched.chunksize_for(0);
        for level in 1..6 {
            let cs = sched.chunksize_for(level);
            assert!(cs > prev, "cs({level})={cs} should exceed previous {prev}");
            prev = cs;
        }
    }

    #[test]
    fn overrides_are_honored_and_memoized_consistently() {
        let sched = LevelSchedule::new(128, 32).with_height_fn(Box::new(|_| 3));
        assert_eq!(sched.height_for(1), 3);
        assert_eq!(sched.height_for(999_999), 3);
    }

    #[test]
    fn height_beyond_single_chunk_is_positive() {
        let sched = LevelSchedule::new(128, 32);
        assert!(sched.height_for(129) >= 1);
    }
}
