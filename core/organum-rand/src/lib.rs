//! core/organum-rand/src/lib.rs
//! Deterministic pseudo-random stream for score generation.
//!
//! The whole pipeline draws from one [`SeededRng`] passed by mutable
//! reference. Same seed, same sequence of calls, same output — the draw
//! order consumed by each generator is part of the external contract, so
//! callers must not reorder draws between runs. Sub-seeding is always
//! explicit (`seed + 1000` style), never implicit forking.
//!
//! ```
//! use organum_rand::SeededRng;
//! let mut a = SeededRng::new(42);
//! let mut b = SeededRng::new(42);
//! assert_eq!(a.range(0, 100), b.range(0, 100));
//! assert_eq!(a.chance(0.5), b.chance(0.5));
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic random source seeded from a 32-bit value.
#[derive(Debug, Clone)]
pub struct SeededRng {
    inner: ChaCha8Rng,
}

impl SeededRng {
    /// Create a stream from a 32-bit seed.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self { inner: ChaCha8Rng::seed_from_u64(u64::from(seed)) }
    }

    /// One uniform draw in [0, 1).
    fn uniform(&mut self) -> f32 {
        self.inner.gen_range(0.0f32..1.0)
    }

    /// Bernoulli draw: true with probability `p` (clamped to 0..=1).
    pub fn chance(&mut self, p: f32) -> bool {
        if p <= 0.0 {
            // Still consume a draw so call sites keep a stable order.
            let _ = self.uniform();
            return false;
        }
        if p >= 1.0 {
            let _ = self.uniform();
            return true;
        }
        self.uniform() < p
    }

    /// Uniform integer in the closed range `lo..=hi`.
    ///
    /// # Panics
    /// Panics if `lo > hi`.
    pub fn range(&mut self, lo: i32, hi: i32) -> i32 {
        assert!(lo <= hi, "empty range {lo}..={hi}");
        self.inner.gen_range(lo..=hi)
    }

    /// Uniform float in `lo..hi`.
    pub fn float(&mut self, lo: f32, hi: f32) -> f32 {
        if lo >= hi {
            let _ = self.uniform();
            return lo;
        }
        self.inner.gen_range(lo..hi)
    }

    /// Index drawn proportionally to `weights`.
    ///
    /// Zero weights are legal; at least one weight must be positive.
    ///
    /// # Panics
    /// Panics if `weights` is empty or sums to zero.
    pub fn weighted(&mut self, weights: &[f32]) -> usize {
        let total: f32 = weights.iter().filter(|w| **w > 0.0).sum();
        assert!(total > 0.0, "weighted draw needs a positive weight");
        let mut roll = self.uniform() * total;
        for (idx, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            if roll < w {
                return idx;
            }
            roll -= w;
        }
        // Floating-point shortfall lands on the last positive weight.
        weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
    }

    /// Uniformly chosen element of a non-empty slice.
    ///
    /// # Panics
    /// Panics if `items` is empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "pick from empty slice");
        let idx = self.inner.gen_range(0..items.len());
        &items[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SeededRng::new(7);
        let mut b = SeededRng::new(7);
        for _ in 0..64 {
            assert_eq!(a.range(0, 1000), b.range(0, 1000));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SeededRng::new(1);
        let mut b = SeededRng::new(2);
        let draws_a: Vec<i32> = (0..16).map(|_| a.range(0, 1_000_000)).collect();
        let draws_b: Vec<i32> = (0..16).map(|_| b.range(0, 1_000_000)).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn chance_extremes_still_consume_a_draw() {
        let mut a = SeededRng::new(5);
        let mut b = SeededRng::new(5);
        assert!(!a.chance(0.0));
        assert!(b.chance(1.0));
        // Streams stay in lockstep afterwards.
        assert_eq!(a.range(0, 100), b.range(0, 100));
    }

    #[test]
    fn range_is_closed() {
        let mut rng = SeededRng::new(9);
        let mut saw_lo = false;
        let mut saw_hi = false;
        for _ in 0..500 {
            let v = rng.range(0, 3);
            assert!((0..=3).contains(&v));
            saw_lo |= v == 0;
            saw_hi |= v == 3;
        }
        assert!(saw_lo && saw_hi);
    }

    #[test]
    fn weighted_skips_zero_weights() {
        let mut rng = SeededRng::new(11);
        for _ in 0..200 {
            let idx = rng.weighted(&[0.0, 2.0, 0.0, 1.0]);
            assert!(idx == 1 || idx == 3);
        }
    }

    #[test]
    fn weighted_respects_proportions_roughly() {
        let mut rng = SeededRng::new(13);
        let mut counts = [0u32; 2];
        for _ in 0..2000 {
            counts[rng.weighted(&[0.9, 0.1])] += 1;
        }
        assert!(counts[0] > counts[1] * 4);
    }

    #[test]
    fn pick_covers_the_slice() {
        let mut rng = SeededRng::new(17);
        let items = [10, 20, 30];
        let mut seen = [false; 3];
        for _ in 0..200 {
            let v = rng.pick(&items);
            seen[items.iter().position(|x| x == v).expect("picked from items")] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
