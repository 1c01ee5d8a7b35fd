//! Fast thread-local pseudo-random number generation.
//!
//! A lightweight, lock-free source of pseudo-random numbers for randomized
//! iteration, sampling, and the engine's property tests.
//!
//! # Design
//!
//! The generator is a **thread-local xorshift64\*** RNG:
//!
//! - each thread owns independent state via `thread_local!`,
//! - state lives in a `Cell<u64>` so no borrow is needed to advance it,
//! - no global state, locks, or atomics.
//!
//! The seed is a fixed non-zero constant, so output is deterministic per
//! thread across runs.
//!
//! # Non-goals
//!
//! Not cryptographically secure. For statistically rigorous randomness use a
//! `rand`-crate generator instead.

use std::cell::Cell;
use std::thread_local;


thread_local! {static TL_RNG: Cell<u64> = const { Cell::new(0x9E37_79B9_7F4A_7C15) };}

/// Returns the next thread-local pseudo-random `u64`.
///
/// O(1), allocation-free, and contention-free; deterministic within a
/// thread given the same call sequence.
#[inline]
pub fn tl_rand_u64() -> u64 {
    TL_RNG.with(|c| {
        let mut x = c.get();
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        c.set(x);
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    })
}

/// Returns a thread-local pseudo-random value in `0..bound`.
///
/// `bound` must be non-zero. The modulo bias is irrelevant at the bounds the
/// engine uses this for.
#[inline]
pub fn tl_rand_below(bound: u64) -> u64 {
    debug_assert!(bound > 0);
    tl_rand_u64() % bound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_advances_and_stays_in_bounds() {
        let a = tl_rand_u64();
        let b = tl_rand_u64();
        assert_ne!(a, b);
        for _ in 0..1000 {
            assert!(tl_rand_below(7) < 7);
        }
    }
}
