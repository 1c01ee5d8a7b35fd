//! Fixed-Width Bitmask for Component Signatures
//!
//! This module implements the bitset type used for component signatures,
//! query filters, and system access sets.
//!
//! ## Purpose
//!
//! A [`Bitmask`] records a set of component identifiers as bits in a small
//! array of `u64` words. It backs three distinct concerns:
//!
//! - **Archetype signatures** — which component types an archetype contains,
//! - **Query filters** — required (`with`) and excluded (`none`) sets,
//! - **Access sets** — components read/written by a system, used by the
//!   scheduler to stage conflict-free work.
//!
//! ## Behavior
//!
//! Width is fixed at construction: bit positions at or beyond `max_bits` are
//! rejected with [`OutOfRangeError`] rather than silently ignored, so a
//! signature can never claim a component the registry does not know about.
//! Word storage rounds up to the next multiple of 64; the unused high bits of
//! the last word stay zero (set/clear only touch in-range positions), which
//! keeps whole-word comparisons valid.
//!
//! ## Invariants
//!
//! - `words.len() == ceil(max_bits / 64)` for the lifetime of the mask.
//! - Bits at positions `>= max_bits` are always zero.

use crate::engine::error::OutOfRangeError;

const WORD_BITS: usize = u64::BITS as usize;


/// A fixed-width set of bit positions backed by `u64` words.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Bitmask {
    words: Vec<u64>,
    max_bits: usize,
}

impl Bitmask {
    /// Creates an empty mask able to hold positions `0..max_bits`.
    pub fn new(max_bits: usize) -> Self {
        let word_count = max_bits.div_ceil(WORD_BITS);
        Self { words: vec![0; word_count], max_bits }
    }

    /// Returns the configured width of the mask.
    #[inline]
    pub fn max_bits(&self) -> usize {
        self.max_bits
    }

    #[inline]
    fn check(&self, position: usize) -> Result<(usize, u64), OutOfRangeError> {
        if position >= self.max_bits {
            return Err(OutOfRangeError { position, max_bits: self.max_bits });
        }
        Ok((position / WORD_BITS, 1u64 << (position % WORD_BITS)))
    }

    /// Sets the bit at `position`.
    ///
    /// # Errors
    /// [`OutOfRangeError`] when `position >= max_bits`.
    #[inline]
    pub fn add(&mut self, position: usize) -> Result<(), OutOfRangeError> {
        let (word, bit) = self.check(position)?;
        self.words[word] |= bit;
        Ok(())
    }

    /// Clears the bit at `position`.
    ///
    /// # Errors
    /// [`OutOfRangeError`] when `position >= max_bits`.
    #[inline]
    pub fn remove(&mut self, position: usize) -> Result<(), OutOfRangeError> {
        let (word, bit) = self.check(position)?;
        self.words[word] &= !bit;
        Ok(())
    }

    /// Tests the bit at `position`.
    ///
    /// # Errors
    /// [`OutOfRangeError`] when `position >= max_bits`.
    #[inline]
    pub fn has(&self, position: usize) -> Result<bool, OutOfRangeError> {
        let (word, bit) = self.check(position)?;
        Ok(self.words[word] & bit != 0)
    }

    /// Number of set bits.
    #[inline]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns `true` if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns `true` if every bit set in `other` is also set in `self`.
    ///
    /// Comparison runs over the shorter word span; bits beyond either mask's
    /// width count as unset.
    #[inline]
    pub fn contains_all(&self, other: &Bitmask) -> bool {
        let common = self.words.len().min(other.words.len());
        for i in 0..common {
            if other.words[i] & !self.words[i] != 0 {
                return false;
            }
        }
        other.words[common..].iter().all(|&w| w == 0)
    }

    /// Returns `true` if `self` and `other` share no set bit.
    #[inline]
    pub fn disjoint_with(&self, other: &Bitmask) -> bool {
        let common = self.words.len().min(other.words.len());
        (0..common).all(|i| self.words[i] & other.words[i] == 0)
    }

    /// Iterates set positions in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let base = wi * WORD_BITS;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(base + tz)
            })
        })
    }

    /// Clones the mask with room for one more bit position.
    ///
    /// Used when extending an archetype's component set by one member.
    pub fn copy_plus_one(&self) -> Bitmask {
        let mut copy = Bitmask::new(self.max_bits + 1);
        copy.words[..self.words.len()].copy_from_slice(&self.words);
        copy
    }

    /// Raw word storage, low word first.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_has_remove_round_trip() {
        let mut m = Bitmask::new(130);
        assert!(!m.has(0).unwrap());
        m.add(0).unwrap();
        m.add(64).unwrap();
        m.add(129).unwrap();
        assert!(m.has(0).unwrap());
        assert!(m.has(64).unwrap());
        assert!(m.has(129).unwrap());
        assert_eq!(m.count(), 3);
        m.remove(64).unwrap();
        assert!(!m.has(64).unwrap());
        assert_eq!(m.count(), 2);
    }

    #[test]
    fn out_of_range_is_reported() {
        let mut m = Bitmask::new(8);
        let err = m.add(8).unwrap_err();
        assert_eq!(err.position, 8);
        assert_eq!(err.max_bits, 8);
        assert!(m.has(8).is_err());
        assert!(m.remove(100).is_err());
    }

    #[test]
    fn containment_and_disjointness() {
        let mut a = Bitmask::new(128);
        let mut b = Bitmask::new(128);
        a.add(1).unwrap();
        a.add(70).unwrap();
        b.add(70).unwrap();
        assert!(a.contains_all(&b));
        assert!(!b.contains_all(&a));
        assert!(!a.disjoint_with(&b));
        b.remove(70).unwrap();
        b.add(2).unwrap();
        assert!(a.disjoint_with(&b));
        // empty set is contained in everything
        let empty = Bitmask::new(128);
        assert!(a.contains_all(&empty));
        assert!(empty.contains_all(&empty));
    }

    #[test]
    fn iter_ones_is_ascending() {
        let mut m = Bitmask::new(200);
        for p in [3usize, 64, 65, 199] {
            m.add(p).unwrap();
        }
        let ones: Vec<usize> = m.iter_ones().collect();
        assert_eq!(ones, vec![3, 64, 65, 199]);
    }

    #[test]
    fn copy_plus_one_extends_width() {
        let mut m = Bitmask::new(64);
        m.add(63).unwrap();
        assert!(m.add(64).is_err());
        let mut wider = m.copy_plus_one();
        assert!(wider.has(63).unwrap());
        wider.add(64).unwrap();
        assert!(wider.has(64).unwrap());
    }
}
