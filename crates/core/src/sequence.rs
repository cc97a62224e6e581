//! Deterministic generated-value sequences
//!
//! Every process of a parallel run walks the same test bodies and must pick
//! the same generated parameter value in the same iteration, otherwise a later
//! collective call pairs up the wrong iterations and hangs. A [`Sequence`] can
//! only be built from order-stable sources (ranges and explicit value lists),
//! never from process-local randomness.
//!
//! [`SequenceDigest`] hashes the enumerated values so a group can cross-check
//! that all ranks saw the same sequence.

use crate::error::{Error, Result};
use std::fmt::Debug;
use xxhash_rust::xxh3::Xxh3;

/// An order-stable, finite list of generated values.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence<T> {
    values: Vec<T>,
}

impl<T> Sequence<T> {
    /// Explicit values, enumerated in the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is empty.
    pub fn values(values: impl IntoIterator<Item = T>) -> Result<Self> {
        let values: Vec<T> = values.into_iter().collect();
        if values.is_empty() {
            return Err(Error::InvalidSequence("no values to generate".to_string()));
        }
        Ok(Self { values })
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; empty sequences cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        self.values.get(index)
    }

    /// Iterate in generation order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    /// Consume into the underlying values
    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

impl<T: Debug> Sequence<T> {
    /// Digest of the enumerated values, in order.
    pub fn digest(&self) -> u64 {
        let mut digest = SequenceDigest::new();
        for value in &self.values {
            digest.record(value);
        }
        digest.finish()
    }
}

/// Half-open integer range `[start, end)`, ascending.
///
/// # Errors
///
/// Returns an error if the range is empty.
pub fn range(start: i64, end: i64) -> Result<Sequence<i64>> {
    if start >= end {
        return Err(Error::InvalidSequence(format!(
            "empty range {start}..{end}"
        )));
    }
    Sequence::values(start..end)
}

/// Evenly stepped range `[start, end)`.
///
/// # Errors
///
/// Returns an error if `step` is zero or the range yields no values.
pub fn range_step(start: i64, end: i64, step: i64) -> Result<Sequence<i64>> {
    if step == 0 {
        return Err(Error::InvalidSequence("zero step".to_string()));
    }
    let mut values = Vec::new();
    let mut current = start;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        values.push(current);
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    Sequence::values(values)
}

/// Order-sensitive running hash over generated values.
///
/// Values are hashed through their `Debug` rendering so any generated type
/// can take part without extra trait bounds.
#[derive(Clone)]
pub struct SequenceDigest {
    hasher: Xxh3,
    count: u64,
}

impl SequenceDigest {
    /// Empty digest
    pub fn new() -> Self {
        Self {
            hasher: Xxh3::new(),
            count: 0,
        }
    }

    /// Append one value
    pub fn record<T: Debug + ?Sized>(&mut self, value: &T) {
        let rendered = format!("{value:?}");
        self.hasher.update(&(rendered.len() as u64).to_le_bytes());
        self.hasher.update(rendered.as_bytes());
        self.count += 1;
    }

    /// Number of recorded values
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Final hash, mixing in the count
    pub fn finish(&self) -> u64 {
        let mut hasher = self.hasher.clone();
        hasher.update(&self.count.to_le_bytes());
        hasher.digest()
    }
}

impl Default for SequenceDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SequenceDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceDigest")
            .field("count", &self.count)
            .field("digest", &self.finish())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_range_values() {
        let seq = range(1, 4).unwrap();
        assert_eq!(seq.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn test_empty_range_rejected() {
        assert!(matches!(range(4, 4), Err(Error::InvalidSequence(_))));
        assert!(Sequence::<u8>::values(Vec::new()).is_err());
    }

    #[test]
    fn test_range_step() {
        let up = range_step(0, 10, 3).unwrap();
        assert_eq!(up.into_values(), vec![0, 3, 6, 9]);
        let down = range_step(3, 0, -1).unwrap();
        assert_eq!(down.into_values(), vec![3, 2, 1]);
        assert!(range_step(0, 5, 0).is_err());
        assert!(range_step(0, 5, -1).is_err());
    }

    #[test]
    fn test_digest_is_order_sensitive() {
        let a = Sequence::values([1, 2, 3]).unwrap();
        let b = Sequence::values([3, 2, 1]).unwrap();
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_digest_distinguishes_prefix() {
        let a = Sequence::values([1, 2]).unwrap();
        let b = Sequence::values([1, 2, 3]).unwrap();
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_range_step_stops_at_integer_bounds() {
        let up = range_step(i64::MAX - 1, i64::MAX, 2).unwrap();
        assert_eq!(up.iter().copied().collect::<Vec<_>>(), vec![i64::MAX - 1]);
        let down = range_step(i64::MIN + 2, i64::MIN, -3).unwrap();
        assert_eq!(down.iter().copied().collect::<Vec<_>>(), vec![i64::MIN + 2]);
    }

    #[test]
    fn test_incremental_digest_matches_sequence_digest() {
        let seq = range(1, 4).unwrap();
        let mut digest = SequenceDigest::new();
        for v in seq.iter() {
            digest.record(v);
        }
        assert_eq!(digest.count(), 3);
        assert_eq!(digest.finish(), seq.digest());
    }

    proptest! {
        #[test]
        fn prop_digest_stable_across_enumerations(start in -100i64..100, len in 1i64..50) {
            let first = range(start, start + len).unwrap();
            let second = range(start, start + len).unwrap();
            prop_assert_eq!(first.digest(), second.digest());
        }
    }
}
