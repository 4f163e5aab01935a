use super::SequenceType;
use crate::errors::{InvalidSymbol, OutOfBounds};

/// Mutable sequence of state indices.
///
/// A `Sequence` stores one `u8` state per site, each in `[0, S)` for the
/// alphabet it was built with. The alphabet is not stored: sequences are
/// owned by tree nodes during a run and all of them share the run's
/// [`SequenceType`], so it is passed explicitly whenever symbols are needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Sequence(Vec<u8>);

impl Sequence {
    /// Create a new, empty `Sequence`.
    ///
    /// ```rust
    /// # use phylosim_sim::base::Sequence;
    /// let seq = Sequence::new();
    /// assert_eq!(seq.len(), 0);
    /// ```
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a `Sequence` with reserved capacity for `capacity` sites.
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Create a `Sequence` of `len` sites, all set to `state`.
    pub fn filled(state: u8, len: usize) -> Self {
        Self(vec![state; len])
    }

    /// Create a `Sequence` from raw state indices. States are not checked.
    pub fn from_states(states: Vec<u8>) -> Self {
        Self(states)
    }

    /// Parse symbols (e.g. `"ACGT"`) with the given alphabet.
    ///
    /// Whitespace is ignored so sequences copied from wrapped files work.
    pub fn from_symbols(text: &str, seq_type: SequenceType) -> Result<Self, InvalidSymbol> {
        text.bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .map(|b| seq_type.state_of(b))
            .collect::<Result<Vec<u8>, _>>()
            .map(Self)
    }

    /// Return the length of the sequence in sites.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` if the sequence contains no sites.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the state at `index`, or `None` if out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    /// Set the state at `index`.
    #[inline]
    pub fn set(&mut self, index: usize, state: u8) -> Result<(), OutOfBounds> {
        let len = self.len();
        self.0
            .get_mut(index)
            .map(|slot| *slot = state)
            .ok_or(OutOfBounds { index, len })
    }

    /// Borrow the underlying state slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Borrow the mutable underlying state slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Resize to `len` sites, filling new sites with state 0.
    ///
    /// Keeps the allocation, which is what lets released node buffers be
    /// reused for the next node.
    #[inline]
    pub fn resize(&mut self, len: usize) {
        self.0.resize(len, 0);
    }

    /// Largest state index, or `None` for an empty sequence.
    pub fn max_state(&self) -> Option<u8> {
        self.0.iter().copied().max()
    }

    /// Render the sequence as text with the given alphabet.
    pub fn to_symbols(&self, seq_type: SequenceType) -> String {
        self.0
            .iter()
            .map(|&s| seq_type.symbol_of(s) as char)
            .collect()
    }

    /// Write the symbols of this sequence into `out` (cleared first).
    pub fn write_symbols(&self, seq_type: SequenceType, out: &mut Vec<u8>) {
        out.clear();
        out.extend(self.0.iter().map(|&s| seq_type.symbol_of(s)));
    }

    /// Number of sites where `self` and `other` differ.
    pub fn hamming_distance(&self, other: &Sequence) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a != b)
            .count()
            + self.len().abs_diff(other.len())
    }
}

impl From<Vec<u8>> for Sequence {
    fn from(states: Vec<u8>) -> Self {
        Self(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_new() {
        let seq = Sequence::new();
        assert_eq!(seq.len(), 0);
        assert!(seq.is_empty());
    }

    #[test]
    fn test_sequence_with_capacity() {
        let seq = Sequence::with_capacity(100);
        assert!(seq.is_empty());
        assert!(seq.0.capacity() >= 100);
    }

    #[test]
    fn test_from_symbols_dna() {
        let seq = Sequence::from_symbols("ACGT acgt", SequenceType::Dna).unwrap();
        assert_eq!(seq.as_slice(), &[0, 1, 2, 3, 0, 1, 2, 3]);
        assert_eq!(seq.to_symbols(SequenceType::Dna), "ACGTACGT");
    }

    #[test]
    fn test_from_symbols_invalid() {
        let err = Sequence::from_symbols("ACXT", SequenceType::Dna).unwrap_err();
        assert_eq!(err, InvalidSymbol(b'X'));
    }

    #[test]
    fn test_get_and_set() {
        let mut seq = Sequence::filled(0, 3);
        seq.set(1, 2).unwrap();
        assert_eq!(seq.get(1), Some(2));
        assert_eq!(seq.get(3), None);

        let err = seq.set(5, 1).unwrap_err();
        assert_eq!(err.index, 5);
        assert_eq!(err.len, 3);
    }

    #[test]
    fn test_resize_reuses_buffer() {
        let mut seq = Sequence::with_capacity(64);
        seq.resize(10);
        assert_eq!(seq.len(), 10);
        assert!(seq.as_slice().iter().all(|&s| s == 0));
        seq.resize(4);
        assert_eq!(seq.len(), 4);
        assert!(seq.0.capacity() >= 64);
    }

    #[test]
    fn test_write_symbols_clears_output() {
        let seq = Sequence::from_states(vec![0, 1, 1, 0]);
        let mut out = b"stale".to_vec();
        seq.write_symbols(SequenceType::Binary, &mut out);
        assert_eq!(out, b"0110");
    }

    #[test]
    fn test_hamming_distance() {
        let a = Sequence::from_states(vec![0, 1, 2, 3]);
        let b = Sequence::from_states(vec![0, 2, 2, 1]);
        assert_eq!(a.hamming_distance(&b), 2);
        assert_eq!(a.hamming_distance(&a), 0);
    }

    #[test]
    fn test_max_state() {
        assert_eq!(Sequence::new().max_state(), None);
        assert_eq!(Sequence::from_states(vec![1, 3, 2]).max_state(), Some(3));
    }
}
