//! Node sequence storage with reader counting and buffer reuse.

use crate::base::Sequence;
use crate::tree::NodeId;

/// Holds the sequences of the nodes that are still needed.
///
/// Each node has a pending-reader count: one per child edge, one for leaf
/// output and one for a pending FunDi swap. When the count drops to zero the
/// node's buffer goes back into a pool and is reused for a later node, so in
/// streaming mode only the sequences along the current path stay alive.
#[derive(Debug, Default)]
pub struct SequenceStore {
    slots: Vec<Option<Sequence>>,
    pending: Vec<usize>,
    pool: Vec<Sequence>,
    live: usize,
    peak: usize,
}

impl SequenceStore {
    pub fn new(num_nodes: usize) -> Self {
        Self {
            slots: vec![None; num_nodes],
            pending: vec![0; num_nodes],
            pool: Vec::new(),
            live: 0,
            peak: 0,
        }
    }

    pub fn set_readers(&mut self, node: NodeId, readers: usize) {
        self.pending[node] = readers;
    }

    pub fn pending_readers(&self, node: NodeId) -> usize {
        self.pending[node]
    }

    /// Get a buffer of `length` sites, recycled when possible. Content is unspecified.
    pub fn allocate(&mut self, length: usize) -> Sequence {
        match self.pool.pop() {
            Some(mut seq) => {
                seq.resize(length);
                seq
            }
            None => Sequence::filled(0, length),
        }
    }

    /// Store the sequence of `node`.
    pub fn insert(&mut self, node: NodeId, sequence: Sequence) {
        if let Some(old) = self.slots[node].replace(sequence) {
            self.pool.push(old);
        } else {
            self.live += 1;
            self.peak = self.peak.max(self.live);
        }
    }

    #[inline]
    pub fn get(&self, node: NodeId) -> Option<&Sequence> {
        self.slots[node].as_ref()
    }

    /// Mutable access to two distinct nodes at once.
    pub fn pair_mut(&mut self, a: NodeId, b: NodeId) -> Option<(&mut Sequence, &mut Sequence)> {
        if a == b {
            return None;
        }
        let (lo, hi) = (a.min(b), a.max(b));
        let (left, right) = self.slots.split_at_mut(hi);
        let lo_seq = left[lo].as_mut()?;
        let hi_seq = right[0].as_mut()?;
        if a < b {
            Some((lo_seq, hi_seq))
        } else {
            Some((hi_seq, lo_seq))
        }
    }

    /// Consume one reader of `node`. Returns `true` if the node was freed.
    pub fn release(&mut self, node: NodeId) -> bool {
        let pending = &mut self.pending[node];
        *pending = pending.saturating_sub(1);
        if *pending > 0 {
            return false;
        }
        match self.slots[node].take() {
            Some(seq) => {
                self.pool.push(seq);
                self.live -= 1;
                true
            }
            None => false,
        }
    }

    /// Number of sequences currently held.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Largest number of sequences held at once.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Number of released buffers waiting for reuse.
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }
}
