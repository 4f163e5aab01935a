//! Writing simulated leaf sequences.
//!
//! Leaves reach a [`LeafSink`] either as soon as they are simulated
//! (streaming) or in one pass after the walk. [`AlignmentWriter`] renders
//! PHYLIP or FASTA text, [`AlignmentFile`] adds compression and an atomic
//! rename into place, [`MemorySink`] keeps everything in memory.

mod file;
mod writer;

pub use file::AlignmentFile;
pub use writer::{AlignmentFormat, AlignmentWriter, LeafSink, MemorySink};
