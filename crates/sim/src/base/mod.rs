//! Base types for sequence representation.
//!
//! This module provides the foundational types for representing alphabets
//! and state sequences.

mod alphabet;
mod sequence;

pub use alphabet::SequenceType;
pub use sequence::Sequence;
