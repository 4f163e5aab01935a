//! # Simulation Crate
//!
//! The `sim` crate evolves sequences along a rooted phylogenetic tree.
//! It includes modules for alphabets and sequences, substitution and rate
//! models, tree parsing, the tree-walking engine and alignment output.

pub mod base;
pub mod errors;
pub mod evolution;
pub mod output;
pub mod prelude;
pub mod sampling;
pub mod simulation;
pub mod tree;

pub use base::{Sequence, SequenceType};
pub use tree::PhyloTree;
