//! Commonly used imports for convenience.
//!
//! # Example
//!
//! ```
//! use phylosim_sim::prelude::*;
//!
//! let tree = PhyloTree::from_newick("((A:0.1,B:0.2):0.05,C:0.3);").unwrap();
//! let mut sim = SimulationBuilder::new()
//!     .model("HKY{2}+G4{0.5}")
//!     .sequence_length(20)
//!     .seed(1)
//!     .build()
//!     .unwrap();
//! let mut sink = MemorySink::default();
//! sim.run(&tree, &mut sink).unwrap();
//! assert_eq!(sink.leaves().len(), 3);
//! ```

pub use crate::base::{Sequence, SequenceType};
pub use crate::errors::{self, ConfigError, SimulationError, TreeError};
pub use crate::evolution::{
    FixedMatrix, Gtr, JukesCantor, ModelDefinition, RateConfig, RateModel, SubstitutionModel,
    TransitionMatrix,
};
pub use crate::output::{AlignmentFile, AlignmentFormat, AlignmentWriter, LeafSink, MemorySink};
pub use crate::simulation::{
    AncestralConfig, Configuration, FunDiConfig, SimulationBuilder, SimulationStats, Simulator,
};
pub use crate::tree::{NodeId, PhyloTree};
