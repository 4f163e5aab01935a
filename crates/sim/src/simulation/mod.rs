//! Simulation engine and its configuration.
//!
//! - `Simulator`: walks the tree and evolves sequences edge by edge.
//! - `SimulationBuilder`: fluent builder with defaults and validation.
//! - `Configuration`: serializable description of a complete run.
//! - `SequenceStore`: node buffers with reader counting and reuse.

pub mod ancestral;
pub mod builder;
pub mod configs;
pub mod engine;
pub mod fundi;
pub mod mode;
pub mod store;

pub use ancestral::{ancestral_from_text, random_ancestral, AncestralConfig};
pub use builder::SimulationBuilder;
pub use configs::{
    Configuration, EvolutionConfig, ExecutionConfig, InitializationConfig, OutputConfig,
};
pub use engine::{SimulationStats, Simulator, ASC_LENGTH_RATIO};
pub use fundi::{swap_sites, FunDiConfig};
pub use mode::SimulationMode;
pub use store::SequenceStore;
