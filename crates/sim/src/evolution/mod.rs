//! Evolutionary models: substitution processes and rate heterogeneity.
//!
//! - **Substitution**: continuous-time Markov models (JC, K2P, HKY, GTR, fixed matrix)
//! - **Rates**: discrete or continuous Gamma, FreeRate, invariant sites
//! - **Model strings**: `GTR{..}+F{..}+I{p}+G4{a}` style definitions

mod gamma;
pub mod model;
pub mod rates;
pub mod substitution;

pub use model::ModelDefinition;
pub use rates::{RateCategories, RateConfig, RateHeterogeneity, RateModel, SiteRateAssignment};
pub use substitution::{
    FixedMatrix, Gtr, JukesCantor, SubstitutionModel, TransitionMatrix, ROW_SUM_TOLERANCE,
};
