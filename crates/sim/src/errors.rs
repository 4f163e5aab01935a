//! Error types shared across the simulation crate.

use std::{fmt, io};
use thiserror::Error;

/// Error returned when a symbol cannot be mapped to a state of the alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSymbol(pub u8);

impl fmt::Display for InvalidSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid symbol '{}' (byte {}) for this alphabet",
            self.0 as char, self.0
        )
    }
}

impl std::error::Error for InvalidSymbol {}

/// Error returned when an index is outside the valid range for a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Index {index} out of bounds (len = {len})")]
pub struct OutOfBounds {
    /// The index that was requested
    pub index: usize,

    /// The current length of the sequence (upper bound)
    pub len: usize,
}

/// Errors raised while reading or validating a tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    /// Malformed Newick input.
    #[error("Invalid Newick string at byte {position}: {message}")]
    Parse { position: usize, message: String },

    /// A leaf has no name and can therefore not be written to an alignment.
    #[error("Leaf node {0} has no name")]
    UnnamedLeaf(usize),

    /// Two leaves carry the same name.
    #[error("Duplicate leaf name: {0}")]
    DuplicateLeaf(String),

    /// A branch length is negative or not finite.
    #[error("Invalid branch length {length} above node {node}")]
    InvalidBranchLength { node: usize, length: f64 },
}

impl TreeError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}

/// Configuration errors. These are fatal and reported before any sequence is
/// simulated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Unsupported sequence type: {0}")]
    UnsupportedSequenceType(String),

    #[error("Invalid model '{model}': {reason}")]
    InvalidModel { model: String, reason: String },

    #[error("Model has {model} states but the alphabet has {alphabet}")]
    StateCountMismatch { model: usize, alphabet: usize },

    #[error("Invalid rate heterogeneity: {0}")]
    InvalidRates(String),

    #[error("Branch above node '{node}' requests unknown model '{model}'")]
    MissingBranchModel { node: String, model: String },

    #[error("Branch model '{0}' may only add +I to its substitution model")]
    UnsupportedBranchModel(String),

    #[error("Invalid FunDi configuration: {0}")]
    InvalidFunDi(String),

    #[error("Invalid ancestral sequence: {0}")]
    InvalidAncestral(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl ConfigError {
    pub(crate) fn model(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidModel {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the simulation run itself.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A transition matrix row carries no probability mass at all.
    #[error("Transition matrix row for state {state} is all zero (scaled branch length {branch_length})")]
    DegenerateRow { state: usize, branch_length: f64 },

    /// Ascertainment correction kept fewer variable sites than requested.
    #[error("Only {found} of {needed} sites are variable after ascertainment correction")]
    TooFewVariableSites { needed: usize, found: usize },

    /// A node sequence was recycled while a child still needed it.
    #[error("Sequence of node {parent} was released before its child {child}")]
    ReleasedTooEarly { parent: usize, child: usize },

    /// Output could not be written; any partial output is invalid.
    #[error("Output error: {0}")]
    Io(#[from] io::Error),
}

impl From<TreeError> for SimulationError {
    fn from(e: TreeError) -> Self {
        Self::Config(ConfigError::Tree(e))
    }
}
