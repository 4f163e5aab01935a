//! Simulation configuration.
//!
//! A [`Configuration`] fully describes a run apart from the tree, and can be
//! stored as JSON to reproduce it.

use super::ancestral::AncestralConfig;
use super::fundi::FunDiConfig;
use crate::base::SequenceType;
use crate::errors::ConfigError;
use crate::output::AlignmentFormat;
use phylosim_codec::CodecStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The master configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub execution: ExecutionConfig,
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub initialization: InitializationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Size and reproducibility of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of sites per sequence
    pub sequence_length: usize,
    /// Number of independent alignments to generate
    #[serde(default = "default_num_datasets")]
    pub num_datasets: usize,
    /// Optional RNG seed; dataset `i` uses `seed + i`
    #[serde(default)]
    pub seed: Option<u64>,
}

/// The evolutionary process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    #[serde(default)]
    pub sequence_type: SequenceType,
    /// Model string, e.g. `GTR{1,2,1,1,2,1}+F{0.1,0.2,0.3,0.4}+I{0.1}+G4{0.5}`
    pub model: String,
    /// Factor applied to every branch length
    #[serde(default = "default_branch_scale")]
    pub branch_scale: f64,
    /// Models that branches can request through a `[&model=NAME]` annotation
    #[serde(default)]
    pub branch_models: BTreeMap<String, String>,
    #[serde(default)]
    pub fundi: Option<FunDiConfig>,
}

/// Root sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InitializationConfig {
    #[serde(default)]
    pub ancestral: AncestralConfig,
}

/// How alignments are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: AlignmentFormat,
    #[serde(default)]
    pub compression: CodecStrategy,
    /// Write each leaf as soon as it is simulated
    #[serde(default = "default_streaming")]
    pub streaming: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: AlignmentFormat::default(),
            compression: CodecStrategy::default(),
            streaming: default_streaming(),
        }
    }
}

fn default_num_datasets() -> usize {
    1
}

fn default_branch_scale() -> f64 {
    1.0
}

fn default_streaming() -> bool {
    true
}

impl Configuration {
    /// A DNA configuration with defaults for everything but length and model.
    pub fn new(sequence_length: usize, model: impl Into<String>) -> Self {
        Self {
            execution: ExecutionConfig {
                sequence_length,
                num_datasets: default_num_datasets(),
                seed: None,
            },
            evolution: EvolutionConfig {
                sequence_type: SequenceType::default(),
                model: model.into(),
                branch_scale: default_branch_scale(),
                branch_models: BTreeMap::new(),
                fundi: None,
            },
            initialization: InitializationConfig::default(),
            output: OutputConfig::default(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text)
            .map_err(|e| ConfigError::InvalidParameter(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidParameter(e.to_string()))
    }

    /// Checks that do not need the tree.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let length = self.execution.sequence_length;
        if length == 0 && self.initialization.ancestral == AncestralConfig::Random {
            return Err(ConfigError::InvalidParameter(
                "sequence_length must be positive".into(),
            ));
        }
        if self.execution.num_datasets == 0 {
            return Err(ConfigError::InvalidParameter(
                "num_datasets must be positive".into(),
            ));
        }
        let scale = self.evolution.branch_scale;
        if !scale.is_finite() || scale < 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "branch_scale must be a non-negative number, got {scale}"
            )));
        }
        if let Some(fundi) = &self.evolution.fundi {
            fundi.validate()?;
        }
        Ok(())
    }
}
