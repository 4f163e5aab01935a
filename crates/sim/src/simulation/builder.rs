//! Builder pattern for creating simulators.
//!
//! Provides a fluent API for configuring a [`Simulator`] with sensible
//! defaults. Model strings are parsed in [`SimulationBuilder::build`], once
//! the sequence type is known.

use super::ancestral::AncestralConfig;
use super::fundi::FunDiConfig;
use super::Simulator;
use crate::base::SequenceType;
use crate::errors::ConfigError;
use crate::evolution::{ModelDefinition, RateConfig, RateModel, SubstitutionModel};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum ModelSource {
    Text(String),
    Definition(ModelDefinition),
}

impl ModelSource {
    fn resolve(&self, seq_type: SequenceType) -> Result<ModelDefinition, ConfigError> {
        match self {
            Self::Text(text) => ModelDefinition::parse(text, seq_type),
            Self::Definition(definition) => {
                let states = definition.substitution().num_states();
                if states != seq_type.num_states() {
                    return Err(ConfigError::StateCountMismatch {
                        model: states,
                        alphabet: seq_type.num_states(),
                    });
                }
                definition.rates().validate()?;
                Ok(definition.clone())
            }
        }
    }
}

/// Builder for constructing [`Simulator`] instances with a fluent API.
///
/// # Examples
///
/// ```
/// use phylosim_sim::base::SequenceType;
/// use phylosim_sim::simulation::SimulationBuilder;
///
/// // Simple simulator with defaults (JC, DNA)
/// let sim = SimulationBuilder::new()
///     .sequence_length(500)
///     .build()
///     .unwrap();
///
/// // With rate heterogeneity, a branch model and FunDi
/// let sim = SimulationBuilder::new()
///     .sequence_type(SequenceType::Dna)
///     .model("GTR{1,2,1,1,2,1}+I{0.1}+G4{0.8}")
///     .branch_model("FAST", "K2P{5}+I{0.3}")
///     .fundi(vec!["A".into(), "B".into()], 0.1)
///     .sequence_length(1000)
///     .seed(42)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    seq_type: SequenceType,
    model: ModelSource,
    branch_models: BTreeMap<String, ModelSource>,
    fundi: Option<FunDiConfig>,
    branch_scale: f64,
    streaming: bool,
    sequence_length: Option<usize>,
    ancestral: AncestralConfig,
    seed: Option<u64>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    /// Create a new builder: DNA, Jukes-Cantor, streaming output, random root.
    pub fn new() -> Self {
        Self {
            seq_type: SequenceType::Dna,
            model: ModelSource::Text("JC".into()),
            branch_models: BTreeMap::new(),
            fundi: None,
            branch_scale: 1.0,
            streaming: true,
            sequence_length: None,
            ancestral: AncestralConfig::Random,
            seed: None,
        }
    }

    pub fn sequence_type(mut self, seq_type: SequenceType) -> Self {
        self.seq_type = seq_type;
        self
    }

    /// Set the run-wide model from a model string.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = ModelSource::Text(model.into());
        self
    }

    /// Set the run-wide model from an already built substitution model.
    pub fn substitution_model(
        mut self,
        model: Arc<dyn SubstitutionModel>,
        rates: RateConfig,
    ) -> Self {
        self.model = ModelSource::Definition(ModelDefinition::new(model, rates));
        self
    }

    /// Register a model that branches can select with `[&model=NAME]`.
    pub fn branch_model(mut self, name: impl Into<String>, model: impl Into<String>) -> Self {
        self.branch_models
            .insert(name.into(), ModelSource::Text(model.into()));
        self
    }

    /// Register an already built branch model, with an optional invariant proportion.
    pub fn branch_substitution_model(
        mut self,
        name: impl Into<String>,
        model: Arc<dyn SubstitutionModel>,
        p_invar: f64,
    ) -> Self {
        let rates = RateConfig {
            p_invar,
            model: RateModel::Uniform,
        };
        self.branch_models.insert(
            name.into(),
            ModelSource::Definition(ModelDefinition::new(model, rates)),
        );
        self
    }

    pub fn fundi(mut self, taxa: Vec<String>, proportion: f64) -> Self {
        self.fundi = Some(FunDiConfig::new(taxa, proportion));
        self
    }

    /// Multiply every branch length by `scale`.
    pub fn branch_scale(mut self, scale: f64) -> Self {
        self.branch_scale = scale;
        self
    }

    /// Write leaves as soon as they are simulated (default) or all at the end.
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Length of a random root sequence, also checked against a fixed one.
    pub fn sequence_length(mut self, length: usize) -> Self {
        self.sequence_length = Some(length);
        self
    }

    pub fn ancestral(mut self, ancestral: AncestralConfig) -> Self {
        self.ancestral = ancestral;
        self
    }

    /// Use a fixed root sequence given as symbols.
    pub fn ancestral_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.ancestral = AncestralConfig::Sequence(sequence.into());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse and check every model and parameter.
    pub fn build(self) -> Result<Simulator, ConfigError> {
        if !self.branch_scale.is_finite() || self.branch_scale < 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "branch scale must be a non-negative number, got {}",
                self.branch_scale
            )));
        }
        if let Some(fundi) = &self.fundi {
            fundi.validate()?;
        }

        let model = self.model.resolve(self.seq_type)?;
        if model.ascertainment() && matches!(self.ancestral, AncestralConfig::Sequence(_)) {
            return Err(ConfigError::InvalidParameter(
                "+ASC needs a random root sequence to draw extra sites from".into(),
            ));
        }
        let mut branch_models = BTreeMap::new();
        for (name, source) in &self.branch_models {
            let definition = source.resolve(self.seq_type)?;
            if definition.rates().model != RateModel::Uniform || definition.ascertainment() {
                return Err(ConfigError::UnsupportedBranchModel(name.clone()));
            }
            branch_models.insert(name.clone(), definition);
        }

        Ok(Simulator::new(
            self.seq_type,
            model,
            branch_models,
            self.fundi,
            self.branch_scale,
            self.streaming,
            self.sequence_length,
            self.ancestral,
            self.seed,
        ))
    }
}
