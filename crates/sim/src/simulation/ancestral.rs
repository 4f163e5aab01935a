//! Root sequence generation.

use crate::base::{Sequence, SequenceType};
use crate::errors::ConfigError;
use crate::evolution::SubstitutionModel;
use crate::sampling::ProbabilitySampler;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Where the root sequence comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AncestralConfig {
    /// Drawn from the model's stationary frequencies.
    #[default]
    Random,
    /// A fixed sequence of symbols.
    Sequence(String),
}

/// Draw `length` states from the model's stationary frequencies.
///
/// Equal frequencies use a uniform draw per site.
pub fn random_ancestral<R: Rng + ?Sized>(
    model: &dyn SubstitutionModel,
    length: usize,
    sampler: &mut ProbabilitySampler,
    rng: &mut R,
) -> Sequence {
    let n = model.num_states();
    if model.has_equal_frequencies() {
        let states = (0..length).map(|_| rng.random_range(0..n) as u8).collect();
        return Sequence::from_states(states);
    }

    let freqs = model.state_frequencies();
    let mut cumulative = Vec::with_capacity(n);
    let mut sum = 0.0;
    let mut max_state = 0;
    for (i, &f) in freqs.iter().enumerate() {
        sum += f;
        cumulative.push(sum.min(1.0));
        if f > freqs[max_state] {
            max_state = i;
        }
    }
    if let Some(last) = cumulative.last_mut() {
        *last = 1.0;
    }
    let states = (0..length)
        .map(|_| sampler.sample_from_accumulated_row(&cumulative, max_state, rng) as u8)
        .collect();
    Sequence::from_states(states)
}

/// Parse a fixed root sequence, checking it against the expected length.
pub fn ancestral_from_text(
    text: &str,
    seq_type: SequenceType,
    expected_length: Option<usize>,
) -> Result<Sequence, ConfigError> {
    let seq = Sequence::from_symbols(text, seq_type)
        .map_err(|e| ConfigError::InvalidAncestral(e.to_string()))?;
    if seq.is_empty() {
        return Err(ConfigError::InvalidAncestral("sequence is empty".into()));
    }
    if let Some(expected) = expected_length {
        if expected != seq.len() {
            return Err(ConfigError::InvalidAncestral(format!(
                "sequence has {} sites but the sequence length is {expected}",
                seq.len()
            )));
        }
    }
    Ok(seq)
}
