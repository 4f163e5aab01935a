//! Compact model strings.
//!
//! A model is written as a substitution model followed by `+`-separated
//! modifiers, parameters in braces:
//!
//! ```text
//! JC
//! K2P{4.0}
//! HKY{2.5}+F{0.1,0.2,0.3,0.4}
//! GTR{1,2,1,1,2,1}+FQ+I{0.2}+G4{0.5}
//! JC+GC{1.5}                     continuous Gamma
//! JC+R3{0.2,0.1,0.5,1.0,0.3,2.5}  FreeRate (weight, rate pairs)
//! HKY{2}+G4{0.5}+ASC             variable sites only
//! ```

use super::rates::{RateConfig, RateModel};
use super::substitution::{Gtr, JukesCantor, SubstitutionModel};
use crate::base::SequenceType;
use crate::errors::ConfigError;
use std::fmt;
use std::sync::Arc;

/// Gamma shape used when `+G` is given without a parameter.
pub const DEFAULT_GAMMA_SHAPE: f64 = 1.0;
/// Number of discrete Gamma categories used when `+G` gives none.
pub const DEFAULT_GAMMA_CATEGORIES: usize = 4;
/// Transition/transversion ratio used when `K2P`/`HKY` give none.
pub const DEFAULT_KAPPA: f64 = 2.0;

/// A parsed model: substitution process plus rate heterogeneity.
#[derive(Clone)]
pub struct ModelDefinition {
    text: String,
    substitution: Arc<dyn SubstitutionModel>,
    rates: RateConfig,
    ascertainment: bool,
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("text", &self.text)
            .field("substitution", &self.substitution.name())
            .field("rates", &self.rates)
            .field("ascertainment", &self.ascertainment)
            .finish()
    }
}

impl ModelDefinition {
    /// Wrap an already built substitution model.
    pub fn new(substitution: Arc<dyn SubstitutionModel>, rates: RateConfig) -> Self {
        Self {
            text: substitution.name().to_string(),
            substitution,
            rates,
            ascertainment: false,
        }
    }

    /// Parse a model string for the given alphabet.
    pub fn parse(text: &str, seq_type: SequenceType) -> Result<Self, ConfigError> {
        let text = text.trim();
        let parts = split_top_level(text)?;
        let (base, modifiers) = match parts.split_first() {
            Some((base, rest)) if !base.is_empty() => (*base, rest),
            _ => return Err(ConfigError::model(text, "empty model")),
        };

        let mut frequencies: Option<Vec<f64>> = None;
        let mut rates = RateConfig::default();
        let mut seen_rates = false;
        let mut ascertainment = false;

        for modifier in modifiers {
            let (name, params) = split_params(text, modifier)?;
            let upper = name.to_ascii_uppercase();
            match upper.as_str() {
                "F" => {
                    let params = require(text, "F", params)?;
                    if params.len() != seq_type.num_states() {
                        return Err(ConfigError::model(
                            text,
                            format!(
                                "+F needs {} frequencies, got {}",
                                seq_type.num_states(),
                                params.len()
                            ),
                        ));
                    }
                    frequencies = Some(params);
                }
                "FQ" => frequencies = None,
                "ASC" => {
                    if params.is_some() {
                        return Err(ConfigError::model(text, "+ASC takes no parameters"));
                    }
                    ascertainment = true;
                }
                "I" => {
                    let params = require(text, "I", params)?;
                    rates.p_invar = single(text, "I", &params)?;
                }
                _ if upper.starts_with("GC") => {
                    exclusive(text, &mut seen_rates)?;
                    let shape = match params {
                        Some(p) => single(text, "GC", &p)?,
                        None => DEFAULT_GAMMA_SHAPE,
                    };
                    rates.model = RateModel::ContinuousGamma { shape };
                }
                _ if upper.starts_with('G') => {
                    exclusive(text, &mut seen_rates)?;
                    let categories = category_count(text, &upper[1..])?
                        .unwrap_or(DEFAULT_GAMMA_CATEGORIES);
                    let shape = match params {
                        Some(p) => single(text, "G", &p)?,
                        None => DEFAULT_GAMMA_SHAPE,
                    };
                    rates.model = RateModel::DiscreteGamma { categories, shape };
                }
                _ if upper.starts_with('R') => {
                    exclusive(text, &mut seen_rates)?;
                    let params = require(text, "R", params)?;
                    if params.len() % 2 != 0 {
                        return Err(ConfigError::model(
                            text,
                            "+R needs (weight, rate) pairs",
                        ));
                    }
                    let weights: Vec<f64> = params.iter().step_by(2).copied().collect();
                    let values: Vec<f64> = params.iter().skip(1).step_by(2).copied().collect();
                    if let Some(k) = category_count(text, &upper[1..])? {
                        if k != weights.len() {
                            return Err(ConfigError::model(
                                text,
                                format!("+R{k} given {} categories", weights.len()),
                            ));
                        }
                    }
                    rates.model = RateModel::FreeRate {
                        weights,
                        rates: values,
                    };
                }
                _ => {
                    return Err(ConfigError::model(
                        text,
                        format!("unknown modifier '+{name}'"),
                    ))
                }
            }
        }
        rates.validate()?;

        let substitution = build_substitution(text, base, seq_type, frequencies)?;
        if substitution.num_states() != seq_type.num_states() {
            return Err(ConfigError::StateCountMismatch {
                model: substitution.num_states(),
                alphabet: seq_type.num_states(),
            });
        }

        if ascertainment && rates.p_invar >= 1.0 {
            return Err(ConfigError::model(
                text,
                "+ASC cannot be combined with only invariant sites",
            ));
        }

        Ok(Self {
            text: text.to_string(),
            substitution,
            rates,
            ascertainment,
        })
    }

    /// The model string this definition was parsed from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn substitution(&self) -> &Arc<dyn SubstitutionModel> {
        &self.substitution
    }

    pub fn rates(&self) -> &RateConfig {
        &self.rates
    }

    /// `true` if only variable sites may be written (`+ASC`).
    pub fn ascertainment(&self) -> bool {
        self.ascertainment
    }
}

fn build_substitution(
    text: &str,
    base: &str,
    seq_type: SequenceType,
    frequencies: Option<Vec<f64>>,
) -> Result<Arc<dyn SubstitutionModel>, ConfigError> {
    let (name, params) = split_params(text, base)?;
    let n = seq_type.num_states();
    let equal = vec![1.0 / n as f64; n];
    let dna_only = |model: &str| -> Result<(), ConfigError> {
        if seq_type != SequenceType::Dna {
            return Err(ConfigError::model(
                text,
                format!("{model} is only defined for DNA"),
            ));
        }
        Ok(())
    };

    let model: Arc<dyn SubstitutionModel> = match name.to_ascii_uppercase().as_str() {
        "JC" | "JC69" | "MK" => {
            if params.is_some() {
                return Err(ConfigError::model(text, "JC takes no parameters"));
            }
            match frequencies {
                Some(f) => Arc::new(Gtr::new("F81", &vec![1.0; n * (n - 1) / 2], &f)?),
                None => Arc::new(JukesCantor::new(n)?),
            }
        }
        "F81" => Arc::new(Gtr::new(
            "F81",
            &vec![1.0; n * (n - 1) / 2],
            frequencies.as_deref().unwrap_or(&equal),
        )?),
        "K2P" | "K80" => {
            dna_only("K2P")?;
            let kappa = match params {
                Some(p) => single(text, "K2P", &p)?,
                None => DEFAULT_KAPPA,
            };
            match frequencies {
                Some(f) => Arc::new(Gtr::hky(kappa, &f)?),
                None => Arc::new(Gtr::k2p(kappa)?),
            }
        }
        "HKY" | "HKY85" => {
            dna_only("HKY")?;
            let kappa = match params {
                Some(p) => single(text, "HKY", &p)?,
                None => DEFAULT_KAPPA,
            };
            Arc::new(Gtr::hky(kappa, frequencies.as_deref().unwrap_or(&equal))?)
        }
        "GTR" | "GTR2" | "GTR20" => {
            let exch = params.unwrap_or_else(|| vec![1.0; n * (n - 1) / 2]);
            Arc::new(Gtr::new(
                "GTR",
                &exch,
                frequencies.as_deref().unwrap_or(&equal),
            )?)
        }
        other => {
            return Err(ConfigError::model(
                text,
                format!("unknown substitution model '{other}'"),
            ))
        }
    };
    Ok(model)
}

/// Split on `+` outside of braces.
fn split_top_level(text: &str) -> Result<Vec<&str>, ConfigError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ConfigError::model(text, "unbalanced '}'"))?;
            }
            '+' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ConfigError::model(text, "unbalanced '{'"));
    }
    parts.push(text[start..].trim());
    Ok(parts)
}

/// Split `NAME{a,b,c}` into the name and its numeric parameters.
fn split_params<'a>(
    text: &str,
    part: &'a str,
) -> Result<(&'a str, Option<Vec<f64>>), ConfigError> {
    let Some(open) = part.find('{') else {
        return Ok((part, None));
    };
    let inner = part[open + 1..]
        .strip_suffix('}')
        .ok_or_else(|| ConfigError::model(text, format!("expected '}}' at end of '{part}'")))?;
    let values = inner
        .split(',')
        .map(|v| {
            let v = v.trim();
            v.parse::<f64>()
                .map_err(|_| ConfigError::model(text, format!("'{v}' is not a number")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((part[..open].trim(), Some(values)))
}

fn require(text: &str, name: &str, params: Option<Vec<f64>>) -> Result<Vec<f64>, ConfigError> {
    params.ok_or_else(|| ConfigError::model(text, format!("+{name} needs parameters in braces")))
}

fn single(text: &str, name: &str, params: &[f64]) -> Result<f64, ConfigError> {
    match params {
        [v] => Ok(*v),
        _ => Err(ConfigError::model(
            text,
            format!("{name} takes exactly one parameter, got {}", params.len()),
        )),
    }
}

fn exclusive(text: &str, seen: &mut bool) -> Result<(), ConfigError> {
    if *seen {
        return Err(ConfigError::model(
            text,
            "only one of +G, +GC and +R may be given",
        ));
    }
    *seen = true;
    Ok(())
}

/// Parse the optional category count in `G4` / `R3`.
fn category_count(text: &str, digits: &str) -> Result<Option<usize>, ConfigError> {
    if digits.is_empty() {
        return Ok(None);
    }
    match digits.parse::<usize>() {
        Ok(0) | Err(_) => Err(ConfigError::model(
            text,
            format!("invalid category count '{digits}'"),
        )),
        Ok(k) => Ok(Some(k)),
    }
}
