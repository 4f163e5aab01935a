//! Among-site rate heterogeneity.
//!
//! Rates are scaled to a mean of one over all sites, including the invariant
//! class when present: with an invariant proportion `p`, the variable
//! categories share probability `1 - p` and their rates are divided by
//! `1 - p`.

use super::gamma::discrete_gamma_rates;
use crate::errors::ConfigError;
use crate::sampling::ProbabilitySampler;
use rand::Rng;
use rand_distr::{Distribution, Gamma};
use std::fmt;

/// A discrete set of rate categories.
pub trait RateHeterogeneity: fmt::Debug + Send + Sync {
    /// Number of categories, including an invariant one.
    fn num_categories(&self) -> usize;

    /// Probability that a site belongs to category `k`.
    fn category_probability(&self, k: usize) -> f64;

    /// Relative rate of category `k`. Zero marks an invariant category.
    fn category_rate(&self, k: usize) -> f64;

    fn is_invariant(&self, k: usize) -> bool {
        self.category_rate(k) == 0.0
    }
}

/// How rates vary across sites, before the invariant class is added.
#[derive(Debug, Clone, PartialEq)]
pub enum RateModel {
    /// Every variable site evolves at rate one.
    Uniform,
    /// Discrete Gamma with equal-probability categories.
    DiscreteGamma { categories: usize, shape: f64 },
    /// One Gamma-distributed rate per site.
    ContinuousGamma { shape: f64 },
    /// Free rate categories with explicit weights and rates.
    FreeRate { weights: Vec<f64>, rates: Vec<f64> },
}

/// Rate heterogeneity of a model: a rate distribution plus the proportion of
/// invariant sites.
#[derive(Debug, Clone, PartialEq)]
pub struct RateConfig {
    pub p_invar: f64,
    pub model: RateModel,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            p_invar: 0.0,
            model: RateModel::Uniform,
        }
    }
}

impl RateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.p_invar) {
            return Err(ConfigError::InvalidRates(format!(
                "proportion of invariant sites must lie in [0, 1], got {}",
                self.p_invar
            )));
        }
        match &self.model {
            RateModel::Uniform => Ok(()),
            RateModel::DiscreteGamma { categories, shape } => {
                check_shape(*shape)?;
                if *categories == 0 {
                    return Err(ConfigError::InvalidRates(
                        "discrete Gamma needs at least one category".into(),
                    ));
                }
                Ok(())
            }
            RateModel::ContinuousGamma { shape } => check_shape(*shape),
            RateModel::FreeRate { weights, rates } => {
                RateCategories::free_rate(weights, rates, self.p_invar).map(|_| ())
            }
        }
    }

    /// `true` if every site evolves at the same rate.
    pub fn is_homogeneous(&self) -> bool {
        self.p_invar == 0.0 && self.model == RateModel::Uniform
    }

    /// `true` if the only heterogeneity is the invariant class.
    pub fn is_invariant_only(&self) -> bool {
        self.p_invar > 0.0 && self.model == RateModel::Uniform
    }

    /// Draw the rate class of every site for one run.
    pub fn assign_sites<R: Rng + ?Sized>(
        &self,
        length: usize,
        sampler: &mut ProbabilitySampler,
        rng: &mut R,
    ) -> Result<SiteRateAssignment, ConfigError> {
        self.validate()?;
        let p = self.p_invar;
        match &self.model {
            RateModel::Uniform if p == 0.0 => Ok(SiteRateAssignment::Uniform),
            RateModel::Uniform => Ok(SiteRateAssignment::Invariant(
                (0..length).map(|_| rng.random::<f64>() < p).collect(),
            )),
            RateModel::DiscreteGamma { categories, shape } => {
                let categories = RateCategories::discrete_gamma(*shape, *categories, p)?;
                categories.assign(length, sampler, rng)
            }
            RateModel::FreeRate { weights, rates } => {
                let categories = RateCategories::free_rate(weights, rates, p)?;
                categories.assign(length, sampler, rng)
            }
            RateModel::ContinuousGamma { shape } => {
                let gamma = Gamma::new(*shape, 1.0 / *shape)
                    .map_err(|e| ConfigError::InvalidRates(e.to_string()))?;
                let scale = 1.0 - p;
                let rates = (0..length)
                    .map(|_| {
                        if p > 0.0 && rng.random::<f64>() < p {
                            0.0
                        } else {
                            gamma.sample(rng) / scale
                        }
                    })
                    .collect();
                Ok(SiteRateAssignment::Continuous(rates))
            }
        }
    }
}

fn check_shape(shape: f64) -> Result<(), ConfigError> {
    if !shape.is_finite() || shape <= 0.0 {
        return Err(ConfigError::InvalidRates(format!(
            "Gamma shape must be positive, got {shape}"
        )));
    }
    Ok(())
}

/// Discrete rate categories, optionally with an invariant category
/// (always the last one).
#[derive(Debug, Clone, PartialEq)]
pub struct RateCategories {
    probabilities: Vec<f64>,
    rates: Vec<f64>,
    invariant: Option<usize>,
}

impl RateCategories {
    /// `categories` equal-probability discrete Gamma classes (mean rates).
    pub fn discrete_gamma(
        shape: f64,
        categories: usize,
        p_invar: f64,
    ) -> Result<Self, ConfigError> {
        check_shape(shape)?;
        if categories == 0 {
            return Err(ConfigError::InvalidRates(
                "discrete Gamma needs at least one category".into(),
            ));
        }
        let rates = discrete_gamma_rates(shape, categories);
        let weights = vec![1.0 / categories as f64; categories];
        Ok(Self::with_invariant(weights, rates, p_invar))
    }

    /// FreeRate categories. Weights must sum to one; rates are rescaled to a
    /// weighted mean of one.
    pub fn free_rate(weights: &[f64], rates: &[f64], p_invar: f64) -> Result<Self, ConfigError> {
        if weights.is_empty() || weights.len() != rates.len() {
            return Err(ConfigError::InvalidRates(format!(
                "FreeRate needs matching weights and rates, got {} and {}",
                weights.len(),
                rates.len()
            )));
        }
        if weights.iter().chain(rates).any(|x| !x.is_finite() || *x <= 0.0) {
            return Err(ConfigError::InvalidRates(
                "FreeRate weights and rates must be positive".into(),
            ));
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-3 {
            return Err(ConfigError::InvalidRates(format!(
                "FreeRate weights sum to {total}, expected 1"
            )));
        }
        let weights: Vec<f64> = weights.iter().map(|w| w / total).collect();
        let mean: f64 = weights.iter().zip(rates).map(|(w, r)| w * r).sum();
        let rates = rates.iter().map(|r| r / mean).collect();
        Ok(Self::with_invariant(weights, rates, p_invar))
    }

    fn with_invariant(weights: Vec<f64>, rates: Vec<f64>, p_invar: f64) -> Self {
        if p_invar <= 0.0 {
            return Self {
                probabilities: weights,
                rates,
                invariant: None,
            };
        }
        let variable = 1.0 - p_invar;
        let mut probabilities: Vec<f64> = weights.iter().map(|w| w * variable).collect();
        let mut rates: Vec<f64> = if variable > 0.0 {
            rates.iter().map(|r| r / variable).collect()
        } else {
            rates
        };
        probabilities.push(p_invar);
        rates.push(0.0);
        let invariant = Some(probabilities.len() - 1);
        Self {
            probabilities,
            rates,
            invariant,
        }
    }

    /// Index of the invariant category, if any.
    pub fn invariant_category(&self) -> Option<usize> {
        self.invariant
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    fn assign<R: Rng + ?Sized>(
        self,
        length: usize,
        sampler: &mut ProbabilitySampler,
        rng: &mut R,
    ) -> Result<SiteRateAssignment, ConfigError> {
        let mut sites = Vec::with_capacity(length);
        for _ in 0..length {
            // A row without mass means no variable category can be drawn.
            let k = match sampler.sample_from_row(&self.probabilities, rng) {
                Some(k) => k,
                None => self.invariant.ok_or_else(|| {
                    ConfigError::InvalidRates("rate categories carry no probability".into())
                })?,
            };
            sites.push(k);
        }
        Ok(SiteRateAssignment::Categories {
            categories: self,
            sites,
        })
    }
}

impl RateHeterogeneity for RateCategories {
    fn num_categories(&self) -> usize {
        self.rates.len()
    }

    fn category_probability(&self, k: usize) -> f64 {
        self.probabilities[k]
    }

    fn category_rate(&self, k: usize) -> f64 {
        self.rates[k]
    }
}

/// Per-site rate classes, drawn once per run and fixed for all branches.
#[derive(Debug, Clone, PartialEq)]
pub enum SiteRateAssignment {
    /// All sites at rate one.
    Uniform,
    /// `true` marks an invariant site; all others evolve at rate one.
    Invariant(Vec<bool>),
    /// Category index of each site.
    Categories {
        categories: RateCategories,
        sites: Vec<usize>,
    },
    /// Rate of each site, zero for invariant sites.
    Continuous(Vec<f64>),
}

impl SiteRateAssignment {
    /// Number of sites that can never change.
    pub fn invariant_sites(&self) -> usize {
        match self {
            Self::Uniform => 0,
            Self::Invariant(flags) => flags.iter().filter(|&&f| f).count(),
            Self::Categories { categories, sites } => sites
                .iter()
                .filter(|&&k| categories.is_invariant(k))
                .count(),
            Self::Continuous(rates) => rates.iter().filter(|&&r| r == 0.0).count(),
        }
    }
}
