//! Per-site evolution rules along one edge.

use crate::base::Sequence;
use crate::errors::SimulationError;
use crate::evolution::{
    ModelDefinition, RateHeterogeneity, SiteRateAssignment, SubstitutionModel, TransitionMatrix,
};
use crate::sampling::{AccumulatedMatrix, ProbabilitySampler};
use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// How sites evolve on edges without a branch model, chosen once per run.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationMode {
    /// Every site samples from `P(t)`.
    Homogeneous,
    /// Category `sites[i]` with rate `rates[k]`; rate zero is invariant.
    DiscreteRates { rates: Vec<f64>, sites: Vec<usize> },
    /// Site `i` evolves at `rates[i]`; rate zero is invariant.
    ContinuousRates(Vec<f64>),
    /// Flagged sites never change, all others sample from `P(t)`.
    InvariantSitesOnly(Vec<bool>),
}

impl SimulationMode {
    pub fn from_assignment(assignment: SiteRateAssignment) -> Self {
        match assignment {
            SiteRateAssignment::Uniform => Self::Homogeneous,
            SiteRateAssignment::Invariant(flags) => Self::InvariantSitesOnly(flags),
            SiteRateAssignment::Categories { categories, sites } => Self::DiscreteRates {
                rates: (0..categories.num_categories())
                    .map(|k| categories.category_rate(k))
                    .collect(),
                sites,
            },
            SiteRateAssignment::Continuous(rates) => Self::ContinuousRates(rates),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Homogeneous => "homogeneous",
            Self::DiscreteRates { .. } => "discrete rate heterogeneity",
            Self::ContinuousRates(_) => "continuous rate heterogeneity",
            Self::InvariantSitesOnly(_) => "invariant sites",
        }
    }
}

/// The rule for a single edge.
#[derive(Debug, Clone, Copy)]
pub(crate) enum EdgeRule<'a> {
    /// Run-wide model and mode.
    Default(&'a dyn SubstitutionModel, &'a SimulationMode),
    /// Branch model with its own invariant proportion; never inherited.
    Override(&'a ModelDefinition),
}

/// Scratch space and randomness for evolving sequences along edges.
pub(crate) struct EdgeKernel<'r> {
    pub(crate) rng: &'r mut Xoshiro256PlusPlus,
    pub(crate) sampler: ProbabilitySampler,
    matrix: TransitionMatrix,
    accumulated: Vec<AccumulatedMatrix>,
}

impl<'r> EdgeKernel<'r> {
    pub(crate) fn new(rng: &'r mut Xoshiro256PlusPlus, num_states: usize) -> Self {
        Self {
            rng,
            sampler: ProbabilitySampler::new(),
            matrix: TransitionMatrix::new(num_states),
            accumulated: vec![AccumulatedMatrix::new(num_states)],
        }
    }

    /// Fill `child` from `parent` across a branch of scaled length `time`.
    pub(crate) fn evolve(
        &mut self,
        rule: EdgeRule<'_>,
        time: f64,
        parent: &Sequence,
        child: &mut Sequence,
    ) -> Result<(), SimulationError> {
        let parent = parent.as_slice();
        let child = child.as_mut_slice();
        if time == 0.0 {
            child.copy_from_slice(parent);
            return Ok(());
        }

        match rule {
            EdgeRule::Default(model, SimulationMode::Homogeneous) => {
                self.evolve_homogeneous(model, time, parent, child)
            }
            EdgeRule::Default(model, SimulationMode::InvariantSitesOnly(invariant)) => {
                self.prepare(model, 0, time)?;
                let acc = &self.accumulated[0];
                for ((c, &p), &fixed) in child.iter_mut().zip(parent).zip(invariant) {
                    *c = if fixed {
                        p
                    } else {
                        acc.sample(&mut self.sampler, p as usize, self.rng) as u8
                    };
                }
                Ok(())
            }
            EdgeRule::Default(model, SimulationMode::DiscreteRates { rates, sites }) => {
                if self.accumulated.len() < rates.len() {
                    self.accumulated
                        .resize(rates.len(), AccumulatedMatrix::new(model.num_states()));
                }
                for (k, &rate) in rates.iter().enumerate() {
                    if rate > 0.0 {
                        self.prepare(model, k, time * rate)?;
                    }
                }
                for ((c, &p), &k) in child.iter_mut().zip(parent).zip(sites) {
                    *c = if rates[k] == 0.0 {
                        p
                    } else {
                        self.accumulated[k].sample(&mut self.sampler, p as usize, self.rng) as u8
                    };
                }
                Ok(())
            }
            EdgeRule::Default(model, SimulationMode::ContinuousRates(rates)) => {
                for ((c, &p), &rate) in child.iter_mut().zip(parent).zip(rates) {
                    if rate == 0.0 {
                        *c = p;
                        continue;
                    }
                    let t = time * rate;
                    model.compute_trans_matrix(t, &mut self.matrix);
                    *c = self
                        .sampler
                        .sample_from_row(self.matrix.row(p as usize), self.rng)
                        .ok_or(SimulationError::DegenerateRow {
                            state: p as usize,
                            branch_length: t,
                        })? as u8;
                }
                Ok(())
            }
            EdgeRule::Override(definition) => {
                let model = definition.substitution().as_ref();
                let p_invar = definition.rates().p_invar;
                if p_invar <= 0.0 {
                    return self.evolve_homogeneous(model, time, parent, child);
                }
                self.prepare(model, 0, time)?;
                let acc = &self.accumulated[0];
                for (c, &p) in child.iter_mut().zip(parent) {
                    *c = if self.rng.random::<f64>() < p_invar {
                        p
                    } else {
                        acc.sample(&mut self.sampler, p as usize, self.rng) as u8
                    };
                }
                Ok(())
            }
        }
    }

    fn evolve_homogeneous(
        &mut self,
        model: &dyn SubstitutionModel,
        time: f64,
        parent: &[u8],
        child: &mut [u8],
    ) -> Result<(), SimulationError> {
        self.prepare(model, 0, time)?;
        let acc = &self.accumulated[0];
        for (c, &p) in child.iter_mut().zip(parent) {
            *c = acc.sample(&mut self.sampler, p as usize, self.rng) as u8;
        }
        Ok(())
    }

    /// Compute `P(time)` and store its cumulative form in slot `slot`.
    fn prepare(
        &mut self,
        model: &dyn SubstitutionModel,
        slot: usize,
        time: f64,
    ) -> Result<(), SimulationError> {
        model.compute_trans_matrix(time, &mut self.matrix);
        self.accumulated[slot].fill_from(&self.matrix, time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SequenceType;
    use crate::evolution::{JukesCantor, RateCategories};
    use rand::SeedableRng;

    fn parent() -> Sequence {
        Sequence::from_symbols("ACGTACGTACGTACGTACGT", SequenceType::Dna).unwrap()
    }

    #[test]
    fn test_zero_length_copies_parent() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut kernel = EdgeKernel::new(&mut rng, 4);
        let model = JukesCantor::new(4).unwrap();
        let mode = SimulationMode::Homogeneous;
        let parent = parent();
        let mut child = Sequence::filled(0, parent.len());
        kernel
            .evolve(EdgeRule::Default(&model, &mode), 0.0, &parent, &mut child)
            .unwrap();
        assert_eq!(child, parent);
    }

    #[test]
    fn test_invariant_sites_never_change() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let mut kernel = EdgeKernel::new(&mut rng, 4);
        let model = JukesCantor::new(4).unwrap();
        let flags: Vec<bool> = (0..20).map(|i| i % 2 == 0).collect();
        let mode = SimulationMode::InvariantSitesOnly(flags.clone());
        let parent = parent();
        let mut child = Sequence::filled(0, parent.len());
        kernel
            .evolve(EdgeRule::Default(&model, &mode), 10.0, &parent, &mut child)
            .unwrap();
        for (i, &fixed) in flags.iter().enumerate() {
            if fixed {
                assert_eq!(child.get(i), parent.get(i));
            }
        }
    }

    #[test]
    fn test_discrete_invariant_category_copies() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let mut kernel = EdgeKernel::new(&mut rng, 4);
        let model = JukesCantor::new(4).unwrap();
        let cats = RateCategories::discrete_gamma(0.5, 4, 0.5).unwrap();
        let invariant = cats.invariant_category().unwrap();
        let sites: Vec<usize> = (0..20).map(|i| if i < 10 { invariant } else { i % 4 }).collect();
        let mode = SimulationMode::from_assignment(SiteRateAssignment::Categories {
            categories: cats,
            sites,
        });
        let parent = parent();
        let mut child = Sequence::filled(0, parent.len());
        kernel
            .evolve(EdgeRule::Default(&model, &mode), 5.0, &parent, &mut child)
            .unwrap();
        assert_eq!(&child.as_slice()[..10], &parent.as_slice()[..10]);
    }

    #[test]
    fn test_continuous_zero_rate_copies() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        let mut kernel = EdgeKernel::new(&mut rng, 4);
        let model = JukesCantor::new(4).unwrap();
        let rates: Vec<f64> = (0..20).map(|i| if i < 5 { 0.0 } else { 2.0 }).collect();
        let mode = SimulationMode::ContinuousRates(rates);
        let parent = parent();
        let mut child = Sequence::filled(0, parent.len());
        kernel
            .evolve(EdgeRule::Default(&model, &mode), 1.0, &parent, &mut child)
            .unwrap();
        assert_eq!(&child.as_slice()[..5], &parent.as_slice()[..5]);
        assert!(child.as_slice().iter().all(|&s| s < 4));
    }
}
