//! Discrete sampling from probability rows.
//!
//! Both samplers draw one uniform `u ∈ [0, 1)` and select the first state
//! whose cumulative probability exceeds `u`. When rounding leaves the row's
//! total mass short of `u`, they fall back to the row's most probable state
//! and count the event. The only "no match" outcome is a row without any
//! probability mass.

use crate::errors::SimulationError;
use crate::evolution::TransitionMatrix;
use rand::Rng;

/// Tolerance within which a cumulative row is treated as summing to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Samples states from probability rows.
///
/// The sampler carries no randomness of its own; the only state is a
/// diagnostic counter of fallback events.
#[derive(Debug, Clone, Default)]
pub struct ProbabilitySampler {
    fallbacks: u64,
}

impl ProbabilitySampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of draws resolved by the max-probability fallback so far.
    #[inline]
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }

    /// Sample an index from a plain probability row.
    ///
    /// Zero-probability entries are never selected. Returns `None` only when
    /// the row has no positive entry.
    pub fn sample_from_row<R: Rng + ?Sized>(
        &mut self,
        row: &[f64],
        rng: &mut R,
    ) -> Option<usize> {
        let u: f64 = rng.random();
        let mut cumulative = 0.0;
        let mut best: Option<(usize, f64)> = None;
        for (i, &p) in row.iter().enumerate() {
            if p <= 0.0 {
                continue;
            }
            cumulative += p;
            if u < cumulative {
                return Some(i);
            }
            match best {
                Some((_, bp)) if bp >= p => {}
                _ => best = Some((i, p)),
            }
        }
        let (fallback, _) = best?;
        self.fallbacks += 1;
        Some(fallback)
    }

    /// Sample an index from a cumulative row (non-decreasing, last entry
    /// normally exactly one).
    ///
    /// The interval of `max_state` is tested first since it holds most of
    /// the mass for short branches. A draw beyond the last cumulative value
    /// returns `max_state` and is counted.
    #[inline]
    pub fn sample_from_accumulated_row<R: Rng + ?Sized>(
        &mut self,
        cumulative: &[f64],
        max_state: usize,
        rng: &mut R,
    ) -> usize {
        let u: f64 = rng.random();

        let low = if max_state == 0 {
            0.0
        } else {
            cumulative[max_state - 1]
        };
        if u >= low && u < cumulative[max_state] {
            return max_state;
        }

        let idx = cumulative.partition_point(|&c| c <= u);
        if idx < cumulative.len() {
            idx
        } else {
            self.fallbacks += 1;
            max_state
        }
    }
}

/// Cumulative form of a [`TransitionMatrix`], recomputed once per edge and
/// reused for every site of that edge.
#[derive(Debug, Clone, Default)]
pub struct AccumulatedMatrix {
    num_states: usize,
    cumulative: Vec<f64>,
    max_states: Vec<usize>,
}

impl AccumulatedMatrix {
    pub fn new(num_states: usize) -> Self {
        Self {
            num_states,
            cumulative: vec![0.0; num_states * num_states],
            max_states: vec![0; num_states],
        }
    }

    /// Replace the content with the running sums of `matrix`.
    ///
    /// Values are clamped to at most one and the last entry of a row is set to
    /// exactly one when the row sums to one within [`PROBABILITY_TOLERANCE`].
    /// A row without any mass is an error: nothing could ever be sampled from it.
    pub fn fill_from(
        &mut self,
        matrix: &TransitionMatrix,
        branch_length: f64,
    ) -> Result<(), SimulationError> {
        let n = matrix.num_states();
        self.num_states = n;
        self.cumulative.resize(n * n, 0.0);
        self.max_states.resize(n, 0);

        for i in 0..n {
            let row = matrix.row(i);
            let out = &mut self.cumulative[i * n..(i + 1) * n];
            let mut sum = 0.0;
            let mut max_state = 0;
            for (j, &p) in row.iter().enumerate() {
                let p = p.max(0.0);
                sum += p;
                out[j] = sum.min(1.0);
                if p > row[max_state].max(0.0) {
                    max_state = j;
                }
            }
            if sum <= 0.0 {
                return Err(SimulationError::DegenerateRow {
                    state: i,
                    branch_length,
                });
            }
            if (sum - 1.0).abs() <= PROBABILITY_TOLERANCE {
                out[n - 1] = 1.0;
            }
            self.max_states[i] = max_state;
        }
        Ok(())
    }

    #[inline(always)]
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Cumulative row for parent state `state`.
    #[inline]
    pub fn row(&self, state: usize) -> &[f64] {
        let n = self.num_states;
        &self.cumulative[state * n..(state + 1) * n]
    }

    /// Most probable child state for parent state `state`.
    #[inline]
    pub fn max_state(&self, state: usize) -> usize {
        self.max_states[state]
    }

    /// Draw a child state given the parent state.
    #[inline]
    pub fn sample<R: Rng + ?Sized>(
        &self,
        sampler: &mut ProbabilitySampler,
        state: usize,
        rng: &mut R,
    ) -> usize {
        sampler.sample_from_accumulated_row(self.row(state), self.max_state(state), rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_sample_from_row_skips_zero_entries() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let mut sampler = ProbabilitySampler::new();
        let row = [0.0, 0.5, 0.0, 0.5];
        for _ in 0..1000 {
            let s = sampler.sample_from_row(&row, &mut rng).unwrap();
            assert!(s == 1 || s == 3);
        }
        assert_eq!(sampler.fallbacks(), 0);
    }

    #[test]
    fn test_sample_from_row_all_zero() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut sampler = ProbabilitySampler::new();
        assert_eq!(sampler.sample_from_row(&[0.0; 4], &mut rng), None);
    }

    #[test]
    fn test_sample_from_row_shortfall_falls_back_to_max() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut sampler = ProbabilitySampler::new();
        // Only 0.3 of mass: most draws overshoot.
        let row = [0.1, 0.2, 0.0, 0.0];
        let mut fell_back = 0;
        for _ in 0..200 {
            let s = sampler.sample_from_row(&row, &mut rng).unwrap();
            assert!(s <= 1);
            if s == 1 {
                fell_back += 1;
            }
        }
        assert!(sampler.fallbacks() > 0);
        assert!(fell_back as u64 >= sampler.fallbacks());
    }

    #[test]
    fn test_accumulated_frequencies_match_probabilities() {
        let rows = vec![
            vec![0.7, 0.1, 0.1, 0.1],
            vec![0.25, 0.25, 0.25, 0.25],
            vec![0.0, 0.0, 0.0, 1.0],
            vec![0.1, 0.6, 0.2, 0.1],
        ];
        let matrix = TransitionMatrix::from_rows(&rows).unwrap();
        let mut acc = AccumulatedMatrix::new(4);
        acc.fill_from(&matrix, 0.1).unwrap();
        assert_eq!(acc.max_state(0), 0);
        assert_eq!(acc.max_state(2), 3);
        assert_eq!(acc.max_state(3), 1);
        assert_eq!(acc.row(1)[3], 1.0);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(123);
        let mut sampler = ProbabilitySampler::new();
        let n = 50_000;
        let mut counts = [0usize; 4];
        for _ in 0..n {
            counts[acc.sample(&mut sampler, 3, &mut rng)] += 1;
        }
        for (c, p) in counts.iter().zip(&rows[3]) {
            assert!((*c as f64 / n as f64 - p).abs() < 0.01);
        }
        for _ in 0..100 {
            assert_eq!(acc.sample(&mut sampler, 2, &mut rng), 3);
        }
        assert_eq!(sampler.fallbacks(), 0);
    }

    #[test]
    fn test_accumulated_shortfall_counts_fallback() {
        let matrix = TransitionMatrix::from_rows(&[vec![0.1, 0.4], vec![0.5, 0.5]]).unwrap();
        let mut acc = AccumulatedMatrix::new(2);
        acc.fill_from(&matrix, 1.0).unwrap();
        assert!((acc.row(0)[1] - 0.5).abs() < 1e-12);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(99);
        let mut sampler = ProbabilitySampler::new();
        for _ in 0..500 {
            let s = acc.sample(&mut sampler, 0, &mut rng);
            assert!(s <= 1);
        }
        assert!(sampler.fallbacks() > 0);
    }

    #[test]
    fn test_all_zero_row_is_degenerate() {
        let matrix = TransitionMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 0.0]]).unwrap();
        let mut acc = AccumulatedMatrix::new(2);
        let err = acc.fill_from(&matrix, 0.5).unwrap_err();
        assert!(matches!(err, SimulationError::DegenerateRow { state: 1, .. }));
    }

    #[test]
    fn test_accumulated_rows_clamped_and_monotone() {
        let matrix = TransitionMatrix::from_rows(&[
            vec![0.5, 0.5000004, 0.0],
            vec![0.2, 0.3, 0.5],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap();
        let mut acc = AccumulatedMatrix::new(3);
        acc.fill_from(&matrix, 0.1).unwrap();
        for i in 0..3 {
            let row = acc.row(i);
            assert!(row.windows(2).all(|w| w[0] <= w[1]));
            assert!(row.iter().all(|&c| c <= 1.0));
            assert_eq!(row[2], 1.0);
        }
    }
}
