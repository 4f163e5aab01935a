//! Continuous-time Markov substitution models.
//!
//! A model turns a (scaled) branch length into a row-stochastic transition
//! matrix `P(t) = exp(Q t)`, where row `i` is the distribution of the child
//! state given parent state `i`. Rate matrices are normalised so that one unit
//! of branch length is one expected substitution per site.
//!
//! State indices follow [`SequenceType`](crate::base::SequenceType): for DNA
//! A=0, C=1, G=2, T=3.

use crate::errors::ConfigError;
use nalgebra::{DMatrix, SymmetricEigen};
use std::fmt;

/// Rows of a transition matrix must sum to one within this tolerance.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Dense `S×S` transition matrix, row-major.
///
/// Row = parent state, column = child state.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    num_states: usize,
    data: Vec<f64>,
}

impl TransitionMatrix {
    /// Create an all-zero matrix for `num_states` states.
    pub fn new(num_states: usize) -> Self {
        Self {
            num_states,
            data: vec![0.0; num_states * num_states],
        }
    }

    /// Create the identity matrix.
    pub fn identity(num_states: usize) -> Self {
        let mut m = Self::new(num_states);
        m.set_identity();
        m
    }

    /// Build a matrix from explicit rows. Rows must be square and
    /// non-negative; their sums are not checked.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ConfigError> {
        let n = rows.len();
        let mut m = Self::new(n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(ConfigError::model(
                    "fixed",
                    format!("row {i} has {} entries, expected {n}", row.len()),
                ));
            }
            if row.iter().any(|p| !p.is_finite() || *p < 0.0) {
                return Err(ConfigError::model(
                    "fixed",
                    format!("row {i} has a negative or non-finite entry"),
                ));
            }
            m.row_mut(i).copy_from_slice(row);
        }
        Ok(m)
    }

    #[inline(always)]
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    #[inline]
    pub fn row(&self, state: usize) -> &[f64] {
        let n = self.num_states;
        &self.data[state * n..(state + 1) * n]
    }

    #[inline]
    pub fn row_mut(&mut self, state: usize) -> &mut [f64] {
        let n = self.num_states;
        &mut self.data[state * n..(state + 1) * n]
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.num_states + to]
    }

    /// Overwrite with the identity (used for zero-length branches).
    pub fn set_identity(&mut self) {
        let n = self.num_states;
        self.data.iter_mut().for_each(|p| *p = 0.0);
        for i in 0..n {
            self.data[i * n + i] = 1.0;
        }
    }

    /// Change the number of states, keeping the allocation.
    pub fn reshape(&mut self, num_states: usize) {
        self.num_states = num_states;
        self.data.resize(num_states * num_states, 0.0);
    }

    /// Check that every row sums to one within `tolerance` and has no
    /// negative entry.
    pub fn is_row_stochastic(&self, tolerance: f64) -> bool {
        (0..self.num_states).all(|i| {
            let row = self.row(i);
            row.iter().all(|&p| p >= 0.0) && (row.iter().sum::<f64>() - 1.0).abs() <= tolerance
        })
    }
}

/// A substitution model over `S` states.
pub trait SubstitutionModel: fmt::Debug + Send + Sync {
    /// Number of states `S`.
    fn num_states(&self) -> usize;

    /// Fill `matrix` with `P(time)`. `time` is a scaled branch length `≥ 0`.
    ///
    /// `matrix` is resized to `S×S` if needed.
    fn compute_trans_matrix(&self, time: f64, matrix: &mut TransitionMatrix);

    /// Stationary state frequencies, summing to one.
    fn state_frequencies(&self) -> &[f64];

    /// Short human-readable name, e.g. `"GTR"`.
    fn name(&self) -> &str;

    /// Whether all stationary frequencies are equal.
    fn has_equal_frequencies(&self) -> bool {
        let freqs = self.state_frequencies();
        match freqs.first() {
            Some(&f0) => freqs.iter().all(|&f| (f - f0).abs() < 1e-12),
            None => true,
        }
    }
}

/// Jukes–Cantor model generalised to any number of states.
///
/// All off-diagonal rates are equal, so `P(t)` has a closed form:
/// `P_ii = 1/S + (S-1)/S · e^{-S t/(S-1)}` and `P_ij = 1/S - 1/S · e^{-S t/(S-1)}`.
#[derive(Debug, Clone, PartialEq)]
pub struct JukesCantor {
    frequencies: Vec<f64>,
}

impl JukesCantor {
    pub fn new(num_states: usize) -> Result<Self, ConfigError> {
        if num_states < 2 {
            return Err(ConfigError::model("JC", "needs at least two states"));
        }
        Ok(Self {
            frequencies: vec![1.0 / num_states as f64; num_states],
        })
    }
}

impl SubstitutionModel for JukesCantor {
    fn num_states(&self) -> usize {
        self.frequencies.len()
    }

    fn compute_trans_matrix(&self, time: f64, matrix: &mut TransitionMatrix) {
        let n = self.num_states();
        matrix.reshape(n);
        let s = n as f64;
        let decay = (-s * time / (s - 1.0)).exp();
        let same = 1.0 / s + (s - 1.0) / s * decay;
        let other = (1.0 - decay) / s;
        for i in 0..n {
            let row = matrix.row_mut(i);
            row.iter_mut().for_each(|p| *p = other);
            row[i] = same;
        }
    }

    fn state_frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    fn name(&self) -> &str {
        "JC"
    }
}

/// General time-reversible model.
///
/// `Q_ij = r_ij · π_j` for `i ≠ j`. The matrix is symmetrised as
/// `B = Π^{1/2} Q Π^{-1/2}` and decomposed once at construction, so each
/// branch only costs `O(S³)` multiply-adds.
#[derive(Debug, Clone)]
pub struct Gtr {
    name: String,
    frequencies: Vec<f64>,
    sqrt_freqs: Vec<f64>,
    eigenvalues: Vec<f64>,
    /// Row-major `S×S`, column `k` is the eigenvector of `eigenvalues[k]`.
    eigenvectors: Vec<f64>,
}

impl Gtr {
    /// Create a GTR model from the upper triangle of the exchangeability
    /// matrix (row by row: `r_01, r_02, …, r_12, …`) and state frequencies.
    pub fn new(
        name: impl Into<String>,
        exchangeabilities: &[f64],
        frequencies: &[f64],
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let n = frequencies.len();
        if n < 2 {
            return Err(ConfigError::model(name, "needs at least two states"));
        }
        if exchangeabilities.len() != n * (n - 1) / 2 {
            return Err(ConfigError::model(
                name,
                format!(
                    "expected {} exchangeabilities for {n} states, got {}",
                    n * (n - 1) / 2,
                    exchangeabilities.len()
                ),
            ));
        }
        if exchangeabilities.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(ConfigError::model(name, "exchangeabilities must be non-negative"));
        }
        if exchangeabilities.iter().all(|&r| r == 0.0) {
            return Err(ConfigError::model(name, "all exchangeabilities are zero"));
        }
        let frequencies = normalize_frequencies(&name, frequencies)?;

        let mut exch = DMatrix::<f64>::zeros(n, n);
        let mut k = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                exch[(i, j)] = exchangeabilities[k];
                exch[(j, i)] = exchangeabilities[k];
                k += 1;
            }
        }

        // Expected rate -Σ π_i Q_ii, used to normalise to one substitution per unit time.
        let mut total = 0.0;
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    total += frequencies[i] * exch[(i, j)] * frequencies[j];
                }
            }
        }

        let sqrt_freqs: Vec<f64> = frequencies.iter().map(|f| f.sqrt()).collect();
        let mut b = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            let mut diag = 0.0;
            for j in 0..n {
                if i != j {
                    let q = exch[(i, j)] * frequencies[j] / total;
                    diag -= q;
                    b[(i, j)] = exch[(i, j)] * sqrt_freqs[i] * sqrt_freqs[j] / total;
                }
            }
            b[(i, i)] = diag;
        }

        let eigen = SymmetricEigen::new(b);
        let eigenvalues = eigen.eigenvalues.iter().copied().collect();
        let mut eigenvectors = vec![0.0; n * n];
        for i in 0..n {
            for k in 0..n {
                eigenvectors[i * n + k] = eigen.eigenvectors[(i, k)];
            }
        }

        Ok(Self {
            name,
            frequencies,
            sqrt_freqs,
            eigenvalues,
            eigenvectors,
        })
    }

    /// Kimura two-parameter model (transition/transversion ratio `kappa`,
    /// equal frequencies).
    pub fn k2p(kappa: f64) -> Result<Self, ConfigError> {
        Self::hky_named("K2P", kappa, &[0.25; 4])
    }

    /// Hasegawa–Kishino–Yano model.
    pub fn hky(kappa: f64, frequencies: &[f64]) -> Result<Self, ConfigError> {
        Self::hky_named("HKY", kappa, frequencies)
    }

    fn hky_named(name: &str, kappa: f64, frequencies: &[f64]) -> Result<Self, ConfigError> {
        if !kappa.is_finite() || kappa <= 0.0 {
            return Err(ConfigError::model(
                name,
                format!("kappa must be positive, got {kappa}"),
            ));
        }
        if frequencies.len() != 4 {
            return Err(ConfigError::model(name, "only defined for nucleotides"));
        }
        // AC AG AT CG CT GT: transitions are A<->G and C<->T.
        Self::new(name, &[1.0, kappa, 1.0, 1.0, kappa, 1.0], frequencies)
    }
}

impl SubstitutionModel for Gtr {
    fn num_states(&self) -> usize {
        self.frequencies.len()
    }

    fn compute_trans_matrix(&self, time: f64, matrix: &mut TransitionMatrix) {
        let n = self.num_states();
        matrix.reshape(n);
        if time <= 0.0 {
            matrix.set_identity();
            return;
        }

        let exps: Vec<f64> = self.eigenvalues.iter().map(|l| (l * time).exp()).collect();
        for i in 0..n {
            let ui = &self.eigenvectors[i * n..(i + 1) * n];
            let row = matrix.row_mut(i);
            let mut sum = 0.0;
            for (j, p) in row.iter_mut().enumerate() {
                let uj = &self.eigenvectors[j * n..(j + 1) * n];
                let mut acc = 0.0;
                for k in 0..n {
                    acc += ui[k] * exps[k] * uj[k];
                }
                // Rounding can push tiny probabilities below zero.
                *p = (acc * self.sqrt_freqs[j] / self.sqrt_freqs[i]).max(0.0);
                sum += *p;
            }
            if sum > 0.0 {
                row.iter_mut().for_each(|p| *p /= sum);
            }
        }
    }

    fn state_frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A model with one fixed transition matrix, used for any positive branch
/// length. Zero-length branches still give the identity.
///
/// Useful for absorbing or otherwise hand-crafted processes.
#[derive(Debug, Clone)]
pub struct FixedMatrix {
    matrix: TransitionMatrix,
    frequencies: Vec<f64>,
}

impl FixedMatrix {
    /// Rows are not required to be stochastic: a deficient row exercises
    /// the sampler's max-probability fallback.
    pub fn new(matrix: TransitionMatrix, frequencies: Vec<f64>) -> Result<Self, ConfigError> {
        if frequencies.len() != matrix.num_states() {
            return Err(ConfigError::StateCountMismatch {
                model: matrix.num_states(),
                alphabet: frequencies.len(),
            });
        }
        let frequencies = normalize_frequencies("fixed", &frequencies)?;
        Ok(Self {
            matrix,
            frequencies,
        })
    }
}

impl SubstitutionModel for FixedMatrix {
    fn num_states(&self) -> usize {
        self.matrix.num_states()
    }

    fn compute_trans_matrix(&self, time: f64, matrix: &mut TransitionMatrix) {
        if time <= 0.0 {
            matrix.reshape(self.num_states());
            matrix.set_identity();
        } else {
            matrix.clone_from(&self.matrix);
        }
    }

    fn state_frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Validate frequencies and rescale them to sum to exactly one.
pub(crate) fn normalize_frequencies(model: &str, freqs: &[f64]) -> Result<Vec<f64>, ConfigError> {
    if freqs.iter().any(|f| !f.is_finite() || *f <= 0.0) {
        return Err(ConfigError::model(model, "state frequencies must be positive"));
    }
    let sum: f64 = freqs.iter().sum();
    if (sum - 1.0).abs() > 1e-3 {
        return Err(ConfigError::model(
            model,
            format!("state frequencies sum to {sum}, expected 1"),
        ));
    }
    Ok(freqs.iter().map(|f| f / sum).collect())
}
