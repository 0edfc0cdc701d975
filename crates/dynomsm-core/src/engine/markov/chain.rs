use super::counts::TransitionCounts;
use super::hmm::GaussianState;
use crate::engine::error::EngineError;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Tolerance for the row-stochasticity invariant of fitted transition matrices.
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// A fitted Markov model over a discrete state space.
///
/// Owns the transition probability matrix (every row sums to 1.0 within
/// [`ROW_SUM_TOLERANCE`]), the stationary distribution, the count matrix the
/// fit was based on, and, for hidden-model fits, the per-state Gaussian
/// observation parameters. Read-only after fitting.
#[derive(Debug, Clone)]
pub struct MarkovModel {
    pub(crate) transition: DMatrix<f64>,
    pub(crate) stationary: DVector<f64>,
    pub(crate) counts: DMatrix<f64>,
    pub(crate) lag: usize,
    pub(crate) reversible: bool,
    pub(crate) observations: Option<Vec<GaussianState>>,
}

impl MarkovModel {
    /// Maximum-likelihood estimation from transition counts.
    ///
    /// The non-reversible estimate is the closed-form row normalization of the
    /// count matrix. The reversible estimate enforces detailed balance through
    /// the standard self-consistent fixed-point iteration on the symmetrized
    /// counts, stopping when the largest element change drops below
    /// `tolerance`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::FitConvergence`] if the iteration budget is
    /// exhausted before the tolerance is met.
    pub fn fit(
        counts: &TransitionCounts,
        reversible: bool,
        tolerance: f64,
        max_iterations: usize,
    ) -> Result<Self, EngineError> {
        let c = counts.matrix();
        let (transition, stationary) = if reversible {
            fit_reversible(c, tolerance, max_iterations)?
        } else {
            let transition = normalize_rows(c);
            let stationary = stationary_distribution(&transition, tolerance, max_iterations)?;
            (transition, stationary)
        };

        debug!(
            n_states = counts.n_states(),
            reversible, "maximum-likelihood Markov chain fitted"
        );
        Ok(Self {
            transition,
            stationary,
            counts: c.clone(),
            lag: counts.lag(),
            reversible,
            observations: None,
        })
    }

    /// Assembles a model from an already-estimated transition matrix, as
    /// produced by the hidden Markov model refinement.
    pub(crate) fn from_parts(
        transition: DMatrix<f64>,
        counts: DMatrix<f64>,
        lag: usize,
        observations: Option<Vec<GaussianState>>,
        tolerance: f64,
        max_iterations: usize,
    ) -> Result<Self, EngineError> {
        let stationary = stationary_distribution(&transition, tolerance, max_iterations)?;
        Ok(Self {
            transition,
            stationary,
            counts,
            lag,
            reversible: false,
            observations,
        })
    }

    pub fn n_states(&self) -> usize {
        self.transition.nrows()
    }

    pub fn lag(&self) -> usize {
        self.lag
    }

    pub fn is_reversible(&self) -> bool {
        self.reversible
    }

    pub fn transition_matrix(&self) -> &DMatrix<f64> {
        &self.transition
    }

    pub fn stationary_distribution(&self) -> &DVector<f64> {
        &self.stationary
    }

    pub fn count_matrix(&self) -> &DMatrix<f64> {
        &self.counts
    }

    /// Per-state Gaussian observation parameters, present only for
    /// hidden-model fits.
    pub fn observation_models(&self) -> Option<&[GaussianState]> {
        self.observations.as_deref()
    }

    /// Implied relaxation timescales `-lag / ln |lambda_i|` for the
    /// eigenvalues below the stationary one, in descending order of magnitude.
    pub fn timescales(&self) -> Vec<f64> {
        let mut magnitudes: Vec<f64> = self
            .transition
            .complex_eigenvalues()
            .iter()
            .map(|eigenvalue| eigenvalue.norm())
            .collect();
        magnitudes.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        magnitudes
            .into_iter()
            .skip(1)
            .map(|magnitude| {
                if magnitude >= 1.0 {
                    f64::INFINITY
                } else if magnitude <= 0.0 {
                    0.0
                } else {
                    -(self.lag as f64) / magnitude.ln()
                }
            })
            .collect()
    }
}

/// Row-normalizes a count matrix; states with no outgoing counts become
/// absorbing self-loops to keep the matrix stochastic.
fn normalize_rows(counts: &DMatrix<f64>) -> DMatrix<f64> {
    let n = counts.nrows();
    let mut transition = DMatrix::zeros(n, n);
    for row in 0..n {
        let total: f64 = counts.row(row).sum();
        if total > 0.0 {
            for col in 0..n {
                transition[(row, col)] = counts[(row, col)] / total;
            }
        } else {
            transition[(row, row)] = 1.0;
        }
    }
    transition
}

/// Reversible maximum-likelihood estimate via the self-consistent iteration
/// on the symmetrized count variables `x_ij`.
fn fit_reversible(
    counts: &DMatrix<f64>,
    tolerance: f64,
    max_iterations: usize,
) -> Result<(DMatrix<f64>, DVector<f64>), EngineError> {
    let n = counts.nrows();
    let row_counts: Vec<f64> = (0..n).map(|row| counts.row(row).sum()).collect();

    let mut x = counts + counts.transpose();
    for iteration in 0..max_iterations {
        let x_row: Vec<f64> = (0..n).map(|row| x.row(row).sum()).collect();

        let mut updated = DMatrix::zeros(n, n);
        let mut delta = 0.0_f64;
        for i in 0..n {
            for j in 0..n {
                let symmetric_count = counts[(i, j)] + counts[(j, i)];
                if symmetric_count > 0.0 && x_row[i] > 0.0 && x_row[j] > 0.0 {
                    let denominator = row_counts[i] / x_row[i] + row_counts[j] / x_row[j];
                    updated[(i, j)] = symmetric_count / denominator;
                }
                delta = delta.max((updated[(i, j)] - x[(i, j)]).abs());
            }
        }
        x = updated;

        if delta < tolerance {
            debug!(iterations = iteration + 1, "reversible estimation converged");
            let x_row: Vec<f64> = (0..n).map(|row| x.row(row).sum()).collect();
            let total: f64 = x_row.iter().sum();
            let mut transition = DMatrix::zeros(n, n);
            for i in 0..n {
                if x_row[i] > 0.0 {
                    for j in 0..n {
                        transition[(i, j)] = x[(i, j)] / x_row[i];
                    }
                } else {
                    transition[(i, i)] = 1.0;
                }
            }
            let stationary = DVector::from_iterator(
                n,
                x_row.iter().map(|&weight| {
                    if total > 0.0 { weight / total } else { 0.0 }
                }),
            );
            return Ok((transition, stationary));
        }
    }

    Err(EngineError::FitConvergence {
        iterations: max_iterations,
    })
}

/// Stationary distribution by damped power iteration. The half-lazy chain
/// `(I + T) / 2` shares the stationary vector of `T` but cannot oscillate on
/// periodic chains.
fn stationary_distribution(
    transition: &DMatrix<f64>,
    tolerance: f64,
    max_iterations: usize,
) -> Result<DVector<f64>, EngineError> {
    let n = transition.nrows();
    if n == 0 {
        return Ok(DVector::zeros(0));
    }
    let mut pi = DVector::from_element(n, 1.0 / n as f64);
    for _ in 0..max_iterations.max(1) {
        let propagated = transition.transpose() * &pi;
        let mut next = (&pi + propagated) * 0.5;
        let total = next.sum();
        if total > 0.0 {
            next /= total;
        }
        let delta = (&next - &pi).abs().max();
        pi = next;
        if delta < tolerance.max(f64::EPSILON) {
            return Ok(pi);
        }
    }
    Err(EngineError::FitConvergence {
        iterations: max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::StateSequence;
    use crate::engine::config::CountMode;

    fn counts_from(labels: Vec<usize>, n_states: usize) -> TransitionCounts {
        let seq = StateSequence::new(labels, n_states);
        TransitionCounts::estimate(&seq, 1, CountMode::Sliding).unwrap()
    }

    fn assert_rows_stochastic(model: &MarkovModel) {
        for row in model.transition_matrix().row_iter() {
            assert!((row.sum() - 1.0).abs() < ROW_SUM_TOLERANCE);
        }
    }

    #[test]
    fn non_reversible_fit_is_row_normalized_counts() {
        let counts = counts_from(vec![0, 0, 0, 1, 0], 2);
        let model = MarkovModel::fit(&counts, false, 1e-12, 10_000).unwrap();
        let t = model.transition_matrix();
        // From state 0: two self-transitions, one to state 1.
        assert!((t[(0, 0)] - 2.0 / 3.0).abs() < 1e-12);
        assert!((t[(0, 1)] - 1.0 / 3.0).abs() < 1e-12);
        assert!((t[(1, 0)] - 1.0).abs() < 1e-12);
        assert_rows_stochastic(&model);
    }

    #[test]
    fn reversible_fit_satisfies_detailed_balance() {
        let counts = counts_from(vec![0, 0, 1, 2, 1, 0, 0, 1, 1, 2, 2, 0], 3);
        let model = MarkovModel::fit(&counts, true, 1e-12, 10_000).unwrap();
        assert_rows_stochastic(&model);

        let t = model.transition_matrix();
        let pi = model.stationary_distribution();
        assert!((pi.sum() - 1.0).abs() < 1e-9);
        for i in 0..3 {
            for j in 0..3 {
                let flux_forward = pi[i] * t[(i, j)];
                let flux_backward = pi[j] * t[(j, i)];
                assert!(
                    (flux_forward - flux_backward).abs() < 1e-9,
                    "detailed balance violated at ({i},{j})"
                );
            }
        }
    }

    #[test]
    fn unvisited_state_becomes_absorbing() {
        let counts = counts_from(vec![0, 1, 0, 1], 3);
        let model = MarkovModel::fit(&counts, false, 1e-12, 10_000).unwrap();
        assert!((model.transition_matrix()[(2, 2)] - 1.0).abs() < 1e-12);
        assert_rows_stochastic(&model);
    }

    #[test]
    fn reversible_budget_exhaustion_is_a_convergence_error() {
        let counts = counts_from(vec![0, 1, 0, 0, 1, 1, 0], 2);
        let err = MarkovModel::fit(&counts, true, 1e-15, 0).unwrap_err();
        assert!(matches!(err, EngineError::FitConvergence { iterations: 0 }));
    }

    #[test]
    fn timescales_of_a_metastable_two_state_chain() {
        // Two long dwells with rare crossings: a slow relaxation process.
        let counts = counts_from(vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 0, 0, 0], 2);
        let model = MarkovModel::fit(&counts, true, 1e-14, 100_000).unwrap();
        let timescales = model.timescales();
        assert_eq!(timescales.len(), 1);
        assert!(timescales[0].is_finite());
        assert!(timescales[0] > 1.0);
    }

    #[test]
    fn stationary_distribution_matches_hand_computed_chain() {
        // Counts give T = [[0.4, 0.6], [1.0, 0.0]].
        let counts = counts_from(vec![0, 0, 1, 0, 1, 0, 0, 1, 0], 2);
        let model = MarkovModel::fit(&counts, false, 1e-13, 100_000).unwrap();
        let pi = model.stationary_distribution();
        let t = model.transition_matrix();
        let propagated = t.transpose() * pi;
        for i in 0..2 {
            assert!((propagated[i] - pi[i]).abs() < 1e-6);
        }
    }
}
