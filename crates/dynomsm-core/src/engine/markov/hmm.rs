use crate::core::models::StateSequence;
use crate::engine::error::EngineError;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

// Lower bound on per-dimension variance, keeps emission densities finite when
// a state collapses onto identical frames.
const VARIANCE_FLOOR: f64 = 1e-6;
// Smoothing added to the initial transition counts so Baum-Welch never starts
// from a structurally forbidden transition.
const TRANSITION_PSEUDOCOUNT: f64 = 1e-3;
const LOG_FLOOR: f64 = 1e-300;

/// Gaussian observation parameters of one hidden state (diagonal covariance).
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianState {
    pub mean: DVector<f64>,
    pub variance: DVector<f64>,
}

impl GaussianState {
    /// Log-density of the frame at `frame` in `data` under this state's
    /// diagonal Gaussian.
    fn log_density(&self, data: &DMatrix<f64>, frame: usize) -> f64 {
        let mut log_prob = 0.0;
        for dim in 0..self.mean.len() {
            let variance = self.variance[dim].max(VARIANCE_FLOOR);
            let deviation = data[(frame, dim)] - self.mean[dim];
            log_prob += -0.5
                * ((2.0 * std::f64::consts::PI * variance).ln() + deviation * deviation / variance);
        }
        log_prob
    }
}

/// A Gaussian-observation hidden Markov model fitted with Baum-Welch.
///
/// Initialization comes from a k-means partition of the trajectory; the
/// expectation-maximization loop then refines transition probabilities and
/// per-state Gaussians until the log-likelihood stabilizes. The scaled
/// forward/backward recursions keep the procedure stable for long
/// trajectories.
#[derive(Debug, Clone)]
pub struct GaussianHmm {
    transition: DMatrix<f64>,
    initial: DVector<f64>,
    states: Vec<GaussianState>,
    log_likelihood: f64,
    iterations: usize,
}

impl GaussianHmm {
    /// Fits the model on `data` (rows are frames), initialized from the
    /// discrete partition `init`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidTrajectory`] if `data` holds fewer than two
    ///   frames or the partition length does not match.
    /// - [`EngineError::FitConvergence`] if the log-likelihood has not
    ///   stabilized within `max_iterations` EM sweeps.
    pub fn fit(
        data: &DMatrix<f64>,
        init: &StateSequence,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<Self, EngineError> {
        let n_frames = data.nrows();
        if n_frames < 2 {
            return Err(EngineError::invalid_trajectory(
                "hidden Markov model refinement requires at least two frames",
            ));
        }
        if init.len() != n_frames {
            return Err(EngineError::invalid_trajectory(format!(
                "partition has {} labels for {} frames",
                init.len(),
                n_frames
            )));
        }

        let mut states = initial_gaussians(data, init);
        let mut transition = initial_transition(init);
        let mut initial = initial_occupancy(init);

        let mut previous_log_likelihood = f64::NEG_INFINITY;
        for iteration in 0..max_iterations {
            let sweep = em_sweep(data, &states, &transition, &initial)?;
            states = sweep.states;
            transition = sweep.transition;
            initial = sweep.initial;

            let improvement = (sweep.log_likelihood - previous_log_likelihood).abs();
            if iteration > 0 && improvement < tolerance {
                debug!(
                    iterations = iteration + 1,
                    log_likelihood = sweep.log_likelihood,
                    "Baum-Welch converged"
                );
                return Ok(Self {
                    transition,
                    initial,
                    states,
                    log_likelihood: sweep.log_likelihood,
                    iterations: iteration + 1,
                });
            }
            previous_log_likelihood = sweep.log_likelihood;
        }

        Err(EngineError::FitConvergence {
            iterations: max_iterations,
        })
    }

    /// Most likely hidden state path for `data` (Viterbi, log space).
    pub fn decode(&self, data: &DMatrix<f64>) -> StateSequence {
        let n_frames = data.nrows();
        let n_states = self.states.len();
        if n_frames == 0 {
            return StateSequence::new(Vec::new(), n_states);
        }

        let log_transition = self.transition.map(|p| p.max(LOG_FLOOR).ln());
        let mut score = vec![0.0_f64; n_states];
        for (state, gaussian) in self.states.iter().enumerate() {
            score[state] =
                self.initial[state].max(LOG_FLOOR).ln() + gaussian.log_density(data, 0);
        }

        let mut backpointers = vec![vec![0usize; n_states]; n_frames];
        for frame in 1..n_frames {
            let mut next_score = vec![f64::NEG_INFINITY; n_states];
            for state in 0..n_states {
                let emission = self.states[state].log_density(data, frame);
                let mut best_prev = 0;
                let mut best_score = f64::NEG_INFINITY;
                for prev in 0..n_states {
                    let candidate = score[prev] + log_transition[(prev, state)];
                    if candidate > best_score {
                        best_score = candidate;
                        best_prev = prev;
                    }
                }
                next_score[state] = best_score + emission;
                backpointers[frame][state] = best_prev;
            }
            score = next_score;
        }

        let mut best_final = 0;
        for state in 1..n_states {
            if score[state] > score[best_final] {
                best_final = state;
            }
        }
        let mut labels = vec![0usize; n_frames];
        labels[n_frames - 1] = best_final;
        for frame in (1..n_frames).rev() {
            labels[frame - 1] = backpointers[frame][labels[frame]];
        }
        StateSequence::new(labels, n_states)
    }

    pub fn transition_matrix(&self) -> &DMatrix<f64> {
        &self.transition
    }

    pub fn initial_distribution(&self) -> &DVector<f64> {
        &self.initial
    }

    pub fn states(&self) -> &[GaussianState] {
        &self.states
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

struct EmSweep {
    states: Vec<GaussianState>,
    transition: DMatrix<f64>,
    initial: DVector<f64>,
    log_likelihood: f64,
}

/// One scaled forward-backward expectation step followed by the maximization
/// update of every parameter group.
fn em_sweep(
    data: &DMatrix<f64>,
    states: &[GaussianState],
    transition: &DMatrix<f64>,
    initial: &DVector<f64>,
) -> Result<EmSweep, EngineError> {
    let n_frames = data.nrows();
    let n_states = states.len();
    let n_dims = data.ncols();

    // Emission weights, shifted per frame so the scaled recursions never
    // underflow; the shifts are restored in the log-likelihood.
    let mut weights = DMatrix::zeros(n_frames, n_states);
    let mut shifts = vec![0.0_f64; n_frames];
    for frame in 0..n_frames {
        let mut max_log = f64::NEG_INFINITY;
        let mut logs = vec![0.0_f64; n_states];
        for state in 0..n_states {
            logs[state] = states[state].log_density(data, frame);
            max_log = max_log.max(logs[state]);
        }
        shifts[frame] = max_log;
        for state in 0..n_states {
            weights[(frame, state)] = (logs[state] - max_log).exp();
        }
    }

    // Scaled forward pass.
    let mut alpha = DMatrix::zeros(n_frames, n_states);
    let mut scales = vec![0.0_f64; n_frames];
    let mut log_likelihood = 0.0;
    for state in 0..n_states {
        alpha[(0, state)] = initial[state] * weights[(0, state)];
    }
    scales[0] = alpha.row(0).sum();
    if scales[0] <= 0.0 {
        return Err(EngineError::Internal(
            "forward probability vanished at frame 0".to_string(),
        ));
    }
    for state in 0..n_states {
        alpha[(0, state)] /= scales[0];
    }
    log_likelihood += scales[0].ln() + shifts[0];

    for frame in 1..n_frames {
        for state in 0..n_states {
            let mut propagated = 0.0;
            for prev in 0..n_states {
                propagated += alpha[(frame - 1, prev)] * transition[(prev, state)];
            }
            alpha[(frame, state)] = propagated * weights[(frame, state)];
        }
        scales[frame] = alpha.row(frame).sum();
        if scales[frame] <= 0.0 {
            return Err(EngineError::Internal(format!(
                "forward probability vanished at frame {frame}"
            )));
        }
        for state in 0..n_states {
            alpha[(frame, state)] /= scales[frame];
        }
        log_likelihood += scales[frame].ln() + shifts[frame];
    }

    // Scaled backward pass.
    let mut beta = DMatrix::zeros(n_frames, n_states);
    for state in 0..n_states {
        beta[(n_frames - 1, state)] = 1.0;
    }
    for frame in (0..n_frames - 1).rev() {
        for state in 0..n_states {
            let mut total = 0.0;
            for next in 0..n_states {
                total += transition[(state, next)]
                    * weights[(frame + 1, next)]
                    * beta[(frame + 1, next)];
            }
            beta[(frame, state)] = total / scales[frame + 1];
        }
    }

    // State occupancies and transition expectations.
    let mut gamma = DMatrix::zeros(n_frames, n_states);
    for frame in 0..n_frames {
        let mut total = 0.0;
        for state in 0..n_states {
            gamma[(frame, state)] = alpha[(frame, state)] * beta[(frame, state)];
            total += gamma[(frame, state)];
        }
        if total > 0.0 {
            for state in 0..n_states {
                gamma[(frame, state)] /= total;
            }
        }
    }

    let mut expected_transitions = DMatrix::zeros(n_states, n_states);
    for frame in 0..n_frames - 1 {
        for from in 0..n_states {
            for to in 0..n_states {
                expected_transitions[(from, to)] += alpha[(frame, from)]
                    * transition[(from, to)]
                    * weights[(frame + 1, to)]
                    * beta[(frame + 1, to)]
                    / scales[frame + 1];
            }
        }
    }

    // Maximization step.
    let mut new_transition = transition.clone();
    for from in 0..n_states {
        let total: f64 = expected_transitions.row(from).sum();
        if total > 0.0 {
            for to in 0..n_states {
                new_transition[(from, to)] = expected_transitions[(from, to)] / total;
            }
        }
    }

    let mut new_initial = initial.clone();
    let first_row_total: f64 = gamma.row(0).sum();
    if first_row_total > 0.0 {
        for state in 0..n_states {
            new_initial[state] = gamma[(0, state)] / first_row_total;
        }
    }

    let mut new_states = states.to_vec();
    for state in 0..n_states {
        let occupancy: f64 = (0..n_frames).map(|frame| gamma[(frame, state)]).sum();
        if occupancy < 1e-12 {
            continue; // keep the previous parameters for a vacated state
        }
        let mut mean = DVector::zeros(n_dims);
        for frame in 0..n_frames {
            for dim in 0..n_dims {
                mean[dim] += gamma[(frame, state)] * data[(frame, dim)];
            }
        }
        mean /= occupancy;

        let mut variance = DVector::zeros(n_dims);
        for frame in 0..n_frames {
            for dim in 0..n_dims {
                let deviation = data[(frame, dim)] - mean[dim];
                variance[dim] += gamma[(frame, state)] * deviation * deviation;
            }
        }
        variance /= occupancy;
        for dim in 0..n_dims {
            variance[dim] = variance[dim].max(VARIANCE_FLOOR);
        }
        new_states[state] = GaussianState { mean, variance };
    }

    Ok(EmSweep {
        states: new_states,
        transition: new_transition,
        initial: new_initial,
        log_likelihood,
    })
}

fn initial_gaussians(data: &DMatrix<f64>, init: &StateSequence) -> Vec<GaussianState> {
    let n_states = init.n_states();
    let n_dims = data.ncols();
    let n_frames = data.nrows();

    let mut means = vec![DVector::zeros(n_dims); n_states];
    let mut counts = vec![0usize; n_states];
    for (frame, &label) in init.labels().iter().enumerate() {
        counts[label] += 1;
        for dim in 0..n_dims {
            means[label][dim] += data[(frame, dim)];
        }
    }

    let global_mean = {
        let mut mean = DVector::zeros(n_dims);
        for frame in 0..n_frames {
            for dim in 0..n_dims {
                mean[dim] += data[(frame, dim)];
            }
        }
        mean / n_frames as f64
    };

    for state in 0..n_states {
        if counts[state] > 0 {
            means[state] /= counts[state] as f64;
        } else {
            means[state] = global_mean.clone();
        }
    }

    let mut variances = vec![DVector::from_element(n_dims, VARIANCE_FLOOR); n_states];
    for (frame, &label) in init.labels().iter().enumerate() {
        for dim in 0..n_dims {
            let deviation = data[(frame, dim)] - means[label][dim];
            variances[label][dim] += deviation * deviation;
        }
    }
    for state in 0..n_states {
        if counts[state] > 0 {
            variances[state] /= counts[state] as f64;
        } else {
            variances[state].fill(1.0);
        }
        for dim in 0..n_dims {
            variances[state][dim] = variances[state][dim].max(VARIANCE_FLOOR);
        }
    }

    means
        .into_iter()
        .zip(variances)
        .map(|(mean, variance)| GaussianState { mean, variance })
        .collect()
}

fn initial_transition(init: &StateSequence) -> DMatrix<f64> {
    let n_states = init.n_states();
    let labels = init.labels();
    let mut counts = DMatrix::from_element(n_states, n_states, TRANSITION_PSEUDOCOUNT);
    for window in labels.windows(2) {
        counts[(window[0], window[1])] += 1.0;
    }
    for from in 0..n_states {
        let total: f64 = counts.row(from).sum();
        for to in 0..n_states {
            counts[(from, to)] /= total;
        }
    }
    counts
}

fn initial_occupancy(init: &StateSequence) -> DVector<f64> {
    let n_states = init.n_states();
    let populations = init.state_populations();
    let total = init.len() as f64 + n_states as f64 * TRANSITION_PSEUDOCOUNT;
    DVector::from_iterator(
        n_states,
        populations
            .iter()
            .map(|&count| (count as f64 + TRANSITION_PSEUDOCOUNT) / total),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_well_data() -> (DMatrix<f64>, StateSequence) {
        // 1-D signal dwelling near 0.0 then near 5.0, with small jitter.
        let values = [
            0.0, 0.1, -0.1, 0.05, -0.05, 0.1, //
            5.0, 5.1, 4.9, 5.05, 4.95, 5.1,
        ];
        let data = DMatrix::from_row_slice(values.len(), 1, &values);
        let labels = values.iter().map(|&v| usize::from(v > 2.5)).collect();
        (data, StateSequence::new(labels, 2))
    }

    #[test]
    fn decode_recovers_a_clean_two_state_split() {
        let (data, init) = two_well_data();
        let hmm = GaussianHmm::fit(&data, &init, 200, 1e-8).unwrap();
        let decoded = hmm.decode(&data);
        assert_eq!(decoded.len(), data.nrows());
        assert_eq!(decoded.labels(), init.labels());
    }

    #[test]
    fn fitted_transition_rows_are_stochastic() {
        let (data, init) = two_well_data();
        let hmm = GaussianHmm::fit(&data, &init, 200, 1e-8).unwrap();
        for row in hmm.transition_matrix().row_iter() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert!(hmm.log_likelihood().is_finite());
    }

    #[test]
    fn em_sweeps_never_decrease_log_likelihood() {
        let (data, init) = two_well_data();
        let mut states = initial_gaussians(&data, &init);
        let mut transition = initial_transition(&init);
        let mut initial = initial_occupancy(&init);

        let mut previous = f64::NEG_INFINITY;
        for _ in 0..20 {
            let sweep = em_sweep(&data, &states, &transition, &initial).unwrap();
            assert!(
                sweep.log_likelihood >= previous - 1e-9,
                "log-likelihood dropped from {previous} to {}",
                sweep.log_likelihood
            );
            previous = sweep.log_likelihood;
            states = sweep.states;
            transition = sweep.transition;
            initial = sweep.initial;
        }
    }

    #[test]
    fn exhausted_budget_is_a_convergence_error() {
        let (data, init) = two_well_data();
        let err = GaussianHmm::fit(&data, &init, 1, 1e-30).unwrap_err();
        assert!(matches!(err, EngineError::FitConvergence { iterations: 1 }));
    }

    #[test]
    fn rejects_single_frame_data() {
        let data = DMatrix::from_row_slice(1, 1, &[0.0]);
        let init = StateSequence::new(vec![0], 1);
        assert!(matches!(
            GaussianHmm::fit(&data, &init, 10, 1e-8),
            Err(EngineError::InvalidTrajectory { .. })
        ));
    }

    #[test]
    fn rejects_partition_length_mismatch() {
        let data = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 2.0]);
        let init = StateSequence::new(vec![0, 1], 2);
        assert!(matches!(
            GaussianHmm::fit(&data, &init, 10, 1e-8),
            Err(EngineError::InvalidTrajectory { .. })
        ));
    }
}
