use crate::core::models::StateSequence;
use crate::engine::config::{ConfigError, CountMode};
use crate::engine::error::EngineError;
use nalgebra::DMatrix;

/// Transition counts of a state sequence at a fixed lag time.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCounts {
    matrix: DMatrix<f64>,
    lag: usize,
    mode: CountMode,
}

impl TransitionCounts {
    /// Counts transition pairs `(s[t], s[t + lag])` over the sequence.
    ///
    /// `Sliding` mode advances one frame at a time (overlapping pairs,
    /// maximal statistics); `Strided` advances `lag` frames (independent
    /// pairs).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for a zero lag, and
    /// [`EngineError::InvalidTrajectory`] if the sequence is empty or too
    /// short to contain a single pair at the requested lag.
    pub fn estimate(
        sequence: &StateSequence,
        lag: usize,
        mode: CountMode,
    ) -> Result<Self, EngineError> {
        if lag == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "lag_time",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if sequence.is_empty() {
            return Err(EngineError::invalid_trajectory(
                "cannot count transitions of an empty state sequence",
            ));
        }
        if sequence.len() <= lag {
            return Err(EngineError::invalid_trajectory(format!(
                "sequence of {} frames has no transition pairs at lag {}",
                sequence.len(),
                lag
            )));
        }

        let n = sequence.n_states();
        let labels = sequence.labels();
        let step = match mode {
            CountMode::Sliding => 1,
            CountMode::Strided => lag,
        };

        let mut matrix = DMatrix::zeros(n, n);
        let mut t = 0;
        while t + lag < labels.len() {
            matrix[(labels[t], labels[t + lag])] += 1.0;
            t += step;
        }

        Ok(Self { matrix, lag, mode })
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn lag(&self) -> usize {
        self.lag
    }

    pub fn mode(&self) -> CountMode {
        self.mode
    }

    pub fn n_states(&self) -> usize {
        self.matrix.nrows()
    }

    /// Total outgoing counts per state.
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.matrix.nrows())
            .map(|row| self.matrix.row(row).sum())
            .collect()
    }
}
