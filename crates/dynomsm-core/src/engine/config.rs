use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

/// How transition pairs are counted along the state sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    /// Count every pair `(s[t], s[t + lag])`, advancing one frame at a time.
    Sliding,
    /// Count non-overlapping pairs, advancing `lag` frames at a time.
    Strided,
}

/// Which model the estimation phase fits over the discretized states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Discrete Markov chain estimated directly from transition counts.
    MarkovChain,
    /// Gaussian-observation hidden Markov model refined with Baum-Welch and
    /// decoded with Viterbi.
    HiddenMarkov,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscretizationConfig {
    /// Number of discrete states (k-means cluster count).
    pub num_states: usize,
    /// Project onto this many principal components before clustering.
    /// `None` clusters the raw feature space.
    pub projection_dims: Option<usize>,
    /// Iteration budget for the k-means refinement loop.
    pub max_iterations: usize,
    /// Centroid drift below which k-means is considered converged.
    pub tolerance: f64,
    /// Seed for the k-means++ initialization RNG.
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstimationConfig {
    pub model: ModelKind,
    /// Lag time between counted transition pairs, in frames.
    pub lag_time: usize,
    pub count_mode: CountMode,
    /// Enforce detailed balance in the maximum-likelihood estimate.
    pub reversible: bool,
    /// Iteration budget for the fixed-point / Baum-Welch loops.
    pub max_iterations: usize,
    /// Convergence tolerance for the estimation loops.
    pub tolerance: f64,
}

/// Complete configuration for the extraction workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub discretization: DiscretizationConfig,
    pub estimation: EstimationConfig,
    /// Relabel states by descending self-transition probability after fitting.
    pub sort_states: bool,
}

#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    num_states: Option<usize>,
    projection_dims: Option<usize>,
    discretization_max_iterations: Option<usize>,
    discretization_tolerance: Option<f64>,
    seed: Option<u64>,
    model: Option<ModelKind>,
    lag_time: Option<usize>,
    count_mode: Option<CountMode>,
    reversible: Option<bool>,
    estimation_max_iterations: Option<usize>,
    estimation_tolerance: Option<f64>,
    sort_states: Option<bool>,
}

impl AnalysisConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_states(mut self, n: usize) -> Self {
        self.num_states = Some(n);
        self
    }
    pub fn projection_dims(mut self, dims: usize) -> Self {
        self.projection_dims = Some(dims);
        self
    }
    pub fn discretization_max_iterations(mut self, iterations: usize) -> Self {
        self.discretization_max_iterations = Some(iterations);
        self
    }
    pub fn discretization_tolerance(mut self, tolerance: f64) -> Self {
        self.discretization_tolerance = Some(tolerance);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn model(mut self, model: ModelKind) -> Self {
        self.model = Some(model);
        self
    }
    pub fn lag_time(mut self, lag: usize) -> Self {
        self.lag_time = Some(lag);
        self
    }
    pub fn count_mode(mut self, mode: CountMode) -> Self {
        self.count_mode = Some(mode);
        self
    }
    pub fn reversible(mut self, reversible: bool) -> Self {
        self.reversible = Some(reversible);
        self
    }
    pub fn estimation_max_iterations(mut self, iterations: usize) -> Self {
        self.estimation_max_iterations = Some(iterations);
        self
    }
    pub fn estimation_tolerance(mut self, tolerance: f64) -> Self {
        self.estimation_tolerance = Some(tolerance);
        self
    }
    pub fn sort_states(mut self, sort: bool) -> Self {
        self.sort_states = Some(sort);
        self
    }

    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let num_states = self
            .num_states
            .ok_or(ConfigError::MissingParameter("num_states"))?;
        if num_states == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "num_states",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(0) = self.projection_dims {
            return Err(ConfigError::InvalidParameter {
                parameter: "projection_dims",
                reason: "must be at least 1".to_string(),
            });
        }
        let lag_time = self.lag_time.unwrap_or(1);
        if lag_time == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "lag_time",
                reason: "must be at least 1".to_string(),
            });
        }

        let discretization = DiscretizationConfig {
            num_states,
            projection_dims: self.projection_dims,
            max_iterations: self.discretization_max_iterations.unwrap_or(300),
            tolerance: self.discretization_tolerance.unwrap_or(1e-8),
            seed: self.seed.unwrap_or(0),
        };
        let estimation = EstimationConfig {
            model: self.model.unwrap_or(ModelKind::MarkovChain),
            lag_time,
            count_mode: self.count_mode.unwrap_or(CountMode::Sliding),
            reversible: self.reversible.unwrap_or(true),
            max_iterations: self.estimation_max_iterations.unwrap_or(10_000),
            tolerance: self.estimation_tolerance.unwrap_or(1e-10),
        };
        Ok(AnalysisConfig {
            discretization,
            estimation,
            sort_states: self.sort_states.unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fails_without_num_states() {
        let err = AnalysisConfigBuilder::new().build().unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("num_states"));
    }

    #[test]
    fn build_rejects_zero_states() {
        let err = AnalysisConfigBuilder::new().num_states(0).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                parameter: "num_states",
                ..
            }
        ));
    }

    #[test]
    fn build_rejects_zero_lag() {
        let err = AnalysisConfigBuilder::new()
            .num_states(3)
            .lag_time(0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                parameter: "lag_time",
                ..
            }
        ));
    }

    #[test]
    fn build_applies_defaults() {
        let config = AnalysisConfigBuilder::new().num_states(4).build().unwrap();
        assert_eq!(config.discretization.num_states, 4);
        assert_eq!(config.estimation.lag_time, 1);
        assert_eq!(config.estimation.count_mode, CountMode::Sliding);
        assert_eq!(config.estimation.model, ModelKind::MarkovChain);
        assert!(config.estimation.reversible);
        assert!(config.sort_states);
    }
}
