use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::TrajectoryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid trajectory: {reason}")]
    InvalidTrajectory { reason: String },

    #[error("Estimation failed to converge after {iterations} iterations")]
    FitConvergence { iterations: usize },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    pub(crate) fn invalid_trajectory(reason: impl Into<String>) -> Self {
        EngineError::InvalidTrajectory {
            reason: reason.into(),
        }
    }
}

impl From<TrajectoryError> for EngineError {
    fn from(err: TrajectoryError) -> Self {
        EngineError::invalid_trajectory(err.to_string())
    }
}
