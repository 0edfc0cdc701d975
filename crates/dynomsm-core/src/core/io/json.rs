use crate::core::io::traits::TrajectoryFile;
use crate::core::models::{Trajectory, TrajectoryBuilder, TrajectoryError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::{self, BufRead};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonTrajectoryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

impl From<TrajectoryError> for JsonTrajectoryError {
    fn from(err: TrajectoryError) -> Self {
        JsonTrajectoryError::Inconsistency(err.to_string())
    }
}

/// Metadata carried alongside a trajectory parsed from a time-series JSON file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonMetadata {
    /// Name of the dynophore run, when the file records one.
    pub name: Option<String>,
    /// Superfeature identifiers, in feature-column order. Empty for the plain
    /// row-matrix shape, which carries no identifiers.
    pub feature_names: Vec<String>,
}

/// The two accepted shapes of a dynophore time-series JSON document.
///
/// The row-matrix shape is a plain 2-D array with one row per frame. The
/// dynophore shape maps each superfeature identifier to its occupancy series
/// over time; the series are transposed into per-frame feature vectors, with
/// columns ordered by superfeature identifier for determinism.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeSeriesDocument {
    Rows(Vec<Vec<f64>>),
    Dynophore {
        name: Option<String>,
        superfeatures: BTreeMap<String, Vec<f64>>,
    },
}

pub struct JsonTrajectoryFile;

impl TrajectoryFile for JsonTrajectoryFile {
    type Metadata = JsonMetadata;
    type Error = JsonTrajectoryError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Trajectory, Self::Metadata), Self::Error> {
        let document: TimeSeriesDocument = serde_json::from_reader(reader)?;
        match document {
            TimeSeriesDocument::Rows(rows) => {
                let trajectory = Trajectory::from_rows(rows)?;
                Ok((trajectory, JsonMetadata::default()))
            }
            TimeSeriesDocument::Dynophore { name, superfeatures } => {
                if superfeatures.is_empty() {
                    return Err(JsonTrajectoryError::Inconsistency(
                        "document contains no superfeatures".to_string(),
                    ));
                }
                let n_frames = superfeatures.values().next().map_or(0, Vec::len);
                for (id, series) in &superfeatures {
                    if series.len() != n_frames {
                        return Err(JsonTrajectoryError::Inconsistency(format!(
                            "superfeature '{}' has {} samples, expected {}",
                            id,
                            series.len(),
                            n_frames
                        )));
                    }
                }

                let mut builder = TrajectoryBuilder::new();
                for frame in 0..n_frames {
                    let features = superfeatures.values().map(|series| series[frame]).collect();
                    builder.push_row(features)?;
                }
                let metadata = JsonMetadata {
                    name,
                    feature_names: superfeatures.keys().cloned().collect(),
                };
                Ok((builder.build(), metadata))
            }
        }
    }
}
