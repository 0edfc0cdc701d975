use crate::error::{CliError, Result};
use dynomsm::core::io::csv::CsvTrajectoryFile;
use dynomsm::core::io::json::JsonTrajectoryFile;
use dynomsm::core::io::traits::TrajectoryFile;
use dynomsm::core::models::Trajectory;
use std::path::Path;
use tracing::info;

/// A loaded trajectory together with whatever identifying metadata the file
/// format carried.
#[derive(Debug)]
pub struct LoadedTrajectory {
    pub trajectory: Trajectory,
    pub name: Option<String>,
    pub feature_names: Vec<String>,
}

/// Loads a trajectory, dispatching on the file extension (`.json` or `.csv`).
pub fn load_trajectory(path: &Path) -> Result<LoadedTrajectory> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let loaded = match extension.as_deref() {
        Some("json") => {
            let (trajectory, metadata) =
                JsonTrajectoryFile::read_from_path(path).map_err(|e| CliError::FileParsing {
                    path: path.to_path_buf(),
                    source: e.into(),
                })?;
            LoadedTrajectory {
                trajectory,
                name: metadata.name,
                feature_names: metadata.feature_names,
            }
        }
        Some("csv") => {
            let (trajectory, metadata) =
                CsvTrajectoryFile::read_from_path(path).map_err(|e| CliError::FileParsing {
                    path: path.to_path_buf(),
                    source: e.into(),
                })?;
            LoadedTrajectory {
                trajectory,
                name: None,
                feature_names: metadata.feature_names,
            }
        }
        _ => {
            return Err(CliError::Argument(format!(
                "unsupported trajectory format for '{}' (expected .json or .csv)",
                path.display()
            )));
        }
    };

    info!(
        frames = loaded.trajectory.len(),
        features = loaded.trajectory.dim(),
        "Trajectory loaded from {:?}",
        path
    );
    Ok(loaded)
}
