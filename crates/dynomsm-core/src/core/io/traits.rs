use crate::core::models::Trajectory;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Defines the interface for reading dynophore trajectory file formats.
///
/// This trait provides a common API for loading a [`Trajectory`] from the
/// various time-series formats produced by dynophore extraction tools.
/// Implementors handle format-specific parsing and validation; the returned
/// trajectory always satisfies the uniform-dimensionality invariant.
pub trait TrajectoryFile {
    /// The type of metadata associated with the file format (e.g., feature names).
    type Metadata;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a trajectory from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails, the data is internally inconsistent
    /// (ragged frames), or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<(Trajectory, Self::Metadata), Self::Error>;

    /// Reads a trajectory from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<(Trajectory, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}
