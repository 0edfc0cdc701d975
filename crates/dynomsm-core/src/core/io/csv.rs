use crate::core::io::traits::TrajectoryFile;
use crate::core::models::{StateSequence, Trajectory, TrajectoryBuilder, TrajectoryError};
use nalgebra::DMatrix;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvTrajectoryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid float on line {line} (value: '{value}')")]
    InvalidFloat { line: usize, value: String },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

impl From<TrajectoryError> for CsvTrajectoryError {
    fn from(err: TrajectoryError) -> Self {
        CsvTrajectoryError::Inconsistency(err.to_string())
    }
}

/// Metadata carried alongside a trajectory parsed from a CSV file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvMetadata {
    /// Column names from the header row, if the file had one.
    pub feature_names: Vec<String>,
}

/// CSV time-series reader: one row per frame, one column per superfeature.
///
/// A leading header row of non-numeric column names is detected and captured
/// as feature names; every other row must parse as floats.
pub struct CsvTrajectoryFile;

impl TrajectoryFile for CsvTrajectoryFile {
    type Metadata = CsvMetadata;
    type Error = CsvTrajectoryError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Trajectory, Self::Metadata), Self::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut builder = TrajectoryBuilder::new();
        let mut metadata = CsvMetadata::default();

        for (record_idx, record) in csv_reader.records().enumerate() {
            let record = record?;
            let line = record_idx + 1;

            let mut features = Vec::with_capacity(record.len());
            let mut parse_failure = None;
            for field in record.iter() {
                match field.parse::<f64>() {
                    Ok(value) => features.push(value),
                    Err(_) => {
                        parse_failure = Some(field.to_string());
                        break;
                    }
                }
            }

            match parse_failure {
                None => builder.push_row(features)?,
                // Only the first record may be non-numeric: it is the header.
                Some(_) if record_idx == 0 => {
                    metadata.feature_names = record.iter().map(str::to_string).collect();
                }
                Some(value) => {
                    return Err(CsvTrajectoryError::InvalidFloat { line, value });
                }
            }
        }

        Ok((builder.build(), metadata))
    }
}

/// Writes a state sequence as a two-column `frame,state` CSV table.
pub fn write_state_sequence(
    sequence: &StateSequence,
    writer: &mut impl Write,
) -> Result<(), CsvTrajectoryError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["frame", "state"])?;
    for (frame, &state) in sequence.labels().iter().enumerate() {
        csv_writer.write_record([frame.to_string(), state.to_string()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes a square matrix (counts or transition probabilities) as CSV, one row
/// per source state.
pub fn write_matrix(
    matrix: &DMatrix<f64>,
    writer: &mut impl Write,
) -> Result<(), CsvTrajectoryError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in matrix.row_iter() {
        let fields: Vec<String> = row.iter().map(|value| format!("{value:.12}")).collect();
        csv_writer.write_record(&fields)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(text: &str) -> Result<(Trajectory, CsvMetadata), CsvTrajectoryError> {
        CsvTrajectoryFile::read_from(&mut Cursor::new(text.as_bytes()))
    }

    #[test]
    fn reads_headerless_rows() {
        let (traj, meta) = read("0.0,1.0\n0.5,0.5\n").unwrap();
        assert_eq!(traj.len(), 2);
        assert_eq!(traj.dim(), 2);
        assert!(meta.feature_names.is_empty());
    }

    #[test]
    fn captures_header_row() {
        let (traj, meta) = read("AR[1],HBA[2]\n0.0,1.0\n").unwrap();
        assert_eq!(traj.len(), 1);
        assert_eq!(meta.feature_names, vec!["AR[1]", "HBA[2]"]);
    }

    #[test]
    fn rejects_non_numeric_body_row() {
        let err = read("0.0,1.0\n0.5,oops\n").unwrap_err();
        assert!(matches!(
            err,
            CsvTrajectoryError::InvalidFloat { line: 2, .. }
        ));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = read("0.0,1.0\n0.5\n").unwrap_err();
        assert!(matches!(err, CsvTrajectoryError::Inconsistency(_)));
    }

    #[test]
    fn writes_state_sequence_table() {
        let seq = StateSequence::new(vec![0, 2, 1], 3);
        let mut out = Vec::new();
        write_state_sequence(&seq, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "frame,state\n0,0\n1,2\n2,1\n");
    }

    #[test]
    fn writes_matrix_rows() {
        let matrix = DMatrix::from_row_slice(2, 2, &[0.9, 0.1, 0.2, 0.8]);
        let mut out = Vec::new();
        write_matrix(&matrix, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("0.900000000000,0.100000000000\n"));
    }
}
