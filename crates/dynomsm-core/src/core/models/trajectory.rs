use super::frame::Frame;
use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrajectoryError {
    #[error("frame {index} has {found} features, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// An ordered, immutable sequence of [`Frame`]s with uniform feature dimensionality.
///
/// The dimensionality invariant is enforced at construction; once built, a
/// trajectory is never mutated by any part of the analysis pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    frames: Vec<Frame>,
    dim: usize,
}

impl Trajectory {
    /// Builds a trajectory from pre-constructed frames.
    ///
    /// # Errors
    ///
    /// Returns [`TrajectoryError::DimensionMismatch`] if any frame's feature
    /// dimensionality differs from the first frame's.
    pub fn new(frames: Vec<Frame>) -> Result<Self, TrajectoryError> {
        let dim = frames.first().map_or(0, Frame::dim);
        for (index, frame) in frames.iter().enumerate() {
            if frame.dim() != dim {
                return Err(TrajectoryError::DimensionMismatch {
                    index,
                    expected: dim,
                    found: frame.dim(),
                });
            }
        }
        Ok(Self { frames, dim })
    }

    /// Builds a trajectory from raw per-frame feature rows, assigning timestep
    /// indices in order.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, TrajectoryError> {
        let frames = rows
            .into_iter()
            .enumerate()
            .map(|(index, features)| Frame::new(index, features))
            .collect();
        Self::new(frames)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The shared feature dimensionality (0 for an empty trajectory).
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Copies the feature data into a dense `frames x dim` matrix for the
    /// numerical layers.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), self.dim, |row, col| {
            self.frames[row].features()[col]
        })
    }
}

/// Incremental constructor used by the file readers.
///
/// Locks the feature dimensionality to the first pushed row and rejects ragged
/// rows immediately, so malformed input fails at its source line rather than at
/// the end of the file.
#[derive(Debug, Default)]
pub struct TrajectoryBuilder {
    frames: Vec<Frame>,
    dim: Option<usize>,
}

impl TrajectoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, features: Vec<f64>) -> Result<(), TrajectoryError> {
        let expected = *self.dim.get_or_insert(features.len());
        if features.len() != expected {
            return Err(TrajectoryError::DimensionMismatch {
                index: self.frames.len(),
                expected,
                found: features.len(),
            });
        }
        self.frames.push(Frame::new(self.frames.len(), features));
        Ok(())
    }

    pub fn build(self) -> Trajectory {
        let dim = self.dim.unwrap_or(0);
        Trajectory {
            frames: self.frames,
            dim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_uniform_dimensionality() {
        let traj = Trajectory::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.5]]).unwrap();
        assert_eq!(traj.len(), 2);
        assert_eq!(traj.dim(), 2);
        assert_eq!(traj.frame(1).unwrap().features(), &[1.0, 0.5]);
    }

    #[test]
    fn new_rejects_ragged_frames() {
        let err = Trajectory::from_rows(vec![vec![0.0, 1.0], vec![1.0]]).unwrap_err();
        assert_eq!(
            err,
            TrajectoryError::DimensionMismatch {
                index: 1,
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn empty_trajectory_has_zero_dim() {
        let traj = Trajectory::from_rows(vec![]).unwrap();
        assert!(traj.is_empty());
        assert_eq!(traj.dim(), 0);
    }

    #[test]
    fn builder_locks_dimensionality_to_first_row() {
        let mut builder = TrajectoryBuilder::new();
        builder.push_row(vec![1.0, 2.0, 3.0]).unwrap();
        let err = builder.push_row(vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::DimensionMismatch {
                index: 1,
                expected: 3,
                found: 1,
            }
        ));
    }

    #[test]
    fn to_matrix_preserves_row_order() {
        let traj = Trajectory::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let m = traj.to_matrix();
        assert_eq!(m.nrows(), 2);
        assert_eq!(m[(0, 1)], 2.0);
        assert_eq!(m[(1, 0)], 3.0);
    }
}
