//! Data structures representing dynophore trajectories and their discretization.
//!
//! A [`Trajectory`] is an ordered sequence of [`Frame`]s sharing a fixed feature
//! dimensionality. Discretizing a trajectory yields a [`StateSequence`] with one
//! discrete state label per frame. All types here are immutable once built.

mod frame;
mod sequence;
mod trajectory;

pub use frame::Frame;
pub use sequence::StateSequence;
pub use trajectory::{Trajectory, TrajectoryBuilder, TrajectoryError};
