//! # Core Module
//!
//! This module provides the fundamental building blocks for dynophore trajectory
//! analysis, serving as the stateless foundation of the library.
//!
//! ## Architecture
//!
//! The module is organized into specialized submodules:
//!
//! - **Trajectory Representation** ([`models`]) - Data structures for frames,
//!   trajectories, and discrete state sequences
//! - **File I/O** ([`io`]) - Reading dynophore time-series files (JSON, CSV) and
//!   writing analysis artifacts

pub mod io;
pub mod models;
