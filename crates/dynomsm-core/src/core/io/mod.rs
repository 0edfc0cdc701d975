//! Provides input/output functionality for dynophore trajectory data.
//!
//! This module contains implementations for reading the time-series file
//! formats produced by dynophore extraction tools (JSON and CSV) behind a
//! unified trait-based interface, plus writers for the tabular analysis
//! artifacts (state sequences and transition matrices).

pub mod csv;
pub mod json;
pub mod traits;
