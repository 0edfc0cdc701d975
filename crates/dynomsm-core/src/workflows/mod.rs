//! # Workflows Module
//!
//! This module provides the high-level entry points that orchestrate the
//! complete trajectory-to-Markov-model extraction process.
//!
//! ## Overview
//!
//! Workflows are the top-level API for users of the library. They encapsulate
//! the entire analysis pipeline, from trajectory validation through
//! discretization and model estimation to postprocessed results, with
//! phase-level progress reporting along the way.
//!
//! ## Architecture
//!
//! - **Extraction Workflow** ([`extract`]) - Validation, optional
//!   principal-component projection, k-means discretization, transition
//!   counting, maximum-likelihood or hidden-Markov estimation, and
//!   metastability sorting.

pub mod extract;
