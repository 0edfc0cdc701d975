//! # DynoMSM Core Library
//!
//! A library for Markov-model analysis of dynophore trajectories: time-resolved
//! pharmacophore/interaction-pattern data extracted from molecular dynamics
//! simulations of supramolecular complexes.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a clear
//! separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models ([`core::models::Trajectory`],
//!   [`core::models::StateSequence`]) and I/O utilities for the dynophore time-series
//!   formats (JSON, CSV).
//!
//! - **[`engine`]: The Logic Core.** Implements the numerical machinery: dimensionality
//!   reduction, k-means discretization, transition counting, maximum-likelihood Markov
//!   chain estimation, and Gaussian hidden Markov model refinement.
//!
//! - **[`workflows`]: The Public API.** This is the highest-level, user-facing layer.
//!   It ties the `engine` and `core` together to execute the complete
//!   trajectory-to-Markov-model extraction procedure in a single call.

pub mod core;
pub mod engine;
pub mod workflows;
