//! # Engine Module
//!
//! This module implements the numerical core of the trajectory-to-Markov-model
//! extraction pipeline.
//!
//! ## Overview
//!
//! The engine turns a validated feature trajectory into a discrete state
//! sequence and a fitted Markov model. It owns every estimation procedure the
//! pipeline needs and reports progress through a callback interface so that
//! front ends stay decoupled from the numerics.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Discretization and estimation parameters,
//!   convergence criteria, and the builder that validates them
//! - **Discretization** ([`discretize`]) - Principal-component projection and
//!   k-means clustering of feature trajectories
//! - **Markov Estimation** ([`markov`]) - Transition counting, maximum-likelihood
//!   Markov chains, and Gaussian hidden Markov model refinement
//! - **Postprocessing** ([`postprocess`]) - Metastability sorting and
//!   stochasticity checks on fitted models
//! - **Progress Monitoring** ([`progress`]) - Progress reporting and user
//!   feedback mechanisms
//! - **Error Handling** ([`error`]) - Engine-specific error types and
//!   error propagation

pub mod config;
pub mod discretize;
pub mod error;
pub mod markov;
pub mod postprocess;
pub mod progress;
