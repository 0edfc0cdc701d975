//! Markov model estimation over discrete state sequences.
//!
//! [`counts`] turns a state sequence into a lag-time transition count matrix.
//! [`chain`] fits a maximum-likelihood Markov chain (reversible or not) from
//! those counts. [`hmm`] refines a k-means partition into a
//! Gaussian-observation hidden Markov model with Baum-Welch and decodes the
//! most likely state path with Viterbi.

pub mod chain;
pub mod counts;
pub mod hmm;

pub use chain::MarkovModel;
pub use counts::TransitionCounts;
pub use hmm::{GaussianHmm, GaussianState};
