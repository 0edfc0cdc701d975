//! Turns a continuous feature trajectory into discrete state labels.
//!
//! Discretization runs in two optional stages: a principal-component
//! [`projection`] onto a low-dimensional slow subspace, followed by
//! [`kmeans`] clustering of the (projected) frames into the configured
//! number of states.

pub mod kmeans;
pub mod projection;
