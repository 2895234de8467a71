//! # Models
//!
//! The Bayesian mediation sampler and the dense matrix helpers it is built on.

pub mod matrix_ops;
pub mod mediation;
