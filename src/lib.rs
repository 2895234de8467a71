#![forbid(unsafe_code)]

//! # `mediation_mcmc`
//!
//! Bayesian mediation analysis for high-dimensional candidate mediators.
//! A Gibbs sampler with spike-and-slab priors selects which mediators carry
//! the effect of a single exposure on an outcome, and a Metropolis-Hastings
//! step learns each mediator's prior inclusion probability.
//!
//! ```no_run
//! use faer::Mat;
//! use mediation_mcmc::utils::usize_to_f64;
//! use mediation_mcmc::{MediationFitOptions, MediationInput, fit_mediation_input};
//!
//! let n = 200;
//! let exposure = Mat::from_fn(n, 1, |i, _| if i % 2 == 0 { 1.0 } else { 0.0 });
//! let mediators = Mat::from_fn(n, 5, |i, j| usize_to_f64((i * 7 + j * 3) % 11) / 11.0);
//! let outcome = Mat::from_fn(n, 1, |i, _| exposure[(i, 0)] + mediators[(i, 0)]);
//! let input = MediationInput::new(outcome, exposure, mediators);
//!
//! let (_, report) = fit_mediation_input(&input, MediationFitOptions::default())?;
//! if let Some(summary) = report.posterior_summary {
//!     println!("{:?}", summary.mediator_inclusion_rate);
//! }
//! # Ok::<(), mediation_mcmc::MediationError>(())
//! ```

pub mod inference;
pub mod input;
pub mod models;
pub mod preprocess;
pub mod utils;

pub use inference::{InferenceError, McmcConfig, ProposalStats};
pub use input::{InputError, MediationDimensions, MediationInput};
pub use preprocess::{
    ColumnScaling, column_has_variation, drop_constant_columns, standardize_columns,
    standardize_input, zero_norm_columns,
};
pub mod matrix_ops {
    pub use crate::models::matrix_ops::*;
}

pub use models::mediation::{
    ChainState, DEFAULT_INCLUSION_PROBABILITY, DrawSink, InitialValues, InverseGammaPrior,
    LineSink, MediationDraw, MediationError, MediationFitOptions, MediationModel,
    MediationPosteriorSamples, MediationPosteriorSummary, MediationPriorConfig,
    MediationProposalTuning, MediationReport, MediationSampler, MediationSamplerConfig,
    MediationSamplerDiagnostics, ParameterSummary, VarianceState, fit_mediation_input,
    fit_mediation_input_with_config, fit_mediation_input_with_posterior,
    fit_mediation_input_with_sink, results_file_name, summarize_posterior,
};
