//! Bayesian mediation analysis with spike-and-slab mediator selection.
//!
//! The outcome model is
//!
//! ```text
//! Y = beta_a * A + M * beta_m + C1 * beta_c + e,   e ~ N(0, sigma_e)
//! M = A * alpha_a' + C2 * alpha_c + g,             g ~ N(0, sigma_g)
//! ```
//!
//! with a two-component normal mixture prior on every `beta_m[j]` and
//! `alpha_a[j]`. Each sweep updates all coefficients by Gibbs sampling while
//! keeping cached residuals in sync, then moves the prior inclusion
//! probabilities with a joint Metropolis-Hastings step.

pub mod conditionals;
pub mod inclusion;
pub mod output;
pub mod posterior;
pub mod priors;
pub mod residuals;
pub mod sampler;
pub mod state;
pub mod types;

pub use conditionals::{ExposureVariances, LOG_ODDS_SATURATION, SpikeSlabMoments, logistic_stable};
pub use inclusion::{InclusionKernel, InclusionProposal, bernoulli_log_likelihood, reflect_probability};
pub use output::{DrawSink, LineSink, MediationDraw, results_file_name};
pub use posterior::{
    MediationPosteriorSamples, MediationPosteriorSummary, ParameterSummary, summarize_posterior,
};
pub use priors::{InverseGammaPrior, MediationPriorConfig, log_inverse_gamma_density};
pub use residuals::Residuals;
pub use sampler::{
    DEFAULT_INCLUSION_PROBABILITY, MediationSampler, draw_initial_variances, fit_mediation_input,
    fit_mediation_input_with_config, fit_mediation_input_with_posterior,
    fit_mediation_input_with_sink,
};
pub use state::{ChainState, ColumnNorms, VarianceState};
pub use types::{
    InitialValues, MediationError, MediationFitOptions, MediationModel, MediationProposalTuning,
    MediationReport, MediationSamplerConfig, MediationSamplerDiagnostics,
};
