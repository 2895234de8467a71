//! Core public types for the mediation module.

use thiserror::Error;

use super::posterior::MediationPosteriorSummary;
use super::priors::MediationPriorConfig;
use crate::inference::{InferenceError, McmcConfig};
use crate::input::{InputError, MediationDimensions};

/// Errors returned by mediation configuration, validation, and sampling.
#[derive(Debug, Error)]
pub enum MediationError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),
    #[error(transparent)]
    InvalidSchedule(#[from] InferenceError),
    #[error("invalid mediation prior configuration")]
    InvalidPriorConfig,
    #[error("invalid inclusion-probability proposal tuning")]
    InvalidProposalTuning,
    #[error("residual check interval must be positive and tolerance must be positive and finite")]
    InvalidResidualCheck,
    #[error("initial {parameter} has length {found}; expected {expected}")]
    InitialValueLength {
        parameter: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("initial {parameter}[{index}] = {value} must lie strictly inside (0, 1)")]
    InvalidInitialProbability {
        parameter: &'static str,
        index: usize,
        value: f64,
    },
    #[error("initial {parameter} contains non-finite values")]
    NonFiniteInitialValue { parameter: &'static str },
    #[error("{block} column {column} has zero squared norm")]
    DegenerateColumn { block: &'static str, column: usize },
    #[error("conditional draw for {parameter} received invalid parameters (mean {mean}, scale {scale})")]
    NumericalDomain {
        parameter: &'static str,
        mean: f64,
        scale: f64,
    },
    #[error("incremental residuals drifted by {drift:e} (tolerance {tolerance:e}) at iteration {iteration}")]
    ResidualDrift {
        iteration: usize,
        drift: f64,
        tolerance: f64,
    },
    #[error("failed to write posterior draw")]
    Output(#[from] std::io::Error),
}

/// Sampler schedule and run-time checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediationFitOptions {
    /// Total MCMC iterations.
    pub iterations: usize,
    /// Burn-in iterations discarded before retention.
    pub burn_in: usize,
    /// Keep every `thin`-th draw after burn-in.
    pub thin: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
    /// Emit a `debug` progress event every `progress_interval` iterations (`0` disables).
    pub progress_interval: usize,
    /// Recompute residuals from scratch every this many iterations and fail on drift.
    pub residual_check_interval: Option<usize>,
    /// Relative tolerance for the residual drift check.
    pub residual_tolerance: f64,
}

impl Default for MediationFitOptions {
    fn default() -> Self {
        Self {
            iterations: 20_000,
            burn_in: 5_000,
            thin: 10,
            seed: 42,
            progress_interval: 1_000,
            residual_check_interval: None,
            residual_tolerance: 1.0e-9,
        }
    }
}

impl MediationFitOptions {
    #[must_use]
    pub const fn schedule(self) -> McmcConfig {
        McmcConfig {
            iterations: self.iterations,
            burn_in: self.burn_in,
            thin: self.thin,
            seed: self.seed,
        }
    }

    /// # Errors
    ///
    /// Returns `MediationError` if options are internally inconsistent.
    pub fn validate(self) -> Result<(), MediationError> {
        self.schedule().validate()?;
        if self.residual_check_interval == Some(0)
            || !(self.residual_tolerance > 0.0 && self.residual_tolerance.is_finite())
        {
            return Err(MediationError::InvalidResidualCheck);
        }
        Ok(())
    }

    /// Number of retained draws implied by `(iterations, burn_in, thin)`.
    #[must_use]
    pub const fn retained_draws(self) -> usize {
        self.schedule().retained_draws()
    }
}

/// Random-walk settings for the inclusion-probability Metropolis-Hastings step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediationProposalTuning {
    /// Log-scale noise is drawn from `Uniform(-w, w)` for each mediator.
    pub log_noise_half_width: f64,
}

impl Default for MediationProposalTuning {
    fn default() -> Self {
        Self {
            log_noise_half_width: 0.01,
        }
    }
}

impl MediationProposalTuning {
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.log_noise_half_width > 0.0 && self.log_noise_half_width.is_finite()
    }
}

/// Full sampler configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MediationSamplerConfig {
    pub fit_options: MediationFitOptions,
    pub prior_config: MediationPriorConfig,
    pub proposal_tuning: MediationProposalTuning,
    /// When set, the input must match these dimensions exactly.
    pub declared_dimensions: Option<MediationDimensions>,
}

impl MediationSamplerConfig {
    /// # Errors
    ///
    /// Returns `MediationError` if any configuration block is invalid.
    pub fn validate(self) -> Result<(), MediationError> {
        self.fit_options.validate()?;
        if !self.prior_config.is_valid() {
            return Err(MediationError::InvalidPriorConfig);
        }
        if !self.proposal_tuning.is_valid() {
            return Err(MediationError::InvalidProposalTuning);
        }
        Ok(())
    }
}

/// Starting values for the per-mediator parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialValues {
    pub beta_m: Vec<f64>,
    pub alpha_a: Vec<f64>,
    pub pi_m: Vec<f64>,
    pub pi_a: Vec<f64>,
}

impl InitialValues {
    /// Zero effects and a common inclusion probability for every mediator.
    #[must_use]
    pub fn neutral(mediators: usize, inclusion_probability: f64) -> Self {
        Self {
            beta_m: vec![0.0; mediators],
            alpha_a: vec![0.0; mediators],
            pi_m: vec![inclusion_probability; mediators],
            pi_a: vec![inclusion_probability; mediators],
        }
    }

    /// # Errors
    ///
    /// Returns `MediationError` if any vector has the wrong length, an effect is
    /// non-finite, or a probability lies outside `(0, 1)`.
    pub fn validate(&self, mediators: usize) -> Result<(), MediationError> {
        let blocks = [
            ("beta_m", &self.beta_m),
            ("alpha_a", &self.alpha_a),
            ("pi_m", &self.pi_m),
            ("pi_a", &self.pi_a),
        ];
        for (parameter, values) in blocks {
            if values.len() != mediators {
                return Err(MediationError::InitialValueLength {
                    parameter,
                    expected: mediators,
                    found: values.len(),
                });
            }
        }
        for (parameter, values) in [("beta_m", &self.beta_m), ("alpha_a", &self.alpha_a)] {
            if values.iter().any(|value| !value.is_finite()) {
                return Err(MediationError::NonFiniteInitialValue { parameter });
            }
        }
        for (parameter, values) in [("pi_m", &self.pi_m), ("pi_a", &self.pi_a)] {
            if let Some((index, &value)) = values
                .iter()
                .enumerate()
                .find(|(_, value)| !(**value > 0.0 && **value < 1.0))
            {
                return Err(MediationError::InvalidInitialProbability {
                    parameter,
                    index,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Fitted mediation model metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediationModel {
    pub dimensions: MediationDimensions,
}

/// Sampler diagnostics summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediationSamplerDiagnostics {
    pub iterations_completed: usize,
    pub retained_draws: usize,
    /// Acceptance rate of the joint `(pi_m, pi_a)` Metropolis-Hastings step.
    pub inclusion_acceptance_rate: f64,
    /// Proposals rejected because reflection left a probability outside `(0, 1]`.
    pub out_of_range_proposals: usize,
    /// Largest relative residual drift observed by periodic checks, if any ran.
    pub max_residual_drift: Option<f64>,
    /// Log prior density of the variance components at the final state.
    pub final_log_variance_prior: f64,
}

/// Output report from mediation fitting.
#[derive(Debug, Clone, Default)]
pub struct MediationReport {
    pub diagnostics: MediationSamplerDiagnostics,
    pub posterior_summary: Option<MediationPosteriorSummary>,
}
