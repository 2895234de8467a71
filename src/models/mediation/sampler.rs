//! Sampler entrypoints for Bayesian mediation analysis.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::inference::ProposalStats;
use crate::input::MediationInput;

use super::conditionals::{
    ExposureVariances, SamplerContext, sample_inverse_gamma, update_direct_effect,
    update_effect_variances, update_mediator, update_outcome_covariates,
    update_residual_variances,
};
use super::inclusion::InclusionKernel;
use super::output::{DrawSink, MediationDraw};
use super::posterior::{MediationPosteriorSamples, summarize_posterior};
use super::priors::MediationPriorConfig;
use super::residuals::Residuals;
use super::state::{ChainState, ColumnNorms, VarianceState};
use super::types::{
    InitialValues, MediationError, MediationFitOptions, MediationModel, MediationReport,
    MediationSamplerConfig, MediationSamplerDiagnostics,
};

/// Starting inclusion probability used when no initial values are supplied.
pub const DEFAULT_INCLUSION_PROBABILITY: f64 = 0.5;

#[cfg(debug_assertions)]
const DEBUG_DRIFT_INTERVAL: usize = 25;
#[cfg(debug_assertions)]
const DEBUG_DRIFT_TOLERANCE: f64 = 1.0e-6;

/// Single-chain Gibbs/Metropolis-Hastings sampler over a borrowed input.
#[derive(Debug, Clone)]
pub struct MediationSampler<'a> {
    input: &'a MediationInput,
    priors: MediationPriorConfig,
    norms: ColumnNorms,
    kernel: InclusionKernel,
    state: ChainState,
    residuals: Residuals,
    inclusion_stats: ProposalStats,
    out_of_range_proposals: usize,
    iterations_completed: usize,
}

impl<'a> MediationSampler<'a> {
    /// Validate `input` and `config`, draw the initial variances from their
    /// priors, and build residuals for the starting coefficients.
    ///
    /// `initial` defaults to zero effects with inclusion probability
    /// [`DEFAULT_INCLUSION_PROBABILITY`].
    ///
    /// # Errors
    ///
    /// Returns `MediationError` if the configuration, input, or initial values
    /// are invalid, or a covariate column has zero norm.
    pub fn new(
        input: &'a MediationInput,
        config: &MediationSamplerConfig,
        initial: Option<InitialValues>,
        rng: &mut StdRng,
    ) -> Result<Self, MediationError> {
        config.validate()?;
        input.validate()?;
        if let Some(declared) = config.declared_dimensions {
            input.validate_against(declared)?;
        }
        let mediators = input.dimensions().mediators;
        let initial = initial
            .unwrap_or_else(|| InitialValues::neutral(mediators, DEFAULT_INCLUSION_PROBABILITY));

        let norms = ColumnNorms::compute(input)?;
        let kernel = InclusionKernel::new(config.proposal_tuning.log_noise_half_width)?;
        let variances = draw_initial_variances(rng, &config.prior_config)?;
        let state = ChainState::new(input, initial, variances)?;
        let residuals = Residuals::initialize(input, &state);

        Ok(Self {
            input,
            priors: config.prior_config,
            norms,
            kernel,
            state,
            residuals,
            inclusion_stats: ProposalStats::default(),
            out_of_range_proposals: 0,
            iterations_completed: 0,
        })
    }

    /// Advance the chain by one full sweep.
    ///
    /// Order: `sigma_e` and `sigma_g`; shared exposure variances; each
    /// mediator's block; `beta_c`; `beta_a`; the five effect variances; the
    /// joint `(pi_m, pi_a)` Metropolis-Hastings step.
    ///
    /// # Errors
    ///
    /// Returns `MediationError::NumericalDomain` if a conditional draw receives
    /// invalid parameters. The chain state is then partially updated and
    /// should be discarded.
    pub fn step(&mut self, rng: &mut StdRng) -> Result<(), MediationError> {
        let context = SamplerContext {
            input: self.input,
            norms: &self.norms,
            priors: self.priors,
        };

        update_residual_variances(&context, rng, &mut self.state, &self.residuals)?;
        let exposure_variances =
            ExposureVariances::compute(&self.state.variances, self.norms.exposure);
        for j in 0..self.state.mediators() {
            update_mediator(
                &context,
                rng,
                &mut self.state,
                &mut self.residuals,
                &exposure_variances,
                j,
            )?;
        }
        update_outcome_covariates(&context, rng, &mut self.state, &mut self.residuals)?;
        update_direct_effect(
            &context,
            rng,
            &mut self.state,
            &mut self.residuals,
            &exposure_variances,
        )?;
        update_effect_variances(&context, rng, &mut self.state)?;

        let proposal = self.kernel.step(rng, &mut self.state);
        self.inclusion_stats.record(proposal.accepted);
        if !proposal.in_range() {
            self.out_of_range_proposals += 1;
        }
        self.iterations_completed += 1;
        Ok(())
    }

    /// Run `options.iterations` sweeps, recording retained draws into `sink`.
    ///
    /// # Errors
    ///
    /// Returns `MediationError` if a sweep fails, a periodic residual check
    /// exceeds `options.residual_tolerance`, or the sink cannot be written.
    pub fn run<S: DrawSink + ?Sized>(
        &mut self,
        rng: &mut StdRng,
        options: MediationFitOptions,
        sink: &mut S,
    ) -> Result<MediationSamplerDiagnostics, MediationError> {
        options.validate()?;
        let schedule = options.schedule();
        let mut retained_draws = 0;
        let mut max_residual_drift: Option<f64> = None;

        for iter in 0..options.iterations {
            self.step(rng)?;

            #[cfg(debug_assertions)]
            if iter.is_multiple_of(DEBUG_DRIFT_INTERVAL) {
                debug_assert!(self.residual_drift() < DEBUG_DRIFT_TOLERANCE);
            }

            if let Some(interval) = options.residual_check_interval
                && (iter + 1).is_multiple_of(interval)
            {
                let drift = self.residual_drift();
                max_residual_drift = Some(max_residual_drift.map_or(drift, |seen| seen.max(drift)));
                if drift > options.residual_tolerance {
                    return Err(MediationError::ResidualDrift {
                        iteration: iter,
                        drift,
                        tolerance: options.residual_tolerance,
                    });
                }
            }

            if options.progress_interval > 0 && (iter + 1).is_multiple_of(options.progress_interval)
            {
                let variances = self.state.variances;
                tracing::debug!(
                    iteration = iter + 1,
                    sigma_e = variances.outcome_residual,
                    sigma_g = variances.mediator_residual,
                    sigma_m0 = variances.mediator_spike,
                    sigma_m1 = variances.mediator_slab,
                    sigma_ma0 = variances.exposure_spike,
                    sigma_ma1 = variances.exposure_slab,
                    sigma_a = variances.direct_effect,
                    acceptance_rate = self.inclusion_stats.acceptance_rate(),
                    "mediation sampler progress"
                );
            }

            if schedule.is_retained(iter) {
                sink.record(&MediationDraw::from_state(iter, &self.state))?;
                retained_draws += 1;
            }
        }
        sink.flush()?;

        if self.out_of_range_proposals > 0 {
            tracing::warn!(
                rejected = self.out_of_range_proposals,
                proposed = self.inclusion_stats.proposed,
                "inclusion probability proposals reflected outside (0, 1] were rejected"
            );
        }

        Ok(MediationSamplerDiagnostics {
            iterations_completed: self.iterations_completed,
            retained_draws,
            inclusion_acceptance_rate: self.inclusion_stats.acceptance_rate(),
            out_of_range_proposals: self.out_of_range_proposals,
            max_residual_drift,
            final_log_variance_prior: self.state.variances.log_prior(&self.priors),
        })
    }

    #[must_use]
    pub const fn state(&self) -> &ChainState {
        &self.state
    }

    #[must_use]
    pub const fn residuals(&self) -> &Residuals {
        &self.residuals
    }

    #[must_use]
    pub const fn norms(&self) -> &ColumnNorms {
        &self.norms
    }

    #[must_use]
    pub const fn inclusion_stats(&self) -> ProposalStats {
        self.inclusion_stats
    }

    #[must_use]
    pub const fn out_of_range_proposals(&self) -> usize {
        self.out_of_range_proposals
    }

    #[must_use]
    pub const fn iterations_completed(&self) -> usize {
        self.iterations_completed
    }

    /// Relative deviation of the cached residuals from a from-scratch recomputation.
    #[must_use]
    pub fn residual_drift(&self) -> f64 {
        self.residuals.max_drift(self.input, &self.state)
    }
}

/// Draw starting variances from their priors in the order
/// `sigma_m0, sigma_m1, sigma_a, sigma_ma0, sigma_ma1, sigma_g, sigma_e`.
///
/// # Errors
///
/// Returns `MediationError::NumericalDomain` if a prior cannot be sampled.
pub fn draw_initial_variances(
    rng: &mut StdRng,
    priors: &MediationPriorConfig,
) -> Result<VarianceState, MediationError> {
    let mediator_spike = sample_inverse_gamma(rng, priors.mediator_spike, "sigma_m0")?;
    let mediator_slab = sample_inverse_gamma(rng, priors.mediator_slab, "sigma_m1")?;
    let direct_effect = sample_inverse_gamma(rng, priors.direct_effect, "sigma_a")?;
    let exposure_spike = sample_inverse_gamma(rng, priors.exposure_spike, "sigma_ma0")?;
    let exposure_slab = sample_inverse_gamma(rng, priors.exposure_slab, "sigma_ma1")?;
    let mediator_residual = sample_inverse_gamma(rng, priors.mediator_residual, "sigma_g")?;
    let outcome_residual = sample_inverse_gamma(rng, priors.outcome_residual, "sigma_e")?;
    Ok(VarianceState {
        mediator_spike,
        mediator_slab,
        direct_effect,
        exposure_spike,
        exposure_slab,
        outcome_residual,
        mediator_residual,
    })
}

/// Fit the mediation model with default priors and proposal tuning.
///
/// # Errors
///
/// Returns `MediationError` if inputs/options are invalid or sampling fails.
pub fn fit_mediation_input(
    input: &MediationInput,
    options: MediationFitOptions,
) -> Result<(MediationModel, MediationReport), MediationError> {
    let config = MediationSamplerConfig {
        fit_options: options,
        ..MediationSamplerConfig::default()
    };
    let (model, report, _) = fit_mediation_input_with_posterior(input, config)?;
    Ok((model, report))
}

/// Fit the mediation model with explicit prior and proposal configuration.
///
/// # Errors
///
/// Returns `MediationError` if inputs/options are invalid or sampling fails.
pub fn fit_mediation_input_with_config(
    input: &MediationInput,
    config: MediationSamplerConfig,
) -> Result<(MediationModel, MediationReport), MediationError> {
    let (model, report, _) = fit_mediation_input_with_posterior(input, config)?;
    Ok((model, report))
}

/// Fit the mediation model and return the retained draws alongside their summary.
///
/// # Errors
///
/// Returns `MediationError` if inputs/options are invalid or sampling fails.
pub fn fit_mediation_input_with_posterior(
    input: &MediationInput,
    config: MediationSamplerConfig,
) -> Result<(MediationModel, MediationReport, MediationPosteriorSamples), MediationError> {
    let mut samples = MediationPosteriorSamples::with_capacity(config.fit_options.retained_draws());
    let (model, diagnostics) = fit_mediation_input_with_sink(input, config, None, &mut samples)?;
    let report = MediationReport {
        diagnostics,
        posterior_summary: Some(summarize_posterior(&samples)),
    };
    Ok((model, report, samples))
}

/// Fit the mediation model from explicit starting values, streaming retained
/// draws into `sink` instead of keeping them in memory.
///
/// # Errors
///
/// Returns `MediationError` if inputs/options/initial values are invalid,
/// sampling fails, or the sink cannot be written.
pub fn fit_mediation_input_with_sink<S: DrawSink + ?Sized>(
    input: &MediationInput,
    config: MediationSamplerConfig,
    initial: Option<InitialValues>,
    sink: &mut S,
) -> Result<(MediationModel, MediationSamplerDiagnostics), MediationError> {
    let options = config.fit_options;
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut sampler = MediationSampler::new(input, &config, initial, &mut rng)?;
    let dimensions = input.dimensions();

    tracing::info!(
        observations = dimensions.observations,
        mediators = dimensions.mediators,
        outcome_covariates = dimensions.outcome_covariates,
        mediator_covariates = dimensions.mediator_covariates,
        iterations = options.iterations,
        burn_in = options.burn_in,
        thin = options.thin,
        seed = options.seed,
        "starting mediation sampler"
    );

    let diagnostics = sampler.run(&mut rng, options, sink)?;

    tracing::info!(
        retained_draws = diagnostics.retained_draws,
        acceptance_rate = diagnostics.inclusion_acceptance_rate,
        out_of_range_proposals = diagnostics.out_of_range_proposals,
        "mediation sampler finished"
    );

    Ok((MediationModel { dimensions }, diagnostics))
}
