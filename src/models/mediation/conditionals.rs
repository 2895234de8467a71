//! Gibbs conditional draws for coefficients, spike/slab indicators, and
//! variance components.
//!
//! Each coefficient update applies the matching residual delta before
//! returning, so callers never observe stale residuals.

use rand::rngs::StdRng;
use rand_distr::{Bernoulli, Distribution, Gamma, Normal};

use super::priors::{InverseGammaPrior, MediationPriorConfig};
use super::residuals::Residuals;
use super::state::{ChainState, ColumnNorms, VarianceState};
use super::types::MediationError;
use crate::input::MediationInput;
use crate::models::matrix_ops::{partial_residual_dot, sum_of_squares};
use crate::utils::usize_to_f64;

/// Log-odds at or above which inclusion is treated as certain without a draw.
pub const LOG_ODDS_SATURATION: f64 = 300.0;

pub(crate) struct SamplerContext<'a> {
    pub input: &'a MediationInput,
    pub norms: &'a ColumnNorms,
    pub priors: MediationPriorConfig,
}

/// Conditional variances that depend only on `||A||^2`, shared by every mediator in a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureVariances {
    /// `var_alpha_a0`
    pub alpha_spike: f64,
    /// `var_alpha_a1`
    pub alpha_slab: f64,
    /// `var_a`
    pub direct: f64,
}

impl ExposureVariances {
    #[must_use]
    pub fn compute(variances: &VarianceState, exposure_norm: f64) -> Self {
        let sigma_g = variances.mediator_residual;
        let sigma_e = variances.outcome_residual;
        Self {
            alpha_spike: sigma_g / (sigma_g / variances.exposure_spike + exposure_norm),
            alpha_slab: sigma_g / (sigma_g / variances.exposure_slab + exposure_norm),
            direct: sigma_e / (sigma_e / variances.direct_effect + exposure_norm),
        }
    }
}

/// Conditional posterior mean and variance of one coefficient under each mixture component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeSlabMoments {
    pub spike_mean: f64,
    pub spike_variance: f64,
    pub slab_mean: f64,
    pub slab_variance: f64,
}

impl SpikeSlabMoments {
    /// Log posterior odds of the slab component:
    ///
    /// ```text
    /// mu1^2 / (2 v1) - mu0^2 / (2 v0)
    ///   + 0.5 ln(v1 / s1) - 0.5 ln(v0 / s0) + ln(pi / (1 - pi))
    /// ```
    ///
    /// where `s0`, `s1` are the spike and slab prior variances.
    #[must_use]
    pub fn log_odds(
        &self,
        spike_prior_variance: f64,
        slab_prior_variance: f64,
        inclusion_probability: f64,
    ) -> f64 {
        let slab_fit = self.slab_mean * self.slab_mean / (2.0 * self.slab_variance);
        let spike_fit = self.spike_mean * self.spike_mean / (2.0 * self.spike_variance);
        let shrinkage = 0.5 * (self.slab_variance / slab_prior_variance).ln()
            - 0.5 * (self.spike_variance / spike_prior_variance).ln();
        let prior_odds = (inclusion_probability / (1.0 - inclusion_probability)).ln();
        slab_fit - spike_fit + shrinkage + prior_odds
    }
}

/// Stable logistic transform.
#[must_use]
pub fn logistic_stable(value: f64) -> f64 {
    if value >= 0.0 {
        let z = (-value).exp();
        1.0 / (1.0 + z)
    } else {
        let z = value.exp();
        z / (1.0 + z)
    }
}

/// Slab probability implied by `log_odds`, or `None` once saturated.
#[must_use]
pub fn inclusion_probability(log_odds: f64) -> Option<f64> {
    (log_odds < LOG_ODDS_SATURATION).then(|| logistic_stable(log_odds))
}

/// Draw a spike/slab indicator. A saturated log-odds consumes no randomness.
///
/// # Errors
///
/// Returns `MediationError::NumericalDomain` if `log_odds` is NaN.
pub fn sample_indicator(
    rng: &mut StdRng,
    log_odds: f64,
    parameter: &'static str,
) -> Result<bool, MediationError> {
    if log_odds.is_nan() {
        return Err(MediationError::NumericalDomain {
            parameter,
            mean: log_odds,
            scale: 1.0,
        });
    }
    match inclusion_probability(log_odds) {
        None => Ok(true),
        Some(probability) => Bernoulli::new(probability)
            .map(|distribution| distribution.sample(rng))
            .map_err(|_| MediationError::NumericalDomain {
                parameter,
                mean: probability,
                scale: 1.0,
            }),
    }
}

/// Draw `sigma ~ IG(shape, rate)` as the reciprocal of a `Gamma(shape, 1 / rate)` draw.
///
/// # Errors
///
/// Returns `MediationError::NumericalDomain` for invalid hyperparameters or a
/// draw that is not a positive finite variance.
pub fn sample_inverse_gamma(
    rng: &mut StdRng,
    distribution: InverseGammaPrior,
    parameter: &'static str,
) -> Result<f64, MediationError> {
    let domain_error = || MediationError::NumericalDomain {
        parameter,
        mean: distribution.shape,
        scale: distribution.rate,
    };
    if !distribution.is_valid() {
        return Err(domain_error());
    }
    let gamma = Gamma::new(distribution.shape, 1.0 / distribution.rate).map_err(|_| domain_error())?;
    let variance = 1.0 / gamma.sample(rng);
    if variance.is_finite() && variance > 0.0 {
        Ok(variance)
    } else {
        Err(domain_error())
    }
}

/// # Errors
///
/// Returns `MediationError::NumericalDomain` if `mean` is non-finite or
/// `variance` is not positive and finite.
pub fn sample_normal(
    rng: &mut StdRng,
    mean: f64,
    variance: f64,
    parameter: &'static str,
) -> Result<f64, MediationError> {
    let std_dev = variance.sqrt();
    if !(mean.is_finite() && variance > 0.0 && std_dev.is_finite()) {
        return Err(MediationError::NumericalDomain {
            parameter,
            mean,
            scale: variance,
        });
    }
    Normal::new(mean, std_dev)
        .map(|distribution| distribution.sample(rng))
        .map_err(|_| MediationError::NumericalDomain {
            parameter,
            mean,
            scale: variance,
        })
}

/// Draw the slab component, then the spike component, and keep the one
/// selected by `included`. Both draws are always consumed.
///
/// # Errors
///
/// Returns `MediationError::NumericalDomain` if either component is invalid.
pub fn draw_spike_slab(
    rng: &mut StdRng,
    moments: &SpikeSlabMoments,
    included: bool,
    parameter: &'static str,
) -> Result<f64, MediationError> {
    let slab = sample_normal(rng, moments.slab_mean, moments.slab_variance, parameter)?;
    let spike = sample_normal(rng, moments.spike_mean, moments.spike_variance, parameter)?;
    Ok(if included { slab } else { spike })
}

/// Count and sum of squares of the entries whose indicator equals `included`.
#[must_use]
pub fn selected_sum_of_squares(values: &[f64], indicators: &[bool], included: bool) -> (f64, f64) {
    values
        .iter()
        .zip(indicators)
        .filter(|(_, indicator)| **indicator == included)
        .fold((0.0, 0.0), |(count, sum_sq), (value, _)| {
            (count + 1.0, value.mul_add(*value, sum_sq))
        })
}

/// Draw `sigma_e` from `res1` and `sigma_g` from all of `res2`.
pub(crate) fn update_residual_variances(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
    residuals: &Residuals,
) -> Result<(), MediationError> {
    let outcome_count = usize_to_f64(residuals.outcome.nrows());
    let outcome_posterior = context
        .priors
        .outcome_residual
        .posterior(outcome_count, sum_of_squares(&residuals.outcome));
    state.variances.outcome_residual = sample_inverse_gamma(rng, outcome_posterior, "sigma_e")?;

    let mediator_count = usize_to_f64(residuals.mediator.nrows() * residuals.mediator.ncols());
    let mediator_posterior = context
        .priors
        .mediator_residual
        .posterior(mediator_count, sum_of_squares(&residuals.mediator));
    state.variances.mediator_residual = sample_inverse_gamma(rng, mediator_posterior, "sigma_g")?;
    Ok(())
}

/// Spike/slab moments of `beta_m[mediator]` against `res1` with its own contribution added back.
#[must_use]
pub(crate) fn mediator_effect_moments(
    context: &SamplerContext<'_>,
    state: &ChainState,
    residuals: &Residuals,
    mediator: usize,
) -> SpikeSlabMoments {
    let VarianceState {
        mediator_spike,
        mediator_slab,
        outcome_residual,
        ..
    } = state.variances;
    let norm = context.norms.mediators[mediator];
    let score = partial_residual_dot(
        &context.input.mediators,
        mediator,
        &residuals.outcome,
        0,
        state.beta_m[mediator],
    );

    SpikeSlabMoments {
        spike_mean: score / (outcome_residual / mediator_spike + norm),
        spike_variance: 1.0 / (1.0 / mediator_spike + norm / outcome_residual),
        slab_mean: score / (outcome_residual / mediator_slab + norm),
        slab_variance: 1.0 / (1.0 / mediator_slab + norm / outcome_residual),
    }
}

/// Spike/slab moments of `alpha_a[mediator]` against `res2_c`.
#[must_use]
pub(crate) fn exposure_effect_moments(
    context: &SamplerContext<'_>,
    state: &ChainState,
    residuals: &Residuals,
    exposure_variances: &ExposureVariances,
    mediator: usize,
) -> SpikeSlabMoments {
    let sigma_g = state.variances.mediator_residual;
    let score = partial_residual_dot(
        &context.input.exposure,
        0,
        &residuals.covariate_only,
        mediator,
        0.0,
    );

    SpikeSlabMoments {
        spike_mean: score * (exposure_variances.alpha_spike / sigma_g),
        spike_variance: exposure_variances.alpha_spike,
        slab_mean: score * (exposure_variances.alpha_slab / sigma_g),
        slab_variance: exposure_variances.alpha_slab,
    }
}

/// One pass of the per-mediator block for mediator `j`: `beta_m[j]`,
/// `alpha_a[j]`, `r1[j]`, `r3[j]`, then `alpha_c[:, j]`.
pub(crate) fn update_mediator(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
    residuals: &mut Residuals,
    exposure_variances: &ExposureVariances,
    j: usize,
) -> Result<(), MediationError> {
    let input = context.input;
    let outcome_moments = mediator_effect_moments(context, state, residuals, j);
    let exposure_moments =
        exposure_effect_moments(context, state, residuals, exposure_variances, j);

    let old = state.beta_m[j];
    state.beta_m[j] = draw_spike_slab(rng, &outcome_moments, state.r1[j], "beta_m")?;
    residuals.shift_outcome(&input.mediators, j, old, state.beta_m[j]);

    let old = state.alpha_a[j];
    state.alpha_a[j] = draw_spike_slab(rng, &exposure_moments, state.r3[j], "alpha_a")?;
    residuals.shift_mediator_exposure(&input.exposure, j, old, state.alpha_a[j]);

    let variances = state.variances;
    let mediator_log_odds = outcome_moments.log_odds(
        variances.mediator_spike,
        variances.mediator_slab,
        state.pi_m[j],
    );
    state.r1[j] = sample_indicator(rng, mediator_log_odds, "r1")?;

    let exposure_log_odds = exposure_moments.log_odds(
        variances.exposure_spike,
        variances.exposure_slab,
        state.pi_a[j],
    );
    state.r3[j] = sample_indicator(rng, exposure_log_odds, "r3")?;

    for covariate in 0..input.mediator_covariates.ncols() {
        let norm = context.norms.mediator_covariates[covariate];
        let old = state.alpha_c[(covariate, j)];
        let mean = partial_residual_dot(
            &input.mediator_covariates,
            covariate,
            &residuals.mediator,
            j,
            old,
        ) / norm;
        let new = sample_normal(rng, mean, variances.mediator_residual / norm, "alpha_c")?;
        state.alpha_c[(covariate, j)] = new;
        residuals.shift_mediator_covariate(&input.mediator_covariates, covariate, j, old, new);
    }
    Ok(())
}

/// Flat-prior Gibbs draws of each `beta_c[j]` in turn.
pub(crate) fn update_outcome_covariates(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
    residuals: &mut Residuals,
) -> Result<(), MediationError> {
    let covariates = &context.input.outcome_covariates;
    let sigma_e = state.variances.outcome_residual;
    for j in 0..covariates.ncols() {
        let norm = context.norms.outcome_covariates[j];
        let old = state.beta_c[j];
        let mean = partial_residual_dot(covariates, j, &residuals.outcome, 0, old) / norm;
        let new = sample_normal(rng, mean, sigma_e / norm, "beta_c")?;
        state.beta_c[j] = new;
        residuals.shift_outcome(covariates, j, old, new);
    }
    Ok(())
}

pub(crate) fn update_direct_effect(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
    residuals: &mut Residuals,
    exposure_variances: &ExposureVariances,
) -> Result<(), MediationError> {
    let exposure = &context.input.exposure;
    let old = state.beta_a;
    let score = partial_residual_dot(exposure, 0, &residuals.outcome, 0, old);
    let mean = score * (exposure_variances.direct / state.variances.outcome_residual);
    let new = sample_normal(rng, mean, exposure_variances.direct, "beta_a")?;
    state.beta_a = new;
    residuals.shift_outcome(exposure, 0, old, new);
    Ok(())
}

/// Draw `sigma_m1`, `sigma_a`, `sigma_ma1` from slab entries (and `beta_a`),
/// then `sigma_m0`, `sigma_ma0` from spike entries.
pub(crate) fn update_effect_variances(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
) -> Result<(), MediationError> {
    let priors = context.priors;

    let (count, sum_sq) = selected_sum_of_squares(&state.beta_m, &state.r1, true);
    state.variances.mediator_slab =
        sample_inverse_gamma(rng, priors.mediator_slab.posterior(count, sum_sq), "sigma_m1")?;

    let direct_posterior = priors
        .direct_effect
        .posterior(1.0, state.beta_a * state.beta_a);
    state.variances.direct_effect = sample_inverse_gamma(rng, direct_posterior, "sigma_a")?;

    let (count, sum_sq) = selected_sum_of_squares(&state.alpha_a, &state.r3, true);
    state.variances.exposure_slab =
        sample_inverse_gamma(rng, priors.exposure_slab.posterior(count, sum_sq), "sigma_ma1")?;

    let (count, sum_sq) = selected_sum_of_squares(&state.beta_m, &state.r1, false);
    state.variances.mediator_spike =
        sample_inverse_gamma(rng, priors.mediator_spike.posterior(count, sum_sq), "sigma_m0")?;

    let (count, sum_sq) = selected_sum_of_squares(&state.alpha_a, &state.r3, false);
    state.variances.exposure_spike = sample_inverse_gamma(
        rng,
        priors.exposure_spike.posterior(count, sum_sq),
        "sigma_ma0",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{RngExt, SeedableRng};

    fn moments() -> SpikeSlabMoments {
        SpikeSlabMoments {
            spike_mean: 0.1,
            spike_variance: 0.01,
            slab_mean: 1.2,
            slab_variance: 0.5,
        }
    }

    #[test]
    fn log_odds_vanishes_for_identical_components() {
        let symmetric = SpikeSlabMoments {
            spike_mean: 0.4,
            spike_variance: 0.2,
            slab_mean: 0.4,
            slab_variance: 0.2,
        };
        assert_relative_eq!(symmetric.log_odds(1.0, 1.0, 0.5), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn log_odds_matches_closed_form() {
        let m = moments();
        let expected = 1.44 / 1.0 - 0.01 / 0.02 + 0.5 * (0.5f64 / 2.0).ln()
            - 0.5 * (0.01f64 / 0.1).ln()
            + (0.2f64 / 0.8).ln();
        assert_relative_eq!(m.log_odds(0.1, 2.0, 0.2), expected, epsilon = 1e-12);
    }

    #[test]
    fn saturated_log_odds_skips_the_draw() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut reference = StdRng::seed_from_u64(7);
        assert!(inclusion_probability(LOG_ODDS_SATURATION).is_none());
        assert!(sample_indicator(&mut rng, 1.0e4, "r1").expect("saturated draw"));
        assert!(sample_indicator(&mut rng, f64::INFINITY, "r1").expect("infinite odds"));
        assert_eq!(rng.random::<u64>(), reference.random::<u64>());
    }

    #[test]
    fn unsaturated_log_odds_consumes_one_draw() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut reference = StdRng::seed_from_u64(7);
        let _ = sample_indicator(&mut rng, 0.0, "r1").expect("draw");
        assert_ne!(rng.random::<u64>(), reference.random::<u64>());
    }

    #[test]
    fn very_negative_log_odds_never_includes() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert!(!sample_indicator(&mut rng, -1.0e4, "r3").expect("draw"));
        }
    }

    #[test]
    fn nan_log_odds_fails_fast() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            sample_indicator(&mut rng, f64::NAN, "r1"),
            Err(MediationError::NumericalDomain { parameter: "r1", .. })
        ));
    }

    #[test]
    fn logistic_is_bounded_and_symmetric() {
        assert!(logistic_stable(-1_000.0) >= 0.0);
        assert!(logistic_stable(1_000.0) <= 1.0);
        assert_relative_eq!(logistic_stable(2.0) + logistic_stable(-2.0), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn spike_slab_draw_consumes_both_components_either_way() {
        let m = moments();
        let mut included = StdRng::seed_from_u64(11);
        let mut excluded = StdRng::seed_from_u64(11);
        let mut reference = StdRng::seed_from_u64(11);

        let slab = draw_spike_slab(&mut included, &m, true, "beta_m").expect("slab");
        let spike = draw_spike_slab(&mut excluded, &m, false, "beta_m").expect("spike");
        let expected_slab = sample_normal(&mut reference, m.slab_mean, m.slab_variance, "x")
            .expect("reference slab");
        let expected_spike = sample_normal(&mut reference, m.spike_mean, m.spike_variance, "x")
            .expect("reference spike");

        assert_relative_eq!(slab, expected_slab);
        assert_relative_eq!(spike, expected_spike);
        assert_eq!(included.random::<u64>(), excluded.random::<u64>());
    }

    #[test]
    fn normal_rejects_non_positive_variance() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            sample_normal(&mut rng, 0.0, 0.0, "beta_a"),
            Err(MediationError::NumericalDomain { parameter: "beta_a", .. })
        ));
        assert!(sample_normal(&mut rng, f64::NAN, 1.0, "beta_a").is_err());
    }

    #[test]
    fn inverse_gamma_draws_are_positive_with_expected_mean() {
        let mut rng = StdRng::seed_from_u64(5);
        let distribution = InverseGammaPrior::new(6.0, 10.0);
        let draws = (0..20_000)
            .map(|_| sample_inverse_gamma(&mut rng, distribution, "sigma").expect("draw"))
            .collect::<Vec<_>>();
        assert!(draws.iter().all(|value| *value > 0.0));
        let mean = draws.iter().sum::<f64>() / 20_000.0;
        // E[IG(a, b)] = b / (a - 1) = 2
        assert_relative_eq!(mean, 2.0, epsilon = 0.1);
    }

    #[test]
    fn inverse_gamma_rejects_invalid_parameters() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(sample_inverse_gamma(&mut rng, InverseGammaPrior::new(0.0, 1.0), "s").is_err());
        assert!(sample_inverse_gamma(&mut rng, InverseGammaPrior::new(1.0, f64::NAN), "s").is_err());
    }

    #[test]
    fn selected_sum_of_squares_splits_by_indicator() {
        let values = [1.0, 2.0, 3.0];
        let indicators = [true, false, true];
        assert_eq!(selected_sum_of_squares(&values, &indicators, true), (2.0, 10.0));
        assert_eq!(selected_sum_of_squares(&values, &indicators, false), (1.0, 4.0));
        assert_eq!(selected_sum_of_squares(&[], &[], true), (0.0, 0.0));
    }

    #[test]
    fn exposure_variances_follow_precision_form() {
        let variances = VarianceState {
            mediator_spike: 0.1,
            mediator_slab: 1.0,
            direct_effect: 2.0,
            exposure_spike: 0.5,
            exposure_slab: 4.0,
            outcome_residual: 1.0,
            mediator_residual: 2.0,
        };
        let exposure = ExposureVariances::compute(&variances, 3.0);
        // 1 / (1 / sigma_ma0 + ||A||^2 / sigma_g)
        assert_relative_eq!(exposure.alpha_spike, 1.0 / (2.0 + 1.5), epsilon = 1e-12);
        assert_relative_eq!(exposure.alpha_slab, 1.0 / (0.25 + 1.5), epsilon = 1e-12);
        assert_relative_eq!(exposure.direct, 1.0 / (0.5 + 3.0), epsilon = 1e-12);
    }

    #[test]
    fn residuals_stay_exact_after_every_coefficient_update() {
        use crate::models::mediation::types::InitialValues;
        use faer::Mat;

        let n = 24;
        let q = 4;
        let input = MediationInput::new(
            Mat::from_fn(n, 1, |i, _| usize_to_f64((i * 7) % 11) / 5.0 - 1.0),
            Mat::from_fn(n, 1, |i, _| if i % 2 == 0 { 1.0 } else { 0.0 }),
            Mat::from_fn(n, q, |i, j| usize_to_f64((i * (j + 3)) % 5) / 2.0 - 1.0),
        )
        .with_outcome_covariates(Mat::from_fn(n, 2, |i, j| {
            if j == 0 { 1.0 } else { usize_to_f64(i % 4) }
        }))
        .with_mediator_covariates(Mat::from_fn(n, 2, |i, j| {
            if j == 0 { 1.0 } else { usize_to_f64(i % 3) }
        }));
        let norms = ColumnNorms::compute(&input).expect("non-zero columns");
        let context = SamplerContext {
            input: &input,
            norms: &norms,
            priors: MediationPriorConfig::default(),
        };
        let variances = VarianceState {
            mediator_spike: 0.1,
            mediator_slab: 1.0,
            direct_effect: 1.0,
            exposure_spike: 0.1,
            exposure_slab: 1.0,
            outcome_residual: 0.5,
            mediator_residual: 0.5,
        };
        let mut state = ChainState::new(&input, InitialValues::neutral(q, 0.5), variances)
            .expect("state should build");
        let mut residuals = Residuals::initialize(&input, &state);
        let mut rng = StdRng::seed_from_u64(31);

        for _ in 0..50 {
            let exposure_variances = ExposureVariances::compute(&state.variances, norms.exposure);
            for j in 0..q {
                update_mediator(
                    &context,
                    &mut rng,
                    &mut state,
                    &mut residuals,
                    &exposure_variances,
                    j,
                )
                .expect("mediator update");
                assert!(residuals.max_drift(&input, &state) < 1e-9);
            }
            update_outcome_covariates(&context, &mut rng, &mut state, &mut residuals)
                .expect("covariate update");
            assert!(residuals.max_drift(&input, &state) < 1e-9);
            update_direct_effect(
                &context,
                &mut rng,
                &mut state,
                &mut residuals,
                &exposure_variances,
            )
            .expect("direct effect update");
            assert!(residuals.max_drift(&input, &state) < 1e-9);
            update_effect_variances(&context, &mut rng, &mut state).expect("variance update");
        }
    }
}
