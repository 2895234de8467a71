//! Prior specifications and log-density helpers for the mediation model.

use statrs::function::gamma::ln_gamma;

/// Inverse-gamma prior `IG(shape, rate)` on a variance, i.e. `1 / sigma ~ Gamma(shape, rate)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseGammaPrior {
    pub shape: f64,
    pub rate: f64,
}

impl InverseGammaPrior {
    #[must_use]
    pub const fn new(shape: f64, rate: f64) -> Self {
        Self { shape, rate }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.shape > 0.0 && self.rate > 0.0 && self.shape.is_finite() && self.rate.is_finite()
    }

    /// Conjugate update after observing `count` zero-mean normal values with
    /// the given sum of squares: shape `+ count / 2`, rate `+ sum_sq / 2`.
    ///
    /// With `count == 0` and `sum_sq == 0` this returns the prior unchanged.
    #[must_use]
    pub fn posterior(self, count: f64, sum_sq: f64) -> Self {
        Self {
            shape: 0.5f64.mul_add(count, self.shape),
            rate: 0.5f64.mul_add(sum_sq, self.rate),
        }
    }

    /// Log-density of this prior at `value`.
    #[must_use]
    pub fn log_density(self, value: f64) -> f64 {
        log_inverse_gamma_density(value, self.shape, self.rate)
    }
}

/// Hyperparameters for the seven variance components.
///
/// Defaults: every shape is `2.0`; rates are `0.1` (mediator spike), `0.5`
/// (mediator slab), `1.0` (direct effect), `1.0` (exposure spike), `2.0`
/// (exposure slab), `1.0` (outcome residual), `1.0` (mediator residual).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediationPriorConfig {
    /// Spike variance of mediator-to-outcome effects (`sigma_m0`).
    pub mediator_spike: InverseGammaPrior,
    /// Slab variance of mediator-to-outcome effects (`sigma_m1`).
    pub mediator_slab: InverseGammaPrior,
    /// Prior variance of the direct exposure effect (`sigma_a`).
    pub direct_effect: InverseGammaPrior,
    /// Spike variance of exposure-to-mediator effects (`sigma_ma0`).
    pub exposure_spike: InverseGammaPrior,
    /// Slab variance of exposure-to-mediator effects (`sigma_ma1`).
    pub exposure_slab: InverseGammaPrior,
    /// Outcome residual variance (`sigma_e`).
    pub outcome_residual: InverseGammaPrior,
    /// Mediator residual variance (`sigma_g`).
    pub mediator_residual: InverseGammaPrior,
}

impl Default for MediationPriorConfig {
    fn default() -> Self {
        Self {
            mediator_spike: InverseGammaPrior::new(2.0, 0.1),
            mediator_slab: InverseGammaPrior::new(2.0, 0.5),
            direct_effect: InverseGammaPrior::new(2.0, 1.0),
            exposure_spike: InverseGammaPrior::new(2.0, 1.0),
            exposure_slab: InverseGammaPrior::new(2.0, 2.0),
            outcome_residual: InverseGammaPrior::new(2.0, 1.0),
            mediator_residual: InverseGammaPrior::new(2.0, 1.0),
        }
    }
}

impl MediationPriorConfig {
    /// Whether all prior hyperparameters are numerically valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        [
            self.mediator_spike,
            self.mediator_slab,
            self.direct_effect,
            self.exposure_spike,
            self.exposure_slab,
            self.outcome_residual,
            self.mediator_residual,
        ]
        .into_iter()
        .all(InverseGammaPrior::is_valid)
    }
}

/// Log-density for an inverse-gamma distribution with the given shape and rate.
#[must_use]
pub fn log_inverse_gamma_density(value: f64, shape: f64, rate: f64) -> f64 {
    if !(value > 0.0 && shape > 0.0 && rate > 0.0) {
        return f64::NEG_INFINITY;
    }

    shape.mul_add(rate.ln(), -ln_gamma(shape)) - (shape + 1.0).mul_add(value.ln(), rate / value)
}
