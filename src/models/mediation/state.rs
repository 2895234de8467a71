//! Mutable chain state and the cached column norms it is sampled against.

use faer::Mat;

use super::priors::MediationPriorConfig;
use super::types::{InitialValues, MediationError};
use crate::input::MediationInput;
use crate::models::matrix_ops::squared_column_norms;

/// Current draw of the seven variance components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceState {
    /// `sigma_m0`
    pub mediator_spike: f64,
    /// `sigma_m1`
    pub mediator_slab: f64,
    /// `sigma_a`
    pub direct_effect: f64,
    /// `sigma_ma0`
    pub exposure_spike: f64,
    /// `sigma_ma1`
    pub exposure_slab: f64,
    /// `sigma_e`
    pub outcome_residual: f64,
    /// `sigma_g`
    pub mediator_residual: f64,
}

impl VarianceState {
    /// Joint log prior density of all components under `priors`.
    #[must_use]
    pub fn log_prior(&self, priors: &MediationPriorConfig) -> f64 {
        priors.mediator_spike.log_density(self.mediator_spike)
            + priors.mediator_slab.log_density(self.mediator_slab)
            + priors.direct_effect.log_density(self.direct_effect)
            + priors.exposure_spike.log_density(self.exposure_spike)
            + priors.exposure_slab.log_density(self.exposure_slab)
            + priors.outcome_residual.log_density(self.outcome_residual)
            + priors.mediator_residual.log_density(self.mediator_residual)
    }
}

/// Full parameter state of one chain.
#[derive(Debug, Clone)]
pub struct ChainState {
    /// Direct exposure-to-outcome effect.
    pub beta_a: f64,
    /// Mediator-to-outcome effects, length `q`.
    pub beta_m: Vec<f64>,
    /// Exposure-to-mediator effects, length `q`.
    pub alpha_a: Vec<f64>,
    /// Outcome covariate effects, length `w1`.
    pub beta_c: Vec<f64>,
    /// Mediator covariate effects, `w2 x q`.
    pub alpha_c: Mat<f64>,
    /// Slab indicators for `beta_m`.
    pub r1: Vec<bool>,
    /// Slab indicators for `alpha_a`.
    pub r3: Vec<bool>,
    /// Prior inclusion probabilities for `beta_m`.
    pub pi_m: Vec<f64>,
    /// Prior inclusion probabilities for `alpha_a`.
    pub pi_a: Vec<f64>,
    pub variances: VarianceState,
}

impl ChainState {
    /// Start a chain from `initial` with zero covariate effects, all indicators
    /// in the spike, and the given variances.
    ///
    /// # Errors
    ///
    /// Returns `MediationError` if `initial` does not fit `input`.
    pub fn new(
        input: &MediationInput,
        initial: InitialValues,
        variances: VarianceState,
    ) -> Result<Self, MediationError> {
        let dims = input.dimensions();
        initial.validate(dims.mediators)?;
        let InitialValues {
            beta_m,
            alpha_a,
            pi_m,
            pi_a,
        } = initial;

        Ok(Self {
            beta_a: 0.0,
            beta_m,
            alpha_a,
            beta_c: vec![0.0; dims.outcome_covariates],
            alpha_c: Mat::zeros(dims.mediator_covariates, dims.mediators),
            r1: vec![false; dims.mediators],
            r3: vec![false; dims.mediators],
            pi_m,
            pi_a,
            variances,
        })
    }

    #[must_use]
    pub fn mediators(&self) -> usize {
        self.beta_m.len()
    }
}

/// Squared column norms of the immutable design blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnNorms {
    pub exposure: f64,
    pub mediators: Vec<f64>,
    pub outcome_covariates: Vec<f64>,
    pub mediator_covariates: Vec<f64>,
}

impl ColumnNorms {
    /// # Errors
    ///
    /// Returns `MediationError::DegenerateColumn` if a covariate column is all
    /// zeros, since its conditional variance would be unbounded.
    pub fn compute(input: &MediationInput) -> Result<Self, MediationError> {
        let norms = Self {
            exposure: squared_column_norms(&input.exposure)
                .first()
                .copied()
                .unwrap_or(0.0),
            mediators: squared_column_norms(&input.mediators),
            outcome_covariates: squared_column_norms(&input.outcome_covariates),
            mediator_covariates: squared_column_norms(&input.mediator_covariates),
        };

        for (block, values) in [
            ("outcome covariates", &norms.outcome_covariates),
            ("mediator covariates", &norms.mediator_covariates),
        ] {
            if let Some(column) = values.iter().position(|norm| *norm <= 0.0) {
                return Err(MediationError::DegenerateColumn { block, column });
            }
        }
        Ok(norms)
    }
}
