//! Residual caches kept in lock-step with the coefficient draws.
//!
//! Between any two Gibbs sub-steps the caches satisfy
//!
//! ```text
//! outcome        = Y - beta_a * A - M * beta_m - C1 * beta_c
//! mediator       = M - A * alpha_a' - C2 * alpha_c
//! covariate_only = M - C2 * alpha_c
//! ```
//!
//! They are built from scratch once, when the sampler is constructed. Every
//! later coefficient change applies `residual += (old - new) * column` through
//! one of the `shift_*` methods.

use faer::Mat;

use super::state::ChainState;
use crate::input::MediationInput;
use crate::models::matrix_ops::{axpy_column, vec_to_column, vec_to_row};
use crate::utils::{max_abs, max_abs_diff};

#[derive(Debug, Clone)]
pub struct Residuals {
    /// `res1`, `n x 1`.
    pub outcome: Mat<f64>,
    /// `res2`, `n x q`.
    pub mediator: Mat<f64>,
    /// `res2_c`, `n x q`: mediator residual with only covariate effects removed.
    pub covariate_only: Mat<f64>,
}

impl Residuals {
    /// Compute all three residuals from the current coefficients.
    #[must_use]
    pub fn initialize(input: &MediationInput, state: &ChainState) -> Self {
        let exposure_fit = &input.exposure * &vec_to_column(&[state.beta_a]);
        let mediator_fit = &input.mediators * &vec_to_column(&state.beta_m);
        let covariate_fit = &input.outcome_covariates * &vec_to_column(&state.beta_c);
        let linear_fit = &(&exposure_fit + &mediator_fit) + &covariate_fit;
        let outcome = &input.outcome - &linear_fit;

        let mediator_covariate_fit = &input.mediator_covariates * &state.alpha_c;
        let covariate_only = &input.mediators - &mediator_covariate_fit;
        let exposure_on_mediators = &input.exposure * &vec_to_row(&state.alpha_a);
        let mediator = &covariate_only - &exposure_on_mediators;

        Self {
            outcome,
            mediator,
            covariate_only,
        }
    }

    /// `res1 += (old - new) * design[:, col]`.
    pub fn shift_outcome(&mut self, design: &Mat<f64>, col: usize, old: f64, new: f64) {
        axpy_column(&mut self.outcome, 0, old - new, design, col);
    }

    /// `res2[:, mediator] += (old - new) * A` after an `alpha_a` update.
    pub fn shift_mediator_exposure(
        &mut self,
        exposure: &Mat<f64>,
        mediator: usize,
        old: f64,
        new: f64,
    ) {
        axpy_column(&mut self.mediator, mediator, old - new, exposure, 0);
    }

    /// Update both `res2` and `res2_c` after an `alpha_c[covariate, mediator]` update.
    pub fn shift_mediator_covariate(
        &mut self,
        covariates: &Mat<f64>,
        covariate: usize,
        mediator: usize,
        old: f64,
        new: f64,
    ) {
        axpy_column(&mut self.mediator, mediator, old - new, covariates, covariate);
        axpy_column(
            &mut self.covariate_only,
            mediator,
            old - new,
            covariates,
            covariate,
        );
    }

    /// Largest relative deviation of the cached residuals from a fresh recomputation.
    ///
    /// Each block's absolute error is scaled by `max(1, max |fresh|)`.
    #[must_use]
    pub fn max_drift(&self, input: &MediationInput, state: &ChainState) -> f64 {
        let fresh = Self::initialize(input, state);
        [
            (&self.outcome, &fresh.outcome),
            (&self.mediator, &fresh.mediator),
            (&self.covariate_only, &fresh.covariate_only),
        ]
        .into_iter()
        .map(|(cached, recomputed)| {
            max_abs_diff(cached, recomputed) / max_abs(recomputed).max(1.0)
        })
        .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mediation::state::VarianceState;
    use crate::models::mediation::types::InitialValues;
    use approx::assert_relative_eq;

    fn variances() -> VarianceState {
        VarianceState {
            mediator_spike: 0.1,
            mediator_slab: 1.0,
            direct_effect: 1.0,
            exposure_spike: 0.1,
            exposure_slab: 1.0,
            outcome_residual: 1.0,
            mediator_residual: 1.0,
        }
    }

    fn input() -> MediationInput {
        MediationInput::new(
            Mat::from_fn(4, 1, |i, _| [1.0, 0.5, -0.9, -0.4][i]),
            Mat::from_fn(4, 1, |i, _| [1.0, 0.0, 1.0, 0.0][i]),
            Mat::from_fn(4, 2, |i, j| if j == 0 { [1.0, 1.0, -1.0, -1.0][i] } else { 0.5 }),
        )
        .with_outcome_covariates(Mat::from_fn(4, 1, |i, _| [0.0, 1.0, 1.0, 2.0][i]))
        .with_mediator_covariates(Mat::from_fn(4, 1, |_, _| 1.0))
    }

    fn state(input: &MediationInput) -> ChainState {
        let mut state = ChainState::new(
            input,
            InitialValues {
                beta_m: vec![0.3, -0.2],
                alpha_a: vec![0.5, 1.5],
                pi_m: vec![0.5, 0.5],
                pi_a: vec![0.5, 0.5],
            },
            variances(),
        )
        .expect("state should build");
        state.beta_a = 0.25;
        state.beta_c[0] = -0.1;
        state.alpha_c[(0, 1)] = 0.7;
        state
    }

    #[test]
    fn initialize_matches_definitions() {
        let input = input();
        let state = state(&input);
        let residuals = Residuals::initialize(&input, &state);

        // row 1: 0.5 - 0.25 * 0 - (0.3 * 1 - 0.2 * 0.5) - (-0.1 * 1)
        assert_relative_eq!(residuals.outcome[(1, 0)], 0.4, epsilon = 1e-12);
        // row 0, mediator 1: 0.5 - 1.0 * 1.5 - 1.0 * 0.7
        assert_relative_eq!(residuals.mediator[(0, 1)], -1.7, epsilon = 1e-12);
        assert_relative_eq!(residuals.covariate_only[(0, 1)], -0.2, epsilon = 1e-12);
        assert_relative_eq!(residuals.covariate_only[(0, 0)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn incremental_shifts_track_recomputation() {
        let input = input();
        let mut state = state(&input);
        let mut residuals = Residuals::initialize(&input, &state);

        let old = state.beta_m[0];
        state.beta_m[0] = -1.25;
        residuals.shift_outcome(&input.mediators, 0, old, state.beta_m[0]);

        let old = state.beta_a;
        state.beta_a = 2.0;
        residuals.shift_outcome(&input.exposure, 0, old, state.beta_a);

        let old = state.alpha_a[1];
        state.alpha_a[1] = -0.75;
        residuals.shift_mediator_exposure(&input.exposure, 1, old, state.alpha_a[1]);

        let old = state.alpha_c[(0, 0)];
        state.alpha_c[(0, 0)] = 0.4;
        residuals.shift_mediator_covariate(&input.mediator_covariates, 0, 0, old, 0.4);

        assert!(residuals.max_drift(&input, &state) < 1e-12);
    }

    #[test]
    fn drift_detects_missing_update() {
        let input = input();
        let mut state = state(&input);
        let residuals = Residuals::initialize(&input, &state);
        state.beta_m[1] += 1.0;
        assert!(residuals.max_drift(&input, &state) > 0.1);
    }
}
