//! # Model inputs
//!
//! Defines the data container for a mediation model: an outcome column,
//! an exposure column, a block of candidate mediators, and two optional
//! covariate blocks (one adjusting the outcome, one adjusting the mediators).
//!
//! # Examples
//!
//! ```
//! use faer::Mat;
//! use mediation_mcmc::MediationInput;
//!
//! let outcome = Mat::from_fn(4, 1, |i, _| if i % 2 == 0 { 1.0 } else { -1.0 });
//! let exposure = Mat::from_fn(4, 1, |i, _| if i < 2 { 1.0 } else { 0.0 });
//! let mediators = Mat::from_fn(4, 3, |i, j| if (i + j) % 2 == 0 { 0.5 } else { -0.5 });
//! let input = MediationInput::new(outcome, exposure, mediators);
//!
//! assert!(input.validate().is_ok());
//! assert_eq!(input.dimensions().mediators, 3);
//! ```
//!
//! ```
//! use faer::Mat;
//! use mediation_mcmc::MediationInput;
//!
//! let outcome = Mat::from_fn(4, 1, |_, _| 1.0);
//! let exposure = Mat::from_fn(3, 1, |_, _| 1.0);
//! let mediators = Mat::from_fn(4, 2, |_, _| 1.0);
//! let input = MediationInput::new(outcome, exposure, mediators);
//!
//! assert!(input.validate().is_err());
//! ```

use faer::Mat;
use thiserror::Error;

use crate::utils::matrix_is_finite;

/// Errors returned when validating mediation inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("outcome must be a single-column matrix")]
    InvalidOutcomeShape,
    #[error("exposure must be a single-column matrix")]
    InvalidExposureShape,
    #[error("{block} rows ({rows}) must match outcome rows ({expected})")]
    RowMismatch {
        block: &'static str,
        rows: usize,
        expected: usize,
    },
    #[error("{block} contains non-finite values")]
    NonFinite { block: &'static str },
    #[error("declared {dimension} ({declared}) does not match supplied data ({found})")]
    DeclaredDimensionMismatch {
        dimension: &'static str,
        declared: usize,
        found: usize,
    },
}

/// Problem dimensions `(n, q, w1, w2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediationDimensions {
    /// Number of observations `n`.
    pub observations: usize,
    /// Number of candidate mediators `q`.
    pub mediators: usize,
    /// Number of outcome covariates `w1`.
    pub outcome_covariates: usize,
    /// Number of mediator covariates `w2`.
    pub mediator_covariates: usize,
}

/// Observed data for a single-exposure, multi-mediator model.
///
/// - `outcome` (`Y`): `n x 1`
/// - `exposure` (`A`): `n x 1`
/// - `mediators` (`M`): `n x q`
/// - `outcome_covariates` (`C1`): `n x w1`
/// - `mediator_covariates` (`C2`): `n x w2`
#[derive(Debug, Clone)]
pub struct MediationInput {
    pub outcome: Mat<f64>,
    pub exposure: Mat<f64>,
    pub mediators: Mat<f64>,
    pub outcome_covariates: Mat<f64>,
    pub mediator_covariates: Mat<f64>,
}

impl MediationInput {
    /// Build an input without covariates.
    #[must_use]
    pub fn new(outcome: Mat<f64>, exposure: Mat<f64>, mediators: Mat<f64>) -> Self {
        let n = outcome.nrows();
        Self {
            outcome,
            exposure,
            mediators,
            outcome_covariates: Mat::zeros(n, 0),
            mediator_covariates: Mat::zeros(n, 0),
        }
    }

    #[must_use]
    pub fn with_outcome_covariates(mut self, outcome_covariates: Mat<f64>) -> Self {
        self.outcome_covariates = outcome_covariates;
        self
    }

    #[must_use]
    pub fn with_mediator_covariates(mut self, mediator_covariates: Mat<f64>) -> Self {
        self.mediator_covariates = mediator_covariates;
        self
    }

    #[must_use]
    pub fn dimensions(&self) -> MediationDimensions {
        MediationDimensions {
            observations: self.outcome.nrows(),
            mediators: self.mediators.ncols(),
            outcome_covariates: self.outcome_covariates.ncols(),
            mediator_covariates: self.mediator_covariates.ncols(),
        }
    }

    /// # Errors
    ///
    /// Returns `InputError` if shapes or values are malformed.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.outcome.ncols() != 1 {
            return Err(InputError::InvalidOutcomeShape);
        }
        if self.exposure.ncols() != 1 {
            return Err(InputError::InvalidExposureShape);
        }

        let expected = self.outcome.nrows();
        for (block, matrix) in self.blocks() {
            if matrix.nrows() != expected {
                return Err(InputError::RowMismatch {
                    block,
                    rows: matrix.nrows(),
                    expected,
                });
            }
        }

        if !matrix_is_finite(&self.outcome) {
            return Err(InputError::NonFinite { block: "outcome" });
        }
        for (block, matrix) in self.blocks() {
            if !matrix_is_finite(matrix) {
                return Err(InputError::NonFinite { block });
            }
        }
        Ok(())
    }

    /// Validate and additionally require the data to match caller-declared dimensions.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if the input is malformed or any dimension differs.
    pub fn validate_against(&self, declared: MediationDimensions) -> Result<(), InputError> {
        self.validate()?;
        let found = self.dimensions();
        let pairs = [
            ("n", declared.observations, found.observations),
            ("q", declared.mediators, found.mediators),
            ("w1", declared.outcome_covariates, found.outcome_covariates),
            ("w2", declared.mediator_covariates, found.mediator_covariates),
        ];
        for (dimension, declared, found) in pairs {
            if declared != found {
                return Err(InputError::DeclaredDimensionMismatch {
                    dimension,
                    declared,
                    found,
                });
            }
        }
        Ok(())
    }

    fn blocks(&self) -> [(&'static str, &Mat<f64>); 4] {
        [
            ("exposure", &self.exposure),
            ("mediators", &self.mediators),
            ("outcome covariates", &self.outcome_covariates),
            ("mediator covariates", &self.mediator_covariates),
        ]
    }
}
