//! Joint Metropolis-Hastings update of the inclusion probabilities `pi_m` and `pi_a`.
//!
//! Each probability takes a multiplicative log-uniform random-walk step and is
//! reflected back towards `[1/q, 1]`. The pair of vectors is accepted or
//! rejected as a single block.

use rand::RngExt;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};

use super::state::ChainState;
use super::types::MediationError;
use crate::utils::usize_to_f64;

/// Outcome of one joint proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct InclusionProposal {
    pub pi_m: Vec<f64>,
    pub pi_a: Vec<f64>,
    pub log_ratio: f64,
    pub accepted: bool,
}

impl InclusionProposal {
    /// Whether every proposed probability lies in `(0, 1]`.
    #[must_use]
    pub fn in_range(&self) -> bool {
        self.pi_m
            .iter()
            .chain(&self.pi_a)
            .all(|value| *value > 0.0 && *value <= 1.0)
    }
}

/// Random-walk proposal kernel for the inclusion probabilities.
#[derive(Debug, Clone)]
pub struct InclusionKernel {
    noise: Uniform<f64>,
}

impl InclusionKernel {
    /// # Errors
    ///
    /// Returns `MediationError::InvalidProposalTuning` unless `half_width` is positive and finite.
    pub fn new(half_width: f64) -> Result<Self, MediationError> {
        if !(half_width > 0.0 && half_width.is_finite()) {
            return Err(MediationError::InvalidProposalTuning);
        }
        let noise = Uniform::new(-half_width, half_width)
            .map_err(|_| MediationError::InvalidProposalTuning)?;
        Ok(Self { noise })
    }

    /// `reflect(pi[j] * exp(noise[j]))` for every `j`, consuming one uniform per entry.
    pub fn propose(&self, rng: &mut StdRng, current: &[f64]) -> Vec<f64> {
        let mediators = current.len();
        current
            .iter()
            .map(|value| reflect_probability(value * self.noise.sample(rng).exp(), mediators))
            .collect()
    }

    /// Propose new `(pi_m, pi_a)`, then accept or reject both together.
    ///
    /// Draw order: `q` noises for `pi_m`, `q` for `pi_a`, one acceptance uniform.
    pub fn step(&self, rng: &mut StdRng, state: &mut ChainState) -> InclusionProposal {
        let pi_m = self.propose(rng, &state.pi_m);
        let pi_a = self.propose(rng, &state.pi_a);
        let log_ratio = (bernoulli_log_likelihood(&pi_a, &state.r3)
            - bernoulli_log_likelihood(&state.pi_a, &state.r3))
            + (bernoulli_log_likelihood(&pi_m, &state.r1)
                - bernoulli_log_likelihood(&state.pi_m, &state.r1));
        let uniform = rng.random::<f64>();
        let accepted = accepts(log_ratio, uniform);

        tracing::trace!(log_ratio, uniform, accepted, "inclusion probability proposal");

        if accepted {
            state.pi_m.clone_from(&pi_m);
            state.pi_a.clone_from(&pi_a);
        }
        InclusionProposal {
            pi_m,
            pi_a,
            log_ratio,
            accepted,
        }
    }
}

/// Reflect a proposed probability: values above `1` map to `1/x`, values
/// below `1/q` map to `1/(q^2 x)`. Negative inputs are first folded to `|x|`.
///
/// A single reflection is applied; callers must reject results left outside `(0, 1]`.
#[must_use]
pub fn reflect_probability(value: f64, mediators: usize) -> f64 {
    let q = usize_to_f64(mediators);
    let mut reflected = value.abs();
    if reflected > 1.0 {
        reflected = 1.0 / reflected;
    }
    if mediators > 0 && reflected < 1.0 / q {
        reflected = 1.0 / (q * q * reflected);
    }
    reflected
}

/// `sum_j r[j] ln(pi[j]) + (1 - r[j]) ln(1 - pi[j])`.
///
/// Returns `-inf` if any probability lies outside `(0, 1]` or the data are
/// impossible (`pi[j] == 1` with `r[j] == 0`).
#[must_use]
pub fn bernoulli_log_likelihood(probabilities: &[f64], indicators: &[bool]) -> f64 {
    debug_assert_eq!(probabilities.len(), indicators.len());
    let mut total = 0.0;
    for (&probability, &included) in probabilities.iter().zip(indicators) {
        if !(probability > 0.0 && probability <= 1.0) {
            return f64::NEG_INFINITY;
        }
        total += if included {
            probability.ln()
        } else {
            (-probability).ln_1p()
        };
    }
    total
}

/// Metropolis-Hastings acceptance test `ln(u) < log_ratio`. A NaN ratio is rejected.
#[must_use]
pub fn accepts(log_ratio: f64, uniform: f64) -> bool {
    uniform.ln() < log_ratio
}
