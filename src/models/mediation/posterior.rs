//! Posterior storage and summaries for the mediation model.

use num_traits::ToPrimitive;

use super::output::{DrawSink, MediationDraw};
use super::types::MediationError;
use crate::utils::usize_to_f64;

/// Posterior draw collection.
#[derive(Debug, Clone, Default)]
pub struct MediationPosteriorSamples {
    pub draws: Vec<MediationDraw>,
}

impl MediationPosteriorSamples {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            draws: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.draws.len()
    }
}

impl DrawSink for MediationPosteriorSamples {
    fn record(&mut self, draw: &MediationDraw) -> Result<(), MediationError> {
        self.draws.push(draw.clone());
        Ok(())
    }
}

/// Scalar posterior summary statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParameterSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub q025: f64,
    pub q50: f64,
    pub q975: f64,
}

/// Posterior summary for every retained parameter block.
#[derive(Debug, Clone, Default)]
pub struct MediationPosteriorSummary {
    pub beta_m: Vec<ParameterSummary>,
    pub alpha_a: Vec<ParameterSummary>,
    pub pi_m: Vec<ParameterSummary>,
    pub pi_a: Vec<ParameterSummary>,
    /// `alpha_a[j] * beta_m[j]` per mediator.
    pub indirect_effect: Vec<ParameterSummary>,
    pub beta_a: Option<ParameterSummary>,
    /// Share of draws with `r1[j]` set.
    pub mediator_inclusion_rate: Vec<f64>,
    /// Share of draws with `r3[j]` set.
    pub exposure_inclusion_rate: Vec<f64>,
    pub draw_count: usize,
}

/// Compute posterior summaries for all stored parameter blocks.
#[must_use]
pub fn summarize_posterior(samples: &MediationPosteriorSamples) -> MediationPosteriorSummary {
    let draw_count = samples.len();
    if draw_count == 0 {
        return MediationPosteriorSummary {
            draw_count,
            ..MediationPosteriorSummary::default()
        };
    }

    let mediators = samples.draws.first().map_or(0, |draw| draw.beta_m.len());
    let per_mediator = |extract: fn(&MediationDraw, usize) -> f64| -> Vec<ParameterSummary> {
        (0..mediators)
            .map(|j| {
                let values: Vec<f64> = samples.draws.iter().map(|draw| extract(draw, j)).collect();
                summarize_scalar(&values)
            })
            .collect()
    };
    let inclusion_rate = |extract: fn(&MediationDraw, usize) -> bool| -> Vec<f64> {
        (0..mediators)
            .map(|j| {
                let included = samples.draws.iter().filter(|draw| extract(draw, j)).count();
                usize_to_f64(included) / usize_to_f64(draw_count)
            })
            .collect()
    };

    let beta_a_values: Vec<f64> = samples.draws.iter().map(|draw| draw.beta_a).collect();

    MediationPosteriorSummary {
        beta_m: per_mediator(|draw, j| draw.beta_m[j]),
        alpha_a: per_mediator(|draw, j| draw.alpha_a[j]),
        pi_m: per_mediator(|draw, j| draw.pi_m[j]),
        pi_a: per_mediator(|draw, j| draw.pi_a[j]),
        indirect_effect: per_mediator(|draw, j| draw.alpha_a[j] * draw.beta_m[j]),
        beta_a: Some(summarize_scalar(&beta_a_values)),
        mediator_inclusion_rate: inclusion_rate(|draw, j| draw.mediator_included[j]),
        exposure_inclusion_rate: inclusion_rate(|draw, j| draw.exposure_included[j]),
        draw_count,
    }
}

#[must_use]
fn summarize_scalar(values: &[f64]) -> ParameterSummary {
    if values.is_empty() {
        return ParameterSummary::default();
    }

    let n = usize_to_f64(values.len());
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|value| {
            let centered = value - mean;
            centered * centered
        })
        .sum::<f64>()
        / n.max(1.0);

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    ParameterSummary {
        mean,
        std_dev: variance.sqrt(),
        q025: percentile(&sorted, 0.025),
        q50: percentile(&sorted, 0.5),
        q975: percentile(&sorted, 0.975),
    }
}

#[must_use]
fn percentile(sorted_values: &[f64], probability: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }

    let clamped = probability.clamp(0.0, 1.0);
    let last = sorted_values.len() - 1;
    let position = clamped * usize_to_f64(last);
    let lower = position.floor().to_usize().unwrap_or(0);
    let upper = position.ceil().to_usize().unwrap_or(last);

    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = position - usize_to_f64(lower);
        (1.0 - weight).mul_add(sorted_values[lower], weight * sorted_values[upper])
    }
}
