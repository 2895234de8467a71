use faer::Mat;
use mediation_mcmc::{
    LineSink, MediationFitOptions, MediationInput, MediationPosteriorSamples,
    MediationSamplerConfig, fit_mediation_input_with_posterior, standardize_input,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Bernoulli, Distribution, Normal};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut input = build_synthetic_input(300, 10, 2_026)?;
    standardize_input(&mut input, 1.0e-12);

    let config = MediationSamplerConfig {
        fit_options: MediationFitOptions {
            iterations: 4_000,
            burn_in: 1_000,
            thin: 10,
            seed: 2_026,
            residual_check_interval: Some(500),
            ..MediationFitOptions::default()
        },
        ..MediationSamplerConfig::default()
    };

    let (model, report, posterior) = fit_mediation_input_with_posterior(&input, config)?;

    println!(
        "Mediation fit complete: n={}, mediators={}",
        model.dimensions.observations, model.dimensions.mediators
    );
    println!(
        "Sampler: iterations={}, retained draws={}, pi acceptance={:.2}, rejected reflections={}",
        report.diagnostics.iterations_completed,
        report.diagnostics.retained_draws,
        report.diagnostics.inclusion_acceptance_rate,
        report.diagnostics.out_of_range_proposals
    );

    if let Some(summary) = &report.posterior_summary {
        println!("\n  j   P(r1)  P(r3)  indirect mean  95% CrI");
        for (j, indirect) in summary.indirect_effect.iter().enumerate() {
            println!(
                "{j:>3}   {:.2}   {:.2}   {:>12.3}  [{:.3}, {:.3}]",
                summary.mediator_inclusion_rate[j],
                summary.exposure_inclusion_rate[j],
                indirect.mean,
                indirect.q025,
                indirect.q975
            );
        }
        if let Some(beta_a) = summary.beta_a {
            println!(
                "\nbeta_a mean={:.3}, 95% CrI [{:.3}, {:.3}]",
                beta_a.mean, beta_a.q025, beta_a.q975
            );
        }
    }

    write_results(&posterior, model.dimensions.mediators)?;
    Ok(())
}

/// Exposure acts on the outcome through mediators 0 and 1 only.
fn build_synthetic_input(
    n: usize,
    q: usize,
    seed: u64,
) -> Result<MediationInput, Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let treatment = Bernoulli::new(0.5)?;
    let noise = Normal::new(0.0, 1.0)?;
    let alpha: [f64; 2] = [0.8, -0.6];
    let beta = [0.7, 0.9];

    let exposure: Vec<f64> = (0..n)
        .map(|_| if treatment.sample(&mut rng) { 1.0 } else { 0.0 })
        .collect();
    let mut mediators = Mat::zeros(n, q);
    for row in 0..n {
        for col in 0..q {
            let effect = alpha.get(col).copied().unwrap_or(0.0);
            mediators[(row, col)] = effect.mul_add(exposure[row], noise.sample(&mut rng));
        }
    }
    let outcome_noise: Vec<f64> = (0..n).map(|_| noise.sample(&mut rng)).collect();
    let outcome = Mat::from_fn(n, 1, |row, _| {
        let mediated = beta
            .iter()
            .enumerate()
            .map(|(col, b)| b * mediators[(row, col)])
            .sum::<f64>();
        0.3f64.mul_add(exposure[row], mediated) + outcome_noise[row]
    });

    Ok(MediationInput::new(
        outcome,
        Mat::from_fn(n, 1, |row, _| exposure[row]),
        mediators,
    ))
}

fn write_results(
    posterior: &MediationPosteriorSamples,
    mediators: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    use mediation_mcmc::DrawSink;

    let directory = std::env::temp_dir();
    let mut sink = LineSink::append_results(&directory, mediators)?;
    for draw in &posterior.draws {
        sink.record(draw)?;
    }
    sink.flush()?;
    println!(
        "\nAppended {} draws to {}",
        sink.lines_written(),
        directory.join(mediation_mcmc::results_file_name(mediators)).display()
    );
    Ok(())
}
