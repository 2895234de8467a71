use std::fs;
use std::io::BufRead;

use faer::Mat;
use mediation_mcmc::{
    InitialValues, InputError, LineSink, MediationDimensions, MediationDraw, MediationError,
    MediationFitOptions, MediationInput, MediationSampler, MediationSamplerConfig,
    fit_mediation_input, fit_mediation_input_with_posterior, fit_mediation_input_with_sink,
    results_file_name,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn idx_to_f64(idx: usize) -> f64 {
    f64::from(u32::try_from(idx).unwrap_or(u32::MAX))
}

fn four_row_input() -> MediationInput {
    MediationInput::new(
        Mat::from_fn(4, 1, |row, _| [1.0, 0.5, -0.9, -0.4][row]),
        Mat::from_fn(4, 1, |row, _| [1.0, 0.0, 1.0, 0.0][row]),
        Mat::from_fn(4, 1, |row, _| [1.0, 1.0, -1.0, -1.0][row]),
    )
}

fn sample_input() -> MediationInput {
    let n = 30;
    let exposure = Mat::from_fn(n, 1, |row, _| if row % 3 == 0 { 1.0 } else { 0.0 });
    let mediators = Mat::from_fn(n, 4, |row, col| {
        let wave = idx_to_f64((row * (col + 2)) % 7) / 7.0 - 0.5;
        if col == 0 {
            0.8f64.mul_add(exposure[(row, 0)], wave)
        } else {
            wave
        }
    });
    let outcome = Mat::from_fn(n, 1, |row, _| {
        0.6f64.mul_add(mediators[(row, 0)], 0.3 * exposure[(row, 0)])
            + idx_to_f64(row % 5) / 10.0
    });
    MediationInput::new(outcome, exposure, mediators)
        .with_outcome_covariates(Mat::from_fn(n, 2, |row, col| {
            if col == 0 { 1.0 } else { idx_to_f64(row) / 30.0 }
        }))
        .with_mediator_covariates(Mat::from_fn(n, 1, |_, _| 1.0))
}

fn config(iterations: usize, burn_in: usize, thin: usize, seed: u64) -> MediationSamplerConfig {
    MediationSamplerConfig {
        fit_options: MediationFitOptions {
            iterations,
            burn_in,
            thin,
            seed,
            ..MediationFitOptions::default()
        },
        ..MediationSamplerConfig::default()
    }
}

#[test]
fn mediation_public_workflow_produces_summary() {
    let input = sample_input();
    let (model, report, samples) =
        fit_mediation_input_with_posterior(&input, config(200, 50, 5, 123))
            .expect("fit should succeed");

    assert_eq!(model.dimensions.mediators, 4);
    assert_eq!(model.dimensions.outcome_covariates, 2);
    assert_eq!(samples.len(), report.diagnostics.retained_draws);
    assert_eq!(report.diagnostics.retained_draws, 30);
    assert_eq!(report.diagnostics.iterations_completed, 200);

    let summary = report.posterior_summary.expect("summary should exist");
    assert_eq!(summary.draw_count, 30);
    assert_eq!(summary.beta_m.len(), 4);
    assert_eq!(summary.indirect_effect.len(), 4);
    assert!(summary.beta_a.is_some_and(|beta_a| beta_a.mean.is_finite()));
    for rate in summary
        .mediator_inclusion_rate
        .iter()
        .chain(&summary.exposure_inclusion_rate)
    {
        assert!((0.0..=1.0).contains(rate));
    }
}

#[test]
fn single_iteration_emits_exactly_one_record() {
    let input = four_row_input();
    let config = config(1, 0, 1, 7);
    let mut rng = StdRng::seed_from_u64(config.fit_options.seed);
    let mut sampler =
        MediationSampler::new(&input, &config, None, &mut rng).expect("sampler should build");
    let mut sink = LineSink::new(Vec::new());
    let diagnostics = sampler
        .run(&mut rng, config.fit_options, &mut sink)
        .expect("run should succeed");

    assert_eq!(diagnostics.retained_draws, 1);
    assert_eq!(sampler.iterations_completed(), 1);
    assert!(sampler.residual_drift() < 1e-9);
    assert_eq!(sink.lines_written(), 1);
    let text = String::from_utf8(sink.into_inner()).expect("utf8 output");
    let fields: Vec<f64> = text
        .trim_end()
        .split(' ')
        .map(|field| field.parse().expect("numeric field"))
        .collect();
    assert_eq!(fields.len(), 5);
    assert!(fields.iter().all(|value| value.is_finite()));
    // With one mediator every reflected proposal leaves (0, 1] and is rejected.
    assert_eq!(fields[1], 0.5);
    assert_eq!(fields[3], 0.5);
    assert_eq!(diagnostics.out_of_range_proposals, 1);
}

#[test]
fn same_seed_replays_identical_draws() {
    let input = sample_input();
    let (_, _, first) = fit_mediation_input_with_posterior(&input, config(120, 20, 4, 99))
        .expect("first fit should succeed");
    let (_, _, second) = fit_mediation_input_with_posterior(&input, config(120, 20, 4, 99))
        .expect("second fit should succeed");
    let (_, _, other) = fit_mediation_input_with_posterior(&input, config(120, 20, 4, 100))
        .expect("third fit should succeed");

    assert_eq!(first.draws, second.draws);
    assert_ne!(first.draws, other.draws);

    let render = || {
        let mut sink = LineSink::new(Vec::new());
        fit_mediation_input_with_sink(&input, config(120, 20, 4, 99), None, &mut sink)
            .expect("fit should succeed");
        sink.into_inner()
    };
    let bytes = render();
    assert!(!bytes.is_empty());
    assert_eq!(bytes, render());
}

#[test]
fn caller_supplied_initial_values_are_used() {
    let input = sample_input();
    let initial = InitialValues {
        beta_m: vec![0.5, 0.0, 0.0, 0.0],
        alpha_a: vec![0.8, 0.0, 0.0, 0.0],
        pi_m: vec![0.9, 0.4, 0.4, 0.4],
        pi_a: vec![0.9, 0.4, 0.4, 0.4],
    };
    let mut draws: Vec<MediationDraw> = Vec::new();
    let (_, diagnostics) =
        fit_mediation_input_with_sink(&input, config(40, 0, 1, 5), Some(initial), &mut draws)
            .expect("fit should succeed");
    assert_eq!(draws.len(), diagnostics.retained_draws);

    let bad = InitialValues::neutral(3, 0.5);
    let mut unused: Vec<MediationDraw> = Vec::new();
    assert!(matches!(
        fit_mediation_input_with_sink(&input, config(40, 0, 1, 5), Some(bad), &mut unused),
        Err(MediationError::InitialValueLength { expected: 4, .. })
    ));
}

#[test]
fn zero_mediators_sample_only_direct_effect() {
    let input = MediationInput::new(
        Mat::from_fn(10, 1, |row, _| idx_to_f64(row) / 10.0),
        Mat::from_fn(10, 1, |row, _| if row < 5 { 1.0 } else { 0.0 }),
        Mat::zeros(10, 0),
    );
    let mut sink = LineSink::new(Vec::new());
    let (model, diagnostics) =
        fit_mediation_input_with_sink(&input, config(20, 0, 10, 3), None, &mut sink)
            .expect("fit should succeed");

    assert_eq!(model.dimensions.mediators, 0);
    assert_eq!(diagnostics.retained_draws, 2);
    let text = String::from_utf8(sink.into_inner()).expect("utf8 output");
    for line in text.lines() {
        assert_eq!(line.split(' ').count(), 1);
        assert!(line.parse::<f64>().is_ok_and(f64::is_finite));
    }
}

#[test]
fn declared_dimension_mismatch_is_rejected() {
    let input = sample_input();
    let config = MediationSamplerConfig {
        declared_dimensions: Some(MediationDimensions {
            observations: 30,
            mediators: 5,
            outcome_covariates: 2,
            mediator_covariates: 1,
        }),
        ..config(10, 0, 1, 1)
    };
    let result = fit_mediation_input_with_posterior(&input, config);
    assert!(matches!(
        result,
        Err(MediationError::InvalidInput(
            InputError::DeclaredDimensionMismatch {
                dimension: "q",
                declared: 5,
                found: 4,
            }
        ))
    ));
}

#[test]
fn row_mismatch_and_bad_schedule_are_rejected() {
    let input = MediationInput::new(
        Mat::from_fn(4, 1, |_, _| 1.0),
        Mat::from_fn(3, 1, |_, _| 1.0),
        Mat::from_fn(4, 2, |_, _| 1.0),
    );
    assert!(matches!(
        fit_mediation_input(&input, MediationFitOptions::default()),
        Err(MediationError::InvalidInput(InputError::RowMismatch {
            block: "exposure",
            ..
        }))
    ));

    let options = MediationFitOptions {
        iterations: 10,
        burn_in: 10,
        ..MediationFitOptions::default()
    };
    assert!(matches!(
        fit_mediation_input(&four_row_input(), options),
        Err(MediationError::InvalidSchedule(_))
    ));
}

#[test]
fn results_file_is_appended_across_runs() {
    let directory = std::env::temp_dir().join(format!("mediation_mcmc_{}", std::process::id()));
    fs::create_dir_all(&directory).expect("temp dir");
    let path = directory.join(results_file_name(1));
    let _ = fs::remove_file(&path);

    for seed in [1, 2] {
        let mut sink = LineSink::append_results(&directory, 1).expect("open results file");
        fit_mediation_input_with_sink(&four_row_input(), config(6, 2, 2, seed), None, &mut sink)
            .expect("fit should succeed");
    }

    let file = fs::File::open(&path).expect("results file exists");
    let lines: Vec<String> = std::io::BufReader::new(file)
        .lines()
        .collect::<Result<_, _>>()
        .expect("readable lines");
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|line| line.split(' ').count() == 5));
    fs::remove_dir_all(&directory).expect("cleanup");
}
