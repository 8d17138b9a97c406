use changepoint_models::{
    AnalysisOptions, ChangePointError, ChangePointFitOptions, ChangePointPriorConfig,
    DiagnosticsOptions, McmcSchedule, MeanShiftModel, MultiChainOptions, ParameterDraw,
    PosteriorSamples, SeriesInput, SummaryOptions, diagnose, fit_change_point,
    run_change_point_analysis, summarize_change_points,
};
use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn daily_series(values: Vec<f64>) -> SeriesInput {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let dates = (0..values.len() as u64)
        .map(|offset| start + chrono::Days::new(offset))
        .collect();
    SeriesInput::new(values, dates).unwrap()
}

fn draw_at(tau: usize, mu_before: f64, mu_after: f64) -> ParameterDraw {
    ParameterDraw {
        tau,
        mu_before,
        mu_after,
        sigma_before: 1.0,
        sigma_after: 1.0,
    }
}

/// Two chains stuck in different parts of the parameter space: far-apart
/// means with tiny within-chain wiggle, and disjoint tau modes.
fn divergent_chains() -> Vec<PosteriorSamples> {
    let low = PosteriorSamples {
        draws: (0..40)
            .map(|idx| draw_at(10, (idx % 5) as f64 * 0.01, 1.0))
            .collect(),
    };
    let high = PosteriorSamples {
        draws: (0..40)
            .map(|idx| draw_at(80, 50.0 + (idx % 5) as f64 * 0.01, 51.0))
            .collect(),
    };
    vec![low, high]
}

#[test]
fn rejects_series_below_minimum_length() {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let dates: Vec<NaiveDate> = (0..3).map(|offset| start + chrono::Days::new(offset)).collect();
    let result = SeriesInput::new(vec![1.0, 2.0, 3.0], dates);
    assert!(result.is_err());
}

#[test]
fn pipeline_rejects_single_chain_configuration() {
    let series = daily_series((0..20).map(f64::from).collect());
    let options = AnalysisOptions {
        multi_chain: MultiChainOptions {
            chains: 1,
            seed_stride: 1,
        },
        ..AnalysisOptions::default()
    };
    let result = run_change_point_analysis(&series, &[], options);
    assert!(matches!(
        result,
        Err(ChangePointError::InvalidChainCount { min: 2, found: 1 })
    ));
}

#[test]
fn pipeline_rejects_burn_in_consuming_all_iterations() {
    let series = daily_series((0..20).map(f64::from).collect());
    let options = ChangePointFitOptions {
        schedule: McmcSchedule {
            iterations: 500,
            burn_in: 500,
            thin: 1,
        },
        ..ChangePointFitOptions::default()
    };
    assert!(matches!(
        fit_change_point(&series, options),
        Err(ChangePointError::InvalidSchedule(_))
    ));
}

#[test]
fn unconverged_chains_refuse_summarization_by_default() {
    let chains = divergent_chains();
    let report = diagnose(&chains, DiagnosticsOptions::default()).expect("diagnostics");
    assert!(!report.converged);

    let series = daily_series((0..100).map(f64::from).collect());
    let result =
        summarize_change_points(&chains, &series, &report, SummaryOptions::default());
    assert!(matches!(result, Err(ChangePointError::NotConverged { .. })));
}

#[test]
fn forced_summarization_embeds_caveat_in_every_summary() {
    let chains = divergent_chains();
    let report = diagnose(&chains, DiagnosticsOptions::default()).expect("diagnostics");
    assert!(!report.converged);

    let series = daily_series((0..100).map(f64::from).collect());
    let options = SummaryOptions {
        allow_unconverged: true,
        ..SummaryOptions::default()
    };
    let summaries =
        summarize_change_points(&chains, &series, &report, options).expect("forced summary");
    assert!(!summaries.is_empty());
    for summary in &summaries {
        let caveat = summary.convergence_caveat.as_deref().expect("caveat text");
        assert!(caveat.contains("CAVEAT"));
    }
}

#[test]
fn multimodal_pool_yields_one_summary_per_mode() {
    // Each chain alternates between the two modes in a fixed 7:3 pattern,
    // so split halves are identically composed and mixing checks pass
    // while the tau posterior stays bimodal.
    let mut draws = Vec::new();
    for _ in 0..10 {
        for _ in 0..7 {
            draws.push(draw_at(10, 1.0, 2.0));
        }
        for _ in 0..3 {
            draws.push(draw_at(60, 1.0, 3.0));
        }
    }
    let chains = vec![
        PosteriorSamples {
            draws: draws.clone(),
        },
        PosteriorSamples { draws },
    ];

    let report = diagnose(&chains, DiagnosticsOptions::default()).expect("diagnostics");
    assert!(report.converged, "{report:?}");
    let series = daily_series((0..100).map(f64::from).collect());
    let summaries =
        summarize_change_points(&chains, &series, &report, SummaryOptions::default())
            .expect("summary");
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].tau_index, 10);
    assert_eq!(summaries[1].tau_index, 60);
    assert!(summaries[0].posterior_mass > summaries[1].posterior_mass);
    let total_mass: f64 = summaries.iter().map(|summary| summary.posterior_mass).sum();
    assert!((total_mass - 1.0).abs() < 1.0e-9);
}

#[test]
fn coverage_outside_unit_interval_is_rejected() {
    let chains = vec![
        PosteriorSamples {
            draws: vec![draw_at(10, 1.0, 2.0); 8],
        },
        PosteriorSamples {
            draws: vec![draw_at(10, 1.0, 2.0); 8],
        },
    ];
    let report = diagnose(&chains, DiagnosticsOptions::default()).expect("diagnostics");
    let series = daily_series((0..30).map(f64::from).collect());
    let options = SummaryOptions {
        coverage: 1.2,
        ..SummaryOptions::default()
    };
    let result = summarize_change_points(&chains, &series, &report, options);
    assert!(matches!(result, Err(ChangePointError::InvalidCoverage)));
}

#[test]
fn prior_location_samples_cover_the_support_evenly() {
    let series = daily_series((0..103).map(|idx| f64::from(idx) * 0.5).collect());
    let model = MeanShiftModel::new(&series, ChangePointPriorConfig::default());
    let (low, high) = model.tau_support();
    assert_eq!((low, high), (1, 101));

    let mut rng = StdRng::seed_from_u64(99);
    let mut counts = vec![0usize; high + 1];
    let draws = 50_000;
    for _ in 0..draws {
        let draw = model.prior_sample(&mut rng);
        counts[draw.tau] += 1;
    }

    // Uniform mass over 101 support points is ~495 draws each; allow a
    // generous band around that.
    let expected = draws / (high - low + 1);
    for tau in low..=high {
        let count = counts[tau];
        assert!(
            count > expected / 2 && count < expected * 2,
            "tau {tau} drawn {count} times, expected near {expected}"
        );
    }
}
