//! Metropolis-within-Gibbs sampler for the change-point posterior.
//!
//! Each chain sweeps the parameter blocks in a fixed order: an integer
//! random walk on tau followed by Gaussian random walks on the four
//! continuous regime parameters. Chains are fully independent (own seed,
//! own generator, no shared mutable state) so the multi-chain runner may
//! execute them in parallel threads or sequentially with identical
//! results.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::inference::{ProposalStats, chain_seed};
use crate::input::SeriesInput;

use super::diagnostics::{DiagnosticsOptions, diagnose};
use super::model::{ChangePointModel, MeanShiftModel, standard_normal};
use super::posterior::{ParameterDraw, PosteriorSamples, pool_chains, summarize_posterior};
use super::types::{
    AcceptanceRates, ChainDiagnostics, ChainReport, ChangePointError, ChangePointFitOptions,
    ChangePointSamplerConfig, MultiChainOptions, MultiChainReport, ProposalTuning,
};

struct ChainCursor {
    draw: ParameterDraw,
    log_posterior: f64,
}

#[derive(Debug, Clone, Copy)]
struct ProposalScales {
    tau_step: usize,
    mu_before: f64,
    mu_after: f64,
    sigma_before: f64,
    sigma_after: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct AcceptanceCounts {
    tau: ProposalStats,
    mu_before: ProposalStats,
    mu_after: ProposalStats,
    sigma_before: ProposalStats,
    sigma_after: ProposalStats,
}

impl AcceptanceCounts {
    fn rates(self) -> AcceptanceRates {
        AcceptanceRates {
            tau: self.tau.rate(),
            mu_before: self.mu_before.rate(),
            mu_after: self.mu_after.rate(),
            sigma_before: self.sigma_before.rate(),
            sigma_after: self.sigma_after.rate(),
        }
    }

    const fn total_accepted(self) -> usize {
        self.tau.accepted
            + self.mu_before.accepted
            + self.mu_after.accepted
            + self.sigma_before.accepted
            + self.sigma_after.accepted
    }
}

struct SamplingResult {
    samples: PosteriorSamples,
    acceptance_rates: AcceptanceRates,
    total_accepted: usize,
}

/// Fit a single chain with default priors and tuning.
///
/// # Errors
///
/// Returns `ChangePointError` if the series or options are invalid, or
/// the chain accepted zero proposals.
pub fn fit_change_point(
    series: &SeriesInput,
    options: ChangePointFitOptions,
) -> Result<(ChainReport, PosteriorSamples), ChangePointError> {
    let config = ChangePointSamplerConfig {
        fit_options: options,
        ..ChangePointSamplerConfig::default()
    };
    fit_change_point_with_config(series, config)
}

/// Fit a single chain with explicit prior and proposal settings.
///
/// # Errors
///
/// Returns `ChangePointError` if the series or configuration is invalid,
/// or the chain accepted zero proposals.
pub fn fit_change_point_with_config(
    series: &SeriesInput,
    config: ChangePointSamplerConfig,
) -> Result<(ChainReport, PosteriorSamples), ChangePointError> {
    config.validate()?;
    let model = ChangePointModel::MeanShift(MeanShiftModel::new(series, config.prior_config));
    let result = simulate_chain(&model, series.std_dev(), config)?;
    if result.total_accepted == 0 {
        return Err(ChangePointError::DegenerateChain { chain: 0 });
    }

    let report = chain_report(&result, config.fit_options);
    Ok((report, result.samples))
}

/// Fit multiple independent chains with default priors, tuning, and
/// diagnostics thresholds.
///
/// # Errors
///
/// Returns `ChangePointError` if inputs or options are invalid, any chain
/// degenerates, or too few draws are retained for diagnostics.
pub fn fit_change_point_multi_chain(
    series: &SeriesInput,
    options: ChangePointFitOptions,
    multi_chain: MultiChainOptions,
) -> Result<(MultiChainReport, Vec<PosteriorSamples>), ChangePointError> {
    let config = ChangePointSamplerConfig {
        fit_options: options,
        ..ChangePointSamplerConfig::default()
    };
    fit_change_point_multi_chain_with_config(
        series,
        config,
        multi_chain,
        DiagnosticsOptions::default(),
    )
}

/// Fit multiple independent chains with explicit configuration.
///
/// Chain `i` runs with seed `base_seed + i * seed_stride` on its own
/// generator; chains share only the read-only model. Results are
/// numerically identical whether chains run in parallel threads or
/// sequentially.
///
/// # Errors
///
/// Returns `ChangePointError` if inputs or options are invalid, any chain
/// degenerates, or too few draws are retained for diagnostics.
pub fn fit_change_point_multi_chain_with_config(
    series: &SeriesInput,
    config: ChangePointSamplerConfig,
    multi_chain: MultiChainOptions,
    diagnostics: DiagnosticsOptions,
) -> Result<(MultiChainReport, Vec<PosteriorSamples>), ChangePointError> {
    config.validate()?;
    multi_chain.validate()?;

    let model = ChangePointModel::MeanShift(MeanShiftModel::new(series, config.prior_config));
    let series_spread = series.std_dev();
    info!(
        chains = multi_chain.chains,
        iterations = config.fit_options.schedule.iterations,
        burn_in = config.fit_options.schedule.burn_in,
        "starting multi-chain change-point sampling"
    );

    let model_ref = &model;
    let mut chain_results: Vec<Option<Result<SamplingResult, ChangePointError>>> =
        (0..multi_chain.chains).map(|_| None).collect();

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(multi_chain.chains);
        for chain_index in 0..multi_chain.chains {
            let mut chain_config = config;
            chain_config.fit_options.seed = chain_seed(
                config.fit_options.seed,
                chain_index,
                multi_chain.seed_stride,
            );
            handles.push((
                chain_index,
                scope.spawn(move || simulate_chain(model_ref, series_spread, chain_config)),
            ));
        }
        for (chain_index, handle) in handles {
            if let Ok(result) = handle.join() {
                chain_results[chain_index] = Some(result);
            }
        }
    });

    let mut chain_reports = Vec::with_capacity(multi_chain.chains);
    let mut chain_posteriors = Vec::with_capacity(multi_chain.chains);
    for (chain_index, slot) in chain_results.iter_mut().enumerate() {
        let result = slot
            .take()
            .ok_or(ChangePointError::DegenerateChain { chain: chain_index })??;
        if result.total_accepted == 0 {
            return Err(ChangePointError::DegenerateChain { chain: chain_index });
        }
        chain_reports.push(chain_report(&result, config.fit_options));
        chain_posteriors.push(result.samples);
    }

    let pooled = pool_chains(&chain_posteriors);
    let pooled_posterior_summary = if pooled.is_empty() {
        None
    } else {
        Some(summarize_posterior(&pooled))
    };
    let convergence = diagnose(&chain_posteriors, diagnostics)?;
    info!(
        converged = convergence.converged,
        max_rhat = convergence.max_rhat(),
        "multi-chain change-point sampling completed"
    );

    Ok((
        MultiChainReport {
            chain_reports,
            pooled_posterior_summary,
            convergence,
        },
        chain_posteriors,
    ))
}

fn chain_report(result: &SamplingResult, options: ChangePointFitOptions) -> ChainReport {
    let posterior_summary = if result.samples.is_empty() {
        None
    } else {
        Some(summarize_posterior(&result.samples))
    };
    ChainReport {
        diagnostics: ChainDiagnostics {
            iterations_completed: options.schedule.iterations,
            retained_draws: result.samples.len(),
            acceptance_rates: Some(result.acceptance_rates),
        },
        posterior_summary,
    }
}

fn simulate_chain(
    model: &ChangePointModel,
    series_spread: f64,
    config: ChangePointSamplerConfig,
) -> Result<SamplingResult, ChangePointError> {
    let options = config.fit_options;
    let tuning = config.proposal_tuning;
    let mut rng = StdRng::seed_from_u64(options.seed);

    let mut cursor = ChainCursor {
        draw: model.prior_sample(&mut rng),
        log_posterior: f64::NEG_INFINITY,
    };
    cursor.log_posterior = model.log_posterior(&cursor.draw);

    let mut scales = initial_proposal_scales(series_spread, tuning);
    let mut counts = AcceptanceCounts::default();
    let mut draws = Vec::with_capacity(options.retained_draws());

    for iter in 0..options.schedule.iterations {
        update_tau_block(model, &mut rng, &mut cursor, &mut counts.tau, scales.tau_step);
        update_continuous_block(
            model,
            &mut rng,
            &mut cursor,
            &mut counts.mu_before,
            scales.mu_before,
            |draw, value| draw.mu_before = value,
            |draw| draw.mu_before,
        );
        update_continuous_block(
            model,
            &mut rng,
            &mut cursor,
            &mut counts.mu_after,
            scales.mu_after,
            |draw, value| draw.mu_after = value,
            |draw| draw.mu_after,
        );
        update_continuous_block(
            model,
            &mut rng,
            &mut cursor,
            &mut counts.sigma_before,
            scales.sigma_before,
            |draw, value| draw.sigma_before = value,
            |draw| draw.sigma_before,
        );
        update_continuous_block(
            model,
            &mut rng,
            &mut cursor,
            &mut counts.sigma_after,
            scales.sigma_after,
            |draw, value| draw.sigma_after = value,
            |draw| draw.sigma_after,
        );

        if options.adapt_during_burn_in
            && iter < options.schedule.burn_in
            && (iter + 1).is_multiple_of(tuning.adaptation_interval)
        {
            adapt_proposal_scales(&mut scales, counts, tuning);
        }

        if options.schedule.retains(iter) {
            draws.push(cursor.draw);
        }
    }

    debug!(
        seed = options.seed,
        tau_acceptance = counts.tau.rate(),
        "chain finished"
    );

    Ok(SamplingResult {
        samples: PosteriorSamples { draws },
        acceptance_rates: counts.rates(),
        total_accepted: counts.total_accepted(),
    })
}

fn initial_proposal_scales(series_spread: f64, tuning: ProposalTuning) -> ProposalScales {
    let spread = series_spread.max(tuning.min_draw_scale);
    ProposalScales {
        tau_step: tuning.tau_step,
        mu_before: (tuning.mu_scale_fraction * spread).max(tuning.min_draw_scale),
        mu_after: (tuning.mu_scale_fraction * spread).max(tuning.min_draw_scale),
        sigma_before: (tuning.sigma_scale_fraction * spread).max(tuning.min_draw_scale),
        sigma_after: (tuning.sigma_scale_fraction * spread).max(tuning.min_draw_scale),
    }
}

/// Integer random walk on tau; moves landing outside the support hit the
/// zero-probability region of the posterior and reject.
fn update_tau_block(
    model: &ChangePointModel,
    rng: &mut StdRng,
    cursor: &mut ChainCursor,
    stats: &mut ProposalStats,
    tau_step: usize,
) {
    let magnitude = rng.random_range(1..=tau_step);
    let forward = rng.random::<bool>();

    let mut proposal = cursor.draw;
    proposal.tau = if forward {
        cursor.draw.tau.saturating_add(magnitude)
    } else {
        cursor.draw.tau.saturating_sub(magnitude)
    };

    let accepted = try_accept(model, rng, cursor, proposal);
    stats.record(accepted);
}

fn update_continuous_block<SetF, GetF>(
    model: &ChangePointModel,
    rng: &mut StdRng,
    cursor: &mut ChainCursor,
    stats: &mut ProposalStats,
    scale: f64,
    set: SetF,
    get: GetF,
) where
    SetF: Fn(&mut ParameterDraw, f64),
    GetF: Fn(&ParameterDraw) -> f64,
{
    let mut proposal = cursor.draw;
    let current = get(&cursor.draw);
    set(&mut proposal, standard_normal(rng).mul_add(scale, current));

    let accepted = try_accept(model, rng, cursor, proposal);
    stats.record(accepted);
}

fn try_accept(
    model: &ChangePointModel,
    rng: &mut StdRng,
    cursor: &mut ChainCursor,
    proposal: ParameterDraw,
) -> bool {
    let proposed_log_posterior = model.log_posterior(&proposal);
    let log_acceptance = proposed_log_posterior - cursor.log_posterior;
    if should_accept(log_acceptance, rng) {
        cursor.draw = proposal;
        cursor.log_posterior = proposed_log_posterior;
        true
    } else {
        false
    }
}

fn should_accept(log_acceptance: f64, rng: &mut StdRng) -> bool {
    log_acceptance >= 0.0 || rng.random::<f64>().ln() < log_acceptance
}

fn adapt_proposal_scales(
    scales: &mut ProposalScales,
    counts: AcceptanceCounts,
    tuning: ProposalTuning,
) {
    scales.tau_step = adapt_tau_step(scales.tau_step, counts.tau.rate(), tuning);
    scales.mu_before = adapt_scalar_scale(scales.mu_before, counts.mu_before.rate(), tuning);
    scales.mu_after = adapt_scalar_scale(scales.mu_after, counts.mu_after.rate(), tuning);
    scales.sigma_before =
        adapt_scalar_scale(scales.sigma_before, counts.sigma_before.rate(), tuning);
    scales.sigma_after = adapt_scalar_scale(scales.sigma_after, counts.sigma_after.rate(), tuning);
}

fn adapt_scalar_scale(scale: f64, acceptance: f64, tuning: ProposalTuning) -> f64 {
    (scale * adaptation_factor(acceptance, tuning)).max(tuning.min_draw_scale)
}

fn adapt_tau_step(step: usize, acceptance: f64, tuning: ProposalTuning) -> usize {
    if acceptance < tuning.acceptance_target_low {
        (step.saturating_sub(1)).max(1)
    } else if acceptance > tuning.acceptance_target_high {
        step.saturating_add(1)
    } else {
        step
    }
}

fn adaptation_factor(acceptance: f64, tuning: ProposalTuning) -> f64 {
    if acceptance < tuning.acceptance_target_low {
        tuning.scale_decrease_factor
    } else if acceptance > tuning.acceptance_target_high {
        tuning.scale_increase_factor
    } else {
        1.0
    }
}
