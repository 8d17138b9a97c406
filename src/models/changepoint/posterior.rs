//! Posterior storage and change-point summaries.
//!
//! Summarization is a pure view over retained draws: re-running it on the
//! same sample set yields identical output, and nothing here mutates the
//! draws.

use chrono::NaiveDate;
use num_traits::ToPrimitive;
use tracing::warn;

use crate::input::{SeriesInput, usize_to_f64};

use super::diagnostics::ConvergenceReport;
use super::types::ChangePointError;

/// A single posterior draw from the change-point parameter space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterDraw {
    /// Change-point location (index into the series).
    pub tau: usize,
    pub mu_before: f64,
    pub mu_after: f64,
    pub sigma_before: f64,
    pub sigma_after: f64,
}

/// Posterior draw collection for one chain (or a pooled run).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PosteriorSamples {
    pub draws: Vec<ParameterDraw>,
}

impl PosteriorSamples {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.draws.len()
    }
}

/// Pool draws from several chains into one sample set, chain order
/// preserved.
#[must_use]
pub fn pool_chains(chains: &[PosteriorSamples]) -> PosteriorSamples {
    let total = chains.iter().map(PosteriorSamples::len).sum();
    let mut draws = Vec::with_capacity(total);
    for chain in chains {
        draws.extend(chain.draws.iter().copied());
    }
    PosteriorSamples { draws }
}

/// Scalar posterior summary statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub q025: f64,
    pub q50: f64,
    pub q975: f64,
}

/// Posterior summary over the regime parameters of a sample set.
#[derive(Debug, Clone, Default)]
pub struct RegimePosteriorSummary {
    /// Most frequent change-point location across the draws.
    pub tau_mode: usize,
    pub mu_before: ParameterSummary,
    pub mu_after: ParameterSummary,
    pub sigma_before: ParameterSummary,
    pub sigma_after: ParameterSummary,
    pub draw_count: usize,
}

/// Compute posterior summaries for all stored parameter blocks.
#[must_use]
pub fn summarize_posterior(samples: &PosteriorSamples) -> RegimePosteriorSummary {
    let draw_count = samples.len();
    if draw_count == 0 {
        return RegimePosteriorSummary::default();
    }

    let collect = |extract: fn(&ParameterDraw) -> f64| -> Vec<f64> {
        samples.draws.iter().map(extract).collect()
    };

    RegimePosteriorSummary {
        tau_mode: posterior_mode(&samples.draws),
        mu_before: summarize_scalar(&collect(|draw| draw.mu_before)),
        mu_after: summarize_scalar(&collect(|draw| draw.mu_after)),
        sigma_before: summarize_scalar(&collect(|draw| draw.sigma_before)),
        sigma_after: summarize_scalar(&collect(|draw| draw.sigma_after)),
        draw_count,
    }
}

/// Most frequent tau across draws; ties break toward the lowest index.
#[must_use]
pub fn posterior_mode(draws: &[ParameterDraw]) -> usize {
    let counts = tau_counts(draws);
    counts
        .iter()
        .enumerate()
        .max_by(|(idx_a, count_a), (idx_b, count_b)| {
            count_a.cmp(count_b).then(idx_b.cmp(idx_a))
        })
        .map_or(0, |(index, _)| index)
}

/// Options controlling change-point summarization.
#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    /// Credible-interval coverage for tau, in (0, 1).
    pub coverage: f64,
    /// Proceed despite a failed convergence report, embedding a caveat in
    /// every produced summary.
    pub allow_unconverged: bool,
    /// Merge high-density tau runs separated by at most this many indices
    /// before declaring distinct modes.
    pub mode_gap_tolerance: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            coverage: 0.95,
            allow_unconverged: false,
            mode_gap_tolerance: 2,
        }
    }
}

/// Human-actionable summary of one detected change point (one posterior
/// mode region).
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePointSummary {
    /// Posterior mode of tau inside this mode region.
    pub tau_index: usize,
    /// Calendar date of the mode.
    pub tau_date: NaiveDate,
    /// Narrowest contiguous date window holding `coverage` of the
    /// region's mass.
    pub tau_credible_interval: (NaiveDate, NaiveDate),
    /// Stated coverage of the credible interval.
    pub coverage: f64,
    /// Regime mean before the break, averaged over draws in this mode
    /// region.
    pub mu_before: f64,
    /// Regime mean after the break, averaged over draws in this mode
    /// region.
    pub mu_after: f64,
    /// Signed percentage change between regime means.
    pub pct_change: f64,
    /// Share of all retained draws falling in this mode region.
    pub posterior_mass: f64,
    /// Templated natural-language rendering of the shift.
    pub impact_statement: String,
    /// Present when summarization was forced past a failed convergence
    /// report.
    pub convergence_caveat: Option<String>,
}

/// Reduce a converged multi-chain sample set to one summary per detected
/// posterior mode of tau.
///
/// Regime-mean policy: `mu_before` / `mu_after` are posterior means over
/// the draws whose tau falls in the reported mode region. For a unimodal
/// posterior the region carries at least the target coverage, so this
/// matches the marginal posterior mean up to the excluded tail mass; when
/// the posterior is multimodal each mode is summarized from its own
/// draws instead of silently collapsing to the global mode.
///
/// # Errors
///
/// Returns `ChangePointError` if coverage is out of range, the draws are
/// empty or inconsistent with the series, or the convergence report
/// failed and `options.allow_unconverged` is not set.
pub fn summarize_change_points(
    chains: &[PosteriorSamples],
    series: &SeriesInput,
    convergence: &ConvergenceReport,
    options: SummaryOptions,
) -> Result<Vec<ChangePointSummary>, ChangePointError> {
    if !(options.coverage > 0.0 && options.coverage < 1.0) {
        return Err(ChangePointError::InvalidCoverage);
    }

    let caveat = convergence_caveat(convergence, options.allow_unconverged)?;
    let pooled = pool_chains(chains);
    if pooled.is_empty() {
        return Err(ChangePointError::EmptyPosterior);
    }

    let regions = mode_regions(&pooled.draws, options.coverage, options.mode_gap_tolerance);
    let total_draws = usize_to_f64(pooled.len());

    let mut summaries = Vec::with_capacity(regions.len());
    for (region_low, region_high) in regions {
        let region_draws: Vec<ParameterDraw> = pooled
            .draws
            .iter()
            .copied()
            .filter(|draw| draw.tau >= region_low && draw.tau <= region_high)
            .collect();
        if region_draws.is_empty() {
            continue;
        }

        let tau_index = posterior_mode(&region_draws);
        let tau_date = date_for(series, tau_index)?;
        let mut taus: Vec<usize> = region_draws.iter().map(|draw| draw.tau).collect();
        taus.sort_unstable();
        let (interval_low, interval_high) = narrowest_window(&taus, options.coverage);
        let interval = (date_for(series, interval_low)?, date_for(series, interval_high)?);

        let mu_before = mean_of(&region_draws, |draw| draw.mu_before);
        let mu_after = mean_of(&region_draws, |draw| draw.mu_after);
        let pct_change = (mu_after - mu_before) / mu_before.abs() * 100.0;

        summaries.push(ChangePointSummary {
            tau_index,
            tau_date,
            tau_credible_interval: interval,
            coverage: options.coverage,
            mu_before,
            mu_after,
            pct_change,
            posterior_mass: usize_to_f64(region_draws.len()) / total_draws,
            impact_statement: impact_statement(tau_date, mu_before, mu_after, pct_change),
            convergence_caveat: caveat.clone(),
        });
    }

    if summaries.len() > 1 {
        warn!(
            modes = summaries.len(),
            "tau posterior is multimodal; reporting every mode region"
        );
    }

    Ok(summaries)
}

fn convergence_caveat(
    convergence: &ConvergenceReport,
    allow_unconverged: bool,
) -> Result<Option<String>, ChangePointError> {
    if convergence.converged {
        return Ok(None);
    }
    if !allow_unconverged {
        if let Some(worst) = convergence
            .parameters
            .iter()
            .filter(|parameter| !parameter.passed)
            .max_by(|a, b| a.rhat.total_cmp(&b.rhat))
        {
            return Err(ChangePointError::NotConverged {
                parameter: worst.name,
                rhat: worst.rhat,
                threshold: convergence.rhat_threshold,
            });
        }
        return Err(ChangePointError::TauModesDisagree);
    }

    let caveat = format!(
        "CAVEAT: summarized despite failed convergence (max rhat {:.4}, threshold {:.4}); \
         treat estimates as unreliable",
        convergence.max_rhat(),
        convergence.rhat_threshold,
    );
    warn!("{caveat}");
    Ok(Some(caveat))
}

/// Contiguous high-density tau regions at the given coverage, most
/// massive first.
fn mode_regions(draws: &[ParameterDraw], coverage: f64, gap_tolerance: usize) -> Vec<(usize, usize)> {
    let counts = tau_counts(draws);
    let total = usize_to_f64(draws.len());

    // Highest-density set: take tau values by descending mass until the
    // coverage target is reached.
    let mut by_count: Vec<(usize, usize)> = counts
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(tau, &count)| (tau, count))
        .collect();
    by_count.sort_by(|(tau_a, count_a), (tau_b, count_b)| {
        count_b.cmp(count_a).then(tau_a.cmp(tau_b))
    });

    let mut included = Vec::new();
    let mut accumulated = 0.0;
    for (tau, count) in by_count {
        included.push(tau);
        accumulated += usize_to_f64(count) / total;
        if accumulated >= coverage {
            break;
        }
    }
    included.sort_unstable();

    let mut regions: Vec<(usize, usize)> = Vec::new();
    for tau in included {
        match regions.last_mut() {
            Some((_, high)) if tau <= *high + gap_tolerance + 1 => *high = tau,
            _ => regions.push((tau, tau)),
        }
    }

    let region_mass = |&(low, high): &(usize, usize)| -> usize {
        counts[low..=high].iter().sum()
    };
    regions.sort_by(|a, b| region_mass(b).cmp(&region_mass(a)).then(a.0.cmp(&b.0)));
    regions
}

/// Narrowest contiguous window over sorted tau draws holding at least the
/// target coverage mass.
pub(crate) fn narrowest_window(sorted_taus: &[usize], coverage: f64) -> (usize, usize) {
    let n = sorted_taus.len();
    let window = (coverage * usize_to_f64(n)).ceil().to_usize().unwrap_or(n).clamp(1, n);

    let mut best = (sorted_taus[0], sorted_taus[n - 1]);
    let mut best_span = usize::MAX;
    for start in 0..=(n - window) {
        let low = sorted_taus[start];
        let high = sorted_taus[start + window - 1];
        if high - low < best_span {
            best_span = high - low;
            best = (low, high);
        }
    }
    best
}

fn tau_counts(draws: &[ParameterDraw]) -> Vec<usize> {
    let max_tau = draws.iter().map(|draw| draw.tau).max().unwrap_or(0);
    let mut counts = vec![0usize; max_tau + 1];
    for draw in draws {
        counts[draw.tau] += 1;
    }
    counts
}

fn mean_of<F>(draws: &[ParameterDraw], extract: F) -> f64
where
    F: Fn(&ParameterDraw) -> f64,
{
    draws.iter().map(extract).sum::<f64>() / usize_to_f64(draws.len())
}

fn date_for(series: &SeriesInput, index: usize) -> Result<NaiveDate, ChangePointError> {
    series.date_at(index).ok_or(ChangePointError::IndexOutOfRange {
        index,
        len: series.len(),
    })
}

fn impact_statement(date: NaiveDate, mu_before: f64, mu_after: f64, pct_change: f64) -> String {
    format!(
        "Following the detected change point near {}, the average value shifted \
         from {mu_before:.2} to {mu_after:.2}, a change of {pct_change:+.1}%.",
        date.format("%B %d, %Y"),
    )
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
pub(crate) fn percentile(sorted_values: &[f64], probability: f64) -> f64 {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::changepoint::diagnostics::{ConvergenceReport, ParameterDiagnostic, TauDiagnostic};

    fn draw(tau: usize, mu_before: f64, mu_after: f64) -> ParameterDraw {
        ParameterDraw {
            tau,
            mu_before,
            mu_after,
            sigma_before: 1.0,
            sigma_after: 1.0,
        }
    }

    fn series(len: u64) -> SeriesInput {
        let start = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let dates = (0..len)
            .map(|offset| start + chrono::Days::new(offset))
            .collect();
        SeriesInput::new((0..len).map(|idx| idx as f64).collect(), dates).unwrap()
    }

    fn passing_report() -> ConvergenceReport {
        ConvergenceReport {
            converged: true,
            rhat_threshold: 1.01,
            parameters: vec![ParameterDiagnostic {
                name: "mu_before",
                rhat: 1.0,
                effective_sample_size: 400.0,
                ess_flagged: false,
                passed: true,
            }],
            tau: TauDiagnostic {
                per_chain_modes: vec![10, 10],
                modes_agree: true,
            },
            chain_count: 2,
            draws_per_chain_used: 4,
        }
    }

    fn failing_report() -> ConvergenceReport {
        ConvergenceReport {
            converged: false,
            rhat_threshold: 1.01,
            parameters: vec![ParameterDiagnostic {
                name: "mu_after",
                rhat: 1.3,
                effective_sample_size: 12.0,
                ess_flagged: true,
                passed: false,
            }],
            tau: TauDiagnostic {
                per_chain_modes: vec![10, 40],
                modes_agree: false,
            },
            chain_count: 2,
            draws_per_chain_used: 4,
        }
    }

    #[test]
    fn summarize_empty_samples_is_default() {
        let summary = summarize_posterior(&PosteriorSamples::default());
        assert_eq!(summary.draw_count, 0);
        assert_eq!(summary.tau_mode, 0);
    }

    #[test]
    fn posterior_mode_breaks_ties_toward_lower_index() {
        let draws = vec![draw(5, 0.0, 0.0), draw(3, 0.0, 0.0), draw(3, 0.0, 0.0), draw(5, 0.0, 0.0)];
        assert_eq!(posterior_mode(&draws), 3);
    }

    #[test]
    fn narrowest_window_prefers_dense_span() {
        // Mass concentrated at 10-12 with an outlier at 40.
        let taus = vec![10, 10, 11, 11, 11, 12, 12, 12, 12, 40];
        let (low, high) = narrowest_window(&taus, 0.9);
        assert_eq!((low, high), (10, 12));
    }

    #[test]
    fn summarize_reports_single_mode() {
        let chains = vec![PosteriorSamples {
            draws: (0..100)
                .map(|idx| draw(if idx % 10 == 0 { 11 } else { 10 }, 1.0, 2.0))
                .collect(),
        }];
        let summaries =
            summarize_change_points(&chains, &series(30), &passing_report(), SummaryOptions::default())
                .unwrap();
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.tau_index, 10);
        assert!((summary.pct_change - 100.0).abs() < 1.0e-9);
        assert!(summary.convergence_caveat.is_none());
        assert!(summary.impact_statement.contains("+100.0%"));
        assert!((summary.posterior_mass - 1.0).abs() < 1.0e-9);
    }

    #[test]
    fn summarize_reports_separated_modes() {
        let mut draws = Vec::new();
        for _ in 0..60 {
            draws.push(draw(10, 1.0, 2.0));
        }
        for _ in 0..40 {
            draws.push(draw(25, 1.0, 3.0));
        }
        let chains = vec![PosteriorSamples { draws }];
        let summaries =
            summarize_change_points(&chains, &series(40), &passing_report(), SummaryOptions::default())
                .unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].tau_index, 10);
        assert_eq!(summaries[1].tau_index, 25);
        assert!(summaries[0].posterior_mass > summaries[1].posterior_mass);
    }

    #[test]
    fn summarize_refuses_unconverged_without_override() {
        let chains = vec![PosteriorSamples {
            draws: vec![draw(10, 1.0, 2.0); 8],
        }];
        let result =
            summarize_change_points(&chains, &series(30), &failing_report(), SummaryOptions::default());
        assert!(matches!(
            result,
            Err(ChangePointError::NotConverged {
                parameter: "mu_after",
                ..
            })
        ));
    }

    #[test]
    fn forced_summary_carries_caveat() {
        let chains = vec![PosteriorSamples {
            draws: vec![draw(10, 1.0, 2.0); 8],
        }];
        let options = SummaryOptions {
            allow_unconverged: true,
            ..SummaryOptions::default()
        };
        let summaries =
            summarize_change_points(&chains, &series(30), &failing_report(), options).unwrap();
        assert!(summaries[0].convergence_caveat.as_deref().unwrap().contains("CAVEAT"));
    }

    #[test]
    fn summarize_is_idempotent() {
        let chains = vec![PosteriorSamples {
            draws: (0..50).map(|idx| draw(10 + idx % 3, 1.0, 2.0)).collect(),
        }];
        let first =
            summarize_change_points(&chains, &series(30), &passing_report(), SummaryOptions::default())
                .unwrap();
        let second =
            summarize_change_points(&chains, &series(30), &passing_report(), SummaryOptions::default())
                .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_out_of_range_coverage() {
        let chains = vec![PosteriorSamples {
            draws: vec![draw(10, 1.0, 2.0); 4],
        }];
        let options = SummaryOptions {
            coverage: 1.0,
            ..SummaryOptions::default()
        };
        let result = summarize_change_points(&chains, &series(30), &passing_report(), options);
        assert!(matches!(result, Err(ChangePointError::InvalidCoverage)));
    }

    #[test]
    fn draws_beyond_series_report_index_error() {
        let chains = vec![PosteriorSamples {
            draws: vec![draw(50, 1.0, 2.0); 8],
        }];
        let result = summarize_change_points(
            &chains,
            &series(30),
            &passing_report(),
            SummaryOptions::default(),
        );
        assert!(matches!(
            result,
            Err(ChangePointError::IndexOutOfRange { index: 50, len: 30 })
        ));
    }

    #[test]
    fn rejects_empty_pool() {
        let result = summarize_change_points(
            &[PosteriorSamples::default()],
            &series(30),
            &passing_report(),
            SummaryOptions::default(),
        );
        assert!(matches!(result, Err(ChangePointError::EmptyPosterior)));
    }

    #[test]
    fn percentile_interpolates() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((percentile(&sorted, 0.5) - 3.0).abs() < 1.0e-12);
        assert!((percentile(&sorted, 0.0) - 1.0).abs() < 1.0e-12);
        assert!((percentile(&sorted, 1.0) - 5.0).abs() < 1.0e-12);
    }
}
