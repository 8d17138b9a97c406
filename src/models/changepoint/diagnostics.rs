//! Multi-chain convergence diagnostics.
//!
//! Split-R-hat covers the continuous regime parameters; the discrete
//! location parameter is assessed by agreement of per-chain posterior
//! modes and credible windows instead, since R-hat is not well-defined
//! for a discrete parameter with narrow support.

use tracing::{debug, warn};

use crate::input::usize_to_f64;

use super::model::CONTINUOUS_PARAMETER_NAMES;
use super::posterior::{ParameterDraw, PosteriorSamples, narrowest_window, posterior_mode};
use super::types::ChangePointError;

/// Options for the convergence gate.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsOptions {
    /// Convergence threshold for split-R-hat (accepted value in this
    /// domain is 1.01).
    pub rhat_threshold: f64,
    /// Effective-sample-size floor below which a parameter is flagged
    /// for excessive serial correlation. Does not fail convergence on
    /// its own.
    pub ess_floor: f64,
    /// Credible-window coverage used for the tau agreement check.
    pub tau_window_coverage: f64,
}

impl Default for DiagnosticsOptions {
    fn default() -> Self {
        Self {
            rhat_threshold: 1.01,
            ess_floor: 100.0,
            tau_window_coverage: 0.95,
        }
    }
}

/// Per-parameter scalar diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct ParameterDiagnostic {
    pub name: &'static str,
    /// Potential scale reduction factor; `INFINITY` when chains disagree
    /// with zero within-chain variance.
    pub rhat: f64,
    /// Sum of per-chain effective sample sizes.
    pub effective_sample_size: f64,
    /// True when the effective sample size fell below the configured
    /// floor. Flags heavy serial correlation without failing convergence.
    pub ess_flagged: bool,
    /// Whether `rhat` is finite and below the threshold.
    pub passed: bool,
}

/// Agreement diagnostics for the discrete location parameter.
#[derive(Debug, Clone, Default)]
pub struct TauDiagnostic {
    /// Posterior mode of tau in each chain.
    pub per_chain_modes: Vec<usize>,
    /// Whether every chain's mode lies inside every other chain's
    /// credible window.
    pub modes_agree: bool,
}

/// Machine-checkable convergence verdict across chains.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceReport {
    /// True only when every monitored parameter passes and tau modes
    /// agree.
    pub converged: bool,
    /// Threshold applied to every split-R-hat value.
    pub rhat_threshold: f64,
    /// Diagnostics for the continuous parameters.
    pub parameters: Vec<ParameterDiagnostic>,
    /// Discrete-location agreement diagnostics.
    pub tau: TauDiagnostic,
    /// Number of chains included.
    pub chain_count: usize,
    /// Draws per chain used after truncation to equal even length.
    pub draws_per_chain_used: usize,
}

impl ConvergenceReport {
    /// Largest split-R-hat across the monitored parameters.
    #[must_use]
    pub fn max_rhat(&self) -> f64 {
        self.parameters
            .iter()
            .map(|parameter| parameter.rhat)
            .fold(f64::NAN, f64::max)
    }
}

/// Lag-`k` autocorrelation for a scalar chain.
#[must_use]
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    if series.is_empty() || lag >= series.len() {
        return 0.0;
    }

    let n = series.len() - lag;
    let mean = series.iter().sum::<f64>() / usize_to_f64(series.len());

    let mut denominator = 0.0;
    for value in series {
        let centered = value - mean;
        denominator += centered * centered;
    }
    if denominator <= 0.0 {
        return 0.0;
    }

    let mut numerator = 0.0;
    for idx in 0..n {
        numerator += (series[idx] - mean) * (series[idx + lag] - mean);
    }
    numerator / denominator
}

/// Heuristic effective sample size using positive autocorrelation
/// truncation.
#[must_use]
pub fn effective_sample_size(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return usize_to_f64(n);
    }

    let mut rho_sum = 0.0;
    for lag in 1..n {
        let rho = autocorrelation(series, lag);
        if rho <= 0.0 {
            break;
        }
        rho_sum += rho;
    }

    usize_to_f64(n) / (2.0f64.mul_add(rho_sum, 1.0)).max(1.0)
}

/// Quantify whether the chains have mixed to the same stationary
/// distribution.
///
/// This implementation:
/// - requires at least two chains,
/// - truncates all chains to the same minimum even draw count,
/// - computes split-R-hat and ESS for every continuous parameter,
/// - checks per-chain tau mode agreement against credible windows.
///
/// Never silently passes: any failing parameter forces
/// `converged: false` with per-parameter detail.
///
/// # Errors
///
/// Returns `ChangePointError` if chain counts or draw lengths are
/// insufficient.
pub fn diagnose(
    chains: &[PosteriorSamples],
    options: DiagnosticsOptions,
) -> Result<ConvergenceReport, ChangePointError> {
    if chains.len() < 2 {
        return Err(ChangePointError::InvalidChainCount {
            min: 2,
            found: chains.len(),
        });
    }

    let min_draws = chains.iter().map(PosteriorSamples::len).min().unwrap_or(0);
    let draws_per_chain_used = min_draws - (min_draws % 2);
    if draws_per_chain_used < 4 {
        return Err(ChangePointError::InsufficientChainDraws {
            minimum: 4,
            found: draws_per_chain_used,
        });
    }

    let extractors: [fn(&ParameterDraw) -> f64; 4] = [
        |draw| draw.mu_before,
        |draw| draw.mu_after,
        |draw| draw.sigma_before,
        |draw| draw.sigma_after,
    ];

    let mut parameters = Vec::with_capacity(CONTINUOUS_PARAMETER_NAMES.len());
    for (name, extract) in CONTINUOUS_PARAMETER_NAMES.iter().zip(extractors) {
        let rhat = split_rhat_from_chains(chains, draws_per_chain_used, extract);
        let ess = chains
            .iter()
            .map(|chain| {
                let values: Vec<f64> = chain
                    .draws
                    .iter()
                    .take(draws_per_chain_used)
                    .map(extract)
                    .collect();
                effective_sample_size(&values)
            })
            .sum::<f64>();
        let passed = rhat.is_finite() && rhat < options.rhat_threshold;
        let ess_flagged = ess < options.ess_floor;
        if ess_flagged {
            warn!(
                parameter = name,
                ess, "effective sample size below floor; chains show heavy serial correlation"
            );
        }
        parameters.push(ParameterDiagnostic {
            name,
            rhat,
            effective_sample_size: ess,
            ess_flagged,
            passed,
        });
    }

    let tau = tau_agreement(chains, draws_per_chain_used, options.tau_window_coverage);
    let converged = parameters.iter().all(|parameter| parameter.passed) && tau.modes_agree;
    debug!(
        converged,
        chains = chains.len(),
        draws_per_chain_used,
        "convergence diagnostics computed"
    );

    Ok(ConvergenceReport {
        converged,
        rhat_threshold: options.rhat_threshold,
        parameters,
        tau,
        chain_count: chains.len(),
        draws_per_chain_used,
    })
}

fn tau_agreement(
    chains: &[PosteriorSamples],
    draws_per_chain_used: usize,
    coverage: f64,
) -> TauDiagnostic {
    let mut per_chain_modes = Vec::with_capacity(chains.len());
    let mut windows = Vec::with_capacity(chains.len());
    for chain in chains {
        let truncated: Vec<ParameterDraw> = chain
            .draws
            .iter()
            .take(draws_per_chain_used)
            .copied()
            .collect();
        per_chain_modes.push(posterior_mode(&truncated));
        let mut taus: Vec<usize> = truncated.iter().map(|draw| draw.tau).collect();
        taus.sort_unstable();
        windows.push(narrowest_window(&taus, coverage));
    }

    let modes_agree = per_chain_modes.iter().all(|&mode| {
        windows
            .iter()
            .all(|&(low, high)| mode >= low && mode <= high)
    });

    TauDiagnostic {
        per_chain_modes,
        modes_agree,
    }
}

fn split_rhat_from_chains<F>(
    chains: &[PosteriorSamples],
    draws_per_chain_used: usize,
    extract: F,
) -> f64
where
    F: Fn(&ParameterDraw) -> f64,
{
    let half = draws_per_chain_used / 2;
    let mut split_chains = Vec::with_capacity(chains.len() * 2);
    for chain in chains {
        let first_half: Vec<f64> = chain.draws.iter().take(half).map(&extract).collect();
        let second_half: Vec<f64> = chain
            .draws
            .iter()
            .skip(half)
            .take(half)
            .map(&extract)
            .collect();
        split_chains.push(first_half);
        split_chains.push(second_half);
    }
    split_rhat_scalar(&split_chains)
}

/// Split-R-hat for pre-split scalar chains of equal length.
///
/// Chains that disagree while showing zero within-chain variance report
/// `INFINITY`; identical constant chains report 1.0.
fn split_rhat_scalar(chains: &[Vec<f64>]) -> f64 {
    let n = chains.first().map_or(0, Vec::len);
    if chains.len() < 2 || n < 2 {
        return f64::NAN;
    }

    let chain_means: Vec<f64> = chains
        .iter()
        .map(|chain| chain.iter().sum::<f64>() / usize_to_f64(n))
        .collect();
    let chain_vars: Vec<f64> = chains
        .iter()
        .zip(chain_means.iter())
        .map(|(chain, mean)| sample_variance(chain, *mean))
        .collect();

    let m = chains.len();
    let mean_of_means = chain_means.iter().sum::<f64>() / usize_to_f64(m);
    let between = usize_to_f64(n)
        * chain_means
            .iter()
            .map(|mean| {
                let centered = *mean - mean_of_means;
                centered * centered
            })
            .sum::<f64>()
        / usize_to_f64(m - 1);
    let within = chain_vars.iter().sum::<f64>() / usize_to_f64(m);

    if !(within.is_finite() && between.is_finite()) {
        return f64::NAN;
    }
    if within <= 0.0 {
        // Degenerate chains: identical constants converge trivially,
        // disagreeing constants can never mix.
        return if between <= f64::EPSILON { 1.0 } else { f64::INFINITY };
    }

    let n_f64 = usize_to_f64(n);
    let var_plus = ((n_f64 - 1.0) / n_f64).mul_add(within, between / n_f64);
    if !var_plus.is_finite() || var_plus <= 0.0 {
        return 1.0;
    }
    (var_plus / within).sqrt().max(1.0)
}

fn sample_variance(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values
        .iter()
        .map(|value| {
            let centered = *value - mean;
            centered * centered
        })
        .sum::<f64>()
        / usize_to_f64(values.len() - 1)
}
