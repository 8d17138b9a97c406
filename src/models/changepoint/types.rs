//! Core public types for change-point fitting.

use super::diagnostics::ConvergenceReport;
use super::posterior::RegimePosteriorSummary;
use super::priors::ChangePointPriorConfig;
use crate::inference::{InferenceError, McmcSchedule};
use crate::input::SeriesInputError;
use thiserror::Error;

/// Errors returned by change-point configuration, fitting, and
/// summarization.
#[derive(Debug, Error)]
pub enum ChangePointError {
    #[error(transparent)]
    InvalidInput(#[from] SeriesInputError),
    #[error(transparent)]
    InvalidSchedule(#[from] InferenceError),
    #[error("multi-chain workflows require at least {min} chains; found {found}")]
    InvalidChainCount { min: usize, found: usize },
    #[error("multi-chain seed stride must be positive")]
    InvalidSeedStride,
    #[error("invalid change-point prior configuration")]
    InvalidPriorConfig,
    #[error("invalid proposal tuning configuration")]
    InvalidProposalTuning,
    #[error("credible-interval coverage must lie in (0, 1)")]
    InvalidCoverage,
    #[error("association window must be a positive number of days")]
    InvalidAssociationWindow,
    #[error("chain {chain} accepted zero proposals; adjust proposal scales or priors")]
    DegenerateChain { chain: usize },
    #[error("each chain must retain at least {minimum} draws; found {found}")]
    InsufficientChainDraws { minimum: usize, found: usize },
    #[error("posterior draws are required")]
    EmptyPosterior,
    #[error("location index {index} out of range for a series of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error(
        "sampler did not converge: {parameter} has rhat {rhat:.4} >= threshold {threshold:.4}"
    )]
    NotConverged {
        parameter: &'static str,
        rhat: f64,
        threshold: f64,
    },
    #[error("sampler did not converge: per-chain tau modes disagree across chains")]
    TauModesDisagree,
}

/// Sampler configuration for a single chain.
#[derive(Debug, Clone, Copy)]
pub struct ChangePointFitOptions {
    /// Iteration/burn-in/thinning schedule.
    pub schedule: McmcSchedule,
    /// RNG seed for reproducibility.
    pub seed: u64,
    /// Enable proposal-scale adaptation during burn-in.
    pub adapt_during_burn_in: bool,
}

impl Default for ChangePointFitOptions {
    fn default() -> Self {
        Self {
            schedule: McmcSchedule::default(),
            seed: 42,
            adapt_during_burn_in: true,
        }
    }
}

impl ChangePointFitOptions {
    /// # Errors
    ///
    /// Returns `ChangePointError` if the schedule is internally
    /// inconsistent.
    pub const fn validate(self) -> Result<(), ChangePointError> {
        if let Err(error) = self.schedule.validate() {
            return Err(ChangePointError::InvalidSchedule(error));
        }
        Ok(())
    }

    /// Number of retained draws implied by the schedule.
    #[must_use]
    pub const fn retained_draws(self) -> usize {
        self.schedule.retained_draws()
    }
}

/// Proposal-scale and adaptation controls for the Metropolis sweep.
#[derive(Debug, Clone, Copy)]
pub struct ProposalTuning {
    /// Minimum allowed continuous proposal scale.
    pub min_draw_scale: f64,
    /// Initial maximum step for the integer random walk on tau.
    pub tau_step: usize,
    /// Initial random-walk scale for regime means, as a fraction of the
    /// series standard deviation.
    pub mu_scale_fraction: f64,
    /// Initial random-walk scale for regime standard deviations, as a
    /// fraction of the series standard deviation.
    pub sigma_scale_fraction: f64,
    /// Adapt every `adaptation_interval` iterations during burn-in.
    pub adaptation_interval: usize,
    /// Lower acceptance-rate target for adaptation.
    pub acceptance_target_low: f64,
    /// Upper acceptance-rate target for adaptation.
    pub acceptance_target_high: f64,
    /// Multiplicative scale decrease when acceptance is below target.
    pub scale_decrease_factor: f64,
    /// Multiplicative scale increase when acceptance is above target.
    pub scale_increase_factor: f64,
}

impl Default for ProposalTuning {
    fn default() -> Self {
        Self {
            min_draw_scale: 1.0e-4,
            tau_step: 8,
            mu_scale_fraction: 0.25,
            sigma_scale_fraction: 0.15,
            adaptation_interval: 50,
            acceptance_target_low: 0.2,
            acceptance_target_high: 0.5,
            scale_decrease_factor: 0.9,
            scale_increase_factor: 1.1,
        }
    }
}

impl ProposalTuning {
    /// Whether proposal tuning settings are numerically valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.min_draw_scale > 0.0
            && self.tau_step > 0
            && self.mu_scale_fraction > 0.0
            && self.sigma_scale_fraction > 0.0
            && self.adaptation_interval > 0
            && self.acceptance_target_low >= 0.0
            && self.acceptance_target_high <= 1.0
            && self.acceptance_target_low < self.acceptance_target_high
            && self.scale_decrease_factor > 0.0
            && self.scale_increase_factor > 0.0
    }
}

/// Full sampler configuration for change-point fitting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangePointSamplerConfig {
    pub fit_options: ChangePointFitOptions,
    pub prior_config: ChangePointPriorConfig,
    pub proposal_tuning: ProposalTuning,
}

impl ChangePointSamplerConfig {
    /// # Errors
    ///
    /// Returns `ChangePointError` if any configuration block is invalid.
    pub fn validate(self) -> Result<(), ChangePointError> {
        self.fit_options.validate()?;
        if !self.prior_config.is_valid() {
            return Err(ChangePointError::InvalidPriorConfig);
        }
        if !self.proposal_tuning.is_valid() {
            return Err(ChangePointError::InvalidProposalTuning);
        }
        Ok(())
    }
}

/// Configuration for running multiple independent MCMC chains.
#[derive(Debug, Clone, Copy)]
pub struct MultiChainOptions {
    /// Number of independent chains to run.
    pub chains: usize,
    /// Seed increment between adjacent chains.
    ///
    /// Chain `i` uses `base_seed + i * seed_stride` with wrapping
    /// arithmetic.
    pub seed_stride: u64,
}

impl Default for MultiChainOptions {
    fn default() -> Self {
        Self {
            chains: 4,
            seed_stride: 10_000,
        }
    }
}

impl MultiChainOptions {
    /// # Errors
    ///
    /// Returns `ChangePointError` if multi-chain options are invalid.
    pub const fn validate(self) -> Result<(), ChangePointError> {
        if self.chains < 2 {
            return Err(ChangePointError::InvalidChainCount {
                min: 2,
                found: self.chains,
            });
        }
        if self.seed_stride == 0 {
            return Err(ChangePointError::InvalidSeedStride);
        }
        Ok(())
    }
}

/// Component-wise acceptance rates from one chain's Metropolis sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptanceRates {
    pub tau: f64,
    pub mu_before: f64,
    pub mu_after: f64,
    pub sigma_before: f64,
    pub sigma_after: f64,
}

/// Per-chain sampler diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ChainDiagnostics {
    pub iterations_completed: usize,
    pub retained_draws: usize,
    pub acceptance_rates: Option<AcceptanceRates>,
}

/// Output report from fitting one chain.
#[derive(Debug, Clone, Default)]
pub struct ChainReport {
    pub diagnostics: ChainDiagnostics,
    pub posterior_summary: Option<RegimePosteriorSummary>,
}

/// Output report for multi-chain fitting.
#[derive(Debug, Clone)]
pub struct MultiChainReport {
    /// Chain-specific reports in execution order.
    pub chain_reports: Vec<ChainReport>,
    /// Posterior summary from pooled draws across all chains.
    pub pooled_posterior_summary: Option<RegimePosteriorSummary>,
    /// Convergence diagnostics across chains.
    pub convergence: ConvergenceReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_options_validate_and_count_retained_draws() {
        let options = ChangePointFitOptions {
            schedule: McmcSchedule {
                iterations: 200,
                burn_in: 100,
                thin: 2,
            },
            ..ChangePointFitOptions::default()
        };
        assert!(options.validate().is_ok());
        assert_eq!(options.retained_draws(), 50);
    }

    #[test]
    fn fit_options_reject_bad_schedule() {
        let options = ChangePointFitOptions {
            schedule: McmcSchedule {
                iterations: 100,
                burn_in: 100,
                thin: 1,
            },
            ..ChangePointFitOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ChangePointError::InvalidSchedule(
                InferenceError::InvalidBurnIn { .. }
            ))
        ));
    }

    #[test]
    fn multi_chain_options_require_two_chains() {
        let options = MultiChainOptions {
            chains: 1,
            seed_stride: 1,
        };
        assert!(matches!(
            options.validate(),
            Err(ChangePointError::InvalidChainCount { min: 2, found: 1 })
        ));
    }

    #[test]
    fn multi_chain_options_require_positive_stride() {
        let options = MultiChainOptions {
            chains: 4,
            seed_stride: 0,
        };
        assert!(matches!(
            options.validate(),
            Err(ChangePointError::InvalidSeedStride)
        ));
    }

    #[test]
    fn proposal_tuning_defaults_are_valid() {
        assert!(ProposalTuning::default().is_valid());
    }

    #[test]
    fn sampler_config_rejects_invalid_tuning() {
        let config = ChangePointSamplerConfig {
            proposal_tuning: ProposalTuning {
                adaptation_interval: 0,
                ..ProposalTuning::default()
            },
            ..ChangePointSamplerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChangePointError::InvalidProposalTuning)
        ));
    }

    #[test]
    fn sampler_config_rejects_invalid_priors() {
        let config = ChangePointSamplerConfig {
            prior_config: ChangePointPriorConfig {
                mu_scale_multiplier: 0.0,
                ..ChangePointPriorConfig::default()
            },
            ..ChangePointSamplerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChangePointError::InvalidPriorConfig)
        ));
    }
}
