//! End-to-end change-point analysis: fit, diagnose, summarize, and
//! associate in one call.
//!
//! The stages stay individually reachable for callers that need finer
//! control; this module only fixes their composition and threads the
//! configuration through.

use tracing::info;

use crate::events::{EventAssociation, EventRecord, associate_change_points};
use crate::input::SeriesInput;

use super::diagnostics::{ConvergenceReport, DiagnosticsOptions};
use super::posterior::{
    ChangePointSummary, RegimePosteriorSummary, SummaryOptions, summarize_change_points,
};
use super::sampler::fit_change_point_multi_chain_with_config;
use super::types::{ChangePointError, ChangePointSamplerConfig, MultiChainOptions};

/// Configuration for a full analysis run.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOptions {
    pub sampler: ChangePointSamplerConfig,
    pub multi_chain: MultiChainOptions,
    pub diagnostics: DiagnosticsOptions,
    pub summary: SummaryOptions,
    /// Event-search window around the detected change-point date.
    pub association_window_days: i64,
}

impl AnalysisOptions {
    /// # Errors
    ///
    /// Returns `ChangePointError` if any configuration block is invalid.
    pub fn validate(self) -> Result<(), ChangePointError> {
        self.sampler.validate()?;
        self.multi_chain.validate()?;
        if self.window_days() <= 0 {
            return Err(ChangePointError::InvalidAssociationWindow);
        }
        Ok(())
    }

    /// Effective association window, defaulting when left at zero.
    #[must_use]
    pub const fn window_days(self) -> i64 {
        if self.association_window_days == 0 {
            crate::events::DEFAULT_ASSOCIATION_WINDOW_DAYS
        } else {
            self.association_window_days
        }
    }
}

/// Structured output of one analysis run, serializable by the excluded
/// I/O layer.
#[derive(Debug, Clone)]
pub struct ChangePointAnalysis {
    pub convergence: ConvergenceReport,
    /// Pooled posterior summary over all chains.
    pub posterior_summary: Option<RegimePosteriorSummary>,
    /// One summary per detected posterior mode of tau.
    pub summaries: Vec<ChangePointSummary>,
    /// Event association for each summary, in the same order.
    pub associations: Vec<EventAssociation>,
}

/// Run the full pipeline: multi-chain sampling, convergence gate,
/// summarization, and event association.
///
/// # Errors
///
/// Returns `ChangePointError` on invalid configuration, degenerate
/// chains, or a failed convergence gate without the explicit override in
/// `options.summary`.
pub fn run_change_point_analysis(
    series: &SeriesInput,
    catalog: &[EventRecord],
    options: AnalysisOptions,
) -> Result<ChangePointAnalysis, ChangePointError> {
    options.validate()?;

    let (report, chains) = fit_change_point_multi_chain_with_config(
        series,
        options.sampler,
        options.multi_chain,
        options.diagnostics,
    )?;

    let summaries =
        summarize_change_points(&chains, series, &report.convergence, options.summary)?;
    let associations = associate_change_points(&summaries, catalog, options.window_days());
    info!(
        change_points = summaries.len(),
        matched = associations
            .iter()
            .filter(|assoc| assoc.matched_event.is_some())
            .count(),
        "change-point analysis completed"
    );

    Ok(ChangePointAnalysis {
        convergence: report.convergence,
        posterior_summary: report.pooled_posterior_summary,
        summaries,
        associations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_validate() {
        assert!(AnalysisOptions::default().validate().is_ok());
        assert_eq!(AnalysisOptions::default().window_days(), 90);
    }

    #[test]
    fn negative_window_is_rejected() {
        let options = AnalysisOptions {
            association_window_days: -5,
            ..AnalysisOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ChangePointError::InvalidAssociationWindow)
        ));
    }
}
