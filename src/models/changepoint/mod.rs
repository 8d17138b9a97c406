//! Bayesian single change-point model.
//!
//! Detects one abrupt shift in the mean (and scale) of a chronologically
//! ordered series, quantifies the regime shift, and gates every summary
//! behind multi-chain convergence diagnostics.
//!
//! Stages are exposed individually (model, sampler, diagnostics,
//! summarizer) and composed end-to-end by [`run_change_point_analysis`].

pub mod analysis;
pub mod diagnostics;
pub mod likelihood;
pub mod model;
pub mod posterior;
pub mod priors;
pub mod render;
pub mod sampler;
pub mod types;

pub use analysis::{AnalysisOptions, ChangePointAnalysis, run_change_point_analysis};
pub use diagnostics::{
    ConvergenceReport, DiagnosticsOptions, ParameterDiagnostic, TauDiagnostic, autocorrelation,
    diagnose, effective_sample_size,
};
pub use likelihood::SeriesMoments;
pub use model::{CONTINUOUS_PARAMETER_NAMES, ChangePointModel, MeanShiftModel};
pub use posterior::{
    ChangePointSummary, ParameterDraw, ParameterSummary, PosteriorSamples,
    RegimePosteriorSummary, SummaryOptions, pool_chains, posterior_mode, summarize_change_points,
    summarize_posterior,
};
pub use priors::{ChangePointPriorConfig, PriorHyperparameters};
pub use render::{ReportTables, render_convergence_table, render_report_tables, render_summary_table};
pub use sampler::{
    fit_change_point, fit_change_point_multi_chain, fit_change_point_multi_chain_with_config,
    fit_change_point_with_config,
};
pub use types::{
    AcceptanceRates, ChainDiagnostics, ChainReport, ChangePointError, ChangePointFitOptions,
    ChangePointSamplerConfig, MultiChainOptions, MultiChainReport, ProposalTuning,
};
