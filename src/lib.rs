#![forbid(unsafe_code)]

//! # `changepoint_models`
//!
//! Bayesian change-point detection for financial time series: a
//! Metropolis-within-Gibbs sampler over a discrete break location and
//! per-regime Gaussian parameters, multi-chain convergence diagnostics,
//! posterior summarization, and association of detected breaks with a
//! catalog of dated real-world events.
//!
//! The crate was initially developed for commodity-price regime
//! analysis, but the API is intentionally domain-agnostic and can be
//! reused on any cleaned, gap-free numeric series with a date index.

pub mod events;
pub mod inference;
pub mod input;
pub mod models;

pub use inference::{InferenceError, McmcSchedule, ProposalStats, chain_seed};
pub use input::{MIN_SERIES_LEN, SeriesInput, SeriesInputError};

pub use events::{
    DEFAULT_ASSOCIATION_WINDOW_DAYS, EventAssociation, EventRecord, ImpactLevel,
    associate_change_point, associate_change_points,
};

pub use models::changepoint::{
    AcceptanceRates, AnalysisOptions, CONTINUOUS_PARAMETER_NAMES, ChainDiagnostics, ChainReport,
    ChangePointAnalysis, ChangePointError, ChangePointFitOptions, ChangePointModel,
    ChangePointPriorConfig, ChangePointSamplerConfig, ChangePointSummary, ConvergenceReport,
    DiagnosticsOptions, MeanShiftModel, MultiChainOptions, MultiChainReport, ParameterDiagnostic,
    ParameterDraw, ParameterSummary, PosteriorSamples, PriorHyperparameters, ProposalTuning,
    RegimePosteriorSummary, ReportTables, SeriesMoments, SummaryOptions, TauDiagnostic,
    autocorrelation, diagnose, effective_sample_size, fit_change_point,
    fit_change_point_multi_chain, fit_change_point_multi_chain_with_config,
    fit_change_point_with_config, pool_chains, posterior_mode, render_convergence_table,
    render_report_tables, render_summary_table, run_change_point_analysis,
    summarize_change_points, summarize_posterior,
};
