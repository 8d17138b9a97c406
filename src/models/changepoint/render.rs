//! Terminal rendering of convergence and change-point reports.

use comfy_table::{
    Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED,
};

use super::diagnostics::ConvergenceReport;
use super::posterior::ChangePointSummary;

/// Formatted tables for one analysis run.
#[derive(Debug)]
pub struct ReportTables {
    pub convergence: Table,
    pub change_points: Table,
}

/// Render convergence diagnostics and change-point summaries to
/// formatted tables using `comfy_table`.
#[must_use]
pub fn render_report_tables(
    convergence: &ConvergenceReport,
    summaries: &[ChangePointSummary],
) -> ReportTables {
    ReportTables {
        convergence: render_convergence_table(convergence),
        change_points: render_summary_table(summaries),
    }
}

/// Per-parameter convergence table with pass/fail highlighting.
#[must_use]
pub fn render_convergence_table(report: &ConvergenceReport) -> Table {
    let mut table = make_table(&["parameter", "rhat", "ess", "status"]);
    for parameter in &report.parameters {
        table.add_row(vec![
            Cell::new(parameter.name),
            Cell::new(format!("{:.4}", parameter.rhat)),
            Cell::new(format!("{:.0}", parameter.effective_sample_size)),
            status_cell(parameter.passed),
        ]);
    }
    table.add_row(vec![
        Cell::new("tau (mode agreement)"),
        Cell::new(format!("{:?}", report.tau.per_chain_modes)),
        Cell::new("-"),
        status_cell(report.tau.modes_agree),
    ]);
    table
}

/// One row per detected change point.
#[must_use]
pub fn render_summary_table(summaries: &[ChangePointSummary]) -> Table {
    let mut table = make_table(&[
        "tau date",
        "credible interval",
        "mu before",
        "mu after",
        "change",
        "mass",
    ]);
    for summary in summaries {
        let (low, high) = summary.tau_credible_interval;
        table.add_row(vec![
            Cell::new(summary.tau_date.to_string()),
            Cell::new(format!("{low} .. {high}")),
            Cell::new(format!("{:.4}", summary.mu_before)),
            Cell::new(format!("{:.4}", summary.mu_after)),
            Cell::new(format!("{:+.1}%", summary.pct_change)),
            Cell::new(format!("{:.2}", summary.posterior_mass)),
        ]);
    }
    table
}

fn status_cell(passed: bool) -> Cell {
    if passed {
        Cell::new("pass").fg(Color::Green)
    } else {
        Cell::new("FAIL").fg(Color::Red).add_attribute(Attribute::Bold)
    }
}

fn make_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(*h)).collect::<Vec<_>>());
    table
}
