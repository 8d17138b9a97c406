//! Fits the change-point model to a synthetic series with a known break
//! and prints convergence diagnostics, the detected change point, and
//! its nearest catalog event.
//!
//! Run with `cargo run --example known_break`.

use changepoint_models::{
    AnalysisOptions, EventRecord, ImpactLevel, SeriesInput, render_report_tables,
    run_change_point_analysis,
};
use chrono::NaiveDate;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // 160 daily observations; the mean jumps from 62 to 94 at index 80
    // (2020-03-21), with a deterministic wobble standing in for noise.
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).ok_or("bad start date")?;
    let dates: Vec<NaiveDate> = (0..160)
        .map(|offset| start + chrono::Days::new(offset))
        .collect();
    let values: Vec<f64> = (0..160usize)
        .map(|idx| {
            let base = if idx < 80 { 62.0 } else { 94.0 };
            base + 1.5 * ((f64::from(u8::try_from(idx % 11).unwrap_or(0)) / 5.0) - 1.0)
        })
        .collect();
    let series = SeriesInput::new(values, dates)?;

    let catalog = vec![
        EventRecord {
            date: NaiveDate::from_ymd_opt(2020, 3, 6).ok_or("bad event date")?,
            event_type: "policy".to_owned(),
            description: "production quota collapse".to_owned(),
            region: "global".to_owned(),
            impact_level: ImpactLevel::High,
        },
        EventRecord {
            date: NaiveDate::from_ymd_opt(2020, 4, 12).ok_or("bad event date")?,
            event_type: "policy".to_owned(),
            description: "emergency supply agreement".to_owned(),
            region: "global".to_owned(),
            impact_level: ImpactLevel::Medium,
        },
    ];

    let analysis = run_change_point_analysis(&series, &catalog, AnalysisOptions::default())?;

    let tables = render_report_tables(&analysis.convergence, &analysis.summaries);
    println!("convergence diagnostics");
    println!("{}", tables.convergence);
    println!();
    println!("detected change points");
    println!("{}", tables.change_points);
    println!();

    for summary in &analysis.summaries {
        println!("{}", summary.impact_statement);
    }
    for association in &analysis.associations {
        match (&association.matched_event, association.days_distance) {
            (Some(event), Some(days)) => {
                println!(
                    "nearest catalog event: {} ({}, {} days away)",
                    event.description, event.date, days
                );
            }
            _ => println!("no catalog event within the association window"),
        }
    }

    Ok(())
}
