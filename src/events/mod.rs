//! # Event catalog and change-point association
//!
//! Links a detected change point to the closest dated real-world event
//! within a tolerance window. Association is a pure function of its
//! inputs: no hidden state, deterministically re-derivable, and testable
//! independently of the sampler.

use chrono::NaiveDate;

use crate::models::changepoint::ChangePointSummary;

/// Default search window around the change-point date, in days.
pub const DEFAULT_ASSOCIATION_WINDOW_DAYS: i64 = 90;

/// Qualitative impact level attached to a catalog event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
}

/// One dated record from the external event catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub date: NaiveDate,
    pub event_type: String,
    pub description: String,
    pub region: String,
    pub impact_level: ImpactLevel,
}

/// Result of matching one change point against the catalog.
///
/// A `None` match is a first-class "no nearby event" outcome, never a
/// failure.
#[derive(Debug, Clone, PartialEq)]
pub struct EventAssociation {
    pub change_point: ChangePointSummary,
    pub matched_event: Option<EventRecord>,
    /// Absolute day count between the event and the change point.
    pub days_distance: Option<i64>,
    /// Signed offset: negative when the event precedes the change point.
    pub signed_offset_days: Option<i64>,
}

/// Associate one change point with the nearest catalog event inside the
/// window.
///
/// Among events with `|event_date - tau_date| <= window_days`, the
/// minimum absolute distance wins; ties break toward the earliest event
/// date. An empty filtered set yields an explicit null association.
#[must_use]
pub fn associate_change_point(
    summary: &ChangePointSummary,
    catalog: &[EventRecord],
    window_days: i64,
) -> EventAssociation {
    let best = catalog
        .iter()
        .filter_map(|event| {
            let offset = event
                .date
                .signed_duration_since(summary.tau_date)
                .num_days();
            (offset.abs() <= window_days).then_some((event, offset))
        })
        .min_by(|(event_a, offset_a), (event_b, offset_b)| {
            offset_a
                .abs()
                .cmp(&offset_b.abs())
                .then(event_a.date.cmp(&event_b.date))
        });

    match best {
        Some((event, offset)) => EventAssociation {
            change_point: summary.clone(),
            matched_event: Some(event.clone()),
            days_distance: Some(offset.abs()),
            signed_offset_days: Some(offset),
        },
        None => EventAssociation {
            change_point: summary.clone(),
            matched_event: None,
            days_distance: None,
            signed_offset_days: None,
        },
    }
}

/// Associate every detected change point against the catalog.
#[must_use]
pub fn associate_change_points(
    summaries: &[ChangePointSummary],
    catalog: &[EventRecord],
    window_days: i64,
) -> Vec<EventAssociation> {
    summaries
        .iter()
        .map(|summary| associate_change_point(summary, catalog, window_days))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn event(year: i32, month: u32, day: u32, description: &str) -> EventRecord {
        EventRecord {
            date: date(year, month, day),
            event_type: "geopolitical".to_owned(),
            description: description.to_owned(),
            region: "global".to_owned(),
            impact_level: ImpactLevel::High,
        }
    }

    fn summary_at(tau_date: NaiveDate) -> ChangePointSummary {
        ChangePointSummary {
            tau_index: 100,
            tau_date,
            tau_credible_interval: (tau_date, tau_date),
            coverage: 0.95,
            mu_before: 1.0,
            mu_after: 2.0,
            pct_change: 100.0,
            posterior_mass: 1.0,
            impact_statement: String::new(),
            convergence_caveat: None,
        }
    }

    #[test]
    fn picks_closest_event_inside_window() {
        let summary = summary_at(date(2020, 3, 1));
        let catalog = vec![
            event(2020, 1, 15, "supply disruption"),
            event(2020, 5, 1, "demand collapse"),
        ];
        let association = associate_change_point(&summary, &catalog, 90);
        let matched = association.matched_event.unwrap();
        assert_eq!(matched.description, "supply disruption");
        assert_eq!(association.days_distance, Some(46));
        assert_eq!(association.signed_offset_days, Some(-46));
    }

    #[test]
    fn ties_break_toward_earliest_event() {
        let summary = summary_at(date(2020, 3, 1));
        let catalog = vec![
            event(2020, 3, 11, "later event"),
            event(2020, 2, 20, "earlier event"),
        ];
        let association = associate_change_point(&summary, &catalog, 90);
        assert_eq!(
            association.matched_event.unwrap().description,
            "earlier event"
        );
        assert_eq!(association.days_distance, Some(10));
    }

    #[test]
    fn distant_events_yield_null_association() {
        let summary = summary_at(date(2020, 3, 1));
        let catalog = vec![event(2019, 1, 1, "old news"), event(2021, 6, 1, "far future")];
        let association = associate_change_point(&summary, &catalog, 90);
        assert!(association.matched_event.is_none());
        assert!(association.days_distance.is_none());
        assert!(association.signed_offset_days.is_none());
    }

    #[test]
    fn empty_catalog_yields_null_association() {
        let summary = summary_at(date(2020, 3, 1));
        let association = associate_change_point(&summary, &[], 90);
        assert!(association.matched_event.is_none());
    }

    #[test]
    fn boundary_distance_is_included() {
        let summary = summary_at(date(2020, 3, 1));
        let catalog = vec![event(2020, 5, 30, "exactly ninety days out")];
        let association = associate_change_point(&summary, &catalog, 90);
        assert_eq!(association.days_distance, Some(90));
        assert!(association.matched_event.is_some());
    }

    #[test]
    fn maps_over_multiple_summaries() {
        let catalog = vec![event(2020, 3, 5, "nearby")];
        let summaries = vec![summary_at(date(2020, 3, 1)), summary_at(date(2021, 3, 1))];
        let associations = associate_change_points(&summaries, &catalog, 90);
        assert_eq!(associations.len(), 2);
        assert!(associations[0].matched_event.is_some());
        assert!(associations[1].matched_event.is_none());
    }
}
