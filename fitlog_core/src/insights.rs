//! Derived statistics over a user's daily metric history.
//!
//! Insights are never stored; they are recomputed from the record store on
//! every load.

use crate::store::{load_metric_records, RecordStore};
use crate::MetricRecord;
use chrono::NaiveDate;
use serde::Serialize;

/// Length of the rolling window used for steps and completion rate
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// The three dashboard statistics
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InsightStats {
    pub average_daily_steps: u32,
    /// Percentage, 0..=100
    pub weekly_completion_rate: u32,
    pub longest_streak: u32,
}

/// Result of aggregating a record list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insights {
    /// The history is empty
    NoData,
    Computed(InsightStats),
}

/// What the presentation layer shows for the insights panel
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsightsView {
    Loading,
    Errored(String),
    Empty,
    Computed(InsightStats),
}

/// Aggregate `records` (most recent first) as of `as_of` over the default window
pub fn compute_insights(records: &[MetricRecord], as_of: NaiveDate) -> Insights {
    compute_insights_with_window(records, as_of, DEFAULT_WINDOW_DAYS)
}

/// Aggregate `records` using a window of `window_days`
///
/// A record is in the window when `as_of - date` is less than
/// `window_days` whole days. Records dated after `as_of` therefore count.
pub fn compute_insights_with_window(
    records: &[MetricRecord],
    as_of: NaiveDate,
    window_days: i64,
) -> Insights {
    if records.is_empty() {
        return Insights::NoData;
    }

    let recent: Vec<&MetricRecord> = records
        .iter()
        .filter(|r| (as_of - r.date).num_days() < window_days)
        .collect();

    let (average_daily_steps, weekly_completion_rate) = if recent.is_empty() {
        (0, 0)
    } else {
        let count = recent.len() as f64;
        let total_steps: u64 = recent.iter().map(|r| u64::from(r.steps)).sum();
        let completed = recent.iter().filter(|r| r.workout_completed).count() as f64;
        (
            (total_steps as f64 / count).round() as u32,
            (completed / count * 100.0).round() as u32,
        )
    };

    Insights::Computed(InsightStats {
        average_daily_steps,
        weekly_completion_rate,
        longest_streak: longest_streak(records),
    })
}

/// Longest run of consecutive completed records in the given order
pub fn longest_streak(records: &[MetricRecord]) -> u32 {
    let mut best = 0;
    let mut current = 0;
    for record in records {
        if record.workout_completed {
            current += 1;
        } else {
            best = best.max(current);
            current = 0;
        }
    }
    best.max(current)
}

/// Fetch the user's history and compute the insights panel state
pub fn load_insights<S: RecordStore + ?Sized>(
    store: &S,
    user_id: &str,
    as_of: NaiveDate,
    window_days: i64,
) -> InsightsView {
    match load_metric_records(store, user_id) {
        Ok(records) => match compute_insights_with_window(&records, as_of, window_days) {
            Insights::NoData => InsightsView::Empty,
            Insights::Computed(stats) => {
                tracing::debug!("Computed insights for {}: {:?}", user_id, stats);
                InsightsView::Computed(stats)
            }
        },
        Err(e) => {
            tracing::warn!("Failed to load insights for {}: {}", user_id, e);
            InsightsView::Errored(e.to_string())
        }
    }
}
