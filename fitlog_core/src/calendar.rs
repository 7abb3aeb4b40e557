//! Month calendar and weekday navigation helpers.

use crate::store::RecordStore;
use crate::{MetricRow, Result};
use chrono::{Datelike, Months, NaiveDate, Weekday};
use std::collections::BTreeSet;

/// A calendar month
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarMonth {
    first: NaiveDate,
}

impl CalendarMonth {
    /// Month containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    /// Month from a year and 1-based month number
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    /// Parse a `YYYY-MM` string
    pub fn parse(s: &str) -> Option<Self> {
        let (year, month) = s.trim().split_once('-')?;
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    /// Every date of the month, in order
    pub fn days(&self) -> Vec<NaiveDate> {
        self.first
            .iter_days()
            .take_while(|d| d.month() == self.first.month())
            .collect()
    }

    /// Blank cells before the 1st in a Sunday-first grid
    pub fn leading_blanks(&self) -> u32 {
        self.first.weekday().num_days_from_sunday()
    }

    pub fn next(&self) -> Self {
        Self {
            first: self
                .first
                .checked_add_months(Months::new(1))
                .unwrap_or(self.first),
        }
    }

    pub fn previous(&self) -> Self {
        Self {
            first: self
                .first
                .checked_sub_months(Months::new(1))
                .unwrap_or(self.first),
        }
    }

    /// Title such as "March 2024"
    pub fn title(&self) -> String {
        self.first.format("%B %Y").to_string()
    }
}

/// Weekday after `day`, wrapping Saturday to Sunday
pub fn next_weekday(day: Weekday) -> Weekday {
    day.succ()
}

/// Weekday before `day`, wrapping Sunday to Saturday
pub fn previous_weekday(day: Weekday) -> Weekday {
    day.pred()
}

/// Dates of `month` that have a saved workout log or a completed workout
pub fn logged_days<S: RecordStore + ?Sized>(
    store: &S,
    user_id: &str,
    month: CalendarMonth,
) -> Result<BTreeSet<NaiveDate>> {
    let rows = store.list_for_user(user_id)?;
    Ok(rows
        .iter()
        .filter(|row| CalendarMonth::containing(row.date) == month)
        .filter(|row| has_activity(row))
        .map(|row| row.date)
        .collect())
}

fn has_activity(row: &MetricRow) -> bool {
    row.workout_completed || row.workout_logs.as_ref().is_some_and(|log| log.total_reps() > 0)
}
