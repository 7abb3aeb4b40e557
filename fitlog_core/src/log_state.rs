//! Per-date workout log state.
//!
//! Each date moves through `Absent -> Hydrating -> Populated`. Hydration is
//! split into [`WorkoutLogState::activate`], which hands out a
//! [`HydrateTicket`], and [`WorkoutLogState::complete_hydrate`], which
//! consumes it once the store has answered. A ticket only applies while its
//! date is still the active one and no newer ticket was issued for that
//! date; anything else is discarded and the date falls back to `Absent`.
//!
//! Only the active date accepts edits. Saving writes the whole log for a
//! date back to the record store.

use crate::store::{upsert_daily_log, RecordStore, UpsertOutcome};
use crate::{Catalog, DailyLog, Error, Result};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Lifecycle state of one date
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryStatus {
    Absent,
    Hydrating,
    Populated,
}

#[derive(Clone, Debug)]
enum Entry {
    Hydrating { generation: u64 },
    Populated(DailyLog),
}

/// Proof of an in-flight hydrate for one date
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HydrateTicket {
    date: NaiveDate,
    generation: u64,
}

impl HydrateTicket {
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// What a hydrate did to the state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HydrateOutcome {
    /// Populated from a log saved in the store
    Loaded,
    /// Populated with zeros from the day's schedule
    Initialized,
    /// The date was already populated; nothing changed
    AlreadyPopulated,
    /// Another hydrate for the date is still in flight
    InFlight,
    /// The response arrived for a superseded ticket and was dropped
    Discarded,
}

/// What a save did in the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Updated,
    /// The date had no populated log
    NothingToSave,
}

impl From<UpsertOutcome> for SaveOutcome {
    fn from(outcome: UpsertOutcome) -> Self {
        match outcome {
            UpsertOutcome::Inserted => SaveOutcome::Inserted,
            UpsertOutcome::Updated => SaveOutcome::Updated,
        }
    }
}

/// Parse a repetition count typed by the user
///
/// Leading whitespace and a `+` sign are accepted, then the leading digits
/// are read. Anything else, including negative numbers, yields 0.
pub fn parse_rep_input(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = unsigned
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// In-memory workout logs keyed by date
pub struct WorkoutLogState<'a> {
    catalog: &'a Catalog,
    entries: BTreeMap<NaiveDate, Entry>,
    active: Option<NaiveDate>,
    next_generation: u64,
}

impl WorkoutLogState<'static> {
    /// State backed by the built-in schedule
    pub fn with_default_catalog() -> Self {
        Self::new(crate::catalog::get_default_catalog())
    }
}

impl<'a> WorkoutLogState<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            entries: BTreeMap::new(),
            active: None,
            next_generation: 0,
        }
    }

    /// The date currently open for editing
    pub fn active_date(&self) -> Option<NaiveDate> {
        self.active
    }

    pub fn status(&self, date: NaiveDate) -> EntryStatus {
        match self.entries.get(&date) {
            None => EntryStatus::Absent,
            Some(Entry::Hydrating { .. }) => EntryStatus::Hydrating,
            Some(Entry::Populated(_)) => EntryStatus::Populated,
        }
    }

    /// The populated log for `date`, if any
    pub fn log(&self, date: NaiveDate) -> Option<&DailyLog> {
        match self.entries.get(&date) {
            Some(Entry::Populated(log)) => Some(log),
            _ => None,
        }
    }

    /// Make `date` the active date
    ///
    /// Returns a ticket when the date was absent and must be fetched.
    pub fn activate(&mut self, date: NaiveDate) -> Option<HydrateTicket> {
        self.active = Some(date);

        if self.entries.contains_key(&date) {
            tracing::debug!("Activated {} ({:?})", date, self.status(date));
            return None;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        self.entries.insert(date, Entry::Hydrating { generation });
        tracing::debug!("Activated {}, hydrating (ticket {})", date, generation);

        Some(HydrateTicket { date, generation })
    }

    /// Apply a store response to the date named by `ticket`
    ///
    /// `fetched` carries the saved log for the date, or `None` when the
    /// store has no log for it.
    pub fn complete_hydrate(
        &mut self,
        ticket: HydrateTicket,
        fetched: Result<Option<DailyLog>>,
    ) -> Result<HydrateOutcome> {
        let date = ticket.date;

        match self.entries.get(&date) {
            Some(Entry::Populated(_)) => {
                tracing::debug!("{} already populated, keeping current edits", date);
                return Ok(HydrateOutcome::AlreadyPopulated);
            }
            Some(Entry::Hydrating { generation }) if *generation == ticket.generation => {}
            _ => {
                tracing::debug!(
                    "Dropping response for superseded ticket {} ({})",
                    ticket.generation,
                    date
                );
                return Ok(HydrateOutcome::Discarded);
            }
        }

        if self.active != Some(date) {
            self.entries.remove(&date);
            tracing::debug!("Dropping response for {}: no longer the active date", date);
            return Ok(HydrateOutcome::Discarded);
        }

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                self.entries.remove(&date);
                tracing::warn!("Failed to load workout log for {}: {}", date, e);
                return Err(match e {
                    Error::Fetch(_) => e,
                    other => Error::Fetch(other.to_string()),
                });
            }
        };

        let (log, outcome) = match fetched {
            Some(mut saved) => {
                saved.date = date;
                (saved, HydrateOutcome::Loaded)
            }
            None => {
                let definitions = self.catalog.workouts_for_day(date.weekday());
                (DailyLog::zeroed(date, definitions), HydrateOutcome::Initialized)
            }
        };

        tracing::info!(
            "Workout log for {} ready ({:?}, {} workouts)",
            date,
            outcome,
            log.workouts.len()
        );
        self.entries.insert(date, Entry::Populated(log));
        Ok(outcome)
    }

    /// Activate `date` and hydrate it from the store in one step
    pub fn hydrate<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<HydrateOutcome> {
        let Some(ticket) = self.activate(date) else {
            return Ok(match self.status(date) {
                EntryStatus::Hydrating => HydrateOutcome::InFlight,
                _ => HydrateOutcome::AlreadyPopulated,
            });
        };

        let fetched = store
            .find_by_date(user_id, date)
            .map(|row| row.and_then(|r| r.workout_logs));
        self.complete_hydrate(ticket, fetched)
    }

    /// Set one repetition count on the active date
    ///
    /// Returns the value that was stored after tolerant parsing.
    pub fn set_rep(
        &mut self,
        date: NaiveDate,
        workout_index: usize,
        exercise_index: usize,
        set_index: usize,
        raw_value: &str,
    ) -> Result<u32> {
        if self.active != Some(date) {
            return Err(Error::State(format!("{} is not the active date", date)));
        }

        let log = match self.entries.get_mut(&date) {
            Some(Entry::Populated(log)) => log,
            _ => return Err(Error::State(format!("{} is not populated", date))),
        };

        let slot = log
            .workouts
            .get_mut(workout_index)
            .ok_or_else(|| Error::State(format!("no workout {} on {}", workout_index, date)))?
            .exercises
            .get_mut(exercise_index)
            .ok_or_else(|| {
                Error::State(format!(
                    "no exercise {} in workout {} on {}",
                    exercise_index, workout_index, date
                ))
            })?
            .sets
            .get_mut(set_index)
            .ok_or_else(|| {
                Error::State(format!(
                    "no set {} for exercise {} in workout {} on {}",
                    set_index, exercise_index, workout_index, date
                ))
            })?;

        let value = parse_rep_input(raw_value);
        *slot = value;
        tracing::debug!(
            "Set {}[{}][{}][{}] = {}",
            date,
            workout_index,
            exercise_index,
            set_index,
            value
        );
        Ok(value)
    }

    /// Upsert the whole populated log for `date` into the store
    pub fn save<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<SaveOutcome> {
        let Some(log) = self.log(date) else {
            tracing::warn!("No workout log to save for {}", date);
            return Ok(SaveOutcome::NothingToSave);
        };

        match upsert_daily_log(store, user_id, log) {
            Ok(outcome) => Ok(outcome.into()),
            Err(e) => {
                tracing::error!("Failed to save workout log for {}: {}", date, e);
                Err(match e {
                    Error::Persist(_) => e,
                    other => Error::Persist(other.to_string()),
                })
            }
        }
    }
}
