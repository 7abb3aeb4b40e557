#![forbid(unsafe_code)]

//! Core domain model and business logic for Fitlog.
//!
//! This crate provides:
//! - Domain types (schedule, daily workout logs, metric rows)
//! - The built-in weekly workout catalog
//! - Per-date workout log state with hydrate/edit/save
//! - Insights over daily metric history
//! - Record store and session provider interfaces with local backends
//! - Progression plan, calendar helpers, meal log and CSV export

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod store;
pub mod session;
pub mod log_state;
pub mod insights;
pub mod progression;
pub mod calendar;
pub mod meals;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{get_default_catalog, parse_target_set_count, workouts_for_day};
pub use config::Config;
pub use store::{JsonFileRecordStore, MemoryRecordStore, RecordStore, UpsertOutcome};
pub use session::{LocalSessionProvider, SessionProvider, UserSession};
pub use log_state::{EntryStatus, HydrateOutcome, SaveOutcome, WorkoutLogState};
pub use insights::{compute_insights, InsightStats, Insights, InsightsView};
pub use progression::ProgressionPhase;
pub use meals::{JsonlMealSink, Meal, MealEntry, MealSink};
