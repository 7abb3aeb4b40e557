//! Core domain types for Fitlog.
//!
//! This module defines the fundamental types used throughout the system:
//! - The weekly workout schedule (definitions and exercise specs)
//! - Per-date workout logs with their repetition counts
//! - Daily metric rows as kept by the record store

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Schedule Types
// ============================================================================

/// One exercise line of a scheduled workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseSpec {
    pub name: String,
    /// The free-text line the spec was parsed from, e.g. "Push-ups: 3 sets of 10-15 reps"
    pub description: String,
    pub target_set_count: u32,
}

/// A scheduled workout for one weekday
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutDefinition {
    pub day: Weekday,
    pub title: String,
    pub exercises: Vec<ExerciseSpec>,
}

impl WorkoutDefinition {
    /// Rest days are scheduled with no exercises
    pub fn is_rest(&self) -> bool {
        self.exercises.is_empty()
    }
}

/// The complete weekly schedule
#[derive(Clone, Debug)]
pub struct Catalog {
    pub schedule: Vec<WorkoutDefinition>,
}

// ============================================================================
// Workout Log Types
// ============================================================================

/// Repetitions logged for one exercise, one entry per target set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggedExercise {
    pub name: String,
    pub sets: Vec<u32>,
}

/// Logged exercises for one scheduled workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggedWorkout {
    pub title: String,
    pub exercises: Vec<LoggedExercise>,
}

/// Everything logged on a single calendar date
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyLog {
    pub date: NaiveDate,
    pub workouts: Vec<LoggedWorkout>,
}

impl DailyLog {
    /// Build a zero-filled log mirroring the given workout definitions
    pub fn zeroed(date: NaiveDate, definitions: &[WorkoutDefinition]) -> Self {
        let workouts = definitions
            .iter()
            .map(|def| LoggedWorkout {
                title: def.title.clone(),
                exercises: def
                    .exercises
                    .iter()
                    .map(|spec| LoggedExercise {
                        name: spec.name.clone(),
                        sets: vec![0; spec.target_set_count as usize],
                    })
                    .collect(),
            })
            .collect();

        Self { date, workouts }
    }

    /// Sum of every logged repetition
    ///
    /// Widened to u64: each set may hold any u32.
    pub fn total_reps(&self) -> u64 {
        self.workouts
            .iter()
            .flat_map(|w| &w.exercises)
            .flat_map(|e| &e.sets)
            .map(|&reps| u64::from(reps))
            .sum()
    }
}

// ============================================================================
// Metric Types
// ============================================================================

/// A row of the per-user, per-date metrics table
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricRow {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub steps: Option<u32>,
    #[serde(default)]
    pub workout_completed: bool,
    #[serde(default)]
    pub workout_logs: Option<DailyLog>,
}

impl MetricRow {
    /// Create an empty row for (user, date) with a fresh id
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            date,
            steps: None,
            workout_completed: false,
            workout_logs: None,
        }
    }

    /// Project the row onto the fields the insights aggregator reads
    pub fn to_record(&self) -> MetricRecord {
        MetricRecord {
            date: self.date,
            steps: self.steps.unwrap_or(0),
            workout_completed: self.workout_completed,
        }
    }
}

/// Daily activity summary consumed by the insights aggregator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricRecord {
    pub date: NaiveDate,
    pub steps: u32,
    pub workout_completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, sets: u32) -> ExerciseSpec {
        ExerciseSpec {
            name: name.into(),
            description: format!("{}: {} sets of 10 reps", name, sets),
            target_set_count: sets,
        }
    }

    #[test]
    fn test_zeroed_log_mirrors_definitions() {
        let defs = vec![WorkoutDefinition {
            day: Weekday::Mon,
            title: "Push".into(),
            exercises: vec![spec("Push-ups", 3), spec("Dips", 2), spec("Stretch", 0)],
        }];
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        let log = DailyLog::zeroed(date, &defs);

        assert_eq!(log.date, date);
        assert_eq!(log.workouts.len(), 1);
        let exercises = &log.workouts[0].exercises;
        assert_eq!(exercises[0].sets, vec![0, 0, 0]);
        assert_eq!(exercises[1].sets, vec![0, 0]);
        assert!(exercises[2].sets.is_empty());
        assert_eq!(log.total_reps(), 0);
    }

    #[test]
    fn test_total_reps_does_not_overflow_u32() {
        let log = DailyLog {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            workouts: vec![LoggedWorkout {
                title: "Push".into(),
                exercises: vec![
                    LoggedExercise {
                        name: "Push-ups".into(),
                        sets: vec![u32::MAX, u32::MAX, 1],
                    },
                    LoggedExercise {
                        name: "Dips".into(),
                        sets: vec![u32::MAX],
                    },
                ],
            }],
        };

        assert_eq!(log.total_reps(), 3 * u64::from(u32::MAX) + 1);
    }

    #[test]
    fn test_row_projects_missing_steps_as_zero() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let row = MetricRow::new("user-1", date);

        let record = row.to_record();
        assert_eq!(record.steps, 0);
        assert!(!record.workout_completed);
    }

    #[test]
    fn test_row_deserializes_without_optional_fields() {
        let json = r#"{
            "id": "6f1c1f8e-4d6b-4a53-9c1e-0b1b2d1d5e11",
            "user_id": "u",
            "date": "2024-03-04"
        }"#;
        let row: MetricRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.steps, None);
        assert!(!row.workout_completed);
        assert!(row.workout_logs.is_none());
    }
}
