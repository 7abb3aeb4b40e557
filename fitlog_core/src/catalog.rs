//! Built-in weekly workout schedule.
//!
//! Exercises are authored as free text ("Push-ups: 3 sets of 10-15 reps").
//! The text is parsed once into [`ExerciseSpec`]s here, so nothing else in
//! the crate depends on the shape of those strings.

use crate::types::*;
use chrono::Weekday;
use once_cell::sync::Lazy;
use regex::Regex;

/// Cached default catalog, built once per process
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// An integer followed by whitespace and the word "sets"
static SET_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s+sets").expect("valid set count regex"));

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Workouts scheduled on `day` in the default catalog
pub fn workouts_for_day(day: Weekday) -> &'static [WorkoutDefinition] {
    get_default_catalog().workouts_for_day(day)
}

/// Same as [`workouts_for_day`], keyed by a weekday name
///
/// Unrecognized names yield an empty slice.
pub fn workouts_for_day_name(name: &str) -> &'static [WorkoutDefinition] {
    match parse_weekday(name) {
        Some(day) => workouts_for_day(day),
        None => {
            tracing::debug!("Unrecognized weekday name {:?}", name);
            &[]
        }
    }
}

/// Parse a weekday from its English name or three-letter abbreviation
pub fn parse_weekday(name: &str) -> Option<Weekday> {
    match name.trim().to_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Extract the target set count from a free-text exercise description
///
/// Returns 0 when the description carries no "<n> sets" phrase or the
/// number does not fit.
pub fn parse_target_set_count(description: &str) -> u32 {
    SET_COUNT_RE
        .captures(description)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Parse one free-text exercise line into a structured spec
///
/// The name is everything before the first `:`.
pub fn parse_exercise(description: &str) -> ExerciseSpec {
    let name = description
        .split(':')
        .next()
        .unwrap_or(description)
        .trim()
        .to_string();

    ExerciseSpec {
        name,
        description: description.to_string(),
        target_set_count: parse_target_set_count(description),
    }
}

fn workout(day: Weekday, title: &str, lines: &[&str]) -> WorkoutDefinition {
    WorkoutDefinition {
        day,
        title: title.into(),
        exercises: lines.iter().map(|line| parse_exercise(line)).collect(),
    }
}

/// Builds the default six-week calisthenics schedule
///
/// Prefer [`get_default_catalog`] outside of tests.
pub fn build_default_catalog() -> Catalog {
    let schedule = vec![
        workout(
            Weekday::Mon,
            "Upper Body (Push Focus)",
            &[
                "Push-ups: 3 sets of 10-15 reps",
                "Dips (using a chair or parallel bars): 3 sets of 8-12 reps",
                "Resistance band shoulder press: 3 sets of 12 reps",
            ],
        ),
        workout(
            Weekday::Tue,
            "Lower Body (Knee-Friendly)",
            &[
                "Glute bridges: 3 sets of 15 reps",
                "Bodyweight squats: 3 sets of 12 reps (adjust depth if needed)",
                "Resistance band leg curls: 3 sets of 15 reps",
            ],
        ),
        workout(Weekday::Wed, "Rest or Active Recovery", &[]),
        workout(
            Weekday::Thu,
            "Upper Body (Pull Focus)",
            &[
                "Pull-ups: 3 sets of 3-5 reps",
                "Inverted rows: 3 sets of 8-10 reps",
                "Resistance band bicep curls: 3 sets of 12 reps",
            ],
        ),
        workout(
            Weekday::Fri,
            "Skill & Core Training",
            &[
                "Handstand wall walks: 3 sets of 5 reps",
                "Wall-supported handstand hold: 3 sets of 15-30 seconds",
                "Standard plank: 3 sets of 20-30 seconds",
                "Side planks: 3 sets of 15-20 seconds per side",
            ],
        ),
        workout(
            Weekday::Sat,
            "Full Body Workout",
            &[
                "Burpees (if knee allows): 3 sets of 10 reps",
                "Mountain climbers: 3 sets of 20 reps",
                "Resistance band rows: 3 sets of 12 reps",
            ],
        ),
        workout(Weekday::Sun, "Rest", &[]),
    ];

    Catalog { schedule }
}

impl Catalog {
    /// Workouts scheduled on `day`, in schedule order
    pub fn workouts_for_day(&self, day: Weekday) -> &[WorkoutDefinition] {
        let start = self.schedule.iter().position(|w| w.day == day);
        match start {
            Some(start) => {
                let len = self.schedule[start..]
                    .iter()
                    .take_while(|w| w.day == day)
                    .count();
                &self.schedule[start..start + len]
            }
            None => &[],
        }
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for def in &self.schedule {
            if def.title.trim().is_empty() {
                errors.push(format!("Workout on {} has empty title", def.day));
            }
            for spec in &def.exercises {
                if spec.name.is_empty() {
                    errors.push(format!(
                        "Workout '{}' has an exercise with empty name",
                        def.title
                    ));
                }
            }
        }

        // Lookups return a contiguous slice per day
        let mut seen = Vec::new();
        for (i, def) in self.schedule.iter().enumerate() {
            let continues_run = i > 0 && self.schedule[i - 1].day == def.day;
            if !continues_run {
                if seen.contains(&def.day) {
                    errors.push(format!("Workouts for {} are not contiguous", def.day));
                }
                seen.push(def.day);
            }
        }

        for day in ALL_WEEKDAYS {
            if !seen.contains(&day) {
                errors.push(format!("Catalog has no entry for {}", day));
            }
        }

        errors
    }
}

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];
