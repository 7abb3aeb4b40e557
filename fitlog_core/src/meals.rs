//! Meal logging.
//!
//! Meals are appended to a JSONL (JSON Lines) journal with file locking so
//! that concurrent invocations never interleave partial lines.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A meal with its nutrition values
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meal {
    pub name: String,
    pub calories: u32,
    /// Grams of protein
    pub protein: u32,
}

/// A meal logged by a user on a date
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MealEntry {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub logged_at: DateTime<Utc>,
    pub meal: Meal,
}

impl MealEntry {
    pub fn new(user_id: impl Into<String>, date: NaiveDate, meal: Meal) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            date,
            logged_at: Utc::now(),
            meal,
        }
    }
}

/// Calorie and protein sums for a set of meals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MealTotals {
    pub meals: usize,
    pub calories: u32,
    pub protein: u32,
}

/// Sum the nutrition values of `entries`
pub fn totals<'a>(entries: impl IntoIterator<Item = &'a MealEntry>) -> MealTotals {
    entries.into_iter().fold(MealTotals::default(), |acc, e| MealTotals {
        meals: acc.meals + 1,
        calories: acc.calories.saturating_add(e.meal.calories),
        protein: acc.protein.saturating_add(e.meal.protein),
    })
}

/// Parse a numeric meal field typed by the user
///
/// Only ASCII digits are accepted. Empty input means 0; anything else is
/// rejected with `None` so the caller keeps its previous value.
pub fn parse_numeric_field(raw: &str) -> Option<u32> {
    if raw.is_empty() {
        return Some(0);
    }
    if !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Meal form being filled in
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MealDraft {
    meal: Meal,
}

/// Fields of a [`MealDraft`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MealField {
    Name,
    Calories,
    Protein,
}

impl MealDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meal(&self) -> &Meal {
        &self.meal
    }

    /// Apply user input to one field
    ///
    /// Returns false when numeric input was rejected and the field kept
    /// its value.
    pub fn set_field(&mut self, field: MealField, raw: &str) -> bool {
        match field {
            MealField::Name => {
                self.meal.name = raw.to_string();
                true
            }
            MealField::Calories | MealField::Protein => match parse_numeric_field(raw) {
                Some(value) => {
                    if field == MealField::Calories {
                        self.meal.calories = value;
                    } else {
                        self.meal.protein = value;
                    }
                    true
                }
                None => {
                    tracing::debug!("Rejected non-numeric {:?} input {:?}", field, raw);
                    false
                }
            },
        }
    }

    /// Take the finished meal, resetting the draft
    ///
    /// Fails without resetting when the name is blank.
    pub fn submit(&mut self) -> Result<Meal> {
        if self.meal.name.trim().is_empty() {
            return Err(Error::Other("meal name must not be empty".into()));
        }
        let mut meal = std::mem::take(&mut self.meal);
        meal.name = meal.name.trim().to_string();
        Ok(meal)
    }
}

/// Meal sink trait for persisting meal entries
pub trait MealSink {
    fn append(&mut self, entry: &MealEntry) -> Result<()>;
}

/// Sink that keeps entries in memory, used for guest sessions
#[derive(Debug, Default)]
pub struct MemoryMealSink {
    pub entries: Vec<MealEntry>,
}

impl MealSink for MemoryMealSink {
    fn append(&mut self, entry: &MealEntry) -> Result<()> {
        self.entries.push(entry.clone());
        Ok(())
    }
}

/// JSONL-based meal sink with file locking
pub struct JsonlMealSink {
    path: PathBuf,
}

impl JsonlMealSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl MealSink for JsonlMealSink {
    fn append(&mut self, entry: &MealEntry) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(entry)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended meal {} to {:?}", entry.id, self.path);
        Ok(())
    }
}

/// Read all meal entries from a journal
///
/// Unparseable lines are skipped with a warning.
pub fn read_meals(path: &Path) -> Result<Vec<MealEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<MealEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Failed to parse meal at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} meals from {:?}", entries.len(), path);
    Ok(entries)
}

/// Meals for one user on one date, in logging order
pub fn meals_for_day(entries: &[MealEntry], user_id: &str, date: NaiveDate) -> Vec<MealEntry> {
    entries
        .iter()
        .filter(|e| e.user_id == user_id && e.date == date)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 10).unwrap()
    }

    fn meal(name: &str, calories: u32, protein: u32) -> Meal {
        Meal {
            name: name.into(),
            calories,
            protein,
        }
    }

    #[test]
    fn test_parse_numeric_field() {
        assert_eq!(parse_numeric_field("450"), Some(450));
        assert_eq!(parse_numeric_field(""), Some(0));
        assert_eq!(parse_numeric_field("12g"), None);
        assert_eq!(parse_numeric_field("-5"), None);
        assert_eq!(parse_numeric_field(" 5"), None);
    }

    #[test]
    fn test_draft_keeps_value_on_rejected_input() {
        let mut draft = MealDraft::new();
        assert!(draft.set_field(MealField::Calories, "520"));
        assert!(!draft.set_field(MealField::Calories, "lots"));
        assert_eq!(draft.meal().calories, 520);

        assert!(draft.set_field(MealField::Protein, "31"));
        assert!(draft.set_field(MealField::Name, "  Chicken bowl "));

        let submitted = draft.submit().unwrap();
        assert_eq!(submitted, meal("Chicken bowl", 520, 31));
        assert_eq!(draft, MealDraft::new());
    }

    #[test]
    fn test_submit_requires_name() {
        let mut draft = MealDraft::new();
        draft.set_field(MealField::Calories, "100");
        assert!(draft.submit().is_err());
        assert_eq!(draft.meal().calories, 100);
    }

    #[test]
    fn test_append_and_read_meals() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("meals.jsonl");

        let mut sink = JsonlMealSink::new(&path);
        sink.append(&MealEntry::new("u1", today(), meal("Oats", 300, 10)))
            .unwrap();
        sink.append(&MealEntry::new("u1", today(), meal("Eggs", 200, 18)))
            .unwrap();
        sink.append(&MealEntry::new("u2", today(), meal("Toast", 150, 5)))
            .unwrap();

        let entries = read_meals(&path).unwrap();
        assert_eq!(entries.len(), 3);

        let mine = meals_for_day(&entries, "u1", today());
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].meal.name, "Oats");

        let sums = totals(&mine);
        assert_eq!(
            sums,
            MealTotals {
                meals: 2,
                calories: 500,
                protein: 28
            }
        );
    }

    #[test]
    fn test_read_skips_corrupt_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("meals.jsonl");

        let mut sink = JsonlMealSink::new(&path);
        sink.append(&MealEntry::new("u1", today(), meal("Soup", 250, 12)))
            .unwrap();
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{ truncated\n");
        std::fs::write(&path, contents).unwrap();

        let entries = read_meals(&path).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_read_missing_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let entries = read_meals(&temp_dir.path().join("none.jsonl")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemoryMealSink::default();
        sink.append(&MealEntry::new("guest-id", today(), meal("Apple", 80, 0)))
            .unwrap();
        assert_eq!(totals(&sink.entries).calories, 80);
    }
}
