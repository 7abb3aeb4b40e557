//! Record store access for per-user, per-date metric rows.
//!
//! The store is the single authoritative source for saved workout logs,
//! step counts and completion flags. Callers receive it by reference and
//! never construct their own client.

use crate::{DailyLog, Error, MetricRecord, MetricRow, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Row-per-(user, date) table operations
pub trait RecordStore {
    /// Select the row for (user, date), if any
    fn find_by_date(&self, user_id: &str, date: NaiveDate) -> Result<Option<MetricRow>>;

    /// Select every row for the user, most recent date first
    fn list_for_user(&self, user_id: &str) -> Result<Vec<MetricRow>>;

    /// Insert a new row; (user, date) must not exist yet
    fn insert(&mut self, row: MetricRow) -> Result<()>;

    /// Replace the row with the same id
    fn update(&mut self, row: &MetricRow) -> Result<()>;
}

/// Whether an upsert created or replaced a row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Write the whole daily log for (user, log.date)
///
/// Updates the existing row by id when there is one, inserts otherwise.
/// Steps and completion flag on an existing row are left untouched.
pub fn upsert_daily_log<S: RecordStore + ?Sized>(
    store: &mut S,
    user_id: &str,
    log: &DailyLog,
) -> Result<UpsertOutcome> {
    let existing = store
        .find_by_date(user_id, log.date)
        .map_err(|e| Error::Persist(format!("checking for existing row: {}", e)))?;

    match existing {
        Some(mut row) => {
            row.workout_logs = Some(log.clone());
            store.update(&row)?;
            tracing::info!("Updated workout log for {} on {}", user_id, log.date);
            Ok(UpsertOutcome::Updated)
        }
        None => {
            let mut row = MetricRow::new(user_id, log.date);
            row.workout_logs = Some(log.clone());
            store.insert(row)?;
            tracing::info!("Inserted workout log for {} on {}", user_id, log.date);
            Ok(UpsertOutcome::Inserted)
        }
    }
}

/// Record steps and/or the completion flag for a date
///
/// Fields passed as `None` keep their stored value; the saved workout log
/// is never touched.
pub fn record_day_metrics<S: RecordStore + ?Sized>(
    store: &mut S,
    user_id: &str,
    date: NaiveDate,
    steps: Option<u32>,
    workout_completed: Option<bool>,
) -> Result<UpsertOutcome> {
    let existing = store
        .find_by_date(user_id, date)
        .map_err(|e| Error::Persist(format!("checking for existing row: {}", e)))?;

    let (mut row, outcome) = match existing {
        Some(row) => (row, UpsertOutcome::Updated),
        None => (MetricRow::new(user_id, date), UpsertOutcome::Inserted),
    };

    if let Some(steps) = steps {
        row.steps = Some(steps);
    }
    if let Some(completed) = workout_completed {
        row.workout_completed = completed;
    }

    match outcome {
        UpsertOutcome::Updated => store.update(&row)?,
        UpsertOutcome::Inserted => store.insert(row)?,
    }

    tracing::info!("Recorded metrics for {} on {} ({:?})", user_id, date, outcome);
    Ok(outcome)
}

/// Load the user's history as insight records, most recent first
pub fn load_metric_records<S: RecordStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<Vec<MetricRecord>> {
    let rows = store.list_for_user(user_id)?;
    Ok(rows.iter().map(MetricRow::to_record).collect())
}

fn sort_newest_first(rows: &mut [MetricRow]) {
    rows.sort_by(|a, b| b.date.cmp(&a.date));
}

fn check_insert(rows: &[MetricRow], row: &MetricRow) -> Result<()> {
    if rows
        .iter()
        .any(|r| r.user_id == row.user_id && r.date == row.date)
    {
        return Err(Error::Persist(format!(
            "row for {} on {} already exists",
            row.user_id, row.date
        )));
    }
    Ok(())
}

fn apply_update(rows: &mut [MetricRow], row: &MetricRow) -> Result<()> {
    let slot = rows
        .iter_mut()
        .find(|r| r.id == row.id)
        .ok_or_else(|| Error::Persist(format!("no row with id {}", row.id)))?;
    *slot = row.clone();
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

/// Store that keeps rows in memory only
///
/// Used for guest sessions, where nothing may outlive the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryRecordStore {
    rows: Vec<MetricRow>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn find_by_date(&self, user_id: &str, date: NaiveDate) -> Result<Option<MetricRow>> {
        Ok(self
            .rows
            .iter()
            .find(|r| r.user_id == user_id && r.date == date)
            .cloned())
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<MetricRow>> {
        let mut rows: Vec<_> = self
            .rows
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    fn insert(&mut self, row: MetricRow) -> Result<()> {
        check_insert(&self.rows, &row)?;
        self.rows.push(row);
        Ok(())
    }

    fn update(&mut self, row: &MetricRow) -> Result<()> {
        apply_update(&mut self.rows, row)
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Store backed by a single JSON table file with file locking
///
/// Reads take a shared lock on the table. Writes hold an exclusive lock
/// on a sidecar `.lock` file for the whole read-modify-write cycle and
/// replace the table atomically.
pub struct JsonFileRecordStore {
    path: PathBuf,
}

impl JsonFileRecordStore {
    /// Create a store for the given table path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn read_rows(&self) -> Result<Vec<MetricRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<MetricRow> = serde_json::from_str(&contents)?;
        tracing::debug!("Read {} rows from {:?}", rows.len(), self.path);
        Ok(rows)
    }

    fn write_rows(&self, rows: &[MetricRow]) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "table path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(rows)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        tracing::debug!("Wrote {} rows to {:?}", rows.len(), self.path);
        Ok(())
    }

    /// Run a read-modify-write cycle under the exclusive write lock
    fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<MetricRow>) -> Result<()>,
    {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(self.lock_path())?;
        lock.lock_exclusive()?;

        let result = self.read_rows().and_then(|mut rows| {
            f(&mut rows)?;
            self.write_rows(&rows)
        });

        lock.unlock()?;
        result
    }
}

fn as_fetch(e: Error) -> Error {
    match e {
        Error::Fetch(_) => e,
        other => Error::Fetch(other.to_string()),
    }
}

fn as_persist(e: Error) -> Error {
    match e {
        Error::Persist(_) => e,
        other => Error::Persist(other.to_string()),
    }
}

impl RecordStore for JsonFileRecordStore {
    fn find_by_date(&self, user_id: &str, date: NaiveDate) -> Result<Option<MetricRow>> {
        let rows = self.read_rows().map_err(as_fetch)?;
        Ok(rows
            .into_iter()
            .find(|r| r.user_id == user_id && r.date == date))
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<MetricRow>> {
        let mut rows: Vec<_> = self
            .read_rows()
            .map_err(as_fetch)?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    fn insert(&mut self, row: MetricRow) -> Result<()> {
        self.modify(|rows| {
            check_insert(rows, &row)?;
            rows.push(row);
            Ok(())
        })
        .map_err(as_persist)
    }

    fn update(&mut self, row: &MetricRow) -> Result<()> {
        self.modify(|rows| apply_update(rows, row))
            .map_err(as_persist)
    }
}

/// Store whose every call fails, for exercising error paths
#[cfg(test)]
pub(crate) struct FailingStore;

#[cfg(test)]
impl RecordStore for FailingStore {
    fn find_by_date(&self, _user_id: &str, _date: NaiveDate) -> Result<Option<MetricRow>> {
        Err(Error::Fetch("store unavailable".into()))
    }

    fn list_for_user(&self, _user_id: &str) -> Result<Vec<MetricRow>> {
        Err(Error::Fetch("store unavailable".into()))
    }

    fn insert(&mut self, _row: MetricRow) -> Result<()> {
        Err(Error::Persist("store unavailable".into()))
    }

    fn update(&mut self, _row: &MetricRow) -> Result<()> {
        Err(Error::Persist("store unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LoggedExercise, LoggedWorkout};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn sample_log(day: u32, reps: u32) -> DailyLog {
        DailyLog {
            date: date(day),
            workouts: vec![LoggedWorkout {
                title: "Full Body Workout".into(),
                exercises: vec![LoggedExercise {
                    name: "Burpees".into(),
                    sets: vec![reps, 0, 0],
                }],
            }],
        }
    }

    #[test]
    fn test_upsert_inserts_then_updates_same_row() {
        let mut store = MemoryRecordStore::new();

        let first = upsert_daily_log(&mut store, "u1", &sample_log(3, 5)).unwrap();
        assert_eq!(first, UpsertOutcome::Inserted);
        let id = store.find_by_date("u1", date(3)).unwrap().unwrap().id;

        let second = upsert_daily_log(&mut store, "u1", &sample_log(3, 8)).unwrap();
        assert_eq!(second, UpsertOutcome::Updated);
        assert_eq!(store.len(), 1);

        let row = store.find_by_date("u1", date(3)).unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.workout_logs.unwrap().workouts[0].exercises[0].sets[0], 8);
    }

    #[test]
    fn test_record_metrics_preserves_workout_log() {
        let mut store = MemoryRecordStore::new();
        upsert_daily_log(&mut store, "u1", &sample_log(3, 5)).unwrap();

        let outcome = record_day_metrics(&mut store, "u1", date(3), Some(9000), Some(true)).unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let row = store.find_by_date("u1", date(3)).unwrap().unwrap();
        assert_eq!(row.steps, Some(9000));
        assert!(row.workout_completed);
        assert!(row.workout_logs.is_some());

        // Omitted fields keep their values
        record_day_metrics(&mut store, "u1", date(3), None, Some(false)).unwrap();
        let row = store.find_by_date("u1", date(3)).unwrap().unwrap();
        assert_eq!(row.steps, Some(9000));
        assert!(!row.workout_completed);
    }

    #[test]
    fn test_list_is_per_user_and_newest_first() {
        let mut store = MemoryRecordStore::new();
        record_day_metrics(&mut store, "u1", date(1), Some(100), None).unwrap();
        record_day_metrics(&mut store, "u1", date(5), Some(500), None).unwrap();
        record_day_metrics(&mut store, "u2", date(4), Some(400), None).unwrap();
        record_day_metrics(&mut store, "u1", date(3), Some(300), None).unwrap();

        let records = load_metric_records(&store, "u1").unwrap();
        let steps: Vec<_> = records.iter().map(|r| r.steps).collect();
        assert_eq!(steps, vec![500, 300, 100]);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut store = MemoryRecordStore::new();
        store.insert(MetricRow::new("u1", date(2))).unwrap();
        let err = store.insert(MetricRow::new("u1", date(2))).unwrap_err();
        assert!(matches!(err, Error::Persist(_)));
    }

    #[test]
    fn test_update_unknown_id_rejected() {
        let mut store = MemoryRecordStore::new();
        let err = store.update(&MetricRow::new("u1", date(2))).unwrap_err();
        assert!(matches!(err, Error::Persist(_)));
    }

    #[test]
    fn test_upsert_reports_fetch_failure_as_persist() {
        let mut store = FailingStore;
        let err = upsert_daily_log(&mut store, "u1", &sample_log(3, 1)).unwrap_err();
        assert!(matches!(err, Error::Persist(_)));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("user_metrics.json");

        let mut store = JsonFileRecordStore::new(&path);
        assert!(store.list_for_user("u1").unwrap().is_empty());

        upsert_daily_log(&mut store, "u1", &sample_log(7, 12)).unwrap();
        record_day_metrics(&mut store, "u1", date(6), Some(4200), Some(true)).unwrap();

        // A fresh handle sees the same data
        let reopened = JsonFileRecordStore::new(&path);
        let rows = reopened.list_for_user("u1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(7));
        assert_eq!(rows[1].steps, Some(4200));

        let saved = reopened.find_by_date("u1", date(7)).unwrap().unwrap();
        assert_eq!(saved.workout_logs, Some(sample_log(7, 12)));
    }

    #[test]
    fn test_file_store_corrupt_table_is_fetch_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("user_metrics.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileRecordStore::new(&path);
        let err = store.list_for_user("u1").unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[test]
    fn test_file_store_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("user_metrics.json");

        let mut store = JsonFileRecordStore::new(&path);
        record_day_metrics(&mut store, "u1", date(1), Some(1), None).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name != "user_metrics.json" && name != "user_metrics.lock")
            .collect();
        assert!(extras.is_empty(), "unexpected files: {:?}", extras);
    }
}
