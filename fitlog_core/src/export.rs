//! CSV export of a user's daily metric history.

use crate::store::RecordStore;
use crate::{MetricRow, Result};
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    steps: Option<u32>,
    workout_completed: bool,
    total_reps: Option<u64>,
}

impl From<&MetricRow> for CsvRow {
    fn from(row: &MetricRow) -> Self {
        CsvRow {
            date: row.date.format("%Y-%m-%d").to_string(),
            steps: row.steps,
            workout_completed: row.workout_completed,
            total_reps: row.workout_logs.as_ref().map(|log| log.total_reps()),
        }
    }
}

/// Write every row for `user_id` to a CSV file, oldest date first
///
/// The file is replaced if it exists. Returns the number of rows written.
pub fn export_history_csv<S: RecordStore + ?Sized>(
    store: &S,
    user_id: &str,
    out_path: &Path,
) -> Result<usize> {
    let mut rows = store.list_for_user(user_id)?;
    rows.reverse();

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(out_path)?;
    for row in &rows {
        writer.serialize(CsvRow::from(row))?;
    }
    writer.flush()?;

    tracing::info!("Exported {} rows for {} to {:?}", rows.len(), user_id, out_path);
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{record_day_metrics, upsert_daily_log, MemoryRecordStore};
    use crate::{DailyLog, LoggedExercise, LoggedWorkout};
    use chrono::NaiveDate;

    #[test]
    fn test_export_writes_rows_oldest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let out = temp_dir.path().join("exports").join("history.csv");
        let d = |day| NaiveDate::from_ymd_opt(2024, 8, day).unwrap();

        let mut store = MemoryRecordStore::new();
        record_day_metrics(&mut store, "u1", d(2), Some(6000), Some(true)).unwrap();
        record_day_metrics(&mut store, "u1", d(1), Some(3000), Some(false)).unwrap();
        upsert_daily_log(
            &mut store,
            "u1",
            &DailyLog {
                date: d(2),
                workouts: vec![LoggedWorkout {
                    title: "Lower Body (Knee-Friendly)".into(),
                    exercises: vec![LoggedExercise {
                        name: "Glute bridges".into(),
                        sets: vec![15, 15, 12],
                    }],
                }],
            },
        )
        .unwrap();
        record_day_metrics(&mut store, "u2", d(1), Some(1), None).unwrap();

        let count = export_history_csv(&store, "u1", &out).unwrap();
        assert_eq!(count, 2);

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["date", "steps", "workout_completed", "total_reps"]
        );
        let records: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&records[0][0], "2024-08-01");
        assert_eq!(&records[0][3], "");
        assert_eq!(&records[1][0], "2024-08-02");
        assert_eq!(&records[1][1], "6000");
        assert_eq!(&records[1][2], "true");
        assert_eq!(&records[1][3], "42");
    }

    #[test]
    fn test_export_large_rep_totals() {
        let temp_dir = tempfile::tempdir().unwrap();
        let out = temp_dir.path().join("history.csv");
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        let mut store = MemoryRecordStore::new();
        upsert_daily_log(
            &mut store,
            "u1",
            &DailyLog {
                date,
                workouts: vec![LoggedWorkout {
                    title: "Upper Body (Push Focus)".into(),
                    exercises: vec![LoggedExercise {
                        name: "Push-ups".into(),
                        sets: vec![u32::MAX, u32::MAX, 0],
                    }],
                }],
            },
        )
        .unwrap();

        assert_eq!(export_history_csv(&store, "u1", &out).unwrap(), 1);

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[3], "8589934590");
    }

    #[test]
    fn test_export_empty_history() {
        let temp_dir = tempfile::tempdir().unwrap();
        let out = temp_dir.path().join("history.csv");

        let count = export_history_csv(&MemoryRecordStore::new(), "u1", &out).unwrap();
        assert_eq!(count, 0);
        assert!(out.exists());
    }
}
