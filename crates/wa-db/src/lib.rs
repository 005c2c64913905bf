//! Storage layer for workflow archaeology.
//!
//! Persists already-recorded time entries (the input to gap detection) and
//! the audit trail of reconstructions, using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! Dates are stored as TEXT `YYYY-MM-DD`; instants as RFC 3339 TEXT with
//! millisecond precision (e.g. `2025-01-15T10:30:00.000Z`), so lexicographic
//! order matches chronological order. Reconstruction results are stored as
//! their full JSON document.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use thiserror::Error;
use uuid::Uuid;
use wa_core::gaps::{RecordedEntry, TimeEntryStore};
use wa_core::store::{ReconstructionRecord, ReconstructionStore};
use wa_core::{Confidence, DateRange, MatterId, UserId, ValidationError};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to encode or decode a stored JSON document.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A stored date or timestamp did not parse.
    #[error("invalid date {value}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored value failed domain validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A stored value is outside its known set.
    #[error("invalid stored value for {field}: {value}")]
    InvalidData { field: &'static str, value: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub recorded_entries: u64,
    pub reconstructions: u64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Time already recorded by the attorney; input to gap detection.
            -- date: 'YYYY-MM-DD'
            CREATE TABLE IF NOT EXISTS recorded_entries (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                hours REAL NOT NULL,
                matter_id TEXT,
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_recorded_entries_date ON recorded_entries(date);
            CREATE INDEX IF NOT EXISTS idx_recorded_entries_matter ON recorded_entries(matter_id);

            -- Audit trail of reconstructions.
            -- result: full reconstruction JSON
            CREATE TABLE IF NOT EXISTS reconstructions (
                id TEXT PRIMARY KEY,
                recorded_at TEXT NOT NULL,
                user_id TEXT,
                period_start TEXT NOT NULL,
                period_end TEXT NOT NULL,
                aggregate_confidence TEXT NOT NULL,
                event_count INTEGER NOT NULL,
                artifact_count INTEGER NOT NULL,
                result TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reconstructions_recorded ON reconstructions(recorded_at);
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of recorded entries in one transaction.
    pub fn insert_recorded_entries(&mut self, entries: &[RecordedEntry]) -> Result<usize, DbError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let created_at = format_timestamp(Utc::now());
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO recorded_entries (id, date, hours, matter_id, description, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )?;
            for entry in entries {
                inserted += stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    entry.date.to_string(),
                    entry.hours,
                    entry.matter_id.as_ref().map(MatterId::as_str),
                    entry.description,
                    created_at,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(inserted, "recorded entries stored");
        Ok(inserted)
    }

    /// Lists recorded entries dated inside `range`, ordered by date then insertion.
    pub fn list_recorded_entries(
        &self,
        range: &DateRange,
        matter_id: Option<&MatterId>,
    ) -> Result<Vec<RecordedEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT date, hours, matter_id, description
            FROM recorded_entries
            WHERE date >= ?1 AND date <= ?2 AND (?3 IS NULL OR matter_id = ?3)
            ORDER BY date ASC, rowid ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                range.start().to_string(),
                range.end().to_string(),
                matter_id.map(MatterId::as_str),
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )?;

        let mut entries = Vec::new();
        for row in rows {
            let (date, hours, matter_id, description) = row?;
            entries.push(RecordedEntry {
                date: parse_date(&date)?,
                hours,
                matter_id: matter_id.map(MatterId::new).transpose()?,
                description,
            });
        }
        Ok(entries)
    }

    /// Stores one reconstruction audit record.
    pub fn insert_reconstruction(&self, record: &ReconstructionRecord) -> Result<String, DbError> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "
            INSERT INTO reconstructions
            (id, recorded_at, user_id, period_start, period_end, aggregate_confidence,
             event_count, artifact_count, result)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                id,
                format_timestamp(Utc::now()),
                record.user_id.as_ref().map(UserId::as_str),
                format_timestamp(record.period_start),
                format_timestamp(record.period_end),
                record.aggregate_confidence.as_str(),
                count_to_sql(record.event_count),
                count_to_sql(record.artifact_count),
                serde_json::to_string(&record.result)?,
            ],
        )?;
        Ok(id)
    }

    /// Lists the most recent reconstructions, newest first.
    pub fn list_reconstructions(&self, limit: usize) -> Result<Vec<ReconstructionRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT user_id, period_start, period_end, aggregate_confidence,
                   event_count, artifact_count, result
            FROM reconstructions
            ORDER BY recorded_at DESC, rowid DESC
            LIMIT ?
            ",
        )?;
        let rows = stmt.query_map([count_to_sql(limit)], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (user_id, start, end, confidence, events, artifacts, result) = row?;
            records.push(ReconstructionRecord {
                user_id: user_id.map(UserId::new).transpose()?,
                period_start: parse_timestamp(&start)?,
                period_end: parse_timestamp(&end)?,
                aggregate_confidence: parse_confidence(&confidence)?,
                event_count: count_from_sql(events),
                artifact_count: count_from_sql(artifacts),
                result: serde_json::from_str(&result)?,
            });
        }
        Ok(records)
    }

    /// Row counts for status reporting.
    pub fn counts(&self) -> Result<TableCounts, DbError> {
        let count = |table: &str| -> Result<u64, DbError> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(u64::try_from(n).unwrap_or(0))
        };
        Ok(TableCounts {
            recorded_entries: count("recorded_entries")?,
            reconstructions: count("reconstructions")?,
        })
    }
}

impl TimeEntryStore for Database {
    type Error = DbError;

    fn list_recorded(
        &self,
        range: &DateRange,
        matter_id: Option<&MatterId>,
    ) -> Result<Vec<RecordedEntry>, Self::Error> {
        self.list_recorded_entries(range, matter_id)
    }
}

impl ReconstructionStore for Database {
    type Error = DbError;

    fn record(&self, record: &ReconstructionRecord) -> Result<(), Self::Error> {
        self.insert_reconstruction(record).map(|_| ())
    }

    fn recent(&self, limit: usize) -> Result<Vec<ReconstructionRecord>, Self::Error> {
        self.list_reconstructions(limit)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, DbError> {
    value
        .parse::<NaiveDate>()
        .map_err(|source| DbError::InvalidDate {
            value: value.to_string(),
            source,
        })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::InvalidDate {
            value: value.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_confidence(value: &str) -> Result<Confidence, DbError> {
    match value {
        "low" => Ok(Confidence::Low),
        "medium" => Ok(Confidence::Medium),
        "high" => Ok(Confidence::High),
        other => Err(DbError::InvalidData {
            field: "aggregate_confidence",
            value: other.to_string(),
        }),
    }
}

fn count_to_sql(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn count_from_sql(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wa_core::gaps::{FixedBaseline, GapKind, GapOptions, identify_gaps_from_store};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn entry(d: u32, hours: f64, matter: Option<&str>) -> RecordedEntry {
        RecordedEntry {
            date: date(d),
            hours,
            matter_id: matter.map(|m| MatterId::new(m).unwrap()),
            description: "Research".to_string(),
        }
    }

    fn record(artifacts: usize) -> ReconstructionRecord {
        ReconstructionRecord {
            user_id: Some(UserId::new("jdoe").unwrap()),
            period_start: Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap(),
            period_end: Utc.with_ymd_and_hms(2025, 1, 16, 0, 0, 0).unwrap(),
            aggregate_confidence: Confidence::Medium,
            event_count: 1,
            artifact_count: artifacts,
            result: json!({"granularity": "day"}),
        }
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(
            table_columns(&db.conn, "recorded_entries"),
            vec!["id", "date", "hours", "matter_id", "description", "created_at"]
        );
        assert_eq!(
            table_columns(&db.conn, "reconstructions"),
            vec![
                "id",
                "recorded_at",
                "user_id",
                "period_start",
                "period_end",
                "aggregate_confidence",
                "event_count",
                "artifact_count",
                "result",
            ]
        );
    }

    #[test]
    fn recorded_entries_filter_by_range_and_matter() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let inserted = db
            .insert_recorded_entries(&[
                entry(2, 1.5, Some("M-1")),
                entry(1, 2.0, None),
                entry(2, 3.0, Some("M-2")),
                entry(5, 8.0, Some("M-1")),
            ])
            .unwrap();
        assert_eq!(inserted, 4);

        let range = DateRange::new(date(1), date(3)).unwrap();
        let all = db.list_recorded_entries(&range, None).unwrap();
        let dates: Vec<NaiveDate> = all.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date(1), date(2), date(2)]);

        let matter = MatterId::new("M-1").unwrap();
        let filtered = db.list_recorded_entries(&range, Some(&matter)).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].matter_id.as_ref(), Some(&matter));
    }

    #[test]
    fn gap_detection_reads_from_database() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.insert_recorded_entries(&[entry(2, 8.0, None), entry(3, 2.0, None)])
            .unwrap();

        let range = DateRange::new(date(1), date(3)).unwrap();
        let baseline = FixedBaseline::new(8.0).unwrap();
        let report =
            identify_gaps_from_store(&db, &range, &GapOptions::default(), &baseline).unwrap();

        assert_eq!(report.gaps.len(), 2);
        assert_eq!(report.gaps[0].kind, GapKind::Missing);
        assert_eq!(report.gaps[1].kind, GapKind::UnderRecorded);
    }

    #[test]
    fn reconstructions_are_listed_newest_first() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.record(&record(1)).unwrap();
        db.record(&record(7)).unwrap();

        let recent = db.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].artifact_count, 7);
        assert_eq!(recent[0].aggregate_confidence, Confidence::Medium);
        assert_eq!(recent[0].result["granularity"], "day");
        assert_eq!(recent[1], record(1));

        assert_eq!(db.recent(1).unwrap().len(), 1);
    }

    #[test]
    fn counts_track_both_tables() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.insert_recorded_entries(&[entry(1, 1.0, None)]).unwrap();
        db.record(&record(2)).unwrap();

        assert_eq!(
            db.counts().unwrap(),
            TableCounts {
                recorded_entries: 1,
                reconstructions: 1,
            }
        );
    }

    #[test]
    fn data_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wa.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.insert_recorded_entries(&[entry(1, 1.0, None)]).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.counts().unwrap().recorded_entries, 1);
    }

    #[test]
    fn unknown_confidence_is_invalid_data() {
        assert!(matches!(
            parse_confidence("certain"),
            Err(DbError::InvalidData { .. })
        ));
    }
}
