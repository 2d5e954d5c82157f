//! Append-only history of analyzed clips.

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;

use crate::config::DEFAULT_LOCATION;
use crate::report::Report;

/// `date_time` column format (local time).
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A record about to be appended.
#[derive(Clone, Debug, PartialEq)]
pub struct NewHistoryRecord {
    pub result: String,
    pub confidence: f64,
    pub location: String,
    pub processing_time: f64,
    pub date_time: String,
}

impl NewHistoryRecord {
    /// Record for `report`, stamped with the current local time.
    ///
    /// A blank location falls back to `DEFAULT_LOCATION`.
    pub fn from_report(report: &Report, location: Option<&str>) -> Self {
        let location = location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOCATION);
        Self {
            result: report.result.clone(),
            confidence: report.confidence_percent,
            location: location.to_string(),
            processing_time: report.processing_time_secs,
            date_time: chrono::Local::now().format(DATE_TIME_FORMAT).to_string(),
        }
    }
}

/// A stored record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub result: String,
    pub confidence: f64,
    pub location: String,
    pub processing_time: f64,
    pub date_time: String,
}

pub trait HistoryStore {
    /// Append a record and return its id.
    fn append(&mut self, record: &NewHistoryRecord) -> Result<i64>;

    /// Up to `limit` records, newest first.
    fn recent(&mut self, limit: usize) -> Result<Vec<HistoryRecord>>;
}

pub struct SqliteHistoryStore {
    conn: Connection,
}

impl SqliteHistoryStore {
    /// Open (or create) the database. `file:` URIs are opened in URI mode.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = if db_path.starts_with("file:") {
            Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )?
        } else {
            Connection::open(db_path)?
        };
        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS history (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              result TEXT NOT NULL,
              confidence REAL NOT NULL,
              location TEXT NOT NULL,
              processing_time REAL NOT NULL,
              date_time TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn append(&mut self, record: &NewHistoryRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO history(result, confidence, location, processing_time, date_time)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.result,
                record.confidence,
                record.location,
                record.processing_time,
                record.date_time
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn recent(&mut self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let limit = i64::try_from(limit).map_err(|_| anyhow!("history limit exceeds i64"))?;
        let mut stmt = self.conn.prepare(
            "SELECT id, result, confidence, location, processing_time, date_time
             FROM history ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(HistoryRecord {
                id: row.get(0)?,
                result: row.get(1)?,
                confidence: row.get(2)?,
                location: row.get(3)?,
                processing_time: row.get(4)?,
                date_time: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryHistoryStore {
    records: Vec<HistoryRecord>,
}

impl HistoryStore for InMemoryHistoryStore {
    fn append(&mut self, record: &NewHistoryRecord) -> Result<i64> {
        let id = self.records.last().map_or(1, |r| r.id + 1);
        self.records.push(HistoryRecord {
            id,
            result: record.result.clone(),
            confidence: record.confidence,
            location: record.location.clone(),
            processing_time: record.processing_time,
            date_time: record.date_time.clone(),
        });
        Ok(id)
    }

    fn recent(&mut self, limit: usize) -> Result<Vec<HistoryRecord>> {
        Ok(self.records.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use std::time::Duration;

    fn record(result: &str) -> NewHistoryRecord {
        NewHistoryRecord {
            result: result.to_string(),
            confidence: 91.5,
            location: "Main St".to_string(),
            processing_time: 1.25,
            date_time: "2026-01-01 12:00:00".to_string(),
        }
    }

    #[test]
    fn in_memory_store_lists_newest_first() -> Result<()> {
        let mut store = InMemoryHistoryStore::default();
        assert_eq!(store.append(&record("a"))?, 1);
        assert_eq!(store.append(&record("b"))?, 2);
        assert_eq!(store.append(&record("c"))?, 3);

        let recent = store.recent(2)?;
        let results: Vec<&str> = recent.iter().map(|r| r.result.as_str()).collect();
        assert_eq!(results, vec!["c", "b"]);
        Ok(())
    }

    #[test]
    fn blank_location_uses_default() {
        let mut agg = Aggregator::new();
        agg.record_frame();
        agg.update(0.9);
        let report = Report::from_verdict(&agg.finalize(Duration::from_secs(1)));

        let rec = NewHistoryRecord::from_report(&report, Some("   "));
        assert_eq!(rec.location, DEFAULT_LOCATION);
        assert_eq!(rec.result, "Accident Detected");
        assert_eq!(rec.confidence, 90.0);
        assert!(chrono::NaiveDateTime::parse_from_str(&rec.date_time, DATE_TIME_FORMAT).is_ok());

        let rec = NewHistoryRecord::from_report(&report, Some("Exit 12"));
        assert_eq!(rec.location, "Exit 12");
    }
}
