// SPDX-License-Identifier: MIT OR Apache-2.0
//! Append-only export audit trail, backed by a bundled SQLite file.
//!
//! Exports are compliance-sensitive: once issued, a record is never updated
//! or deleted, only inserted and read. `rusqlite` gives a single-file,
//! dependency-light store for that append-only log without standing up a
//! separate database service.

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;
use vb_core::ExportRecord;

/// Errors raised by the audit store.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The underlying SQLite operation failed.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Append-only store of issued [`ExportRecord`]s.
pub struct AuditStore {
    conn: Connection,
}

impl AuditStore {
    /// Open (creating if necessary) the audit database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS export_audit (
                export_id     TEXT PRIMARY KEY,
                ctx_id        TEXT NOT NULL,
                pilot_id      TEXT NOT NULL,
                artifact_hash TEXT NOT NULL,
                signature     TEXT NOT NULL,
                issued_at     TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS export_audit (
                export_id     TEXT PRIMARY KEY,
                ctx_id        TEXT NOT NULL,
                pilot_id      TEXT NOT NULL,
                artifact_hash TEXT NOT NULL,
                signature     TEXT NOT NULL,
                issued_at     TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    /// Append a new export record. Never updates an existing row: a
    /// duplicate `export_id` is a programming error, surfaced as a
    /// constraint-violation [`AuditError`].
    pub fn record(&self, record: &ExportRecord) -> Result<(), AuditError> {
        self.conn.execute(
            "INSERT INTO export_audit (export_id, ctx_id, pilot_id, artifact_hash, signature, issued_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                record.export_id,
                record.ctx_id,
                record.pilot_id,
                record.artifact_hash,
                record.signature,
                record.issued_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a previously recorded export by id.
    pub fn get(&self, export_id: &str) -> Result<Option<ExportRecord>, AuditError> {
        let mut stmt = self.conn.prepare(
            "SELECT export_id, ctx_id, pilot_id, artifact_hash, signature, issued_at
             FROM export_audit WHERE export_id = ?1",
        )?;
        let mut rows = stmt.query(rusqlite::params![export_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        Ok(Some(ExportRecord {
            export_id: row.get(0)?,
            ctx_id: row.get(1)?,
            pilot_id: row.get(2)?,
            artifact_hash: row.get(3)?,
            signature: row.get(4)?,
            issued_at: {
                let raw: String = row.get(5)?;
                chrono::DateTime::parse_from_rfc3339(&raw)
                    .map(|d| d.with_timezone(&chrono::Utc))
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
            },
        }))
    }

    /// Count every export ever recorded for a pilot, for audit reporting.
    pub fn count_for_pilot(&self, pilot_id: &str) -> Result<u64, AuditError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM export_audit WHERE pilot_id = ?1",
            rusqlite::params![pilot_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(export_id: &str) -> ExportRecord {
        ExportRecord {
            export_id: export_id.into(),
            artifact_hash: "deadbeef".into(),
            signature: "sig".into(),
            issued_at: Utc::now(),
            ctx_id: "ctx-1".into(),
            pilot_id: "P1".into(),
        }
    }

    #[test]
    fn records_round_trip_through_get() {
        let store = AuditStore::open_in_memory().unwrap();
        store.record(&sample("exp-1")).unwrap();
        let fetched = store.get("exp-1").unwrap().unwrap();
        assert_eq!(fetched.artifact_hash, "deadbeef");
    }

    #[test]
    fn duplicate_export_id_is_rejected() {
        let store = AuditStore::open_in_memory().unwrap();
        store.record(&sample("exp-1")).unwrap();
        assert!(store.record(&sample("exp-1")).is_err());
    }

    #[test]
    fn counts_exports_per_pilot() {
        let store = AuditStore::open_in_memory().unwrap();
        store.record(&sample("exp-1")).unwrap();
        store.record(&sample("exp-2")).unwrap();
        assert_eq!(store.count_for_pilot("P1").unwrap(), 2);
    }
}
