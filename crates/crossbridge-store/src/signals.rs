// crates/crossbridge-store/src/signals.rs
// ============================================================================
// Module: Drift Signal Log
// Description: Append-only persistence for every DriftSignal emitted by the
//              coverage graph, flaky detector, and confidence monitor.
// Dependencies: crossbridge-core, rusqlite
// ============================================================================

//! ## Overview
//! [`DriftSignalLog`] is the "drift signals table" §6's persistent state
//! layout names: one append-only row per emitted [`DriftSignal`], regardless
//! of which stage raised it. `/stats` and any future drift-review tooling
//! read through here rather than each stage keeping its own history.

use std::sync::Mutex;

use crossbridge_core::DriftSignal;
use rusqlite::Connection;
use rusqlite::params;

use crate::error::StoreError;

/// Default retention window for drift signals, in days (§6
/// `retention.drift_days`).
pub const DEFAULT_DRIFT_RETENTION_DAYS: u64 = 60;

/// Persists every emitted [`DriftSignal`] to a single append-only table.
pub struct DriftSignalLog {
    conn: Mutex<Connection>,
}

impl DriftSignalLog {
    /// Opens (creating if absent) a drift signal log at `path`.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] if the connection or schema setup fails.
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "wal")?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory drift signal log, used by tests.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] if schema setup fails.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Appends one signal. Never mutates or deletes existing rows outside of
    /// [`Self::prune_before`].
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection failure or
    /// [`StoreError::Invalid`] if `signal` cannot be serialized.
    pub fn append(&self, signal: &DriftSignal) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT INTO drift_signals (signal_type, target_id, severity, detected_at, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                format!("{:?}", signal.signal_type),
                signal.target_id.as_str(),
                format!("{:?}", signal.severity),
                signal.detected_at.to_rfc3339(),
                signal.details,
            ],
        )?;
        Ok(())
    }

    /// Deletes signals detected before `cutoff_rfc3339`.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection failure.
    pub fn prune_before(&self, cutoff_rfc3339: &str) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let deleted = conn.execute("DELETE FROM drift_signals WHERE detected_at < ?1", params![cutoff_rfc3339])?;
        Ok(deleted as u64)
    }

    /// Counts signals currently persisted, used by the `/stats` endpoint.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection failure.
    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM drift_signals", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// Creates the drift signals table if absent.
fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS drift_signals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            signal_type TEXT NOT NULL,
            target_id TEXT NOT NULL,
            severity TEXT NOT NULL,
            detected_at TEXT NOT NULL,
            details TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_drift_signals_target ON drift_signals (target_id);
        CREATE INDEX IF NOT EXISTS idx_drift_signals_detected_at ON drift_signals (detected_at);",
    )?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use crossbridge_core::DriftSignalType;
    use crossbridge_core::NodeId;
    use crossbridge_core::Severity;
    use crossbridge_core::Timestamp;

    use super::*;

    fn sample_signal() -> DriftSignal {
        DriftSignal {
            signal_type: DriftSignalType::Flaky,
            target_id: NodeId::new("tests/test_x.py::test_y"),
            severity: Severity::High,
            detected_at: Timestamp::now(),
            details: "transitioned to flaky".to_string(),
        }
    }

    #[test]
    fn append_then_count_reflects_one_signal() {
        let log = DriftSignalLog::open_in_memory().expect("open log");
        log.append(&sample_signal()).expect("append");
        assert_eq!(log.count().expect("count"), 1);
    }

    #[test]
    fn appending_twice_keeps_both_rows() {
        let log = DriftSignalLog::open_in_memory().expect("open log");
        log.append(&sample_signal()).expect("first append");
        log.append(&sample_signal()).expect("second append");
        assert_eq!(log.count().expect("count"), 2, "unlike events, signals are never deduplicated");
    }
}
