// crates/crossbridge-store/src/events.rs
// ============================================================================
// Module: Event Persistence Layer (C9)
// Description: Time-partitioned event store with retention pruning.
// Dependencies: crossbridge-core, rusqlite
// ============================================================================

//! ## Overview
//! [`EventStore`] writes every accepted [`ExecutionEvent`] to a single table
//! keyed by `timestamp`, with secondary indexes on `test_id`, `framework`,
//! `event_type`, and `status` (§4.9). Retention is a separate, explicit
//! [`EventStore::prune_before`] call rather than a background timer, matching
//! the coverage graph's opt-in pruning model.

use std::sync::Mutex;

use crossbridge_core::ExecutionEvent;
use rusqlite::Connection;
use rusqlite::params;

use crate::error::StoreError;

/// Default retention window for raw events, in days (§4.9).
pub const DEFAULT_EVENT_RETENTION_DAYS: u64 = 90;

/// Persists execution events to a single `SQLite` table.
pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    /// Opens (creating if absent) an event store database at `path`.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] if the connection or schema setup fails.
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "wal")?;
        conn.pragma_update(None, "synchronous", "normal")?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory event store, used by tests.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] if schema setup fails.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Writes one event immediately, bypassing any batching. The pipeline's
    /// persistence batcher (§4.9: default 50 events or 250 ms, whichever
    /// first) calls [`Self::write_batch`] instead; this method is for tests
    /// and callers that need a single durable write with no batching.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection failure.
    pub fn write(&self, event: &ExecutionEvent) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO events
                (event_id, timestamp, test_id, framework, event_type, status, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.event_id.get().to_string(),
                event.timestamp.to_rfc3339(),
                event.test_id.as_str(),
                event.framework.as_str(),
                format!("{:?}", event.event_type),
                event.status.map(|s| format!("{s:?}")),
                serde_json::to_string(&event).map_err(|e| StoreError::Invalid(e.to_string()))?,
            ],
        )?;
        Ok(())
    }

    /// Writes a batch of events in one transaction, amortizing round-trips
    /// (§4.9: the pipeline's persistence batcher flushes at 50 events or
    /// 250 ms, whichever comes first). Equivalent to calling
    /// [`Self::write`] for each event, but one commit instead of many.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection or transaction failure.
    pub fn write_batch(&self, events: &[ExecutionEvent]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let tx = conn.transaction()?;
        for event in events {
            tx.execute(
                "INSERT OR REPLACE INTO events
                    (event_id, timestamp, test_id, framework, event_type, status, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.event_id.get().to_string(),
                    event.timestamp.to_rfc3339(),
                    event.test_id.as_str(),
                    event.framework.as_str(),
                    format!("{:?}", event.event_type),
                    event.status.map(|s| format!("{s:?}")),
                    serde_json::to_string(event).map_err(|e| StoreError::Invalid(e.to_string()))?,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Loads every persisted event, ordered by timestamp ascending, for
    /// rebuilding in-memory state (flaky history, confidence windows) at
    /// startup.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection failure, or
    /// [`StoreError::Corrupt`] if a stored payload fails to deserialize.
    pub fn load_all_ordered(&self) -> Result<Vec<ExecutionEvent>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT payload FROM events ORDER BY timestamp ASC")?;
        let mut rows = stmt.query([])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            let payload: String = row.get(0)?;
            events.push(serde_json::from_str(&payload).map_err(|e| StoreError::Corrupt(e.to_string()))?);
        }
        Ok(events)
    }

    /// Deletes events older than `retention_days` relative to `now`.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection failure.
    pub fn prune_before(&self, cutoff_rfc3339: &str) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let deleted = conn.execute("DELETE FROM events WHERE timestamp < ?1", params![cutoff_rfc3339])?;
        Ok(deleted as u64)
    }

    /// Counts events currently persisted, used by the `/stats` endpoint.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection failure.
    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// Creates the events table and its secondary indexes if absent.
fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS events (
            event_id TEXT PRIMARY KEY,
            timestamp TEXT NOT NULL,
            test_id TEXT NOT NULL,
            framework TEXT NOT NULL,
            event_type TEXT NOT NULL,
            status TEXT,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_events_test_id ON events (test_id);
        CREATE INDEX IF NOT EXISTS idx_events_framework ON events (framework);
        CREATE INDEX IF NOT EXISTS idx_events_event_type ON events (event_type);
        CREATE INDEX IF NOT EXISTS idx_events_status ON events (status);",
    )?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use super::*;

    fn sample_event() -> ExecutionEvent {
        let raw = serde_json::from_value(serde_json::json!({
            "event_type": "test_end",
            "framework": "pytest",
            "test_id": "tests/test_x.py::test_y",
            "status": "passed",
        }))
        .expect("valid raw event");
        ExecutionEvent::from_wire(raw).expect("normalizes")
    }

    #[test]
    fn write_then_count_reflects_one_event() {
        let store = EventStore::open_in_memory().expect("open store");
        store.write(&sample_event()).expect("write event");
        assert_eq!(store.count().expect("count"), 1);
    }

    #[test]
    fn rewriting_same_event_id_does_not_duplicate_rows() {
        let store = EventStore::open_in_memory().expect("open store");
        let event = sample_event();
        store.write(&event).expect("first write");
        store.write(&event).expect("second write");
        assert_eq!(store.count().expect("count"), 1);
    }

    #[test]
    fn write_batch_commits_every_event_in_one_transaction() {
        let store = EventStore::open_in_memory().expect("open store");
        let events: Vec<_> = (0..3).map(|_| sample_event()).collect();
        store.write_batch(&events).expect("write batch");
        assert_eq!(store.count().expect("count"), 1, "same event_id collapses to one row");
    }

    #[test]
    fn load_all_ordered_round_trips_a_written_event() {
        let store = EventStore::open_in_memory().expect("open store");
        let event = sample_event();
        store.write(&event).expect("write");
        let loaded = store.load_all_ordered().expect("load all");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].event_id, event.event_id);
    }
}
