// crates/crossbridge-store/src/graph.rs
// ============================================================================
// Module: Coverage Graph Store (C8)
// Description: Append-only upsert graph of tests, features, code units, APIs,
//              pages, and UI components, keyed so re-observation never
//              duplicates rows.
// Dependencies: crossbridge-core, rusqlite
// ============================================================================

//! ## Overview
//! [`CoverageGraph`] wraps a single `SQLite` connection behind a [`Mutex`],
//! matching the teacher's single-writer discipline without its writer-queue
//! machinery (CrossBridge's write volume does not warrant it; see the
//! project's design notes). Every upsert is keyed by `node_id` or
//! `(from_id, to_id, edge_type)`; a second write only bumps `last_seen` and
//! `observation_count` (§4.8's idempotence invariant).

use std::sync::Mutex;

use crossbridge_core::DriftSignal;
use crossbridge_core::DriftSignalType;
use crossbridge_core::ExecutionEvent;
use crossbridge_core::NodeId;
use crossbridge_core::Severity;
use crossbridge_core::Timestamp;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::error::StoreError;

/// The edge kinds the coverage graph records (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeType {
    /// A test called an API endpoint.
    CallsApi,
    /// A test visited a page.
    VisitsPage,
    /// A test touched a UI component.
    TouchesComponent,
    /// A test belongs to a feature.
    BelongsToFeature,
}

impl EdgeType {
    /// Returns the stable wire/storage string for this edge kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CallsApi => "calls_api",
            Self::VisitsPage => "visits_page",
            Self::TouchesComponent => "touches_component",
            Self::BelongsToFeature => "belongs_to_feature",
        }
    }
}

/// Append-only coverage graph: nodes and typed edges, both idempotently upserted.
pub struct CoverageGraph {
    conn: Mutex<Connection>,
}

impl CoverageGraph {
    /// Opens (creating if absent) a coverage graph database at `path`.
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

    /// Opens an in-memory graph, used by tests and single-process demos.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] if schema setup fails.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Upserts a node, bumping `last_seen`/`observation_count` if it already
    /// existed. Returns `true` when this is the node's first observation.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection failure.
    pub fn upsert_node(&self, node_id: &NodeId, node_type: &str, now: Timestamp) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let existing: Option<i64> = conn
            .query_row("SELECT observation_count FROM graph_nodes WHERE node_id = ?1", params![node_id.as_str()], |row| {
                row.get(0)
            })
            .optional()?;

        conn.execute(
            "INSERT INTO graph_nodes (node_id, node_type, first_seen, last_seen, observation_count)
             VALUES (?1, ?2, ?3, ?3, 1)
             ON CONFLICT(node_id) DO UPDATE SET
                last_seen = ?3,
                observation_count = observation_count + 1",
            params![node_id.as_str(), node_type, now.to_rfc3339()],
        )?;

        Ok(existing.is_none())
    }

    /// Upserts an edge, keyed by `(from_id, to_id, edge_type)`.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection failure.
    pub fn upsert_edge(
        &self,
        from_id: &NodeId,
        to_id: &NodeId,
        edge_type: EdgeType,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT INTO graph_edges (from_id, to_id, edge_type, first_seen, last_seen, observation_count)
             VALUES (?1, ?2, ?3, ?4, ?4, 1)
             ON CONFLICT(from_id, to_id, edge_type) DO UPDATE SET
                last_seen = ?4,
                observation_count = observation_count + 1",
            params![from_id.as_str(), to_id.as_str(), edge_type.as_str(), now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Applies one accepted event to the graph per §4.8, returning any
    /// `new_test` [`DriftSignal`] raised.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection failure.
    pub fn record_event(&self, event: &ExecutionEvent) -> Result<Option<DriftSignal>, StoreError> {
        let test_node = NodeId::new(format!("test:{}", event.test_id.as_str()));
        let is_new_test = self.upsert_node(&test_node, "test", event.timestamp)?;

        for endpoint in event.api_calls() {
            let api_node = NodeId::new(format!("api:{endpoint}"));
            self.upsert_node(&api_node, "api", event.timestamp)?;
            self.upsert_edge(&test_node, &api_node, EdgeType::CallsApi, event.timestamp)?;
        }
        for page in event.pages_visited() {
            let page_node = NodeId::new(format!("page:{page}"));
            self.upsert_node(&page_node, "page", event.timestamp)?;
            self.upsert_edge(&test_node, &page_node, EdgeType::VisitsPage, event.timestamp)?;
        }
        for component in event.ui_components() {
            let component_node = NodeId::new(format!("ui_component:{component}"));
            self.upsert_node(&component_node, "ui_component", event.timestamp)?;
            self.upsert_edge(&test_node, &component_node, EdgeType::TouchesComponent, event.timestamp)?;
        }
        if let Some(feature) = event.feature() {
            let feature_node = NodeId::new(format!("feature:{feature}"));
            self.upsert_node(&feature_node, "feature", event.timestamp)?;
            self.upsert_edge(&test_node, &feature_node, EdgeType::BelongsToFeature, event.timestamp)?;
        }

        if is_new_test {
            return Ok(Some(DriftSignal {
                signal_type: DriftSignalType::NewTest,
                target_id: test_node,
                severity: Severity::Moderate,
                detected_at: event.timestamp,
                details: format!("first observation of {}", event.test_id),
            }));
        }
        Ok(None)
    }

    /// Drops edges untouched since `cutoff`, then any node left with no
    /// remaining edges that was also untouched since `cutoff`. An explicit,
    /// operator-invoked maintenance operation (CLI `history prune-graph
    /// --older-than-days N`); never called by the pipeline itself, so the
    /// live graph's retention stays unbounded absent this call.
    ///
    /// # Errors
    /// Returns [`StoreError::Db`] on connection failure.
    pub fn prune_orphans(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let cutoff = cutoff.to_rfc3339();
        let edges = conn.execute("DELETE FROM graph_edges WHERE last_seen < ?1", params![cutoff])?;
        let nodes = conn.execute(
            "DELETE FROM graph_nodes
             WHERE last_seen < ?1
               AND node_id NOT IN (SELECT from_id FROM graph_edges)
               AND node_id NOT IN (SELECT to_id FROM graph_edges)",
            params![cutoff],
        )?;
        Ok((edges + nodes) as u64)
    }
}

/// Creates the coverage graph tables if absent.
fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS graph_nodes (
            node_id TEXT PRIMARY KEY,
            node_type TEXT NOT NULL,
            first_seen TEXT NOT NULL,
            last_seen TEXT NOT NULL,
            observation_count INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS graph_edges (
            from_id TEXT NOT NULL,
            to_id TEXT NOT NULL,
            edge_type TEXT NOT NULL,
            first_seen TEXT NOT NULL,
            last_seen TEXT NOT NULL,
            observation_count INTEGER NOT NULL,
            PRIMARY KEY (from_id, to_id, edge_type)
        );",
    )?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use super::*;

    #[test]
    fn upserting_the_same_node_twice_bumps_observation_count_not_rows() {
        let graph = CoverageGraph::open_in_memory().expect("open graph");
        let node = NodeId::new("test:t1");
        assert!(graph.upsert_node(&node, "test", Timestamp::now()).expect("first upsert"));
        assert!(!graph.upsert_node(&node, "test", Timestamp::now()).expect("second upsert"));

        let conn = graph.conn.lock().expect("lock");
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM graph_nodes", [], |row| row.get(0)).expect("count rows");
        assert_eq!(count, 1);
    }

    #[test]
    fn new_test_raises_drift_signal_only_on_first_observation() {
        let graph = CoverageGraph::open_in_memory().expect("open graph");
        let raw = serde_json::from_value(serde_json::json!({
            "event_type": "test_end",
            "framework": "pytest",
            "test_id": "tests/test_x.py::test_y",
            "status": "passed",
        }))
        .expect("valid raw event");
        let event = ExecutionEvent::from_wire(raw).expect("normalizes");

        let first = graph.record_event(&event).expect("record first event");
        assert!(first.is_some());
        let second = graph.record_event(&event).expect("record second event");
        assert!(second.is_none());
    }

    #[test]
    fn prune_orphans_drops_only_untouched_edgeless_nodes() {
        let graph = CoverageGraph::open_in_memory().expect("open graph");
        let stale = NodeId::new("test:stale");
        let fresh = NodeId::new("test:fresh");
        graph.upsert_node(&stale, "test", Timestamp::parse("2020-01-01T00:00:00Z").expect("parse")).expect("upsert stale");
        graph.upsert_node(&fresh, "test", Timestamp::now()).expect("upsert fresh");

        let deleted = graph.prune_orphans(Timestamp::now()).expect("prune");
        assert_eq!(deleted, 1);

        let conn = graph.conn.lock().expect("lock");
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM graph_nodes", [], |row| row.get(0)).expect("count rows");
        assert_eq!(count, 1, "only the fresh node should remain");
    }
}
