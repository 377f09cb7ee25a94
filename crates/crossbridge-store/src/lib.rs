// crates/crossbridge-store/src/lib.rs
// ============================================================================
// Crate: crossbridge-store
// Description: Coverage graph store (C8) and event persistence (C9),
//              including the local spill log C9 uses to survive a down store.
// ============================================================================

//! Durable storage for the observability pipeline: an append-only, upsert
//! [`graph::CoverageGraph`] (C8) and a time-partitioned [`events::EventStore`]
//! (C9), both backed by a single `SQLite` connection per store rather than
//! the teacher's multi-connection writer gateway — CrossBridge's expected
//! write volume does not warrant that complexity (see the project's
//! grounding ledger). [`spill::SpillLog`] dead-letters events a down
//! `EventStore` rejected so ingest never blocks on storage.

mod error;
mod events;
mod graph;
mod signals;
mod spill;

pub use error::StoreError;
pub use events::DEFAULT_EVENT_RETENTION_DAYS;
pub use events::EventStore;
pub use graph::CoverageGraph;
pub use graph::EdgeType;
pub use signals::DEFAULT_DRIFT_RETENTION_DAYS;
pub use signals::DriftSignalLog;
pub use spill::SpillLog;
