// crates/crossbridge-service/src/lib.rs
// ============================================================================
// Crate: crossbridge-service
// Description: Wires every other crate behind the bounded queue (C11) and
//              the axum ingest surface (C10): the one crate that turns a
//              loaded [`crossbridge_config::CrossBridgeConfig`] into a
//              running process.
// ============================================================================

//! ## Overview
//! [`CrossBridgeService::from_config`] opens every durable store, builds the
//! rule registry, spawns the sharded worker pool, and hands back a service
//! that [`CrossBridgeService::serve`] binds and runs to completion — mirroring
//! `McpServer::from_config` / `server.serve().await` at the call site, one
//! layer down in this crate instead of the CLI.

mod error;
mod ingest;
mod pipeline;
mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use crossbridge_ai::AiEnrichmentConfig;
use crossbridge_config::CrossBridgeConfig;
use crossbridge_rules::RuleRegistry;
use crossbridge_store::CoverageGraph;
use crossbridge_store::DriftSignalLog;
use crossbridge_store::EventStore;
use crossbridge_store::SpillLog;
use tokio::net::TcpListener;
use tracing::info;

pub use error::ServiceError;
pub use pipeline::Pipeline;
pub use pipeline::PipelineConfig;
pub use pipeline::PipelineDeadlines;
pub use pipeline::default_worker_count;
pub use stats::Stats;
pub use stats::StatsSnapshot;

/// A fully wired, not-yet-bound CrossBridge service.
pub struct CrossBridgeService {
    pipeline: Arc<Pipeline>,
    host: String,
    port: u16,
    admin_token: Option<String>,
}

impl CrossBridgeService {
    /// Opens every durable store named in `config`, builds the rule
    /// registry and worker pool, and returns a service ready to [`Self::serve`].
    ///
    /// Store paths are derived from `data_dir`: `events.db`, `graph.db`,
    /// `drift.db`, and `spill.ndjson` each live directly under it.
    ///
    /// # Errors
    /// Returns [`ServiceError::Store`] if any durable store fails to open.
    pub fn from_config(config: &CrossBridgeConfig, data_dir: &std::path::Path) -> Result<Self, ServiceError> {
        std::fs::create_dir_all(data_dir)
            .map_err(|source| ServiceError::Bind { addr: data_dir.display().to_string(), source })?;

        let event_store = EventStore::open(&data_dir.join("events.db"))?;
        let graph = CoverageGraph::open(&data_dir.join("graph.db"))?;
        let drift_log = DriftSignalLog::open(&data_dir.join("drift.db"))?;
        let spill = SpillLog::open(data_dir.join("spill.ndjson"))?;
        let rules = RuleRegistry::new(data_dir.join("rules"), config.rule_packs());

        let workers =
            if config.observer.queue.workers == 0 { default_worker_count() } else { config.observer.queue.workers };

        let ai = AiEnrichmentConfig {
            enabled: config.observer.ai.enabled,
            endpoint: config.observer.ai.endpoint.clone(),
            timeout_ms: config.observer.ai.timeout_ms,
            allow_http: config.observer.ai.allow_http,
            allowed_hosts: allowed_hosts_from_config(&config.observer.ai.allowed_hosts),
            allow_private_networks: config.observer.ai.allow_private_networks,
            user_agent: "crossbridge-service".to_string(),
        };

        let pipeline_config = PipelineConfig {
            capacity: config.observer.queue.capacity,
            workers,
            deadlines: PipelineDeadlines::default(),
            artifacts_dir: PathBuf::from(&config.observer.artifacts_dir),
            ai,
        };

        let pipeline = Pipeline::spawn(pipeline_config, event_store, graph, spill, drift_log, rules, Stats::new())?;

        Ok(Self {
            pipeline,
            host: config.observer.api.host.clone(),
            port: config.observer.api.port,
            admin_token: config.observer.api.admin_token.clone(),
        })
    }

    /// Binds `host:port` and serves until the process receives a shutdown
    /// signal, then drains the queue for up to `graceful_seconds` before
    /// returning (§5).
    ///
    /// # Errors
    /// Returns [`ServiceError::Bind`] if the configured address cannot be bound.
    pub async fn serve(self, graceful_seconds: u32) -> Result<(), ServiceError> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServiceError::Bind { addr: addr.clone(), source })?;
        info!(%addr, "crossbridge-service listening");

        let router = ingest::router(Arc::clone(&self.pipeline), self.admin_token.clone());

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|source| ServiceError::Bind { addr, source })?;

        drain_queue(&self.pipeline, std::time::Duration::from_secs(u64::from(graceful_seconds))).await;
        info!("crossbridge-service shut down cleanly");
        Ok(())
    }

    /// The pipeline backing this service, for the CLI's spill-replay and
    /// graph-pruning maintenance commands.
    #[must_use]
    pub fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.pipeline)
    }
}

/// Converts the config crate's plain `Vec<String>` allowlist into the
/// `Option<BTreeSet<String>>` the enrichment stage's policy checks expect;
/// an empty list means "no allowlist configured", matching `AiConfig`'s
/// all-defaults posture.
fn allowed_hosts_from_config(hosts: &[String]) -> Option<std::collections::BTreeSet<String>> {
    if hosts.is_empty() { None } else { Some(hosts.iter().cloned().collect()) }
}

/// Polls queue depth until it drains to zero or `deadline` elapses, then
/// returns either way (§5: "flushes spill log" covers whatever is left).
async fn drain_queue(pipeline: &Pipeline, deadline: std::time::Duration) {
    let started = std::time::Instant::now();
    while pipeline.queue_depth() > 0 {
        if started.elapsed() >= deadline {
            info!(depth = pipeline.queue_depth(), "graceful shutdown deadline reached with events still queued");
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}

/// Resolves once either `SIGINT`/Ctrl+C fires or (on Unix) `SIGTERM` does.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        signal.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn allowed_hosts_from_config_treats_empty_as_unrestricted() {
        assert_eq!(allowed_hosts_from_config(&[]), None);
    }

    #[test]
    fn allowed_hosts_from_config_collects_nonempty_lists() {
        let hosts = vec!["ai.internal".to_string()];
        let resolved = allowed_hosts_from_config(&hosts).expect("non-empty");
        assert!(resolved.contains("ai.internal"));
    }

    #[tokio::test]
    async fn from_config_opens_stores_under_data_dir() {
        let dir = tempdir().expect("tempdir");
        let config = CrossBridgeConfig::default();
        let service = CrossBridgeService::from_config(&config, dir.path()).expect("from_config");
        assert_eq!(service.pipeline().queue_depth(), 0);
    }
}
