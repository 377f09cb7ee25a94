// crates/crossbridge-service/src/pipeline.rs
// ============================================================================
// Module: Processing Pipeline (C11)
// Description: A bounded, sharded queue feeding a fixed worker pool; each
//              worker runs the full per-event stage sequence §4.11 defines.
// Dependencies: every other crossbridge-* crate, tokio
// ============================================================================

//! ## Overview
//! [`Pipeline::submit`] hashes `test_id` to pick one of `N` shards (§5's
//! ordering guarantee: same `(test_id, run_id)` always lands on the same
//! worker, so arrival order is preserved for that pair) and does a
//! non-blocking `try_send`; a full shard returns [`ServiceError::RateLimited`]
//! immediately rather than blocking the HTTP handler. Each worker then runs
//! persistence, graph update, and — for failing `test_end` events —
//! extraction, classification, explanation, flaky history, and drift
//! monitoring, each isolated from the others per §4.11's stage-failure
//! semantics: a stage error is logged and only that stage is skipped.
//!
//! [`Pipeline::spawn`] also starts two housekeeping tasks alongside the
//! worker pool: a persistence batcher that amortizes `EventStore` writes
//! (§4.9), and a spill-log retrier that drains dead-lettered events back
//! onto the live queue on a fixed interval. Flaky-history and
//! confidence-drift state is rebuilt from the durable event log once,
//! synchronously, before either task or any worker starts.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::hash::Hash;
use std::hash::Hasher;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use crossbridge_ai::AiEnrichmentConfig;
use crossbridge_artifacts::Artifact;
use crossbridge_artifacts::ClassifiedFailure;
use crossbridge_classify::ExtractorPipeline;
use crossbridge_classify::classify;
use crossbridge_core::DriftSignal;
use crossbridge_core::EventStatus;
use crossbridge_core::EventType;
use crossbridge_core::ExecutionEvent;
use crossbridge_core::FailureId;
use crossbridge_core::TestId;
use crossbridge_core::hashing::failure_signature;
use crossbridge_history::ConfidenceMonitor;
use crossbridge_history::FailureHistoryStore;
use crossbridge_history::PriorOutcome;
use crossbridge_rules::RuleRegistry;
use crossbridge_store::CoverageGraph;
use crossbridge_store::EventStore;
use crossbridge_store::SpillLog;
use tokio::sync::mpsc;
use tracing::Instrument;
use tracing::warn;

use crate::error::ServiceError;
use crate::stats::Stats;

/// Per-stage deadlines (§5). A stage that would exceed its deadline is
/// skipped with a warning rather than blocking the worker indefinitely.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDeadlines {
    /// Deadline for the persistence stage. Default 2 s.
    pub persistence: Duration,
    /// Deadline for the classification stage. Default 100 ms.
    pub classification: Duration,
    /// Deadline for the explanation stage. Default 200 ms.
    pub explanation: Duration,
}

impl Default for PipelineDeadlines {
    fn default() -> Self {
        Self {
            persistence: Duration::from_secs(2),
            classification: Duration::from_millis(100),
            explanation: Duration::from_millis(200),
        }
    }
}

/// Construction parameters for [`Pipeline::spawn`].
pub struct PipelineConfig {
    /// Bounded queue capacity, split evenly across shards.
    pub capacity: usize,
    /// Worker pool size; also the shard count (§5: sharding by
    /// `hash(test_id) mod N` is how ordering-per-test is achieved).
    pub workers: usize,
    /// Per-stage deadlines.
    pub deadlines: PipelineDeadlines,
    /// Directory the Explainability Builder writes `<failure_id>.json`/`.txt`
    /// CI artifacts into.
    pub artifacts_dir: PathBuf,
    /// Optional AI enrichment configuration.
    pub ai: AiEnrichmentConfig,
}

/// Persistence batcher flush threshold (§4.9): flush at 50 buffered events.
const PERSIST_BATCH_SIZE: usize = 50;
/// Persistence batcher flush threshold (§4.9): flush every 250 ms even if
/// the size threshold hasn't been reached.
const PERSIST_BATCH_INTERVAL: Duration = Duration::from_millis(250);
/// How often the background retrier drains the spill log (§4.9/§7).
const SPILL_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// State shared by every worker task, behind the locks each component
/// already owns internally (§5: "no global locks in the hot path" — the
/// locks here guard small, fast in-memory maps, not I/O).
struct Shared {
    event_store: EventStore,
    graph: CoverageGraph,
    spill: SpillLog,
    drift_log: crossbridge_store::DriftSignalLog,
    rules: RuleRegistry,
    extractors: ExtractorPipeline,
    ai: AiEnrichmentConfig,
    http_client: reqwest::Client,
    histories: Mutex<FailureHistoryStore>,
    confidence: Mutex<ConfidenceMonitor>,
    last_status: Mutex<BTreeMap<TestId, EventStatus>>,
    seen_messages: Mutex<BTreeMap<TestId, BTreeSet<String>>>,
    artifacts_dir: PathBuf,
    deadlines: PipelineDeadlines,
    stats: Stats,
    persist_tx: mpsc::UnboundedSender<ExecutionEvent>,
}

/// A running pipeline: a handle workers hold onto plus the senders the HTTP
/// layer enqueues onto.
pub struct Pipeline {
    shared: Arc<Shared>,
    senders: Vec<mpsc::Sender<ExecutionEvent>>,
}

impl Pipeline {
    /// Builds the shared context and spawns `config.workers` worker tasks,
    /// each owning one shard's receiver.
    ///
    /// # Errors
    /// Returns [`ServiceError`] if a durable store fails to open.
    pub fn spawn(
        config: PipelineConfig,
        event_store: EventStore,
        graph: CoverageGraph,
        spill: SpillLog,
        drift_log: crossbridge_store::DriftSignalLog,
        rules: RuleRegistry,
        stats: Stats,
    ) -> Result<Arc<Self>, ServiceError> {
        let workers = config.workers.max(1);
        let per_shard_capacity = (config.capacity / workers).max(1);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.ai.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let (persist_tx, persist_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            event_store,
            graph,
            spill,
            drift_log,
            rules,
            extractors: ExtractorPipeline::default(),
            ai: config.ai,
            http_client,
            histories: Mutex::new(FailureHistoryStore::new()),
            confidence: Mutex::new(ConfidenceMonitor::new(crossbridge_history::ConfidenceMonitorConfig::default())),
            last_status: Mutex::new(BTreeMap::new()),
            seen_messages: Mutex::new(BTreeMap::new()),
            artifacts_dir: config.artifacts_dir,
            deadlines: config.deadlines,
            stats,
            persist_tx,
        });

        replay_history(&shared);

        tokio::spawn(run_persist_batcher(Arc::clone(&shared), persist_rx));

        let mut senders = Vec::with_capacity(workers);
        for shard in 0..workers {
            let (tx, rx) = mpsc::channel(per_shard_capacity);
            senders.push(tx);
            let worker_shared = Arc::clone(&shared);
            tokio::spawn(run_worker(shard, worker_shared, rx));
        }

        let pipeline = Arc::new(Self { shared, senders });
        tokio::spawn(run_spill_retrier(Arc::clone(&pipeline)));

        Ok(pipeline)
    }

    /// Enqueues `event` onto its shard, chosen by `hash(test_id) mod N`.
    ///
    /// # Errors
    /// Returns [`ServiceError::RateLimited`] if that shard's queue is full.
    pub fn submit(&self, event: ExecutionEvent) -> Result<(), ServiceError> {
        let shard = shard_for(event.test_id.as_str(), self.senders.len());
        self.senders[shard].try_send(event).map_err(|_send_error| ServiceError::RateLimited)
    }

    /// Total queue depth across every shard, used by `/health` and `/stats`.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.senders.iter().map(|tx| tx.max_capacity() - tx.capacity()).sum()
    }

    /// Total queue capacity across every shard.
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.senders.iter().map(mpsc::Sender::max_capacity).sum()
    }

    /// Hot-reloads every cached rule pack (§5: atomic swap, no reader lock
    /// held across the reload — [`RuleRegistry::reload`] only clears the
    /// cache map, so the next `load_pack` rebuilds lazily).
    pub fn reload_rules(&self) {
        self.shared.rules.reload();
    }

    /// Returns the current rule pack for `framework`, for the `/rules/:framework` introspection endpoint.
    #[must_use]
    pub fn rules_for(&self, framework: &str) -> crossbridge_rules::RulePack {
        self.shared.rules.load_pack(framework)
    }

    /// Drains the spill log, returning how many events it held. Exposed for
    /// the CLI's `history replay-spill` and the background retrier.
    ///
    /// # Errors
    /// Returns [`ServiceError::Store`] if the spill log cannot be read.
    pub fn drain_spill(&self) -> Result<Vec<ExecutionEvent>, ServiceError> {
        Ok(self.shared.spill.drain()?)
    }

    /// Re-submits every spilled event, clearing the spill log only after
    /// every event has been handed back to a worker.
    ///
    /// # Errors
    /// Returns [`ServiceError`] if the spill log cannot be read or cleared.
    pub fn replay_spill(&self) -> Result<usize, ServiceError> {
        let events = self.drain_spill()?;
        let count = events.len();
        for event in events {
            if self.submit(event).is_err() {
                warn!("queue full while replaying spill log; event stays dropped from this pass");
            }
        }
        self.shared.spill.clear()?;
        Ok(count)
    }

    /// Current ingest statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> crate::stats::StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Records one HTTP-layer accept, for `/stats`.
    pub fn record_accepted(&self, framework: &str, event_type: &str) {
        self.shared.stats.record_accepted(framework, event_type);
    }

    /// Records one HTTP-layer rejection (validation failure or backpressure), for `/stats`.
    pub fn record_rejected(&self) {
        self.shared.stats.record_rejected();
    }

    /// The number of events currently dead-lettered in the spill log.
    ///
    /// # Errors
    /// Returns [`ServiceError::Store`] if the spill log cannot be read.
    pub fn spill_depth(&self) -> Result<usize, ServiceError> {
        Ok(self.shared.spill.drain().map(|events| events.len())?)
    }

    /// Probes the event store for `/health`'s storage-reachable check
    /// (§4.10): a cheap read, not a write, so a read-only disk still reports
    /// reachable.
    #[must_use]
    pub fn storage_reachable(&self) -> bool {
        self.shared.event_store.count().is_ok()
    }
}

/// One worker's run loop: pulls events off its shard in order and processes
/// them to completion before pulling the next (§5's per-shard serialization).
async fn run_worker(shard: usize, shared: Arc<Shared>, mut rx: mpsc::Receiver<ExecutionEvent>) {
    while let Some(event) = rx.recv().await {
        let event_id = event.event_id;
        let span = tracing::info_span!("process_event", shard, %event_id, test_id = %event.test_id);
        async {
            let started = Instant::now();
            process_event(&shared, event).await;
            shared.stats.record_latency(started.elapsed());
        }
        .instrument(span)
        .await;
    }
}

/// Runs the §4.11 stage sequence for one event. Infallible: every stage
/// isolates its own errors.
async fn process_event(shared: &Shared, event: ExecutionEvent) {
    persist(shared, &event);

    match shared.graph.record_event(&event) {
        Ok(Some(signal)) => emit_signal(shared, signal),
        Ok(None) => {}
        Err(err) => warn!(%err, "coverage graph update failed; skipping graph stage"),
    }

    let prior_status = if event.event_type == EventType::TestEnd {
        event.status.and_then(|status| {
            let mut map = shared.last_status.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            map.insert(event.test_id.clone(), status)
        })
    } else {
        None
    };

    if event.is_failing_test_end() {
        run_failure_stages(shared, &event, prior_status).await;
    }
}

/// Runs the classify/explain/history/drift sequence for one failing `test_end` event.
async fn run_failure_stages(shared: &Shared, event: &ExecutionEvent, prior_status: Option<EventStatus>) {
    let log_text = normalized_log_text(event);
    let signals = shared.extractors.run(&log_text);
    let pack = shared.rules.load_pack(event.framework.as_str());
    let rule_text = classification_text(event, &signals);

    let Ok(classification) =
        tokio::time::timeout(shared.deadlines.classification, async { classify(&rule_text, &pack) }).await
    else {
        warn!("classification stage exceeded its deadline; skipping explanation and history for this event");
        return;
    };

    let failure_id = FailureId::generate();
    let Ok(mut explanation) = tokio::time::timeout(shared.deadlines.explanation, async {
        crossbridge_classify::build_explanation(failure_id, &classification, &pack.rules, &log_text, &signals)
    })
    .await
    else {
        warn!("explanation stage exceeded its deadline; skipping artifact and history for this event");
        return;
    };

    if shared.ai.enabled {
        explanation = crossbridge_ai::enrich(&shared.ai, &shared.http_client, &log_text, explanation).await;
    }

    write_artifact(shared, failure_id, &classification, &explanation);

    let is_new_variant = {
        let mut seen = shared.seen_messages.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        seen.entry(event.test_id.clone()).or_default().insert(event.error_message.clone())
    };
    let signature = failure_signature(event.test_id.as_str(), classification.category.as_str(), &event.error_message);
    let prior_outcome = match prior_status {
        None => PriorOutcome::None,
        Some(status) if status.is_failure() => PriorOutcome::Failed,
        Some(_) => PriorOutcome::Passed,
    };

    let history_signal = {
        let mut histories = shared.histories.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (_history, signal) = histories.record(
            signature,
            event.test_id.clone(),
            classification.category,
            is_new_variant,
            prior_outcome,
            event.timestamp,
        );
        signal
    };
    if let Some(signal) = history_signal {
        emit_signal(shared, signal);
    }

    let drift_signal = {
        let mut monitor = shared.confidence.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        monitor.record(&event.test_id, &event.framework, explanation.final_confidence, event.timestamp)
    };
    if let Some(signal) = drift_signal {
        emit_signal(shared, signal);
    }
}

/// Builds the normalized log text §4.11 step 3a specifies. This is what
/// extraction runs against; it includes `metadata.logs`.
fn normalized_log_text(event: &ExecutionEvent) -> String {
    let logs = event.logs_text();
    if logs.is_empty() {
        format!("{}\n{}", event.error_message, event.stack_trace)
    } else {
        format!("{}\n{}\n{}", event.error_message, event.stack_trace, logs)
    }
}

/// Builds the rule-matching text §4.4 step 2 specifies: `error_message` and
/// `stack_trace` plus each extracted signal's `evidence`, never
/// `metadata.logs` directly — a pattern only present there must not match.
fn classification_text(event: &ExecutionEvent, signals: &[crossbridge_classify::Signal]) -> String {
    let mut text = format!("{}\n{}", event.error_message, event.stack_trace);
    for signal in signals {
        text.push('\n');
        text.push_str(&signal.evidence);
    }
    text
}

/// Renders and writes the per-failure CI artifact pair, logging (not
/// failing the pipeline) on any I/O error.
fn write_artifact(
    shared: &Shared,
    failure_id: FailureId,
    classification: &crossbridge_classify::Classification,
    explanation: &crossbridge_classify::ConfidenceExplanation,
) {
    let failure = ClassifiedFailure { failure_id, classification, explanation };
    let artifact = match Artifact::render(&failure) {
        Ok(artifact) => artifact,
        Err(err) => {
            warn!(%err, "failed to render ci artifact");
            return;
        }
    };
    if let Err(err) = std::fs::create_dir_all(&shared.artifacts_dir) {
        warn!(%err, "failed to create artifacts directory");
        return;
    }
    let json_path = shared.artifacts_dir.join(format!("{}.json", artifact.failure_id));
    let text_path = shared.artifacts_dir.join(format!("{}.txt", artifact.failure_id));
    if let Err(err) = std::fs::write(&json_path, &artifact.json) {
        warn!(%err, path = %json_path.display(), "failed to write ci artifact json");
    }
    if let Err(err) = std::fs::write(&text_path, &artifact.text) {
        warn!(%err, path = %text_path.display(), "failed to write ci artifact text");
    }
}

/// Hands `event` to the persistence batcher (§4.9), dead-lettering to the
/// spill log immediately if the batcher task has already shut down.
fn persist(shared: &Shared, event: &ExecutionEvent) {
    if let Err(send_error) = shared.persist_tx.send(event.clone()) {
        warn!("persistence batcher channel closed; dead-lettering to spill log");
        if let Err(err) = shared.spill.append(&send_error.0) {
            warn!(%err, "failed to dead-letter event to spill log; event may be lost");
        }
    }
}

/// Buffers events handed to it by [`persist`] and flushes them to durable
/// storage at `PERSIST_BATCH_SIZE` events or `PERSIST_BATCH_INTERVAL`,
/// whichever comes first (§4.9). Exits once every worker's `persist_tx`
/// clone has dropped, flushing whatever remains buffered first.
async fn run_persist_batcher(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<ExecutionEvent>) {
    let mut batch = Vec::with_capacity(PERSIST_BATCH_SIZE);
    let mut interval = tokio::time::interval(PERSIST_BATCH_INTERVAL);
    interval.tick().await;

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= PERSIST_BATCH_SIZE {
                            flush_batch(&shared, &mut batch).await;
                        }
                    }
                    None => {
                        flush_batch(&shared, &mut batch).await;
                        return;
                    }
                }
            }
            _ = interval.tick() => {
                flush_batch(&shared, &mut batch).await;
            }
        }
    }
}

/// Writes `batch` in one transaction under the persistence deadline,
/// dead-lettering every event it holds to the spill log on failure or
/// timeout, then clears it either way.
async fn flush_batch(shared: &Shared, batch: &mut Vec<ExecutionEvent>) {
    if batch.is_empty() {
        return;
    }
    let outcome =
        tokio::time::timeout(shared.deadlines.persistence, async { shared.event_store.write_batch(batch) }).await;
    let failed = match outcome {
        Ok(Ok(())) => false,
        Ok(Err(err)) => {
            warn!(%err, batch_len = batch.len(), "batch persistence failed; dead-lettering to spill log");
            true
        }
        Err(_) => {
            warn!(batch_len = batch.len(), "batch persistence exceeded its deadline; dead-lettering to spill log");
            true
        }
    };
    if failed {
        for event in batch.iter() {
            if let Err(err) = shared.spill.append(event) {
                warn!(%err, "failed to dead-letter event to spill log; event may be lost");
            }
        }
    }
    batch.clear();
}

/// Periodically drains the spill log back into the live queue (§4.9/§7), so
/// a transient storage or queue outage self-heals without an operator
/// running `crossbridge-cli history replay-spill` by hand.
async fn run_spill_retrier(pipeline: Arc<Pipeline>) {
    let mut interval = tokio::time::interval(SPILL_RETRY_INTERVAL);
    interval.tick().await;
    loop {
        interval.tick().await;
        match pipeline.replay_spill() {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "replayed dead-lettered events from spill log"),
            Err(err) => warn!(%err, "spill log retry pass failed"),
        }
    }
}

/// Rebuilds in-memory flaky-history, confidence-drift, last-status, and
/// seen-message state from every event already durable in
/// `shared.event_store` (§6: both tables are "rebuilt from `EventStore`'s
/// durable log on restart"). Runs once, synchronously, before any worker
/// starts. Skips artifact writes, drift-signal emission, and AI enrichment —
/// those already happened (or were deliberately skipped) the first time each
/// event was processed live.
fn replay_history(shared: &Shared) {
    let events = match shared.event_store.load_all_ordered() {
        Ok(events) => events,
        Err(err) => {
            warn!(%err, "failed to load event log for history replay; starting with empty history");
            return;
        }
    };

    let mut last_status = shared.last_status.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let mut seen_messages = shared.seen_messages.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let mut histories = shared.histories.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let mut confidence = shared.confidence.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

    for event in &events {
        let prior_status = if event.event_type == EventType::TestEnd {
            event.status.and_then(|status| last_status.insert(event.test_id.clone(), status))
        } else {
            None
        };

        if !event.is_failing_test_end() {
            continue;
        }

        let log_text = normalized_log_text(event);
        let signals = shared.extractors.run(&log_text);
        let pack = shared.rules.load_pack(event.framework.as_str());
        let rule_text = classification_text(event, &signals);
        let classification = classify(&rule_text, &pack);

        let failure_id = FailureId::generate();
        let explanation =
            crossbridge_classify::build_explanation(failure_id, &classification, &pack.rules, &log_text, &signals);

        let is_new_variant =
            seen_messages.entry(event.test_id.clone()).or_default().insert(event.error_message.clone());
        let signature = failure_signature(event.test_id.as_str(), classification.category.as_str(), &event.error_message);
        let prior_outcome = match prior_status {
            None => PriorOutcome::None,
            Some(status) if status.is_failure() => PriorOutcome::Failed,
            Some(_) => PriorOutcome::Passed,
        };

        histories.record(
            signature,
            event.test_id.clone(),
            classification.category,
            is_new_variant,
            prior_outcome,
            event.timestamp,
        );
        confidence.record(&event.test_id, &event.framework, explanation.final_confidence, event.timestamp);
    }

    drop(confidence);
    drop(histories);
    drop(seen_messages);
    drop(last_status);

    if !events.is_empty() {
        tracing::info!(replayed = events.len(), "rebuilt in-memory history from durable event log");
    }
}

/// Appends `signal` to the drift signal log, logging (not failing) on error.
fn emit_signal(shared: &Shared, signal: DriftSignal) {
    if let Err(err) = shared.drift_log.append(&signal) {
        warn!(%err, "failed to persist drift signal");
    }
}

/// Picks a shard index for `test_id`, stable across calls (§5 ordering guarantee).
fn shard_for(test_id: &str, shard_count: usize) -> usize {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    test_id.hash(&mut hasher);
    usize::try_from(hasher.finish() % u64::try_from(shard_count.max(1)).unwrap_or(1)).unwrap_or(0)
}

/// Default worker pool size (§4.11: `N = CPU * 2`), falling back to `2` if
/// the platform's CPU count cannot be determined.
#[must_use]
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism().map_or(2, |n| n.get() * 2)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use std::collections::BTreeMap;

    use crossbridge_store::DriftSignalLog;
    use tempfile::tempdir;

    use super::*;

    fn test_event(test_id: &str, status: &str, error_message: &str) -> ExecutionEvent {
        let raw = serde_json::from_value(serde_json::json!({
            "event_type": "test_end",
            "framework": "pytest",
            "test_id": test_id,
            "status": status,
            "error_message": error_message,
        }))
        .expect("valid raw event");
        ExecutionEvent::from_wire(raw).expect("normalizes")
    }

    fn spawn_test_pipeline(dir: &std::path::Path) -> Arc<Pipeline> {
        let event_store = EventStore::open_in_memory().expect("open events");
        let graph = CoverageGraph::open_in_memory().expect("open graph");
        let spill = SpillLog::open(dir.join("spill.ndjson")).expect("open spill");
        let drift_log = DriftSignalLog::open_in_memory().expect("open drift log");
        let rules = RuleRegistry::new(dir.join("rules"), BTreeMap::new());
        let config = PipelineConfig {
            capacity: 64,
            workers: 2,
            deadlines: PipelineDeadlines::default(),
            artifacts_dir: dir.join("artifacts"),
            ai: AiEnrichmentConfig::default(),
        };
        Pipeline::spawn(config, event_store, graph, spill, drift_log, rules, Stats::new()).expect("spawn pipeline")
    }

    #[tokio::test]
    async fn submitting_events_increments_queue_depth_then_drains() {
        let dir = tempdir().expect("tempdir");
        let pipeline = spawn_test_pipeline(dir.path());
        pipeline.submit(test_event("t1", "passed", "")).expect("submit");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pipeline.queue_depth(), 0, "worker should have drained the event");
    }

    #[tokio::test]
    async fn full_shard_is_rejected_without_blocking() {
        let dir = tempdir().expect("tempdir");
        let event_store = EventStore::open_in_memory().expect("open events");
        let graph = CoverageGraph::open_in_memory().expect("open graph");
        let spill = SpillLog::open(dir.path().join("spill.ndjson")).expect("open spill");
        let drift_log = DriftSignalLog::open_in_memory().expect("open drift log");
        let rules = RuleRegistry::new(dir.path().join("rules"), BTreeMap::new());
        let config = PipelineConfig {
            capacity: 1,
            workers: 1,
            deadlines: PipelineDeadlines::default(),
            artifacts_dir: dir.path().join("artifacts"),
            ai: AiEnrichmentConfig::default(),
        };
        let pipeline =
            Pipeline::spawn(config, event_store, graph, spill, drift_log, rules, Stats::new()).expect("spawn");
        // Immediately fill the single-slot shard before the worker can drain it.
        let mut rejected = false;
        for _ in 0..64 {
            if pipeline.submit(test_event("same-test", "passed", "")).is_err() {
                rejected = true;
                break;
            }
        }
        assert!(rejected, "a bounded one-slot shard under rapid submission should eventually reject");
    }

    #[tokio::test]
    async fn flaky_sequence_drains_without_dead_lettering() {
        let dir = tempdir().expect("tempdir");
        let pipeline = spawn_test_pipeline(dir.path());
        let outcomes = ["failed", "passed", "failed", "passed", "failed"];
        for status in outcomes {
            pipeline
                .submit(test_event("t1", status, "TimeoutException: waited 5s"))
                .expect("submit");
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(pipeline.queue_depth(), 0, "every submitted event should have drained");
        assert_eq!(pipeline.spill_depth().expect("spill depth"), 0, "nothing should have dead-lettered");
    }

    #[test]
    fn shard_for_is_stable_for_the_same_test_id() {
        assert_eq!(shard_for("t1", 8), shard_for("t1", 8));
    }
}
