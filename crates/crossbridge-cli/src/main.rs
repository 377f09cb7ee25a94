// crates/crossbridge-cli/src/main.rs
// ============================================================================
// Module: CrossBridge CLI Entry Point
// Description: Command dispatcher for running the observer service and for
//              config/rules/history maintenance tasks that don't belong
//              behind the HTTP surface.
// Dependencies: clap, crossbridge-config, crossbridge-core, crossbridge-rules,
//               crossbridge-service, crossbridge-store, thiserror, tokio.
// ============================================================================

//! ## Overview
//! `crossbridge serve` loads the unified config and runs the ingest service
//! to completion. The remaining subcommands operate on a data directory
//! directly, without spinning up the worker pool or HTTP surface, for use in
//! CI jobs and operator scripts: validating a config file, linting a rule
//! pack file before it's deployed, and inspecting or pruning the durable
//! stores a running service leaves behind.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use crossbridge_config::CrossBridgeConfig;
use crossbridge_core::Timestamp;
use crossbridge_rules::RulePack;
use crossbridge_service::CrossBridgeService;
use crossbridge_store::CoverageGraph;
use crossbridge_store::DriftSignalLog;
use crossbridge_store::EventStore;
use crossbridge_store::SpillLog;
use thiserror::Error;

/// Default data directory, relative to the current working directory.
const DEFAULT_DATA_DIR: &str = "./data";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "crossbridge", disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the ingest HTTP service and run until shutdown.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Rule pack utilities.
    Rules {
        /// Selected rules subcommand.
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Durable-store maintenance utilities.
    History {
        /// Selected history subcommand.
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to all-defaults).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory holding `events.db`, `graph.db`, `drift.db`, and the spill log.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to all-defaults).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Rules subcommands.
#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// Parse and lint a rule pack file without deploying it.
    Check(RulesCheckCommand),
}

/// Arguments for `rules check`.
#[derive(Args, Debug)]
struct RulesCheckCommand {
    /// Rule pack YAML file to check.
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
}

/// History subcommands.
#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// Report durable-store occupancy under a data directory.
    Inspect(HistoryInspectCommand),
    /// Replay the spill log into the event store.
    ReplaySpill(HistoryReplaySpillCommand),
    /// Prune coverage-graph nodes with no events in the retention window.
    PruneGraph(HistoryPruneGraphCommand),
}

/// Arguments shared by every `history` subcommand.
#[derive(Args, Debug)]
struct HistoryInspectCommand {
    /// Directory holding `events.db`, `graph.db`, `drift.db`, and the spill log.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
}

/// Arguments for `history replay-spill`.
#[derive(Args, Debug)]
struct HistoryReplaySpillCommand {
    /// Directory holding `events.db` and the spill log.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
}

/// Arguments for `history prune-graph`.
#[derive(Args, Debug)]
struct HistoryPruneGraphCommand {
    /// Directory holding `graph.db`.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Nodes with no event strictly newer than this many days ago are pruned.
    #[arg(long, value_name = "DAYS")]
    older_than_days: u32,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper; every command function returns one of these on failure.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message, printed to stderr as-is.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// CLI result alias for fallible command functions.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::try_init().ok();
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and dispatches to the selected subcommand.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config { command } => command_config(command),
        Commands::Rules { command } => command_rules(command),
        Commands::History { command } => command_history(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes `serve`.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = CrossBridgeConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let graceful_seconds = config.observer.shutdown.graceful_seconds;
    let service = CrossBridgeService::from_config(&config, &command.data_dir)
        .map_err(|err| CliError::new(format!("failed to start service: {err}")))?;
    service.serve(graceful_seconds).await.map_err(|err| CliError::new(format!("service exited with error: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches `config` subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes `config validate`.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = CrossBridgeConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("config invalid: {err}")))?;
    write_stdout_line(&format!(
        "config OK: bind {}:{}, queue capacity {}, {} inline framework(s)",
        config.observer.api.host,
        config.observer.api.port,
        config.observer.queue.capacity,
        config.execution.intelligence.rules.len(),
    ))
    .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Rules Commands
// ============================================================================

/// Dispatches `rules` subcommands.
fn command_rules(command: RulesCommand) -> CliResult<ExitCode> {
    match command {
        RulesCommand::Check(command) => command_rules_check(&command),
    }
}

/// Executes `rules check`: parses `command.file` as a [`RulePack`] and lints
/// it against the constraints [`crossbridge_rules::rule::Rule`] assumes but
/// serde cannot enforce (unique ids, in-range confidence, non-empty match set).
fn command_rules_check(command: &RulesCheckCommand) -> CliResult<ExitCode> {
    let raw = std::fs::read_to_string(&command.file)
        .map_err(|err| CliError::new(format!("failed to read {}: {err}", command.file.display())))?;
    let pack: RulePack = serde_yaml::from_str(&raw)
        .map_err(|err| CliError::new(format!("failed to parse {}: {err}", command.file.display())))?;
    lint_rule_pack(&pack)?;
    write_stdout_line(&format!(
        "rule pack OK: framework={}, {} rule(s)",
        pack.framework,
        pack.rules.len(),
    ))
    .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Checks the constraints documented on [`Rule`] (§4.2/§4.4) that a plain
/// YAML parse cannot: unique ids within the pack, confidence in `[0, 1]`, and
/// at least one of `match_any`/`requires_all` so the rule can ever fire.
fn lint_rule_pack(pack: &RulePack) -> CliResult<()> {
    let mut seen = std::collections::BTreeSet::new();
    for rule in &pack.rules {
        if !seen.insert(rule.id.as_str().to_string()) {
            return Err(CliError::new(format!("duplicate rule id: {}", rule.id)));
        }
        if !(0.0..=1.0).contains(&rule.confidence) {
            return Err(CliError::new(format!("rule {} confidence out of range [0, 1]: {}", rule.id, rule.confidence)));
        }
        if rule.match_any.is_empty() && rule.requires_all.is_empty() {
            return Err(CliError::new(format!(
                "rule {} can never fire: match_any and requires_all are both empty",
                rule.id
            )));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: History Commands
// ============================================================================

/// Dispatches `history` subcommands.
fn command_history(command: HistoryCommand) -> CliResult<ExitCode> {
    match command {
        HistoryCommand::Inspect(command) => command_history_inspect(&command),
        HistoryCommand::ReplaySpill(command) => command_history_replay_spill(&command),
        HistoryCommand::PruneGraph(command) => command_history_prune_graph(&command),
    }
}

/// Executes `history inspect`: opens every durable store read-only-in-spirit
/// (no writes beyond what `open` itself performs) and reports row counts.
fn command_history_inspect(command: &HistoryInspectCommand) -> CliResult<ExitCode> {
    let dir = &command.data_dir;
    let events = EventStore::open(&dir.join("events.db")).map_err(|err| CliError::new(format!("events.db: {err}")))?;
    let drift =
        DriftSignalLog::open(&dir.join("drift.db")).map_err(|err| CliError::new(format!("drift.db: {err}")))?;
    let spill =
        SpillLog::open(dir.join("spill.ndjson")).map_err(|err| CliError::new(format!("spill.ndjson: {err}")))?;
    let event_count = events.count().map_err(|err| CliError::new(format!("events.db: {err}")))?;
    let drift_count = drift.count().map_err(|err| CliError::new(format!("drift.db: {err}")))?;
    let spill_depth = spill.drain().map_err(|err| CliError::new(format!("spill.ndjson: {err}")))?.len();
    write_stdout_line(&format!(
        "events={event_count} drift_signals={drift_count} spilled_events={spill_depth} (data_dir={})",
        dir.display(),
    ))
    .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `history replay-spill`: drains every event the spill log
/// accumulated while the event store was unavailable and re-attempts the
/// write each one originally failed (§5 "flushes spill log").
fn command_history_replay_spill(command: &HistoryReplaySpillCommand) -> CliResult<ExitCode> {
    let dir = &command.data_dir;
    let events = EventStore::open(&dir.join("events.db")).map_err(|err| CliError::new(format!("events.db: {err}")))?;
    let spill =
        SpillLog::open(dir.join("spill.ndjson")).map_err(|err| CliError::new(format!("spill.ndjson: {err}")))?;
    let spilled = spill.drain().map_err(|err| CliError::new(format!("spill.ndjson: {err}")))?;
    let mut replayed = 0_u64;
    for event in &spilled {
        events.write(event).map_err(|err| CliError::new(format!("failed to replay event: {err}")))?;
        replayed += 1;
    }
    spill.clear().map_err(|err| CliError::new(format!("failed to clear spill log: {err}")))?;
    write_stdout_line(&format!("replayed {replayed} spilled event(s) into events.db")).map_err(|err| {
        CliError::new(format!("failed to write to stdout: {err}"))
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `history prune-graph`: removes coverage-graph nodes with no event
/// newer than `older_than_days` days ago.
fn command_history_prune_graph(command: &HistoryPruneGraphCommand) -> CliResult<ExitCode> {
    let graph = CoverageGraph::open(&command.data_dir.join("graph.db"))
        .map_err(|err| CliError::new(format!("graph.db: {err}")))?;
    let cutoff = days_ago(command.older_than_days);
    let pruned = graph.prune_orphans(cutoff).map_err(|err| CliError::new(format!("failed to prune graph: {err}")))?;
    write_stdout_line(&format!("pruned {pruned} orphaned node(s) older than {} day(s)", command.older_than_days))
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Returns the instant `days` days before now, for use as a retention cutoff.
fn days_ago(days: u32) -> Timestamp {
    let cutoff = time::OffsetDateTime::now_utc() - time::Duration::days(i64::from(days));
    Timestamp::from_offset_date_time(cutoff)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes the final error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::FAILURE
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn rule_yaml(id: &str, confidence: f64, match_any: &[&str]) -> String {
        let matches = match_any.iter().map(|m| format!("    - \"{m}\"")).collect::<Vec<_>>().join("\n");
        format!(
            "framework: pytest\nversion: \"1\"\nrules:\n  - id: {id}\n    description: d\n    match_any:\n{matches}\n    failure_type: PRODUCT_DEFECT\n    confidence: {confidence}\n    priority: 1\n"
        )
    }

    #[test]
    fn lint_rule_pack_rejects_duplicate_ids() {
        let yaml = format!("{}{}", rule_yaml("r1", 0.5, &["a"]), "  - id: r1\n    description: d\n    failure_type: PRODUCT_DEFECT\n    confidence: 0.5\n    priority: 2\n    match_any:\n      - b\n");
        let pack: RulePack = serde_yaml::from_str(&yaml).expect("parse");
        let err = lint_rule_pack(&pack).expect_err("duplicate");
        assert!(err.to_string().contains("duplicate rule id"));
    }

    #[test]
    fn lint_rule_pack_rejects_out_of_range_confidence() {
        let yaml = rule_yaml("r1", 1.5, &["a"]);
        let pack: RulePack = serde_yaml::from_str(&yaml).expect("parse");
        let err = lint_rule_pack(&pack).expect_err("out of range");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn lint_rule_pack_rejects_a_rule_that_can_never_fire() {
        let yaml = rule_yaml("r1", 0.5, &[]);
        let pack: RulePack = serde_yaml::from_str(&yaml).expect("parse");
        let err = lint_rule_pack(&pack).expect_err("never fires");
        assert!(err.to_string().contains("can never fire"));
    }

    #[test]
    fn lint_rule_pack_accepts_a_well_formed_pack() {
        let yaml = rule_yaml("r1", 0.5, &["a"]);
        let pack: RulePack = serde_yaml::from_str(&yaml).expect("parse");
        lint_rule_pack(&pack).expect("well-formed pack lints clean");
    }

    #[test]
    fn days_ago_moves_backward_from_now() {
        let cutoff = days_ago(1);
        assert!(cutoff <= Timestamp::now());
    }

    #[test]
    fn command_history_inspect_reports_zero_counts_on_a_fresh_data_dir() {
        let dir = tempdir().expect("tempdir");
        let command = HistoryInspectCommand { data_dir: dir.path().to_path_buf() };
        command_history_inspect(&command).expect("inspect");
    }

    #[test]
    fn command_history_prune_graph_succeeds_on_an_empty_graph() {
        let dir = tempdir().expect("tempdir");
        let command = HistoryPruneGraphCommand { data_dir: dir.path().to_path_buf(), older_than_days: 30 };
        command_history_prune_graph(&command).expect("prune");
    }

    #[test]
    fn command_config_validate_accepts_defaults() {
        let command = ConfigValidateCommand { config: None };
        command_config_validate(&command).expect("validate");
    }
}
