// crates/crossbridge-classify/src/extractor.rs
// ============================================================================
// Module: Signal Extractor Pipeline (C3)
// Description: Pluggable extractors that scan normalized log text and emit
//              typed Signals; run in priority order with per-extractor
//              failure isolation.
// Purpose: One place new framework-specific detectors are registered without
//          touching the classifier.
// Dependencies: crossbridge-classify::signal
// ============================================================================

//! ## Overview
//! An [`Extractor`] is a pure function over normalized log text. The
//! [`ExtractorPipeline`] runs a fixed, priority-ordered set of built-ins
//! (generic timeout/assertion/locator/HTTP/infra patterns, then
//! framework-specific ones, then a catch-all [`CompositeExtractor`]) and
//! isolates any panic or empty result to that one extractor (§4.3 edge
//! cases): a misbehaving extractor never blocks the rest of the pipeline.

use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

use tracing::warn;

use crate::signal::Signal;
use crate::signal::SignalType;

/// Hard cap on lines scanned per extraction pass (§4.3: very large input).
pub const MAX_SCANNED_LINES: usize = 100_000;

/// A pluggable scanner over normalized log text.
///
/// # Invariants
/// - Never mutates its input.
/// - May emit zero or more signals.
pub trait Extractor: Send + Sync {
    /// Stable name, used only for logging when an extractor is isolated.
    fn name(&self) -> &'static str;

    /// Scans `log_text` and returns any signals found.
    fn extract(&self, log_text: &str) -> Vec<Signal>;
}

/// Runs a fixed priority-ordered set of extractors, isolating failures.
pub struct ExtractorPipeline {
    /// Extractors in priority order (lower runs first).
    extractors: Vec<Box<dyn Extractor>>,
}

impl Default for ExtractorPipeline {
    fn default() -> Self {
        Self {
            extractors: vec![
                Box::new(TimeoutExtractor),
                Box::new(AssertionExtractor),
                Box::new(LocatorExtractor),
                Box::new(HttpErrorExtractor),
                Box::new(InfraExtractor),
                Box::new(SeleniumExtractor),
                Box::new(RobotExtractor),
                Box::new(PytestExtractor),
                Box::new(CompositeExtractor),
            ],
        }
    }
}

impl ExtractorPipeline {
    /// Runs every registered extractor over `log_text` and concatenates their
    /// signals. An empty `log_text` yields no signals; input is capped at
    /// [`MAX_SCANNED_LINES`] lines before scanning (§4.3).
    #[must_use]
    pub fn run(&self, log_text: &str) -> Vec<Signal> {
        if log_text.is_empty() {
            return Vec::new();
        }
        let capped = cap_lines(log_text, MAX_SCANNED_LINES);
        let mut signals = Vec::new();
        for extractor in &self.extractors {
            match catch_unwind(AssertUnwindSafe(|| extractor.extract(&capped))) {
                Ok(found) => signals.extend(found),
                Err(_) => warn!(extractor = extractor.name(), "extractor panicked, isolating"),
            }
        }
        signals
    }
}

/// Truncates `text` to at most `max_lines` lines, preserving line content.
fn cap_lines(text: &str, max_lines: usize) -> String {
    text.lines().take(max_lines).collect::<Vec<_>>().join("\n")
}

/// Finds the shortest disambiguating window around the first occurrence of
/// `pattern`, truncated to [`Signal::MAX_EVIDENCE_CHARS`].
fn evidence_window(text: &str, pattern: &str) -> String {
    text.find(pattern).map_or_else(
        || text.chars().take(Signal::MAX_EVIDENCE_CHARS).collect(),
        |start| text[start..].chars().take(Signal::MAX_EVIDENCE_CHARS).collect(),
    )
}

/// Detects deadline/timeout failures.
struct TimeoutExtractor;

impl Extractor for TimeoutExtractor {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn extract(&self, log_text: &str) -> Vec<Signal> {
        let lower = log_text.to_lowercase();
        const PATTERNS: [&str; 3] = ["timeoutexception", "timed out", "deadline exceeded"];
        PATTERNS
            .iter()
            .find(|p| lower.contains(*p))
            .map(|p| vec![Signal::new(SignalType::Timeout, 0.9, evidence_window(log_text, p))])
            .unwrap_or_default()
    }
}

/// Detects assertion failures.
struct AssertionExtractor;

impl Extractor for AssertionExtractor {
    fn name(&self) -> &'static str {
        "assertion"
    }

    fn extract(&self, log_text: &str) -> Vec<Signal> {
        let lower = log_text.to_lowercase();
        const PATTERNS: [&str; 3] = ["assertionerror", "assertion failed", "expected"];
        PATTERNS
            .iter()
            .find(|p| lower.contains(*p))
            .map(|p| vec![Signal::new(SignalType::Assertion, 0.85, evidence_window(log_text, p))])
            .unwrap_or_default()
    }
}

/// Detects UI locator failures, generic across frameworks.
struct LocatorExtractor;

impl Extractor for LocatorExtractor {
    fn name(&self) -> &'static str {
        "locator"
    }

    fn extract(&self, log_text: &str) -> Vec<Signal> {
        let lower = log_text.to_lowercase();
        const PATTERNS: [&str; 2] = ["element not found", "no such element"];
        PATTERNS
            .iter()
            .find(|p| lower.contains(*p))
            .map(|p| vec![Signal::new(SignalType::Locator, 0.8, evidence_window(log_text, p))])
            .unwrap_or_default()
    }
}

/// Detects HTTP error responses.
struct HttpErrorExtractor;

impl Extractor for HttpErrorExtractor {
    fn name(&self) -> &'static str {
        "http_error"
    }

    fn extract(&self, log_text: &str) -> Vec<Signal> {
        for code in ["500", "502", "503", "504"] {
            if log_text.contains(code) {
                let mut signal = Signal::new(SignalType::HttpError, 0.85, evidence_window(log_text, code));
                signal.metadata.insert("status_code".to_string(), serde_json::json!(code));
                return vec![signal];
            }
        }
        Vec::new()
    }
}

/// Detects infrastructure/connectivity failures.
struct InfraExtractor;

impl Extractor for InfraExtractor {
    fn name(&self) -> &'static str {
        "infra"
    }

    fn extract(&self, log_text: &str) -> Vec<Signal> {
        let lower = log_text.to_lowercase();
        let hits: &[(&str, SignalType)] = &[
            ("connection refused", SignalType::ConnectionError),
            ("connectionerror", SignalType::ConnectionError),
            ("name or service not known", SignalType::DnsError),
            ("nxdomain", SignalType::DnsError),
            ("permission denied", SignalType::PermissionError),
            ("importerror", SignalType::ImportError),
            ("modulenotfounderror", SignalType::ImportError),
            ("outofmemoryerror", SignalType::MemoryError),
            ("memoryerror", SignalType::MemoryError),
            ("nullpointerexception", SignalType::NullPointer),
            ("nonetype", SignalType::NullPointer),
            ("filenotfounderror", SignalType::FileNotFound),
            ("no such file or directory", SignalType::FileNotFound),
            ("syntaxerror", SignalType::SyntaxError),
        ];
        hits.iter()
            .find(|(pattern, _)| lower.contains(pattern))
            .map(|(pattern, kind)| vec![Signal::new(*kind, 0.85, evidence_window(log_text, pattern))])
            .unwrap_or_default()
    }
}

/// Selenium-specific locator/stale/browser signals.
struct SeleniumExtractor;

impl Extractor for SeleniumExtractor {
    fn name(&self) -> &'static str {
        "selenium"
    }

    fn extract(&self, log_text: &str) -> Vec<Signal> {
        let lower = log_text.to_lowercase();
        if lower.contains("nosuchelementexception") {
            let mut signal =
                Signal::new(SignalType::Locator, 0.9, evidence_window(log_text, "NoSuchElementException"));
            signal.metadata.insert("locator_type".to_string(), serde_json::json!("css_or_xpath"));
            return vec![signal];
        }
        if lower.contains("staleelementreferenceexception") {
            return vec![Signal::new(
                SignalType::UiStale,
                0.85,
                evidence_window(log_text, "StaleElementReferenceException"),
            )];
        }
        if lower.contains("timeoutexception") && lower.contains("wait") {
            return vec![Signal::new(SignalType::UiTimeout, 0.85, evidence_window(log_text, "TimeoutException"))];
        }
        Vec::new()
    }
}

/// Robot Framework-specific keyword/library signals.
struct RobotExtractor;

impl Extractor for RobotExtractor {
    fn name(&self) -> &'static str {
        "robot"
    }

    fn extract(&self, log_text: &str) -> Vec<Signal> {
        if log_text.contains("No keyword with name") {
            return vec![Signal::new(
                SignalType::KeywordNotFound,
                0.9,
                evidence_window(log_text, "No keyword with name"),
            )];
        }
        if log_text.contains("Importing library") && log_text.contains("failed") {
            return vec![Signal::new(SignalType::LibraryError, 0.8, evidence_window(log_text, "Importing library"))];
        }
        Vec::new()
    }
}

/// Pytest-specific fixture/assertion signals.
struct PytestExtractor;

impl Extractor for PytestExtractor {
    fn name(&self) -> &'static str {
        "pytest"
    }

    fn extract(&self, log_text: &str) -> Vec<Signal> {
        if log_text.contains("fixture") && log_text.to_lowercase().contains("error") {
            return vec![Signal::new(SignalType::FixtureError, 0.75, evidence_window(log_text, "fixture"))];
        }
        Vec::new()
    }
}

/// Fallback extractor: always emits a low-confidence `UNKNOWN` signal when
/// nothing else fired and the input is non-empty, so downstream stages always
/// see at least one signal for a failing test.
struct CompositeExtractor;

impl Extractor for CompositeExtractor {
    fn name(&self) -> &'static str {
        "composite_fallback"
    }

    fn extract(&self, log_text: &str) -> Vec<Signal> {
        vec![Signal::new(SignalType::Unknown, 0.5, evidence_window(log_text, log_text))]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_signals() {
        let pipeline = ExtractorPipeline::default();
        assert!(pipeline.run("").is_empty());
    }

    #[test]
    fn timeout_pattern_is_detected() {
        let pipeline = ExtractorPipeline::default();
        let signals = pipeline.run("TimeoutException: waited 5s");
        assert!(signals.iter().any(|s| s.signal_type == SignalType::Timeout));
    }

    #[test]
    fn non_empty_unmatched_input_still_gets_composite_fallback() {
        let pipeline = ExtractorPipeline::default();
        let signals = pipeline.run("something totally unrecognized happened");
        assert!(signals.iter().any(|s| s.signal_type == SignalType::Unknown));
    }

    #[test]
    fn selenium_locator_signal_has_high_confidence() {
        let pipeline = ExtractorPipeline::default();
        let signals = pipeline.run("org.openqa.selenium.NoSuchElementException: no such element");
        let locator = signals.iter().find(|s| s.signal_type == SignalType::Locator).expect("locator signal");
        assert!(locator.confidence >= 0.85);
    }
}
