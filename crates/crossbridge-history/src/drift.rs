// crates/crossbridge-history/src/drift.rs
// ============================================================================
// Module: Drift & Confidence Monitor (C7)
// Description: Rolling per-(test_id, framework) confidence windows with
//              change-point detection against a baseline.
// Dependencies: crossbridge-core
// ============================================================================

//! ## Overview
//! [`ConfidenceWindow`] keeps a rolling window (default 30 days) of
//! [`ConfidenceMeasurement`]s for one `(test_id, framework)` pair.
//! [`ConfidenceMonitor::record`] implements §4.7: once the window holds at
//! least `min_measurements`, it compares the mean of the first half against
//! the mean of the last quarter and emits a `confidence_drift` [`DriftSignal`]
//! at severity `high` or above.

use std::collections::BTreeMap;

use crossbridge_core::DriftSignal;
use crossbridge_core::DriftSignalType;
use crossbridge_core::Framework;
use crossbridge_core::NodeId;
use crossbridge_core::Severity;
use crossbridge_core::TestId;
use crossbridge_core::Timestamp;

/// Default rolling window length, in days.
pub const DEFAULT_WINDOW_DAYS: u64 = 30;
/// Default minimum measurements before drift is computed.
pub const DEFAULT_MIN_MEASUREMENTS: usize = 5;

/// One recorded confidence value for a test/framework pair.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceMeasurement {
    /// Final confidence from the explainability builder.
    pub confidence: f64,
    /// When this measurement was recorded.
    pub recorded_at: Timestamp,
}

/// Configuration for [`ConfidenceMonitor`].
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceMonitorConfig {
    /// Rolling window length, in days.
    pub window_days: u64,
    /// Minimum measurements in the window before drift is evaluated.
    pub min_measurements: usize,
}

impl Default for ConfidenceMonitorConfig {
    fn default() -> Self {
        Self { window_days: DEFAULT_WINDOW_DAYS, min_measurements: DEFAULT_MIN_MEASUREMENTS }
    }
}

/// The rolling window of measurements for one `(test_id, framework)` pair.
#[derive(Debug, Default)]
struct ConfidenceWindow {
    measurements: Vec<ConfidenceMeasurement>,
}

impl ConfidenceWindow {
    /// Drops measurements older than `window_days` relative to `now`.
    fn prune(&mut self, now: Timestamp, window_days: u64) {
        self.measurements.retain(|m| now.days_since(m.recorded_at) <= window_days);
    }
}

/// Maintains rolling confidence windows and detects drift, per §4.7.
#[derive(Debug, Default)]
pub struct ConfidenceMonitor {
    config: ConfidenceMonitorConfig,
    windows: BTreeMap<(String, String), ConfidenceWindow>,
}

impl ConfidenceMonitor {
    /// Builds a monitor with the given configuration.
    #[must_use]
    pub fn new(config: ConfidenceMonitorConfig) -> Self {
        Self { config, windows: BTreeMap::new() }
    }

    /// Records one confidence measurement and returns a `confidence_drift`
    /// [`DriftSignal`] when the computed delta crosses the `high` threshold.
    pub fn record(
        &mut self,
        test_id: &TestId,
        framework: &Framework,
        confidence: f64,
        recorded_at: Timestamp,
    ) -> Option<DriftSignal> {
        let key = (test_id.as_str().to_string(), framework.as_str().to_string());
        let window = self.windows.entry(key).or_default();
        window.prune(recorded_at, self.config.window_days);
        window.measurements.push(ConfidenceMeasurement { confidence, recorded_at });

        if window.measurements.len() < self.config.min_measurements {
            return None;
        }

        let (delta, severity) = compute_drift(&window.measurements)?;
        if severity < Severity::High {
            return None;
        }

        tracing::warn!(%test_id, %framework, delta_percent = delta * 100.0, ?severity, "confidence drift crossed the high severity threshold");
        Some(DriftSignal {
            signal_type: DriftSignalType::ConfidenceDrift,
            target_id: NodeId::new(format!("test:{}", test_id.as_str())),
            severity,
            detected_at: recorded_at,
            details: format!("confidence drifted {:+.1}% for {test_id} on {framework}", delta * 100.0),
        })
    }
}

/// Computes `delta = (current - baseline) / max(baseline, 0.01)` and its
/// severity, per §4.7.
fn compute_drift(measurements: &[ConfidenceMeasurement]) -> Option<(f64, Severity)> {
    let len = measurements.len();
    if len == 0 {
        return None;
    }
    let half = len / 2;
    let quarter = (len / 4).max(1);

    let baseline = mean(&measurements[..half.max(1)]);
    let current = mean(&measurements[len - quarter..]);
    let delta = (current - baseline) / baseline.max(0.01);

    Some((delta, severity_for(delta.abs() * 100.0)))
}

/// Mean confidence across a measurement slice.
#[allow(clippy::cast_precision_loss, reason = "measurement counts are small and bounded")]
fn mean(measurements: &[ConfidenceMeasurement]) -> f64 {
    measurements.iter().map(|m| m.confidence).sum::<f64>() / measurements.len() as f64
}

/// Maps an absolute percent change to a severity per §4.7's thresholds.
fn severity_for(abs_percent: f64) -> Severity {
    if abs_percent >= 30.0 {
        Severity::Critical
    } else if abs_percent >= 20.0 {
        Severity::High
    } else if abs_percent >= 10.0 {
        Severity::Moderate
    } else {
        Severity::Low
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use super::*;

    fn measurement(confidence: f64) -> ConfidenceMeasurement {
        ConfidenceMeasurement { confidence, recorded_at: Timestamp::now() }
    }

    #[test]
    fn stable_confidence_yields_no_drift_signal() {
        let values = [0.9, 0.9, 0.9, 0.9, 0.9, 0.9];
        let measurements: Vec<_> = values.iter().map(|v| measurement(*v)).collect();
        let (delta, severity) = compute_drift(&measurements).expect("enough measurements");
        assert!(delta.abs() < 1e-9);
        assert_eq!(severity, Severity::Low);
    }

    #[test]
    fn sharp_drop_crosses_high_severity() {
        let values = [0.95, 0.95, 0.95, 0.95, 0.4, 0.4];
        let measurements: Vec<_> = values.iter().map(|v| measurement(*v)).collect();
        let (delta, severity) = compute_drift(&measurements).expect("enough measurements");
        assert!(delta < 0.0);
        assert!(severity >= Severity::High);
    }

    #[test]
    fn monitor_suppresses_signal_below_min_measurements() {
        let mut monitor = ConfidenceMonitor::new(ConfidenceMonitorConfig::default());
        let test_id = TestId::new("t1");
        let framework = Framework::new("pytest");
        let signal = monitor.record(&test_id, &framework, 0.2, Timestamp::now());
        assert!(signal.is_none());
    }
}
