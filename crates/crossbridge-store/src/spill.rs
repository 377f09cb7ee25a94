// crates/crossbridge-store/src/spill.rs
// ============================================================================
// Module: Spill Log
// Description: Local dead-letter log for events that failed persistence;
//              drained by a background retrier so ingress never blocks on a
//              down store (§4.9).
// Dependencies: crossbridge-core
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use crossbridge_core::ExecutionEvent;

use crate::error::StoreError;

/// Appends failed events as newline-delimited JSON, and drains them back out
/// in the order they were written.
pub struct SpillLog {
    path: PathBuf,
    writer: Mutex<File>,
}

impl SpillLog {
    /// Opens (creating if absent) a spill log file at `path`.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the file cannot be opened for append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let writer =
            OpenOptions::new().create(true).append(true).open(&path).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(Self { path, writer: Mutex::new(writer) })
    }

    /// Appends `event` to the spill log. Never blocks the caller beyond a
    /// single buffered write.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the write fails, or [`StoreError::Invalid`]
    /// if `event` cannot be serialized.
    pub fn append(&self, event: &ExecutionEvent) -> Result<(), StoreError> {
        let line = serde_json::to_string(event).map_err(|e| StoreError::Invalid(e.to_string()))?;
        let mut writer = self.writer.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(writer, "{line}").map_err(|e| StoreError::Io(e.to_string()))?;
        writer.flush().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }

    /// Reads every spilled event currently on disk, in append order. Entries
    /// that fail to parse are skipped and logged rather than aborting the
    /// drain (a future retry pass should not get stuck on one bad line).
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the file cannot be read.
    pub fn drain(&self) -> Result<Vec<ExecutionEvent>, StoreError> {
        read_events(&self.path)
    }

    /// Truncates the spill log after its contents have been durably re-persisted.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the file cannot be truncated.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut writer = self.writer.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *writer = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Parses every well-formed line of `path` as an [`ExecutionEvent`].
fn read_events(path: &Path) -> Result<Vec<ExecutionEvent>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StoreError::Io(err.to_string())),
    };
    let reader = BufReader::new(file);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| StoreError::Io(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(event) => events.push(event),
            Err(err) => tracing::warn!(%err, "skipping unparsable spill log line"),
        }
    }
    Ok(events)
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
            "status": "failed",
        }))
        .expect("valid raw event");
        ExecutionEvent::from_wire(raw).expect("normalizes")
    }

    #[test]
    fn appended_events_round_trip_through_drain() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = SpillLog::open(dir.path().join("spill.jsonl")).expect("open spill log");
        log.append(&sample_event()).expect("append");
        log.append(&sample_event()).expect("append");
        let drained = log.drain().expect("drain");
        assert_eq!(drained.len(), 2);
    }

    #[test]
    fn clear_empties_the_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = SpillLog::open(dir.path().join("spill.jsonl")).expect("open spill log");
        log.append(&sample_event()).expect("append");
        log.clear().expect("clear");
        assert!(log.drain().expect("drain").is_empty());
    }

    #[test]
    fn missing_file_drains_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let events = read_events(&dir.path().join("absent.jsonl")).expect("drain absent file");
        assert!(events.is_empty());
    }
}
