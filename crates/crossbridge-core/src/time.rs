// crates/crossbridge-core/src/time.rs
// ============================================================================
// Module: Canonical Timestamps
// Description: UTC timestamp representation shared by events, history, and
//              drift measurements.
// Purpose: One parse/format path for RFC3339 timestamps on and off the wire.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! Wire timestamps are RFC3339 strings in UTC. [`Timestamp::now`] is the only
//! place that reads the wall clock; everywhere else a `Timestamp` is either
//! parsed from the wire or passed down from a caller, which keeps tests able
//! to fix time exactly.

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// A UTC instant, always round-tripped on the wire as RFC3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Returns the current wall-clock time in UTC.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Wraps an existing UTC instant.
    #[must_use]
    pub fn from_offset_date_time(value: OffsetDateTime) -> Self {
        Self(value.to_offset(time::UtcOffset::UTC))
    }

    /// Returns the underlying UTC instant.
    #[must_use]
    pub const fn as_offset_date_time(self) -> OffsetDateTime {
        self.0
    }

    /// Parses an RFC3339 timestamp string.
    ///
    /// # Errors
    /// Returns an error if `input` is not valid RFC3339.
    pub fn parse(input: &str) -> Result<Self, time::error::Parse> {
        OffsetDateTime::parse(input, &Rfc3339).map(Self::from_offset_date_time)
    }

    /// Formats this timestamp as RFC3339.
    ///
    /// # Panics
    /// Never panics for a [`Timestamp`] constructed through this module's
    /// public API; `OffsetDateTime::format` only fails for out-of-range
    /// component values, which `time::OffsetDateTime` cannot represent.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        self.0.format(&Rfc3339).unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }

    /// Returns the number of whole days between `self` and `other`, clamped to zero.
    #[must_use]
    pub fn days_since(self, other: Self) -> u64 {
        let delta = self.0 - other.0;
        let days = delta.whole_days();
        u64::try_from(days).unwrap_or(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]

    use super::*;

    #[test]
    fn round_trips_through_rfc3339() {
        let parsed = Timestamp::parse("2026-01-30T12:34:56Z").expect("valid rfc3339");
        assert_eq!(parsed.to_rfc3339(), "2026-01-30T12:34:56Z");
    }

    #[test]
    fn days_since_clamps_to_zero_when_earlier() {
        let later = Timestamp::parse("2026-02-01T00:00:00Z").expect("valid rfc3339");
        let earlier = Timestamp::parse("2026-01-30T00:00:00Z").expect("valid rfc3339");
        assert_eq!(earlier.days_since(later), 0);
        assert_eq!(later.days_since(earlier), 2);
    }
}
