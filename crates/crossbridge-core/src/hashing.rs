// crates/crossbridge-core/src/hashing.rs
// ============================================================================
// Module: Failure Signature Hashing
// Description: Deterministic hashing of (test_id, failure_type, normalized
//              error message) into a stable [`FailureSignature`] (§4.6).
// Dependencies: sha2
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

use crate::identifiers::FailureSignature;

/// Normalizes an error message for signature hashing: lower-cases, strips
/// ASCII digits, strips UUID-shaped runs, and collapses whitespace.
///
/// This intentionally discards information (line numbers, object addresses,
/// generated identifiers) that varies run-to-run for what is semantically
/// the same failure.
#[must_use]
pub fn normalize_error_message(message: &str) -> String {
    let lowered = message.to_lowercase();
    let without_uuids = strip_uuids(&lowered);
    let without_digits: String =
        without_uuids.chars().filter(|c| !c.is_ascii_digit()).collect();
    without_digits.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replaces UUID-shaped substrings (`8-4-4-4-12` hex groups) with a single
/// placeholder token so distinct generated ids normalize identically.
fn strip_uuids(input: &str) -> String {
    let is_hex_run = |s: &str, len: usize| s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit());

    input
        .split(' ')
        .map(|token| {
            let groups: Vec<&str> = token.split('-').collect();
            let looks_like_uuid = groups.len() == 5
                && is_hex_run(groups[0], 8)
                && is_hex_run(groups[1], 4)
                && is_hex_run(groups[2], 4)
                && is_hex_run(groups[3], 4)
                && is_hex_run(groups[4], 12);
            if looks_like_uuid { "<uuid>" } else { token }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Computes the deterministic [`FailureSignature`] for `(test_id, failure_type,
/// normalized error message)`.
///
/// Callers pass `failure_type` as its wire string (e.g. `"PRODUCT_DEFECT"`)
/// so this module has no dependency on the classifier's type.
#[must_use]
pub fn failure_signature(test_id: &str, failure_type: &str, error_message: &str) -> FailureSignature {
    let normalized = normalize_error_message(error_message);
    let mut hasher = Sha256::new();
    hasher.update(test_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(failure_type.as_bytes());
    hasher.update(b"\0");
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    FailureSignature::from_digest(hex_encode(&digest))
}

/// Encodes bytes as lower-case hex without pulling in an extra dependency.
fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_digits_and_collapses_whitespace() {
        let normalized = normalize_error_message("Timeout  after   5000ms on line 42");
        assert_eq!(normalized, "timeout after ms on line");
    }

    #[test]
    fn normalize_strips_uuid_shaped_tokens() {
        let normalized = normalize_error_message("entity 550e8400-e29b-41d4-a716-446655440000 missing");
        assert_eq!(normalized, "entity <uuid> missing");
    }

    #[test]
    fn signature_is_stable_for_equivalent_inputs() {
        let a = failure_signature("t1", "PRODUCT_DEFECT", "Timeout after 5000ms");
        let b = failure_signature("t1", "PRODUCT_DEFECT", "timeout   after 9999ms");
        assert_eq!(a, b);
    }

    #[test]
    fn signature_differs_across_tests() {
        let a = failure_signature("t1", "PRODUCT_DEFECT", "boom");
        let b = failure_signature("t2", "PRODUCT_DEFECT", "boom");
        assert_ne!(a, b);
    }
}
