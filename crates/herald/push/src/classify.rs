//! Provider error classification.

use herald_core::FailureKind;

/// Markers in FCM error text that mean the token will never work again.
pub const INVALID_TOKEN_MARKERS: [&str; 2] = ["NOT_FOUND", "INVALID_ARGUMENT"];

/// FCM `details[].errorCode` values that mean the same.
const INVALID_TOKEN_CODES: [&str; 2] = ["UNREGISTERED", "INVALID_ARGUMENT"];

/// Classify a failed delivery.
///
/// Structured fields win: a canonical `status` of `NOT_FOUND` or
/// `INVALID_ARGUMENT`, or an FCM error code of `UNREGISTERED` or
/// `INVALID_ARGUMENT`. Otherwise the message text is searched for the same
/// markers. Anything else is transient.
pub fn classify(status: Option<&str>, error_codes: &[&str], message: &str) -> FailureKind {
    let structured = status.is_some_and(|s| INVALID_TOKEN_MARKERS.contains(&s))
        || error_codes.iter().any(|c| INVALID_TOKEN_CODES.contains(c));

    if structured || INVALID_TOKEN_MARKERS.iter().any(|m| message.contains(m)) {
        FailureKind::Permanent
    } else {
        FailureKind::Transient
    }
}
