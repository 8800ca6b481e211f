//! Error taxonomy for mutation operations.
//!
//! Every failure an operation can surface is one of these kinds. Local
//! validation failures are produced before any network interaction;
//! provider-reported failures are produced by the classifier in
//! `scribe-atlassian`. Only [`MutationError::RateLimited`] and
//! [`MutationError::TransientProvider`] are eligible for transport-level
//! retry; every other kind is terminal for the current call.

use thiserror::Error;

/// Result type alias for mutation operations.
pub type Result<T> = std::result::Result<T, MutationError>;

/// Errors that can occur while building or executing a mutation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MutationError {
    /// Malformed or missing required input, detected locally.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A field name or identifier has no match in the field catalog.
    #[error("field not found: '{field}'")]
    FieldNotFound { field: String },

    /// A field name matched more than one catalog entry.
    #[error("ambiguous field '{field}': matches {}", candidates.join(", "))]
    AmbiguousField {
        field: String,
        /// Identifiers of every matching catalog entry.
        candidates: Vec<String>,
    },

    /// A resolved custom field collides with a field already in the payload.
    #[error("field conflict: '{field}' resolves to '{resolved_id}', which is already set")]
    FieldConflict { field: String, resolved_id: String },

    /// The update was based on a stale version. Both versions are carried
    /// so the caller can re-fetch and resubmit; no automatic retry or merge.
    #[error("version conflict: update was based on version {expected}, current version is {actual}")]
    VersionConflict { expected: i64, actual: i64 },

    /// The provider rejected the credentials or the operation.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// A referenced entity (space, project, page, epic) does not exist.
    #[error("not found: {entity}")]
    NotFound { entity: String },

    /// A field value does not match the field's declared type.
    #[error("invalid value for field '{field}': {message}")]
    InvalidFieldValue { field: String, message: String },

    /// Provider backpressure. Retryable by the transport layer only.
    #[error("rate limited by provider{}", retry_after_secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// 5xx-class or network-level failure. Retryable by the transport layer only.
    #[error("transient provider error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    TransientProvider { status: Option<u16>, message: String },

    /// Unclassifiable provider response; raw payload kept for diagnostics.
    #[error("unexpected provider error ({status}): {body}")]
    UnknownProvider { status: u16, body: String },

    /// The caller's abort signal was observed before processing finished.
    #[error("operation aborted")]
    Aborted,
}

impl MutationError {
    /// Whether the transport layer may retry the failed call.
    ///
    /// Retry execution (bounded attempts, exponential backoff) lives in the
    /// transport; classification only marks eligibility.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::TransientProvider { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(MutationError::RateLimited {
            retry_after_secs: Some(30)
        }
        .is_retryable());
        assert!(MutationError::TransientProvider {
            status: Some(503),
            message: "unavailable".into()
        }
        .is_retryable());

        assert!(!MutationError::VersionConflict {
            expected: 3,
            actual: 4
        }
        .is_retryable());
        assert!(!MutationError::Validation("empty title".into()).is_retryable());
        assert!(!MutationError::FieldNotFound {
            field: "Sprint".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_version_conflict_message_carries_both_versions() {
        let err = MutationError::VersionConflict {
            expected: 3,
            actual: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains('3'));
        assert!(msg.contains('4'));
    }

    #[test]
    fn test_ambiguous_field_lists_candidates() {
        let err = MutationError::AmbiguousField {
            field: "Status".into(),
            candidates: vec!["customfield_10001".into(), "customfield_10002".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("customfield_10001"));
        assert!(msg.contains("customfield_10002"));
    }
}
