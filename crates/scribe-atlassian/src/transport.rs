//! Transport contract between the mutation core and the HTTP layer.
//!
//! The core treats both operations as blocking calls that return or fail;
//! retry of retryable failures is the transport implementation's concern,
//! never the core's.

use crate::payload::ProviderPayload;
use scribe_core::FieldDescriptor;
use serde_json::Value;

/// A provider response body.
pub type ProviderResponse = Value;

/// A failed provider interaction, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderFailure {
    /// The provider answered with a non-success status.
    Http {
        status: u16,
        body: Value,
        /// Backpressure hint from a `Retry-After` header, in seconds.
        retry_after_secs: Option<u64>,
    },

    /// The call never produced a provider response.
    Network(String),
}

impl ProviderFailure {
    /// Whether a transport implementation may retry this failure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, .. } => *status == 429 || (500..600).contains(status),
        }
    }
}

/// Write-side collaborator the orchestrators depend on.
///
/// Implemented over HTTP in [`crate::http`]; tests inject fakes.
pub trait ProviderTransport {
    /// Execute a validated write and return the provider's response body.
    ///
    /// # Errors
    /// Returns the raw failure; classification into the error taxonomy
    /// happens in the orchestrator.
    fn send_write(&self, payload: &ProviderPayload) -> Result<ProviderResponse, ProviderFailure>;

    /// Fetch the provider's field catalog.
    ///
    /// # Errors
    /// Returns the raw failure, as for [`Self::send_write`].
    fn fetch_field_catalog(&self) -> Result<Vec<FieldDescriptor>, ProviderFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retryable_failures() {
        let rate_limited = ProviderFailure::Http {
            status: 429,
            body: json!({}),
            retry_after_secs: Some(10),
        };
        let server_error = ProviderFailure::Http {
            status: 503,
            body: json!({}),
            retry_after_secs: None,
        };
        let conflict = ProviderFailure::Http {
            status: 409,
            body: json!({}),
            retry_after_secs: None,
        };

        assert!(rate_limited.is_retryable());
        assert!(server_error.is_retryable());
        assert!(ProviderFailure::Network("connection reset".into()).is_retryable());
        assert!(!conflict.is_retryable());
    }
}
