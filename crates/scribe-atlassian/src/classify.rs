//! Classification of provider failures into the error taxonomy.
//!
//! Atlassian error payloads vary by product: Confluence reports a single
//! `message`, Jira reports `errorMessages` plus a per-field `errors` map.
//! The classifier inspects status and body and produces exactly one
//! [`MutationError`] kind, carrying enough structured context (versions,
//! field names, entity keys) that the caller never has to re-derive it
//! from the raw payload.

use crate::transport::ProviderFailure;
use scribe_core::{check_version, MutationError};
use serde_json::Value;

/// Context attached to a write so its failure classifies precisely.
#[derive(Debug, Clone, Default)]
pub struct WriteContext {
    /// Human description of the targeted entity (e.g., "page '12345'").
    pub entity: String,

    /// Version the write was based on, for update operations.
    pub expected_version: Option<i64>,
}

impl WriteContext {
    /// Context for a write against the named entity.
    #[must_use]
    pub fn entity(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            expected_version: None,
        }
    }

    /// Attach the version the write was based on.
    #[must_use]
    pub fn with_expected_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Map a raw provider failure to its taxonomy kind.
#[must_use]
pub fn classify(failure: &ProviderFailure, context: &WriteContext) -> MutationError {
    match failure {
        ProviderFailure::Network(message) => MutationError::TransientProvider {
            status: None,
            message: message.clone(),
        },
        ProviderFailure::Http {
            status,
            body,
            retry_after_secs,
        } => classify_http(*status, body, *retry_after_secs, context),
    }
}

fn classify_http(
    status: u16,
    body: &Value,
    retry_after_secs: Option<u64>,
    context: &WriteContext,
) -> MutationError {
    match status {
        401 | 403 => MutationError::PermissionDenied {
            message: provider_message(body),
        },
        404 => MutationError::NotFound {
            entity: if context.entity.is_empty() {
                provider_message(body)
            } else {
                context.entity.clone()
            },
        },
        409 => classify_conflict(body, context),
        400 | 422 => classify_bad_request(status, body, context),
        429 => MutationError::RateLimited { retry_after_secs },
        500..=599 => MutationError::TransientProvider {
            status: Some(status),
            message: provider_message(body),
        },
        _ => MutationError::UnknownProvider {
            status,
            body: body.to_string(),
        },
    }
}

/// Translate the provider's optimistic-concurrency rejection.
///
/// The current version is taken from the structured body when present, and
/// from the message text otherwise. A 409 with no recoverable version is
/// left unclassified rather than guessed.
fn classify_conflict(body: &Value, context: &WriteContext) -> MutationError {
    let actual = body
        .get("currentVersion")
        .and_then(Value::as_i64)
        .or_else(|| {
            body.pointer("/version/number").and_then(Value::as_i64)
        })
        .or_else(|| trailing_integer(&provider_message(body)));

    if let (Some(expected), Some(actual)) = (context.expected_version, actual) {
        if let Err(err) = check_version(expected, actual) {
            return err;
        }
    }
    MutationError::UnknownProvider {
        status: 409,
        body: body.to_string(),
    }
}

/// Split Jira's per-field errors from generic request errors.
fn classify_bad_request(status: u16, body: &Value, context: &WriteContext) -> MutationError {
    if let Some(errors) = body.get("errors").and_then(Value::as_object) {
        if let Some((field, detail)) = errors.iter().next() {
            let message = detail.as_str().unwrap_or_default().to_string();
            // Jira reports an unknown or unsettable field id here.
            if message.contains("cannot be set") || message.contains("does not exist") {
                return MutationError::FieldNotFound {
                    field: field.clone(),
                };
            }
            return MutationError::InvalidFieldValue {
                field: field.clone(),
                message,
            };
        }
    }

    let message = provider_message(body);
    if message.contains("does not exist") {
        return MutationError::NotFound {
            entity: if context.entity.is_empty() {
                message
            } else {
                context.entity.clone()
            },
        };
    }

    MutationError::UnknownProvider {
        status,
        body: body.to_string(),
    }
}

/// Best-effort human message from either product's error shape.
fn provider_message(body: &Value) -> String {
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    if let Some(messages) = body.get("errorMessages").and_then(Value::as_array) {
        let joined: Vec<&str> = messages.iter().filter_map(Value::as_str).collect();
        if !joined.is_empty() {
            return joined.join("; ");
        }
    }
    body.to_string()
}

/// Last run of ASCII digits in a message, e.g. the current version in
/// "current version is 4".
fn trailing_integer(message: &str) -> Option<i64> {
    let digits: String = message
        .chars()
        .rev()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.chars().rev().collect::<String>().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_version_conflict_carries_both_versions() {
        let failure = ProviderFailure::Http {
            status: 409,
            body: json!({ "message": "Version conflict: current version is 4" }),
            retry_after_secs: None,
        };
        let context = WriteContext::entity("page '12345'").with_expected_version(3);

        assert_eq!(
            classify(&failure, &context),
            MutationError::VersionConflict {
                expected: 3,
                actual: 4
            }
        );
    }

    #[test]
    fn test_version_conflict_prefers_structured_body() {
        let failure = ProviderFailure::Http {
            status: 409,
            body: json!({ "currentVersion": 7, "message": "conflict" }),
            retry_after_secs: None,
        };
        let context = WriteContext::entity("page '1'").with_expected_version(5);

        assert_eq!(
            classify(&failure, &context),
            MutationError::VersionConflict {
                expected: 5,
                actual: 7
            }
        );
    }

    #[test]
    fn test_permission_denied() {
        let failure = ProviderFailure::Http {
            status: 403,
            body: json!({ "message": "Insufficient permissions" }),
            retry_after_secs: None,
        };
        assert_eq!(
            classify(&failure, &WriteContext::default()),
            MutationError::PermissionDenied {
                message: "Insufficient permissions".into()
            }
        );
    }

    #[test]
    fn test_not_found_uses_context_entity() {
        let failure = ProviderFailure::Http {
            status: 404,
            body: json!({}),
            retry_after_secs: None,
        };
        let context = WriteContext::entity("space 'DEV'");
        assert_eq!(
            classify(&failure, &context),
            MutationError::NotFound {
                entity: "space 'DEV'".into()
            }
        );
    }

    #[test]
    fn test_jira_field_errors() {
        let unknown = ProviderFailure::Http {
            status: 400,
            body: json!({ "errors": { "customfield_99999": "Field 'customfield_99999' cannot be set. It is not on the appropriate screen, or unknown." } }),
            retry_after_secs: None,
        };
        assert!(matches!(
            classify(&unknown, &WriteContext::default()),
            MutationError::FieldNotFound { ref field } if field == "customfield_99999"
        ));

        let bad_value = ProviderFailure::Http {
            status: 400,
            body: json!({ "errors": { "priority": "Could not find valid 'id' or 'name' in priority data." } }),
            retry_after_secs: None,
        };
        assert!(matches!(
            classify(&bad_value, &WriteContext::default()),
            MutationError::InvalidFieldValue { ref field, .. } if field == "priority"
        ));
    }

    #[test]
    fn test_missing_project_is_not_found() {
        let failure = ProviderFailure::Http {
            status: 400,
            body: json!({ "errorMessages": ["Project 'NOPE' does not exist."] }),
            retry_after_secs: None,
        };
        assert_eq!(
            classify(&failure, &WriteContext::entity("project 'NOPE'")),
            MutationError::NotFound {
                entity: "project 'NOPE'".into()
            }
        );
    }

    #[test]
    fn test_rate_limited_and_server_errors_are_retryable() {
        let rate_limited = ProviderFailure::Http {
            status: 429,
            body: json!({}),
            retry_after_secs: Some(30),
        };
        let classified = classify(&rate_limited, &WriteContext::default());
        assert_eq!(
            classified,
            MutationError::RateLimited {
                retry_after_secs: Some(30)
            }
        );
        assert!(classified.is_retryable());

        let unavailable = ProviderFailure::Http {
            status: 503,
            body: json!({ "message": "maintenance" }),
            retry_after_secs: None,
        };
        assert!(classify(&unavailable, &WriteContext::default()).is_retryable());
    }

    #[test]
    fn test_network_failure_is_transient() {
        let classified = classify(
            &ProviderFailure::Network("connection refused".into()),
            &WriteContext::default(),
        );
        assert_eq!(
            classified,
            MutationError::TransientProvider {
                status: None,
                message: "connection refused".into()
            }
        );
    }

    #[test]
    fn test_unclassifiable_response_keeps_raw_body() {
        let failure = ProviderFailure::Http {
            status: 418,
            body: json!({ "odd": true }),
            retry_after_secs: None,
        };
        assert_eq!(
            classify(&failure, &WriteContext::default()),
            MutationError::UnknownProvider {
                status: 418,
                body: "{\"odd\":true}".into()
            }
        );
    }
}
