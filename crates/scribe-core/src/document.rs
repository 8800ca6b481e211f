//! Uniform output document produced by every mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Uniform result shape returned by every create/update operation.
///
/// Produced fresh per operation and never mutated after construction.
/// Fields absent from the provider response are omitted, not null-filled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultDocument {
    /// Provider identifier: a page id or an issue key.
    pub id: String,

    /// Page title or issue summary.
    pub title: String,

    /// Canonical URL of the entity.
    pub url: String,

    /// Entity version after the write, where the provider tracks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    /// Content as stored by the provider.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,

    /// Custom fields echoed back by the provider, keyed by display name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, Value>,

    /// Last modification timestamp, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ResultDocument {
    /// Create a document with the always-present fields.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            version: None,
            content: String::new(),
            custom_fields: BTreeMap::new(),
            last_modified: None,
        }
    }

    /// Attach a version number.
    #[must_use]
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    /// Attach stored content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Attach an echoed custom field.
    #[must_use]
    pub fn with_custom_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields.insert(name.into(), value.into());
        self
    }

    /// Attach a last-modified timestamp.
    #[must_use]
    pub fn with_last_modified(mut self, when: DateTime<Utc>) -> Self {
        self.last_modified = Some(when);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_absent_fields_are_omitted_when_serialized() {
        let doc = ResultDocument::new("12345", "Release Notes", "https://x.example/p/12345");
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(
            value,
            json!({
                "id": "12345",
                "title": "Release Notes",
                "url": "https://x.example/p/12345",
            })
        );
    }

    #[test]
    fn test_builder() {
        let doc = ResultDocument::new("PROJ-7", "Login flow", "https://x.example/browse/PROJ-7")
            .with_version(2)
            .with_custom_field("Acceptance Criteria", "Given/When/Then");

        assert_eq!(doc.version, Some(2));
        assert_eq!(
            doc.custom_fields.get("Acceptance Criteria"),
            Some(&json!("Given/When/Then"))
        );
    }
}
