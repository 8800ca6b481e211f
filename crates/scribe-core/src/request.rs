//! Typed create/update requests.
//!
//! A request is owned by the call that created it, validated locally before
//! any network interaction, and consumed by a single operation. Validation
//! here covers only cheap checks; existence of referenced entities is a
//! remote concern surfaced through the error classifier.

use crate::error::{MutationError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Request to create a Confluence page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageCreateRequest {
    /// Space key the page is created in (e.g., "DEV").
    pub space_key: String,

    /// Page title.
    pub title: String,

    /// Page content in the input markup dialect.
    pub content: String,

    /// Optional parent page identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl PageCreateRequest {
    /// Create a new page-create request.
    #[must_use]
    pub fn new(
        space_key: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            space_key: space_key.into(),
            title: title.into(),
            content: content.into(),
            parent_id: None,
        }
    }

    /// Set the parent page.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Check required fields.
    ///
    /// # Errors
    /// Returns `MutationError::Validation` if a required field is empty.
    pub fn validate(&self) -> Result<()> {
        if self.space_key.trim().is_empty() {
            return Err(MutationError::Validation("space key must not be empty".into()));
        }
        if self.title.trim().is_empty() {
            return Err(MutationError::Validation("page title must not be empty".into()));
        }
        Ok(())
    }
}

/// Request to update an existing Confluence page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageUpdateRequest {
    /// Identifier of the page to update.
    pub page_id: String,

    /// New title.
    pub title: String,

    /// New content in the input markup dialect.
    pub content: String,

    /// Version the update was read against. The provider rejects the write
    /// if this is stale; a conflict surfaces as `VersionConflict`, never as
    /// a silent overwrite or auto-merge.
    pub version: i64,
}

impl PageUpdateRequest {
    /// Create a new page-update request.
    #[must_use]
    pub fn new(
        page_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        version: i64,
    ) -> Self {
        Self {
            page_id: page_id.into(),
            title: title.into(),
            content: content.into(),
            version,
        }
    }

    /// Check required fields.
    ///
    /// # Errors
    /// Returns `MutationError::Validation` if a required field is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.page_id.trim().is_empty() {
            return Err(MutationError::Validation("page id must not be empty".into()));
        }
        if self.title.trim().is_empty() {
            return Err(MutationError::Validation("page title must not be empty".into()));
        }
        if self.version < 1 {
            return Err(MutationError::Validation(format!(
                "page version must be a positive integer, got {}",
                self.version
            )));
        }
        Ok(())
    }
}

/// Issue types supported for creation. Closed set, extensible by adding
/// variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IssueType {
    Epic,
    Story,
}

impl IssueType {
    /// Provider-facing name of the issue type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Epic => "Epic",
            Self::Story => "Story",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to create a Jira issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueCreateRequest {
    /// Project key (e.g., "PROJ").
    pub project_key: String,

    /// Issue summary/title.
    pub summary: String,

    /// Issue description.
    #[serde(default)]
    pub description: String,

    /// Issue type.
    pub issue_type: IssueType,

    /// Epic to link this issue to. Valid only for stories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic_link: Option<String>,

    /// Custom fields, keyed by display name or `customfield_NNN` identifier.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, Value>,
}

impl IssueCreateRequest {
    /// Create a new issue-create request.
    #[must_use]
    pub fn new(
        project_key: impl Into<String>,
        summary: impl Into<String>,
        issue_type: IssueType,
    ) -> Self {
        Self {
            project_key: project_key.into(),
            summary: summary.into(),
            description: String::new(),
            issue_type,
            epic_link: None,
            custom_fields: BTreeMap::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Link the issue to an epic.
    #[must_use]
    pub fn with_epic_link(mut self, epic_key: impl Into<String>) -> Self {
        self.epic_link = Some(epic_key.into());
        self
    }

    /// Set a custom field value.
    #[must_use]
    pub fn with_custom_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields.insert(name.into(), value.into());
        self
    }

    /// Check required fields and the epic-link rules.
    ///
    /// The epic-link check is syntactic only; whether the referenced epic
    /// exists is a remote concern.
    ///
    /// # Errors
    /// Returns `MutationError::Validation` on empty required fields, an
    /// epic-link on an epic, or a malformed epic key.
    pub fn validate(&self) -> Result<()> {
        if self.project_key.trim().is_empty() {
            return Err(MutationError::Validation("project key must not be empty".into()));
        }
        if self.summary.trim().is_empty() {
            return Err(MutationError::Validation("summary must not be empty".into()));
        }
        match (&self.issue_type, &self.epic_link) {
            // An epic cannot be its own child.
            (IssueType::Epic, Some(_)) => Err(MutationError::Validation(
                "epic issues cannot carry an epic link".into(),
            )),
            (IssueType::Story, Some(key)) if !is_issue_key(key) => {
                Err(MutationError::Validation(format!(
                    "'{key}' is not a well-formed issue key (expected e.g. 'PROJ-10')"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Request to update a Jira issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueUpdateRequest {
    /// Key of the issue to update (e.g., "PROJ-123").
    pub issue_key: String,

    /// Fields to set, keyed by standard field name, display name, or
    /// `customfield_NNN` identifier.
    pub fields: BTreeMap<String, Value>,
}

impl IssueUpdateRequest {
    /// Create a new issue-update request.
    #[must_use]
    pub fn new(issue_key: impl Into<String>) -> Self {
        Self {
            issue_key: issue_key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field assignment.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Check required fields.
    ///
    /// # Errors
    /// Returns `MutationError::Validation` on a malformed key or an empty
    /// field set.
    pub fn validate(&self) -> Result<()> {
        if !is_issue_key(&self.issue_key) {
            return Err(MutationError::Validation(format!(
                "'{}' is not a well-formed issue key (expected e.g. 'PROJ-123')",
                self.issue_key
            )));
        }
        if self.fields.is_empty() {
            return Err(MutationError::Validation(
                "issue update must set at least one field".into(),
            ));
        }
        Ok(())
    }
}

/// Whether a string has the shape of an issue key: an uppercase project key
/// starting with a letter, a dash, and a numeric issue number.
#[must_use]
pub fn is_issue_key(key: &str) -> bool {
    let Some((project, number)) = key.split_once('-') else {
        return false;
    };
    let project_ok = project
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
        && project.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    let number_ok = !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    project_ok && number_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_create_validation() {
        let req = PageCreateRequest::new("DEV", "Release Notes", "h1. Notes");
        assert!(req.validate().is_ok());

        let req = PageCreateRequest::new("DEV", "  ", "content");
        assert!(matches!(req.validate(), Err(MutationError::Validation(_))));

        let req = PageCreateRequest::new("", "Title", "content");
        assert!(matches!(req.validate(), Err(MutationError::Validation(_))));
    }

    #[test]
    fn test_page_update_requires_positive_version() {
        let req = PageUpdateRequest::new("12345", "Title", "content", 0);
        assert!(matches!(req.validate(), Err(MutationError::Validation(_))));

        let req = PageUpdateRequest::new("12345", "Title", "content", 3);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_epic_rejects_epic_link() {
        let req = IssueCreateRequest::new("PROJ", "Big feature", IssueType::Epic)
            .with_epic_link("PROJ-10");
        assert!(matches!(req.validate(), Err(MutationError::Validation(_))));
    }

    #[test]
    fn test_story_epic_link_must_be_well_formed() {
        let req = IssueCreateRequest::new("PROJ", "Small slice", IssueType::Story)
            .with_epic_link("not a key");
        assert!(matches!(req.validate(), Err(MutationError::Validation(_))));

        let req = IssueCreateRequest::new("PROJ", "Small slice", IssueType::Story)
            .with_epic_link("PROJ-10");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_issue_key_shape() {
        assert!(is_issue_key("PROJ-10"));
        assert!(is_issue_key("AB2-1234"));
        assert!(!is_issue_key("proj-10"));
        assert!(!is_issue_key("PROJ"));
        assert!(!is_issue_key("PROJ-"));
        assert!(!is_issue_key("PROJ-1a"));
        assert!(!is_issue_key("1AB-10"));
    }

    #[test]
    fn test_issue_update_builder() {
        let req = IssueUpdateRequest::new("PROJ-7")
            .with_field("summary", "New title")
            .with_field("Acceptance Criteria", "Given/When/Then");

        assert!(req.validate().is_ok());
        assert_eq!(req.fields.len(), 2);

        let empty = IssueUpdateRequest::new("PROJ-7");
        assert!(matches!(empty.validate(), Err(MutationError::Validation(_))));
    }
}
