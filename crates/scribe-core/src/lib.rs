//! scribe-core: Domain models and mutation logic for Atlassian writes.
//!
//! This crate provides:
//! - Typed create/update requests for Confluence pages and Jira issues
//! - The field catalog with name-to-identifier resolution
//! - Content normalization into Confluence storage format
//! - The optimistic-concurrency version guard
//! - The closed error taxonomy every operation reports through

pub mod content;
pub mod document;
pub mod error;
pub mod fields;
pub mod request;
pub mod version;

pub use content::{is_normalized, normalize, NormalizedContent, STORAGE_MARKER};
pub use document::ResultDocument;
pub use error::{MutationError, Result};
pub use fields::{
    is_field_id, FieldCatalog, FieldDescriptor, FieldType, CUSTOM_FIELD_PREFIX,
};
pub use request::{
    is_issue_key, IssueCreateRequest, IssueType, IssueUpdateRequest, PageCreateRequest,
    PageUpdateRequest,
};
pub use version::check_version;
