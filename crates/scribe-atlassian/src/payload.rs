//! Provider-shaped payloads and the mutation request builder.
//!
//! The builder turns a typed request into the exact JSON body the provider
//! accepts. All cheap checks happen here, before any network interaction:
//! required fields, the epic/epic-link rules, custom-field resolution
//! through the catalog, and per-type value validation. Whether a referenced
//! entity exists is a remote concern surfaced by the classifier.

use scribe_core::{
    content, FieldCatalog, IssueCreateRequest, IssueType, IssueUpdateRequest, MutationError,
    PageCreateRequest, PageUpdateRequest, Result,
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Display name of the Jira field carrying an epic's short name.
pub const EPIC_NAME_FIELD: &str = "Epic Name";

/// Display name of the Jira field linking a story to its epic.
pub const EPIC_LINK_FIELD: &str = "Epic Link";

/// Standard Jira fields addressable by name in an update request.
pub const STANDARD_ISSUE_FIELDS: &[&str] = &[
    "summary",
    "description",
    "labels",
    "priority",
    "assignee",
    "reporter",
    "duedate",
    "environment",
];

/// Storage-format body of a Confluence page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageBody {
    pub storage: StorageValue,
}

/// Body value with its representation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StorageValue {
    pub value: String,
    pub representation: String,
}

impl StorageValue {
    fn storage(value: String) -> Self {
        Self {
            value,
            representation: "storage".to_string(),
        }
    }
}

/// Space reference in a page-create body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SpaceRef {
    pub key: String,
}

/// Ancestor reference for parent/child page links.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AncestorRef {
    pub id: String,
}

/// Version carried by a page-update body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VersionRef {
    pub number: i64,
}

/// Request body for creating a Confluence page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageCreateBody {
    #[serde(rename = "type")]
    pub content_type: String,
    pub title: String,
    pub space: SpaceRef,
    pub body: PageBody,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<AncestorRef>,
}

/// Request body for updating a Confluence page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageUpdateBody {
    #[serde(rename = "type")]
    pub content_type: String,
    pub title: String,
    pub version: VersionRef,
    pub body: PageBody,
}

/// Request body for creating or updating a Jira issue: one `fields` object
/// holding standard fields and resolved custom-field identifiers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IssueBody {
    pub fields: Map<String, Value>,
}

/// A validated, provider-shaped write, ready for the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload {
    PageCreate(PageCreateBody),
    PageUpdate {
        page_id: String,
        /// Version the caller read the page at; attached so a provider
        /// rejection can be classified with both versions.
        expected_version: i64,
        body: PageUpdateBody,
    },
    IssueCreate(IssueBody),
    IssueUpdate {
        issue_key: String,
        body: IssueBody,
    },
}

/// Build the payload for a page-create request.
///
/// Content is routed through the normalizer exactly once; the normalizer's
/// marker makes re-normalization a no-op.
///
/// # Errors
/// `MutationError::Validation` on missing required fields.
pub fn build_page_create(request: &PageCreateRequest) -> Result<ProviderPayload> {
    request.validate()?;

    Ok(ProviderPayload::PageCreate(PageCreateBody {
        content_type: "page".to_string(),
        title: request.title.clone(),
        space: SpaceRef {
            key: request.space_key.clone(),
        },
        body: PageBody {
            storage: StorageValue::storage(content::normalize(&request.content).into_string()),
        },
        ancestors: request
            .parent_id
            .iter()
            .map(|id| AncestorRef { id: id.clone() })
            .collect(),
    }))
}

/// Build the payload for a page-update request.
///
/// # Errors
/// `MutationError::Validation` on missing required fields or a
/// non-positive version.
pub fn build_page_update(request: &PageUpdateRequest) -> Result<ProviderPayload> {
    request.validate()?;

    Ok(ProviderPayload::PageUpdate {
        page_id: request.page_id.clone(),
        expected_version: request.version,
        body: PageUpdateBody {
            content_type: "page".to_string(),
            title: request.title.clone(),
            version: VersionRef {
                number: request.version,
            },
            body: PageBody {
                storage: StorageValue::storage(
                    content::normalize(&request.content).into_string(),
                ),
            },
        },
    })
}

/// Build the payload for an issue-create request.
///
/// Epics carry the resolved `Epic Name` field set to the summary when the
/// catalog knows that field; stories with an epic link carry the resolved
/// `Epic Link` field. Custom fields are resolved through the catalog and
/// type-checked against their declared schema.
///
/// # Errors
/// `Validation`, `FieldNotFound`, `AmbiguousField`, `FieldConflict`, or
/// `InvalidFieldValue`.
pub fn build_issue_create(
    request: &IssueCreateRequest,
    catalog: &FieldCatalog,
) -> Result<ProviderPayload> {
    request.validate()?;

    let mut fields = Map::new();
    fields.insert("project".to_string(), json!({ "key": request.project_key }));
    fields.insert("summary".to_string(), json!(request.summary));
    fields.insert("description".to_string(), json!(request.description));
    fields.insert(
        "issuetype".to_string(),
        json!({ "name": request.issue_type.as_str() }),
    );

    match request.issue_type {
        IssueType::Epic => {
            // Sites without the Epic Name field fall back to the summary
            // alone; an ambiguous catalog still blocks the write.
            match catalog.resolve(EPIC_NAME_FIELD) {
                Ok(descriptor) => {
                    insert_resolved(
                        &mut fields,
                        EPIC_NAME_FIELD,
                        &descriptor.id,
                        json!(request.summary),
                    )?;
                }
                Err(MutationError::FieldNotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        IssueType::Story => {
            if let Some(epic_key) = &request.epic_link {
                let descriptor = catalog.resolve(EPIC_LINK_FIELD)?;
                insert_resolved(&mut fields, EPIC_LINK_FIELD, &descriptor.id, json!(epic_key))?;
            }
        }
    }

    for (name, value) in &request.custom_fields {
        let descriptor = catalog.resolve(name)?;
        descriptor.field_type.validate_value(name, value)?;
        insert_resolved(&mut fields, name, &descriptor.id, value.clone())?;
    }

    Ok(ProviderPayload::IssueCreate(IssueBody { fields }))
}

/// Build the payload for an issue-update request.
///
/// Standard fields are addressed by their lowercase name; everything else
/// resolves through the catalog.
///
/// # Errors
/// `Validation`, `FieldNotFound`, `AmbiguousField`, `FieldConflict`, or
/// `InvalidFieldValue`.
pub fn build_issue_update(
    request: &IssueUpdateRequest,
    catalog: &FieldCatalog,
) -> Result<ProviderPayload> {
    request.validate()?;

    let mut fields = Map::new();
    for (name, value) in &request.fields {
        let lower = name.to_ascii_lowercase();
        if STANDARD_ISSUE_FIELDS.contains(&lower.as_str()) {
            insert_resolved(&mut fields, name, &lower, value.clone())?;
        } else {
            let descriptor = catalog.resolve(name)?;
            descriptor.field_type.validate_value(name, value)?;
            insert_resolved(&mut fields, name, &descriptor.id, value.clone())?;
        }
    }

    Ok(ProviderPayload::IssueUpdate {
        issue_key: request.issue_key.clone(),
        body: IssueBody { fields },
    })
}

/// Insert a resolved field, failing on a collision instead of overwriting.
fn insert_resolved(
    fields: &mut Map<String, Value>,
    name: &str,
    resolved_id: &str,
    value: Value,
) -> Result<()> {
    if fields.contains_key(resolved_id) {
        return Err(MutationError::FieldConflict {
            field: name.to_string(),
            resolved_id: resolved_id.to_string(),
        });
    }
    fields.insert(resolved_id.to_string(), value);
    Ok(())
}
