//! Mapping provider responses into the uniform result document.
//!
//! Pure transforms with no side effects. Provider responses are treated as
//! loosely shaped: optional fields map to omission, never to null-filled
//! entries, and a malformed body surfaces as `UnknownProvider` with the
//! raw payload attached.

use crate::config::SiteConfig;
use crate::payload::IssueBody;
use chrono::{DateTime, Utc};
use scribe_core::{FieldCatalog, MutationError, Result, ResultDocument, CUSTOM_FIELD_PREFIX};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
struct PageResponse {
    id: String,
    title: String,
    #[serde(default)]
    version: Option<PageVersion>,
    #[serde(default)]
    space: Option<PageSpace>,
    #[serde(default)]
    body: Option<PageResponseBody>,
}

#[derive(Debug, Deserialize)]
struct PageVersion {
    number: i64,
    #[serde(default)]
    when: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PageSpace {
    #[serde(default)]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageResponseBody {
    #[serde(default)]
    storage: Option<PageStorage>,
}

#[derive(Debug, Deserialize)]
struct PageStorage {
    #[serde(default)]
    value: Option<String>,
}

/// Map a Confluence page response to a result document.
///
/// # Errors
/// `MutationError::UnknownProvider` if the response lacks the page shape.
pub fn map_page(response: &Value, site: &SiteConfig) -> Result<ResultDocument> {
    let page: PageResponse = deserialize(response)?;

    let url = match page.space.as_ref().and_then(|s| s.key.as_deref()) {
        Some(space_key) => site.endpoint(&format!(
            "wiki/spaces/{space_key}/pages/{}",
            page.id
        )),
        None => site.endpoint(&format!("pages/{}", page.id)),
    };

    let mut document = ResultDocument::new(&page.id, &page.title, url);
    if let Some(version) = page.version {
        document = document.with_version(version.number);
        if let Some(when) = version.when {
            document = document.with_last_modified(when);
        }
    }
    if let Some(value) = page
        .body
        .and_then(|b| b.storage)
        .and_then(|s| s.value)
    {
        document = document.with_content(value);
    }
    Ok(document)
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    fields: Option<Map<String, Value>>,
}

/// Map a Jira issue response to a result document.
///
/// Create responses carry only `id`/`key`/`self`; any `fields` object
/// present is used to fill the summary and echo custom fields back by
/// display name.
///
/// # Errors
/// `MutationError::UnknownProvider` if the response has no issue identifier.
pub fn map_issue(
    response: &Value,
    site: &SiteConfig,
    catalog: &FieldCatalog,
) -> Result<ResultDocument> {
    let issue: IssueResponse = deserialize(response)?;

    let key = issue
        .key
        .or(issue.id)
        .ok_or_else(|| MutationError::UnknownProvider {
            status: 200,
            body: response.to_string(),
        })?;

    let mut document = ResultDocument::new(&key, "", site.endpoint(&format!("browse/{key}")));

    if let Some(fields) = issue.fields {
        if let Some(summary) = fields.get("summary").and_then(Value::as_str) {
            document.title = summary.to_string();
        }
        if let Some(description) = fields.get("description").and_then(Value::as_str) {
            document = document.with_content(description);
        }
        document.custom_fields = echo_custom_fields(&fields, catalog);
    }

    Ok(document)
}

/// Build the result document for an issue update.
///
/// Jira answers a field update with an empty body, so the document is
/// derived from the write itself: resolved identifiers map back to their
/// display names through the catalog.
#[must_use]
pub fn map_issue_update(
    issue_key: &str,
    body: &IssueBody,
    site: &SiteConfig,
    catalog: &FieldCatalog,
) -> ResultDocument {
    let mut document = ResultDocument::new(
        issue_key,
        body.fields
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default(),
        site.endpoint(&format!("browse/{issue_key}")),
    );
    document.custom_fields = echo_custom_fields(&body.fields, catalog);
    document
}

/// Custom fields present in a fields object, keyed by display name.
fn echo_custom_fields(
    fields: &Map<String, Value>,
    catalog: &FieldCatalog,
) -> std::collections::BTreeMap<String, Value> {
    fields
        .iter()
        .filter(|(id, value)| id.starts_with(CUSTOM_FIELD_PREFIX) && !value.is_null())
        .map(|(id, value)| {
            let name = catalog
                .by_id(id)
                .map_or_else(|| id.clone(), |d| d.name.clone());
            (name, value.clone())
        })
        .collect()
}

fn deserialize<'a, T: Deserialize<'a>>(response: &'a Value) -> Result<T> {
    T::deserialize(response).map_err(|_| MutationError::UnknownProvider {
        status: 200,
        body: response.to_string(),
    })
}
