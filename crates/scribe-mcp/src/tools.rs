//! MCP tool definitions and handlers for the Atlassian mutations.

use crate::protocol::{ToolCallResult, ToolDefinition};
use scribe_atlassian::{IssueOrchestrator, PageOrchestrator, ProviderTransport};
use scribe_core::{
    IssueCreateRequest, IssueType, IssueUpdateRequest, MutationError, PageCreateRequest,
    PageUpdateRequest, ResultDocument,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// The orchestrators a tool call dispatches into.
pub struct Services<C: ProviderTransport, J: ProviderTransport> {
    pub pages: PageOrchestrator<C>,
    pub issues: IssueOrchestrator<J>,
}

/// All tools advertised by the server.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "confluence_create_page".to_string(),
            description: "Create a new Confluence page. Content is written in markdown and converted to the storage format.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "space_key": {
                        "type": "string",
                        "description": "Space key where the page will be created (e.g., DEV)"
                    },
                    "title": {
                        "type": "string",
                        "description": "Page title"
                    },
                    "content": {
                        "type": "string",
                        "description": "Page content in markdown"
                    },
                    "parent_id": {
                        "type": "string",
                        "description": "Optional parent page ID"
                    }
                },
                "required": ["space_key", "title", "content"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "confluence_update_page".to_string(),
            description: "Update an existing Confluence page. The version must match the version the page was read at; a stale version fails with a version conflict.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "page_id": {
                        "type": "string",
                        "description": "ID of the page to update"
                    },
                    "title": {
                        "type": "string",
                        "description": "New page title"
                    },
                    "content": {
                        "type": "string",
                        "description": "New page content in markdown"
                    },
                    "version": {
                        "type": "integer",
                        "description": "Version the page was read at"
                    }
                },
                "required": ["page_id", "title", "content", "version"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "jira_create_epic".to_string(),
            description: "Create a new Jira epic.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project_key": {
                        "type": "string",
                        "description": "Project key where the epic will be created"
                    },
                    "summary": {
                        "type": "string",
                        "description": "Epic summary/title"
                    },
                    "description": {
                        "type": "string",
                        "description": "Epic description"
                    },
                    "custom_fields": {
                        "type": "object",
                        "description": "Custom fields by display name or customfield_NNN id",
                        "additionalProperties": true
                    }
                },
                "required": ["project_key", "summary"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "jira_create_story".to_string(),
            description: "Create a new Jira story, optionally linked to an epic.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project_key": {
                        "type": "string",
                        "description": "Project key where the story will be created"
                    },
                    "summary": {
                        "type": "string",
                        "description": "Story summary/title"
                    },
                    "description": {
                        "type": "string",
                        "description": "Story description"
                    },
                    "epic_link": {
                        "type": "string",
                        "description": "Optional epic key to link the story to (e.g., PROJ-10)"
                    },
                    "custom_fields": {
                        "type": "object",
                        "description": "Custom fields by display name or customfield_NNN id (e.g., {\"Acceptance Criteria\": \"...\"})",
                        "additionalProperties": true
                    }
                },
                "required": ["project_key", "summary"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "jira_update_issue".to_string(),
            description: "Update fields on an existing Jira issue. Standard fields are addressed by name, custom fields by display name or customfield_NNN id.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "issue_key": {
                        "type": "string",
                        "description": "Key of the issue to update (e.g., PROJ-123)"
                    },
                    "fields": {
                        "type": "object",
                        "description": "Fields to set (e.g., {\"summary\": \"New title\", \"Acceptance Criteria\": \"...\"})",
                        "additionalProperties": true
                    }
                },
                "required": ["issue_key", "fields"],
                "additionalProperties": false
            }),
        },
    ]
}

/// Handle a tool call and return the result.
pub fn handle_tool_call<C: ProviderTransport, J: ProviderTransport>(
    services: &Services<C, J>,
    name: &str,
    arguments: Option<Value>,
) -> ToolCallResult {
    let args = arguments.unwrap_or_else(|| json!({}));

    match name {
        "confluence_create_page" => handle_create_page(services, args),
        "confluence_update_page" => handle_update_page(services, args),
        "jira_create_epic" => handle_create_issue(services, args, IssueType::Epic),
        "jira_create_story" => handle_create_issue(services, args, IssueType::Story),
        "jira_update_issue" => handle_update_issue(services, args),
        _ => ToolCallResult::error(format!("Unknown tool: {name}")),
    }
}

#[derive(Debug, Deserialize)]
struct CreatePageArgs {
    space_key: String,
    title: String,
    content: String,
    #[serde(default)]
    parent_id: Option<String>,
}

fn handle_create_page<C: ProviderTransport, J: ProviderTransport>(
    services: &Services<C, J>,
    args: Value,
) -> ToolCallResult {
    let args: CreatePageArgs = match serde_json::from_value(args) {
        Ok(args) => args,
        Err(err) => return ToolCallResult::error(format!("Invalid arguments: {err}")),
    };

    let mut request = PageCreateRequest::new(args.space_key, args.title, args.content);
    if let Some(parent_id) = args.parent_id {
        request = request.with_parent(parent_id);
    }

    render(services.pages.create_page(&request))
}

#[derive(Debug, Deserialize)]
struct UpdatePageArgs {
    page_id: String,
    title: String,
    content: String,
    version: i64,
}

fn handle_update_page<C: ProviderTransport, J: ProviderTransport>(
    services: &Services<C, J>,
    args: Value,
) -> ToolCallResult {
    let args: UpdatePageArgs = match serde_json::from_value(args) {
        Ok(args) => args,
        Err(err) => return ToolCallResult::error(format!("Invalid arguments: {err}")),
    };

    let request = PageUpdateRequest::new(args.page_id, args.title, args.content, args.version);
    render(services.pages.update_page(&request))
}

#[derive(Debug, Deserialize)]
struct CreateIssueArgs {
    project_key: String,
    summary: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    epic_link: Option<String>,
    #[serde(default)]
    custom_fields: BTreeMap<String, Value>,
}

fn handle_create_issue<C: ProviderTransport, J: ProviderTransport>(
    services: &Services<C, J>,
    args: Value,
    issue_type: IssueType,
) -> ToolCallResult {
    let args: CreateIssueArgs = match serde_json::from_value(args) {
        Ok(args) => args,
        Err(err) => return ToolCallResult::error(format!("Invalid arguments: {err}")),
    };

    let mut request = IssueCreateRequest::new(args.project_key, args.summary, issue_type)
        .with_description(args.description);
    if let Some(epic_link) = args.epic_link {
        request = request.with_epic_link(epic_link);
    }
    request.custom_fields = args.custom_fields;

    render(services.issues.create_issue(&request))
}

#[derive(Debug, Deserialize)]
struct UpdateIssueArgs {
    issue_key: String,
    fields: BTreeMap<String, Value>,
}

fn handle_update_issue<C: ProviderTransport, J: ProviderTransport>(
    services: &Services<C, J>,
    args: Value,
) -> ToolCallResult {
    let args: UpdateIssueArgs = match serde_json::from_value(args) {
        Ok(args) => args,
        Err(err) => return ToolCallResult::error(format!("Invalid arguments: {err}")),
    };

    let mut request = IssueUpdateRequest::new(args.issue_key);
    request.fields = args.fields;

    render(services.issues.update_issue(&request))
}

fn render(result: Result<ResultDocument, MutationError>) -> ToolCallResult {
    match result {
        Ok(document) => match serde_json::to_string_pretty(&document) {
            Ok(text) => ToolCallResult::text(text),
            Err(err) => ToolCallResult::error(format!("Failed to render result: {err}")),
        },
        Err(err) => ToolCallResult::error(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scribe_atlassian::{ProviderFailure, ProviderPayload, SiteConfig};
    use scribe_core::FieldDescriptor;

    /// Transport whose every write succeeds with a canned body.
    struct CannedTransport {
        response: Value,
    }

    impl ProviderTransport for CannedTransport {
        fn send_write(
            &self,
            _payload: &ProviderPayload,
        ) -> Result<Value, ProviderFailure> {
            Ok(self.response.clone())
        }

        fn fetch_field_catalog(&self) -> Result<Vec<FieldDescriptor>, ProviderFailure> {
            Ok(Vec::new())
        }
    }

    fn services() -> Services<CannedTransport, CannedTransport> {
        let site = SiteConfig::new("https://example.atlassian.net", "bot", "token").unwrap();
        Services {
            pages: PageOrchestrator::new(
                CannedTransport {
                    response: json!({ "id": "1", "title": "T", "version": { "number": 1 } }),
                },
                site.clone(),
            ),
            issues: IssueOrchestrator::new(
                CannedTransport {
                    response: json!({ "key": "PROJ-1" }),
                },
                site,
            ),
        }
    }

    #[test]
    fn test_tool_names_are_stable() {
        let names: Vec<String> = get_tool_definitions()
            .into_iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "confluence_create_page",
                "confluence_update_page",
                "jira_create_epic",
                "jira_create_story",
                "jira_update_issue",
            ]
        );
    }

    #[test]
    fn test_create_page_round_trip() {
        let result = handle_tool_call(
            &services(),
            "confluence_create_page",
            Some(json!({ "space_key": "DEV", "title": "T", "content": "# Hi" })),
        );
        assert_eq!(result.is_error, None);
    }

    #[test]
    fn test_missing_arguments_are_reported() {
        let result = handle_tool_call(
            &services(),
            "confluence_create_page",
            Some(json!({ "title": "T" })),
        );
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_epic_with_epic_link_is_rejected() {
        let result = handle_tool_call(
            &services(),
            "jira_create_epic",
            Some(json!({ "project_key": "PROJ", "summary": "S", "epic_link": "PROJ-1" })),
        );
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_unknown_tool() {
        let result = handle_tool_call(&services(), "nope", None);
        assert_eq!(result.is_error, Some(true));
    }
}
