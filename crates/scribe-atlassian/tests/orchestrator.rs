//! End-to-end orchestration tests against a scripted fake transport.

use scribe_atlassian::{
    AbortFlag, IssueOrchestrator, PageOrchestrator, ProviderFailure, ProviderPayload,
    ProviderTransport, SiteConfig,
};
use scribe_core::{
    FieldDescriptor, FieldType, IssueCreateRequest, IssueType, IssueUpdateRequest, MutationError,
    PageCreateRequest, PageUpdateRequest, STORAGE_MARKER,
};
use serde_json::{json, Value};
use std::cell::RefCell;

type WriteResult = Result<Value, ProviderFailure>;

/// Scripted transport: each write pops the next scripted outcome; every
/// interaction is recorded for assertions.
struct FakeTransport {
    catalogs: RefCell<Vec<Vec<FieldDescriptor>>>,
    writes: RefCell<Vec<WriteResult>>,
    sent: RefCell<Vec<ProviderPayload>>,
    catalog_fetches: RefCell<u32>,
}

impl FakeTransport {
    fn new(catalog: Vec<FieldDescriptor>) -> Self {
        Self {
            catalogs: RefCell::new(vec![catalog]),
            writes: RefCell::new(Vec::new()),
            sent: RefCell::new(Vec::new()),
            catalog_fetches: RefCell::new(0),
        }
    }

    fn with_next_catalog(self, catalog: Vec<FieldDescriptor>) -> Self {
        self.catalogs.borrow_mut().push(catalog);
        self
    }

    fn with_write_result(self, result: WriteResult) -> Self {
        self.writes.borrow_mut().push(result);
        self
    }

    fn writes_sent(&self) -> usize {
        self.sent.borrow().len()
    }

    fn catalog_fetches(&self) -> u32 {
        *self.catalog_fetches.borrow()
    }
}

impl ProviderTransport for FakeTransport {
    fn send_write(&self, payload: &ProviderPayload) -> Result<Value, ProviderFailure> {
        self.sent.borrow_mut().push(payload.clone());
        self.writes.borrow_mut().remove(0)
    }

    fn fetch_field_catalog(&self) -> Result<Vec<FieldDescriptor>, ProviderFailure> {
        *self.catalog_fetches.borrow_mut() += 1;
        let mut catalogs = self.catalogs.borrow_mut();
        if catalogs.len() > 1 {
            Ok(catalogs.remove(0))
        } else {
            Ok(catalogs[0].clone())
        }
    }
}

fn site() -> SiteConfig {
    SiteConfig::new("https://example.atlassian.net", "bot", "token").unwrap()
}

fn jira_catalog() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("customfield_10019", "Epic Link", FieldType::String),
        FieldDescriptor::new("customfield_10050", "Acceptance Criteria", FieldType::String),
    ]
}

#[test]
fn create_page_normalizes_content_and_maps_response() {
    let transport = FakeTransport::new(Vec::new()).with_write_result(Ok(json!({
        "id": "12345",
        "title": "Release Notes",
        "version": { "number": 1 },
        "space": { "key": "DEV" },
        "body": { "storage": { "value": "<p>hello</p>" } }
    })));
    let orchestrator = PageOrchestrator::new(transport, site());

    let request = PageCreateRequest::new("DEV", "Release Notes", "# Notes\n\nhello\n");
    let document = orchestrator.create_page(&request).unwrap();

    assert_eq!(document.id, "12345");
    assert_eq!(document.version, Some(1));
    assert_eq!(
        document.url,
        "https://example.atlassian.net/wiki/spaces/DEV/pages/12345"
    );
}

#[test]
fn create_page_sends_storage_format_exactly_once() {
    let transport = FakeTransport::new(Vec::new())
        .with_write_result(Ok(json!({ "id": "1", "title": "T" })));
    let orchestrator = PageOrchestrator::new(transport, site());

    orchestrator
        .create_page(&PageCreateRequest::new("DEV", "T", "# Heading\n"))
        .unwrap();

    let sent = orchestrator_transport_sent(&orchestrator);
    let ProviderPayload::PageCreate(body) = &sent[0] else {
        panic!("expected page create payload");
    };
    assert!(body.body.storage.value.starts_with(STORAGE_MARKER));
    assert!(body.body.storage.value.contains("<h1>Heading</h1>"));
}

#[test]
fn stale_page_update_is_a_version_conflict_with_no_retry() {
    let transport = FakeTransport::new(Vec::new()).with_write_result(Err(ProviderFailure::Http {
        status: 409,
        body: json!({ "message": "Version conflict: current version is 4" }),
        retry_after_secs: None,
    }));
    let orchestrator = PageOrchestrator::new(transport, site());

    let request = PageUpdateRequest::new("12345", "Notes", "text", 3);
    let err = orchestrator.update_page(&request).unwrap_err();

    assert_eq!(
        err,
        MutationError::VersionConflict {
            expected: 3,
            actual: 4
        }
    );
    // Exactly one write attempt: conflicts are terminal.
    assert_eq!(orchestrator_transport(&orchestrator).writes_sent(), 1);
}

#[test]
fn epic_with_epic_link_fails_before_any_network_interaction() {
    let transport = FakeTransport::new(jira_catalog());
    let orchestrator = IssueOrchestrator::new(transport, site());

    let request =
        IssueCreateRequest::new("PROJ", "Big feature", IssueType::Epic).with_epic_link("PROJ-10");
    let err = orchestrator.create_issue(&request).unwrap_err();

    assert!(matches!(err, MutationError::Validation(_)));
    let transport = issue_transport(&orchestrator);
    assert_eq!(transport.writes_sent(), 0);
    assert_eq!(transport.catalog_fetches(), 0);
}

#[test]
fn story_with_epic_link_and_custom_field_builds_resolved_payload() {
    let transport = FakeTransport::new(jira_catalog())
        .with_write_result(Ok(json!({ "id": "10001", "key": "PROJ-11" })));
    let orchestrator = IssueOrchestrator::new(transport, site());

    let request = IssueCreateRequest::new("PROJ", "Login flow", IssueType::Story)
        .with_epic_link("PROJ-10")
        .with_custom_field("Acceptance Criteria", "Given a user...");
    let document = orchestrator.create_issue(&request).unwrap();

    assert_eq!(document.id, "PROJ-11");
    assert_eq!(document.title, "Login flow");
    assert_eq!(document.url, "https://example.atlassian.net/browse/PROJ-11");

    let transport = issue_transport(&orchestrator);
    let sent = transport.sent.borrow();
    let ProviderPayload::IssueCreate(body) = &sent[0] else {
        panic!("expected issue create payload");
    };
    assert_eq!(body.fields["customfield_10019"], json!("PROJ-10"));
    assert_eq!(body.fields["customfield_10050"], json!("Given a user..."));
}

#[test]
fn unknown_field_triggers_exactly_one_catalog_refresh() {
    // First catalog lacks the field; the refreshed one has it.
    let transport = FakeTransport::new(vec![FieldDescriptor::new(
        "customfield_10019",
        "Epic Link",
        FieldType::String,
    )])
    .with_next_catalog(jira_catalog())
    .with_write_result(Ok(json!({ "key": "PROJ-12" })));
    let orchestrator = IssueOrchestrator::new(transport, site());

    let request = IssueCreateRequest::new("PROJ", "Slice", IssueType::Story)
        .with_custom_field("Acceptance Criteria", "text");
    let document = orchestrator.create_issue(&request).unwrap();

    assert_eq!(document.id, "PROJ-12");
    assert_eq!(issue_transport(&orchestrator).catalog_fetches(), 2);
}

#[test]
fn field_missing_after_refresh_is_permanent() {
    let transport = FakeTransport::new(vec![]);
    let orchestrator = IssueOrchestrator::new(transport, site());

    let request = IssueCreateRequest::new("PROJ", "Slice", IssueType::Story)
        .with_custom_field("Acceptance Criteria", "text");
    let err = orchestrator.create_issue(&request).unwrap_err();

    assert_eq!(
        err,
        MutationError::FieldNotFound {
            field: "Acceptance Criteria".into()
        }
    );
    let transport = issue_transport(&orchestrator);
    // One initial fetch plus the single automatic refresh, then permanent.
    assert_eq!(transport.catalog_fetches(), 2);
    assert_eq!(transport.writes_sent(), 0);
}

#[test]
fn issue_update_reports_document_from_write() {
    let transport = FakeTransport::new(jira_catalog()).with_write_result(Ok(json!({})));
    let orchestrator = IssueOrchestrator::new(transport, site());

    let request = IssueUpdateRequest::new("PROJ-7")
        .with_field("summary", "New title")
        .with_field("Acceptance Criteria", "Revised");
    let document = orchestrator.update_issue(&request).unwrap();

    assert_eq!(document.id, "PROJ-7");
    assert_eq!(document.title, "New title");
    assert_eq!(
        document.custom_fields.get("Acceptance Criteria"),
        Some(&json!("Revised"))
    );
}

#[test]
fn ambiguous_custom_field_blocks_the_mutation() {
    let transport = FakeTransport::new(vec![
        FieldDescriptor::new("customfield_10001", "Status", FieldType::Option),
        FieldDescriptor::new("customfield_10002", "Status", FieldType::Option),
    ]);
    let orchestrator = IssueOrchestrator::new(transport, site());

    let request =
        IssueUpdateRequest::new("PROJ-7").with_field("Status", json!({ "value": "Done" }));
    let err = orchestrator.update_issue(&request).unwrap_err();

    assert_eq!(
        err,
        MutationError::AmbiguousField {
            field: "Status".into(),
            candidates: vec!["customfield_10001".into(), "customfield_10002".into()],
        }
    );
    assert_eq!(issue_transport(&orchestrator).writes_sent(), 0);
}

#[test]
fn aborted_operation_stops_before_any_processing() {
    let abort = AbortFlag::new();
    abort.abort();

    let transport = FakeTransport::new(jira_catalog());
    let orchestrator = IssueOrchestrator::new(transport, site()).with_abort_flag(abort);

    let request = IssueCreateRequest::new("PROJ", "Slice", IssueType::Story);
    let err = orchestrator.create_issue(&request).unwrap_err();

    assert_eq!(err, MutationError::Aborted);
    let transport = issue_transport(&orchestrator);
    assert_eq!(transport.writes_sent(), 0);
    assert_eq!(transport.catalog_fetches(), 0);
}

#[test]
fn permission_denied_is_terminal_and_classified() {
    let transport = FakeTransport::new(Vec::new()).with_write_result(Err(ProviderFailure::Http {
        status: 403,
        body: json!({ "message": "Insufficient permissions" }),
        retry_after_secs: None,
    }));
    let orchestrator = PageOrchestrator::new(transport, site());

    let err = orchestrator
        .create_page(&PageCreateRequest::new("DEV", "T", "text"))
        .unwrap_err();
    assert_eq!(
        err,
        MutationError::PermissionDenied {
            message: "Insufficient permissions".into()
        }
    );
}

// Accessors for the transports owned by the orchestrators under test.

fn orchestrator_transport<'a>(
    orchestrator: &'a PageOrchestrator<FakeTransport>,
) -> &'a FakeTransport {
    orchestrator.transport()
}

fn orchestrator_transport_sent(
    orchestrator: &PageOrchestrator<FakeTransport>,
) -> Vec<ProviderPayload> {
    orchestrator.transport().sent.borrow().clone()
}

fn issue_transport<'a>(orchestrator: &'a IssueOrchestrator<FakeTransport>) -> &'a FakeTransport {
    orchestrator.transport()
}
