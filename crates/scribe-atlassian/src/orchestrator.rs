//! Mutation orchestration over the transport collaborator.
//!
//! Each operation runs end-to-end in its calling thread: validate, resolve,
//! build, send, then classify or map. The orchestrators own no connection
//! state beyond the injected transport and, for issues, the session field
//! cache.

use crate::cache::FieldCache;
use crate::classify::{classify, WriteContext};
use crate::config::SiteConfig;
use crate::mapper;
use crate::payload::{
    build_issue_create, build_issue_update, build_page_create, build_page_update, ProviderPayload,
};
use crate::transport::ProviderTransport;
use scribe_core::{
    FieldCatalog, IssueCreateRequest, IssueUpdateRequest, MutationError, PageCreateRequest,
    PageUpdateRequest, Result, ResultDocument,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Cooperative abort signal for in-flight operations.
///
/// An observed abort stops further local processing; a write already handed
/// to the transport is not rolled back, and its outcome is reported, not
/// hidden.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request abort of any operation holding this flag.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether abort has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn ensure_live(abort: Option<&AbortFlag>) -> Result<()> {
    match abort {
        Some(flag) if flag.is_aborted() => Err(MutationError::Aborted),
        _ => Ok(()),
    }
}

/// Orchestrates Confluence page mutations.
pub struct PageOrchestrator<T: ProviderTransport> {
    transport: T,
    site: SiteConfig,
    abort: Option<AbortFlag>,
}

impl<T: ProviderTransport> PageOrchestrator<T> {
    /// Create an orchestrator over the given transport.
    #[must_use]
    pub fn new(transport: T, site: SiteConfig) -> Self {
        Self {
            transport,
            site,
            abort: None,
        }
    }

    /// Attach an abort flag checked between processing phases.
    #[must_use]
    pub fn with_abort_flag(mut self, abort: AbortFlag) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Create a page and return the mapped result.
    ///
    /// # Errors
    /// Local validation errors before any network interaction; classified
    /// provider errors after.
    pub fn create_page(&self, request: &PageCreateRequest) -> Result<ResultDocument> {
        ensure_live(self.abort.as_ref())?;
        let payload = build_page_create(request)?;

        info!(space = %request.space_key, title = %request.title, "creating page");
        let context = WriteContext::entity(format!("space '{}'", request.space_key));

        ensure_live(self.abort.as_ref())?;
        let response = self
            .transport
            .send_write(&payload)
            .map_err(|failure| classify(&failure, &context))?;

        mapper::map_page(&response, &self.site)
    }

    /// Update a page against the version it was read at.
    ///
    /// A stale version surfaces as `VersionConflict` carrying both
    /// versions; resolution is the caller's responsibility.
    ///
    /// # Errors
    /// As for [`Self::create_page`], plus `VersionConflict`.
    pub fn update_page(&self, request: &PageUpdateRequest) -> Result<ResultDocument> {
        ensure_live(self.abort.as_ref())?;
        let payload = build_page_update(request)?;

        info!(page_id = %request.page_id, version = request.version, "updating page");
        let context = WriteContext::entity(format!("page '{}'", request.page_id))
            .with_expected_version(request.version);

        ensure_live(self.abort.as_ref())?;
        let response = self
            .transport
            .send_write(&payload)
            .map_err(|failure| classify(&failure, &context))?;

        mapper::map_page(&response, &self.site)
    }
}

/// Orchestrates Jira issue mutations.
///
/// Owns the session field cache; a `FieldNotFound` during payload building
/// triggers exactly one automatic catalog refresh and rebuild before the
/// error becomes permanent.
pub struct IssueOrchestrator<T: ProviderTransport> {
    transport: T,
    site: SiteConfig,
    cache: FieldCache,
    abort: Option<AbortFlag>,
}

impl<T: ProviderTransport> IssueOrchestrator<T> {
    /// Create an orchestrator over the given transport.
    #[must_use]
    pub fn new(transport: T, site: SiteConfig) -> Self {
        Self {
            transport,
            site,
            cache: FieldCache::new(),
            abort: None,
        }
    }

    /// Attach an abort flag checked between processing phases.
    #[must_use]
    pub fn with_abort_flag(mut self, abort: AbortFlag) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Force a field-catalog refresh on the next build.
    ///
    /// # Errors
    /// Classified transport failure from the catalog fetch.
    pub fn refresh_catalog(&self) -> Result<()> {
        self.cache.refresh(&self.transport).map(|_| ())
    }

    /// Create an issue and return the mapped result.
    ///
    /// # Errors
    /// Local validation errors before any network interaction; classified
    /// provider errors after.
    pub fn create_issue(&self, request: &IssueCreateRequest) -> Result<ResultDocument> {
        ensure_live(self.abort.as_ref())?;
        // Fail fast before the catalog fetch touches the network.
        request.validate()?;

        let (payload, catalog) =
            self.build_with_refresh(|catalog| build_issue_create(request, catalog))?;

        info!(
            project = %request.project_key,
            issue_type = %request.issue_type,
            "creating issue"
        );
        let context = WriteContext::entity(format!("project '{}'", request.project_key));

        ensure_live(self.abort.as_ref())?;
        let response = self
            .transport
            .send_write(&payload)
            .map_err(|failure| classify(&failure, &context))?;

        let mut document = mapper::map_issue(&response, &self.site, &catalog)?;
        // Create responses do not echo fields; fill the summary locally.
        if document.title.is_empty() {
            document.title = request.summary.clone();
        }
        Ok(document)
    }

    /// Update issue fields and return the mapped result.
    ///
    /// # Errors
    /// As for [`Self::create_issue`].
    pub fn update_issue(&self, request: &IssueUpdateRequest) -> Result<ResultDocument> {
        ensure_live(self.abort.as_ref())?;
        request.validate()?;

        let (payload, catalog) =
            self.build_with_refresh(|catalog| build_issue_update(request, catalog))?;

        info!(issue_key = %request.issue_key, "updating issue");
        let context = WriteContext::entity(format!("issue '{}'", request.issue_key));

        ensure_live(self.abort.as_ref())?;
        self.transport
            .send_write(&payload)
            .map_err(|failure| classify(&failure, &context))?;

        // Jira answers a field update with an empty body; derive the
        // document from the write itself.
        let ProviderPayload::IssueUpdate { issue_key, body } = payload else {
            unreachable!("issue update builder produced a different payload variant");
        };
        Ok(mapper::map_issue_update(&issue_key, &body, &self.site, &catalog))
    }

    /// Build a payload, retrying once on `FieldNotFound` after a catalog
    /// refresh. Any other build error is permanent immediately.
    fn build_with_refresh(
        &self,
        build: impl Fn(&FieldCatalog) -> Result<ProviderPayload>,
    ) -> Result<(ProviderPayload, Arc<FieldCatalog>)> {
        let catalog = self.cache.get_or_fetch(&self.transport)?;
        match build(&catalog) {
            Ok(payload) => Ok((payload, catalog)),
            Err(MutationError::FieldNotFound { field }) => {
                warn!(field = %field, "field not in cached catalog, refreshing once");
                ensure_live(self.abort.as_ref())?;
                let catalog = self.cache.refresh(&self.transport)?;
                let payload = build(&catalog)?;
                Ok((payload, catalog))
            }
            Err(err) => Err(err),
        }
    }
}
