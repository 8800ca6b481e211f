//! Session-scoped cache of the provider field catalog.
//!
//! The catalog is the only mutable shared state in the mutation layer. It
//! is explicitly owned and passed in, never a module-level singleton, so
//! tests can inject a fake transport. Refresh replaces the whole snapshot
//! under a single writer; readers holding the previous `Arc` are never
//! invalidated mid-call.

use crate::classify::{classify, WriteContext};
use crate::transport::ProviderTransport;
use scribe_core::{FieldCatalog, Result};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Cached field catalog, fetched once per session and replaced only by
/// explicit refresh.
#[derive(Debug, Default)]
pub struct FieldCache {
    inner: RwLock<Option<Arc<FieldCatalog>>>,
}

impl FieldCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached catalog, fetching it on first use.
    ///
    /// # Errors
    /// Classified transport failure from the catalog fetch.
    pub fn get_or_fetch<T: ProviderTransport>(&self, transport: &T) -> Result<Arc<FieldCatalog>> {
        let cached = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match cached {
            Some(catalog) => Ok(catalog),
            None => self.refresh(transport),
        }
    }

    /// Force a re-fetch, replacing the cached snapshot wholesale.
    ///
    /// # Errors
    /// Classified transport failure from the catalog fetch. The previous
    /// snapshot stays in place on failure.
    pub fn refresh<T: ProviderTransport>(&self, transport: &T) -> Result<Arc<FieldCatalog>> {
        let fields = transport
            .fetch_field_catalog()
            .map_err(|failure| classify(&failure, &WriteContext::entity("field catalog")))?;
        debug!(field_count = fields.len(), "field catalog refreshed");

        let catalog = Arc::new(FieldCatalog::new(fields));
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&catalog));
        Ok(catalog)
    }
}
