//! Atlassian-facing mutation layer for scribe.
//!
//! This crate turns the typed requests of `scribe-core` into
//! provider-shaped writes:
//! - Payload models and the mutation request builder
//! - The transport contract and its blocking HTTP implementation
//! - Classification of provider failures into the error taxonomy
//! - Mapping of provider responses into the uniform result document
//! - Orchestrators wiring the pieces into the four operations

pub mod cache;
pub mod classify;
pub mod config;
pub mod http;
pub mod mapper;
pub mod orchestrator;
pub mod payload;
pub mod transport;

pub use cache::FieldCache;
pub use classify::{classify, WriteContext};
pub use config::{ConfigError, SiteConfig};
pub use http::{HttpTransport, Product, RetryPolicy};
pub use orchestrator::{AbortFlag, IssueOrchestrator, PageOrchestrator};
pub use payload::{
    build_issue_create, build_issue_update, build_page_create, build_page_update, ProviderPayload,
};
pub use transport::{ProviderFailure, ProviderResponse, ProviderTransport};
