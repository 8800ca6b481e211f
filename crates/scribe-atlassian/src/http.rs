//! HTTP transport implementation over the Atlassian REST APIs.
//!
//! The transport signs requests with basic auth (API token as password,
//! matching Atlassian cloud) and owns the retry policy: only retryable
//! failures — backpressure and 5xx-class responses — are re-attempted, with
//! exponential backoff and a bounded attempt count. Everything else returns
//! to the orchestrator for classification on the first failure.

use crate::config::SiteConfig;
use crate::payload::ProviderPayload;
use crate::transport::{ProviderFailure, ProviderResponse, ProviderTransport};
use reqwest::blocking::Client;
use reqwest::Method;
use scribe_core::{FieldDescriptor, FieldType};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Which Atlassian product a transport instance talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Confluence,
    Jira,
}

/// Bounded-retry policy for retryable failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first call included.
    pub max_attempts: u32,

    /// Backoff base; attempt `n` waits `base_delay * 2^n` unless the
    /// provider sent a `Retry-After` hint.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        retry_after_secs.map_or_else(
            || self.base_delay * 2_u32.saturating_pow(attempt),
            Duration::from_secs,
        )
    }
}

/// Blocking HTTP transport for one Atlassian site.
pub struct HttpTransport {
    client: Client,
    site: SiteConfig,
    product: Product,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Create a transport with the default retry policy.
    #[must_use]
    pub fn new(site: SiteConfig, product: Product) -> Self {
        Self {
            client: Client::new(),
            site,
            product,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn execute(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value, ProviderFailure> {
        let mut attempt = 0;
        loop {
            match self.request_once(method.clone(), url, body) {
                Ok(value) => return Ok(value),
                Err(failure) => {
                    attempt += 1;
                    if !failure.is_retryable() || attempt >= self.retry.max_attempts {
                        return Err(failure);
                    }
                    let retry_after = match &failure {
                        ProviderFailure::Http {
                            retry_after_secs, ..
                        } => *retry_after_secs,
                        ProviderFailure::Network(_) => None,
                    };
                    let delay = self.retry.delay(attempt - 1, retry_after);
                    warn!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retryable provider failure, backing off"
                    );
                    std::thread::sleep(delay);
                }
            }
        }
    }

    fn request_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderFailure> {
        debug!(%method, url, "provider request");

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.site.username, Some(&self.site.api_token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .map_err(|err| ProviderFailure::Network(err.to_string()))?;

        let status = response.status().as_u16();
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let text = response
            .text()
            .map_err(|err| ProviderFailure::Network(err.to_string()))?;
        let parsed = parse_body(&text);

        if (200..300).contains(&status) {
            Ok(parsed)
        } else {
            Err(ProviderFailure::Http {
                status,
                body: parsed,
                retry_after_secs,
            })
        }
    }
}

impl ProviderTransport for HttpTransport {
    fn send_write(&self, payload: &ProviderPayload) -> Result<ProviderResponse, ProviderFailure> {
        let (method, path, body) = route(payload)
            .map_err(|err| ProviderFailure::Network(format!("unserializable payload: {err}")))?;
        self.execute(method, &self.site.endpoint(&path), Some(&body))
    }

    fn fetch_field_catalog(&self) -> Result<Vec<FieldDescriptor>, ProviderFailure> {
        match self.product {
            // Confluence pages have no custom-field catalog in this layer.
            Product::Confluence => Ok(Vec::new()),
            Product::Jira => {
                let response =
                    self.execute(Method::GET, &self.site.endpoint("rest/api/2/field"), None)?;
                Ok(parse_field_catalog(&response))
            }
        }
    }
}

/// Endpoint, method, and serialized body for a payload.
///
/// # Errors
/// Serialization failure of the payload body.
pub fn route(payload: &ProviderPayload) -> Result<(Method, String, Value), serde_json::Error> {
    Ok(match payload {
        ProviderPayload::PageCreate(body) => (
            Method::POST,
            "wiki/rest/api/content".to_string(),
            serde_json::to_value(body)?,
        ),
        ProviderPayload::PageUpdate { page_id, body, .. } => (
            Method::PUT,
            format!("wiki/rest/api/content/{page_id}"),
            serde_json::to_value(body)?,
        ),
        ProviderPayload::IssueCreate(body) => (
            Method::POST,
            "rest/api/2/issue".to_string(),
            serde_json::to_value(body)?,
        ),
        ProviderPayload::IssueUpdate { issue_key, body } => (
            Method::PUT,
            format!("rest/api/2/issue/{issue_key}"),
            serde_json::to_value(body)?,
        ),
    })
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct RawField {
    id: String,
    name: String,
    #[serde(default)]
    custom: bool,
    #[serde(default)]
    schema: Option<RawSchema>,
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Parse Jira's field listing into catalog descriptors.
///
/// Only custom fields enter the catalog; standard fields are addressed by
/// their well-known names. Unparsable entries are skipped.
#[must_use]
pub fn parse_field_catalog(response: &Value) -> Vec<FieldDescriptor> {
    let Some(entries) = response.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| RawField::deserialize(entry).ok())
        .filter(|field| field.custom)
        .map(|field| {
            let field_type = field
                .schema
                .and_then(|s| s.kind)
                .map_or(FieldType::Unknown, |kind| match kind.as_str() {
                    "string" => FieldType::String,
                    "number" => FieldType::Number,
                    "option" => FieldType::Option,
                    "user" => FieldType::User,
                    "date" | "datetime" => FieldType::Date,
                    "array" => FieldType::Array,
                    _ => FieldType::Unknown,
                });
            FieldDescriptor::new(field.id, field.name, field_type)
        })
        .collect()
}
