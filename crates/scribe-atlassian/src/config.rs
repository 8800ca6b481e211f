//! Site configuration for the two Atlassian products.

use thiserror::Error;
use url::Url;

/// Errors raised while loading site configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    /// The configured base URL does not parse.
    #[error("invalid base url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Connection settings for one Atlassian site (Confluence or Jira).
///
/// The API token is used as the basic-auth password, matching Atlassian
/// cloud authentication.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Base URL of the site (e.g., `https://example.atlassian.net`).
    pub base_url: Url,

    /// Account username (usually an email address).
    pub username: String,

    /// API token.
    pub api_token: String,
}

impl SiteConfig {
    /// Build a config from explicit values.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidUrl` if the base URL does not parse.
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url).map_err(|source| ConfigError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            base_url,
            username: username.into(),
            api_token: api_token.into(),
        })
    }

    /// Load a config from `{PREFIX}_URL`, `{PREFIX}_USERNAME`, and
    /// `{PREFIX}_API_TOKEN`.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingVar` for an unset variable or
    /// `ConfigError::InvalidUrl` for an unparsable URL.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let var = |suffix: &str| {
            let name = format!("{prefix}_{suffix}");
            std::env::var(&name).map_err(|_| ConfigError::MissingVar(name))
        };
        Self::new(&var("URL")?, var("USERNAME")?, var("API_TOKEN")?)
    }

    /// Join a path onto the base URL.
    ///
    /// Used for both request routing and canonical links in mapped
    /// documents.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_endpoint_joins_cleanly() {
        let site = SiteConfig::new("https://example.atlassian.net/", "bot", "token").unwrap();
        assert_eq!(
            site.endpoint("/rest/api/2/issue"),
            "https://example.atlassian.net/rest/api/2/issue"
        );
        assert_eq!(
            site.endpoint("browse/PROJ-1"),
            "https://example.atlassian.net/browse/PROJ-1"
        );
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = SiteConfig::new("not a url", "bot", "token").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }
}
