use std::time::Duration;

use secrecy::SecretString;

use crate::auth::{Authorizer, bearer_token};
use crate::error::{Error, Result};
use crate::log::LogHook;

/// Base URL of the production API, used when no override is configured
pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

/// Version segment inserted between the base URL and the request path
pub const API_VERSION: &str = "2";

pub const BASE_URL_ENV: &str = "TWAPI_BASE_URL";
pub const BEARER_TOKEN_ENV: &str = "TWAPI_BEARER_TOKEN";

/// Configuration for [`Client`](crate::Client)
#[derive(Clone, Default)]
pub struct ClientConfig {
    /// Override for [`DEFAULT_BASE_URL`]
    pub base_url: Option<String>,
    /// Timeout for non-streaming calls; streams are never timed out
    pub timeout: Option<Duration>,
    /// Underlying HTTP transport; built from this config when unset
    pub http_client: Option<reqwest::Client>,
    /// Runs last on every outbound request
    pub authorizer: Option<Authorizer>,
    /// Diagnostic hook
    pub log: Option<LogHook>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("http_client", &self.http_client.is_some())
            .field("authorizer", &self.authorizer.is_some())
            .field("log", &self.log.is_some())
            .finish()
    }
}

impl ClientConfig {
    /// Configuration authorized with a static bearer token
    #[must_use]
    pub fn bearer(token: SecretString) -> Self {
        Self::default().with_authorizer(bearer_token(token))
    }

    /// Create configuration from environment variables
    ///
    /// Expects:
    /// - `TWAPI_BASE_URL`: base URL override (default: [`DEFAULT_BASE_URL`])
    /// - `TWAPI_BEARER_TOKEN`: bearer token (required)
    ///
    /// # Errors
    /// Returns a build error if `TWAPI_BEARER_TOKEN` is not set.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(BEARER_TOKEN_ENV)
            .map_err(|_| Error::build(format!("{BEARER_TOKEN_ENV} not set")))?;
        let mut config = Self::bearer(SecretString::from(token));
        config.base_url = std::env::var(BASE_URL_ENV).ok().filter(|s| !s.is_empty());
        Ok(config)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Authorizer) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    #[must_use]
    pub fn with_log(mut self, log: LogHook) -> Self {
        self.log = Some(log);
        self
    }
}
