//! Configuration structures for the reconciler.
//!
//! [`EngineConfig`] is what callers load (the CLI reads it from TOML). It is
//! validated once and then converted into the policy records the client
//! facade applies.

use crate::client::{ClientConfig, PaginationPolicy, RetryPolicy};
use crate::Error;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Configuration for one reconciler run.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Controller base URL
    #[validate(url)]
    pub controller_url: String,

    /// Login used for the token exchange
    #[serde(default)]
    pub username: String,

    /// Password for the token exchange
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,

    /// Pre-issued session token; skips the token exchange
    #[serde(default, skip_serializing)]
    pub token: Option<SecretString>,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Per-request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retry budget applied to every controller call
    #[validate(nested)]
    #[serde(default)]
    pub retry: RetryConfig,

    /// Pagination settings for list endpoints
    #[validate(nested)]
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Number of pools submitted per create batch
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    crate::client::DEFAULT_REQUEST_TIMEOUT
}

const fn default_batch_size() -> usize {
    crate::client::DEFAULT_BATCH_SIZE
}

impl EngineConfig {
    /// Create a new configuration for the given controller URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn new(controller_url: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            controller_url: controller_url.into(),
            ..Self::default()
        };

        config
            .validate()
            .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Set the login credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set a pre-issued session token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set the per-request timeout in seconds.
    #[must_use]
    pub const fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the pagination settings.
    #[must_use]
    pub const fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Build the HTTP client configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_tls_verify(self.tls_verify)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            controller_url: "https://localhost".to_string(),
            username: String::new(),
            password: None,
            token: None,
            tls_verify: default_tls_verify(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryConfig::default(),
            pagination: PaginationConfig::default(),
            batch_size: default_batch_size(),
        }
    }
}

/// Retry budget in serializable form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct RetryConfig {
    /// Total seconds one call may take, retries included
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_retry_timeout_secs")]
    pub timeout_secs: u64,

    /// Re-issues after the first attempt
    #[validate(range(min = 0, max = 10))]
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Seconds between attempts
    #[validate(range(min = 0, max = 300))]
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

const fn default_retry_timeout_secs() -> u64 {
    crate::client::DEFAULT_RETRY_TIMEOUT
}

const fn default_retries() -> u32 {
    crate::client::DEFAULT_RETRIES
}

const fn default_interval_secs() -> u64 {
    crate::client::DEFAULT_RETRY_INTERVAL
}

impl RetryConfig {
    /// Convert into the policy the facade applies.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_retries(self.retries)
            .with_interval(Duration::from_secs(self.interval_secs))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_retry_timeout_secs(),
            retries: default_retries(),
            interval_secs: default_interval_secs(),
        }
    }
}

/// Pagination settings in serializable form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct PaginationConfig {
    /// Requested page size
    #[validate(range(min = 1, max = 500))]
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Seconds after which a drain stops with what it has
    #[validate(range(min = 1))]
    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,
}

const fn default_page_size() -> u32 {
    crate::client::DEFAULT_PAGE_SIZE
}

const fn default_max_timeout_secs() -> u64 {
    crate::client::DEFAULT_PAGINATION_MAX_TIMEOUT
}

impl PaginationConfig {
    /// Convert into the policy the facade applies.
    #[must_use]
    pub const fn policy(&self) -> PaginationPolicy {
        PaginationPolicy::new()
            .with_page_size(self.page_size)
            .with_max_timeout(Duration::from_secs(self.max_timeout_secs))
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_timeout_secs: default_max_timeout_secs(),
        }
    }
}
