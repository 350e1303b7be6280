//! HTTP transport to the controller.
//!
//! [`Transport`] is the seam between the facade and the network. It sends
//! one request and maps the response status onto the error taxonomy; retries,
//! version gating and envelope decoding live a layer up in
//! [`crate::ControllerClient`].

use crate::models::Envelope;
use crate::Result;
use async_trait::async_trait;
use netconv_core::client::{ClientConfig, DEFAULT_POOL_IDLE_TIMEOUT, DEFAULT_POOL_MAX_IDLE_PER_HOST};
use netconv_core::query::QueryParams;
use netconv_core::Error;
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("netconv/", env!("CARGO_PKG_VERSION"));

/// Token exchange endpoint.
pub const AUTH_PATH: &str = "/dna/system/api/v1/auth/token";

/// Controller release endpoint.
pub const RELEASE_PATH: &str = "/dna/intent/api/v1/dnac-release";

/// One controller request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path below the controller base URL
    pub path: String,
    /// Query pairs
    pub query: Vec<(&'static str, String)>,
    /// JSON body
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Build a request without query or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` request with a body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    /// `PUT` request with a body.
    #[must_use]
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    /// `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach query parameters.
    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query.extend(query.into_pairs());
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Sends requests to the controller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the decoded JSON body.
    ///
    /// Empty bodies decode as `Value::Null`.
    async fn send(&self, request: ApiRequest) -> Result<Value>;

    /// The controller's release string.
    async fn controller_version(&self) -> Result<String>;
}

/// Builder for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    base_url: Url,
    http_config: ClientConfig,
    basic_auth: Option<(String, SecretString)>,
    token: Option<SecretString>,
}

impl HttpTransportBuilder {
    /// Create a new builder from the provided base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL cannot be parsed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(base_url.as_ref()).map_err(|err| {
            Error::Config(format!(
                "Invalid controller base URL `{}`: {err}",
                base_url.as_ref()
            ))
        })?;

        let config = ClientConfig::new()
            .with_pool_idle_timeout(Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT))
            .with_pool_max_idle(DEFAULT_POOL_MAX_IDLE_PER_HOST);

        Ok(Self {
            base_url: url,
            http_config: config,
            basic_auth: None,
            token: None,
        })
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Credentials for the token exchange.
    #[must_use]
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.basic_auth = Some((username.into(), password));
        self
    }

    /// Use a pre-issued session token.
    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<HttpTransport> {
        let http = ClientBuilder::new()
            .timeout(self.http_config.timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(self.http_config.pool_idle_timeout)
            .pool_max_idle_per_host(self.http_config.pool_max_idle_per_host)
            .connect_timeout(Duration::from_secs(10))
            .danger_accept_invalid_certs(!self.http_config.tls_verify)
            .build()
            .map_err(|err| {
                Error::Config(format!("Failed to build controller HTTP client: {err}"))
            })?;

        Ok(HttpTransport {
            http,
            base_url: self.base_url,
            basic_auth: self.basic_auth,
            token: Arc::new(RwLock::new(self.token)),
        })
    }
}

/// reqwest-backed [`Transport`].
///
/// Authenticates with `X-Auth-Token`. When built with credentials the token is
/// obtained on first use and dropped on a 401, so the next attempt logs in
/// again.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    basic_auth: Option<(String, SecretString)>,
    token: Arc<RwLock<Option<SecretString>>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(rename = "Token")]
    token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseInfo {
    display_version: String,
}

impl HttpTransport {
    /// Start building a transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL cannot be parsed.
    pub fn builder(base_url: impl AsRef<str>) -> Result<HttpTransportBuilder> {
        HttpTransportBuilder::new(base_url)
    }

    /// Access the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        let normalized = path.strip_prefix('/').unwrap_or(path);
        self.base_url
            .join(normalized)
            .map_err(|err| Error::Config(format!("Invalid controller path `{path}`: {err}")))
    }

    async fn session_token(&self) -> Result<Option<SecretString>> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(Some(token));
        }
        let Some((username, password)) = &self.basic_auth else {
            return Ok(None);
        };

        let response = self
            .http
            .post(self.build_url(AUTH_PATH)?)
            .basic_auth(username, Some(password.expose_secret()))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Forbidden {
                    method: "authenticate".to_string(),
                    message: text,
                },
                status => map_status(status, text),
            });
        }

        let body: TokenResponse = response.json().await?;
        let token = SecretString::from(body.token);
        *self.token.write().await = Some(token.clone());
        info!(username = %username, "obtained controller session token");
        Ok(Some(token))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let token = self.session_token().await?;
        let url = self.build_url(&request.path)?;
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .query(&request.query)
            .header("Accept", "application/json");

        if let Some(token) = &token {
            builder = builder.header("X-Auth-Token", token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, path = %request.path, "controller request");

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| Error::Transport(format!("Failed to read controller response: {err}")))?;

        if status.is_success() {
            return deserialize_body(&request.path, status, &bytes);
        }

        let text = String::from_utf8_lossy(&bytes).into_owned();
        if status == StatusCode::UNAUTHORIZED && self.basic_auth.is_some() {
            warn!(path = %request.path, "controller session expired");
            *self.token.write().await = None;
            return Err(Error::Transport(format!("Session expired: {text}")));
        }
        Err(map_status(status, text))
    }

    async fn controller_version(&self) -> Result<String> {
        let body = self.send(ApiRequest::get(RELEASE_PATH)).await?;
        let release: Envelope<ReleaseInfo> = serde_json::from_value(body)
            .map_err(|err| Error::Parse(format!("Failed to read controller release: {err}")))?;
        Ok(release.response.display_version)
    }
}

fn map_status(status: StatusCode, text: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(text),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Forbidden {
            method: String::new(),
            message: text,
        },
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            Error::Conflict(text)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            Error::Timeout(format!("Controller timed out ({status}): {text}"))
        }
        StatusCode::TOO_MANY_REQUESTS => Error::Transport(format!("Controller throttled: {text}")),
        status if status.is_server_error() => {
            Error::Transport(format!("Controller error {status}: {text}"))
        }
        status => Error::Unexpected(format!("Controller returned {status}: {text}")),
    }
}

fn deserialize_body(path: &str, status: StatusCode, bytes: &[u8]) -> Result<Value> {
    if status == StatusCode::NO_CONTENT || bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|err| {
        Error::Parse(format!("Failed to parse controller response for `{path}`: {err}"))
    })
}
