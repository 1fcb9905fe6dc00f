//! Transport configuration: endpoint, credentials, timeouts.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use crate::client::ClientError;

/// Production chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "PPLX_API_KEY";

/// Environment variable overriding the endpoint.
pub const ENDPOINT_ENV: &str = "PPLX_ENDPOINT";

/// API key holder. `Debug` prints a placeholder so options can be logged.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The key as sent in the `Authorization` header.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

impl From<&str> for SecretString {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

/// How requests reach the API.
///
/// `timeout` bounds the whole of a single-shot call. A streaming call may run
/// for longer than that, but fails once the server stays silent for `timeout`.
///
/// # Example
/// ```rust
/// use pplx::options::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::new("pplx-...")
///     .with_endpoint("http://localhost:8080/chat/completions")
///     .with_timeout(Duration::from_secs(30));
///
/// assert_eq!(options.endpoint(), "http://localhost:8080/chat/completions");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Bearer token
    pub api_key: Option<SecretString>,

    /// Full URL of the chat-completions endpoint
    pub endpoint: Option<String>,

    /// Request timeout
    pub timeout: Option<Duration>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,

    /// Pre-built HTTP client used instead of building one from these options
    pub http_client: Option<reqwest::Client>,
}

impl TransportOptions {
    /// Create transport options with an API key.
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Read the API key from `PPLX_API_KEY` and, if set, the endpoint from
    /// `PPLX_ENDPOINT`.
    pub fn from_env() -> Result<Self, ClientError> {
        let api_key = env::var(API_KEY_ENV)
            .map_err(|_| ClientError::Config(format!("{API_KEY_ENV} must be set")))?;

        let mut options = Self::new(api_key);
        if let Ok(endpoint) = env::var(ENDPOINT_ENV) {
            options.endpoint = Some(endpoint);
        }
        Ok(options)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }

    /// Use a caller-supplied HTTP client, e.g. one trusting a test certificate.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }
}
