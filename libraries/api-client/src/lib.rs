//! A small JSON-over-HTTP client.
//!
//! Every request is resolved against a configured base URL, carries the configured default
//! headers and races a timer. Response bodies are read leniently: JSON when the server says
//! the body is JSON, plain text otherwise, and `null` when the body can't be read or parsed.
//! Non-2xx responses become [`ApiError::Status`].

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub use reqwest::{Method, StatusCode, Url};

pub const DEFAULT_BASE_URL: &str = "https://gossipserver-production.up.railway.app";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let headers = [
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ]
        .into_iter()
        .collect();

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            headers,
        }
    }
}

/// Partial configuration. Present fields replace the existing ones wholesale.
#[derive(Debug, Clone, Default)]
pub struct ApiConfigOverrides {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub headers: Option<BTreeMap<String, String>>,
}

impl ApiConfig {
    /// Shallow merge: a header override replaces the whole header map, it is not merged key by key.
    pub fn merge(self, overrides: ApiConfigOverrides) -> Self {
        Self {
            base_url: overrides.base_url.unwrap_or(self.base_url),
            timeout: overrides.timeout.unwrap_or(self.timeout),
            headers: overrides.headers.unwrap_or(self.headers),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request timeout after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Status {
        status: StatusCode,
        message: String,
        body: Value,
    },

    #[error("Invalid URL {url:?}")]
    InvalidUrl { url: String },

    #[error("Invalid header {name:?}")]
    InvalidHeader { name: String },

    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Timeouts and network failures, as opposed to answers from the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Timeout { .. } | ApiError::Transport(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    /// Ignored for GET. Strings are sent verbatim, anything else as JSON.
    pub body: Option<Value>,
    /// Layered over the configured default headers.
    pub headers: BTreeMap<String, String>,
    /// Overrides the configured timeout for this request only.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(ApiConfig::default())
    }
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    pub fn with_http_client(config: ApiConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Only requests issued after this call see the new configuration.
    pub fn configure(&mut self, overrides: ApiConfigOverrides) {
        let config = std::mem::take(&mut self.config);
        self.config = config.merge(overrides);
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http") {
            return path.to_string();
        }
        let base = self
            .config
            .base_url
            .strip_suffix('/')
            .unwrap_or(&self.config.base_url);
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// The base URL with `segments` appended, each percent-encoded as a single path segment.
    pub fn url_for_segments(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let invalid = || ApiError::InvalidUrl {
            url: self.config.base_url.clone(),
        };
        let mut url = Url::parse(&self.config.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn headers_for(&self, extra: &BTreeMap<String, String>) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        for (name, value) in self.config.headers.iter().chain(extra) {
            let invalid = || ApiError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            // insert, not append: per-request headers win over the defaults
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }

    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let raw_url = self.url_for(path);
        let url = Url::parse(&raw_url).map_err(|_| ApiError::InvalidUrl {
            url: raw_url.clone(),
        })?;
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let headers = self.headers_for(&options.headers)?;

        let mut builder = self
            .http
            .request(options.method.clone(), url.clone())
            .headers(headers);
        if options.method != Method::GET {
            builder = match options.body {
                Some(Value::String(text)) => builder.body(text),
                Some(body) => builder.body(body.to_string()),
                None => builder,
            };
        }

        log::debug!("{} {url}", options.method);

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let is_json = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|content_type| content_type.contains("application/json"));
            let body = match response.text().await {
                Ok(text) => parse_body(text, is_json),
                Err(e) => {
                    log::warn!("Failed to read response body from {url}: {e}");
                    Value::Null
                }
            };
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| ApiError::Timeout { after: timeout })??;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            log::warn!("{} {url} failed with {status}: {message}", options.method);
            return Err(ApiError::Status {
                status,
                message,
                body,
            });
        }

        Ok(body)
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(path, RequestOptions::new(Method::GET)).await
    }

    pub async fn post(&self, path: &str, body: &impl Serialize) -> Result<Value, ApiError> {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        self.request(path, RequestOptions::new(Method::POST).body(body))
            .await
    }

    pub async fn put(&self, path: &str, body: &impl Serialize) -> Result<Value, ApiError> {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        self.request(path, RequestOptions::new(Method::PUT).body(body))
            .await
    }

    pub async fn patch(&self, path: &str, body: &impl Serialize) -> Result<Value, ApiError> {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        self.request(path, RequestOptions::new(Method::PATCH).body(body))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.request(path, RequestOptions::new(Method::DELETE)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.get(path).await?;
        serde_json::from_value(body).map_err(ApiError::Decode)
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        let body = self.post(path, body).await?;
        serde_json::from_value(body).map_err(ApiError::Decode)
    }
}

fn parse_body(text: String, is_json: bool) -> Value {
    if is_json {
        serde_json::from_str(&text).unwrap_or(Value::Null)
    } else {
        Value::String(text)
    }
}
