//! Transport boundary for content writes.
//!
//! The mutation layer depends only on [`Transport`]: a request goes out with a
//! method, a project-scoped path and a JSON body, and comes back either as a
//! JSON payload or as a [`TransportFailure`]. [`RestTransport`] is the reqwest
//! implementation used against the platform API.

use crate::config::{AuthConfig, ClientConfig};
use crate::mutation::INVALID_RESPONSE_CODE;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        })
    }
}

/// One outgoing write.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    /// Path relative to the API base URL, already project-scoped.
    pub path: String,
    /// Query string pairs, appended in order.
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl TransportRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Structured error body returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFailure {
    /// The call could not complete (connect, timeout, broken body).
    #[error("Connectivity error: {message}")]
    Connectivity { message: String },
    /// The backend answered with a structured error.
    #[error("API error: {}", .0.message)]
    Api(ApiErrorBody),
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        Self::Connectivity {
            message: err.to_string(),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, TransportFailure>;
}

/// Substitute `{ref}` in a path template with the project reference.
///
/// The reference is inserted as a single path segment; `/` and other
/// reserved characters are percent-encoded.
pub fn project_path(template: &str, project_ref: &str) -> String {
    template.replace("{ref}", &urlencoding::encode(project_ref))
}

#[derive(Clone)]
pub struct RestTransport {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl RestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, crate::error::ClientError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let auth_header = build_auth_headers(&config.auth)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn parse_response(
        &self,
        response: reqwest::Response,
    ) -> Result<serde_json::Value, TransportFailure> {
        let status = response.status();
        let text = response.text().await?;
        parse_body(status, &text)
    }
}

/// Interpret a response body by status.
///
/// 204 and empty 2xx bodies are `Null`. A 2xx body that is not JSON is an
/// `invalid_response` API error.
fn parse_body(status: StatusCode, text: &str) -> Result<serde_json::Value, TransportFailure> {
    if !status.is_success() {
        return Err(TransportFailure::Api(error_body_from(status.as_u16(), text)));
    }
    if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(text).map_err(|e| {
        TransportFailure::Api(
            ApiErrorBody::new(format!("Malformed response body: {}", e))
                .with_code(INVALID_RESPONSE_CODE),
        )
    })
}

#[async_trait]
impl Transport for RestTransport {
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, TransportFailure> {
        let url = format!("{}{}", self.base_url, request.path);
        let builder = match request.method {
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Patch => self.client.patch(url),
            HttpMethod::Delete => self.client.delete(url),
        };
        let mut builder = builder.headers(self.auth_header.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, path = %request.path, "sending request");
        let response = builder.send().await?;
        self.parse_response(response).await
    }
}

/// Interpret a non-2xx body, falling back to the raw text.
fn error_body_from(status: u16, text: &str) -> ApiErrorBody {
    match serde_json::from_str::<ApiErrorBody>(text) {
        Ok(body) => body,
        Err(_) => ApiErrorBody::new(format!("HTTP {}: {}", status, text)),
    }
}

fn build_auth_headers(auth: &AuthConfig) -> Result<HeaderMap, crate::error::ClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("apikey"),
            HeaderValue::from_str(api_key)?,
        );
    }
    if let Some(jwt) = &auth.jwt {
        let value = format!("Bearer {}", jwt);
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value)?,
        );
    }
    Ok(headers)
}
