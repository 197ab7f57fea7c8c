//! Request/response types and the HTTP transport seam.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Path of the refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// An outgoing API request, independent of the HTTP library.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/api/jobs`.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    retried: bool,
    is_refresh: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
            is_refresh: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// The refresh call. Its 401 never re-enters the refresh flow.
    pub fn refresh() -> Self {
        Self {
            is_refresh: true,
            ..Self::new(Method::POST, REFRESH_PATH)
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Already replayed once after a refresh.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub fn is_refresh(&self) -> bool {
        self.is_refresh
    }

    /// Copy for replay after a refresh, carrying the new token.
    pub(crate) fn replay_with(&self, token: &str) -> Self {
        let mut replay = self.clone();
        replay.retried = true;
        replay.set_bearer(Some(token));
        replay
    }

    /// Set or remove `Authorization: Bearer <token>`.
    pub(crate) fn set_bearer(&mut self, token: Option<&str>) {
        match token.and_then(|t| HeaderValue::from_str(&format!("Bearer {t}")).ok()) {
            Some(value) => {
                self.headers.insert(AUTHORIZATION, value);
            }
            None => {
                self.headers.remove(AUTHORIZATION);
            }
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// A response with its body decoded as JSON (`Value::Null` when empty).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// The server's `{"message": ...}` text, or the raw body.
    pub fn message(&self) -> String {
        match self.body.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None if self.body.is_null() => String::new(),
            None => self.body.to_string(),
        }
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Sends requests. Implementations must not interpret status codes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// `reqwest`-backed transport. Keeps a cookie jar so the refresh cookie set
/// by login is sent back to the refresh endpoint.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base: Url,
}

impl ReqwestTransport {
    pub fn new(base: Url) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self
            .base
            .join(&request.path)
            .map_err(|e| TransportError(format!("invalid path {:?}: {e}", request.path)))?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        // Non-JSON bodies (proxies, plain-text errors) are kept as a string.
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(ApiResponse { status, body })
    }
}
