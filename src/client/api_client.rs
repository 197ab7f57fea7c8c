//! API client with transparent access token refresh.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::coordinator::RefreshCoordinator;
use super::error::{ClientError, RefreshError};
use super::token_store::TokenStore;
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::api::ACCESS_TOKEN_FIELD;

/// Upper bound on a single refresh round-trip.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends API requests with the current access token. A 401 triggers one
/// shared refresh, after which the request is replayed once.
///
/// Any failed refresh ends the session: later 401s fail fast until a login
/// or an explicit [`retry_refresh`](Self::retry_refresh) stores a new token.
pub struct ApiClient<T> {
    transport: T,
    tokens: Arc<TokenStore>,
    coordinator: RefreshCoordinator,
    refresh_timeout: Duration,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, tokens: Arc<TokenStore>) -> Self {
        Self {
            transport,
            tokens,
            coordinator: RefreshCoordinator::new(),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a request and return the 2xx response body.
    pub async fn send(&self, mut request: ApiRequest) -> Result<Value, ClientError> {
        self.tokens.attach(&mut request);
        let response = self.dispatch(&request).await?;

        if response.status != StatusCode::UNAUTHORIZED {
            return classify(response);
        }

        if request.is_refresh() || request.is_retried() || self.tokens.session_ended() {
            return Err(ClientError::Unauthorized);
        }

        let sent = request.bearer_token().map(str::to_string);
        let token = match self.tokens.token() {
            // Another request already refreshed since this one was sent.
            Some(current) if sent.as_deref() != Some(current.as_str()) => {
                debug!(path = %request.path, "Token changed in flight, replaying without refresh");
                current
            }
            _ => {
                self.coordinator
                    .run(|| self.refresh_access_token())
                    .await?
            }
        };

        let replay = request.replay_with(&token);
        let response = self.dispatch(&replay).await?;
        if response.status == StatusCode::UNAUTHORIZED {
            debug!(path = %replay.path, "Replayed request still unauthorized");
            return Err(ClientError::Unauthorized);
        }
        classify(response)
    }

    /// Send and decode the response body.
    pub async fn send_json<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ClientError> {
        let body = self.send(request).await?;
        serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Sign in and keep the returned access token. The refresh cookie is
    /// held by the transport.
    pub async fn login(&self, email: &str, password: &str) -> Result<Value, ClientError> {
        let request = ApiRequest::post(
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        );
        let body = classify(self.dispatch(&request).await?)?;
        let token = access_token(&body).ok_or_else(|| {
            ClientError::Decode(format!("login response has no {ACCESS_TOKEN_FIELD}"))
        })?;
        self.tokens.set_token(token);
        Ok(body)
    }

    /// Revoke the refresh token server-side and forget the access token.
    /// The local session is ended even when the server is unreachable.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let request = ApiRequest::new(Method::POST, "/api/auth/logout");
        let result = self.dispatch(&request).await.and_then(classify);
        self.tokens.end_session();
        result.map(|_| ())
    }

    /// Try the refresh again after a failure ended the session. Queues
    /// behind a refresh already in flight. Success stores the new token and
    /// lifts the session-ended latch.
    pub async fn retry_refresh(&self) -> Result<String, RefreshError> {
        self.coordinator
            .run(|| self.refresh_access_token())
            .await
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        self.transport.send(request).await.map_err(|e| {
            debug!(method = %request.method, path = %request.path, error = %e, "Request failed without response");
            ClientError::Network(e.0)
        })
    }

    /// Leader work: call the refresh endpoint and update the token store.
    async fn refresh_access_token(&self) -> Result<String, RefreshError> {
        let result = match tokio::time::timeout(self.refresh_timeout, self.call_refresh()).await {
            Ok(result) => result,
            Err(_) => Err(RefreshError::TimedOut(self.refresh_timeout)),
        };

        match &result {
            Ok(token) => {
                self.tokens.set_token(token);
                info!("Access token refreshed");
            }
            Err(e) if e.is_session_expired() => {
                info!("Refresh rejected, ending session");
                self.tokens.end_session();
            }
            Err(e) => {
                warn!(error = %e, "Access token refresh failed, ending session");
                self.tokens.end_session();
            }
        }
        result
    }

    async fn call_refresh(&self) -> Result<String, RefreshError> {
        let response = self
            .transport
            .send(&ApiRequest::refresh())
            .await
            .map_err(|e| RefreshError::Network(e.0))?;

        match response.status {
            status if status.is_success() => access_token(&response.body)
                .map(str::to_string)
                .ok_or(RefreshError::Protocol),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(RefreshError::SessionExpired(response.status.as_u16()))
            }
            status => Err(RefreshError::Rejected(status.as_u16())),
        }
    }
}

fn access_token(body: &Value) -> Option<&str> {
    body.get(ACCESS_TOKEN_FIELD)
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
}

fn classify(response: ApiResponse) -> Result<Value, ClientError> {
    match response.status {
        status if status.is_success() => Ok(response.body),
        StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
        StatusCode::FORBIDDEN => Err(ClientError::Forbidden(response.message())),
        status => Err(ClientError::Status {
            status,
            message: response.message(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_access_token_extraction() {
        assert_eq!(access_token(&json!({ "accessToken": "t" })), Some("t"));
        assert_eq!(access_token(&json!({ "accessToken": "" })), None);
        assert_eq!(access_token(&json!({ "token": "t" })), None);
        assert_eq!(access_token(&json!({ "accessToken": 5 })), None);
    }

    #[test]
    fn test_classify() {
        let ok = classify(ApiResponse::new(StatusCode::CREATED, json!({ "id": 1 })));
        assert_eq!(ok.unwrap(), json!({ "id": 1 }));

        let forbidden = classify(ApiResponse::new(
            StatusCode::FORBIDDEN,
            json!({ "message": "Forbidden: insufficient role" }),
        ));
        assert!(
            matches!(forbidden, Err(ClientError::Forbidden(ref m)) if m == "Forbidden: insufficient role")
        );

        let conflict = classify(ApiResponse::new(StatusCode::CONFLICT, Value::Null));
        assert!(matches!(
            conflict,
            Err(ClientError::Status {
                status: StatusCode::CONFLICT,
                ..
            })
        ));
    }
}
