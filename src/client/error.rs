//! Client-side error types.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Why a refresh attempt failed. Cloned to every caller queued on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The refresh endpoint rejected the refresh credential (401/403).
    #[error("Session expired (refresh answered {0})")]
    SessionExpired(u16),
    #[error("Refresh rejected with status {0}")]
    Rejected(u16),
    /// Success status without a usable access token in the body.
    #[error("Refresh response carried no access token")]
    Protocol,
    #[error("Refresh request failed: {0}")]
    Network(String),
    #[error("Refresh timed out after {0:?}")]
    TimedOut(Duration),
    /// The leader went away before producing a result.
    #[error("Refresh abandoned")]
    Abandoned,
}

impl RefreshError {
    /// True when the server says the refresh credential is no longer valid.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, RefreshError::SessionExpired(_))
    }
}

/// Errors returned by [`ApiClient`](super::ApiClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),
    /// 401 that refresh could not recover.
    #[error("Unauthorized")]
    Unauthorized,
    /// 403. Never triggers a refresh.
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Refresh(#[from] RefreshError),
    #[error("Request failed with status {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// No response was received at all. Callers use this to keep
    /// connectivity blips out of their error logs.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    /// The user has to sign in again before retrying. An abandoned refresh
    /// reached no verdict and left the token untouched.
    pub fn requires_login(&self) -> bool {
        match self {
            ClientError::Unauthorized => true,
            ClientError::Refresh(e) => *e != RefreshError::Abandoned,
            _ => false,
        }
    }
}
