//! In-memory access token, mirrored to durable storage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::storage::TokenStorage;
use super::transport::ApiRequest;

/// Durable slot holding the JSON-encoded access token.
pub const ACCESS_TOKEN_SLOT: &str = "access_token";

/// Holds the current access token and attaches it to outgoing requests.
///
/// Storage failures are logged and otherwise ignored: the in-memory copy is
/// authoritative for the running process.
pub struct TokenStore {
    token: RwLock<Option<String>>,
    storage: Arc<dyn TokenStorage>,
    session_ended: AtomicBool,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            token: RwLock::new(None),
            storage,
            session_ended: AtomicBool::new(false),
        }
    }

    /// Store a fresh token. Also lifts the session-ended latch.
    pub fn set_token(&self, token: &str) {
        *self.write() = Some(token.to_string());
        self.session_ended.store(false, Ordering::SeqCst);

        match serde_json::to_string(token) {
            Ok(encoded) => {
                if let Err(e) = self.storage.set(ACCESS_TOKEN_SLOT, &encoded) {
                    warn!(error = %e, "Failed to persist access token");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode access token"),
        }
    }

    pub fn clear_token(&self) {
        *self.write() = None;
        if let Err(e) = self.storage.remove(ACCESS_TOKEN_SLOT) {
            warn!(error = %e, "Failed to remove persisted access token");
        }
    }

    /// Clear the token and latch: further 401s fail without a refresh
    /// attempt until the next `set_token`.
    pub fn end_session(&self) {
        self.clear_token();
        self.session_ended.store(true, Ordering::SeqCst);
    }

    pub fn session_ended(&self) -> bool {
        self.session_ended.load(Ordering::SeqCst)
    }

    /// Hydrate memory from durable storage. Unreadable or malformed content
    /// removes the slot and yields `None`.
    pub fn load_token_from_storage(&self) -> Option<String> {
        let raw = match self.storage.get(ACCESS_TOKEN_SLOT) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted access token");
                return None;
            }
        };

        match serde_json::from_str::<String>(&raw) {
            Ok(token) if !token.is_empty() => {
                *self.write() = Some(token.clone());
                Some(token)
            }
            _ => {
                debug!("Discarding malformed persisted access token");
                if let Err(e) = self.storage.remove(ACCESS_TOKEN_SLOT) {
                    warn!(error = %e, "Failed to remove malformed access token");
                }
                None
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Set the bearer header from the in-memory token, or remove it when
    /// there is none.
    pub fn attach(&self, request: &mut ApiRequest) {
        let token = self.token.read().unwrap_or_else(|e| e.into_inner());
        request.set_bearer(token.as_deref());
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<String>> {
        self.token.write().unwrap_or_else(|e| e.into_inner())
    }
}
