//! Rate limiting for the login endpoint.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password guessing.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::api::ApiError;
use crate::auth::extract_client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Login attempts allowed per minute per IP.
const LOGIN_PER_MIN: NonZeroU32 = NonZeroU32::new(10).unwrap();

/// Burst allowance before the per-minute rate applies.
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();

/// Key used when no client address can be determined (e.g. in-process tests).
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone)]
pub struct RateLimitConfig {
    pub login: Arc<IpLimiter>,
    pub trust_proxy: bool,
}

impl RateLimitConfig {
    pub fn new(trust_proxy: bool) -> Self {
        Self::with_quota(
            Quota::per_minute(LOGIN_PER_MIN).allow_burst(LOGIN_BURST),
            trust_proxy,
        )
    }

    pub fn with_quota(quota: Quota, trust_proxy: bool) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(quota)),
            trust_proxy,
        }
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<RateLimitConfig>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&request, config.trust_proxy)
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, "Login rate limit exceeded");
            ApiError::too_many_requests(
                "Too many login attempts. Please wait before trying again.",
            )
            .into_response()
        }
    }
}
