mod admin;
mod auth;
mod error;
mod jobs;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

pub use auth::ACCESS_TOKEN_FIELD;
pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    secure_cookies: bool,
    rate_limit: RateLimitConfig,
) -> Router {
    let auth_state = auth::AuthState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
        trust_proxy: rate_limit.trust_proxy,
    };

    let admin_state = admin::AdminState { db: db.clone() };

    let jobs_state = jobs::JobsState { db };

    Router::new()
        .nest("/auth", auth::router(auth_state, rate_limit))
        .nest("/admin", admin::router(admin_state, jwt.clone()))
        .nest("/jobs", jobs::router(jobs_state, jwt))
}
