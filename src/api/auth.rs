//! Session endpoints.
//!
//! - POST `/login` - Exchange email and password for an access token and a refresh cookie
//! - POST `/refresh` - Exchange the refresh cookie for a new access token
//! - POST `/logout` - Revoke the refresh token and clear the cookie
//! - GET `/me` - Identity behind the current access token

use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{HeaderMap, StatusCode, header::SET_COOKIE, request::Parts},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::error::{ApiError, ResultExt};
use crate::auth::{
    Identity, REFRESH_COOKIE_NAME, clear_refresh_cookie, extract_client_ip, get_cookie,
    refresh_cookie, require_auth,
};
use crate::db::{Database, User, UserRole};
use crate::jwt::JwtConfig;
use crate::password::verify_password;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

/// JSON field carrying the access token in login and refresh responses.
pub const ACCESS_TOKEN_FIELD: &str = "accessToken";

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
    pub trust_proxy: bool,
}

pub fn router(state: AuthState, rate_limit: RateLimitConfig) -> Router {
    let jwt = state.jwt.clone();
    Router::new()
        .route(
            "/login",
            post(login).route_layer(middleware::from_fn_with_state(
                rate_limit,
                rate_limit_login,
            )),
        )
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route(
            "/me",
            get(me).route_layer(middleware::from_fn_with_state(jwt, require_auth)),
        )
        .with_state(state)
}

/// Client address as seen through the configured proxy policy.
struct ClientIp(Option<String>);

impl FromRequestParts<AuthState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(extract_client_ip(parts, state.trust_proxy)))
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct UserInfo {
    uuid: String,
    email: String,
    name: String,
    role: UserRole,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            uuid: user.uuid.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    user: UserInfo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

const INVALID_CREDENTIALS: &str = "Invalid email or password";

async fn login(
    State(state): State<AuthState>,
    ClientIp(ip): ClientIp,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(body.email.trim())
        .await
        .db_err("Failed to look up user")?
        .filter(|u| u.active)
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let password = body.password;
    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            error!("Password verification task failed: {}", e);
            ApiError::internal("Login failed")
        })?
        .map_err(|e| {
            error!(user = %user.uuid, "Stored password hash is unusable: {}", e);
            ApiError::internal("Login failed")
        })?;

    if !matches {
        info!(user = %user.uuid, "Rejected login with wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let refresh_result = state.jwt.generate_refresh_token(&user.uuid).map_err(|e| {
        error!("Failed to generate refresh token: {}", e);
        ApiError::internal("Failed to generate token")
    })?;

    state
        .db
        .tokens()
        .create(
            &refresh_result.jti,
            user.id,
            ip.as_deref(),
            refresh_result.issued_at,
            refresh_result.expires_at,
        )
        .await
        .db_err("Failed to store refresh token")?;

    let access_result = state
        .jwt
        .generate_access_token(&user.uuid, &user.email, user.role)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    info!(user = %user.uuid, role = %user.role, "User logged in");

    let cookie = refresh_cookie(
        &refresh_result.token,
        refresh_result.duration,
        state.secure_cookies,
    );

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            access_token: access_result.token,
            user: UserInfo::from(&user),
        }),
    ))
}

/// Issue a new access token for a valid, unrevoked refresh cookie.
async fn refresh(
    State(state): State<AuthState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let refresh_token = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized: no refresh token"))?;

    let claims = state
        .jwt
        .validate_refresh_token(refresh_token)
        .map_err(|_| ApiError::unauthorized("Unauthorized: invalid refresh token"))?;

    let record = state
        .db
        .tokens()
        .get_by_jti(&claims.jti)
        .await
        .db_err("Failed to check token")?
        .ok_or_else(|| ApiError::unauthorized("Unauthorized: refresh token revoked"))?;

    let user = state
        .db
        .users()
        .get_by_uuid(&claims.sub)
        .await
        .db_err("Failed to get user")?
        .filter(|u| u.active && u.id == record.user_id)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized: account unavailable"))?;

    if let Some(ref ip) = ip {
        if record.last_ip.as_ref() != Some(ip) {
            if let Err(e) = state.db.tokens().update_ip(&claims.jti, ip).await {
                warn!("Failed to update token IP: {}", e);
            }
        }
    }

    let access_result = state
        .jwt
        .generate_access_token(&user.uuid, &user.email, user.role)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    Ok(Json(RefreshResponse {
        access_token: access_result.token,
    }))
}

/// Logout - revoke the refresh token (if any) and clear the cookie.
async fn logout(State(state): State<AuthState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(refresh_token) = get_cookie(&headers, REFRESH_COOKIE_NAME) {
        if let Ok(claims) = state.jwt.validate_refresh_token(refresh_token) {
            match state.db.tokens().delete_by_jti(&claims.jti).await {
                Ok(_) => info!(user = %claims.sub, "User logged out"),
                Err(e) => warn!("Failed to revoke refresh token: {}", e),
            }
        }
    }

    (
        StatusCode::OK,
        [(SET_COOKIE, clear_refresh_cookie(state.secure_cookies))],
        Json(serde_json::json!({ "success": true })),
    )
}

async fn me(identity: Identity) -> Json<Identity> {
    Json(identity)
}
