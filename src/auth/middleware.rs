//! Request-scoped authentication and authorization middleware.
//!
//! ```ignore
//! // Two stages, composed. Layers run bottom-up, so `require_auth` runs first.
//! Router::new()
//!     .route("/users", get(list_users))
//!     .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, require_role))
//!     .route_layer(middleware::from_fn_with_state(jwt.clone(), require_auth));
//!
//! // One unit.
//! post(create_job).route_layer(middleware::from_fn_with_state(
//!     AuthGuard::new(jwt, STAFF),
//!     auth_and_role,
//! ));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::errors::AuthError;
use super::types::{AllowedRoles, AuthGuard, Identity};
use crate::jwt::JwtConfig;

/// Verify the bearer token in `headers` and decode its identity.
pub fn authenticate(headers: &HeaderMap, jwt: &JwtConfig) -> Result<Identity, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;

    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidToken)?;

    let claims = jwt.validate_access_token(token).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        AuthError::InvalidToken
    })?;

    Ok(Identity::from(claims))
}

/// Check an identity against a route's allow-list.
pub fn authorize(identity: &Identity, allowed: AllowedRoles) -> Result<(), AuthError> {
    if allowed.contains(identity.role) {
        Ok(())
    } else {
        warn!(user = %identity.sub, role = %identity.role, "Role not allowed on route");
        Err(AuthError::InsufficientRole)
    }
}

/// Reject requests without a valid access token; attach the identity otherwise.
pub async fn require_auth(
    State(jwt): State<Arc<JwtConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = authenticate(request.headers(), &jwt)?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Reject requests whose identity is not in `allowed`. Must run after `require_auth`.
pub async fn require_role(
    State(allowed): State<AllowedRoles>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or(AuthError::MissingToken)?;
    authorize(identity, allowed)?;
    Ok(next.run(request).await)
}

/// `require_auth` followed by `require_role` as a single layer.
pub async fn auth_and_role(
    State(guard): State<AuthGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = authenticate(request.headers(), &guard.jwt)?;
    authorize(&identity, guard.allowed)?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
