//! Authentication types shared by the middleware and handlers.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;

use super::errors::AuthError;
use crate::db::UserRole;
use crate::jwt::{AccessClaims, JwtConfig};

/// Verified identity attached to a request by `require_auth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// User UUID
    pub sub: String,
    pub email: String,
    pub role: UserRole,
}

impl From<AccessClaims> for Identity {
    fn from(claims: AccessClaims) -> Self {
        Self {
            sub: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Reads the identity attached by the auth middleware. Routes without the
/// middleware reject with 401.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Allow-list of roles for a protected route group.
#[derive(Debug, Clone, Copy)]
pub struct AllowedRoles(pub &'static [UserRole]);

impl AllowedRoles {
    pub fn contains(&self, role: UserRole) -> bool {
        self.0.contains(&role)
    }
}

pub const ADMIN_ONLY: AllowedRoles = AllowedRoles(&[UserRole::Admin]);

/// Admins and recruiters.
pub const STAFF: AllowedRoles = AllowedRoles(&[UserRole::Admin, UserRole::Recruiter]);

/// State for the combined `auth_and_role` middleware.
#[derive(Clone)]
pub struct AuthGuard {
    pub jwt: Arc<JwtConfig>,
    pub allowed: AllowedRoles,
}

impl AuthGuard {
    pub fn new(jwt: Arc<JwtConfig>, allowed: AllowedRoles) -> Self {
        Self { jwt, allowed }
    }
}
