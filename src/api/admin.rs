//! Admin API endpoints.
//!
//! All endpoints require the admin role.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use super::error::{ApiError, ResultExt, validate_text, validate_uuid};
use crate::auth::{ADMIN_ONLY, Identity, require_auth, require_role};
use crate::db::{Database, NewUser, UserRole};
use crate::jwt::JwtConfig;
use crate::password::{hash_password, validate_password};

#[derive(Clone)]
pub struct AdminState {
    pub db: Database,
}

pub fn router(state: AdminState, jwt: Arc<JwtConfig>) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{uuid}/active", put(set_active))
        .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, require_role))
        .route_layer(middleware::from_fn_with_state(jwt, require_auth))
        .with_state(state)
}

async fn list_users(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.users().list().await.db_err("Failed to list users")?;
    Ok(Json(users))
}

#[derive(Deserialize)]
struct CreateUserRequest {
    email: String,
    name: String,
    password: String,
    role: UserRole,
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        && !email.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid email address"))
    }
}

async fn create_user(
    State(state): State<AdminState>,
    admin: Identity,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = body.email.trim().to_string();
    validate_email(&email)?;
    validate_text("Name", &body.name, 1, 100)?;
    validate_password(&body.password).map_err(ApiError::bad_request)?;

    let password = body.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            error!("Password hashing task failed: {}", e);
            ApiError::internal("Failed to create user")
        })?
        .map_err(|e| {
            error!("{}", e);
            ApiError::internal("Failed to create user")
        })?;

    let uuid = uuid::Uuid::new_v4().to_string();
    let name = body.name.trim();
    let result = state
        .db
        .users()
        .create(NewUser {
            uuid: &uuid,
            email: &email,
            name,
            password_hash: &password_hash,
            role: body.role,
        })
        .await;

    match result {
        Ok(_) => {}
        Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
            return Err(ApiError::conflict("Email already registered"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    }

    info!(admin = %admin.sub, user = %uuid, role = %body.role, "User created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "uuid": uuid,
            "email": email,
            "name": name,
            "role": body.role,
        })),
    ))
}

#[derive(Deserialize)]
struct SetActiveRequest {
    active: bool,
}

/// Enable or disable an account. Disabling revokes every session of the user.
async fn set_active(
    State(state): State<AdminState>,
    admin: Identity,
    Path(uuid): Path<String>,
    Json(body): Json<SetActiveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&uuid)?;

    if uuid == admin.sub && !body.active {
        return Err(ApiError::bad_request("Cannot deactivate your own account"));
    }

    let user = state
        .db
        .users()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    state
        .db
        .users()
        .set_active(user.id, body.active)
        .await
        .db_err("Failed to update user")?;

    if !body.active {
        let revoked = state
            .db
            .tokens()
            .delete_all_by_user(user.id)
            .await
            .db_err("Failed to revoke sessions")?;
        info!(admin = %admin.sub, user = %uuid, revoked, "User deactivated");
    } else {
        info!(admin = %admin.sub, user = %uuid, "User activated");
    }

    Ok(Json(serde_json::json!({ "uuid": uuid, "active": body.active })))
}
