//! Job posting endpoints.
//!
//! Listing open postings is public. Creating and moving postings through
//! their lifecycle is staff-only; deleting is admin-only.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt, validate_text, validate_uuid};
use crate::auth::{ADMIN_ONLY, AuthGuard, Identity, STAFF, auth_and_role};
use crate::db::{Database, JobStatus, NewJob};
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct JobsState {
    pub db: Database,
}

pub fn router(state: JobsState, jwt: Arc<JwtConfig>) -> Router {
    let staff = middleware::from_fn_with_state(AuthGuard::new(jwt.clone(), STAFF), auth_and_role);
    let admin = middleware::from_fn_with_state(AuthGuard::new(jwt, ADMIN_ONLY), auth_and_role);

    Router::new()
        .route(
            "/",
            get(list_jobs).merge(post(create_job).route_layer(staff.clone())),
        )
        .route(
            "/{uuid}/status",
            patch(update_status).route_layer(staff),
        )
        .route("/{uuid}", delete(delete_job).route_layer(admin))
        .with_state(state)
}

async fn list_jobs(State(state): State<JobsState>) -> Result<impl IntoResponse, ApiError> {
    let jobs = state
        .db
        .jobs()
        .list_by_status(JobStatus::Open)
        .await
        .db_err("Failed to list jobs")?;
    Ok(Json(jobs))
}

#[derive(Deserialize)]
struct CreateJobRequest {
    title: String,
    location: String,
    #[serde(default)]
    description: String,
}

async fn create_job(
    State(state): State<JobsState>,
    identity: Identity,
    Json(body): Json<CreateJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_text("Title", &body.title, 1, 200)?;
    validate_text("Location", &body.location, 1, 100)?;
    validate_text("Description", &body.description, 0, 10_000)?;

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .jobs()
        .create(NewJob {
            uuid: &uuid,
            title: body.title.trim(),
            location: body.location.trim(),
            description: body.description.trim(),
            created_by: &identity.sub,
        })
        .await
        .db_err("Failed to create job")?;

    let job = state
        .db
        .jobs()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load job")?
        .ok_or_else(|| ApiError::internal("Job vanished after insert"))?;

    info!(user = %identity.sub, job = %uuid, "Job created");
    Ok((StatusCode::CREATED, Json(job)))
}

#[derive(Deserialize)]
struct UpdateStatusRequest {
    status: JobStatus,
}

async fn update_status(
    State(state): State<JobsState>,
    identity: Identity,
    Path(uuid): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&uuid)?;

    let job = state
        .db
        .jobs()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to get job")?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if !job.status.can_transition_to(body.status) {
        return Err(ApiError::conflict(format!(
            "Cannot move job from {} to {}",
            job.status.as_str(),
            body.status.as_str()
        )));
    }

    let updated = state
        .db
        .jobs()
        .update_status(&uuid, job.status, body.status)
        .await
        .db_err("Failed to update job")?;
    if !updated {
        return Err(ApiError::conflict("Job status changed concurrently"));
    }

    info!(
        user = %identity.sub,
        job = %uuid,
        from = job.status.as_str(),
        to = body.status.as_str(),
        "Job status changed"
    );
    Ok(Json(serde_json::json!({ "uuid": uuid, "status": body.status })))
}

async fn delete_job(
    State(state): State<JobsState>,
    identity: Identity,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&uuid)?;

    let deleted = state
        .db
        .jobs()
        .delete(&uuid)
        .await
        .db_err("Failed to delete job")?;
    if !deleted {
        return Err(ApiError::not_found("Job not found"));
    }

    info!(user = %identity.sub, job = %uuid, "Job deleted");
    Ok(StatusCode::NO_CONTENT)
}
