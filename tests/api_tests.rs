//! Tests for the admin and job posting endpoints.

mod common;

use axum::http::StatusCode;
use common::{TestApp, create_test_app, create_user, json_body};
use hireportal::db::UserRole;
use serde_json::json;

async fn admin_token(ctx: &TestApp) -> String {
    let uuid = create_user(&ctx.db, "admin@agency.example", UserRole::Admin).await;
    ctx.token_for(&uuid, "admin@agency.example", UserRole::Admin)
}

async fn recruiter_token(ctx: &TestApp) -> String {
    let uuid = create_user(&ctx.db, "rita@agency.example", UserRole::Recruiter).await;
    ctx.token_for(&uuid, "rita@agency.example", UserRole::Recruiter)
}

#[tokio::test]
async fn test_admin_create_user() {
    let ctx = create_test_app().await;
    let token = admin_token(&ctx).await;

    let response = ctx
        .request(
            "POST",
            "/api/admin/users",
            Some(&token),
            Some(json!({
                "email": "new@agency.example",
                "name": "New Recruiter",
                "password": "a long enough password",
                "role": "recruiter",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["role"], "recruiter");

    // The new account can sign in.
    let response = ctx
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "new@agency.example", "password": "a long enough password" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_create_user_validation() {
    let ctx = create_test_app().await;
    let token = admin_token(&ctx).await;

    let cases = [
        json!({ "email": "bad", "name": "X", "password": "long enough pw", "role": "user" }),
        json!({ "email": "a@b.example", "name": "  ", "password": "long enough pw", "role": "user" }),
        json!({ "email": "a@b.example", "name": "X", "password": "short", "role": "user" }),
    ];
    for body in cases {
        let response = ctx
            .request("POST", "/api/admin/users", Some(&token), Some(body.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
    }

    // Unknown role fails deserialization.
    let response = ctx
        .request(
            "POST",
            "/api/admin/users",
            Some(&token),
            Some(json!({ "email": "a@b.example", "name": "X", "password": "long enough pw", "role": "owner" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_admin_create_user_duplicate_email() {
    let ctx = create_test_app().await;
    let token = admin_token(&ctx).await;

    let response = ctx
        .request(
            "POST",
            "/api/admin/users",
            Some(&token),
            Some(json!({
                "email": "ADMIN@agency.example",
                "name": "Clone",
                "password": "long enough pw",
                "role": "user",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_cannot_deactivate_self() {
    let ctx = create_test_app().await;
    let uuid = create_user(&ctx.db, "admin@agency.example", UserRole::Admin).await;
    let token = ctx.token_for(&uuid, "admin@agency.example", UserRole::Admin);

    let response = ctx
        .request(
            "PUT",
            &format!("/api/admin/users/{uuid}/active"),
            Some(&token),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .request(
            "PUT",
            &format!("/api/admin/users/{}/active", uuid::Uuid::new_v4()),
            Some(&token),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_job_lifecycle() {
    let ctx = create_test_app().await;
    let token = recruiter_token(&ctx).await;

    let response = ctx
        .request(
            "POST",
            "/api/jobs",
            Some(&token),
            Some(json!({ "title": "Forklift Driver", "location": "Hull", "description": "Nights" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let job = json_body(response).await;
    let uuid = job["uuid"].as_str().unwrap().to_string();
    let status_uri = format!("/api/jobs/{uuid}/status");

    let listed = json_body(ctx.request("GET", "/api/jobs", None, None).await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = ctx
        .request("PATCH", &status_uri, Some(&token), Some(json!({ "status": "closed" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Closed postings are not public.
    let listed = json_body(ctx.request("GET", "/api/jobs", None, None).await).await;
    assert!(listed.as_array().unwrap().is_empty());

    let response = ctx
        .request("PATCH", &status_uri, Some(&token), Some(json!({ "status": "filled" })))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    for status in ["open", "filled"] {
        let response = ctx
            .request("PATCH", &status_uri, Some(&token), Some(json!({ "status": status })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Filled is terminal.
    let response = ctx
        .request("PATCH", &status_uri, Some(&token), Some(json!({ "status": "open" })))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_job_validation_and_missing() {
    let ctx = create_test_app().await;
    let token = recruiter_token(&ctx).await;

    let response = ctx
        .request(
            "POST",
            "/api/jobs",
            Some(&token),
            Some(json!({ "title": "x".repeat(201), "location": "Hull" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .request(
            "POST",
            "/api/jobs",
            Some(&token),
            Some(json!({ "title": "Chef", "location": "" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .request(
            "PATCH",
            &format!("/api/jobs/{}/status", uuid::Uuid::new_v4()),
            Some(&token),
            Some(json!({ "status": "closed" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .request(
            "PATCH",
            "/api/jobs/not-a-uuid/status",
            Some(&token),
            Some(json!({ "status": "closed" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
