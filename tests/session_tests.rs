//! Tests for the login, refresh and logout endpoints.
//!
//! Tests cover:
//! - Login success, bad credentials, inactive users, rate limiting
//! - Refresh cookie attributes
//! - Refresh with missing, invalid, revoked and deactivated credentials
//! - Logout revocation

mod common;

use axum::http::StatusCode;
use common::{
    PASSWORD, create_test_app, create_user, json_body, refresh_cookie_pair, set_cookie_header,
};
use hireportal::db::UserRole;
use serde_json::json;

#[tokio::test]
async fn test_login_success() {
    let ctx = create_test_app().await;
    let uuid = create_user(&ctx.db, "rita@agency.example", UserRole::Recruiter).await;

    let response = ctx
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "Rita@Agency.example", "password": PASSWORD })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie_header(&response);
    assert!(cookie.starts_with("refresh_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));

    let body = json_body(response).await;
    assert_eq!(body["user"]["uuid"], uuid);
    assert_eq!(body["user"]["role"], "recruiter");

    let token = body["accessToken"].as_str().unwrap();
    let claims = ctx.jwt.validate_access_token(token).unwrap();
    assert_eq!(claims.sub, uuid);
    assert_eq!(claims.role, UserRole::Recruiter);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let ctx = create_test_app().await;
    create_user(&ctx.db, "rita@agency.example", UserRole::Recruiter).await;

    for (email, password) in [
        ("rita@agency.example", "wrong password here"),
        ("nobody@agency.example", PASSWORD),
    ] {
        let response = ctx
            .request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(refresh_cookie_pair(&response).is_none());
        assert_eq!(
            json_body(response).await,
            json!({ "message": "Invalid email or password" })
        );
    }
}

#[tokio::test]
async fn test_login_rejects_inactive_user() {
    let ctx = create_test_app().await;
    let uuid = create_user(&ctx.db, "gone@agency.example", UserRole::User).await;
    let user = ctx.db.users().get_by_uuid(&uuid).await.unwrap().unwrap();
    ctx.db.users().set_active(user.id, false).await.unwrap();

    let response = ctx
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "gone@agency.example", "password": PASSWORD })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rate_limited() {
    let ctx = create_test_app().await;
    let body = json!({ "email": "nobody@agency.example", "password": "irrelevant" });

    let mut statuses = Vec::new();
    for _ in 0..8 {
        let response = ctx
            .request("POST", "/api/auth/login", None, Some(body.clone()))
            .await;
        statuses.push(response.status());
    }

    assert_eq!(statuses[0], StatusCode::UNAUTHORIZED);
    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_refresh_issues_new_access_token() {
    let ctx = create_test_app().await;
    let uuid = create_user(&ctx.db, "rita@agency.example", UserRole::Recruiter).await;
    let (_, cookie) = ctx.login("rita@agency.example").await;

    let response = ctx
        .request_with_cookie("POST", "/api/auth/refresh", None, Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let claims = ctx
        .jwt
        .validate_access_token(body["accessToken"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, uuid);
}

#[tokio::test]
async fn test_refresh_failures() {
    let ctx = create_test_app().await;
    let uuid = create_user(&ctx.db, "rita@agency.example", UserRole::Recruiter).await;

    let response = ctx.request("POST", "/api/auth/refresh", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await,
        json!({ "message": "Unauthorized: no refresh token" })
    );

    let response = ctx
        .request_with_cookie(
            "POST",
            "/api/auth/refresh",
            None,
            Some("refresh_token=garbage"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // An access token is not a refresh token.
    let access = ctx.token_for(&uuid, "rita@agency.example", UserRole::Recruiter);
    let response = ctx
        .request_with_cookie(
            "POST",
            "/api/auth/refresh",
            None,
            Some(&format!("refresh_token={access}")),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Validly signed but never recorded.
    let unrecorded = ctx.jwt.generate_refresh_token(&uuid).unwrap().token;
    let response = ctx
        .request_with_cookie(
            "POST",
            "/api/auth/refresh",
            None,
            Some(&format!("refresh_token={unrecorded}")),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await,
        json!({ "message": "Unauthorized: refresh token revoked" })
    );
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let ctx = create_test_app().await;
    create_user(&ctx.db, "rita@agency.example", UserRole::Recruiter).await;
    let (_, cookie) = ctx.login("rita@agency.example").await;

    let response = ctx
        .request_with_cookie("POST", "/api/auth/logout", None, Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie_header(&response).contains("Max-Age=0"));
    assert_eq!(json_body(response).await, json!({ "success": true }));

    let response = ctx
        .request_with_cookie("POST", "/api/auth/refresh", None, Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_cookie_succeeds() {
    let ctx = create_test_app().await;
    let response = ctx.request("POST", "/api/auth/logout", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_deactivation_revokes_sessions() {
    let ctx = create_test_app().await;
    let admin = create_user(&ctx.db, "admin@agency.example", UserRole::Admin).await;
    let rita = create_user(&ctx.db, "rita@agency.example", UserRole::Recruiter).await;
    let (_, cookie) = ctx.login("rita@agency.example").await;
    let admin_token = ctx.token_for(&admin, "admin@agency.example", UserRole::Admin);

    let response = ctx
        .request(
            "PUT",
            &format!("/api/admin/users/{rita}/active"),
            Some(&admin_token),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .request_with_cookie("POST", "/api/auth/refresh", None, Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
