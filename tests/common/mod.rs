#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use hireportal::db::{Database, NewUser, UserRole};
use hireportal::jwt::JwtConfig;
use hireportal::password::hash_password;
use hireportal::{ServerConfig, create_app};
use serde_json::Value;
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"test-jwt-secret-for-integration-tests";

pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

pub fn test_config(db: Database) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: JWT_SECRET.to_vec(),
        secure_cookies: false,
        trust_proxy: false,
    }
}

pub async fn create_test_app() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let app = create_app(&test_config(db.clone()));
    TestApp {
        app,
        db,
        jwt: JwtConfig::new(JWT_SECRET),
    }
}

/// Insert an active user with [`PASSWORD`] and return its UUID.
pub async fn create_user(db: &Database, email: &str, role: UserRole) -> String {
    let uuid = uuid::Uuid::new_v4().to_string();
    let hash = hash_password(PASSWORD).expect("Failed to hash password");
    db.users()
        .create(NewUser {
            uuid: &uuid,
            email,
            name: "Test User",
            password_hash: &hash,
            role,
        })
        .await
        .expect("Failed to create user");
    uuid
}

impl TestApp {
    /// Access token for an existing user, signed with the app's secret.
    pub fn token_for(&self, uuid: &str, email: &str, role: UserRole) -> String {
        self.jwt
            .generate_access_token(uuid, email, role)
            .expect("Failed to generate token")
            .token
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        self.request_with_cookie(method, uri, bearer, None, body)
            .await
    }

    pub async fn request_with_cookie(
        &self,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Log in and return (access token, `refresh_token=...` cookie pair).
    pub async fn login(&self, email: &str) -> (String, String) {
        let response = self
            .request(
                "POST",
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = refresh_cookie_pair(&response).expect("login must set refresh cookie");
        let body = json_body(response).await;
        let token = body["accessToken"].as_str().unwrap().to_string();
        (token, cookie)
    }
}

/// `name=value` of the refresh cookie in a Set-Cookie header, if any.
pub fn refresh_cookie_pair(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refresh_token="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn set_cookie_header(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}
