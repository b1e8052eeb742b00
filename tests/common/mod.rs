//! Shared helpers for the router and scenario tests.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tasks_api::{routes, AppState};
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "test-secret";

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    iat: Option<usize>,
}

pub fn app(pool: PgPool) -> Router {
    routes::routes(AppState::new(pool, SECRET))
}

/// A router over a pool that never connects; only usable for requests that
/// are rejected before reaching the database.
pub fn offline_app() -> Router {
    let pool = PgPool::connect_lazy("postgres://postgres@localhost:1/unused").unwrap();
    app(pool)
}

pub fn token_for(user_id: Uuid) -> String {
    token_with_secret(user_id, SECRET)
}

pub fn token_with_secret(user_id: Uuid, secret: &str) -> String {
    let now = chrono::Utc::now().timestamp() as usize;
    sign(
        &Claims {
            sub: user_id.to_string(),
            exp: now + 3600,
            iat: Some(now),
        },
        secret,
    )
}

/// A token carrying only `sub` and `exp`.
pub fn token_without_iat(user_id: Uuid) -> String {
    let now = chrono::Utc::now().timestamp() as usize;
    sign(
        &Claims {
            sub: user_id.to_string(),
            exp: now + 3600,
            iat: None,
        },
        SECRET,
    )
}

fn sign(claims: &Claims, secret: &str) -> String {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, json)
}

/// A caller with a token, bound to one router.
pub struct Client {
    pub app: Router,
    pub user_id: Uuid,
    token: String,
}

impl Client {
    pub fn new(app: &Router, user_id: Uuid) -> Self {
        Self {
            app: app.clone(),
            user_id,
            token: token_for(user_id),
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.app, Method::GET, uri, Some(&self.token), None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.app, Method::POST, uri, Some(&self.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.app, Method::PUT, uri, Some(&self.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.app, Method::PATCH, uri, Some(&self.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.app, Method::DELETE, uri, Some(&self.token), None).await
    }
}

pub async fn create_user(pool: &PgPool, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2)")
        .bind(id)
        .bind(email)
        .execute(pool)
        .await
        .unwrap();
    id
}

/// Inserts a personal task whose `created_at` lies `age_minutes` in the past.
pub async fn insert_task(pool: &PgPool, owner_id: Uuid, title: &str, is_done: bool, age_minutes: i32) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO tasks (owner_id, title, is_done, created_at, updated_at)
        VALUES ($1, $2, $3, NOW() - make_interval(mins => $4), NOW() - make_interval(mins => $4))
        RETURNING id
        "#,
    )
    .bind(owner_id)
    .bind(title)
    .bind(is_done)
    .bind(age_minutes)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub fn expired_token(user_id: Uuid) -> String {
    let now = chrono::Utc::now().timestamp() as usize;
    sign(
        &Claims {
            sub: user_id.to_string(),
            exp: now - 3600,
            iat: Some(now - 7200),
        },
        SECRET,
    )
}
