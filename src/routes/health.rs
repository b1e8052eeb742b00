use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthData {
    status: u16,
}

/// Liveness probe; does not touch the database.
pub async fn health() -> Json<HealthData> {
    Json(HealthData {
        status: StatusCode::OK.as_u16(),
    })
}
