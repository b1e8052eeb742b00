use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, inserted by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(ApiError::Unauthenticated("missing user"))
    }
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct Claims {
    sub: String,
    exp: usize,
    iat: Option<usize>,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req.headers().get("authorization").and_then(|v| v.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(t) if !t.is_empty() => t,
        _ => return Err(ApiError::Unauthenticated("missing token")),
    };

    let token_data = decode::<Claims>(token, &state.decoding_key, &Validation::default())
        .map_err(|e| {
            tracing::warn!(error = %e, "JWT decode error");
            ApiError::Unauthenticated("invalid token")
        })?;

    let user_id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| ApiError::Unauthenticated("invalid subject"))?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}
