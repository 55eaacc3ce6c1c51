//! Request extraction shared by the API handlers: bearer-token identity and
//! JSON bodies that report failures in the API's error shape.
//!
//! Tokens are issued by `estimator create-user`; there is no login flow.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Path},
    http::{header::AUTHORIZATION, request::Parts},
};
use log::warn;
use serde_json::Value;

use crate::{db::User, error::ApiError, AppState};

/// Decodes a raw body. Handlers take `Bytes` and call this themselves so
/// they control what is checked before the body is looked at.
pub fn parse_json_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::MalformedJson(err.to_string()))
}

/// The authenticated caller. Extracting it rejects the request with 401 when
/// the token is absent or unknown.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;

        match state.db.find_user_by_token(token.to_string()).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                warn!("Rejected request with unknown token on {}", parts.uri.path());
                Err(ApiError::Unauthorized)
            }
        }
    }
}

/// Numeric id from the `:id` path segment. Unparseable ids are rejected in
/// the API's error shape instead of axum's plain-text body.
#[derive(Debug, Clone, Copy)]
pub struct EstimationId(pub i64);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for EstimationId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::InvalidPayload(rejection.body_text()))?;
        Ok(EstimationId(id))
    }
}
