use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::prediction::PredictionError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error("authentication required")]
    Unauthorized,

    #[error("estimation {0} not found")]
    NotFound(i64),

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedJson(_) | ApiError::MissingField(_) | ApiError::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Prediction(err) => match err {
                PredictionError::MissingField { .. } | PredictionError::MalformedInput { .. } => {
                    StatusCode::BAD_REQUEST
                }
                PredictionError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                PredictionError::SchemaMismatch(_) | PredictionError::InsufficientOutput { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Storage(err) => {
                error!("Storage failure: {err:#}");
                "internal server error".to_string()
            }
            other => {
                if status.is_server_error() {
                    error!("Request failed: {other}");
                }
                other.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
