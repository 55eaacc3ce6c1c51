use axum::{body::Bytes, extract::State, Json};
use log::info;

use crate::{
    error::ApiResult,
    extract::{parse_json_body, CurrentUser},
    AppState,
};

use super::{estimate, EstimationResult};

/// `POST /api/estimate/`
pub async fn estimate_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> ApiResult<Json<EstimationResult>> {
    // Unloaded models fail every request the same way, whatever the body.
    state.models.models()?;

    let body = parse_json_body(&body)?;
    let result = estimate(&state.models, &body)?;

    info!(
        "Estimate for user {}: layout {} cost {}",
        user.id, result.layout_key, result.estimated_cost
    );
    Ok(Json(result))
}
