use axum::{body::Bytes, extract::State, Json};
use log::info;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    db::{models::REQUIRED_FIELDS, EstimationSummary, NewEstimation, SavedEstimation},
    error::{ApiError, ApiResult},
    extract::{parse_json_body, CurrentUser, EstimationId},
    log_payload,
    prediction::{
        encoder::{FIELD_LAND_AREA, FIELD_LAND_SHAPE, FIELD_OCCUPANTS, FIELD_ORIENTATION},
        EstimationRequest,
    },
    AppState,
};

const LOG_PAYLOADS: bool = true;

/// Saved estimation as returned by the detail endpoint
#[derive(Debug, Serialize)]
pub struct EstimationDetail {
    #[serde(flatten)]
    pub estimation: SavedEstimation,
    pub url_plano_sugerido: String,
}

impl From<SavedEstimation> for EstimationDetail {
    fn from(estimation: SavedEstimation) -> Self {
        Self {
            url_plano_sugerido: estimation.floor_plan_url(),
            estimation,
        }
    }
}

/// Checks presence of every required key before decoding, so the first
/// absent one is named in the error. The four request inputs are read with
/// the estimate endpoint's leniency, so a client can post them back as sent.
pub fn parse_new_estimation(body: &Value) -> ApiResult<NewEstimation> {
    let object = body
        .as_object()
        .ok_or_else(|| ApiError::InvalidPayload("expected a JSON object".into()))?;

    if let Some(field) = REQUIRED_FIELDS.iter().find(|field| !object.contains_key(**field)) {
        return Err(ApiError::MissingField(field.to_string()));
    }

    let request = EstimationRequest::from_json(body)?;
    let mut normalized = object.clone();
    normalized.insert(FIELD_LAND_AREA.into(), request.land_area_m2.into());
    normalized.insert(FIELD_OCCUPANTS.into(), request.occupant_count.into());
    normalized.insert(FIELD_ORIENTATION.into(), request.orientation_code.into());
    normalized.insert(FIELD_LAND_SHAPE.into(), request.land_shape.into());

    serde_json::from_value(Value::Object(normalized))
        .map_err(|err| ApiError::InvalidPayload(err.to_string()))
}

/// `POST /api/save-estimation/`
pub async fn save_estimation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_json_body(&body)?;
    log_payload!("Save request from user {}: {body}", user.id);

    let estimation = parse_new_estimation(&body)?;
    let saved = state.db.insert_estimation(user.id, estimation).await?;

    info!(
        "Estimation '{}' saved with id {} for user {}",
        saved.data.project_name, saved.id, user.id
    );
    Ok(Json(json!({
        "success": true,
        "message": "Estimation saved",
        "estimation_id": saved.id,
    })))
}

/// `GET /api/estimations`
pub async fn list_estimations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<EstimationSummary>>> {
    let estimations = state.db.list_estimations(user.id).await?;
    Ok(Json(estimations.into_iter().map(Into::into).collect()))
}

/// `GET /api/estimations/:id`
pub async fn get_estimation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    EstimationId(estimation_id): EstimationId,
) -> ApiResult<Json<EstimationDetail>> {
    state
        .db
        .get_estimation(user.id, estimation_id)
        .await?
        .map(|estimation| Json(estimation.into()))
        .ok_or(ApiError::NotFound(estimation_id))
}

/// `DELETE /api/estimations/:id`
pub async fn delete_estimation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    EstimationId(estimation_id): EstimationId,
) -> ApiResult<Json<Value>> {
    if !state.db.delete_estimation(user.id, estimation_id).await? {
        return Err(ApiError::NotFound(estimation_id));
    }

    info!("Estimation {estimation_id} deleted by user {}", user.id);
    Ok(Json(json!({ "success": true })))
}
