//! Raw model outputs → user-facing result.

use serde::{Deserialize, Serialize};

use super::{schema::TARGET_COUNT, PredictionError};

pub const FLOOR_PLAN_PREFIX: &str = "estimator/";
pub const FLOOR_PLAN_SUFFIX: &str = ".jpg";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    #[serde(rename = "cantidad_dormitorio")]
    pub room_count: i64,
    #[serde(rename = "cantidad_bano")]
    pub bathroom_count: i64,
    #[serde(rename = "m2_cocina")]
    pub kitchen_area_m2: f64,
    #[serde(rename = "m2_estar_comedor")]
    pub living_dining_area_m2: f64,
    #[serde(rename = "m2_dormitorios_total")]
    pub bedroom_area_m2: f64,
    #[serde(rename = "m2_banos_total")]
    pub bathroom_area_m2: f64,
    #[serde(rename = "costo_estimado")]
    pub estimated_cost: f64,
    #[serde(rename = "tiempo_meses")]
    pub duration_months: f64,
    #[serde(rename = "url_plano_sugerido")]
    pub floor_plan_url: String,
    pub layout_key: String,
}

/// Rounds half away from zero at `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

pub fn ceil_count(value: f64) -> i64 {
    value.ceil() as i64
}

/// Asset path for a layout key. The asset is not checked for existence.
pub fn floor_plan_url(layout_key: &str) -> String {
    format!("{FLOOR_PLAN_PREFIX}{layout_key}{FLOOR_PLAN_SUFFIX}")
}

pub fn format(predictions: &[f64], layout_key: &str) -> Result<EstimationResult, PredictionError> {
    if predictions.len() < TARGET_COUNT {
        return Err(PredictionError::InsufficientOutput {
            expected: TARGET_COUNT,
            actual: predictions.len(),
        });
    }

    Ok(EstimationResult {
        room_count: ceil_count(predictions[0]),
        bathroom_count: ceil_count(predictions[1]),
        kitchen_area_m2: round_to(predictions[2], 1),
        living_dining_area_m2: round_to(predictions[3], 1),
        bedroom_area_m2: round_to(predictions[4], 1),
        bathroom_area_m2: round_to(predictions[5], 1),
        estimated_cost: round_to(predictions[6], 2),
        duration_months: round_to(predictions[7], 1),
        floor_plan_url: floor_plan_url(layout_key),
        layout_key: layout_key.to_string(),
    })
}
