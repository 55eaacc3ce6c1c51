//! Saved-estimation data models.
//!
//! Wire names match the prediction endpoint so a client can post a result
//! back unchanged together with its inputs and a project name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prediction::formatter::floor_plan_url;

/// Every key the save endpoint requires, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 14] = [
    "project_name",
    "m2_terreno",
    "cantidad_personas",
    "orientacion",
    "forma_terreno",
    "cantidad_dormitorio",
    "cantidad_bano",
    "m2_cocina",
    "m2_estar_comedor",
    "m2_dormitorios_total",
    "m2_banos_total",
    "costo_estimado",
    "tiempo_meses",
    "layout_key",
];

/// Input data for saving an estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEstimation {
    pub project_name: String,

    #[serde(rename = "m2_terreno")]
    pub land_area_m2: f64,
    #[serde(rename = "cantidad_personas")]
    pub occupant_count: i64,
    #[serde(rename = "orientacion")]
    pub orientation: i64,
    #[serde(rename = "forma_terreno")]
    pub land_shape: String,

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

    pub layout_key: String,
}

/// A persisted estimation. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedEstimation {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: NewEstimation,
}

impl SavedEstimation {
    pub fn floor_plan_url(&self) -> String {
        floor_plan_url(&self.data.layout_key)
    }
}

/// Row in the owner's estimation list
#[derive(Debug, Clone, Serialize)]
pub struct EstimationSummary {
    pub id: i64,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "costo_estimado")]
    pub estimated_cost: f64,
    #[serde(rename = "tiempo_meses")]
    pub duration_months: f64,
    pub layout_key: String,
}

impl From<SavedEstimation> for EstimationSummary {
    fn from(saved: SavedEstimation) -> Self {
        Self {
            id: saved.id,
            project_name: saved.data.project_name,
            created_at: saved.created_at,
            estimated_cost: saved.data.estimated_cost,
            duration_months: saved.data.duration_months,
            layout_key: saved.data.layout_key,
        }
    }
}
