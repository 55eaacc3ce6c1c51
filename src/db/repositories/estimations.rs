use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_sql_error},
    models::{NewEstimation, SavedEstimation},
};

const SELECT_COLUMNS: &str = "id, user_id, project_name, created_at,
        input_m2_terreno, input_cantidad_personas, input_orientacion, input_forma_terreno,
        result_cantidad_dormitorio, result_cantidad_bano, result_m2_cocina,
        result_m2_estar_comedor, result_m2_dormitorios_total, result_m2_banos_total,
        result_costo_estimado, result_tiempo_meses, result_layout_key";

fn row_to_estimation(row: &Row) -> Result<SavedEstimation, rusqlite::Error> {
    let created_at: String = row.get("created_at")?;

    Ok(SavedEstimation {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        created_at: parse_datetime(&created_at, "created_at").map_err(to_sql_error)?,
        data: NewEstimation {
            project_name: row.get("project_name")?,
            land_area_m2: row.get("input_m2_terreno")?,
            occupant_count: row.get("input_cantidad_personas")?,
            orientation: row.get("input_orientacion")?,
            land_shape: row.get("input_forma_terreno")?,
            room_count: row.get("result_cantidad_dormitorio")?,
            bathroom_count: row.get("result_cantidad_bano")?,
            kitchen_area_m2: row.get("result_m2_cocina")?,
            living_dining_area_m2: row.get("result_m2_estar_comedor")?,
            bedroom_area_m2: row.get("result_m2_dormitorios_total")?,
            bathroom_area_m2: row.get("result_m2_banos_total")?,
            estimated_cost: row.get("result_costo_estimado")?,
            duration_months: row.get("result_tiempo_meses")?,
            layout_key: row.get("result_layout_key")?,
        },
    })
}

impl Database {
    /// Persist a new estimation owned by `user_id` and return it with its id
    pub async fn insert_estimation(
        &self,
        user_id: i64,
        estimation: NewEstimation,
    ) -> Result<SavedEstimation> {
        self.execute(move |conn| {
            let now = Utc::now();
            let e = &estimation;

            conn.execute(
                "INSERT INTO estimations (
                    user_id, project_name, created_at,
                    input_m2_terreno, input_cantidad_personas, input_orientacion, input_forma_terreno,
                    result_cantidad_dormitorio, result_cantidad_bano, result_m2_cocina,
                    result_m2_estar_comedor, result_m2_dormitorios_total, result_m2_banos_total,
                    result_costo_estimado, result_tiempo_meses, result_layout_key)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    user_id,
                    e.project_name,
                    now.to_rfc3339(),
                    e.land_area_m2,
                    e.occupant_count,
                    e.orientation,
                    e.land_shape,
                    e.room_count,
                    e.bathroom_count,
                    e.kitchen_area_m2,
                    e.living_dining_area_m2,
                    e.bedroom_area_m2,
                    e.bathroom_area_m2,
                    e.estimated_cost,
                    e.duration_months,
                    e.layout_key,
                ],
            )?;

            let estimation_id = conn.last_insert_rowid();
            let query = format!("SELECT {SELECT_COLUMNS} FROM estimations WHERE id = ?1");
            conn.query_row(&query, params![estimation_id], row_to_estimation)
                .optional()?
                .ok_or_else(|| anyhow!("Estimation not found after insert"))
        })
        .await
    }

    /// All estimations owned by `user_id`, newest first
    pub async fn list_estimations(&self, user_id: i64) -> Result<Vec<SavedEstimation>> {
        self.execute(move |conn| {
            let query = format!(
                "SELECT {SELECT_COLUMNS} FROM estimations
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&query)?;
            let estimations = stmt
                .query_map(params![user_id], row_to_estimation)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(estimations)
        })
        .await
    }

    /// A single estimation, only if `user_id` owns it
    pub async fn get_estimation(
        &self,
        user_id: i64,
        estimation_id: i64,
    ) -> Result<Option<SavedEstimation>> {
        self.execute(move |conn| {
            let query =
                format!("SELECT {SELECT_COLUMNS} FROM estimations WHERE id = ?1 AND user_id = ?2");
            let estimation = conn
                .query_row(&query, params![estimation_id, user_id], row_to_estimation)
                .optional()?;
            Ok(estimation)
        })
        .await
    }

    /// Delete an estimation owned by `user_id`
    /// Returns false when no such row exists for that owner
    pub async fn delete_estimation(&self, user_id: i64, estimation_id: i64) -> Result<bool> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM estimations WHERE id = ?1 AND user_id = ?2",
                params![estimation_id, user_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
