//! Feature schema shared by the training job and the online encoder.
//!
//! Both model artifacts embed the schema they were trained against. The
//! registry compares it with [`FeatureSchema::current`] at load time, so a
//! column added, dropped or reordered on one side fails loudly instead of
//! silently shifting every prediction.

use serde::{Deserialize, Serialize};

use super::PredictionError;

pub const SCHEMA_VERSION: u32 = 1;

pub const FEATURE_COUNT: usize = 8;
pub const TARGET_COUNT: usize = 8;

/// Input columns in the order the models consume them.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "m2_terreno",
    "cantidad_personas",
    "orientacion_2",
    "orientacion_3",
    "orientacion_4",
    "forma_terreno_angosto",
    "forma_terreno_cuadrado",
    "forma_terreno_irregular",
];

/// Regression outputs in the order the program model emits them.
pub const TARGET_COLUMNS: [&str; TARGET_COUNT] = [
    "cantidad_dormitorio",
    "cantidad_bano",
    "m2_cocina",
    "m2_estar_comedor",
    "m2_dormitorios_total",
    "m2_banos_total",
    "costo_estimado",
    "tiempo_meses",
];

/// Orientation encoded as all-zero indicators.
pub const ORIENTATION_REFERENCE: &str = "1";

/// Land shape encoded as all-zero indicators. Training data uses a shape
/// outside the three flagged ones as the dropped dummy column.
pub const LAND_SHAPE_REFERENCE: &str = "otro";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCategories {
    pub orientacion: String,
    pub forma_terreno: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub feature_columns: Vec<String>,
    pub reference_categories: ReferenceCategories,
}

impl FeatureSchema {
    /// Schema produced by this build's encoder.
    pub fn current() -> Self {
        Self {
            version: SCHEMA_VERSION,
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            reference_categories: ReferenceCategories {
                orientacion: ORIENTATION_REFERENCE.into(),
                forma_terreno: LAND_SHAPE_REFERENCE.into(),
            },
        }
    }

    pub fn width(&self) -> usize {
        self.feature_columns.len()
    }

    /// Checks that `self` (read from an artifact) matches what the encoder
    /// produces, naming the first difference.
    pub fn ensure_compatible(&self, expected: &FeatureSchema) -> Result<(), PredictionError> {
        if self.version != expected.version {
            return Err(PredictionError::SchemaMismatch(format!(
                "schema version {} does not match encoder version {}",
                self.version, expected.version
            )));
        }

        if self.width() != expected.width() {
            return Err(PredictionError::SchemaMismatch(format!(
                "model expects {} features, encoder produces {}",
                self.width(),
                expected.width()
            )));
        }

        if let Some((index, (found, wanted))) = self
            .feature_columns
            .iter()
            .zip(&expected.feature_columns)
            .enumerate()
            .find(|(_, (found, wanted))| found != wanted)
        {
            return Err(PredictionError::SchemaMismatch(format!(
                "feature column {index} is '{found}', encoder produces '{wanted}'"
            )));
        }

        if self.reference_categories != expected.reference_categories {
            return Err(PredictionError::SchemaMismatch(format!(
                "reference categories {:?} differ from encoder's {:?}",
                self.reference_categories, expected.reference_categories
            )));
        }

        Ok(())
    }
}

/// Checks the target list embedded in the program model.
pub fn ensure_target_columns(columns: &[String]) -> Result<(), PredictionError> {
    if columns.len() != TARGET_COUNT {
        return Err(PredictionError::SchemaMismatch(format!(
            "program model predicts {} targets, expected {}",
            columns.len(),
            TARGET_COUNT
        )));
    }

    for (index, (found, wanted)) in columns.iter().zip(TARGET_COLUMNS).enumerate() {
        if found != wanted {
            return Err(PredictionError::SchemaMismatch(format!(
                "target column {index} is '{found}', expected '{wanted}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_schema_is_compatible_with_itself() {
        let schema = FeatureSchema::current();
        assert!(schema.ensure_compatible(&FeatureSchema::current()).is_ok());
        assert_eq!(schema.width(), FEATURE_COUNT);
    }

    #[test]
    fn reordered_columns_are_rejected() {
        let mut schema = FeatureSchema::current();
        schema.feature_columns.swap(2, 3);

        let err = schema
            .ensure_compatible(&FeatureSchema::current())
            .unwrap_err();
        assert!(matches!(err, PredictionError::SchemaMismatch(_)));
        assert!(err.to_string().contains("orientacion_3"));
    }

    #[test]
    fn missing_column_is_rejected() {
        let mut schema = FeatureSchema::current();
        schema.feature_columns.pop();

        let err = schema
            .ensure_compatible(&FeatureSchema::current())
            .unwrap_err();
        assert!(err.to_string().contains("7 features"));
    }

    #[test]
    fn changed_reference_category_is_rejected() {
        let mut schema = FeatureSchema::current();
        schema.reference_categories.orientacion = "4".into();

        assert!(schema.ensure_compatible(&FeatureSchema::current()).is_err());
    }

    #[test]
    fn version_bump_is_rejected() {
        let mut schema = FeatureSchema::current();
        schema.version += 1;

        assert!(schema.ensure_compatible(&FeatureSchema::current()).is_err());
    }

    #[test]
    fn target_columns_must_match_formatter_order() {
        let targets: Vec<String> = TARGET_COLUMNS.iter().map(|c| c.to_string()).collect();
        assert!(ensure_target_columns(&targets).is_ok());

        let mut swapped = targets.clone();
        swapped.swap(6, 7);
        assert!(ensure_target_columns(&swapped).is_err());
        assert!(ensure_target_columns(&targets[..7]).is_err());
    }
}
