//! Raw request → model feature vector.

use log::warn;
use serde_json::{Map, Value};

use super::{
    schema::{FEATURE_COLUMNS, FEATURE_COUNT},
    PredictionError,
};

pub const FIELD_LAND_AREA: &str = "m2_terreno";
pub const FIELD_OCCUPANTS: &str = "cantidad_personas";
pub const FIELD_ORIENTATION: &str = "orientacion";
pub const FIELD_LAND_SHAPE: &str = "forma_terreno";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Reference category, also used for values outside 1..=4.
    One,
    Two,
    Three,
    Four,
}

impl Orientation {
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => Orientation::Two,
            3 => Orientation::Three,
            4 => Orientation::Four,
            1 => Orientation::One,
            other => {
                warn!("Orientation {other} outside 1..=4; encoding as reference");
                Orientation::One
            }
        }
    }

    /// Indicator triple for orientations 2, 3 and 4.
    fn indicators(self) -> [f64; 3] {
        match self {
            Orientation::One => [0.0, 0.0, 0.0],
            Orientation::Two => [1.0, 0.0, 0.0],
            Orientation::Three => [0.0, 1.0, 0.0],
            Orientation::Four => [0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandShape {
    Angosto,
    Cuadrado,
    Irregular,
    /// Reference category: any shape the models have no column for.
    Other,
}

impl LandShape {
    pub fn from_label(label: &str) -> Self {
        match label {
            "angosto" => LandShape::Angosto,
            "cuadrado" => LandShape::Cuadrado,
            "irregular" => LandShape::Irregular,
            _ => LandShape::Other,
        }
    }

    fn indicators(self) -> [f64; 3] {
        match self {
            LandShape::Angosto => [1.0, 0.0, 0.0],
            LandShape::Cuadrado => [0.0, 1.0, 0.0],
            LandShape::Irregular => [0.0, 0.0, 1.0],
            LandShape::Other => [0.0, 0.0, 0.0],
        }
    }
}

/// Parameters a user submits for one estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationRequest {
    pub land_area_m2: i64,
    pub occupant_count: i64,
    pub orientation_code: i64,
    pub land_shape: String,
}

impl EstimationRequest {
    /// Extracts the four inputs from a decoded JSON body.
    pub fn from_json(body: &Value) -> Result<Self, PredictionError> {
        let object = body
            .as_object()
            .ok_or_else(|| PredictionError::malformed("body", "expected a JSON object"))?;

        let land_area_m2 = integer_field(object, FIELD_LAND_AREA)?;
        let occupant_count = integer_field(object, FIELD_OCCUPANTS)?;
        let orientation_code = integer_field(object, FIELD_ORIENTATION)?;

        // Non-string shapes cannot match a flagged category.
        let land_shape = match required(object, FIELD_LAND_SHAPE)? {
            Value::String(shape) => shape.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };

        Ok(Self {
            land_area_m2,
            occupant_count,
            orientation_code,
            land_shape,
        })
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_code(self.orientation_code)
    }

    pub fn shape(&self) -> LandShape {
        LandShape::from_label(&self.land_shape)
    }
}

/// One row of model input, ordered as [`FEATURE_COLUMNS`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &FEATURE_COLUMNS
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        FEATURE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|index| self.values[index])
    }
}

pub fn encode(request: &EstimationRequest) -> FeatureVector {
    let orientation = request.orientation().indicators();
    let shape = request.shape().indicators();

    FeatureVector {
        values: [
            request.land_area_m2 as f64,
            request.occupant_count as f64,
            orientation[0],
            orientation[1],
            orientation[2],
            shape[0],
            shape[1],
            shape[2],
        ],
    }
}

pub(crate) fn required<'a>(
    object: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a Value, PredictionError> {
    object
        .get(field)
        .ok_or_else(|| PredictionError::missing(field))
}

/// Integer with the same leniency as the form posts it replaces: integral
/// numbers pass, floats truncate toward zero, numeric strings are parsed.
pub(crate) fn integer_field(
    object: &Map<String, Value>,
    field: &str,
) -> Result<i64, PredictionError> {
    match required(object, field)? {
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(value)
            } else if let Some(value) = number.as_f64() {
                if value.is_finite() && value.abs() < i64::MAX as f64 {
                    Ok(value.trunc() as i64)
                } else {
                    Err(PredictionError::malformed(field, "number out of range"))
                }
            } else {
                Err(PredictionError::malformed(field, "number out of range"))
            }
        }
        Value::String(raw) => raw.trim().parse::<i64>().map_err(|_| {
            PredictionError::malformed(field, format!("'{raw}' is not an integer"))
        }),
        other => Err(PredictionError::malformed(
            field,
            format!("expected an integer, got {other}"),
        )),
    }
}
