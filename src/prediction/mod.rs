pub mod encoder;
mod error;
pub mod forest;
pub mod formatter;
pub mod handlers;
pub mod registry;
pub mod schema;

use log::debug;
use serde_json::Value;

use crate::log_payload;

pub use encoder::{encode, EstimationRequest, FeatureVector, LandShape, Orientation};
pub use error::PredictionError;
pub use formatter::{format, EstimationResult};
pub use registry::{EstimatorModels, ModelRegistry};

const LOG_PAYLOADS: bool = true;

/// Runs one request through both models.
///
/// An unavailable registry is reported before the body is inspected, and a
/// request with bad inputs never reaches the models.
pub fn estimate(registry: &ModelRegistry, body: &Value) -> Result<EstimationResult, PredictionError> {
    let models = registry.models()?;

    log_payload!("Estimate request: {body}");
    let request = EstimationRequest::from_json(body)?;
    let features = encode(&request);
    debug!(
        "Encoded features {:?} -> {:?}",
        features.columns(),
        features.values()
    );

    let program = models.predict_program(&features)?;
    let layout_key = models.predict_layout(&features)?;

    let result = format(&program, &layout_key)?;
    log_payload!("Estimate response: {result:?}");
    Ok(result)
}
