//! Loading and holding the two model artifacts.
//!
//! `model_program.json` and `model_layout.json` are JSON exports of the
//! trained forests. Both carry a header and a list of trees:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "schema": {
//!     "version": 1,
//!     "feature_columns": ["m2_terreno", "cantidad_personas",
//!                         "orientacion_2", "orientacion_3", "orientacion_4",
//!                         "forma_terreno_angosto", "forma_terreno_cuadrado",
//!                         "forma_terreno_irregular"],
//!     "reference_categories": { "orientacion": "1", "forma_terreno": "otro" }
//!   },
//!   "target_columns": ["cantidad_dormitorio", "cantidad_bano", "m2_cocina",
//!                      "m2_estar_comedor", "m2_dormitorios_total",
//!                      "m2_banos_total", "costo_estimado", "tiempo_meses"],
//!   "trees": [
//!     { "nodes": [
//!       { "split": { "feature": 0, "threshold": 150.0, "left": 1, "right": 2 } },
//!       { "leaf": { "value": [2.0, 1.0, 8.0, 22.0, 31.0, 10.0, 45000.0, 5.5] } },
//!       { "leaf": { "value": [3.0, 2.0, 12.0, 30.0, 48.0, 14.0, 78000.0, 8.0] } }
//!     ] }
//!   ]
//! }
//! ```
//!
//! The layout artifact replaces `target_columns` with `classes`, and its
//! leaves hold one probability per class in that order.
//!
//! A scikit-learn forest maps onto this node for node. For each fitted
//! estimator, walk `tree_` in index order. Node `i` is a leaf when
//! `children_left[i] == -1`. Its value is `value[i][:, 0]` for the
//! multi-output regressor, or `value[i][0]` normalised to sum to one for the
//! classifier, whose `classes_` becomes `classes`. Any other node is a split on
//! `feature[i]` at `threshold[i]`, with `left`/`right` set to
//! `children_left[i]`/`children_right[i]`. Samples go left when
//! `x <= threshold`, which is scikit-learn's rule. Node 0 is the root and
//! children always follow their parent.

use std::{fs, path::Path, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};

use super::{
    encoder::FeatureVector,
    forest::{ClassificationForest, RegressionForest, Tree},
    schema::{ensure_target_columns, FeatureSchema},
    PredictionError,
};

pub const PROGRAM_MODEL_FILE: &str = "model_program.json";
pub const LAYOUT_MODEL_FILE: &str = "model_layout.json";

const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// On-disk form of the multi-output program model. Leaves hold one value
/// per entry of `target_columns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramArtifact {
    pub format_version: u32,
    pub schema: FeatureSchema,
    pub target_columns: Vec<String>,
    pub trees: Vec<Tree>,
}

/// On-disk form of the floor-plan classifier. Leaves hold one probability
/// per entry of `classes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutArtifact {
    pub format_version: u32,
    pub schema: FeatureSchema,
    pub classes: Vec<String>,
    pub trees: Vec<Tree>,
}

fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read model artifact {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse model artifact {}", path.display()))
}

fn check_header(format_version: u32, schema: &FeatureSchema, name: &str) -> Result<()> {
    if format_version != ARTIFACT_FORMAT_VERSION {
        bail!(
            "{name} artifact format {format_version} is not supported (expected {ARTIFACT_FORMAT_VERSION})"
        );
    }
    schema
        .ensure_compatible(&FeatureSchema::current())
        .with_context(|| format!("{name} artifact was trained on a different feature schema"))
}

/// The program regressor and layout classifier, validated against the
/// encoder's schema.
#[derive(Debug)]
pub struct EstimatorModels {
    program: RegressionForest,
    layout: ClassificationForest,
}

impl EstimatorModels {
    pub fn from_artifacts(program: ProgramArtifact, layout: LayoutArtifact) -> Result<Self> {
        check_header(program.format_version, &program.schema, "program")?;
        ensure_target_columns(&program.target_columns)?;
        check_header(layout.format_version, &layout.schema, "layout")?;

        let width = program.schema.width();
        let program = RegressionForest::new(program.trees, width, program.target_columns.len())
            .map_err(|err| anyhow!("invalid program model: {err}"))?;
        let layout = ClassificationForest::new(layout.trees, layout.classes, width)
            .map_err(|err| anyhow!("invalid layout model: {err}"))?;

        Ok(Self { program, layout })
    }

    pub fn load(model_dir: &Path) -> Result<Self> {
        let program: ProgramArtifact = read_artifact(&model_dir.join(PROGRAM_MODEL_FILE))?;
        let layout: LayoutArtifact = read_artifact(&model_dir.join(LAYOUT_MODEL_FILE))?;
        Self::from_artifacts(program, layout)
    }

    pub fn predict_program(&self, features: &FeatureVector) -> Result<Vec<f64>, PredictionError> {
        #[cfg(test)]
        calls::record();
        self.program.predict(features.values())
    }

    pub fn predict_layout(&self, features: &FeatureVector) -> Result<String, PredictionError> {
        #[cfg(test)]
        calls::record();
        self.layout.predict(features.values()).map(str::to_string)
    }

    pub fn layout_classes(&self) -> &[String] {
        self.layout.classes()
    }
}

/// Process-wide model handle: either both models or the reason they are
/// missing. Decided once at startup.
#[derive(Debug, Clone)]
pub enum ModelRegistry {
    Ready(Arc<EstimatorModels>),
    Unavailable { reason: String },
}

impl ModelRegistry {
    pub fn load(model_dir: &Path) -> Self {
        match EstimatorModels::load(model_dir) {
            Ok(models) => {
                info!(
                    "Models loaded from {} ({} program trees, {} layout classes)",
                    model_dir.display(),
                    models.program.n_trees(),
                    models.layout_classes().len()
                );
                ModelRegistry::Ready(Arc::new(models))
            }
            Err(err) => {
                error!(
                    "Models unavailable from {}: {err:#}; prediction requests will fail until restart",
                    model_dir.display()
                );
                ModelRegistry::Unavailable {
                    reason: format!("{err:#}"),
                }
            }
        }
    }

    pub fn ready(models: EstimatorModels) -> Self {
        ModelRegistry::Ready(Arc::new(models))
    }

    pub fn models(&self) -> Result<&EstimatorModels, PredictionError> {
        match self {
            ModelRegistry::Ready(models) => Ok(models),
            ModelRegistry::Unavailable { reason } => {
                Err(PredictionError::ModelUnavailable(reason.clone()))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelRegistry::Ready(_))
    }
}

/// Per-thread count of model evaluations, for asserting that rejected
/// requests never reach a model.
#[cfg(test)]
pub(crate) mod calls {
    use std::cell::Cell;

    thread_local! {
        static MODEL_CALLS: Cell<usize> = const { Cell::new(0) };
    }

    pub fn record() {
        MODEL_CALLS.with(|calls| calls.set(calls.get() + 1));
    }

    pub fn reset() {
        MODEL_CALLS.with(|calls| calls.set(0));
    }

    pub fn count() -> usize {
        MODEL_CALLS.with(Cell::get)
    }
}
