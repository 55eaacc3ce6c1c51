use thiserror::Error;

/// Failures of the encode → predict → format pipeline.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// A required request field is absent.
    #[error("missing input field: {field}")]
    MissingField { field: String },

    /// A request field is present but cannot be interpreted.
    #[error("malformed input field {field}: {reason}")]
    MalformedInput { field: String, reason: String },

    /// Model artifacts failed to load at startup.
    #[error("models are not loaded: {0}")]
    ModelUnavailable(String),

    /// Encoder output and model expectations disagree.
    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The program model returned fewer values than the formatter reads.
    #[error("model returned {actual} predictions, expected at least {expected}")]
    InsufficientOutput { expected: usize, actual: usize },
}

impl PredictionError {
    pub fn missing(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }

    pub fn malformed(field: &str, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the caller can fix the request and try again.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PredictionError::MissingField { .. } | PredictionError::MalformedInput { .. }
        )
    }
}
