use std::path::PathBuf;

use thiserror::Error;

use crate::types::MAX_BATCH_SIZE;

/// Client-caused input problems. Messages are safe to return to callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Request body must be a JSON object")]
    NotAnObject,
    #[error("Missing features: {}", .0.join(", "))]
    MissingFeatures(Vec<&'static str>),
    #[error("Feature '{0}' must be a number")]
    NotNumeric(&'static str),
    #[error("Feature '{0}' must be a finite number")]
    NonFinite(&'static str),
    #[error("Feature '{0}' must be non-negative")]
    Negative(&'static str),
    #[error("Data list cannot be empty")]
    EmptyBatch,
    #[error("Batch size limited to {} predictions", MAX_BATCH_SIZE)]
    BatchTooLarge { len: usize },
}

/// The model artifact could not be used.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model artifact not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode model artifact: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid model artifact: {0}")]
    Invalid(String),
}

/// Unexpected failure while evaluating a classifier on valid input.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("inference failed: {message}")]
pub struct InferenceError {
    message: String,
}

impl InferenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}
