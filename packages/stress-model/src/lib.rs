//! # stress-model - Stress Level Classification
//!
//! Pure Rust core of the stress prediction service:
//!
//! - **Validation** - turns loosely typed JSON into a checked feature vector
//! - **Random Forest** - inference over a trained artifact loaded from disk
//! - **Mock classifier** - deterministic fallback when no artifact is present
//! - **Training** - CSV loading, preprocessing, forest fitting and evaluation
//!
//! ## Modules
//!
//! - [`types`] - feature vector, stress levels, prediction results, constants
//! - [`error`] - validation / load / inference errors
//! - [`validate`] - feature presence, numeric coercion, range checks
//! - [`classifier`] - the capability every classifier provides
//! - [`forest`] - flat-arena decision trees and the JSON artifact format
//! - [`mock`] - prototype-distance softmax classifier
//! - [`predictor`] - single and batch prediction over one classifier
//! - [`train`] - offline training pipeline used by `stress-train`
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use stress_model::{StressLevel, StressPredictor};
//!
//! let predictor = StressPredictor::mock();
//! let result = predictor
//!     .predict_value(&json!({
//!         "heart_rate": 62, "ecg": 0.15, "emg": 0.12, "gsr": 0.2, "resp": 0.18
//!     }))
//!     .unwrap();
//!
//! assert_eq!(result.stress_level, StressLevel::Low);
//! assert!((result.probabilities.total() - 1.0).abs() < 1e-6);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod classifier;
pub mod error;
pub mod forest;
pub mod mock;
pub mod predictor;
pub mod train;
pub mod types;
pub mod validate;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use classifier::StressClassifier;
pub use error::{InferenceError, LoadError, PredictError, ValidationError};
pub use forest::{DecisionTree, ForestMetadata, Node, RandomForest};
pub use mock::MockClassifier;
pub use predictor::{BatchOutcome, PredictorConfig, StressPredictor};
pub use validate::{validate_features, validate_value};
