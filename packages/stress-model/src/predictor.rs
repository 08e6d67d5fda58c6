//! Stress Predictor
//!
//! Wraps one [`StressClassifier`] chosen at startup and enforces the
//! prediction contract: validated input in, consistent
//! label / confidence / distribution out.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::classifier::StressClassifier;
use crate::error::{InferenceError, LoadError, PredictError, ValidationError};
use crate::forest::RandomForest;
use crate::mock::MockClassifier;
use crate::types::{FeatureVector, ModelStatus, PredictionResult, MAX_BATCH_SIZE};
use crate::validate::validate_value;

#[derive(Debug, Clone)]
pub struct PredictorConfig {
    pub model_path: PathBuf,
    /// Serve the mock classifier when the artifact cannot be loaded
    pub allow_mock: bool,
}

/// Result slot for one item of a batch request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Prediction(PredictionResult),
    Invalid { index: usize, error: String },
}

impl BatchOutcome {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}

pub struct StressPredictor {
    classifier: Box<dyn StressClassifier>,
    status: ModelStatus,
    model_path: Option<PathBuf>,
}

impl std::fmt::Debug for StressPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StressPredictor")
            .field("classifier", &self.classifier.name())
            .field("status", &self.status)
            .field("model_path", &self.model_path)
            .finish()
    }
}

impl StressPredictor {
    /// Loads the artifact at `config.model_path`.
    ///
    /// Falls back to the mock only when `config.allow_mock` is set; otherwise
    /// the load error is returned and the caller should refuse to serve.
    pub fn load(config: &PredictorConfig) -> Result<Self, LoadError> {
        match RandomForest::load(&config.model_path) {
            Ok(forest) => {
                tracing::info!(
                    path = %config.model_path.display(),
                    trees = forest.trees().len(),
                    "model loaded"
                );
                Ok(Self::with_forest(forest, &config.model_path))
            }
            Err(err) if config.allow_mock => {
                tracing::warn!(
                    path = %config.model_path.display(),
                    error = %err,
                    "model artifact unavailable, serving mock classifier"
                );
                Ok(Self::mock())
            }
            Err(err) => {
                tracing::error!(
                    path = %config.model_path.display(),
                    error = %err,
                    "model artifact unavailable and mock fallback disabled"
                );
                Err(err)
            }
        }
    }

    pub fn with_forest(forest: RandomForest, path: impl AsRef<Path>) -> Self {
        Self {
            classifier: Box::new(forest),
            status: ModelStatus::Loaded,
            model_path: Some(path.as_ref().to_path_buf()),
        }
    }

    pub fn mock() -> Self {
        Self::from_classifier(Box::new(MockClassifier::new()), ModelStatus::Mock)
    }

    pub fn from_classifier(classifier: Box<dyn StressClassifier>, status: ModelStatus) -> Self {
        Self {
            classifier,
            status,
            model_path: None,
        }
    }

    pub fn status(&self) -> ModelStatus {
        self.status
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult, InferenceError> {
        let raw = self.classifier.predict_proba(&features.to_array())?;
        PredictionResult::from_distribution(raw)
    }

    /// Validates a raw JSON payload, then predicts.
    pub fn predict_value(&self, payload: &Value) -> Result<PredictionResult, PredictError> {
        let features = validate_value(payload)?;
        Ok(self.predict(&features)?)
    }

    /// Predicts every item independently, preserving input order.
    ///
    /// The size bound is checked before any work. Items that fail validation
    /// become [`BatchOutcome::Invalid`] at their index; an inference failure
    /// on any item fails the whole batch.
    pub fn batch_predict(&self, items: &[Value]) -> Result<Vec<BatchOutcome>, PredictError> {
        if items.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }
        if items.len() > MAX_BATCH_SIZE {
            return Err(ValidationError::BatchTooLarge { len: items.len() }.into());
        }

        let mut outcomes = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let outcome = match self.predict_value(item) {
                Ok(result) => BatchOutcome::Prediction(result),
                Err(PredictError::Validation(err)) => BatchOutcome::Invalid {
                    index,
                    error: err.to_string(),
                },
                Err(err @ PredictError::Inference(_)) => return Err(err),
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StressLevel, CLASS_COUNT, FEATURE_COUNT, PROBABILITY_TOLERANCE};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn assert_consistent(result: &PredictionResult) {
        let p = result.probabilities;
        assert!((p.total() - 1.0).abs() < PROBABILITY_TOLERANCE);
        assert_eq!(result.confidence, p.get(result.stress_level));
        for level in StressLevel::ALL {
            assert!(p.get(level) <= result.confidence);
        }
    }

    #[test]
    fn test_calm_input_is_low() {
        let predictor = StressPredictor::mock();
        let result = predictor
            .predict_value(&json!({"heart_rate": 70, "ecg": 0.3, "emg": 0.2, "gsr": 0.1, "resp": 0.3}))
            .unwrap();
        assert_eq!(result.stress_level, StressLevel::Low);
        assert!(result.confidence > 0.5);
        assert_consistent(&result);
    }

    #[test]
    fn test_aroused_input_is_high() {
        let predictor = StressPredictor::mock();
        let result = predictor
            .predict_value(&json!({"heart_rate": 110, "ecg": 0.8, "emg": 0.7, "gsr": 0.6, "resp": 0.7}))
            .unwrap();
        assert_eq!(result.stress_level, StressLevel::High);
        assert_consistent(&result);
    }

    #[test]
    fn test_missing_fields_are_validation_errors() {
        let predictor = StressPredictor::mock();
        let err = predictor
            .predict_value(&json!({"heart_rate": 70, "ecg": 0.3, "emg": 0.2}))
            .unwrap_err();
        match err {
            PredictError::Validation(ValidationError::MissingFeatures(missing)) => {
                assert_eq!(missing, vec!["gsr", "resp"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_predict_is_idempotent() {
        let predictor = StressPredictor::mock();
        let payload = json!({"heart_rate": 88, "ecg": 0.45, "emg": 0.5, "gsr": 0.4, "resp": 0.55});
        assert_eq!(
            predictor.predict_value(&payload).unwrap(),
            predictor.predict_value(&payload).unwrap()
        );
    }

    #[test]
    fn test_batch_preserves_order() {
        let predictor = StressPredictor::mock();
        let items = vec![
            json!({"heart_rate": 70, "ecg": 0.3, "emg": 0.2, "gsr": 0.1, "resp": 0.3}),
            json!({"heart_rate": 110, "ecg": 0.8, "emg": 0.7, "gsr": 0.6, "resp": 0.7}),
            json!({"heart_rate": 90, "ecg": 0.5, "emg": 0.5, "gsr": 0.5, "resp": 0.5}),
        ];
        let outcomes = predictor.batch_predict(&items).unwrap();
        assert_eq!(outcomes.len(), 3);

        let levels: Vec<StressLevel> = outcomes
            .iter()
            .map(|o| match o {
                BatchOutcome::Prediction(r) => {
                    assert_consistent(r);
                    r.stress_level
                }
                BatchOutcome::Invalid { .. } => panic!("unexpected invalid item"),
            })
            .collect();
        assert_eq!(
            levels,
            vec![StressLevel::Low, StressLevel::High, StressLevel::Medium]
        );
    }

    #[test]
    fn test_batch_marks_invalid_item_only() {
        let predictor = StressPredictor::mock();
        let good = json!({"heart_rate": 70, "ecg": 0.3, "emg": 0.2, "gsr": 0.1, "resp": 0.3});
        let items = vec![good.clone(), json!({"heart_rate": 70}), good.clone()];

        let outcomes = predictor.batch_predict(&items).unwrap();
        assert!(!outcomes[0].is_invalid());
        assert!(!outcomes[2].is_invalid());
        match &outcomes[1] {
            BatchOutcome::Invalid { index, error } => {
                assert_eq!(*index, 1);
                assert!(error.contains("ecg"));
            }
            other => panic!("expected invalid marker, got {other:?}"),
        }
        assert_eq!(outcomes[0], outcomes[2]);
    }

    #[test]
    fn test_batch_bounds_checked_before_work() {
        struct Counting(AtomicUsize);
        impl StressClassifier for Counting {
            fn name(&self) -> &'static str {
                "counting"
            }
            fn predict_proba(
                &self,
                _: &[f64; FEATURE_COUNT],
            ) -> Result<[f64; CLASS_COUNT], InferenceError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok([1.0, 0.0, 0.0])
            }
        }

        let classifier = std::sync::Arc::new(Counting(AtomicUsize::new(0)));
        struct Shared(std::sync::Arc<Counting>);
        impl StressClassifier for Shared {
            fn name(&self) -> &'static str {
                self.0.name()
            }
            fn predict_proba(
                &self,
                x: &[f64; FEATURE_COUNT],
            ) -> Result<[f64; CLASS_COUNT], InferenceError> {
                self.0.predict_proba(x)
            }
        }
        let predictor = StressPredictor::from_classifier(
            Box::new(Shared(classifier.clone())),
            ModelStatus::Mock,
        );

        let item = json!({"heart_rate": 75, "ecg": 0.5, "emg": 0.3, "gsr": 0.2, "resp": 0.4});
        let items = vec![item; MAX_BATCH_SIZE + 1];
        let err = predictor.batch_predict(&items).unwrap_err();
        assert_eq!(
            err,
            PredictError::Validation(ValidationError::BatchTooLarge { len: 101 })
        );
        assert_eq!(classifier.0.load(Ordering::SeqCst), 0);

        assert_eq!(
            predictor.batch_predict(&[]).unwrap_err(),
            PredictError::Validation(ValidationError::EmptyBatch)
        );
    }

    #[test]
    fn test_inference_failure_fails_batch() {
        struct Broken;
        impl StressClassifier for Broken {
            fn name(&self) -> &'static str {
                "broken"
            }
            fn predict_proba(
                &self,
                _: &[f64; FEATURE_COUNT],
            ) -> Result<[f64; CLASS_COUNT], InferenceError> {
                Ok([f64::NAN, 0.0, 0.0])
            }
        }

        let predictor = StressPredictor::from_classifier(Box::new(Broken), ModelStatus::Loaded);
        let item = json!({"heart_rate": 75, "ecg": 0.5, "emg": 0.3, "gsr": 0.2, "resp": 0.4});
        assert!(matches!(
            predictor.batch_predict(&[item]).unwrap_err(),
            PredictError::Inference(_)
        ));
    }

    #[test]
    fn test_load_falls_back_to_mock_only_when_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("missing.json");

        let lenient = PredictorConfig {
            model_path: model_path.clone(),
            allow_mock: true,
        };
        let predictor = StressPredictor::load(&lenient).unwrap();
        assert_eq!(predictor.status(), ModelStatus::Mock);

        let strict = PredictorConfig {
            model_path,
            allow_mock: false,
        };
        assert!(matches!(
            StressPredictor::load(&strict).unwrap_err(),
            LoadError::NotFound(_)
        ));
    }

    #[test]
    fn test_corrupt_artifact_is_not_silently_mocked() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        std::fs::write(&model_path, "garbage").unwrap();

        let strict = PredictorConfig {
            model_path,
            allow_mock: false,
        };
        assert!(matches!(
            StressPredictor::load(&strict).unwrap_err(),
            LoadError::Decode(_)
        ));
    }
}
