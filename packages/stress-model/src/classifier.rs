use crate::error::InferenceError;
use crate::types::{CLASS_COUNT, FEATURE_COUNT};

/// Capability shared by the trained forest and the mock: map an ordered
/// feature array to an unnormalized class distribution.
///
/// Implementations must be read-only so one instance can serve concurrent
/// requests without locking.
pub trait StressClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn predict_proba(
        &self,
        features: &[f64; FEATURE_COUNT],
    ) -> Result<[f64; CLASS_COUNT], InferenceError>;
}
