//! Mock Classifier
//!
//! Fallback used when no trained artifact is available. Each class has a
//! fixed prototype; the distribution is a softmax over negative squared
//! distances to the prototypes in normalized feature space. The output is
//! fully deterministic and well formed, which keeps the API usable and
//! testable without a trained model.

use crate::classifier::StressClassifier;
use crate::error::InferenceError;
use crate::types::{CLASS_COUNT, FEATURE_COUNT};

/// Class prototypes in raw units: heart rate (bpm) then four normalized signals.
pub const CLASS_PROTOTYPES: [[f64; FEATURE_COUNT]; CLASS_COUNT] = [
    [65.0, 0.2, 0.2, 0.2, 0.2],
    [90.0, 0.5, 0.5, 0.5, 0.5],
    [120.0, 0.8, 0.8, 0.8, 0.8],
];

/// Heart rate is mapped onto [0, 1] over its advisory range
const HEART_RATE_OFFSET: f64 = 40.0;
const HEART_RATE_SPAN: f64 = 160.0;

const DEFAULT_TEMPERATURE: f64 = 0.1;

/// Cap on normalized inputs so squared distances stay finite
const MAX_NORMALIZED: f64 = 1e6;

#[derive(Debug, Clone)]
pub struct MockClassifier {
    prototypes: [[f64; FEATURE_COUNT]; CLASS_COUNT],
    temperature: f64,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            prototypes: CLASS_PROTOTYPES.map(|p| normalize(&p)),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StressClassifier for MockClassifier {
    fn name(&self) -> &'static str {
        "mock-prototype"
    }

    fn predict_proba(
        &self,
        features: &[f64; FEATURE_COUNT],
    ) -> Result<[f64; CLASS_COUNT], InferenceError> {
        let x = normalize(features);

        let logits = self.prototypes.map(|proto| {
            let dist_sq: f64 = proto.iter().zip(x.iter()).map(|(p, v)| (p - v).powi(2)).sum();
            -dist_sq / self.temperature
        });
        if logits.iter().any(|l| l.is_nan()) {
            return Err(InferenceError::new("mock classifier received non-finite input"));
        }

        // shift by the max logit so the largest term is exp(0)
        let max_logit = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights = logits.map(|l| (l - max_logit).exp());
        let total: f64 = weights.iter().sum();

        Ok(weights.map(|w| w / total))
    }
}

fn normalize(features: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
    let mut out = *features;
    out[0] = (features[0] - HEART_RATE_OFFSET) / HEART_RATE_SPAN;
    out.map(|v| v.clamp(-MAX_NORMALIZED, MAX_NORMALIZED))
}
