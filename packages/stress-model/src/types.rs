//! Common Types and Constants
//!
//! Shared data structures used by the validator, the classifiers and the
//! training pipeline.

use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

// ==================== Constants ====================

/// Number of physiological inputs per sample
pub const FEATURE_COUNT: usize = 5;

/// Number of stress classes
pub const CLASS_COUNT: usize = 3;

/// Feature names in the order the classifiers consume them
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = ["heart_rate", "ecg", "emg", "gsr", "resp"];

/// Upper bound on items per batch request
pub const MAX_BATCH_SIZE: usize = 100;

/// Allowed drift of a probability distribution's total from 1.0
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-12;

// ==================== Stress Level ====================

/// Discrete stress category. Variant order is the class index order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

impl StressLevel {
    pub const ALL: [StressLevel; CLASS_COUNT] =
        [StressLevel::Low, StressLevel::Medium, StressLevel::High];

    pub fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Accepts either the class name or its numeric index.
    pub fn parse_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" | "0" => Some(Self::Low),
            "medium" | "1" => Some(Self::Medium),
            "high" | "2" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Features ====================

/// Validated physiological measurements for one prediction
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Beats per minute
    pub heart_rate: f64,
    /// Normalized ECG signal
    pub ecg: f64,
    /// Normalized EMG signal
    pub emg: f64,
    /// Normalized galvanic skin response
    pub gsr: f64,
    /// Normalized respiration signal
    pub resp: f64,
}

impl FeatureVector {
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        let [heart_rate, ecg, emg, gsr, resp] = values;
        Self {
            heart_rate,
            ecg,
            emg,
            gsr,
            resp,
        }
    }

    /// Values in [`FEATURE_NAMES`] order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [self.heart_rate, self.ecg, self.emg, self.gsr, self.resp]
    }
}

/// Static description of one input feature
#[derive(Clone, Copy, Debug, Serialize)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    /// Advisory lower bound, not enforced
    pub min: f64,
    /// Advisory upper bound, not enforced
    pub max: f64,
}

impl FeatureSpec {
    pub fn in_advisory_range(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const FEATURE_SPECS: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec {
        name: "heart_rate",
        description: "Heart rate in beats per minute (40-200)",
        unit: "bpm",
        min: 40.0,
        max: 200.0,
    },
    FeatureSpec {
        name: "ecg",
        description: "ECG signal normalized (0-1)",
        unit: "normalized",
        min: 0.0,
        max: 1.0,
    },
    FeatureSpec {
        name: "emg",
        description: "EMG signal normalized (0-1)",
        unit: "normalized",
        min: 0.0,
        max: 1.0,
    },
    FeatureSpec {
        name: "gsr",
        description: "Galvanic Skin Response normalized (0-1)",
        unit: "normalized",
        min: 0.0,
        max: 1.0,
    },
    FeatureSpec {
        name: "resp",
        description: "Respiration signal normalized (0-1)",
        unit: "normalized",
        min: 0.0,
        max: 1.0,
    },
];

// ==================== Prediction ====================

/// Per-class probabilities, serialized in class order
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Probabilities {
    pub fn from_array(values: [f64; CLASS_COUNT]) -> Self {
        let [low, medium, high] = values;
        Self { low, medium, high }
    }

    pub fn to_array(&self) -> [f64; CLASS_COUNT] {
        [self.low, self.medium, self.high]
    }

    pub fn get(&self, level: StressLevel) -> f64 {
        match level {
            StressLevel::Low => self.low,
            StressLevel::Medium => self.medium,
            StressLevel::High => self.high,
        }
    }

    pub fn total(&self) -> f64 {
        self.low + self.medium + self.high
    }
}

/// Classifier output for one feature vector.
///
/// `stress_level` is always the argmax of `probabilities` and `confidence`
/// is exactly that class's probability.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub stress_level: StressLevel,
    pub confidence: f64,
    pub probabilities: Probabilities,
}

impl PredictionResult {
    /// Normalizes a raw class distribution and derives label and confidence.
    pub fn from_distribution(raw: [f64; CLASS_COUNT]) -> Result<Self, InferenceError> {
        if raw.iter().any(|p| !p.is_finite()) {
            return Err(InferenceError::new("classifier produced a non-finite probability"));
        }
        if raw.iter().any(|&p| p < 0.0) {
            return Err(InferenceError::new("classifier produced a negative probability"));
        }

        let total: f64 = raw.iter().sum();
        if total <= EPSILON {
            return Err(InferenceError::new("classifier produced an empty distribution"));
        }

        let normalized = raw.map(|p| p / total);

        // strict comparison keeps the lower class on ties
        let mut best = 0;
        for (idx, &p) in normalized.iter().enumerate().skip(1) {
            if p > normalized[best] {
                best = idx;
            }
        }

        let stress_level = StressLevel::from_index(best)
            .ok_or_else(|| InferenceError::new("class index out of range"))?;

        Ok(Self {
            stress_level,
            confidence: normalized[best],
            probabilities: Probabilities::from_array(normalized),
        })
    }
}

/// Which classifier backs the predictor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// Trained artifact loaded from disk
    Loaded,
    /// Deterministic fallback classifier
    Mock,
}

impl ModelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Mock => "mock",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stress_level_index_roundtrip() {
        for level in StressLevel::ALL {
            assert_eq!(StressLevel::from_index(level.index()), Some(level));
        }
        assert_eq!(StressLevel::from_index(3), None);
    }

    #[test]
    fn test_parse_label_accepts_names_and_indices() {
        assert_eq!(StressLevel::parse_label("High"), Some(StressLevel::High));
        assert_eq!(StressLevel::parse_label(" 1 "), Some(StressLevel::Medium));
        assert_eq!(StressLevel::parse_label("extreme"), None);
    }

    #[test]
    fn test_feature_vector_order_matches_names() {
        let v = FeatureVector::from_array([70.0, 0.1, 0.2, 0.3, 0.4]);
        assert_eq!(v.heart_rate, 70.0);
        assert_eq!(v.resp, 0.4);
        assert_eq!(v.to_array(), [70.0, 0.1, 0.2, 0.3, 0.4]);

        for (spec, name) in FEATURE_SPECS.iter().zip(FEATURE_NAMES) {
            assert_eq!(spec.name, name);
        }
    }

    #[test]
    fn test_from_distribution_normalizes() {
        let result = PredictionResult::from_distribution([2.0, 1.0, 1.0]).unwrap();
        assert_eq!(result.stress_level, StressLevel::Low);
        assert!((result.confidence - 0.5).abs() < 1e-12);
        assert!((result.probabilities.total() - 1.0).abs() < PROBABILITY_TOLERANCE);
    }

    #[test]
    fn test_from_distribution_tie_prefers_lower_class() {
        let result = PredictionResult::from_distribution([0.2, 0.4, 0.4]).unwrap();
        assert_eq!(result.stress_level, StressLevel::Medium);
        assert_eq!(result.confidence, result.probabilities.medium);
    }

    #[test]
    fn test_from_distribution_rejects_invalid_output() {
        assert!(PredictionResult::from_distribution([f64::NAN, 0.5, 0.5]).is_err());
        assert!(PredictionResult::from_distribution([-0.1, 0.6, 0.5]).is_err());
        assert!(PredictionResult::from_distribution([0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_prediction_serializes_lowercase_label() {
        let result = PredictionResult::from_distribution([0.1, 0.2, 0.7]).unwrap();
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["stress_level"], "high");
        assert!(json["probabilities"]["medium"].is_number());
    }
}
