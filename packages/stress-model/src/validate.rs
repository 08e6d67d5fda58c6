//! Feature Validation
//!
//! Turns an untyped JSON payload into a [`FeatureVector`], or a
//! [`ValidationError`] that can be shown to the caller as-is.
//!
//! Rules:
//! - the payload must be an object holding all five features
//! - every missing feature is reported at once
//! - values must be numbers or numeric strings, finite and non-negative
//! - advisory ranges are only logged, never enforced

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::types::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES, FEATURE_SPECS};

/// Validates a JSON value that should be a feature object.
pub fn validate_value(payload: &Value) -> Result<FeatureVector, ValidationError> {
    let object = payload.as_object().ok_or(ValidationError::NotAnObject)?;
    validate_features(object)
}

/// Validates a feature object and returns the values in training order.
pub fn validate_features(object: &Map<String, Value>) -> Result<FeatureVector, ValidationError> {
    let missing: Vec<&'static str> = FEATURE_NAMES
        .iter()
        .copied()
        .filter(|name| !object.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFeatures(missing));
    }

    let mut values = [0.0; FEATURE_COUNT];
    for (slot, spec) in values.iter_mut().zip(FEATURE_SPECS.iter()) {
        let raw = object.get(spec.name).unwrap_or(&Value::Null);
        let value = coerce_number(raw).ok_or(ValidationError::NotNumeric(spec.name))?;

        if !value.is_finite() {
            return Err(ValidationError::NonFinite(spec.name));
        }
        if value < 0.0 {
            return Err(ValidationError::Negative(spec.name));
        }
        if !spec.in_advisory_range(value) {
            tracing::debug!(
                feature = spec.name,
                value,
                min = spec.min,
                max = spec.max,
                "feature outside advisory range"
            );
        }

        *slot = value;
    }

    Ok(FeatureVector::from_array(values))
}

/// JSON numbers and numeric strings coerce; everything else does not.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
