//! Classification metrics for held-out evaluation.

use std::fmt;

use serde::Serialize;

use super::dataset::Dataset;
use crate::classifier::StressClassifier;
use crate::error::InferenceError;
use crate::types::{PredictionResult, StressLevel, CLASS_COUNT};

/// Rows are true classes, columns are predicted classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix(pub [[usize; CLASS_COUNT]; CLASS_COUNT]);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    /// Support-weighted averages over classes
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub per_class: [ClassMetrics; CLASS_COUNT],
    pub confusion: ConfusionMatrix,
}

/// Scores predictions against ground truth. Undefined ratios count as 0.
pub fn evaluate(truth: &[StressLevel], predicted: &[StressLevel]) -> EvaluationReport {
    let mut matrix = [[0usize; CLASS_COUNT]; CLASS_COUNT];
    for (t, p) in truth.iter().zip(predicted) {
        matrix[t.index()][p.index()] += 1;
    }

    let total = truth.len().min(predicted.len());
    let correct: usize = (0..CLASS_COUNT).map(|c| matrix[c][c]).sum();

    let per_class: [ClassMetrics; CLASS_COUNT] = std::array::from_fn(|c| {
        let tp = matrix[c][c] as f64;
        let support: usize = matrix[c].iter().sum();
        let predicted_c: usize = (0..CLASS_COUNT).map(|r| matrix[r][c]).sum();

        let precision = ratio(tp, predicted_c as f64);
        let recall = ratio(tp, support as f64);
        let f1 = ratio(2.0 * precision * recall, precision + recall);

        ClassMetrics {
            precision,
            recall,
            f1,
            support,
        }
    });

    let weighted = |metric: fn(&ClassMetrics) -> f64| {
        let sum: f64 = per_class
            .iter()
            .map(|m| metric(m) * m.support as f64)
            .sum();
        ratio(sum, total as f64)
    };

    EvaluationReport {
        accuracy: ratio(correct as f64, total as f64),
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1: weighted(|m| m.f1),
        per_class,
        confusion: ConfusionMatrix(matrix),
    }
}

/// Runs `classifier` over `dataset` and scores the argmax labels.
pub fn evaluate_classifier(
    classifier: &dyn StressClassifier,
    dataset: &Dataset,
) -> Result<EvaluationReport, InferenceError> {
    let predicted = dataset
        .features
        .iter()
        .map(|x| {
            classifier
                .predict_proba(x)
                .and_then(PredictionResult::from_distribution)
                .map(|r| r.stress_level)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(evaluate(&dataset.labels, &predicted))
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for level in StressLevel::ALL {
            write!(f, "{:>8}", level.as_str())?;
        }
        for (level, row) in StressLevel::ALL.iter().zip(self.0.iter()) {
            writeln!(f)?;
            write!(f, "{:>8}", level.as_str())?;
            for count in row {
                write!(f, "{count:>8}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12}{:>11}{:>9}{:>10}{:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (level, m) in StressLevel::ALL.iter().zip(self.per_class.iter()) {
            writeln!(
                f,
                "{:>12}{:>11.4}{:>9.4}{:>10.4}{:>9}",
                level.as_str(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        let support: usize = self.per_class.iter().map(|m| m.support).sum();
        writeln!(f, "{:>12}{:>39.4}", "accuracy", self.accuracy)?;
        write!(
            f,
            "{:>12}{:>11.4}{:>9.4}{:>10.4}{:>9}",
            "weighted", self.precision, self.recall, self.f1, support
        )
    }
}
