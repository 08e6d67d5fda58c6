//! Random Forest Training
//!
//! Offline pipeline that produces the artifact the service loads:
//!
//! - [`dataset`] - CSV loading, synthetic data, missing values, outliers, splits
//! - [`metrics`] - accuracy, weighted precision / recall / F1, confusion matrix
//! - bootstrap + CART trees grown in parallel with rayon
//!
//! Every tree draws from its own `ChaCha8Rng` seeded with `seed + tree_index`,
//! so a given seed yields the same forest regardless of thread count.

pub mod dataset;
pub mod metrics;

mod cart;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use thiserror::Error;

use crate::forest::{ForestMetadata, RandomForest};
use crate::types::{CLASS_COUNT, FEATURE_COUNT};

pub use dataset::{Dataset, DatasetError, MissingStrategy};
pub use metrics::{evaluate, evaluate_classifier, ClassMetrics, ConfusionMatrix, EvaluationReport};

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split
    pub max_features: usize,
    /// Reweight classes inversely to their frequency
    pub balanced_class_weight: bool,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
            // floor(sqrt(FEATURE_COUNT))
            max_features: 2,
            balanced_class_weight: true,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.n_estimators == 0 {
            return Err(TrainError::InvalidParams("n_estimators must be at least 1"));
        }
        if self.min_samples_split < 2 {
            return Err(TrainError::InvalidParams("min_samples_split must be at least 2"));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainError::InvalidParams("min_samples_leaf must be at least 1"));
        }
        if self.max_features == 0 || self.max_features > FEATURE_COUNT {
            return Err(TrainError::InvalidParams("max_features must be within 1..=5"));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TrainError {
    #[error("invalid parameters: {0}")]
    InvalidParams(&'static str),
    #[error("training set is empty")]
    EmptyDataset,
    #[error("training set has missing or non-finite values; run handle_missing first")]
    MissingValues,
}

/// Fits a forest on `dataset`.
pub fn train_forest(dataset: &Dataset, params: &ForestParams) -> Result<RandomForest, TrainError> {
    params.validate()?;
    if dataset.is_empty() {
        return Err(TrainError::EmptyDataset);
    }
    if dataset.has_missing() {
        return Err(TrainError::MissingValues);
    }

    let n = dataset.len();
    let labels: Vec<usize> = dataset.labels.iter().map(|l| l.index()).collect();
    let class_weight = class_weights(dataset.class_counts(), params.balanced_class_weight);

    tracing::debug!(
        samples = n,
        trees = params.n_estimators,
        ?class_weight,
        "growing forest"
    );

    let grown: Vec<_> = (0..params.n_estimators)
        .into_par_iter()
        .map(|tree_index| {
            let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(tree_index as u64));

            let mut counts = vec![0u32; n];
            if params.bootstrap {
                for _ in 0..n {
                    counts[rng.gen_range(0..n)] += 1;
                }
            } else {
                counts.fill(1);
            }

            let weights: Vec<f64> = counts
                .iter()
                .zip(&labels)
                .map(|(&c, &label)| c as f64 * class_weight[label])
                .collect();
            let mut indices: Vec<usize> = (0..n).filter(|&i| counts[i] > 0).collect();

            cart::TreeBuilder::new(&dataset.features, &labels, &weights, params, rng)
                .grow(&mut indices)
        })
        .collect();

    let mut feature_importances = [0.0; FEATURE_COUNT];
    for (_, importances) in &grown {
        for (acc, v) in feature_importances.iter_mut().zip(importances) {
            *acc += v / params.n_estimators as f64;
        }
    }

    let metadata = ForestMetadata {
        n_estimators: params.n_estimators,
        max_depth: params.max_depth,
        min_samples_split: params.min_samples_split,
        min_samples_leaf: params.min_samples_leaf,
        seed: params.seed,
        train_samples: n,
        feature_importances,
        test_accuracy: None,
    };
    let trees = grown.into_iter().map(|(tree, _)| tree).collect();

    Ok(RandomForest::from_trained(trees, metadata))
}

/// `n / (k * n_c)` for each of the k present classes, or all ones.
fn class_weights(counts: [usize; CLASS_COUNT], balanced: bool) -> [f64; CLASS_COUNT] {
    if !balanced {
        return [1.0; CLASS_COUNT];
    }
    let n: usize = counts.iter().sum();
    let present = counts.iter().filter(|&&c| c > 0).count();
    counts.map(|c| {
        if c == 0 {
            0.0
        } else {
            n as f64 / (present as f64 * c as f64)
        }
    })
}
