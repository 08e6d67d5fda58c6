//! CART tree growth with weighted Gini impurity.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::ForestParams;
use crate::forest::{DecisionTree, Node};
use crate::types::{CLASS_COUNT, EPSILON, FEATURE_COUNT};

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
    left_weight: f64,
    left_impurity: f64,
    right_weight: f64,
    right_impurity: f64,
}

pub(crate) struct TreeBuilder<'a> {
    features: &'a [[f64; FEATURE_COUNT]],
    labels: &'a [usize],
    weights: &'a [f64],
    params: &'a ForestParams,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
    importances: [f64; FEATURE_COUNT],
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(
        features: &'a [[f64; FEATURE_COUNT]],
        labels: &'a [usize],
        weights: &'a [f64],
        params: &'a ForestParams,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            features,
            labels,
            weights,
            params,
            rng,
            nodes: Vec::new(),
            importances: [0.0; FEATURE_COUNT],
        }
    }

    /// Grows the tree over `indices` and returns it with its normalized
    /// impurity-decrease importances.
    pub(crate) fn grow(mut self, indices: &mut [usize]) -> (DecisionTree, [f64; FEATURE_COUNT]) {
        self.build(indices, 0);

        let total: f64 = self.importances.iter().sum();
        let importances = if total > EPSILON {
            self.importances.map(|v| v / total)
        } else {
            [0.0; FEATURE_COUNT]
        };

        (DecisionTree::from_trusted_nodes(self.nodes), importances)
    }

    fn build(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let node_idx = self.nodes.len();
        // placeholder until the children exist; children get higher indices
        self.nodes.push(Node::Leaf {
            distribution: [1.0; CLASS_COUNT],
        });

        let distribution = self.class_weights(indices);
        let total: f64 = distribution.iter().sum();
        let impurity = gini(&distribution, total);

        let stop = depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split
            || indices.len() < 2 * self.params.min_samples_leaf
            || impurity <= EPSILON;

        let split = if stop {
            None
        } else {
            self.best_split(indices, impurity)
        };

        let Some(split) = split else {
            self.nodes[node_idx] = leaf(distribution, total);
            return node_idx;
        };

        self.importances[split.feature] += total * impurity
            - split.left_weight * split.left_impurity
            - split.right_weight * split.right_impurity;

        let mut mid = 0;
        for i in 0..indices.len() {
            if self.features[indices[i]][split.feature] <= split.threshold {
                indices.swap(i, mid);
                mid += 1;
            }
        }

        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = self.build(left_indices, depth + 1);
        let right = self.build(right_indices, depth + 1);

        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    fn class_weights(&self, indices: &[usize]) -> [f64; CLASS_COUNT] {
        let mut dist = [0.0; CLASS_COUNT];
        for &i in indices {
            dist[self.labels[i]] += self.weights[i];
        }
        dist
    }

    /// Evaluates `max_features` randomly ordered features, and keeps going
    /// through the rest only while no usable split has been found.
    fn best_split(&mut self, indices: &[usize], parent_impurity: f64) -> Option<Split> {
        let mut order: [usize; FEATURE_COUNT] = std::array::from_fn(|i| i);
        order.shuffle(&mut self.rng);

        let mut best: Option<Split> = None;
        for (visited, &feature) in order.iter().enumerate() {
            if visited >= self.params.max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_split_on(indices, feature, parent_impurity) {
                if best.as_ref().map_or(true, |b| candidate.gain > b.gain) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn best_split_on(
        &self,
        indices: &[usize],
        feature: usize,
        parent_impurity: f64,
    ) -> Option<Split> {
        let mut sorted: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (self.features[i][feature], i))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total_dist = self.class_weights(indices);
        let total: f64 = total_dist.iter().sum();
        let min_leaf = self.params.min_samples_leaf;

        let mut left_dist = [0.0; CLASS_COUNT];
        let mut best: Option<Split> = None;

        for pos in 0..sorted.len().saturating_sub(1) {
            let (value, i) = sorted[pos];
            left_dist[self.labels[i]] += self.weights[i];

            let next_value = sorted[pos + 1].0;
            if value >= next_value {
                continue;
            }
            let left_count = pos + 1;
            if left_count < min_leaf || sorted.len() - left_count < min_leaf {
                continue;
            }

            let right_dist: [f64; CLASS_COUNT] = std::array::from_fn(|c| total_dist[c] - left_dist[c]);
            let left_weight: f64 = left_dist.iter().sum();
            let right_weight: f64 = right_dist.iter().sum();
            let left_impurity = gini(&left_dist, left_weight);
            let right_impurity = gini(&right_dist, right_weight);

            let gain = parent_impurity
                - (left_weight / total) * left_impurity
                - (right_weight / total) * right_impurity;
            if gain <= EPSILON || best.as_ref().is_some_and(|b| gain <= b.gain) {
                continue;
            }

            let mut threshold = value + (next_value - value) / 2.0;
            if threshold >= next_value {
                threshold = value;
            }

            best = Some(Split {
                feature,
                threshold,
                gain,
                left_weight,
                left_impurity,
                right_weight,
                right_impurity,
            });
        }

        best
    }
}

fn gini(dist: &[f64; CLASS_COUNT], total: f64) -> f64 {
    if total <= EPSILON {
        return 0.0;
    }
    1.0 - dist.iter().map(|w| (w / total).powi(2)).sum::<f64>()
}

fn leaf(distribution: [f64; CLASS_COUNT], total: f64) -> Node {
    let distribution = if total > EPSILON {
        distribution.map(|w| w / total)
    } else {
        [1.0 / CLASS_COUNT as f64; CLASS_COUNT]
    };
    Node::Leaf { distribution }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ForestParams {
        ForestParams {
            max_features: FEATURE_COUNT,
            min_samples_split: 2,
            min_samples_leaf: 1,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[5.0, 0.0, 0.0], 5.0), 0.0);
        assert!((gini(&[1.0, 1.0, 0.0], 2.0) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[0.0, 0.0, 0.0], 0.0), 0.0);
    }

    #[test]
    fn test_single_threshold_is_learned() {
        let features: Vec<[f64; FEATURE_COUNT]> = (0..10)
            .map(|i| [60.0 + i as f64 * 10.0, 0.5, 0.5, 0.5, 0.5])
            .collect();
        let labels: Vec<usize> = (0..10).map(|i| if i < 5 { 0 } else { 2 }).collect();
        let weights = vec![1.0; 10];
        let params = params();

        let builder = TreeBuilder::new(
            &features,
            &labels,
            &weights,
            &params,
            ChaCha8Rng::seed_from_u64(1),
        );
        let mut indices: Vec<usize> = (0..10).collect();
        let (tree, importances) = builder.grow(&mut indices);

        assert_eq!(tree.node_count(), 3);
        match &tree.nodes()[0] {
            Node::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert!((*threshold - 105.0).abs() < 1e-12);
            }
            other => panic!("expected split at root, got {other:?}"),
        }
        assert_eq!(importances, [1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(
            tree.predict_proba(&[70.0, 0.5, 0.5, 0.5, 0.5]).unwrap(),
            [1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_max_depth_zero_yields_leaf() {
        let features = vec![[60.0, 0.1, 0.1, 0.1, 0.1], [120.0, 0.9, 0.9, 0.9, 0.9]];
        let labels = vec![0, 2];
        let weights = vec![1.0, 3.0];
        let params = ForestParams {
            max_depth: 0,
            ..params()
        };

        let builder = TreeBuilder::new(
            &features,
            &labels,
            &weights,
            &params,
            ChaCha8Rng::seed_from_u64(1),
        );
        let (tree, _) = builder.grow(&mut [0, 1]);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(
            tree.predict_proba(&features[0]).unwrap(),
            [0.25, 0.0, 0.75]
        );
    }

    #[test]
    fn test_constant_features_yield_leaf() {
        let features = vec![[70.0, 0.5, 0.5, 0.5, 0.5]; 6];
        let labels = vec![0, 1, 2, 0, 1, 2];
        let weights = vec![1.0; 6];
        let params = params();

        let builder = TreeBuilder::new(
            &features,
            &labels,
            &weights,
            &params,
            ChaCha8Rng::seed_from_u64(3),
        );
        let mut indices: Vec<usize> = (0..6).collect();
        let (tree, importances) = builder.grow(&mut indices);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(importances, [0.0; FEATURE_COUNT]);
    }
}
