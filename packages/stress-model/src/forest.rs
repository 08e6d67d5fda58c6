//! Random Forest Model
//!
//! Trees are stored as flat node arenas. A split sends a sample left when
//! `x[feature] <= threshold`. Children always sit at higher indices than
//! their parent, so every walk from the root terminates.
//!
//! The on-disk artifact is JSON and carries the feature order and class
//! list it was trained with; loading refuses artifacts that disagree with
//! [`FEATURE_NAMES`] or [`StressLevel::ALL`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::StressClassifier;
use crate::error::{InferenceError, LoadError};
use crate::types::{StressLevel, CLASS_COUNT, EPSILON, FEATURE_COUNT, FEATURE_NAMES};

/// Current artifact layout version
pub const FORMAT_VERSION: u32 = 1;

// ==================== Tree ====================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Class weights at this leaf, not necessarily normalized
        distribution: [f64; CLASS_COUNT],
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Builds a tree after checking the arena is well formed.
    pub fn new(nodes: Vec<Node>) -> Result<Self, LoadError> {
        if nodes.is_empty() {
            return Err(LoadError::Invalid("tree has no nodes".to_string()));
        }

        for (idx, node) in nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(LoadError::Invalid(format!(
                            "node {idx} splits on unknown feature {feature}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(LoadError::Invalid(format!(
                            "node {idx} has a non-finite threshold"
                        )));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= nodes.len() {
                            return Err(LoadError::Invalid(format!(
                                "node {idx} references invalid child {child}"
                            )));
                        }
                    }
                }
                Node::Leaf { distribution } => {
                    let valid = distribution.iter().all(|p| p.is_finite() && *p >= 0.0)
                        && distribution.iter().sum::<f64>() > EPSILON;
                    if !valid {
                        return Err(LoadError::Invalid(format!(
                            "leaf {idx} has an invalid class distribution"
                        )));
                    }
                }
            }
        }

        Ok(Self { nodes })
    }

    /// Arena constructor for the trainer, which only emits valid trees.
    pub(crate) fn from_trusted_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max_depth = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = node {
                depths[*left] = depths[idx] + 1;
                depths[*right] = depths[idx] + 1;
                max_depth = max_depth.max(depths[idx] + 1);
            }
        }
        max_depth
    }

    /// Normalized class distribution of the leaf `features` falls into.
    pub fn predict_proba(
        &self,
        features: &[f64; FEATURE_COUNT],
    ) -> Result<[f64; CLASS_COUNT], InferenceError> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features
                        .get(*feature)
                        .ok_or_else(|| InferenceError::new("split feature out of range"))?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
                Some(Node::Leaf { distribution }) => {
                    let total: f64 = distribution.iter().sum();
                    if total <= EPSILON {
                        return Err(InferenceError::new("empty leaf distribution"));
                    }
                    return Ok(distribution.map(|p| p / total));
                }
                None => return Err(InferenceError::new(format!("dangling node index {idx}"))),
            }
        }
    }
}

// ==================== Forest ====================

/// Training provenance stored alongside the trees
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestMetadata {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    pub train_samples: usize,
    /// Mean decrease in impurity, in feature order
    pub feature_importances: [f64; FEATURE_COUNT],
    pub test_accuracy: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ForestArtifact {
    format_version: u32,
    feature_names: Vec<String>,
    classes: Vec<String>,
    trees: Vec<DecisionTree>,
    #[serde(default)]
    metadata: ForestMetadata,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    metadata: ForestMetadata,
}

impl RandomForest {
    pub fn new(trees: Vec<DecisionTree>, metadata: ForestMetadata) -> Result<Self, LoadError> {
        if trees.is_empty() {
            return Err(LoadError::Invalid("forest has no trees".to_string()));
        }
        Ok(Self { trees, metadata })
    }

    /// Trainer output is valid by construction and always has trees.
    pub(crate) fn from_trained(trees: Vec<DecisionTree>, metadata: ForestMetadata) -> Self {
        Self { trees, metadata }
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn metadata(&self) -> &ForestMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ForestMetadata {
        &mut self.metadata
    }

    pub fn feature_importances(&self) -> [f64; FEATURE_COUNT] {
        self.metadata.feature_importances
    }

    /// Loads and validates an artifact written by [`RandomForest::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, LoadError> {
        let artifact: ForestArtifact = serde_json::from_str(raw)?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: ForestArtifact) -> Result<Self, LoadError> {
        if artifact.format_version != FORMAT_VERSION {
            return Err(LoadError::Invalid(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                artifact.format_version
            )));
        }

        if !artifact.feature_names.iter().map(String::as_str).eq(FEATURE_NAMES) {
            return Err(LoadError::Invalid(format!(
                "feature order {:?} does not match {:?}",
                artifact.feature_names, FEATURE_NAMES
            )));
        }

        if !artifact
            .classes
            .iter()
            .map(String::as_str)
            .eq(StressLevel::ALL.iter().map(|l| l.as_str()))
        {
            return Err(LoadError::Invalid(format!(
                "class list {:?} does not match low/medium/high",
                artifact.classes
            )));
        }

        // deserialized trees bypass DecisionTree::new, so re-check them here
        let trees = artifact
            .trees
            .into_iter()
            .map(|tree| DecisionTree::new(tree.nodes))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(trees, artifact.metadata)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let artifact = ForestArtifact {
            format_version: FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            classes: StressLevel::ALL.iter().map(|l| l.as_str().to_string()).collect(),
            trees: self.trees.clone(),
            metadata: self.metadata.clone(),
        };
        serde_json::to_string(&artifact)
    }

    /// Writes the artifact, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json)
    }
}

impl StressClassifier for RandomForest {
    fn name(&self) -> &'static str {
        "random-forest"
    }

    fn predict_proba(
        &self,
        features: &[f64; FEATURE_COUNT],
    ) -> Result<[f64; CLASS_COUNT], InferenceError> {
        let mut sum = [0.0; CLASS_COUNT];
        for tree in &self.trees {
            let p = tree.predict_proba(features)?;
            for (acc, v) in sum.iter_mut().zip(p) {
                *acc += v;
            }
        }
        let n = self.trees.len() as f64;
        Ok(sum.map(|s| s / n))
    }
}
