//! Decision-tree ensembles evaluated in process.
//!
//! Trees are stored as flat node arrays, children referenced by index. The
//! regression forest averages a vector leaf per tree (one value per target);
//! the classification forest averages per-class distributions and reports the
//! label with the highest mean.

use serde::{Deserialize, Serialize};

use super::PredictionError;

/// A node in a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Internal split node
    Split {
        feature: u32,
        threshold: f64,
        left: u32,
        right: u32,
        /// Direction for missing values
        #[serde(default = "default_left")]
        default_left: bool,
    },
    /// Leaf node with one value per output
    Leaf { value: Vec<f64> },
}

fn default_left() -> bool {
    true
}

impl Node {
    /// Go left when `value <= threshold`; NaN follows `default_left`.
    #[inline]
    fn next(&self, features: &[f64]) -> Option<u32> {
        match self {
            Node::Split {
                feature,
                threshold,
                left,
                right,
                default_left,
            } => {
                let value = features[*feature as usize];
                let go_left = if value.is_nan() {
                    *default_left
                } else {
                    value <= *threshold
                };
                Some(if go_left { *left } else { *right })
            }
            Node::Leaf { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Walks from the root to a leaf. Assumes [`Tree::validate`] passed.
    pub fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut index = 0usize;
        loop {
            let node = &self.nodes[index];
            match node.next(features) {
                Some(child) => index = child as usize,
                None => match node {
                    Node::Leaf { value } => return value,
                    Node::Split { .. } => unreachable!("split nodes always yield a child"),
                },
            }
        }
    }

    /// Structural checks run once at load so evaluation can index freely.
    /// Children must come after their parent, which also rules out cycles.
    pub fn validate(&self, n_features: usize, leaf_width: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature as usize >= n_features {
                        return Err(format!(
                            "node {index} splits on feature {feature}, only {n_features} exist"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {index} has a NaN threshold"));
                    }
                    for child in [*left, *right] {
                        let child = child as usize;
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!(
                                "node {index} points to invalid child {child}"
                            ));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != leaf_width {
                        return Err(format!(
                            "leaf {index} has {} values, expected {leaf_width}",
                            value.len()
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

fn mean_of_leaves(trees: &[Tree], features: &[f64], width: usize) -> Vec<f64> {
    let mut sums = vec![0.0; width];
    for tree in trees {
        for (sum, value) in sums.iter_mut().zip(tree.leaf(features)) {
            *sum += value;
        }
    }

    let count = trees.len().max(1) as f64;
    sums.iter_mut().for_each(|sum| *sum /= count);
    sums
}

fn check_width(features: &[f64], n_features: usize) -> Result<(), PredictionError> {
    if features.len() != n_features {
        return Err(PredictionError::SchemaMismatch(format!(
            "model expects {n_features} features, got {}",
            features.len()
        )));
    }
    Ok(())
}

/// Multi-output regression forest.
#[derive(Debug, Clone)]
pub struct RegressionForest {
    trees: Vec<Tree>,
    n_features: usize,
    n_outputs: usize,
}

impl RegressionForest {
    pub fn new(trees: Vec<Tree>, n_features: usize, n_outputs: usize) -> Result<Self, String> {
        if trees.is_empty() {
            return Err("regression forest has no trees".into());
        }
        for (index, tree) in trees.iter().enumerate() {
            tree.validate(n_features, n_outputs)
                .map_err(|err| format!("tree {index}: {err}"))?;
        }

        Ok(Self {
            trees,
            n_features,
            n_outputs,
        })
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError> {
        check_width(features, self.n_features)?;
        Ok(mean_of_leaves(&self.trees, features, self.n_outputs))
    }
}

/// Classification forest over string labels.
#[derive(Debug, Clone)]
pub struct ClassificationForest {
    trees: Vec<Tree>,
    classes: Vec<String>,
    n_features: usize,
}

impl ClassificationForest {
    pub fn new(trees: Vec<Tree>, classes: Vec<String>, n_features: usize) -> Result<Self, String> {
        if trees.is_empty() {
            return Err("classification forest has no trees".into());
        }
        if classes.is_empty() {
            return Err("classification forest has no classes".into());
        }
        for (index, tree) in trees.iter().enumerate() {
            tree.validate(n_features, classes.len())
                .map_err(|err| format!("tree {index}: {err}"))?;
        }

        Ok(Self {
            trees,
            classes,
            n_features,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Mean class probabilities, aligned with [`Self::classes`].
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError> {
        check_width(features, self.n_features)?;
        Ok(mean_of_leaves(&self.trees, features, self.classes.len()))
    }

    /// Most probable label; the first class wins ties.
    pub fn predict(&self, features: &[f64]) -> Result<&str, PredictionError> {
        let proba = self.predict_proba(features)?;
        let mut best = 0usize;
        for (index, p) in proba.iter().enumerate().skip(1) {
            if *p > proba[best] {
                best = index;
            }
        }
        Ok(&self.classes[best])
    }
}
