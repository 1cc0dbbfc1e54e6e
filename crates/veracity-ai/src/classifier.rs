//! Trained two-class decision models over TF-IDF features.
//!
//! Two families are supported: a random forest of CART trees (probabilities
//! averaged across trees, as scikit-learn's `predict_proba` does) and binary
//! logistic regression. Both produce a distribution indexed by
//! [`Label::index`].

use serde::{Deserialize, Serialize};
use veracity_core::Label;

use crate::DetectError;
use crate::labels::check_class_order;
use crate::vectorizer::FeatureVector;

/// One node of a decision tree.
///
/// Splits send a sample left when `x[feature] <= threshold`, with the feature
/// rounded to f32 first as the fitted trees expect. Leaves hold
/// per-class weights (sample counts or fractions) in label order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Node 0 is the root; children always come after their parent.
    pub nodes: Vec<TreeNode>,
}

/// Serialized model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelParams {
    RandomForest { trees: Vec<DecisionTree> },
    LogisticRegression { coef: Vec<f64>, intercept: f64 },
}

/// Serialized form of a trained classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    pub format_version: u32,
    /// Class names in the model's index order.
    pub classes: Vec<String>,
    /// Expected input dimensionality.
    pub n_features: usize,
    pub model: ModelParams,
}

/// Output of [`Classifier::score`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub index: usize,
    pub distribution: [f64; Label::COUNT],
}

#[derive(Debug)]
pub struct Classifier {
    n_features: usize,
    model: ModelParams,
}

impl Classifier {
    /// Validate an artifact and build the classifier from it.
    ///
    /// Rejects class orderings that differ from the label space and any
    /// structural defect that could make scoring panic or loop.
    pub fn from_artifact(artifact: ClassifierArtifact) -> Result<Self, DetectError> {
        check_class_order(&artifact.classes)?;

        let n_features = artifact.n_features;
        if n_features == 0 {
            return Err(DetectError::InvalidModel("n_features is zero".into()));
        }

        match &artifact.model {
            ModelParams::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(DetectError::InvalidModel("forest has no trees".into()));
                }
                for (t, tree) in trees.iter().enumerate() {
                    validate_tree(tree, n_features)
                        .map_err(|e| DetectError::InvalidModel(format!("tree {t}: {e}")))?;
                }
            }
            ModelParams::LogisticRegression { coef, intercept } => {
                if coef.len() != n_features {
                    return Err(DetectError::DimensionMismatch {
                        context: "logistic regression coefficients",
                        expected: n_features,
                        actual: coef.len(),
                    });
                }
                if !intercept.is_finite() || coef.iter().any(|w| !w.is_finite()) {
                    return Err(DetectError::InvalidModel(
                        "logistic regression has non-finite parameters".into(),
                    ));
                }
            }
        }

        Ok(Self {
            n_features,
            model: artifact.model,
        })
    }

    /// Expected input dimensionality.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Model family name, as written in the artifact.
    pub fn family(&self) -> &'static str {
        match self.model {
            ModelParams::RandomForest { .. } => "random_forest",
            ModelParams::LogisticRegression { .. } => "logistic_regression",
        }
    }

    /// Number of trees, for forest models.
    pub fn tree_count(&self) -> Option<usize> {
        match &self.model {
            ModelParams::RandomForest { trees } => Some(trees.len()),
            ModelParams::LogisticRegression { .. } => None,
        }
    }

    /// Score a feature vector.
    ///
    /// The distribution is renormalized to sum to one. The predicted index is
    /// the arg-max, with ties going to the lowest label index.
    pub fn score(&self, vector: &FeatureVector) -> Result<Score, DetectError> {
        if vector.dim() != self.n_features {
            return Err(DetectError::DimensionMismatch {
                context: "feature vector",
                expected: self.n_features,
                actual: vector.dim(),
            });
        }

        let raw = match &self.model {
            ModelParams::RandomForest { trees } => forest_proba(trees, vector),
            ModelParams::LogisticRegression { coef, intercept } => {
                let p_real = sigmoid(vector.dot(coef) + intercept);
                [1.0 - p_real, p_real]
            }
        };

        let distribution = renormalize(raw);
        Ok(Score {
            index: argmax(&distribution),
            distribution,
        })
    }
}

/// Index of the largest entry; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn validate_tree(tree: &DecisionTree, n_features: usize) -> Result<(), String> {
    let len = tree.nodes.len();
    if len == 0 {
        return Err("no nodes".into());
    }

    for (i, node) in tree.nodes.iter().enumerate() {
        match node {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= n_features {
                    return Err(format!(
                        "node {i} splits on feature {feature}, outside {n_features} dimensions"
                    ));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {i} has a non-finite threshold"));
                }
                for child in [*left, *right] {
                    if child <= i || child >= len {
                        return Err(format!("node {i} has invalid child {child}"));
                    }
                }
            }
            TreeNode::Leaf { value } => {
                if value.len() != Label::COUNT {
                    return Err(format!(
                        "leaf {i} has {} class values, expected {}",
                        value.len(),
                        Label::COUNT
                    ));
                }
                if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(format!("leaf {i} has a negative or non-finite value"));
                }
                if value.iter().sum::<f64>() <= 0.0 {
                    return Err(format!("leaf {i} has no weight"));
                }
            }
        }
    }

    Ok(())
}

fn forest_proba(trees: &[DecisionTree], vector: &FeatureVector) -> [f64; Label::COUNT] {
    let mut sum = [0.0f64; Label::COUNT];
    for tree in trees {
        let leaf = tree_leaf(tree, vector);
        let total: f64 = leaf.iter().sum();
        for (acc, v) in sum.iter_mut().zip(leaf) {
            *acc += v / total;
        }
    }
    let n = trees.len() as f64;
    sum.map(|v| v / n)
}

fn tree_leaf<'a>(tree: &'a DecisionTree, vector: &FeatureVector) -> &'a [f64] {
    let mut node = 0;
    loop {
        match &tree.nodes[node] {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                node = if as_split_input(vector.get(*feature)) <= *threshold {
                    *left
                } else {
                    *right
                };
            }
            TreeNode::Leaf { value } => return value,
        }
    }
}

/// Trees are fitted and evaluated on float32 inputs; thresholds are float32
/// values widened to f64. Rounding the feature the same way keeps a value
/// that lands on a threshold in f32 on the left branch.
fn as_split_input(x: f64) -> f64 {
    f64::from(x as f32)
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn renormalize(raw: [f64; Label::COUNT]) -> [f64; Label::COUNT] {
    let clamped = raw.map(|p| if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 });
    let total: f64 = clamped.iter().sum();
    if total > 0.0 {
        clamped.map(|p| p / total)
    } else {
        [1.0 / Label::COUNT as f64; Label::COUNT]
    }
}
