use serde::{Deserialize, Serialize};

/// Pre-trained decision model over normalised features.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    /// Tree ensemble; leaf distributions are normalised and averaged.
    Forest { trees: Vec<DecisionTree> },
    /// One-vs-rest linear scores `w·x + b`.
    Linear {
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Go to `left` when `x[feature] <= threshold`, otherwise `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class weight (sample counts or probabilities).
    Leaf { value: Vec<f64> },
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on feature {}", idx, feature));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", idx));
                    }
                    // Children always come after their parent, so traversal terminates.
                    for child in [left, right] {
                        if *child <= idx || *child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", idx, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "leaf {} has {} class weights, expected {}",
                            idx,
                            value.len(),
                            n_classes
                        ));
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        return Err(format!("leaf {} has a negative or non-finite weight", idx));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf(&self, x: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if x[*feature] <= *threshold { *left } else { *right },
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}

impl Classifier {
    pub(crate) fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        match self {
            Classifier::Forest { trees } => {
                if trees.is_empty() {
                    return Err("forest has no trees".into());
                }
                trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, tree)| {
                        tree.validate(n_features, n_classes)
                            .map_err(|err| format!("tree {}: {}", i, err))
                    })
            }
            Classifier::Linear {
                coefficients,
                intercepts,
            } => {
                if coefficients.len() != n_classes || intercepts.len() != n_classes {
                    return Err(format!(
                        "linear model has {} coefficient rows and {} intercepts for {} classes",
                        coefficients.len(),
                        intercepts.len(),
                        n_classes
                    ));
                }
                if let Some(row) = coefficients.iter().position(|r| r.len() != n_features) {
                    return Err(format!(
                        "coefficient row {} does not have {} entries",
                        row, n_features
                    ));
                }
                if coefficients
                    .iter()
                    .flatten()
                    .chain(intercepts)
                    .any(|v| !v.is_finite())
                {
                    return Err("linear model parameters must be finite".into());
                }
                Ok(())
            }
        }
    }

    /// Per-class scores. The caller guarantees `x` has the fitted dimensionality.
    pub(crate) fn decision_scores(&self, x: &[f64], n_classes: usize) -> Vec<f64> {
        match self {
            Classifier::Forest { trees } => {
                let mut acc = vec![0.0; n_classes];
                for tree in trees {
                    let value = tree.leaf(x);
                    let total: f64 = value.iter().sum();
                    if total > 0.0 {
                        for (slot, w) in acc.iter_mut().zip(value) {
                            *slot += w / total;
                        }
                    }
                }
                let n = trees.len() as f64;
                acc.iter().map(|v| v / n).collect()
            }
            Classifier::Linear {
                coefficients,
                intercepts,
            } => coefficients
                .iter()
                .zip(intercepts)
                .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
                .collect(),
        }
    }
}

/// Index of the highest score; ties go to the lowest class index.
pub(crate) fn argmax(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}
