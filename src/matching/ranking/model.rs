use std::fmt;
use std::path::Path;

use serde::Deserialize;

use super::features::FeatureTable;
use crate::matching::errors::{read_json, ArtifactError, ModelError};

/// Opaque pretrained scorer; one call per feature table.
pub trait ScoringModel: Send + Sync + fmt::Debug {
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>, ModelError>;

    fn feature_count(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Leaf {
        leaf: f64,
    },
    Categorical {
        feature: usize,
        categories: Vec<usize>,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Numeric {
        feature: usize,
        threshold: f64,
        #[serde(default)]
        default_left: bool,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn evaluate(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            node = match node {
                TreeNode::Leaf { leaf } => return *leaf,
                TreeNode::Numeric {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    let value = row[*feature];
                    let go_left = if value.is_nan() {
                        *default_left
                    } else {
                        value <= *threshold
                    };
                    if go_left {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    }
                }
                TreeNode::Categorical {
                    feature,
                    categories,
                    left,
                    right,
                } => {
                    let value = row[*feature];
                    let member = value.is_finite()
                        && value >= 0.0
                        && categories.contains(&(value as usize));
                    if member {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    }
                }
            };
        }
    }

    fn max_feature(&self) -> Option<usize> {
        match self {
            TreeNode::Leaf { .. } => None,
            TreeNode::Numeric {
                feature,
                left,
                right,
                ..
            }
            | TreeNode::Categorical {
                feature,
                left,
                right,
                ..
            } => [Some(*feature), left.max_feature(), right.max_feature()]
                .into_iter()
                .flatten()
                .max(),
        }
    }
}

/// Binary-logistic tree ensemble: `sigmoid(init_score + sum(tree outputs))`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GradientBoostedTrees {
    feature_count: usize,
    #[serde(default)]
    init_score: f64,
    trees: Vec<TreeNode>,
}

impl GradientBoostedTrees {
    pub fn new(
        feature_count: usize,
        init_score: f64,
        trees: Vec<TreeNode>,
    ) -> Result<Self, String> {
        let model = Self {
            feature_count,
            init_score,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let model: Self = read_json(path)?;
        model
            .validate()
            .map_err(|reason| ArtifactError::schema(path, reason))?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), String> {
        for (index, tree) in self.trees.iter().enumerate() {
            if let Some(feature) = tree.max_feature() {
                if feature >= self.feature_count {
                    return Err(format!(
                        "tree {index} splits on feature {feature} but only {} are declared",
                        self.feature_count
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn raw_score(&self, row: &[f64]) -> f64 {
        self.init_score + self.trees.iter().map(|tree| tree.evaluate(row)).sum::<f64>()
    }
}

fn sigmoid(value: f64) -> f64 {
    1.0 / (1.0 + (-value).exp())
}

impl ScoringModel for GradientBoostedTrees {
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>, ModelError> {
        if table.width() != self.feature_count {
            return Err(ModelError::WidthMismatch {
                expected: self.feature_count,
                found: table.width(),
            });
        }
        table
            .rows()
            .map(|row| {
                if row.len() != self.feature_count {
                    return Err(ModelError::WidthMismatch {
                        expected: self.feature_count,
                        found: row.len(),
                    });
                }
                Ok(sigmoid(self.raw_score(row)))
            })
            .collect()
    }

    fn feature_count(&self) -> usize {
        self.feature_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> GradientBoostedTrees {
        let source = r#"{
            "feature_count": 2,
            "init_score": 0.0,
            "trees": [
                {
                    "feature": 0,
                    "threshold": 20.0,
                    "default_left": true,
                    "left": {"leaf": -2.0},
                    "right": {"leaf": 2.0}
                },
                {
                    "feature": 1,
                    "categories": [2, 3],
                    "left": {"leaf": 1.0},
                    "right": {"leaf": 0.0}
                }
            ]
        }"#;
        let model: GradientBoostedTrees = serde_json::from_str(source).expect("parses");
        model.validate().expect("valid");
        model
    }

    #[test]
    fn numeric_and_categorical_splits_accumulate() {
        let table = FeatureTable::from_rows(2, vec![vec![25.0, 2.0], vec![10.0, 1.0]]);
        let scores = model().predict(&table).expect("scores");
        assert!((scores[0] - sigmoid(3.0)).abs() < 1e-12);
        assert!((scores[1] - sigmoid(-2.0)).abs() < 1e-12);
    }

    #[test]
    fn missing_numeric_follows_default_direction() {
        let table = FeatureTable::from_rows(2, vec![vec![f64::NAN, 0.0]]);
        let scores = model().predict(&table).expect("scores");
        assert!((scores[0] - sigmoid(-2.0)).abs() < 1e-12);
    }

    #[test]
    fn rejects_table_of_wrong_width() {
        let table = FeatureTable::from_rows(3, vec![vec![1.0, 2.0, 3.0]]);
        assert_eq!(
            model().predict(&table),
            Err(ModelError::WidthMismatch {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn rejects_split_on_undeclared_feature() {
        let err = GradientBoostedTrees::new(
            1,
            0.0,
            vec![TreeNode::Numeric {
                feature: 4,
                threshold: 0.0,
                default_left: false,
                left: Box::new(TreeNode::Leaf { leaf: 0.0 }),
                right: Box::new(TreeNode::Leaf { leaf: 0.0 }),
            }],
        )
        .expect_err("feature 4 is undeclared");
        assert!(err.contains("feature 4"));
    }
}
