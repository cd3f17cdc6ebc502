use std::fmt;

use crate::matching::errors::ModelError;

/// Output of a group classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// Confidence per label, aligned with the group's label list. Not necessarily normalized.
    Probabilities(Vec<f64>),
    /// Hard prediction for classifiers without a confidence output.
    Class(usize),
}

/// Per-group classifier over one-hot encoded priority features.
pub trait GroupClassifier: Send + Sync + fmt::Debug {
    fn predict(&self, features: &[f64]) -> Result<Prediction, ModelError>;

    fn input_width(&self) -> usize;
}

fn check_width(expected: usize, features: &[f64]) -> Result<(), ModelError> {
    if features.len() == expected {
        Ok(())
    } else {
        Err(ModelError::WidthMismatch {
            expected,
            found: features.len(),
        })
    }
}

fn squared_distance(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

/// Indices of the `k` closest points; equal distances keep training order.
fn nearest(points: &[Vec<f64>], features: &[f64], k: usize) -> Vec<usize> {
    let mut ranked: Vec<(usize, f64)> = points
        .iter()
        .enumerate()
        .map(|(index, point)| (index, squared_distance(point, features)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.into_iter().take(k).map(|(index, _)| index).collect()
}

/// Uniform-weight k-nearest-neighbour vote.
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    k: usize,
    width: usize,
    classes: usize,
    points: Vec<Vec<f64>>,
    targets: Vec<usize>,
}

impl KnnClassifier {
    pub fn new(
        k: usize,
        classes: usize,
        points: Vec<Vec<f64>>,
        targets: Vec<usize>,
    ) -> Result<Self, String> {
        validate_points(&points, &targets, classes)?;
        if k == 0 {
            return Err("k must be at least 1".to_string());
        }
        let width = points.first().map(Vec::len).unwrap_or(0);
        Ok(Self {
            k: k.min(points.len()),
            width,
            classes,
            points,
            targets,
        })
    }
}

impl GroupClassifier for KnnClassifier {
    fn predict(&self, features: &[f64]) -> Result<Prediction, ModelError> {
        check_width(self.width, features)?;
        let mut votes = vec![0.0; self.classes];
        for index in nearest(&self.points, features, self.k) {
            votes[self.targets[index]] += 1.0;
        }
        let k = self.k as f64;
        Ok(Prediction::Probabilities(
            votes.into_iter().map(|count| count / k).collect(),
        ))
    }

    fn input_width(&self) -> usize {
        self.width
    }
}

/// Single nearest neighbour returning only the winning class.
#[derive(Debug, Clone)]
pub struct HardLabelClassifier {
    width: usize,
    points: Vec<Vec<f64>>,
    targets: Vec<usize>,
}

impl HardLabelClassifier {
    pub fn new(classes: usize, points: Vec<Vec<f64>>, targets: Vec<usize>) -> Result<Self, String> {
        validate_points(&points, &targets, classes)?;
        let width = points.first().map(Vec::len).unwrap_or(0);
        Ok(Self {
            width,
            points,
            targets,
        })
    }
}

impl GroupClassifier for HardLabelClassifier {
    fn predict(&self, features: &[f64]) -> Result<Prediction, ModelError> {
        check_width(self.width, features)?;
        let winner = nearest(&self.points, features, 1)
            .first()
            .map(|index| self.targets[*index])
            .unwrap_or(0);
        Ok(Prediction::Class(winner))
    }

    fn input_width(&self) -> usize {
        self.width
    }
}

fn validate_points(points: &[Vec<f64>], targets: &[usize], classes: usize) -> Result<(), String> {
    if points.is_empty() {
        return Err("neighbour classifier needs at least one training point".to_string());
    }
    if points.len() != targets.len() {
        return Err(format!(
            "{} training points but {} targets",
            points.len(),
            targets.len()
        ));
    }
    let width = points[0].len();
    if points.iter().any(|point| point.len() != width) {
        return Err("training points have uneven widths".to_string());
    }
    if let Some(target) = targets.iter().find(|target| **target >= classes) {
        return Err(format!("target {target} exceeds {classes} labels"));
    }
    Ok(())
}

/// Multinomial logistic regression: `softmax(W x + b)`.
#[derive(Debug, Clone)]
pub struct SoftmaxClassifier {
    width: usize,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl SoftmaxClassifier {
    pub fn new(classes: usize, weights: Vec<Vec<f64>>, bias: Vec<f64>) -> Result<Self, String> {
        if weights.len() != classes || bias.len() != classes {
            return Err(format!(
                "softmax expects {classes} weight rows and biases, found {} and {}",
                weights.len(),
                bias.len()
            ));
        }
        let width = weights.first().map(Vec::len).unwrap_or(0);
        if weights.iter().any(|row| row.len() != width) {
            return Err("softmax weight rows have uneven widths".to_string());
        }
        Ok(Self {
            width,
            weights,
            bias,
        })
    }
}

impl GroupClassifier for SoftmaxClassifier {
    fn predict(&self, features: &[f64]) -> Result<Prediction, ModelError> {
        check_width(self.width, features)?;
        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + bias)
            .collect();
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|logit| (logit - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        Ok(Prediction::Probabilities(
            exps.into_iter().map(|value| value / total).collect(),
        ))
    }

    fn input_width(&self) -> usize {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 1.0, 1.0],
        ]
    }

    #[test]
    fn one_neighbour_puts_all_mass_on_closest_target() {
        let knn = KnnClassifier::new(1, 3, points(), vec![0, 1, 2]).expect("valid");
        let prediction = knn.predict(&[0.0, 1.0, 0.9]).expect("predicts");
        assert_eq!(prediction, Prediction::Probabilities(vec![0.0, 0.0, 1.0]));
    }

    #[test]
    fn k_is_capped_by_training_size() {
        let knn = KnnClassifier::new(10, 2, points(), vec![0, 1, 1]).expect("valid");
        let Prediction::Probabilities(probabilities) =
            knn.predict(&[1.0, 0.0, 0.0]).expect("predicts")
        else {
            panic!("knn returns probabilities");
        };
        assert!((probabilities[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((probabilities[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn hard_label_returns_class_index() {
        let clf = HardLabelClassifier::new(2, points(), vec![1, 0, 0]).expect("valid");
        assert_eq!(clf.predict(&[0.9, 0.0, 0.0]), Ok(Prediction::Class(1)));
    }

    #[test]
    fn softmax_probabilities_sum_to_one() {
        let clf = SoftmaxClassifier::new(
            2,
            vec![vec![2.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            vec![0.0, 0.5],
        )
        .expect("valid");
        let Prediction::Probabilities(probabilities) =
            clf.predict(&[1.0, 1.0, 0.0]).expect("predicts")
        else {
            panic!("softmax returns probabilities");
        };
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probabilities[0] > probabilities[1]);
    }

    #[test]
    fn rejects_wrong_feature_width() {
        let knn = KnnClassifier::new(1, 3, points(), vec![0, 1, 2]).expect("valid");
        assert_eq!(
            knn.predict(&[1.0]),
            Err(ModelError::WidthMismatch {
                expected: 3,
                found: 1
            })
        );
    }

    #[test]
    fn rejects_targets_beyond_label_list() {
        let err = KnnClassifier::new(1, 2, points(), vec![0, 1, 2]).expect_err("bad target");
        assert!(err.contains("exceeds"));
    }
}
