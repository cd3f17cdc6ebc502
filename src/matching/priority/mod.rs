//! Special-admission routing: one result per exclusive priority variant of a profile.

pub mod classifier;
pub mod encoder;
pub mod registry;

pub use classifier::{
    GroupClassifier, HardLabelClassifier, KnnClassifier, Prediction, SoftmaxClassifier,
};
pub use encoder::OneHotEncoder;
pub use registry::{ClassifierRegistry, GroupModel, DEFAULT_FEATURE_COLUMNS};

use tracing::debug;

use super::domain::{ApplicantProfile, PriorityLabel, PriorityResult, ProgramDistribution};
use super::errors::ModelError;
use super::normalizer::expand_priority_variants;

/// Categorical view of a single variant, as the group encoders see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantFeatures {
    school_type: String,
    province: String,
    industry_group: String,
    olympiad_subject: String,
    armed_forces_hero: String,
    ethnic_minority: String,
    poor_district: String,
}

impl VariantFeatures {
    pub fn from_profile(profile: &ApplicantProfile) -> Self {
        let flag = |value: bool| if value { "1" } else { "0" }.to_string();
        let signals = &profile.priority;
        Self {
            school_type: profile.school_type.code().to_string(),
            province: profile.province.clone(),
            industry_group: profile.industry_group.clone(),
            olympiad_subject: signals.olympiad_subject().unwrap_or("0").to_string(),
            armed_forces_hero: flag(signals.armed_forces_hero),
            ethnic_minority: flag(signals.ethnic_minority),
            poor_district: flag(signals.poor_district),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        let value = match column {
            "school_type" => &self.school_type,
            "province" => &self.province,
            "industry_group" => &self.industry_group,
            "olympiad_subject" => &self.olympiad_subject,
            "armed_forces_hero" => &self.armed_forces_hero,
            "ethnic_minority" => &self.ethnic_minority,
            "poor_district" => &self.poor_district,
            _ => return None,
        };
        Some(value.as_str())
    }
}

/// Dispatches priority variants to their group classifier.
#[derive(Debug, Default)]
pub struct PriorityRouter {
    registry: ClassifierRegistry,
}

impl PriorityRouter {
    pub fn new(registry: ClassifierRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ClassifierRegistry {
        &self.registry
    }

    /// Expand the profile into exclusive variants and classify each one.
    pub fn route(&self, profile: &ApplicantProfile) -> Result<Vec<PriorityResult>, ModelError> {
        let variants = expand_priority_variants(profile);
        let results = variants
            .iter()
            .map(|variant| self.classify_variant(variant))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            variants = results.len(),
            served = results.iter().filter(|result| !result.programs.is_empty()).count(),
            "priority routing complete"
        );
        Ok(results)
    }

    /// Classify a variant that already carries at most one priority signal.
    pub fn classify_variant(
        &self,
        variant: &ApplicantProfile,
    ) -> Result<PriorityResult, ModelError> {
        let label = PriorityLabel::derive(&variant.priority);
        if label.is_none() {
            return Ok(PriorityResult::unserved(label));
        }

        let Some(group) = self.registry.get(&variant.group_key()) else {
            return Ok(PriorityResult::unserved(label));
        };

        let programs = match (&group.classifier, &group.encoder) {
            (None, _) => group
                .labels
                .first()
                .map(ProgramDistribution::single)
                .unwrap_or_default(),
            (Some(classifier), Some(encoder)) => {
                let features = VariantFeatures::from_profile(variant);
                let encoded = encoder.transform(|column| features.get(column))?;
                distribution(classifier.predict(&encoded)?, &group.labels)?
            }
            (Some(classifier), None) => {
                return Err(ModelError::WidthMismatch {
                    expected: classifier.input_width(),
                    found: 0,
                })
            }
        };

        Ok(PriorityResult { label, programs })
    }
}

/// Normalize classifier output into a descending, label-keyed distribution.
fn distribution(
    prediction: Prediction,
    labels: &[String],
) -> Result<ProgramDistribution, ModelError> {
    match prediction {
        Prediction::Class(index) => labels
            .get(index)
            .map(ProgramDistribution::single)
            .ok_or(ModelError::UnknownClass {
                index,
                classes: labels.len(),
            }),
        Prediction::Probabilities(probabilities) => {
            if probabilities.len() != labels.len() {
                return Err(ModelError::UnknownClass {
                    index: probabilities.len().saturating_sub(1),
                    classes: labels.len(),
                });
            }
            let total: f64 = probabilities.iter().sum();
            if total <= 0.0 || !total.is_finite() {
                return Ok(ProgramDistribution::default());
            }
            let mut ranked: Vec<(String, f64)> = labels
                .iter()
                .cloned()
                .zip(probabilities.into_iter().map(|value| value / total))
                .collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            Ok(ProgramDistribution::from_ranked(ranked))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["A".into(), "B".into(), "C".into()]
    }

    #[test]
    fn distribution_normalizes_and_sorts() {
        let programs = distribution(Prediction::Probabilities(vec![1.0, 3.0, 0.0]), &labels())
            .expect("valid");
        let ordered: Vec<_> = programs.iter().collect();
        assert_eq!(ordered, vec![("B", 0.75), ("A", 0.25), ("C", 0.0)]);
    }

    #[test]
    fn distribution_ties_keep_label_order() {
        let programs = distribution(Prediction::Probabilities(vec![0.5, 0.5, 0.5]), &labels())
            .expect("valid");
        let codes: Vec<_> = programs.iter().map(|(code, _)| code).collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
    }

    #[test]
    fn zero_mass_yields_empty_mapping() {
        let programs = distribution(Prediction::Probabilities(vec![0.0, 0.0, 0.0]), &labels())
            .expect("valid");
        assert!(programs.is_empty());
    }

    #[test]
    fn hard_class_maps_to_label_at_full_confidence() {
        let programs = distribution(Prediction::Class(2), &labels()).expect("valid");
        assert_eq!(programs.get("C"), Some(1.0));
        assert_eq!(programs.len(), 1);
    }

    #[test]
    fn hard_class_outside_labels_is_an_error() {
        assert!(distribution(Prediction::Class(7), &labels()).is_err());
    }
}
