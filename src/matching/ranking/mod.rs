pub mod discount;
pub mod features;
pub mod model;

pub use discount::{apply_discount_rule, has_cefr, is_discount_program, DiscountApplicant};
pub use features::{
    pair_feature, CategoryVocabulary, FeatureSchema, FeatureTable, FeatureValue, UNKNOWN_CATEGORY,
};
pub use model::{GradientBoostedTrees, ScoringModel, TreeNode};

use std::path::Path;

use tracing::{debug, info};

use super::domain::{ApplicantProfile, CandidatePair, ScoredProgram};
use super::errors::{ArtifactError, ModelError};

/// Scores candidate pairs and applies the threshold, dedup and discount rules.
#[derive(Debug)]
pub struct RankingEngine {
    schema: FeatureSchema,
    model: Box<dyn ScoringModel>,
    default_threshold: f64,
}

impl RankingEngine {
    /// Pairs a schema with a model; `None` when their feature counts disagree.
    pub fn new(
        schema: FeatureSchema,
        model: Box<dyn ScoringModel>,
        default_threshold: f64,
    ) -> Option<Self> {
        (schema.width() == model.feature_count()).then_some(Self {
            schema,
            model,
            default_threshold,
        })
    }

    pub fn load(ranking_dir: &Path, default_threshold: f64) -> Result<Self, ArtifactError> {
        let schema = FeatureSchema::load(ranking_dir)?;
        let model_path = ranking_dir.join("model.json");
        let model = GradientBoostedTrees::load(&model_path)?;
        let trees = model.tree_count();
        let engine = Self::new(schema, Box::new(model), default_threshold).ok_or_else(|| {
            ArtifactError::schema(
                &model_path,
                "feature_count does not match feature_names.json",
            )
        })?;
        info!(
            path = %ranking_dir.display(),
            features = engine.schema.width(),
            trees,
            "ranking model loaded"
        );
        Ok(engine)
    }

    pub fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Score every pair in one model call and return the surviving programs, best first.
    pub fn rank(
        &self,
        profile: &ApplicantProfile,
        pairs: &[CandidatePair],
        threshold: Option<f64>,
    ) -> Result<Vec<ScoredProgram>, ModelError> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }

        let table = self.schema.assemble(pairs);
        let scores = self.model.predict(&table)?;
        if scores.len() != pairs.len() {
            return Err(ModelError::ScoreCountMismatch {
                expected: pairs.len(),
                found: scores.len(),
            });
        }

        let threshold = threshold.unwrap_or(self.default_threshold);
        let mut kept: Vec<ScoredProgram> = pairs
            .iter()
            .zip(scores)
            .filter(|(_, score)| *score >= threshold)
            .map(|(pair, score)| ScoredProgram {
                program_code: pair.program_code.clone(),
                score,
            })
            .collect();
        kept.sort_by(|a, b| b.score.total_cmp(&a.score));
        let ranked = dedup_by_program(kept);

        let applicant = DiscountApplicant {
            exam_score: profile.exam_score.unwrap_or(0.0),
            budget: profile.budget,
            certificate_level: profile.certificate_level(),
        };
        let results = apply_discount_rule(ranked, applicant);
        debug!(
            pairs = pairs.len(),
            kept = results.len(),
            threshold,
            "ranking complete"
        );
        Ok(results)
    }
}

/// Keep the first occurrence of each program code; input must already be sorted best first.
pub fn dedup_by_program(sorted: Vec<ScoredProgram>) -> Vec<ScoredProgram> {
    let mut seen = std::collections::HashSet::new();
    sorted
        .into_iter()
        .filter(|result| seen.insert(result.program_code.clone()))
        .collect()
}
