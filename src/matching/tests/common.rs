use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::response::Response;
use axum::Router;
use serde_json::Value;

use crate::config::{ArtifactConfig, MatchingConfig};
use crate::matching::batch::BatchOrchestrator;
use crate::matching::domain::{RawApplicantProfile, RawScalar};
use crate::matching::errors::ModelError;
use crate::matching::ranking::{FeatureSchema, FeatureTable, ScoringModel};
use crate::matching::service::{MatchingContext, MatchingService};
use crate::matching::{matching_router, Catalog};

pub(super) fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

pub(super) fn artifacts() -> ArtifactConfig {
    let root = fixtures_dir();
    ArtifactConfig {
        model_dir: root.join("models"),
        data_dir: root.join("data"),
        catalog_file: "admission_requirements.csv".to_string(),
    }
}

pub(super) fn matching_config() -> MatchingConfig {
    MatchingConfig {
        ranking_threshold: 0.5,
        batch_max_items: 4,
        max_batch_concurrency: 2,
    }
}

pub(super) fn context() -> Arc<MatchingContext> {
    Arc::new(
        MatchingContext::load(&artifacts(), &matching_config()).expect("fixture artifacts load"),
    )
}

pub(super) fn service() -> MatchingService {
    MatchingService::new(
        context(),
        BatchOrchestrator::from_config(&matching_config()),
    )
}

pub(super) fn router() -> Router {
    matching_router(Arc::new(service()))
}

pub(super) fn catalog() -> Catalog {
    Catalog::load(&artifacts().catalog_path()).expect("fixture catalog loads")
}

pub(super) fn text(value: &str) -> Option<RawScalar> {
    Some(RawScalar::Text(value.to_string()))
}

pub(super) fn number(value: f64) -> Option<RawScalar> {
    Some(RawScalar::Number(value))
}

/// Public-school applicant in Cần Thơ with no priority signals.
pub(super) fn raw_profile() -> RawApplicantProfile {
    RawApplicantProfile {
        school_type: number(1.0),
        province: Some(" Cần Thơ ".to_string()),
        subject_combination: Some("a00".to_string()),
        exam_score: number(25.0),
        budget: number(45_000_000.0),
        certificate_name: Some("ielts".to_string()),
        certificate_level: Some("b2".to_string()),
        conduct_12: text("Tốt"),
        academic_12: number(8.0),
        industry_group: number(714.0),
        ..RawApplicantProfile::default()
    }
}

pub(super) fn raw_with_signals(
    olympiad: Option<&str>,
    hero: bool,
    ethnic: bool,
) -> RawApplicantProfile {
    let flag = |value: bool| number(if value { 1.0 } else { 0.0 });
    RawApplicantProfile {
        olympiad_first_prize: olympiad.and_then(text),
        armed_forces_hero: flag(hero),
        ethnic_minority: flag(ethnic),
        ..raw_profile()
    }
}

/// Model returning a fixed score per row, in order.
#[derive(Debug)]
pub(super) struct ScriptedModel {
    pub(super) width: usize,
    pub(super) scores: Vec<f64>,
}

impl ScoringModel for ScriptedModel {
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>, ModelError> {
        if table.width() != self.width {
            return Err(ModelError::WidthMismatch {
                expected: self.width,
                found: table.width(),
            });
        }
        Ok(self.scores.iter().copied().take(table.len()).collect())
    }

    fn feature_count(&self) -> usize {
        self.width
    }
}

pub(super) fn small_schema() -> FeatureSchema {
    FeatureSchema::new(
        vec![
            "student_exam_score".to_string(),
            "candidate_program_code".to_string(),
        ],
        [(
            "candidate_program_code".to_string(),
            vec![Value::from("CTU7140201")],
        )]
        .into_iter()
        .collect(),
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
