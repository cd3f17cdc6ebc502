use std::sync::Arc;

use tracing::info;

use super::batch::{BatchError, BatchOrchestrator};
use super::candidates::{generate_pairs, Catalog};
use super::domain::{ApplicantProfile, PriorityResult, RawApplicantProfile, ScoredProgram};
use super::errors::{ArtifactError, ModelError};
use super::normalizer::{normalize_profile, Pipeline, ValidationError};
use super::priority::{ClassifierRegistry, PriorityRouter};
use super::provinces::is_province_valid;
use super::ranking::RankingEngine;
use crate::config::{ArtifactConfig, MatchingConfig};

/// Immutable, load-once bundle of every pretrained artifact.
#[derive(Debug)]
pub struct MatchingContext {
    priority: PriorityRouter,
    catalog: Catalog,
    ranking: RankingEngine,
}

impl MatchingContext {
    pub fn new(priority: PriorityRouter, catalog: Catalog, ranking: RankingEngine) -> Self {
        Self {
            priority,
            catalog,
            ranking,
        }
    }

    pub fn load(
        artifacts: &ArtifactConfig,
        config: &MatchingConfig,
    ) -> Result<Self, ArtifactError> {
        let registry = ClassifierRegistry::load(&artifacts.registry_path())?;
        info!(groups = registry.len(), "priority registry loaded");
        let catalog = Catalog::load(&artifacts.catalog_path())?;
        let ranking = RankingEngine::load(&artifacts.ranking_dir(), config.ranking_threshold)?;
        Ok(Self::new(PriorityRouter::new(registry), catalog, ranking))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ranking(&self) -> &RankingEngine {
        &self.ranking
    }

    /// Priority results per variant; an unserved province yields no entries.
    pub fn predict_priority(
        &self,
        profile: &ApplicantProfile,
    ) -> Result<Vec<PriorityResult>, ModelError> {
        if !is_province_valid(&profile.province) {
            return Ok(Vec::new());
        }
        self.priority.route(profile)
    }

    /// Ranked programs for the profile; an unserved province yields no entries.
    pub fn predict_ranking(
        &self,
        profile: &ApplicantProfile,
        threshold: Option<f64>,
    ) -> Result<Vec<ScoredProgram>, ModelError> {
        if !is_province_valid(&profile.province) {
            return Ok(Vec::new());
        }
        let pairs = generate_pairs(profile, &self.catalog);
        self.ranking.rank(profile, &pairs, threshold)
    }
}

/// Request-facing facade: normalizes raw input, then runs one or many profiles.
#[derive(Debug, Clone)]
pub struct MatchingService {
    context: Arc<MatchingContext>,
    batch: BatchOrchestrator,
}

impl MatchingService {
    pub fn new(context: Arc<MatchingContext>, batch: BatchOrchestrator) -> Self {
        Self { context, batch }
    }

    pub fn context(&self) -> &Arc<MatchingContext> {
        &self.context
    }

    pub fn batch(&self) -> &BatchOrchestrator {
        &self.batch
    }

    pub fn priority(
        &self,
        raw: &RawApplicantProfile,
    ) -> Result<Vec<PriorityResult>, MatchingError> {
        let profile = normalize_profile(raw, Pipeline::Priority)?;
        Ok(self.context.predict_priority(&profile)?)
    }

    pub fn ranking(
        &self,
        raw: &RawApplicantProfile,
        threshold: Option<f64>,
    ) -> Result<Vec<ScoredProgram>, MatchingError> {
        let threshold = check_threshold(threshold)?;
        let profile = normalize_profile(raw, Pipeline::Ranking)?;
        Ok(self.context.predict_ranking(&profile, threshold)?)
    }

    pub async fn priority_batch(
        &self,
        raws: Vec<RawApplicantProfile>,
        concurrency: Option<usize>,
    ) -> Result<Vec<Vec<PriorityResult>>, MatchingError> {
        self.batch.admit(raws.len(), concurrency)?;
        let profiles = normalize_all(&raws, Pipeline::Priority)?;
        let context = Arc::clone(&self.context);
        let results = self
            .batch
            .run(
                profiles,
                concurrency,
                |profile| !is_province_valid(&profile.province),
                move |profile| context.predict_priority(&profile),
            )
            .await?;
        Ok(results)
    }

    pub async fn ranking_batch(
        &self,
        raws: Vec<RawApplicantProfile>,
        concurrency: Option<usize>,
        threshold: Option<f64>,
    ) -> Result<Vec<Vec<ScoredProgram>>, MatchingError> {
        self.batch.admit(raws.len(), concurrency)?;
        let threshold = check_threshold(threshold)?;
        let profiles = normalize_all(&raws, Pipeline::Ranking)?;
        let context = Arc::clone(&self.context);
        let results = self
            .batch
            .run(
                profiles,
                concurrency,
                |profile| !is_province_valid(&profile.province),
                move |profile| context.predict_ranking(&profile, threshold),
            )
            .await?;
        Ok(results)
    }
}

fn normalize_all(
    raws: &[RawApplicantProfile],
    pipeline: Pipeline,
) -> Result<Vec<ApplicantProfile>, MatchingError> {
    raws.iter()
        .enumerate()
        .map(|(index, raw)| {
            normalize_profile(raw, pipeline)
                .map_err(|source| MatchingError::ItemValidation { index, source })
        })
        .collect()
}

fn check_threshold(threshold: Option<f64>) -> Result<Option<f64>, MatchingError> {
    match threshold {
        Some(value) if !(0.0..=1.0).contains(&value) => {
            Err(MatchingError::InvalidThreshold(value))
        }
        other => Ok(other),
    }
}

/// Error raised by the matching service.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("item {index}: {source}")]
    ItemValidation {
        index: usize,
        #[source]
        source: ValidationError,
    },
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error("threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error(transparent)]
    Model(#[from] ModelError),
}
