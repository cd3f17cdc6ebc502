//! Admission-program matching: profile normalization, priority routing, candidate
//! generation, ranking, and bounded-concurrency batch dispatch.

pub mod batch;
pub mod candidates;
pub mod domain;
pub mod errors;
pub mod normalizer;
pub mod priority;
pub mod provinces;
pub mod ranking;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use batch::{BatchError, BatchOrchestrator};
pub use candidates::{generate_pairs, parse_rating, Catalog, NEUTRAL_RATING};
pub use domain::{
    AdmissionRequirement, ApplicantProfile, CandidatePair, CatalogKey, Certificate, GroupKey,
    PriorityLabel, PriorityResult, PrioritySignals, ProgramDistribution, RatingKind, Ratings,
    RawApplicantProfile, RawScalar, SchoolType, ScoredProgram,
};
pub use errors::{ArtifactError, ModelError};
pub use normalizer::{expand_priority_variants, normalize_profile, Pipeline, ValidationError};
pub use priority::{ClassifierRegistry, GroupClassifier, GroupModel, PriorityRouter};
pub use provinces::is_province_valid;
pub use ranking::{FeatureSchema, FeatureTable, GradientBoostedTrees, RankingEngine, ScoringModel};
pub use router::{matching_router, BatchRequest};
pub use service::{MatchingContext, MatchingError, MatchingService};
