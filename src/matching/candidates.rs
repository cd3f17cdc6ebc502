use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use super::domain::{
    format_number, AdmissionRequirement, ApplicantProfile, CandidatePair, CatalogKey, RatingKind,
    Ratings, SchoolType,
};
use super::errors::ArtifactError;

/// Differential baseline for ratings that are missing, unparseable or zero.
pub const NEUTRAL_RATING: i64 = 10;

static RATING_TOKEN: OnceLock<Regex> = OnceLock::new();

fn rating_token() -> &'static Regex {
    RATING_TOKEN.get_or_init(|| Regex::new(r"(\d+\.?\d*)").expect("rating pattern compiles"))
}

/// First numeric token of a free-text rating, truncated; zero and absence read as neutral.
pub fn parse_rating(value: Option<&str>) -> i64 {
    value
        .and_then(|text| rating_token().captures(text))
        .and_then(|captures| captures.get(1))
        .and_then(|token| token.as_str().parse::<f64>().ok())
        .filter(|parsed| *parsed != 0.0)
        .map(|parsed| parsed.trunc() as i64)
        .unwrap_or(NEUTRAL_RATING)
}

/// Admission requirement catalog, indexed by hard-match key.
#[derive(Debug, Default)]
pub struct Catalog {
    by_key: HashMap<CatalogKey, Vec<AdmissionRequirement>>,
    rows: usize,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let file = std::fs::File::open(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_reader(file, path)?;
        info!(
            path = %path.display(),
            rows = catalog.len(),
            keys = catalog.by_key.len(),
            "admission catalog loaded"
        );
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<Self, ArtifactError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut catalog = Self::default();

        for (index, record) in csv_reader.deserialize::<CatalogRow>().enumerate() {
            let row = record.map_err(|source| ArtifactError::Csv {
                path: origin.to_path_buf(),
                source,
            })?;
            let requirement = row.into_requirement().map_err(|reason| {
                ArtifactError::schema(origin, format!("row {}: {reason}", index + 1))
            })?;
            catalog.insert(requirement);
        }

        Ok(catalog)
    }

    pub fn from_requirements(requirements: impl IntoIterator<Item = AdmissionRequirement>) -> Self {
        let mut catalog = Self::default();
        for requirement in requirements {
            catalog.insert(requirement);
        }
        catalog
    }

    fn insert(&mut self, requirement: AdmissionRequirement) {
        self.by_key
            .entry(CatalogKey::for_requirement(&requirement))
            .or_default()
            .push(requirement);
        self.rows += 1;
    }

    /// Rows matching the key exactly, in catalog order.
    pub fn candidates(&self, key: &CatalogKey) -> &[AdmissionRequirement] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Cross the profile with every hard-matching catalog row.
pub fn generate_pairs(profile: &ApplicantProfile, catalog: &Catalog) -> Vec<CandidatePair> {
    let Some(key) = CatalogKey::for_profile(profile) else {
        return Vec::new();
    };

    let student_ratings = RatingKind::ALL.map(|kind| parse_rating(profile.ratings.get(kind)));
    let student_budget = profile.budget.trunc() as i64;
    let student_certificate = profile.certificate_name();

    let pairs: Vec<CandidatePair> = catalog
        .candidates(&key)
        .iter()
        .map(|requirement| {
            let mut rating_differentials = [0_i64; 6];
            for (slot, kind) in RatingKind::ALL.into_iter().enumerate() {
                rating_differentials[slot] =
                    parse_rating(requirement.ratings.get(kind)) - student_ratings[slot];
            }
            let candidate_tuition = coerce_tuition(requirement.tuition.as_deref());

            CandidatePair {
                program_code: requirement.program_code.clone(),
                student_exam_score: profile.exam_score,
                student_budget,
                candidate_final_cutoff: requirement.final_cutoff_score,
                candidate_tuition,
                candidate_base_score: requirement.base_score.or(requirement.cutoff_score),
                tuition_headroom: student_budget - candidate_tuition,
                certificate_match: matches!(
                    (student_certificate, requirement.certificate_name.as_deref()),
                    (Some(student), Some(required)) if student.eq_ignore_ascii_case(required)
                ),
                rating_differentials,
                student_school_type: profile.school_type,
                student_province: profile.province.clone(),
                student_subject_combination: key.subject_combination.clone(),
                student_certificate_name: student_certificate.map(str::to_string),
                student_certificate_level: profile.certificate_level().map(str::to_string),
                student_industry_group: profile.industry_group.clone(),
                candidate_school_type: requirement.school_type,
                candidate_province: requirement.province.clone(),
                candidate_subject_combination: requirement.subject_combination.clone(),
                candidate_industry_group: requirement.industry_group.clone(),
                candidate_is_base_row: requirement.is_base_row,
            }
        })
        .collect();

    debug!(pairs = pairs.len(), "candidate pairs generated");
    pairs
}

fn coerce_tuition(value: Option<&str>) -> i64 {
    value
        .and_then(|text| text.trim().parse::<f64>().ok())
        .filter(|parsed| parsed.is_finite())
        .map(|parsed| parsed.trunc().max(0.0) as i64)
        .unwrap_or(0)
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    program_code: String,
    school_type: String,
    province: String,
    subject_combination: String,
    industry_group: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    cutoff_score: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    final_cutoff_score: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    base_score: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    tuition: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    certificate_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    certificate_score: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    conduct_10: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    conduct_11: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    conduct_12: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    academic_10: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    academic_11: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    academic_12: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    is_base_row: Option<String>,
}

impl CatalogRow {
    fn into_requirement(self) -> Result<AdmissionRequirement, String> {
        let school_type = self
            .school_type
            .parse::<f64>()
            .ok()
            .filter(|code| *code == 0.0 || *code == 1.0)
            .and_then(|code| SchoolType::from_code(code as u8))
            .ok_or_else(|| format!("school_type '{}' is not 0 or 1", self.school_type))?;

        if self.program_code.is_empty() {
            return Err("program_code is empty".to_string());
        }

        let ratings = Ratings::default()
            .with_optional(RatingKind::Conduct10, self.conduct_10)
            .with_optional(RatingKind::Conduct11, self.conduct_11)
            .with_optional(RatingKind::Conduct12, self.conduct_12)
            .with_optional(RatingKind::Academic10, self.academic_10)
            .with_optional(RatingKind::Academic11, self.academic_11)
            .with_optional(RatingKind::Academic12, self.academic_12);

        Ok(AdmissionRequirement {
            program_code: self.program_code,
            school_type,
            province: self.province,
            subject_combination: self.subject_combination.to_uppercase(),
            industry_group: canonical_group(&self.industry_group),
            cutoff_score: numeric(self.cutoff_score.as_deref()),
            final_cutoff_score: numeric(self.final_cutoff_score.as_deref()),
            base_score: numeric(self.base_score.as_deref()),
            tuition: self.tuition,
            certificate_name: self.certificate_name.map(|name| name.to_uppercase()),
            certificate_score: self.certificate_score,
            ratings,
            is_base_row: self
                .is_base_row
                .as_deref()
                .map(|value| {
                    matches!(
                        value.to_ascii_lowercase().as_str(),
                        "1" | "1.0" | "true" | "yes"
                    )
                })
                .unwrap_or(false),
        })
    }
}

fn numeric(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|text| text.parse::<f64>().ok())
        .filter(|parsed| parsed.is_finite())
}

fn canonical_group(value: &str) -> String {
    match value.parse::<f64>() {
        Ok(number) if value.contains('.') && number.fract() == 0.0 => format_number(number),
        _ => value.to_string(),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
