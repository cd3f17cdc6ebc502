use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::matching::domain::{format_number, CandidatePair, RatingKind};
use crate::matching::errors::{read_json, ArtifactError};

/// Vocabulary slot reserved for categories the model never saw.
pub const UNKNOWN_CATEGORY: &str = "__UNK__";

/// A pair attribute before it is constrained to the model schema.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
    Missing,
}

impl FeatureValue {
    fn optional_number(value: Option<f64>) -> Self {
        value.map_or(FeatureValue::Missing, FeatureValue::Number)
    }

    fn optional_category(value: Option<&str>) -> Self {
        value.map_or(FeatureValue::Missing, |text| {
            FeatureValue::Category(text.to_string())
        })
    }

    fn category(value: impl Into<String>) -> Self {
        FeatureValue::Category(value.into())
    }

    fn as_number(&self) -> f64 {
        match self {
            FeatureValue::Number(value) => *value,
            FeatureValue::Category(text) => text.trim().parse().unwrap_or(f64::NAN),
            FeatureValue::Missing => f64::NAN,
        }
    }

    fn as_category(&self) -> Option<String> {
        match self {
            FeatureValue::Number(value) if value.is_nan() => None,
            FeatureValue::Number(value) => Some(format_number(*value)),
            FeatureValue::Category(text) => Some(text.clone()),
            FeatureValue::Missing => None,
        }
    }
}

/// Look up a named feature on a pair; unknown names are missing.
pub fn pair_feature(pair: &CandidatePair, name: &str) -> FeatureValue {
    if let Some(slug) = name.strip_prefix("diff_") {
        return RatingKind::ALL
            .iter()
            .position(|kind| kind.slug() == slug)
            .map_or(FeatureValue::Missing, |slot| {
                FeatureValue::Number(pair.rating_differentials[slot] as f64)
            });
    }

    let flag = |value: bool| if value { "True" } else { "False" };
    match name {
        "student_exam_score" => FeatureValue::optional_number(pair.student_exam_score),
        "student_budget" => FeatureValue::Number(pair.student_budget as f64),
        "candidate_final_cutoff" => FeatureValue::optional_number(pair.candidate_final_cutoff),
        "candidate_tuition" => FeatureValue::Number(pair.candidate_tuition as f64),
        "candidate_base_score" => FeatureValue::optional_number(pair.candidate_base_score),
        "tuition_headroom" => FeatureValue::Number(pair.tuition_headroom as f64),
        "certificate_match" => FeatureValue::Number(f64::from(u8::from(pair.certificate_match))),
        "student_school_type" => FeatureValue::category(pair.student_school_type.code().to_string()),
        "student_province" => FeatureValue::category(pair.student_province.as_str()),
        "student_subject_combination" => {
            FeatureValue::category(pair.student_subject_combination.as_str())
        }
        "student_certificate_name" => {
            FeatureValue::optional_category(pair.student_certificate_name.as_deref())
        }
        "student_certificate_level" => {
            FeatureValue::optional_category(pair.student_certificate_level.as_deref())
        }
        "student_industry_group" => FeatureValue::category(pair.student_industry_group.as_str()),
        "candidate_school_type" => {
            FeatureValue::category(pair.candidate_school_type.code().to_string())
        }
        "candidate_province" => FeatureValue::category(pair.candidate_province.as_str()),
        "candidate_subject_combination" => {
            FeatureValue::category(pair.candidate_subject_combination.as_str())
        }
        "candidate_industry_group" => {
            FeatureValue::category(pair.candidate_industry_group.as_str())
        }
        "candidate_program_code" => FeatureValue::category(pair.program_code.as_str()),
        "candidate_is_base_row" => FeatureValue::category(flag(pair.candidate_is_base_row)),
        _ => FeatureValue::Missing,
    }
}

/// Category-to-code mapping with `__UNK__` fixed at code 0.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryVocabulary {
    values: Vec<String>,
    codes: HashMap<String, usize>,
}

impl CategoryVocabulary {
    /// Stringify, drop nulls, dedupe keeping the first occurrence, then pin `__UNK__` first.
    pub fn clean(raw: &[Value]) -> Self {
        let mut values = vec![UNKNOWN_CATEGORY.to_string()];
        let mut codes = HashMap::from([(UNKNOWN_CATEGORY.to_string(), 0)]);
        for value in raw {
            let text = match value {
                Value::Null => continue,
                Value::String(text) => text.clone(),
                Value::Number(number) => number
                    .as_f64()
                    .map(format_number)
                    .unwrap_or_else(|| number.to_string()),
                Value::Bool(flag) => if *flag { "True" } else { "False" }.to_string(),
                other => other.to_string(),
            };
            if !codes.contains_key(&text) {
                codes.insert(text.clone(), values.len());
                values.push(text);
            }
        }
        Self { values, codes }
    }

    pub fn code(&self, value: Option<&str>) -> usize {
        value
            .and_then(|text| self.codes.get(text).copied())
            .unwrap_or(0)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Ordered feature names plus categorical vocabularies the ranking model was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
    vocabularies: HashMap<String, CategoryVocabulary>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>, raw_vocabularies: HashMap<String, Vec<Value>>) -> Self {
        let vocabularies = raw_vocabularies
            .into_iter()
            .map(|(feature, raw)| {
                let vocabulary = CategoryVocabulary::clean(&raw);
                (feature, vocabulary)
            })
            .collect();
        Self {
            names,
            vocabularies,
        }
    }

    pub fn load(ranking_dir: &Path) -> Result<Self, ArtifactError> {
        let names: Vec<String> = read_json(&ranking_dir.join("feature_names.json"))?;
        let vocab_path = ranking_dir.join("cat_vocab.json");
        let raw: HashMap<String, Vec<Value>> = read_json(&vocab_path)?;
        if names.is_empty() {
            return Err(ArtifactError::schema(
                &ranking_dir.join("feature_names.json"),
                "feature list is empty",
            ));
        }
        Ok(Self::new(names, raw))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn vocabulary(&self, feature: &str) -> Option<&CategoryVocabulary> {
        self.vocabularies.get(feature)
    }

    /// Build the dense model input: categorical columns hold vocabulary codes, others numbers.
    pub fn assemble(&self, pairs: &[CandidatePair]) -> FeatureTable {
        let columns: Vec<(&str, Option<&CategoryVocabulary>)> = self
            .names
            .iter()
            .map(|name| (name.as_str(), self.vocabularies.get(name)))
            .collect();

        let rows = pairs
            .iter()
            .map(|pair| {
                columns
                    .iter()
                    .map(|(name, vocabulary)| {
                        let value = pair_feature(pair, name);
                        match vocabulary {
                            Some(vocabulary) => {
                                vocabulary.code(value.as_category().as_deref()) as f64
                            }
                            None => value.as_number(),
                        }
                    })
                    .collect()
            })
            .collect();

        FeatureTable {
            width: self.names.len(),
            rows,
        }
    }
}

/// Dense row-major model input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    width: usize,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    pub fn from_rows(width: usize, rows: Vec<Vec<f64>>) -> Self {
        Self { width, rows }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(Vec::as_slice)
    }
}
