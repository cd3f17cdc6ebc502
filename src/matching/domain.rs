use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Loosely typed scalar accepted at the request boundary before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl RawScalar {
    pub fn as_text(&self) -> String {
        match self {
            RawScalar::Number(value) => format_number(*value),
            RawScalar::Flag(value) => if *value { "1" } else { "0" }.to_string(),
            RawScalar::Text(value) => value.trim().to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawScalar::Number(value) => Some(*value),
            RawScalar::Flag(value) => Some(if *value { 1.0 } else { 0.0 }),
            RawScalar::Text(value) => value.trim().parse::<f64>().ok(),
        }
    }
}

/// Renders integral values without a fractional part so `714.0` and `"714"` compare equal.
pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Applicant submission exactly as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawApplicantProfile {
    #[serde(default)]
    pub school_type: Option<RawScalar>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub subject_combination: Option<String>,
    #[serde(default)]
    pub exam_score: Option<RawScalar>,
    #[serde(default)]
    pub budget: Option<RawScalar>,
    #[serde(default)]
    pub certificate_name: Option<String>,
    #[serde(default)]
    pub certificate_level: Option<String>,
    #[serde(default)]
    pub conduct_10: Option<RawScalar>,
    #[serde(default)]
    pub conduct_11: Option<RawScalar>,
    #[serde(default)]
    pub conduct_12: Option<RawScalar>,
    #[serde(default)]
    pub academic_10: Option<RawScalar>,
    #[serde(default)]
    pub academic_11: Option<RawScalar>,
    #[serde(default)]
    pub academic_12: Option<RawScalar>,
    #[serde(default)]
    pub industry_group: Option<RawScalar>,
    #[serde(default)]
    pub olympiad_first_prize: Option<RawScalar>,
    #[serde(default)]
    pub olympiad_second_prize: Option<RawScalar>,
    #[serde(default)]
    pub olympiad_third_prize: Option<RawScalar>,
    #[serde(default)]
    pub armed_forces_hero: Option<RawScalar>,
    #[serde(default)]
    pub ethnic_minority: Option<RawScalar>,
    #[serde(default)]
    pub poor_district: Option<RawScalar>,
}

/// Public (state-funded) versus private institutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchoolType {
    Private,
    Public,
}

impl SchoolType {
    pub const fn code(self) -> u8 {
        match self {
            SchoolType::Private => 0,
            SchoolType::Public => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SchoolType::Private),
            1 => Some(SchoolType::Public),
            _ => None,
        }
    }
}

/// Language certificate as a normalized name/level pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub name: String,
    pub level: String,
}

/// The six ordinal ratings tracked per school year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingKind {
    Conduct10,
    Conduct11,
    Conduct12,
    Academic10,
    Academic11,
    Academic12,
}

impl RatingKind {
    pub const ALL: [RatingKind; 6] = [
        RatingKind::Conduct10,
        RatingKind::Conduct11,
        RatingKind::Conduct12,
        RatingKind::Academic10,
        RatingKind::Academic11,
        RatingKind::Academic12,
    ];

    pub const fn slug(self) -> &'static str {
        match self {
            RatingKind::Conduct10 => "conduct_10",
            RatingKind::Conduct11 => "conduct_11",
            RatingKind::Conduct12 => "conduct_12",
            RatingKind::Academic10 => "academic_10",
            RatingKind::Academic11 => "academic_11",
            RatingKind::Academic12 => "academic_12",
        }
    }

    const fn index(self) -> usize {
        match self {
            RatingKind::Conduct10 => 0,
            RatingKind::Conduct11 => 1,
            RatingKind::Conduct12 => 2,
            RatingKind::Academic10 => 3,
            RatingKind::Academic11 => 4,
            RatingKind::Academic12 => 5,
        }
    }
}

/// Rating values kept as supplied text; numeric parsing happens during pair generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings([Option<String>; 6]);

impl Ratings {
    pub fn get(&self, kind: RatingKind) -> Option<&str> {
        self.0[kind.index()].as_deref()
    }

    pub fn set(&mut self, kind: RatingKind, value: Option<String>) {
        self.0[kind.index()] = value;
    }

    pub fn with_optional(mut self, kind: RatingKind, value: Option<String>) -> Self {
        self.set(kind, value);
        self
    }
}

/// Special-admission signals carried by a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySignals {
    /// Olympiad subjects by prize tier (first, second, third); `None` means not awarded.
    pub olympiad_awards: [Option<String>; 3],
    pub armed_forces_hero: bool,
    pub ethnic_minority: bool,
    pub poor_district: bool,
}

impl PrioritySignals {
    /// First awarded olympiad subject in prize order.
    pub fn olympiad_subject(&self) -> Option<&str> {
        self.olympiad_awards.iter().flatten().map(String::as_str).next()
    }

    pub fn active_count(&self) -> usize {
        usize::from(self.olympiad_subject().is_some())
            + usize::from(self.armed_forces_hero)
            + usize::from(self.ethnic_minority)
            + usize::from(self.poor_district)
    }
}

/// Canonical applicant profile produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub school_type: SchoolType,
    pub province: String,
    pub industry_group: String,
    pub subject_combination: Option<String>,
    pub exam_score: Option<f64>,
    pub budget: f64,
    pub certificate: Option<Certificate>,
    pub ratings: Ratings,
    pub priority: PrioritySignals,
}

impl ApplicantProfile {
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            school_type: self.school_type,
            province: self.province.clone(),
            industry_group: self.industry_group.clone(),
        }
    }

    pub fn certificate_name(&self) -> Option<&str> {
        self.certificate.as_ref().map(|cert| cert.name.as_str())
    }

    pub fn certificate_level(&self) -> Option<&str> {
        self.certificate.as_ref().map(|cert| cert.level.as_str())
    }
}

/// Lookup key into the priority classifier registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub school_type: SchoolType,
    pub province: String,
    pub industry_group: String,
}

/// Special-admission category derived from a single profile variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PriorityLabel {
    Olympiad(String),
    ArmedForcesHero,
    EthnicMinority,
    PoorDistrict,
    None,
}

impl PriorityLabel {
    /// Applies the fixed precedence: olympiad, armed-forces hero, ethnic minority, poor district.
    pub fn derive(signals: &PrioritySignals) -> Self {
        if let Some(subject) = signals.olympiad_subject() {
            return PriorityLabel::Olympiad(subject.to_string());
        }
        if signals.armed_forces_hero {
            return PriorityLabel::ArmedForcesHero;
        }
        if signals.ethnic_minority {
            return PriorityLabel::EthnicMinority;
        }
        if signals.poor_district {
            return PriorityLabel::PoorDistrict;
        }
        PriorityLabel::None
    }

    pub fn is_none(&self) -> bool {
        matches!(self, PriorityLabel::None)
    }
}

impl fmt::Display for PriorityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityLabel::Olympiad(subject) => write!(f, "olympiad:{subject}"),
            PriorityLabel::ArmedForcesHero => write!(f, "armed-forces-hero"),
            PriorityLabel::EthnicMinority => write!(f, "ethnic-minority"),
            PriorityLabel::PoorDistrict => write!(f, "poor-district"),
            PriorityLabel::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for PriorityLabel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "armed-forces-hero" => Ok(PriorityLabel::ArmedForcesHero),
            "ethnic-minority" => Ok(PriorityLabel::EthnicMinority),
            "poor-district" => Ok(PriorityLabel::PoorDistrict),
            "none" => Ok(PriorityLabel::None),
            other => other
                .strip_prefix("olympiad:")
                .filter(|subject| !subject.is_empty())
                .map(|subject| PriorityLabel::Olympiad(subject.to_string()))
                .ok_or_else(|| format!("unknown priority label '{other}'")),
        }
    }
}

impl Serialize for PriorityLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PriorityLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Ordered program-code to probability mapping, serialized as a JSON object in rank order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramDistribution(Vec<(String, f64)>);

impl ProgramDistribution {
    pub fn single(program_code: impl Into<String>) -> Self {
        Self(vec![(program_code.into(), 1.0)])
    }

    pub fn from_ranked(entries: Vec<(String, f64)>) -> Self {
        Self(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(code, probability)| (code.as_str(), *probability))
    }

    pub fn get(&self, program_code: &str) -> Option<f64> {
        self.iter()
            .find(|(code, _)| *code == program_code)
            .map(|(_, probability)| probability)
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, probability)| probability).sum()
    }
}

impl Serialize for ProgramDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (code, probability) in &self.0 {
            map.serialize_entry(code, probability)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProgramDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DistributionVisitor;

        impl<'de> Visitor<'de> for DistributionVisitor {
            type Value = ProgramDistribution;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a map of program codes to probabilities")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((code, probability)) = access.next_entry::<String, f64>()? {
                    entries.push((code, probability));
                }
                Ok(ProgramDistribution(entries))
            }
        }

        deserializer.deserialize_map(DistributionVisitor)
    }
}

/// Outcome of the priority pipeline for one profile variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityResult {
    pub label: PriorityLabel,
    pub programs: ProgramDistribution,
}

impl PriorityResult {
    pub fn unserved(label: PriorityLabel) -> Self {
        Self {
            label,
            programs: ProgramDistribution::default(),
        }
    }
}

/// Catalog row describing the requirements of one admission program variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRequirement {
    pub program_code: String,
    pub school_type: SchoolType,
    pub province: String,
    pub subject_combination: String,
    pub industry_group: String,
    pub cutoff_score: Option<f64>,
    pub final_cutoff_score: Option<f64>,
    pub base_score: Option<f64>,
    /// Tuition as stored in the catalog; coerced per pair.
    pub tuition: Option<String>,
    pub certificate_name: Option<String>,
    pub certificate_score: Option<String>,
    pub ratings: Ratings,
    pub is_base_row: bool,
}

/// Hard-match key shared by profiles and catalog rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogKey {
    pub school_type: SchoolType,
    pub province: String,
    pub subject_combination: String,
    pub industry_group: String,
}

impl CatalogKey {
    pub fn for_requirement(requirement: &AdmissionRequirement) -> Self {
        Self {
            school_type: requirement.school_type,
            province: requirement.province.clone(),
            subject_combination: requirement.subject_combination.clone(),
            industry_group: requirement.industry_group.clone(),
        }
    }

    pub fn for_profile(profile: &ApplicantProfile) -> Option<Self> {
        Some(Self {
            school_type: profile.school_type,
            province: profile.province.clone(),
            subject_combination: profile.subject_combination.clone()?,
            industry_group: profile.industry_group.clone(),
        })
    }
}

/// One (applicant, requirement) combination with engineered features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidatePair {
    pub program_code: String,
    pub student_exam_score: Option<f64>,
    pub student_budget: i64,
    pub candidate_final_cutoff: Option<f64>,
    pub candidate_tuition: i64,
    pub candidate_base_score: Option<f64>,
    pub tuition_headroom: i64,
    pub certificate_match: bool,
    /// Required minus actual, in `RatingKind::ALL` order.
    pub rating_differentials: [i64; 6],
    pub student_school_type: SchoolType,
    pub student_province: String,
    pub student_subject_combination: String,
    pub student_certificate_name: Option<String>,
    pub student_certificate_level: Option<String>,
    pub student_industry_group: String,
    pub candidate_school_type: SchoolType,
    pub candidate_province: String,
    pub candidate_subject_combination: String,
    pub candidate_industry_group: String,
    pub candidate_is_base_row: bool,
}

/// Ranked program recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProgram {
    pub program_code: String,
    pub score: f64,
}
