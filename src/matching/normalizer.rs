use serde::{Deserialize, Serialize};

use super::domain::{
    format_number, ApplicantProfile, Certificate, PrioritySignals, RatingKind, Ratings, RawScalar,
    RawApplicantProfile, SchoolType,
};

/// Which downstream pipeline a profile is being prepared for; drives required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    Priority,
    Ranking,
}

/// Caller-fault problems found while normalizing a raw profile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("field `{field}` is required")]
    MissingField { field: &'static str },
    #[error("field `{field}` must be numeric, found '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field `{field}` must be a non-negative finite number, found {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("field `{field}` must be 0 or 1, found '{value}'")]
    InvalidFlag { field: &'static str, value: String },
    #[error("certificate name and level must be supplied together (`{missing}` is missing)")]
    UnpairedCertificate { missing: &'static str },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::InvalidNumber { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFlag { field, .. } => field,
            ValidationError::UnpairedCertificate { missing } => missing,
        }
    }
}

const ABSENT_CERTIFICATE_VALUES: [&str; 3] = ["", "0", "NONE"];

/// Convert a raw submission into a canonical profile for the given pipeline.
pub fn normalize_profile(
    raw: &RawApplicantProfile,
    pipeline: Pipeline,
) -> Result<ApplicantProfile, ValidationError> {
    let school_type = school_type(raw.school_type.as_ref())?;

    let province = raw
        .province
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingField { field: "province" })?
        .to_string();

    let budget = non_negative("budget", raw.budget.as_ref())?
        .ok_or(ValidationError::MissingField { field: "budget" })?;

    let industry_group = raw
        .industry_group
        .as_ref()
        .map(industry_group_code)
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingField {
            field: "industry_group",
        })?;

    let subject_combination = raw
        .subject_combination
        .as_deref()
        .map(|value| value.trim().to_uppercase())
        .filter(|value| !value.is_empty());
    let exam_score = non_negative("exam_score", raw.exam_score.as_ref())?;

    if pipeline == Pipeline::Ranking {
        if subject_combination.is_none() {
            return Err(ValidationError::MissingField {
                field: "subject_combination",
            });
        }
        if exam_score.is_none() {
            return Err(ValidationError::MissingField {
                field: "exam_score",
            });
        }
    }

    let certificate = certificate(
        raw.certificate_name.as_deref(),
        raw.certificate_level.as_deref(),
    )?;

    let mut ratings = Ratings::default();
    for (kind, value) in [
        (RatingKind::Conduct10, &raw.conduct_10),
        (RatingKind::Conduct11, &raw.conduct_11),
        (RatingKind::Conduct12, &raw.conduct_12),
        (RatingKind::Academic10, &raw.academic_10),
        (RatingKind::Academic11, &raw.academic_11),
        (RatingKind::Academic12, &raw.academic_12),
    ] {
        ratings.set(kind, value.as_ref().map(RawScalar::as_text));
    }

    let priority = PrioritySignals {
        olympiad_awards: [
            olympiad_subject(raw.olympiad_first_prize.as_ref()),
            olympiad_subject(raw.olympiad_second_prize.as_ref()),
            olympiad_subject(raw.olympiad_third_prize.as_ref()),
        ],
        armed_forces_hero: flag("armed_forces_hero", raw.armed_forces_hero.as_ref())?,
        ethnic_minority: flag("ethnic_minority", raw.ethnic_minority.as_ref())?,
        poor_district: flag("poor_district", raw.poor_district.as_ref())?,
    };

    Ok(ApplicantProfile {
        school_type,
        province,
        industry_group,
        subject_combination,
        exam_score,
        budget,
        certificate,
        ratings,
        priority,
    })
}

/// Split a profile into rows that each carry exactly one priority signal.
///
/// Rows come out as olympiad, armed-forces hero, ethnic minority, poor district; a profile
/// with no active signal yields a single row with every signal cleared.
pub fn expand_priority_variants(profile: &ApplicantProfile) -> Vec<ApplicantProfile> {
    let signals = &profile.priority;
    let mut variants = Vec::with_capacity(signals.active_count().max(1));

    let variant = |priority: PrioritySignals| ApplicantProfile {
        priority,
        ..profile.clone()
    };

    if let Some(position) = signals
        .olympiad_awards
        .iter()
        .position(|award| award.is_some())
    {
        let mut olympiad_awards: [Option<String>; 3] = Default::default();
        olympiad_awards[position] = signals.olympiad_awards[position].clone();
        variants.push(variant(PrioritySignals {
            olympiad_awards,
            ..PrioritySignals::default()
        }));
    }
    if signals.armed_forces_hero {
        variants.push(variant(PrioritySignals {
            armed_forces_hero: true,
            ..PrioritySignals::default()
        }));
    }
    if signals.ethnic_minority {
        variants.push(variant(PrioritySignals {
            ethnic_minority: true,
            ..PrioritySignals::default()
        }));
    }
    if signals.poor_district {
        variants.push(variant(PrioritySignals {
            poor_district: true,
            ..PrioritySignals::default()
        }));
    }
    if variants.is_empty() {
        variants.push(variant(PrioritySignals::default()));
    }

    variants
}

fn school_type(value: Option<&RawScalar>) -> Result<SchoolType, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField {
        field: "school_type",
    })?;
    let code = value.as_number().ok_or_else(|| ValidationError::InvalidFlag {
        field: "school_type",
        value: value.as_text(),
    })?;
    match code {
        c if c == 0.0 => Ok(SchoolType::Private),
        c if c == 1.0 => Ok(SchoolType::Public),
        _ => Err(ValidationError::InvalidFlag {
            field: "school_type",
            value: value.as_text(),
        }),
    }
}

fn non_negative(
    field: &'static str,
    value: Option<&RawScalar>,
) -> Result<Option<f64>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if matches!(value, RawScalar::Text(text) if text.trim().is_empty()) {
        return Ok(None);
    }
    let number = match value {
        RawScalar::Flag(_) => None,
        other => other.as_number(),
    }
    .ok_or_else(|| ValidationError::InvalidNumber {
        field,
        value: value.as_text(),
    })?;

    if !number.is_finite() || number < 0.0 {
        return Err(ValidationError::OutOfRange {
            field,
            value: number,
        });
    }
    Ok(Some(number))
}

fn flag(field: &'static str, value: Option<&RawScalar>) -> Result<bool, ValidationError> {
    let Some(value) = value else {
        return Ok(false);
    };
    if matches!(value, RawScalar::Text(text) if text.trim().is_empty()) {
        return Ok(false);
    }
    match value.as_number() {
        Some(code) if code == 0.0 => Ok(false),
        Some(code) if code == 1.0 => Ok(true),
        _ => Err(ValidationError::InvalidFlag {
            field,
            value: value.as_text(),
        }),
    }
}

fn industry_group_code(value: &RawScalar) -> String {
    match value {
        RawScalar::Text(text) if text.contains('.') => match text.trim().parse::<f64>() {
            Ok(number) if number.fract() == 0.0 => format_number(number),
            _ => text.trim().to_string(),
        },
        other => other.as_text(),
    }
}

fn olympiad_subject(value: Option<&RawScalar>) -> Option<String> {
    let subject = value?.as_text();
    let lowered = subject.to_ascii_lowercase();
    match lowered.as_str() {
        "" | "0" | "unk" | "none" | "nan" => None,
        _ => Some(subject),
    }
}

fn certificate(
    name: Option<&str>,
    level: Option<&str>,
) -> Result<Option<Certificate>, ValidationError> {
    let clean = |value: Option<&str>| {
        value
            .map(|raw| raw.trim().to_uppercase())
            .filter(|value| !ABSENT_CERTIFICATE_VALUES.contains(&value.as_str()))
    };

    match (clean(name), clean(level)) {
        (Some(name), Some(level)) => Ok(Some(Certificate { name, level })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ValidationError::UnpairedCertificate {
            missing: "certificate_level",
        }),
        (None, Some(_)) => Err(ValidationError::UnpairedCertificate {
            missing: "certificate_name",
        }),
    }
}
