use super::common::*;

use crate::matching::domain::{
    PriorityLabel, PrioritySignals, RatingKind, RawApplicantProfile, RawScalar, SchoolType,
};
use crate::matching::normalizer::{
    expand_priority_variants, normalize_profile, Pipeline, ValidationError,
};

#[test]
fn normalizes_canonical_fields() {
    let profile = normalize_profile(&raw_profile(), Pipeline::Ranking).expect("valid profile");

    assert_eq!(profile.school_type, SchoolType::Public);
    assert_eq!(profile.province, "Cần Thơ");
    assert_eq!(profile.subject_combination.as_deref(), Some("A00"));
    assert_eq!(profile.industry_group, "714");
    assert_eq!(profile.exam_score, Some(25.0));
    assert_eq!(profile.budget, 45_000_000.0);
    assert_eq!(profile.certificate_name(), Some("IELTS"));
    assert_eq!(profile.certificate_level(), Some("B2"));
    assert_eq!(profile.ratings.get(RatingKind::Conduct12), Some("Tốt"));
    assert_eq!(profile.ratings.get(RatingKind::Academic12), Some("8"));
    assert_eq!(profile.ratings.get(RatingKind::Conduct10), None);
    assert_eq!(profile.priority, PrioritySignals::default());
}

#[test]
fn accepts_numeric_strings_for_school_type_and_amounts() {
    let raw = RawApplicantProfile {
        school_type: text("0"),
        budget: text("30000000"),
        exam_score: text(" 21.75 "),
        industry_group: text("734.0"),
        ..raw_profile()
    };
    let profile = normalize_profile(&raw, Pipeline::Ranking).expect("valid profile");
    assert_eq!(profile.school_type, SchoolType::Private);
    assert_eq!(profile.budget, 30_000_000.0);
    assert_eq!(profile.exam_score, Some(21.75));
    assert_eq!(profile.industry_group, "734");
}

#[test]
fn rejects_school_type_outside_zero_or_one() {
    let raw = RawApplicantProfile {
        school_type: number(2.0),
        ..raw_profile()
    };
    let err = normalize_profile(&raw, Pipeline::Priority).expect_err("invalid flag");
    assert_eq!(err.field(), "school_type");
    assert!(matches!(err, ValidationError::InvalidFlag { .. }));
}

#[test]
fn rejects_negative_budget() {
    let raw = RawApplicantProfile {
        budget: number(-1.0),
        ..raw_profile()
    };
    let err = normalize_profile(&raw, Pipeline::Priority).expect_err("negative budget");
    assert_eq!(
        err,
        ValidationError::OutOfRange {
            field: "budget",
            value: -1.0
        }
    );
}

#[test]
fn rejects_non_numeric_exam_score() {
    let raw = RawApplicantProfile {
        exam_score: text("twenty"),
        ..raw_profile()
    };
    let err = normalize_profile(&raw, Pipeline::Ranking).expect_err("not numeric");
    assert_eq!(err.field(), "exam_score");
}

#[test]
fn ranking_requires_subject_combination_and_exam_score() {
    let raw = RawApplicantProfile {
        subject_combination: Some("  ".to_string()),
        exam_score: None,
        ..raw_profile()
    };
    let err = normalize_profile(&raw, Pipeline::Ranking).expect_err("subject missing");
    assert_eq!(err.field(), "subject_combination");

    let profile = normalize_profile(&raw, Pipeline::Priority).expect("priority does not need it");
    assert_eq!(profile.subject_combination, None);
    assert_eq!(profile.exam_score, None);
}

#[test]
fn both_pipelines_require_province() {
    let raw = RawApplicantProfile {
        province: Some("   ".to_string()),
        ..raw_profile()
    };
    let err = normalize_profile(&raw, Pipeline::Priority).expect_err("province missing");
    assert_eq!(err, ValidationError::MissingField { field: "province" });
}

#[test]
fn certificate_fields_must_be_paired() {
    let raw = RawApplicantProfile {
        certificate_level: Some("none".to_string()),
        ..raw_profile()
    };
    let err = normalize_profile(&raw, Pipeline::Ranking).expect_err("level absent");
    assert_eq!(
        err,
        ValidationError::UnpairedCertificate {
            missing: "certificate_level"
        }
    );

    let raw = RawApplicantProfile {
        certificate_name: Some("0".to_string()),
        certificate_level: Some("".to_string()),
        ..raw_profile()
    };
    let profile = normalize_profile(&raw, Pipeline::Ranking).expect("both absent is fine");
    assert!(profile.certificate.is_none());
}

#[test]
fn priority_flags_must_be_binary() {
    let raw = RawApplicantProfile {
        poor_district: text("yes"),
        ..raw_profile()
    };
    let err = normalize_profile(&raw, Pipeline::Priority).expect_err("not a flag");
    assert_eq!(err.field(), "poor_district");

    let raw = RawApplicantProfile {
        poor_district: Some(RawScalar::Flag(true)),
        ethnic_minority: text(""),
        ..raw_profile()
    };
    let profile = normalize_profile(&raw, Pipeline::Priority).expect("flags coerce");
    assert!(profile.priority.poor_district);
    assert!(!profile.priority.ethnic_minority);
}

#[test]
fn olympiad_placeholders_mean_not_awarded() {
    let raw = RawApplicantProfile {
        olympiad_first_prize: text("0"),
        olympiad_second_prize: text(""),
        olympiad_third_prize: text("Văn"),
        ..raw_profile()
    };
    let profile = normalize_profile(&raw, Pipeline::Priority).expect("valid");
    assert_eq!(
        profile.priority.olympiad_awards,
        [None, None, Some("Văn".to_string())]
    );
    assert_eq!(profile.priority.olympiad_subject(), Some("Văn"));
}

#[test]
fn label_precedence_prefers_olympiad_then_hero_then_minority() {
    let mut signals = PrioritySignals {
        olympiad_awards: [None, Some("Toán".to_string()), None],
        armed_forces_hero: true,
        ethnic_minority: true,
        poor_district: true,
    };
    assert_eq!(
        PriorityLabel::derive(&signals),
        PriorityLabel::Olympiad("Toán".to_string())
    );
    signals.olympiad_awards = Default::default();
    assert_eq!(PriorityLabel::derive(&signals), PriorityLabel::ArmedForcesHero);
    signals.armed_forces_hero = false;
    assert_eq!(PriorityLabel::derive(&signals), PriorityLabel::EthnicMinority);
    signals.ethnic_minority = false;
    assert_eq!(PriorityLabel::derive(&signals), PriorityLabel::PoorDistrict);
    signals.poor_district = false;
    assert_eq!(PriorityLabel::derive(&signals), PriorityLabel::None);
}

#[test]
fn expansion_yields_one_exclusive_variant_per_signal() {
    let raw = RawApplicantProfile {
        poor_district: number(1.0),
        ..raw_with_signals(Some("Toán"), true, true)
    };
    let profile = normalize_profile(&raw, Pipeline::Priority).expect("valid");
    let variants = expand_priority_variants(&profile);

    let labels: Vec<String> = variants
        .iter()
        .map(|variant| PriorityLabel::derive(&variant.priority).to_string())
        .collect();
    assert_eq!(
        labels,
        vec![
            "olympiad:Toán",
            "armed-forces-hero",
            "ethnic-minority",
            "poor-district"
        ]
    );
    assert!(variants
        .iter()
        .all(|variant| variant.priority.active_count() == 1));
    assert!(variants
        .iter()
        .all(|variant| variant.province == profile.province));
}

#[test]
fn expansion_without_signals_yields_single_none_row() {
    let profile = normalize_profile(&raw_profile(), Pipeline::Priority).expect("valid");
    let variants = expand_priority_variants(&profile);
    assert_eq!(variants.len(), 1);
    assert!(PriorityLabel::derive(&variants[0].priority).is_none());
}

#[test]
fn label_round_trips_through_text() {
    for label in [
        PriorityLabel::Olympiad("Hóa".to_string()),
        PriorityLabel::ArmedForcesHero,
        PriorityLabel::None,
    ] {
        let parsed: PriorityLabel = label.to_string().parse().expect("parses");
        assert_eq!(parsed, label);
    }
    assert!("olympiad:".parse::<PriorityLabel>().is_err());
}
