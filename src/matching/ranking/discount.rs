use std::sync::OnceLock;

use regex::Regex;

use crate::matching::domain::ScoredProgram;

static CEFR_TOKEN: OnceLock<Regex> = OnceLock::new();

fn cefr_token() -> &'static Regex {
    CEFR_TOKEN
        .get_or_init(|| Regex::new(r"(?i)\b(A1|A2|B1|B2|C1|C2)\b").expect("cefr pattern compiles"))
}

/// Only programs whose code starts with `UEF` and ends with `THPTQG` are tiered.
pub fn is_discount_program(program_code: &str) -> bool {
    program_code.starts_with("UEF") && program_code.ends_with("THPTQG")
}

/// Whether the certificate level names one of `targets`.
///
/// A whole-word CEFR token decides on its own; substring containment is only the fallback.
pub fn has_cefr(level: Option<&str>, targets: &[&str]) -> bool {
    let Some(level) = level.filter(|value| !value.is_empty()) else {
        return false;
    };
    let upper = level.to_uppercase();
    match cefr_token().captures(&upper).and_then(|captures| captures.get(1)) {
        Some(token) => targets
            .iter()
            .any(|target| target.eq_ignore_ascii_case(token.as_str())),
        None => targets
            .iter()
            .any(|target| upper.contains(&target.to_uppercase())),
    }
}

/// Applicant attributes the tier rule reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscountApplicant<'a> {
    pub exam_score: f64,
    pub budget: f64,
    pub certificate_level: Option<&'a str>,
}

impl DiscountApplicant<'_> {
    pub fn qualifies(&self) -> bool {
        let score = self.exam_score;
        let budget = self.budget;
        let level = self.certificate_level;

        let tier1 = ((21.0..24.0).contains(&score) || has_cefr(level, &["A2"]))
            && budget >= 60_000_000.0;
        let tier2 = ((24.0..27.0).contains(&score) || has_cefr(level, &["B1", "B2"]))
            && budget >= 40_000_000.0;
        let tier3 =
            ((27.0..=30.0).contains(&score) || has_cefr(level, &["C1", "C2"])) && budget >= 0.0;

        tier1 || tier2 || tier3
    }
}

/// Drop tiered programs the applicant is not eligible for; others pass through in order.
pub fn apply_discount_rule(
    results: Vec<ScoredProgram>,
    applicant: DiscountApplicant<'_>,
) -> Vec<ScoredProgram> {
    let eligible = applicant.qualifies();
    results
        .into_iter()
        .filter(|result| eligible || !is_discount_program(&result.program_code))
        .collect()
}
