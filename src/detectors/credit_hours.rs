//! Explicit credit-hour declarations ("4 credits", "Credit Hours: 3").
//!
//! The earliest acceptable declaration near the top of the document wins
//! and is reported exactly as written.

use std::sync::LazyLock;

use anyhow::Result;
use log::debug;
use regex::Regex;

use super::{FieldDetector, calibration_for};
use crate::engine::calibrate::Calibration;
use crate::engine::rules::{PatternRule, RuleSpec};
use crate::engine::{DetectionResult, Document, FieldOverrides, calibrate, evidence_line};
use crate::models::FieldName;
use crate::utils::text::around;

const SEARCH_CHARS: usize = 5000;
const CONTEXT_BEFORE: usize = 30;
const CONTEXT_AFTER: usize = 100;
const MAX_CREDITS: f64 = 12.0;

const RULES: &[RuleSpec] = &[
    RuleSpec::new("credits", r"(?i)\d+(?:\.\d+)?\s*credits?\b", 0.9),
    RuleSpec::new("parenthesized_credit_hour", r"(?i)\(\d+(?:\.\d+)?\s*credits?\s+hours?\s*\)", 0.9),
    RuleSpec::new("hyphenated_credit", r"(?i)\d+(?:\.\d+)?-credits?\b", 0.9),
    RuleSpec::new("credits_label", r"(?i)\bcredits?:\s*\d+(?:\.\d+)?\b", 0.95),
    RuleSpec::new("variable_credits", r"(?i)\bvariable\s+credits\s*\d+\s*-\s*\d+\b", 0.9),
    RuleSpec::new("credit_hours_label", r"(?i)\bcredit\s+hours?:\s*\d+(?:\.\d+)?\b", 0.95),
    RuleSpec::new("credit_course", r"(?i)\d+(?:\.\d+)?\s*credit\s+(?:hours?|course)\b", 0.9),
    RuleSpec::new(
        "worded_credit_hours",
        r"(?i)\ban?\s+(?:zero|one|two|three|four|five|six|\d+)[-\s]?credits?\s+hours?\b",
        0.85,
    ),
    RuleSpec::new("cr_abbreviation", r"(?i)\d+(?:\.\d+)?\s*cr\b\.?", 0.75),
];

const PREREQUISITE_WORDS: &[&str] = &[
    "prerequisite",
    "prereq",
    "corequisite",
    "co-requisite",
    "must have completed",
    "required before",
    "prior to taking",
    "must complete",
    "completion of",
    "before taking",
];

const REPEAT_WORDS: &[&str] = &[
    "may be repeated",
    "can be repeated",
    "maximum of",
    "may be retaken",
    "up to",
    "for a maximum",
];

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

#[derive(Debug, Clone, PartialEq)]
struct Declaration {
    start: usize,
    rule: usize,
    text: String,
    weight: f64,
}

/// Why a match is not a credit declaration for this course.
fn rejection(context: &str, matched: &str) -> Option<&'static str> {
    let context = context.to_lowercase();
    if PREREQUISITE_WORDS.iter().any(|w| context.contains(w)) {
        return Some("prerequisite");
    }
    if REPEAT_WORDS.iter().any(|w| context.contains(w)) {
        return Some("repeat_or_maximum");
    }
    let too_large = NUMBER_RE
        .find(matched)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .is_some_and(|n| n > MAX_CREDITS);
    too_large.then_some("out_of_range")
}

/// Credit hours extractor.
#[derive(Debug, Clone)]
pub struct CreditHoursDetector {
    rules: Vec<PatternRule>,
    calibration: Calibration,
}

impl CreditHoursDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        let field = FieldName::CreditHours;
        Ok(Self {
            rules: RULES
                .iter()
                .map(|spec| PatternRule::compile(field.as_ref(), spec))
                .collect::<Result<Vec<_>>>()?,
            calibration: calibration_for(field, Calibration::default(), overrides)?,
        })
    }

    fn declarations(&self, head: &str) -> Vec<Declaration> {
        let mut found = Vec::new();
        for (index, rule) in self.rules.iter().enumerate() {
            for m in rule.regex.find_iter(head) {
                let context = around(head, m.start(), m.end(), CONTEXT_BEFORE, CONTEXT_AFTER);
                if let Some(reason) = rejection(context, m.as_str()) {
                    debug!("credit_hours: skipping {:?}: {reason}", m.as_str());
                    continue;
                }
                found.push(Declaration {
                    start: m.start(),
                    rule: index,
                    text: m.as_str().trim().to_string(),
                    weight: rule.weight,
                });
            }
        }
        found.sort_by_key(|d| (d.start, d.rule));
        found
    }
}

impl FieldDetector for CreditHoursDetector {
    fn field(&self) -> FieldName {
        FieldName::CreditHours
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let head = doc.head(SEARCH_CHARS);
        let Some(best) = self.declarations(head).into_iter().next() else {
            return Ok(DetectionResult::not_found());
        };
        let line = head[..best.start].matches('\n').count();
        Ok(DetectionResult::found(
            best.text,
            calibrate(best.weight, &self.calibration),
            vec![
                evidence_line(doc, line),
                format!("rule: {}", self.rules[best.rule].label),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> DetectionResult {
        CreditHoursDetector::new(None)
            .unwrap()
            .detect(&Document::new(text))
            .unwrap()
    }

    #[test]
    fn test_earliest_declaration() {
        let result = detect("COMP 405 (4 credits)\nCredit Hours: 3");
        assert_eq!(result.content.as_deref(), Some("4 credits"));
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.evidence[1], "rule: credits");
    }

    #[test]
    fn test_label_form() {
        let result = detect("Course: Networks\nCredit Hours: 3\n");
        assert_eq!(result.content.as_deref(), Some("Credit Hours: 3"));
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_prerequisite_context_rejected() {
        let result = detect("Prerequisite: COMP 400 (4 credits) with a C or better.");
        assert!(!result.found);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(!detect("Graduation requires 128 credits overall.").found);
    }

    #[test]
    fn test_repeat_context_rejected() {
        assert!(!detect("This course may be repeated for 6 credits in total.").found);
    }

    #[test]
    fn test_hyphenated() {
        let result = detect("This is a 3-credit course.");
        assert_eq!(result.content.as_deref(), Some("3-credit"));
    }
}
