//! Workload and engaged-time declarations ("minimum 3 hours of engaged time
//! per week per credit over a 15-week semester").
//!
//! Matching runs over the whitespace-collapsed text so declarations that wrap
//! across lines still match. Boilerplate wording copied from institutional
//! policy ranks after course-specific wording; within a rank the earliest
//! declaration wins.

use anyhow::Result;
use log::debug;
use strum::Display;

use super::{FieldDetector, calibration_for};
use crate::engine::calibrate::Calibration;
use crate::engine::rules::{PatternRule, RuleSpec};
use crate::engine::{DetectionResult, Document, FieldOverrides, calibrate, evidence_line};
use crate::models::FieldName;

const SEARCH_CHARS: usize = 30_000;
const SPECIFIC: f64 = 0.9;
const BOILERPLATE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[strum(serialize_all = "snake_case")]
enum Wording {
    Specific,
    Boilerplate,
}

const fn specific(label: &'static str, pattern: &'static str) -> (Wording, RuleSpec) {
    (Wording::Specific, RuleSpec::new(label, pattern, SPECIFIC))
}

const fn boilerplate(label: &'static str, pattern: &'static str) -> (Wording, RuleSpec) {
    (Wording::Boilerplate, RuleSpec::new(label, pattern, BOILERPLATE))
}

/// Ordered most specific first; order breaks ties at the same position.
const RULES: &[(Wording, RuleSpec)] = &[
    specific(
        "engaged_time_semester",
        r"(?i)minimum\s+of\s+\d+(?:-\d+)?\s+hours?\s+of\s+engaged\s+time\s+per\s+week\s+per\s+credit\s+over\s+(?:a\s+)?\d+[-\s]+week\s+semester",
    ),
    specific(
        "engaged_time_semester",
        r"(?i)minimum\s+\d+\s+hours?\s+of\s+engaged\s+time\s+per\s+week\s+per\s+credit\s+over\s+(?:a\s+)?\d+[-\s]+week\s+semester",
    ),
    specific(
        "engaged_time_semester",
        r"(?i)\d+\s+hours?\s+of\s+engaged\s+time\s+per\s+week\s+per\s+credit\s+over\s+(?:a\s+)?\d+[-\s]+week\s+semester",
    ),
    specific(
        "homework_hours",
        r"(?i)minimum\s+of\s+\d+(?:-\d+)?\s+hours?\s+per\s+week\s+for\s+the\s+completion\s+of",
    ),
    specific(
        "academic_work_course",
        r"(?i)\d+\s+hours?\s+of\s+student\s+academic\s+work\s+per\s+week\s+for\s+(?:a\s+)?\d+[-\s]+week\s+course",
    ),
    specific(
        "engaged_time_credit",
        r"(?i)minimum\s+of\s+\d+\s+hours?\s+engaged\s+time\s+per\s+week\s+per\s+credit",
    ),
    specific(
        "engaged_time_credit",
        r"(?i)minimum\s+\d+\s+hours?\s+engaged\s+time\s+per\s+week\s+per\s+credit",
    ),
    specific(
        "academic_work_engagement",
        r"(?i)(?:one|two|three|four|five|six|seven|eight|nine|ten)\s+hours?\s+of\s+student\s+academic\s+work\s+and\s+engagement\s+each\s+week",
    ),
    boilerplate(
        "academic_work_weekly",
        r"(?i)(?:one|two|three|four|five|six|seven|eight|nine|ten)\s+hours?\s+of\s+student\s+academic\s+work\s+each\s+week",
    ),
    specific(
        "total_student_work",
        r"(?i)minimum\s+of\s+\d+\s+hours?\s+of\s+total\s+student\s+work",
    ),
    specific(
        "academic_work_minimum",
        r"(?i)minimum\s+of\s+(?:one|two|three|four|five|six|seven|eight|nine|ten)\s+hours?\s+(?:of\s+)?student\s+academic\s+work",
    ),
    specific(
        "academic_work_per_credit_hour",
        r"(?i)minimum\s+of\s+(?:one|two|three|four|five|six|seven|eight|nine|ten|\d+)\s+hours?\s+(?:of\s+)?academic\s+work\s+each\s+week\s+for\s+each\s+credit",
    ),
    boilerplate(
        "academic_work_per_credit",
        r"(?i)\d+\s+hours?\s+(?:of\s+)?(?:student\s+)?academic\s+work\s+per\s+credit",
    ),
    boilerplate(
        "course_work_per_credit",
        r"(?i)\d+\s+hours?\s+(?:of\s+)?course\s+work\s+per\s+credit",
    ),
    specific(
        "expected_minimum",
        r"(?i)expected\s+to\s+involve\s+a\s+minimum\s+of\s+\d+\s+hours?",
    ),
    specific(
        "expected_weekly_minimum",
        r"(?i)expected\s+to\s+spend\s+a\s+minimum\s+of\s+\d+\s+hours?\s+each\s+week\s+on\s+their\s+academic\s+work",
    ),
    specific(
        "expected_weekly",
        r"(?i)expected\s+to\s+spend\s+at\s+least\s+\d+\s+hours?\s+per\s+week\s+on\s+this\s+class",
    ),
    specific(
        "study_outside_class",
        r"(?i)expected\s+to\s+study\s+at\s+least\s+\d+(?:-\d+)?\s+hours?\s+outside\s+(?:of\s+)?class\s+every\s+week",
    ),
    specific(
        "study_outside_class",
        r"(?i)expected\s+to\s+study\s+at\s+least\s+\d+(?:-\d+)?\s+hours?\s+outside\s+(?:of\s+)?class",
    ),
    specific(
        "study_outside_class",
        r"(?i)expected\s+to\s+study\s+\d+(?:-\d+)?\s+hours?\s+outside\s+(?:of\s+)?class\s+every\s+week",
    ),
    specific(
        "study_outside_class",
        r"(?i)expected\s+to\s+at\s+least\s+study\s+\d+(?:-\d+)?\s+hours?\s+outside\s+(?:of\s+)?class",
    ),
    specific(
        "allocate_outside_class",
        r"(?i)expected\s+to\s+allocate\s+\d+\s+to\s+\d+\s+hours?\s+outside\s+(?:of\s+)?class",
    ),
    specific(
        "outside_class_learning",
        r"(?i)expected\s+to\s+engage\s+in\s+outside\s+class\s+learning\s+\d+\s+hours\s+every\s+week",
    ),
    specific(
        "outside_class_learning",
        r"(?i)expected\s+to\s+engage\s+in\s+outside\s+class\s+learning\s+\d+\s+hours",
    ),
    specific(
        "professional_setting",
        r"(?i)minimum\s+of\s+\d+\s+hours?\s+in\s+a\s+professional\s+setting",
    ),
    specific(
        "onsite_work",
        r"(?i)complete\s+the\s+minim(?:al|um)\s+\d+\s+hours?\s+(?:of\s+)?(?:onsite|on-site)\s+work",
    ),
    specific(
        "hours_per_week",
        r"(?i)\d+\s+hours?\s+per\s+week(?:\s+for\s+(?:graduate|undergraduate)\s+students)?",
    ),
    boilerplate(
        "credit_equation",
        r"(?i)\d+\s+credit\s*=\s*\d+\s+hours?\s+(?:of\s+)?academic\s+work\s+per\s+week",
    ),
    specific("hours_for_credits", r"(?i)\d+\s+(?:work\s+)?hours?\s+for\s+\d+\s+credits?"),
    specific(
        "hours_per_week_breakdown",
        r"(?i)\d+\s+hours?/week\s*\([^)]*credits?\s*x\s*\d+\s+hours?\s+per\s+credit[^)]*\)",
    ),
];

/// Collapse whitespace and non-ASCII runs to single spaces, keeping the
/// original byte offset of every output byte.
fn collapse(text: &str) -> (String, Vec<usize>) {
    let mut collapsed = String::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len());
    let mut in_gap = false;
    for (index, c) in text.char_indices() {
        if c.is_whitespace() || !c.is_ascii() {
            if !in_gap {
                collapsed.push(' ');
                offsets.push(index);
                in_gap = true;
            }
        } else {
            collapsed.push(c);
            offsets.push(index);
            in_gap = false;
        }
    }
    (collapsed, offsets)
}

#[derive(Debug, Clone, PartialEq)]
struct Declaration {
    wording: Wording,
    start: usize,
    rule: usize,
    text: String,
}

/// Workload extractor.
#[derive(Debug, Clone)]
pub struct WorkloadDetector {
    rules: Vec<(Wording, PatternRule)>,
    calibration: Calibration,
}

impl WorkloadDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        let field = FieldName::Workload;
        Ok(Self {
            rules: RULES
                .iter()
                .map(|(wording, spec)| {
                    PatternRule::compile(field.as_ref(), spec).map(|rule| (*wording, rule))
                })
                .collect::<Result<Vec<_>>>()?,
            calibration: calibration_for(field, Calibration::default(), overrides)?,
        })
    }

    fn best(&self, collapsed: &str) -> Option<Declaration> {
        let mut found = Vec::new();
        for (index, (wording, rule)) in self.rules.iter().enumerate() {
            for m in rule.regex.find_iter(collapsed) {
                debug!("workload: {:?} matched {:?} at {}", rule.label, m.as_str(), m.start());
                found.push(Declaration {
                    wording: *wording,
                    start: m.start(),
                    rule: index,
                    text: m.as_str().trim().to_string(),
                });
            }
        }
        found.into_iter().min_by_key(|d| (d.wording, d.start, d.rule))
    }
}

impl FieldDetector for WorkloadDetector {
    fn field(&self) -> FieldName {
        FieldName::Workload
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let head = doc.head(SEARCH_CHARS);
        let (collapsed, offsets) = collapse(head);
        let Some(best) = self.best(&collapsed) else {
            return Ok(DetectionResult::not_found());
        };
        let original = offsets.get(best.start).copied().unwrap_or_default();
        let line = head[..original].matches('\n').count();
        let (wording, rule) = &self.rules[best.rule];
        Ok(DetectionResult::found(
            best.text,
            calibrate(rule.weight, &self.calibration),
            vec![
                evidence_line(doc, line),
                format!("rule: {}", rule.label),
                format!("wording: {wording}"),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> DetectionResult {
        WorkloadDetector::new(None)
            .unwrap()
            .detect(&Document::new(text))
            .unwrap()
    }

    #[test]
    fn test_engaged_time_across_lines() {
        let result = detect(
            "Workload\nStudents should expect a minimum 3 hours of engaged time per week per credit\nover a 15-week semester.",
        );
        assert_eq!(
            result.content.as_deref(),
            Some("minimum 3 hours of engaged time per week per credit over a 15-week semester")
        );
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.evidence[0], "line 2: Students should expect a minimum 3 hours of engaged time per week per credit");
    }

    #[test]
    fn test_boilerplate_ranks_after_specific() {
        let result = detect(
            "University policy: 45 hours of student academic work per credit per term.\nPlan on 9 hours per week for this course.",
        );
        assert_eq!(result.content.as_deref(), Some("9 hours per week"));
        assert_eq!(result.evidence[2], "wording: specific");
    }

    #[test]
    fn test_boilerplate_alone() {
        let result = detect("Expect 45 hours of student academic work per credit per term.");
        assert_eq!(
            result.content.as_deref(),
            Some("45 hours of student academic work per credit")
        );
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn test_collapse_offsets() {
        let (collapsed, offsets) = collapse("a \u{2022}\n b");
        assert_eq!(collapsed, "a b");
        assert_eq!(offsets, vec![0, 1, 7]);
    }

    #[test]
    fn test_no_workload() {
        assert!(!detect("Class meets twice a week.").found);
    }
}
