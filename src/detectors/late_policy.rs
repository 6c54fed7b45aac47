//! Late and missing work policy.
//!
//! A titled section is preferred. Without one, policy sentences such as
//! "late work will not be accepted after ..." are reported with a couple of
//! continuation lines.

use anyhow::Result;
use log::debug;
use regex::Regex;

use super::section_title::SectionTitles;
use super::{FieldDetector, calibration_for};
use crate::engine::calibrate::Calibration;
use crate::engine::rules::compile_all;
use crate::engine::{DetectionResult, Document, FieldOverrides, calibrate, evidence_line};
use crate::models::FieldName;
use crate::utils::text::{ceil_boundary, floor_boundary};

const STOP_HEADERS: &[&str] = &[
    "course description",
    "course objectives",
    "course goals",
    "prerequisites",
    "textbook",
    "grading",
    "schedule",
    "extra credit",
    "attendance",
];

const TITLES: SectionTitles = SectionTitles {
    titles: &[
        "assignment deadlines",
        "assignments and grading",
        "attendance and late work",
        "deadline expectations",
        "deadline policy",
        "expectations regarding assignment deadlines, late, or missing work",
        "late assignments",
        "late assignments and make-up exams",
        "late homework policy",
        "late policy",
        "late submission policy",
        "late submissions",
        "late submissions and make-up exam",
        "late submissions and make-up exams",
        "late submissions and makeups",
        "late work",
        "late work policy",
        "late/make-up work",
        "makeups",
        "make-up policy",
        "make-up work",
        "missing work",
        "missing work policy",
        "penalty for late assignments",
        "policy on attendance, late submissions",
        "policy on late submissions",
        "policy on late work",
        "submission deadlines",
        "submission policy",
    ],
    stop_headers: STOP_HEADERS,
    threshold: 3,
    exact_line_score: Some(100),
    leading_title_bonus: 20,
    isolated_titles: true,
    max_document_chars: 20_000,
    max_content_lines: 10,
    max_content_chars: 500,
};

/// Single-line policy statements, matched against the lowercased line.
const SENTENCE_PATTERNS: &[&str] = &[
    r"late work is.*?(?:anything submitted|defined as|considered).*?after.*?(?:due date|deadline)",
    r"you will lose.*?\d+.*?(?:percent|%).*?per day.*?(?:late|tardy)",
    r"(?:\d+%|ten percent|\d+ percent).*?(?:deduction|penalty).*?per day.*?(?:late work|late assignment)",
    r"late work will not be accepted.*?(?:after|beyond)",
    r"no assignment will be accepted after.*?(?:deadline|due date)",
    r"submissions will not be accepted after.*?(?:deadline|due date)",
    r"(?:late|tardy).*?(?:penalty|deduction).*?\d+%.*?(?:per day|each day)",
    r"do not submit.*?(?:homework|assignment|work).*?late",
    r"you may hand in.*?(?:one|1).*?late.*?(?:homework|assignment)",
    r"any assignment not turned in by.*?(?:midnight|due date|date).*?(?:late|penalty|grade penalty)",
    r"unexcused late.*?will receive.*?deduction",
    r"no submissions.*?accepted.*?(?:after|beyond).*?\d+.*?days",
    r"three days after.*?due date.*?will not be accepted",
    r"(?:48|forty-eight) hours after.*?due.*?(?:day|date)",
    r"grace period.*?(?:late|assignment)",
    r"make-?up.*?(?:work|exam|assignment).*?(?:policy|will be)",
    r"(?:late|tardy).*?(?:work|assignment).*?policy",
    r"(?:grading|penalty).*?\(late policy.*?\)",
    r"(?:homework|assignments).*?submitted late.*?(?:deduct|reduce|lose).*?\d+",
    r"(?:one|1).*?late.*?(?:homework|assignment).*?(?:allowed|accepted)",
    r"assignment.*?not turned in.*?(?:midnight|due date).*?(?:late|penalty)",
    r"(?:assignment|homework).*?(?:due date|deadline).*?(?:penalty|deduction|zero|0)",
    r"after.*?(?:due date|deadline).*?assignment.*?(?:not accepted|zero|penalty)",
    r"late work.*?no.*?(?:assignment|work).*?(?:accepted|allowed)",
    r"you will receive.*?(?:grade of 0|zero).*?for.*?(?:quiz|exam).*?(?:miss|late)",
];

/// Statements that wrap across lines, matched against the whole lowercased
/// document.
const SPANNING_PATTERNS: &[&str] = &[
    r"(?s)late work is anything submitted after.*?(?:unless you have received|zero will be given|will not be accepted)",
    r"(?s)(?:10|ten)%.*?per day.*?for.*?(?:work submitted late|late work).*?(?:up to|for up to)",
    r"(?s)late work is.*?(?:submitted|turned in|handed in).*?after.*?(?:due|deadline).*?(?:penalty|deduction|lose)",
    r"(?s)(?:penalty|deduction).*?\d+.*?(?:percent|%).*?per day.*?(?:late|tardy)",
];

const CONTINUATION_LINES: usize = 2;
const SPANNING_PADDING: usize = 20;
const MAX_CONTINUATION_CHARS: usize = 300;
const MIN_SENTENCE_CHARS: usize = 20;
const MAX_SENTENCE_CHARS: usize = 350;
/// Raw score reported for a policy sentence without a section title.
const SENTENCE_SCORE: f64 = 10.0;

/// Late work policy extractor.
#[derive(Debug, Clone)]
pub struct LatePolicyDetector {
    sentences: Vec<Regex>,
    spanning: Vec<Regex>,
    calibration: Calibration,
}

impl LatePolicyDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        let field = FieldName::LatePolicy;
        Ok(Self {
            sentences: compile_all(field.as_ref(), SENTENCE_PATTERNS)?,
            spanning: compile_all(field.as_ref(), SPANNING_PATTERNS)?,
            calibration: calibration_for(field, Calibration::new(20.0, 0.5, 0.95), overrides)?,
        })
    }

    /// A policy sentence plus up to two continuation lines.
    fn sentence(&self, lines: &[String]) -> Option<(usize, String)> {
        for (index, line) in lines.iter().enumerate() {
            let lower = line.to_lowercase();
            if !self.sentences.iter().any(|re| re.is_match(&lower)) {
                continue;
            }
            let mut parts: Vec<&str> = Vec::new();
            let current = line.trim();
            if !current.is_empty() {
                parts.push(current);
            }
            for next in lines.iter().skip(index + 1).take(CONTINUATION_LINES) {
                let next = next.trim();
                if next.is_empty() {
                    continue;
                }
                if is_section_break(next) {
                    break;
                }
                parts.push(next);
                if parts.iter().map(|p| p.len()).sum::<usize>() > MAX_CONTINUATION_CHARS {
                    break;
                }
            }
            let content = collapse(&parts.join(" "));
            if (MIN_SENTENCE_CHARS + 1..=MAX_SENTENCE_CHARS).contains(&content.len()) {
                return Some((index, content));
            }
        }
        None
    }

    fn spanning(&self, doc: &Document) -> Option<(usize, String)> {
        let text = doc.text();
        let lower = text.to_lowercase();
        for re in &self.spanning {
            let Some(m) = re.find(&lower) else {
                continue;
            };
            // Lowercasing keeps ASCII offsets; bail out on anything else.
            if lower.len() != text.len() {
                return None;
            }
            let start = floor_boundary(text, m.start().saturating_sub(SPANNING_PADDING));
            let end = ceil_boundary(text, (m.end() + SPANNING_PADDING).min(text.len()));
            let content = collapse(&text[start..end]);
            if (MIN_SENTENCE_CHARS + 1..=MAX_SENTENCE_CHARS).contains(&content.len()) {
                let line = text[..floor_boundary(text, m.start())].matches('\n').count();
                return Some((line, content));
            }
        }
        None
    }
}

fn is_section_break(line: &str) -> bool {
    let lower = line.to_lowercase();
    STOP_HEADERS.iter().any(|h| lower.contains(h))
        || (line.ends_with(':') && line.len() < 50)
        || (line.starts_with(|c: char| c.is_uppercase()) && line.contains(':') && line.len() < 60)
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl FieldDetector for LatePolicyDetector {
    fn field(&self) -> FieldName {
        FieldName::LatePolicy
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        if let Some(section) = TITLES.find(doc) {
            return Ok(DetectionResult::found(
                section.content,
                calibrate(f64::from(section.score), &self.calibration),
                vec![
                    evidence_line(doc, section.line_index),
                    format!("header score: {}", section.score),
                ],
            ));
        }

        let truncated = doc.truncated(TITLES.max_document_chars);
        let statement = self
            .sentence(truncated.lines())
            .or_else(|| self.spanning(&truncated));
        let Some((line_index, content)) = statement else {
            return Ok(DetectionResult::not_found());
        };
        debug!("late_policy: no titled section, using policy sentence at line {}", line_index + 1);
        Ok(DetectionResult::found(
            content,
            calibrate(SENTENCE_SCORE, &self.calibration),
            vec![
                evidence_line(doc, line_index),
                "method: policy_sentence".to_string(),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> DetectionResult {
        LatePolicyDetector::new(None)
            .unwrap()
            .detect(&Document::new(text))
            .unwrap()
    }

    #[test]
    fn test_exact_title_scores_highest() {
        let result = detect(
            "Late work will be discussed later.\n\nLate Work Policy\nAssignments lose 10% per day late.\nNothing is accepted after five days.\n\nAttendance\nCome to class.",
        );
        assert!(result.found);
        assert_eq!(
            result.content.as_deref(),
            Some("Late Work Policy\nAssignments lose 10% per day late.\nNothing is accepted after five days.")
        );
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.evidence[1], "header score: 100");
    }

    #[test]
    fn test_sentence_fallback() {
        let result = detect(
            "Course Expectations\nPlease note that late work will not be accepted after the deadline passes.\nThank you.",
        );
        assert!(result.found);
        assert_eq!(
            result.content.as_deref(),
            Some("Please note that late work will not be accepted after the deadline passes. Thank you.")
        );
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.evidence[1], "method: policy_sentence");
    }

    #[test]
    fn test_no_policy() {
        let result = detect("Welcome to the course.\nWe meet on Tuesdays.");
        assert!(!result.found);
        assert!(result.content.is_none());
    }
}
