//! Letter grading scale.
//!
//! A scale is a run of grade-bearing lines that together name every
//! required letter grade. Partial scales are never reported.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use anyhow::Result;
use log::debug;
use regex::Regex;

use super::{FieldDetector, calibration_for};
use crate::engine::calibrate::Calibration;
use crate::engine::{DetectionResult, Document, FieldOverrides, calibrate, evidence_line};
use crate::models::FieldName;
use crate::utils::text::floor_boundary;

pub const REQUIRED_GRADES: [&str; 12] = [
    "A", "A-", "B+", "B", "B-", "C+", "C", "C-", "D+", "D", "D-", "F",
];
const OPTIONAL_GRADES: [&str; 1] = ["A+"];

const MAX_BLOCK_CHARS: usize = 300;
const MAX_SCAN_CHARS: usize = 400;
const CONFIDENCE: f64 = 0.95;

/// A grade token followed by a separator, a number or the end of the line.
static GRADE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([ABCDF][+\-]?)(?:[\s:=\d(),;<>]|$)").unwrap());
static EQUALS_GRADE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s*([ABCDF][+\-]?)").unwrap());

/// Lead-in text before the scale itself.
static PREFIX_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^.*?guidelines using this schema:\s*",
        r"(?i)^.*?grading scale:\s*",
        r"(?i)^.*?final grades.*?scale:\s*",
        r"(?i)^.*?letter grades?\s*are\s*as\s*follows?:\s*",
        r"(?i)^.*?grading\s*criteria:?\s*",
        r"(?i)^.*?scale\s*is:?\s*",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Weighted assignment entries such as "Portfolio 20%".
static WEIGHT_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][\w\-]*\s+\d+%").unwrap());
static LEADING_GRADE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-F][+\-]?").unwrap());
static SCALE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-F][+\-]?\s*[:=<>\d]").unwrap());

/// Every recognized grade token in `text`, in order.
pub fn grades_in(text: &str) -> Vec<&'static str> {
    GRADE_RE
        .captures_iter(text)
        .chain(EQUALS_GRADE_RE.captures_iter(text))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| {
            REQUIRED_GRADES
                .iter()
                .chain(OPTIONAL_GRADES.iter())
                .find(|grade| **grade == m.as_str())
                .copied()
        })
        .collect()
}

fn has_required(found: &BTreeSet<&str>) -> bool {
    REQUIRED_GRADES.iter().all(|grade| found.contains(grade))
}

/// Strip lead-in prose and weight entries so the block starts at a grade.
pub fn clean_block(text: &str) -> String {
    let mut text = text.to_string();
    for prefix in PREFIX_RES.iter() {
        text = prefix.replace(&text, "").into_owned();
    }
    let text = WEIGHT_ENTRY_RE.replace_all(&text, "");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if LEADING_GRADE_RE.is_match(&text) {
        return text;
    }
    match SCALE_START_RE.find(&text) {
        Some(m) => text[m.start()..].trim().to_string(),
        None => text,
    }
}

/// Grow a block from `start`. One non-grade line is tolerated inside the
/// block; two in a row end it.
fn extract_block(lines: &[String], start: usize) -> Option<String> {
    let mut found = BTreeSet::new();
    let mut block: Vec<&str> = Vec::new();

    for index in start..lines.len() {
        let line = lines[index].trim();
        if line.is_empty() {
            continue;
        }
        let grades = grades_in(line);
        if grades.is_empty() {
            if found.is_empty() {
                continue;
            }
            let continues = lines
                .get(index + 1)
                .is_some_and(|next| !grades_in(next).is_empty());
            if continues {
                continue;
            }
            break;
        }

        block.push(line);
        found.extend(grades);
        if has_required(&found) {
            let cleaned = clean_block(&block.join(" "));
            if cleaned.len() <= MAX_BLOCK_CHARS {
                return Some(cleaned);
            }
            let truncated = &cleaned[..floor_boundary(&cleaned, MAX_BLOCK_CHARS)];
            if has_required(&grades_in(truncated).into_iter().collect()) {
                return Some(truncated.trim_end().to_string());
            }
        }
        if block.iter().map(|l| l.len() + 1).sum::<usize>() > MAX_SCAN_CHARS {
            break;
        }
    }
    None
}

/// Letter grading scale extractor.
#[derive(Debug, Clone)]
pub struct GradingScaleDetector {
    calibration: Calibration,
}

impl GradingScaleDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        Ok(Self {
            calibration: calibration_for(
                FieldName::GradingScale,
                Calibration::default(),
                overrides,
            )?,
        })
    }
}

impl FieldDetector for GradingScaleDetector {
    fn field(&self) -> FieldName {
        FieldName::GradingScale
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let lines = doc.lines();
        for (index, line) in lines.iter().enumerate() {
            if grades_in(line).is_empty() {
                continue;
            }
            let Some(block) = extract_block(lines, index) else {
                continue;
            };
            let grades: BTreeSet<&str> = grades_in(&block).into_iter().collect();
            if !has_required(&grades) {
                continue;
            }
            debug!("grading_scale: complete scale starting at line {}", index + 1);
            let listed = REQUIRED_GRADES
                .iter()
                .chain(OPTIONAL_GRADES.iter())
                .filter(|grade| grades.contains(*grade))
                .copied()
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(DetectionResult::found(
                block,
                calibrate(CONFIDENCE, &self.calibration),
                vec![evidence_line(doc, index), format!("grades: {listed}")],
            ));
        }
        Ok(DetectionResult::not_found())
    }
}
