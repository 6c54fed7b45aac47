//! How the final grade is assembled: weighted categories and points.
//!
//! Lines are first classified into a mutually exclusive family
//! ([`LineClass`]) so that letter-grade scales and late-work tables never
//! end up inside a grading-process window. Runs of consecutive item lines
//! form windows; the best window wins, is tidied to its percent and points
//! lines plus short context, and is prefixed with its nearest heading.

use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::Result;
use log::debug;
use regex::Regex;

use super::{FieldDetector, calibration_for};
use crate::engine::calibrate::Calibration;
use crate::engine::{DetectionResult, Document, FieldOverrides, calibrate, evidence_line};
use crate::models::FieldName;
use crate::utils::text::is_all_caps;

const HEADING_SCAN_LINES: usize = 8;
const MAX_HEADING_WORDS_CAPS: usize = 12;
const MAX_HEADING_WORDS_ANCHOR: usize = 15;
const MAX_HEADING_WORDS_TITLE: usize = 10;
const MIN_TITLE_CASE_CAPS: usize = 2;
const MIN_WINDOW_SCORE: usize = 2;
const MAX_SHORT_LINE_WORDS: usize = 15;
const MAX_SHORT_LINE_CHARS: usize = 120;
const MAX_NEXT_LINE_WORDS: usize = 20;
const MAX_UPWARD_SCAN: usize = 7;
const MAX_DOWNWARD_SCAN: usize = 9;
const MAX_FORWARD_SCAN: usize = 7;
const CLUSTER_RADIUS: usize = 3;

static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\s*%").unwrap());
static POINTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d+\s*(?:points|pts)\b").unwrap());
static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Za-z].{0,60}(?:\d+\s*%|\(\d+%\)|\d+\s*points|\d+\s*pts)").unwrap()
});

static SCALE_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[A-F][+\-]?\s*[:<|]?\s*(?:<\s*)?\d+\s*%?\s*(?:to|-)\s*\d+\s*%?").unwrap()
});
static LETTER_GRADE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-F][+\-]?\b").unwrap());
static PIPED_GRADE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-F][+\-]?\s*\|").unwrap());

const ANCHOR_KEYWORDS: &[&str] = &[
    "grade",
    "grading",
    "evaluation",
    "assessment",
    "breakdown",
    "weights",
    "weighting",
    "final grade",
    "grade distribution",
    "assignment",
    "exam",
    "quiz",
    "project",
    "total = 100",
    "total=100",
    "total 100",
    "total: 100",
    "total - 100",
];

const LATE_INDICATORS: &[&str] = &[
    "days late",
    "late submission",
    "points subtracted",
    "late penalty",
    "will not be graded",
    "late work",
    "late assignment",
    "late deduction",
];

/// Mutually exclusive role of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LineClass {
    GradingScale,
    LatePolicy,
    GradingProcess,
    Other,
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

fn has_anchor(s: &str) -> bool {
    let lower = s.to_lowercase();
    ANCHOR_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn has_amount(s: &str) -> bool {
    PERCENT_RE.is_match(s) || POINTS_RE.is_match(s)
}

fn is_scale_line(line: &str) -> bool {
    if SCALE_RANGE_RE.is_match(line) {
        return true;
    }
    let lower = line.to_lowercase();
    if lower.contains("letter") && (lower.contains("range") || lower.contains("grade")) {
        return true;
    }
    if LETTER_GRADE_RE.find_iter(line).count() >= 2 && line.contains('%') {
        return true;
    }
    if line.contains('|')
        && PIPED_GRADE_RE.is_match(line)
        && (line.contains('%') || lower.contains("to"))
    {
        return true;
    }
    lower.contains("grade of")
        && ['a', 'b', 'c', 'd', 'f'].iter().any(|letter| {
            [' ', ',', '.']
                .iter()
                .any(|end| lower.contains(&format!(" {letter}{end}")))
        })
}

fn is_late_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    LATE_INDICATORS.iter().any(|i| lower.contains(i))
        || (line.contains('|')
            && ["late", "day", "penalty", "deduction"]
                .iter()
                .any(|w| lower.contains(w)))
}

/// Classify one trimmed line. Scale and late-work lines take precedence
/// over item lines.
pub fn classify(line: &str) -> LineClass {
    if is_scale_line(line) {
        LineClass::GradingScale
    } else if is_late_line(line) {
        LineClass::LatePolicy
    } else if has_amount(line) || ITEM_RE.is_match(line) {
        LineClass::GradingProcess
    } else {
        LineClass::Other
    }
}

/// A short ALL-CAPS, anchor-bearing or Title-Case line.
fn is_heading(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    let words = word_count(line);
    if is_all_caps(line) && words <= MAX_HEADING_WORDS_CAPS {
        return true;
    }
    if has_anchor(line) && words <= MAX_HEADING_WORDS_ANCHOR {
        return true;
    }
    let caps = line
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .count();
    caps >= MIN_TITLE_CASE_CAPS
        && words <= MAX_HEADING_WORDS_TITLE
        && !line.contains('.')
        && !line.contains(',')
}

/// Nearest heading above `index`, skipping blank lines.
fn heading_before(lines: &[String], index: usize) -> Option<usize> {
    (index.saturating_sub(HEADING_SCAN_LINES)..index)
        .rev()
        .filter(|&i| !lines[i].trim().is_empty())
        .find(|&i| is_heading(&lines[i]))
}

/// A run of consecutive grading-process lines.
#[derive(Debug, Clone, PartialEq)]
struct Window {
    start: usize,
    len: usize,
}

fn windows(lines: &[String]) -> Vec<Window> {
    let mut windows = Vec::new();
    let mut start = None;
    for (index, line) in lines.iter().enumerate() {
        let line = line.trim();
        let in_window = !line.is_empty() && classify(line) == LineClass::GradingProcess;
        match (in_window, start) {
            (true, None) => start = Some(index),
            (false, Some(s)) => {
                windows.push(Window {
                    start: s,
                    len: index - s,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        windows.push(Window {
            start: s,
            len: lines.len() - s,
        });
    }
    windows
}

/// Percent and points lines count one each; an anchor keyword within
/// three lines adds one. Windows dominated by scale or late-work lines
/// score nothing.
fn window_score(lines: &[String], window: &Window) -> usize {
    let block = &lines[window.start..window.start + window.len];
    let foreign = block
        .iter()
        .filter(|l| {
            matches!(
                classify(l.trim()),
                LineClass::GradingScale | LineClass::LatePolicy
            )
        })
        .count();
    if foreign * 2 > block.len() {
        return 0;
    }
    let mut score = block.iter().filter(|l| has_amount(l)).count();
    let from = window.start.saturating_sub(CLUSTER_RADIUS);
    let to = (window.start + window.len + CLUSTER_RADIUS).min(lines.len());
    if lines[from..to].iter().any(|l| has_anchor(l)) {
        score += 1;
    }
    score
}

fn is_long_sentence(line: &str) -> bool {
    line.contains('.') && word_count(line) > MAX_NEXT_LINE_WORDS
}

/// Amount lines in `start..=end` with one short line of context on either
/// side, then any amount line a few lines further down along with the
/// short labels before it.
fn select_lines(lines: &[String], start: usize, end: usize) -> Vec<usize> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    let mut push = |i: usize, selected: &mut Vec<usize>| {
        if seen.insert(i) {
            selected.push(i);
        }
    };

    for index in (start..=end).filter(|&i| has_amount(&lines[i])) {
        if index > start {
            let prev = lines[index - 1].trim();
            if !prev.is_empty()
                && word_count(prev) <= MAX_SHORT_LINE_WORDS
                && prev.chars().count() <= MAX_SHORT_LINE_CHARS
            {
                push(index - 1, &mut selected);
            }
        }
        push(index, &mut selected);
        if index < end {
            let next = lines[index + 1].trim();
            if !next.is_empty() && word_count(next) <= MAX_NEXT_LINE_WORDS {
                push(index + 1, &mut selected);
            }
        }
    }

    if let Some(&last) = selected.iter().max() {
        let limit = (last + MAX_FORWARD_SCAN).min(lines.len());
        if let Some(target) = (last + 1..limit).find(|&j| PERCENT_RE.is_match(&lines[j])) {
            for k in last + 1..=target {
                let line = lines[k].trim();
                if !line.is_empty() && (k == target || word_count(line) <= MAX_SHORT_LINE_WORDS) {
                    push(k, &mut selected);
                }
            }
        }
    }
    selected
}

fn compose(lines: &[String], selected: &[usize], heading: Option<usize>) -> String {
    let mut content: Vec<&str> = selected
        .iter()
        .map(|&i| lines[i].trim_end())
        .filter(|l| !l.trim().is_empty())
        .collect();
    if let Some(h) = heading {
        let heading = lines[h].trim();
        if content.first().is_none_or(|first| !first.starts_with(heading)) {
            content.insert(0, heading);
        }
    }
    content.join("\n").trim().to_string()
}

/// How a grading process block was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ProcessMethod {
    PercentWindow,
    PercentCluster,
}

#[derive(Debug, Clone, PartialEq)]
struct Block {
    content: String,
    anchor_line: usize,
    score: usize,
    method: ProcessMethod,
}

fn best_window(lines: &[String]) -> Option<Block> {
    let mut best: Option<(Window, usize)> = None;
    for window in windows(lines) {
        let score = window_score(lines, &window);
        if score >= MIN_WINDOW_SCORE && best.as_ref().is_none_or(|(_, s)| score > *s) {
            best = Some((window, score));
        }
    }
    let (window, score) = best?;

    let mut start = window.start;
    for i in (window.start.saturating_sub(MAX_UPWARD_SCAN)..window.start).rev() {
        if lines[i].trim().is_empty() {
            break;
        }
        if is_heading(&lines[i]) {
            start = i;
            break;
        }
    }
    let mut end = window.start + window.len - 1;
    for j in end + 1..(end + MAX_DOWNWARD_SCAN).min(lines.len()) {
        let line = lines[j].trim();
        if line.is_empty() || is_long_sentence(line) {
            break;
        }
        end = j;
    }

    let selected = select_lines(lines, start, end);
    let content = if selected.is_empty() {
        compose(lines, &(start..=end).collect::<Vec<_>>(), None)
    } else {
        compose(lines, &selected, heading_before(lines, window.start))
    };
    Some(Block {
        content,
        anchor_line: window.start,
        score,
        method: ProcessMethod::PercentWindow,
    })
}

fn is_process_percent(line: &str) -> bool {
    PERCENT_RE.is_match(line)
        && !matches!(
            classify(line.trim()),
            LineClass::GradingScale | LineClass::LatePolicy
        )
}

/// Two or more percent lines within three lines of each other.
fn percent_cluster(lines: &[String]) -> Option<Block> {
    for index in (0..lines.len()).filter(|&i| is_process_percent(&lines[i])) {
        let start = index.saturating_sub(CLUSTER_RADIUS);
        let end = (index + CLUSTER_RADIUS + 1).min(lines.len());
        let score = lines[start..end]
            .iter()
            .filter(|l| is_process_percent(l))
            .count();
        if score < MIN_WINDOW_SCORE {
            continue;
        }

        let mut first = start;
        for i in (start.saturating_sub(MAX_DOWNWARD_SCAN - 1)..start).rev() {
            let line = lines[i].trim();
            if line.is_empty() {
                break;
            }
            if has_anchor(line) || is_all_caps(line) {
                first = i;
                break;
            }
        }
        let mut last = (end + CLUSTER_RADIUS).min(lines.len() - 1);
        for j in end..(end + MAX_DOWNWARD_SCAN).min(lines.len()) {
            if lines[j].trim().is_empty() {
                break;
            }
            last = j;
        }

        let selected = select_lines(lines, first, last);
        let content = if selected.is_empty() {
            compose(lines, &(first..=last).collect::<Vec<_>>(), None)
        } else {
            compose(lines, &selected, heading_before(lines, first))
        };
        return Some(Block {
            content,
            anchor_line: index,
            score,
            method: ProcessMethod::PercentCluster,
        });
    }
    None
}

/// Grading process extractor.
#[derive(Debug, Clone)]
pub struct GradingProcessDetector {
    calibration: Calibration,
}

impl GradingProcessDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        Ok(Self {
            calibration: calibration_for(
                FieldName::GradingProcess,
                Calibration::new(6.0, 0.5, 0.9),
                overrides,
            )?,
        })
    }
}

impl FieldDetector for GradingProcessDetector {
    fn field(&self) -> FieldName {
        FieldName::GradingProcess
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let lines = doc.lines();
        let Some(block) = best_window(lines).or_else(|| percent_cluster(lines)) else {
            return Ok(DetectionResult::not_found());
        };
        if block.content.is_empty() {
            return Ok(DetectionResult::not_found());
        }
        debug!(
            "grading_process: {} with score {} at line {}",
            block.method,
            block.score,
            block.anchor_line + 1
        );
        Ok(DetectionResult::found(
            block.content,
            calibrate(block.score as f64, &self.calibration),
            vec![
                evidence_line(doc, block.anchor_line),
                format!("method: {}", block.method),
                format!("score: {}", block.score),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> DetectionResult {
        GradingProcessDetector::new(None)
            .unwrap()
            .detect(&Document::new(text))
            .unwrap()
    }

    #[test]
    fn test_percent_breakdown() {
        let text = "Exam 1 - 22%\nExam 2 - 22%\nExam 3 - 22%\nOnline Quizzes - 10%\nExperiments - 20%\nAttendance - 4%\nTotal = 100%";
        let result = detect(text);
        assert!(result.found);
        assert_eq!(result.content.as_deref(), Some(text));
        assert_eq!(result.evidence[1], "method: percent_window");
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_heading_is_prepended() {
        let text = "Course Policies\n\nGRADE BREAKDOWN\nHomework 30%\nMidterm 30%\nFinal 40%";
        let result = detect(text);
        assert_eq!(
            result.content.as_deref(),
            Some("GRADE BREAKDOWN\nHomework 30%\nMidterm 30%\nFinal 40%")
        );
    }

    #[test]
    fn test_points_items() {
        let text = "Projects\nProject 1 - 10 points\nProject 2 - 10 points\nParticipation 5 pts";
        assert!(detect(text).found);
    }

    #[test]
    fn test_grading_scale_lines_are_excluded() {
        let text = "A 93-100%\nA- 90-92%\nB+ 87-89%\nB 83-86%";
        assert!(!detect(text).found);
    }

    #[test]
    fn test_classify_family() {
        assert_eq!(classify("A: 93 - 100"), LineClass::GradingScale);
        assert_eq!(classify("1 day late | 10%"), LineClass::LatePolicy);
        assert_eq!(classify("Homework 25%"), LineClass::GradingProcess);
        assert_eq!(classify("Welcome to the course"), LineClass::Other);
    }

    #[test]
    fn test_no_grading_info() {
        let result = detect("This syllabus has no grading info");
        assert!(!result.found);
        assert!(result.content.is_none());
    }
}
