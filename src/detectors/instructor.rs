//! Instructor name, title and department.
//!
//! All three parts come from the first 30 lines. The field is found only
//! when every part is present; the content is `"Name, Title, Department"`.

use std::sync::LazyLock;

use anyhow::Result;
use log::debug;
use regex::Regex;

use super::{FieldDetector, calibration_for};
use crate::engine::calibrate::Calibration;
use crate::engine::{DetectionResult, Document, FieldOverrides, calibrate};
use crate::models::FieldName;

const SCAN_LINES: usize = 30;
const STANDALONE_SCAN_LINES: usize = 20;
const STANDALONE_MAX_CHARS: usize = 60;
const MAX_DEPARTMENT_WORDS: usize = 5;
const LABELLED_CONFIDENCE: f64 = 0.90;
const INFERRED_CONFIDENCE: f64 = 0.80;

/// A line introducing the instructor; group 1 is the rest of the line.
static NAME_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:adjunct\s+instructor|instructor(?:\s+name)?|professor|taught\s+by|faculty|lecturer)\b\s*[:\-]*\s*(.*)$",
    )
    .unwrap()
});

static TITLE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Dr|Prof)\.?\s+([A-Z][a-zA-Z\-]+(?:\s+[A-Z]\.?)?(?:\s+[A-Z][a-zA-Z\-]+){0,2})")
        .unwrap()
});

static DR_LASTNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bDr\.?\s+([A-Z][a-zA-Z\-]+)\b").unwrap());

/// Name shapes, most specific first.
static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[A-Z][a-zA-Z]+\s+[A-Z][a-zA-Z]+(?:-[A-Z][a-zA-Z]+)+",
        r"[A-Z]\.[A-Z]\.?\s+[A-Z][a-zA-Z\-]+",
        r"[A-Z]\.?\s+[A-Z]\.?\s+[A-Z][a-zA-Z\-]+",
        r"[A-Z][a-zA-Z\-]+\s+[A-Z]\.\s+[A-Z][a-zA-Z\-]+",
        r"[A-Z][a-zA-Z\-]+\s+[A-Z][a-zA-Z\-]+\s+[A-Z][a-zA-Z\-]+",
        r"[A-Z][a-zA-Z\-]+\s+[A-Z][a-zA-Z\-]+",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static NICKNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^)]+\)\s*").unwrap());
static DEGREE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i),?\s*(?:Ph\.?D\.?|M\.?S\.?|M\.?A\.?|M\.?B\.?A\.?)\s*$").unwrap()
});
static INITIAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:[A-Z]\.?|(?:[A-Z]\.)+)$").unwrap());
static NAME_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-zA-Z\-\.]+$").unwrap());
static CAMEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][a-z]+[A-Z][a-z]+$").unwrap());
static HYPHENATED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-z]+(?:-[A-Z][a-z]+)+$").unwrap());

static STANDALONE_SKIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:comp|et|bus|phys|hls|biot|course|syllabus|spring|fall|summer|winter|20\d{2}|credits?)\b|@|http|www\.|\.edu|\.com|\d{3}[-.\s]?\d{3}",
    )
    .unwrap()
});

static DEPARTMENT_PROGRAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bdepartment\s*(?:and|/)\s*program\s*[:\-]\s*(.+)$").unwrap()
});
static DEPARTMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Department|Dept\.)[\s:,\-]*(?:of\s+)?([A-Za-z &\-.,]+)").unwrap()
});
static OTHER_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b((?:school|division|college)\s+of\s+[A-Za-z &\-.,]+)").unwrap()
});

/// Lines describing course materials; names there are authors.
const SKIP_LINE_WORDS: &[&str] = &[
    "textbook",
    "text:",
    "published by",
    "isbn",
    "edition",
    "pearson",
    "mcgraw",
    "wiley",
    "o'reilly",
    "openstax",
    "cengage",
];

/// Label phrases that look like names.
const NON_NAME_LABELS: &[&str] = &["course name", "class name", "program name", "degree name"];

/// Ordered so that the more specific title is reported.
const TITLES: &[&str] = &[
    "assistant professor",
    "associate professor",
    "senior lecturer",
    "adjunct professor",
    "adjunct instructor",
    "adjunct faculty",
    "lecturer",
    "professor",
    "adjunct",
];

const KNOWN_DEPARTMENTS: &[&str] = &[
    "Applied Engineering and Sciences Department",
    "Applied Engineering and Sciences",
    "Applied Engineering and Science",
    "Applied Engineering & Sciences",
    "Mechanical Engineering Technology",
    "Electrical Engineering Technology",
    "Security Studies",
    "Homeland Security",
];

const GENERIC_DEPARTMENTS: &[&str] = &[
    "dept.",
    "department",
    "department and program",
    "school of",
    "division of",
    "program",
    "college of",
    "department/program",
];

const NAME_STOPWORDS: &[&str] = &[
    "of", "in", "on", "for", "to", "by", "with", "security", "studies", "department", "college",
    "school", "division", "program", "phd", "ph.d", "professor", "lecturer", "assistant",
    "associate", "adjunct", "mr", "ms", "mrs", "dr",
];

/// Capitalized words that appear in headings but never in personal names.
const NON_PERSONAL: &[&str] = &[
    "internship", "practice", "course", "syllabus", "outline", "description", "outcomes",
    "policy", "schedule", "grading", "assignment", "exam", "final", "midterm", "attendance",
    "office", "email", "phone", "building", "room", "hall", "mill", "university", "class",
    "section", "semester", "year", "hours", "days", "spring", "summer", "fall", "winter", "ta",
    "teaching", "staff", "master", "capstone", "project", "thesis", "dissertation",
    "portfolio", "applied", "engineering", "network", "architecture", "concepts", "canvas",
    "inbox", "interactive", "textbook", "cybersecurity", "ethics", "data", "mining",
    "electronic", "design", "automation", "discrete", "mathematics", "managerial",
    "accounting", "electrical", "wildcat", "community", "first", "edition", "hampshire",
    "time", "end", "lecture", "topic", "administration", "information", "tech",
    "consultancy", "workroom", "google", "drive", "graduate", "students", "introduction",
    "career", "academic", "honesty", "credit", "hour", "networking", "technology",
    "computing", "computer", "the", "file", "system", "classroom", "help", "session",
    "manufacturing", "learning", "goals", "special", "accommodations", "contact", "using",
    "new", "openstax",
];

fn is_stopword(word: &str) -> bool {
    let lower = word.to_lowercase();
    NAME_STOPWORDS.contains(&lower.as_str()) || NON_PERSONAL.contains(&lower.as_str())
}

/// Drop nicknames in parentheses and trailing degrees.
fn clean_name(candidate: &str) -> String {
    let s = NICKNAME_RE.replace_all(candidate, " ");
    let s = DEGREE_SUFFIX_RE.replace(s.trim(), "");
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 2 to 4 capitalized parts, none of them a stop word.
pub fn is_valid_name(candidate: &str) -> bool {
    let parts: Vec<&str> = candidate.split_whitespace().collect();
    if !(2..=4).contains(&parts.len()) {
        return false;
    }
    let lower = candidate.to_lowercase();
    if NON_NAME_LABELS.iter().any(|label| lower.contains(label)) {
        return false;
    }
    parts.iter().all(|part| {
        if INITIAL_RE.is_match(part) {
            return true;
        }
        let uppercase = part.chars().filter(char::is_ascii_uppercase).count();
        if uppercase > 1 && !CAMEL_RE.is_match(part) && !HYPHENATED_RE.is_match(part) {
            return false;
        }
        NAME_PART_RE.is_match(part)
            && !part.chars().all(|c| !c.is_ascii_lowercase())
            && !is_stopword(part)
    })
}

/// The first valid name shape inside `text`.
fn name_in(text: &str) -> Option<String> {
    let cleaned = clean_name(text);
    for pattern in NAME_PATTERNS.iter() {
        for m in pattern.find_iter(&cleaned) {
            let name = clean_name(m.as_str());
            if is_valid_name(&name) {
                return Some(name);
            }
        }
    }
    None
}

fn is_material_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    SKIP_LINE_WORDS.iter().any(|word| lower.contains(word))
}

/// Name, and whether it came from an explicit label.
fn extract_name(lines: &[String]) -> Option<(String, bool)> {
    for (index, line) in lines.iter().enumerate() {
        if is_material_line(line) {
            continue;
        }
        let Some(caps) = NAME_LABEL_RE.captures(line) else {
            continue;
        };
        let rest = caps.get(1).map_or("", |m| m.as_str()).trim();
        let candidate = if rest.is_empty() {
            lines.get(index + 1).map(String::as_str).unwrap_or_default()
        } else {
            rest
        };
        if let Some(name) = name_in(candidate) {
            return Some((name, true));
        }
    }

    for line in lines.iter().filter(|line| !is_material_line(line)) {
        if let Some(name) = TITLE_PREFIX_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| name_in(m.as_str()))
        {
            return Some((name, true));
        }
    }

    for line in lines.iter().take(STANDALONE_SCAN_LINES) {
        let line = line.trim();
        if line.is_empty()
            || line.chars().count() > STANDALONE_MAX_CHARS
            || STANDALONE_SKIP_RE.is_match(line)
        {
            continue;
        }
        let cleaned = clean_name(line.trim_end_matches(|c: char| c == ',' || c.is_whitespace()));
        if NAME_PATTERNS
            .iter()
            .any(|p| p.find(&cleaned).is_some_and(|m| m.as_str() == cleaned))
            && is_valid_name(&cleaned)
        {
            return Some((cleaned, false));
        }
    }
    None
}

fn extract_title(lines: &[String]) -> Option<String> {
    let text = lines.join("\n").to_lowercase();
    TITLES
        .iter()
        .find(|title| text.contains(*title))
        .map(|title| title_case(title))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_department(lines: &[String]) -> Option<String> {
    for line in lines {
        let value = if let Some(caps) = DEPARTMENT_PROGRAM_RE.captures(line) {
            caps.get(1).map(|m| m.as_str())
        } else if let Some(caps) = DEPARTMENT_RE.captures(line) {
            caps.get(1).map(|m| m.as_str())
        } else {
            OTHER_UNIT_RE
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
        };
        let Some(value) = value else {
            continue;
        };
        let value = value
            .trim()
            .trim_end_matches(|c: char| matches!(c, ',' | '.' | '-' | '&'))
            .trim();
        let lower = value.to_lowercase();
        if value.is_empty() || GENERIC_DEPARTMENTS.contains(&lower.as_str()) || is_stopword(value) {
            continue;
        }
        let words: Vec<&str> = value.split_whitespace().take(MAX_DEPARTMENT_WORDS).collect();
        return Some(words.join(" "));
    }

    let text = lines.join("\n").to_lowercase();
    KNOWN_DEPARTMENTS
        .iter()
        .find(|dept| text.contains(&dept.to_lowercase()))
        .map(|dept| (*dept).to_string())
}

/// Instructor extractor.
#[derive(Debug, Clone)]
pub struct InstructorDetector {
    calibration: Calibration,
}

impl InstructorDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        Ok(Self {
            calibration: calibration_for(FieldName::Instructor, Calibration::default(), overrides)?,
        })
    }
}

impl FieldDetector for InstructorDetector {
    fn field(&self) -> FieldName {
        FieldName::Instructor
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let lines = doc.span(0, SCAN_LINES);
        let name = extract_name(lines).or_else(|| {
            doc.lines()
                .iter()
                .find_map(|line| DR_LASTNAME_RE.captures(line))
                .and_then(|caps| caps.get(1))
                .map(|m| (format!("Dr. {}", m.as_str()), false))
        });
        let title = extract_title(lines);
        let department = extract_department(lines);
        debug!("instructor: name {name:?} title {title:?} department {department:?}");

        let (Some((name, labelled)), Some(title), Some(department)) = (name, title, department)
        else {
            return Ok(DetectionResult::not_found());
        };
        let raw = if labelled {
            LABELLED_CONFIDENCE
        } else {
            INFERRED_CONFIDENCE
        };
        Ok(DetectionResult::found(
            format!("{name}, {title}, {department}"),
            calibrate(raw, &self.calibration),
            vec![
                format!("name: {name}"),
                format!("title: {title}"),
                format!("department: {department}"),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> DetectionResult {
        InstructorDetector::new(None)
            .unwrap()
            .detect(&Document::new(text))
            .unwrap()
    }

    #[test]
    fn test_all_three_parts() {
        let result = detect(
            "COMP 405 Syllabus\nInstructor: Jane Q. Smith, Ph.D.\nAssociate Professor\nDepartment of Applied Engineering and Sciences",
        );
        assert!(result.found);
        assert_eq!(
            result.content.as_deref(),
            Some("Jane Q. Smith, Associate Professor, Applied Engineering and Sciences")
        );
        assert_eq!(result.evidence.len(), 3);
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_missing_department_is_not_found() {
        let result = detect("Instructor: Jane Smith\nLecturer");
        assert!(!result.found);
        assert!(result.content.is_none());
    }

    #[test]
    fn test_name_on_next_line() {
        let lines: Vec<String> = ["Instructor:", "Mark Doe", "Office: Room 201"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(extract_name(&lines), Some(("Mark Doe".to_string(), true)));
    }

    #[test]
    fn test_textbook_lines_are_skipped() {
        let lines: Vec<String> = ["Textbook: Professor Alan Turing, Pearson", "Taught by Grace Hopper"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(extract_name(&lines).map(|(n, _)| n), Some("Grace Hopper".to_string()));
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("Mary-Jane Watson"));
        assert!(is_valid_name("J. R. Tolkien"));
        assert!(!is_valid_name("Course Syllabus"));
        assert!(!is_valid_name("Office Hours"));
        assert!(!is_valid_name("SMITH JONES"));
        assert!(!is_valid_name("Smith"));
    }

    #[test]
    fn test_department_forms() {
        let lines = vec!["Dept. of Security Studies".to_string()];
        assert_eq!(extract_department(&lines).as_deref(), Some("Security Studies"));
        let lines = vec!["College of Engineering and Physical Sciences at UNH".to_string()];
        assert_eq!(
            extract_department(&lines).as_deref(),
            Some("College of Engineering and Physical")
        );
    }

    #[test]
    fn test_title_is_title_cased() {
        let lines = vec!["adjunct professor of history".to_string()];
        assert_eq!(extract_title(&lines).as_deref(), Some("Adjunct Professor"));
    }
}
