//! Instructor email and preferred contact method.
//!
//! Both fields look for a campus address the same way, in order:
//! 1. `heading_window`: a line with a contact clue and an address on that
//!    line or the next one, within the first 150 lines
//! 2. `header_any`: the first address in the first 1200 characters
//! 3. `fallback_any`: the first address anywhere
//!
//! The preferred-contact field first looks for an explicit "preferred
//! contact" statement and reports the channel it names.

use std::sync::LazyLock;

use anyhow::Result;
use log::debug;
use regex::Regex;

use super::{FieldDetector, calibration_for};
use crate::engine::calibrate::Calibration;
use crate::engine::rules::KeywordSet;
use crate::engine::{DetectionResult, Document, FieldOverrides, calibrate, evidence_line};
use crate::models::FieldName;

const HEADING_SCAN_LINES: usize = 150;
const HEADER_CHARS: usize = 1200;
const CONFIDENCE: f64 = 0.95;

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9]+(?:\.[A-Za-z0-9]+)*@(?:unh|usnh)\.edu\b").unwrap()
});

const HEADING_CLUES: &[&str] = &[
    r"(?i)\be-?mail\b",
    r"(?i)\bcontact\b",
    r"(?i)\bpreferred\s+contact\s+method\b",
    r"(?i)\binstructor\b",
    r"(?i)\bprofessor\b",
];

/// Departmental and office addresses that are never the instructor's.
const DEPARTMENTAL_ADDRESSES: &[&str] = &[
    "janessa.zurek@unh.edu",
    "sas.office@unh.edu",
    "unhm.studentdevelopment@unh.edu",
];

static PREFERRED_STATEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:preferred\s+(?:method\s+of\s+)?contact(?:\s+method)?|best\s+way\s+to\s+(?:contact|reach)\s+me|preferred\s+communication)\b",
    )
    .unwrap()
});

/// Channels a preferred-contact statement may name, most specific first.
static CHANNELS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\b(?:canvas|mycourses)\s+(?:inbox|message|messaging|mail)\b", "Canvas message"),
        (r"(?i)\b(?:microsoft\s+)?teams\b", "Microsoft Teams"),
        (r"(?i)\bzoom\b", "Zoom"),
        (r"(?i)\boffice\s+hours\b", "Office hours"),
        (r"(?i)\b(?:phone|call|text)\b", "Phone"),
        (r"(?i)\be-?mail\b", "Email"),
    ]
    .into_iter()
    .map(|(p, label)| (Regex::new(p).unwrap(), label))
    .collect()
});

/// How an address was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LocateMethod {
    HeadingWindow,
    HeaderAny,
    FallbackAny,
    PreferredStatement,
}

/// A located address and where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub value: String,
    pub line_index: usize,
    pub method: LocateMethod,
}

/// The shared three-step address search.
#[derive(Debug, Clone)]
pub struct AddressLocator {
    clues: KeywordSet,
}

impl AddressLocator {
    pub fn new(field: FieldName) -> Result<Self> {
        Ok(Self {
            clues: KeywordSet::compile(field.as_ref(), HEADING_CLUES)?,
        })
    }

    pub fn locate(&self, doc: &Document) -> Option<Located> {
        self.near_heading(doc)
            .or_else(|| first_address(doc, doc.head(HEADER_CHARS), LocateMethod::HeaderAny))
            .or_else(|| first_address(doc, doc.text(), LocateMethod::FallbackAny))
    }

    fn near_heading(&self, doc: &Document) -> Option<Located> {
        let lines = doc.span(0, HEADING_SCAN_LINES);
        for (index, line) in lines.iter().enumerate() {
            if !self.clues.is_match(line) {
                continue;
            }
            for offset in 0..=1 {
                let Some(candidate) = lines.get(index + offset) else {
                    continue;
                };
                if let Some(m) = ADDRESS_RE.find(candidate) {
                    return Some(Located {
                        value: m.as_str().to_string(),
                        line_index: index + offset,
                        method: LocateMethod::HeadingWindow,
                    });
                }
            }
        }
        None
    }
}

fn first_address(doc: &Document, haystack: &str, method: LocateMethod) -> Option<Located> {
    let m = ADDRESS_RE.find(haystack)?;
    Some(Located {
        value: m.as_str().to_string(),
        line_index: doc.text()[..m.start()].matches('\n').count(),
        method,
    })
}

fn found(doc: &Document, located: &Located, calibration: &Calibration) -> DetectionResult {
    DetectionResult::found(
        located.value.clone(),
        calibrate(CONFIDENCE, calibration),
        vec![
            evidence_line(doc, located.line_index),
            format!("method: {}", located.method),
        ],
    )
}

/// Instructor email.
#[derive(Debug, Clone)]
pub struct EmailDetector {
    locator: AddressLocator,
    calibration: Calibration,
}

impl EmailDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        Ok(Self {
            locator: AddressLocator::new(FieldName::Email)?,
            calibration: calibration_for(FieldName::Email, Calibration::default(), overrides)?,
        })
    }
}

impl FieldDetector for EmailDetector {
    fn field(&self) -> FieldName {
        FieldName::Email
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let Some(located) = self.locator.locate(doc) else {
            return Ok(DetectionResult::not_found());
        };
        let lower = located.value.to_lowercase();
        if DEPARTMENTAL_ADDRESSES.contains(&lower.as_str()) {
            debug!("email: rejecting departmental address {}", located.value);
            return Ok(DetectionResult::not_found());
        }
        Ok(found(doc, &located, &self.calibration))
    }
}

/// Preferred contact method.
#[derive(Debug, Clone)]
pub struct PreferredContactDetector {
    locator: AddressLocator,
    calibration: Calibration,
}

impl PreferredContactDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        Ok(Self {
            locator: AddressLocator::new(FieldName::PreferredContact)?,
            calibration: calibration_for(
                FieldName::PreferredContact,
                Calibration::default(),
                overrides,
            )?,
        })
    }

    /// An explicit statement of the preferred channel. When it names email
    /// and an address sits on the same or next line, the address wins.
    fn preferred_statement(&self, doc: &Document) -> Option<Located> {
        let lines = doc.span(0, HEADING_SCAN_LINES);
        for (index, line) in lines.iter().enumerate() {
            let Some(statement) = PREFERRED_STATEMENT_RE.find(line) else {
                continue;
            };
            let rest = &line[statement.end()..];
            let next = lines.get(index + 1).map(String::as_str).unwrap_or_default();
            let stated = if rest.trim_matches(|c: char| c == ':' || c.is_whitespace()).is_empty() {
                next
            } else {
                rest
            };

            let address = ADDRESS_RE
                .find(rest)
                .map(|m| (m, index))
                .or_else(|| ADDRESS_RE.find(next).map(|m| (m, index + 1)));
            let channel = CHANNELS
                .iter()
                .find(|(re, _)| re.is_match(stated))
                .map(|(_, label)| *label);

            let value = match (channel, address) {
                (Some("Email") | None, Some((m, at))) => {
                    return Some(Located {
                        value: m.as_str().to_string(),
                        line_index: at,
                        method: LocateMethod::PreferredStatement,
                    });
                }
                (Some(label), _) => label.to_string(),
                (None, None) => continue,
            };
            return Some(Located {
                value,
                line_index: index,
                method: LocateMethod::PreferredStatement,
            });
        }
        None
    }
}

impl FieldDetector for PreferredContactDetector {
    fn field(&self) -> FieldName {
        FieldName::PreferredContact
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let located = self
            .preferred_statement(doc)
            .or_else(|| self.locator.locate(doc));
        Ok(match located {
            Some(located) => found(doc, &located, &self.calibration),
            None => DetectionResult::not_found(),
        })
    }
}
