//! Instructor email response time ("within 24 hours", "by the next
//! business day").
//!
//! Only contact-related regions of the document are searched. A phrase must
//! carry an explicit time and must not sit in a context about something
//! else: grading turnaround, what students must do, absences, grade
//! disputes, deadlines, support hotlines or course hours.

use std::sync::LazyLock;

use anyhow::Result;
use log::debug;
use regex::Regex;

use super::{FieldDetector, calibration_for};
use crate::engine::calibrate::Calibration;
use crate::engine::rules::{PatternRule, RuleSpec, compile_all};
use crate::engine::{DetectionResult, Document, FieldOverrides, calibrate, evidence_line};
use crate::models::FieldName;
use crate::utils::text::{ceil_boundary, floor_boundary};

const KEYWORD_BEFORE: usize = 200;
const KEYWORD_AFTER: usize = 800;
const INDICATOR_RADIUS: usize = 300;
const FALLBACK_CHARS: usize = 2000;
const CONTEXT_CHARS: usize = 100;

/// Response-time phrases; group 1 is the reported value.
const PHRASES: &[RuleSpec] = &[
    RuleSpec::new("response_time_label", r"(?i)(response\s+time\s*:?\s*[^\n.;]{0,100}?\d+(?:-\d+)?\s*(?:hour|hr|day|business\s+day)s?[^\n.;]{0,50}?)(?:[\n.;]|$)", 1.0).group(1),
    RuleSpec::new("unit_response_time", r"(?i)(\d+(?:-\d+)?\s*(?:hour|hr|day|business\s+day)s?)\s+response\s+time", 1.0).group(1),
    RuleSpec::new("within_number", r"(?i)(within\s+\d+(?:-\d+)?\s*(?:hour|hr|day|business\s+day)s?(?:\s+on\s+\w+)?(?:\s*\([^)]{0,30}\))?)", 1.0).group(1),
    RuleSpec::new("within_one_day", r"(?i)(within\s+(?:one|a)\s+(?:business\s+)?day)", 1.0).group(1),
    RuleSpec::new("respond_in", r"(?i)(?:respond|responds|reply|replies|get\s+back|answer)\s+(in\s+\d+(?:-\d+)?\s*(?:hour|hr|day|business\s+day)s?)", 1.0).group(1),
    RuleSpec::new("respond_by_next_day", r"(?i)(?:respond|reply|get\s+back|answer)\s+(by\s+(?:the\s+)?next\s+(?:business\s+)?(?:day|weekday))", 1.0).group(1),
    RuleSpec::new("typically_within", r"(?i)((?:typically|usually|generally)\s+(?:(?:respond|responds|reply|replies|get\s+back|answer)\s+)?(?:to\s+(?:emails?|students)\s+)?(?:within|in)\s+(?:\d+(?:-\d+)?\s*(?:hour|hr|day)s?|(?:one|a)\s+(?:business\s+)?day)(?:\s*\([^)]{0,30}\))?)", 1.0).group(1),
    RuleSpec::new("expect_reply", r"(?i)expect\s+(?:a\s+)?(?:response|reply)\s+((?:within|in)\s+\d+(?:-\d+)?\s*(?:hour|hr|day)s?)", 1.0).group(1),
    RuleSpec::new("expect_to_hear", r"(?i)expect\s+to\s+hear\s+(?:from\s+me\s+)?((?:within|in)\s+\d+(?:-\d+)?\s*(?:hour|hr|day)s?)", 1.0).group(1),
    RuleSpec::new("you_will_hear", r"(?i)you(?:'ll|\s+will)\s+(?:get\s+a\s+)?(?:response|reply|hear\s+from\s+me)\s+((?:within|in)\s+\d+(?:-\d+)?\s*(?:hour|hr|day)s?)", 1.0).group(1),
    RuleSpec::new("receive_reply", r"(?i)receive\s+(?:a\s+)?(?:response|reply)\s+((?:within|in)\s+\d+(?:-\d+)?\s*(?:hour|hr|day)s?)", 1.0).group(1),
    RuleSpec::new("responses_are_sent", r"(?i)(?:responses|replies)\s+(?:are\s+)?(?:typically\s+|usually\s+|generally\s+)?(?:sent\s+)?((?:within|in)\s+\d+(?:-\d+)?\s*(?:hour|hr|day)s?)", 1.0).group(1),
    RuleSpec::new("no_later_than", r"(?i)(?:respond|reply|get\s+back|answer)\s+(no\s+later\s+than\s+(?:(?:the\s+)?next\s+(?:business\s+)?(?:day|weekday)|\d+(?:-\d+)?\s*(?:hour|hr|day)s?))", 1.0).group(1),
    RuleSpec::new("by_next_day", r"(?i)(by\s+(?:the\s+)?next\s+(?:business\s+)?(?:day|weekday))", 1.0).group(1),
    RuleSpec::new("hour_range", r"(?i)(24-48\s*hours?)", 1.0).group(1),
    RuleSpec::new("hours", r"(?i)((?:24|48)\s*hours?)", 1.0).group(1),
    RuleSpec::new("business_days", r"(?i)(\d+\s+business\s+days?)", 1.0).group(1),
    RuleSpec::new("one_day", r"(?i)\b((?:one|a|same|next)\s+(?:business\s+)?(?:day|weekday))", 1.0).group(1),
];

const CONTACT_KEYWORDS: &[&str] = &[
    r"(?i)contact",
    r"(?i)email",
    r"(?i)office hour",
    r"(?i)communication",
    r"(?i)reach me",
    r"(?i)get in touch",
    r"(?i)response time",
    r"(?i)availability",
    r"(?i)questions",
];

const RESPONSE_INDICATORS: &[&str] = &[
    r"(?i)(?:respond|reply|get\s+back|answer).*(?:within|in)\s+\d+",
    r"(?i)(?:within|in)\s+\d+.*(?:respond|reply|get\s+back)",
    r"(?i)response\s+time",
    r"(?i)I\s+(?:will\s+)?(?:respond|reply|get\s+back)",
];

static EMAIL_OR_CONTACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)email|contact").unwrap());

static TIME_UNIT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d+\s*(?:hour|hr|day|business\s+day)s?",
        r"next\s+(?:business\s+)?(?:day|weekday)",
        r"\b(?:one|a)\s+(?:business\s+)?day",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const VAGUE_TERMS: &[&str] = &[
    "may vary",
    "varies",
    "depends",
    "as soon as possible",
    "asap",
    "promptly",
    "quickly",
];

const RESPONSE_CONTEXT_WORDS: &[&str] = &[
    "email",
    "respond",
    "reply",
    "contact",
    "reach",
    "get in touch",
    "message",
    "communication",
];

/// Contexts in which a time phrase is about something else.
const REJECTIONS: &[(&str, &[&str])] = &[
    (
        "grading_turnaround",
        &[
            r"assignments?\s+(?:will\s+)?(?:be\s+)?(?:returned|graded)",
            r"(?:returned|graded).*assignments?",
            r"once\s+(?:they\s+are\s+)?graded",
            r"graded.*(?:within|in)\s+\d+",
            r"(?:within|in)\s+\d+.*graded",
            r"turnaround.*(?:within|in)\s+\d+",
            r"(?:within|in)\s+\d+.*turnaround",
        ],
    ),
    (
        "student_obligation",
        &[
            r"students?\s+(?:must|should|need\s+to)\s+(?:contact|notify|email|reach)",
            r"you\s+(?:must|should|need\s+to)\s+(?:contact|notify|email|reach)",
            r"(?:contact|notify|email).*(?:instructor|professor).*(?:within|in)\s+\d+",
            r"(?:within|in)\s+\d+.*(?:of|after).*(?:missed|absence|exam)",
            r"must\s+(?:contact|notify|email|reach).*(?:within|in)\s+\d+",
        ],
    ),
    (
        "absence",
        &[
            r"miss(?:ing|ed)?\s+(?:a\s+)?class",
            r"absence.*(?:before|after|within)",
            r"(?:before|after).*absence",
            r"(?:notify|inform).*(?:instructor|professor).*(?:absence|missing)",
            r"if\s+you\s+miss\s+(?:a\s+)?class",
            r"make\s+up.*absence",
        ],
    ),
    (
        "grade_dispute",
        &[
            r"discrepanc(?:y|ies)",
            r"grade.*(?:published|posted|dispute|error|mistake|concern)",
            r"(?:published|posted).*grade",
            r"if.*you.*(?:disagree|question).*grade",
            r"regrade.*request",
            r"appeal.*grade",
        ],
    ),
    (
        "more_than",
        &[r"more\s+than\s+\d+", r"more\s+than\s+a\s+(?:day|hour)"],
    ),
    (
        "student_circumstance",
        &[
            r"student\s+(?:health|support|success|absence|performance)",
            r"extenuating\s+circumstance",
            r"unavailable.*(?:day|hour)",
            r"extended\s+absence",
            r"personal.*(?:health|matter)",
        ],
    ),
    (
        "tech_support",
        &[
            r"tech(?:nical)?\s+(?:help|support).*(?:\d+\s*hours?|24/7)",
            r"help\s+desk.*available",
            r"support\s+(?:is\s+)?available",
            r"canvas\s+support",
            r"\bit\s+support",
            r"24/7",
            r"hotline",
            r"\d+\s*hours?\s+a\s+day",
            r"crisis|domestic\s+violence|sexual\s+assault",
            r"counseling.*available",
        ],
    ),
    (
        "course_hours",
        &[
            r"course\s+runs",
            r"total\s+(?:credit\s+)?hours",
            r"credit\s+hours",
            r"hours?\s+per\s+week",
            r"hours?\s+of\s+instruction",
            r"contact\s+hours",
            r"lecture\s+hours",
            r"class\s+meets.*hours",
        ],
    ),
];

/// Deadline wording; rejects only when the context says nothing about
/// replying.
const DEADLINE_PATTERNS: &[&str] = &[
    r"\bassignments?\b.*(?:due|submit|turn\s+in)",
    r"(?:due|submit|turn\s+in).*\bassignments?\b",
    r"\bhomeworks?\b.*(?:due|submit)",
    r"\b(?:exams?|quiz(?:zes)?|tests?|projects?)\b.*(?:due|submit)",
    r"\bdeadline\b.*\bfor\b",
    r"\blate\b.*(?:penalty|points|grade)",
];

static REPLY_WORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"email|respond|reply|contact").unwrap());

static LABEL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^response\s+time\s*:?\s*").unwrap());
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)").unwrap());
static GLUED_UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(hours?|hrs?|days?)").unwrap());
static SINGULAR_UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:-\d+)?) (hour|hr|day)\b").unwrap());
static DIGIT_UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+\s*(?:hour|day)").unwrap());

fn has_explicit_time(text: &str) -> bool {
    let lower = text.to_lowercase();
    TIME_UNIT_RES.iter().any(|re| re.is_match(&lower))
        && !VAGUE_TERMS.iter().any(|term| lower.contains(term))
}

/// Normalize spacing and units: "24hours" becomes "24 hours", "1 - 2 day"
/// becomes "1-2 days".
pub fn clean_response_time(text: &str) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let text = LABEL_PREFIX_RE.replace(&text, "");
    let text = text
        .trim_start_matches('-')
        .trim()
        .trim_end_matches(['.', ',', ';', ':']);
    let text = RANGE_RE.replace_all(text, "$1-$2");
    let text = GLUED_UNIT_RE.replace_all(&text, "$1 $2");
    let text = SINGULAR_UNIT_RE.replace_all(&text, |caps: &regex::Captures<'_>| {
        if &caps[1] == "1" {
            caps[0].to_string()
        } else {
            format!("{} {}s", &caps[1], &caps[2])
        }
    });
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Score of one phrase; higher is more specific.
pub fn phrase_score(phrase: &str) -> u32 {
    let lower = phrase.to_lowercase();
    let mut score = 1;
    if lower.contains("response time") {
        score += 5;
    }
    if lower.contains("within") {
        score += 3;
    }
    if DIGIT_UNIT_RE.is_match(phrase) {
        score += 2;
    }
    if phrase.contains('(') || lower.contains("business") {
        score += 1;
    }
    if lower.contains("no later than") {
        score += 2;
    }
    if lower.contains("weekday") {
        score += 1;
    }
    if ["typically", "usually", "generally"]
        .iter()
        .any(|w| lower.contains(w))
    {
        score += 2;
    }
    score
}

#[derive(Debug, Clone)]
struct Phrase {
    value: String,
    start: usize,
    score: u32,
}

/// Response time extractor.
#[derive(Debug, Clone)]
pub struct ResponseTimeDetector {
    phrases: Vec<PatternRule>,
    keywords: Vec<Regex>,
    indicators: Vec<Regex>,
    rejections: Vec<(&'static str, Vec<Regex>)>,
    deadlines: Vec<Regex>,
    calibration: Calibration,
}

impl ResponseTimeDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        let field = FieldName::ResponseTime;
        let name = field.as_ref();
        let phrases = PHRASES
            .iter()
            .map(|spec| PatternRule::compile(name, spec))
            .collect::<Result<Vec<_>>>()?;
        let rejections = REJECTIONS
            .iter()
            .map(|(kind, patterns)| compile_all(name, patterns).map(|compiled| (*kind, compiled)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            phrases,
            keywords: compile_all(name, CONTACT_KEYWORDS)?,
            indicators: compile_all(name, RESPONSE_INDICATORS)?,
            rejections,
            deadlines: compile_all(name, DEADLINE_PATTERNS)?,
            calibration: calibration_for(field, Calibration::new(10.0, 0.5, 0.95), overrides)?,
        })
    }

    /// Byte ranges of contact-related regions, merged.
    fn contact_windows(&self, text: &str) -> Vec<(usize, usize)> {
        let mut windows = Vec::new();
        for re in &self.keywords {
            for m in re.find_iter(text) {
                windows.push((
                    m.start().saturating_sub(KEYWORD_BEFORE),
                    (m.end() + KEYWORD_AFTER).min(text.len()),
                ));
            }
        }
        for re in &self.indicators {
            for m in re.find_iter(text) {
                windows.push((
                    m.start().saturating_sub(INDICATOR_RADIUS),
                    (m.end() + INDICATOR_RADIUS).min(text.len()),
                ));
            }
        }
        if windows.is_empty() {
            let head = floor_boundary(text, FALLBACK_CHARS.min(text.len()));
            if EMAIL_OR_CONTACT_RE.is_match(&text[..head]) {
                return vec![(0, head)];
            }
            return Vec::new();
        }

        windows.sort_unstable();
        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (start, end) in windows {
            let start = floor_boundary(text, start);
            let end = ceil_boundary(text, end);
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        merged
    }

    /// The kind of context that disqualifies `phrase`, if any.
    fn rejection(&self, phrase: &str, context: &str) -> Option<&'static str> {
        let phrase_lower = phrase.to_lowercase();
        let combined = format!("{phrase_lower} {}", context.to_lowercase());
        if !phrase_lower.contains("response time")
            && !RESPONSE_CONTEXT_WORDS.iter().any(|w| combined.contains(w))
        {
            return Some("no_response_context");
        }
        if let Some((kind, _)) = self
            .rejections
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(&combined)))
        {
            return Some(kind);
        }
        if self.deadlines.iter().any(|re| re.is_match(&combined))
            && !REPLY_WORDS_RE.is_match(&combined)
        {
            return Some("deadline");
        }
        None
    }

    fn best_phrase(&self, text: &str) -> Option<Phrase> {
        let mut best: Option<Phrase> = None;
        for (start, end) in self.contact_windows(text) {
            let window = &text[start..end];
            for rule in &self.phrases {
                for caps in rule.regex.captures_iter(window) {
                    let (Some(whole), Some(value)) = (caps.get(0), caps.get(rule.group)) else {
                        continue;
                    };
                    let value = value.as_str().trim();
                    if !has_explicit_time(value) {
                        continue;
                    }
                    let context = &window[floor_boundary(window, whole.start().saturating_sub(CONTEXT_CHARS))
                        ..ceil_boundary(window, (whole.end() + CONTEXT_CHARS).min(window.len()))];
                    if let Some(kind) = self.rejection(value, context) {
                        debug!("response_time: rejected {value:?} ({}): {kind}", rule.label);
                        continue;
                    }
                    let candidate = Phrase {
                        value: value.to_string(),
                        start: start + whole.start(),
                        score: phrase_score(value),
                    };
                    let better = best.as_ref().is_none_or(|b| {
                        candidate.score > b.score
                            || (candidate.score == b.score && candidate.start < b.start)
                    });
                    if better {
                        best = Some(candidate);
                    }
                }
            }
        }
        best
    }
}

impl FieldDetector for ResponseTimeDetector {
    fn field(&self) -> FieldName {
        FieldName::ResponseTime
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let text = doc.text();
        let Some(best) = self.best_phrase(text) else {
            return Ok(DetectionResult::not_found());
        };
        let cleaned = clean_response_time(&best.value);
        if cleaned.is_empty() || !has_explicit_time(&cleaned) {
            return Ok(DetectionResult::not_found());
        }
        let line = text[..best.start].matches('\n').count();
        Ok(DetectionResult::found(
            cleaned,
            calibrate(f64::from(best.score), &self.calibration),
            vec![evidence_line(doc, line), format!("score: {}", best.score)],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> DetectionResult {
        ResponseTimeDetector::new(None)
            .unwrap()
            .detect(&Document::new(text))
            .unwrap()
    }

    fn content(text: &str) -> Option<String> {
        detect(text).content
    }

    #[test]
    fn test_common_phrasings() {
        assert_eq!(
            content("Email me anytime. I respond within 24 hours.").as_deref(),
            Some("within 24 hours")
        );
        assert_eq!(
            content("Email policy: I'll get back to you within one business day.").as_deref(),
            Some("within one business day")
        );
        assert_eq!(
            content("You can expect a reply within 24-48 hours.").as_deref(),
            Some("within 24-48 hours")
        );
        assert_eq!(
            content("Email: I typically respond within 24 hours on weekdays.").as_deref(),
            Some("typically respond within 24 hours")
        );
    }

    #[test]
    fn test_response_time_label() {
        let result = detect("Response time: 48 hours (business days)");
        assert_eq!(result.content.as_deref(), Some("48 hours (business days)"));
        assert_eq!(result.evidence[1], "score: 9");
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_false_positive_contexts() {
        assert!(!detect("Assignments must be submitted within 24 hours.").found);
        assert!(!detect("Canvas support available 24 hours a day.").found);
        assert!(
            !detect(
                "Please contact me regarding any discrepancies within 7 days after the grade is published."
            )
            .found
        );
        assert!(
            !detect("If you miss a class meeting, email me within 3 days after your absence.")
                .found
        );
    }

    #[test]
    fn test_vague_terms_rejected() {
        assert!(!detect("Email me; response time varies and may vary by day.").found);
    }

    #[test]
    fn test_clean_response_time() {
        assert_eq!(clean_response_time("within 24hours."), "within 24 hours");
        assert_eq!(clean_response_time("1 - 2 day"), "1-2 days");
        assert_eq!(clean_response_time("Response time: 1 day"), "1 day");
    }
}
