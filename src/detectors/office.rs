//! Instructor office information: location, hours and phone.
//!
//! The location is a plain [`FieldSpec`] run by the generic pipeline. Hours
//! and phone need post-match validation that the pipeline does not model,
//! so they are small extractors over compiled [`PatternRule`]s.

use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use log::debug;
use regex::{Regex, RegexSet};

use super::{FieldDetector, calibration_for};
use crate::engine::calibrate::Calibration;
use crate::engine::candidates::LineBounds;
use crate::engine::config::{Aggregation, CleanupSpec, FieldOverrides, FieldSpec, FieldTuning};
use crate::engine::rules::{PatternRule, RuleSpec, TierSpec};
use crate::engine::scoring::LabelScope;
use crate::engine::{DetectionResult, Document, calibrate, evidence_line};
use crate::models::FieldName;

const LOCATION_SEARCH_CHARS: usize = 5000;
const HOURS_SEARCH_CHARS: usize = 8000;
const PHONE_SEARCH_CHARS: usize = 2000;

const LOCATION_TIERS: &[TierSpec] = &[
    TierSpec {
        name: "labelled_office",
        rules: &[
            RuleSpec::new(
                "office_label",
                r"(?i)\boffice\s*(?:hours?\s*(?:and|&|/)?\s*)?(?:location|room)?\s*(?:/\s*hours?)?\s*:\s*((?:pand[o]?ra\s*(?:building|mill)?,?\s*)?(?:(?:room|rm\.?)\s*\d+[A-Z]?|P\s?\d{2,4}[A-Z]?))\b",
                0.95,
            )
            .group(1),
            RuleSpec::new(
                "office_hours_then_room",
                r"(?i)\boffice\s*hours?\s*:.*?,\s*((?:room|rm\.?)\s*\d+[A-Z]?)\b",
                0.92,
            )
            .group(1),
            RuleSpec::new(
                "parenthesized_office",
                r"(?i)\(office:\s*((?:room|rm\.?)\s*\d+[A-Z]?)\b",
                0.92,
            )
            .group(1),
        ],
    },
    TierSpec {
        name: "pandora_room",
        rules: &[RuleSpec::new(
            "pandora_room",
            r"(?i)\b(pand[o]?ra\s+(?:rm\.?|room|lab)\s*\d+[A-Z]?)\b",
            0.88,
        )
        .group(1)],
    },
    TierSpec {
        name: "near_office_label",
        rules: &[
            RuleSpec::new(
                "p_number_near_office",
                r"(?i)\b(?:office|contact)\b[^\n]{0,50}?\b(P\d{3}[A-Z]?)\b",
                0.80,
            )
            .group(1),
            RuleSpec::new(
                "room_near_office",
                r"(?i)\b(?:office|contact\s*information)\b[^\n]{0,50}?\b((?:room|rm\.?)\s*\d+[A-Z]?)\b",
                0.80,
            )
            .group(1),
        ],
    },
    TierSpec {
        name: "instructor_line",
        rules: &[RuleSpec::new(
            "room_on_instructor_line",
            r"(?i)\b(?:instructor|professor|faculty)\b[^\n]{0,150}?\b((?:room|rm\.?)\s*\d+[A-Z]?)\b",
            0.70,
        )
        .group(1)],
    },
];

const LOCATION_TARGET: &[&str] = &[
    r"(?i)\boffice\b",
    r"(?i)\bcontact\s+information\b",
];

/// Classroom indicators: a room next to these is where the class meets.
const LOCATION_EXCLUDED: &[&str] = &[
    r"(?i)\bclass\s*meeting",
    r"(?i)\blab\s*meeting",
    r"(?i)\btime\s*and\s*location\b.*\broom\b",
    r"(?i)\bclass\s+location\b",
    r"(?i)\bclassroom\b",
    r"(?i)\bclass\s+meets\b",
];

pub const LOCATION_SPEC: FieldSpec = FieldSpec {
    field: FieldName::OfficeLocation,
    tiers: LOCATION_TIERS,
    bounds: LineBounds {
        min_chars: 2,
        max_chars: 500,
    },
    max_lines: None,
    max_chars: Some(LOCATION_SEARCH_CHARS),
    target: LOCATION_TARGET,
    excluded: LOCATION_EXCLUDED,
    explicit_label: None,
    label_scope: LabelScope::Immediate,
    penalties: &[],
    position_buckets: &[],
    aggregation: Aggregation::PerMatch,
    cleanup: CleanupSpec {
        strip_trailing_punct: true,
        rewrites: &[
            (r"(?i)^pand[o]?ra\b.*?(\d+[A-Z]?)$", "Pandora Room $1"),
            (r"(?i)^(?:room|rm\.?)\s*(\d+[A-Z]?)$", "Room $1"),
            (r"(?i)^p\s?(\d+[A-Z]?)$", "P$1"),
        ],
        ..CleanupSpec::NONE
    },
    tuning: FieldTuning {
        header_lines: 40,
        header_bonus: 0.05,
        target_bonus: 0.03,
        neutral_factor: 0.9,
        window_before: 2,
        window_after: 2,
        calibration: Calibration::new(1.0, 0.0, 0.95),
        ..FieldTuning::DEFAULT
    },
};

// Office hours

const DAY: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";

/// How much of a capture survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// The pattern already bounds the capture.
    Raw,
    /// First line, cut at the next label-like word or sentence end.
    Words,
    /// Several lines, cut before the next section-like line.
    Block,
}

struct HoursRule {
    label: &'static str,
    pattern: String,
    stop: Stop,
}

fn hours_rule(label: &'static str, pattern: &str, stop: Stop) -> HoursRule {
    HoursRule {
        label,
        pattern: format!("(?im){pattern}"),
        stop,
    }
}

fn hours_rules() -> Vec<HoursRule> {
    let time_range = r"\d{1,2}(?::\d{2})?\s*-\s*\d{1,2}(?::\d{2})?\s*[ap]m";
    let day_segment = format!(r"(?:{DAY})\s*[-:]\s*\d{{1,2}}:\d{{2}}\s*-\s*\d{{1,2}}:\d{{2}}");
    vec![
        hours_rule(
            "canvas_inbox_meetings",
            r"(?:to\s+)?schedule\s+(?:in-person\s+or\s+)?zoom\s+meetings\s+use\s+the\s+(canvas\s+inbox\s+tool)",
            Stop::Raw,
        ),
        hours_rule(
            "canvas_inbox_appointment",
            r"make\s+an?\s+appointment\s+using\s+(?:the\s+)?(mycourses\s+canvas\s+inbox\s+tool)",
            Stop::Raw,
        ),
        hours_rule(
            "help_session_day",
            &format!(r"([mtwrf][a-z]*,?\s+{time_range}\s+\(after-class\s+help\s+session\))"),
            Stop::Raw,
        ),
        hours_rule(
            "help_session_time",
            r"(\d{1,2}(?::\d{2})?\s*[ap]m\s*-\s*\d{1,2}(?::\d{2})?\s*[ap]m\s+\(after-class\s+help\s+session\))",
            Stop::Raw,
        ),
        hours_rule(
            "help_session_named_first",
            &format!(r"help\s+session,?\s+([mtwrf][a-z]*,?\s+{time_range})"),
            Stop::Raw,
        ),
        hours_rule(
            "section_after_class",
            r"(section\s+[a-z]\d+:\s+after\s+class;\s+by\s+appointment)",
            Stop::Raw,
        ),
        hours_rule(
            "calendly",
            r"(https?://\s*(?:www\.)?calendly\.com/[a-z0-9_/-]+)",
            Stop::Raw,
        ),
        hours_rule(
            "see_schedule",
            r"(see\s+schedule\s+on\s+canvas(?:;\s+by\s+appointment)?)",
            Stop::Raw,
        ),
        hours_rule(
            "hours_from_link",
            r"(see\s+instructor\s+office\s+hours\s+from\s+a\s+link[^.!\n]{0,40})",
            Stop::Raw,
        ),
        hours_rule(
            "after_class",
            r"(after\s+class;\s+by\s+appointment)",
            Stop::Raw,
        ),
        hours_rule(
            "after_lecture",
            r"(after\s+lecture\s+or\s+private\s+(?:zoom|teams)[^\n]{0,80})",
            Stop::Raw,
        ),
        hours_rule(
            "meetings_by_appointment",
            r"meetings?\s+by\s+appointment[\s:-]+([^\n]{5,100})",
            Stop::Raw,
        ),
        hours_rule(
            "available_to_meet",
            r"(available\s+to\s+meet\s+by\s+appointment[^\n]{0,80})",
            Stop::Raw,
        ),
        hours_rule(
            "to_be_determined",
            r"((?:office\s+hours\s+)?to\s+be\s+determined[^\n]{0,80})",
            Stop::Raw,
        ),
        hours_rule(
            "appointment_day_range",
            &format!(r"(by\s+appointment\s+(?:{DAY})\s*-\s*(?:{DAY})[^\n]{{0,100}})"),
            Stop::Raw,
        ),
        hours_rule(
            "compact_day_pairs",
            r"([mtwrf][a-z]+s?\s+\d{1,2}\s*-\s*\d{1,2},?\s+[mtwrf][a-z]+s?\s+\d{1,2}\s*-\s*\d{1,2})\b",
            Stop::Raw,
        ),
        hours_rule(
            "as_posted",
            r"(as\s+posted\s+outside\s+my\s+office[^\n]{0,80})",
            Stop::Raw,
        ),
        hours_rule(
            "labelled_semicolon_list",
            r"\boffice\s*(?:hours?|hrs?)[\s:]+([^\n]+;[^\n]*(?:\n[^\n]*){0,3})",
            Stop::Block,
        ),
        hours_rule(
            "labelled_line",
            r"\boffice\s*(?:hours?|hrs?)[\s:]+([^\n;]{5,150})",
            Stop::Words,
        ),
        hours_rule(
            "virtual_office_hours",
            r"\bvirtual\s*office\s*(?:hours?|hrs?)\.?:?\s*([^\n]{5,100})",
            Stop::Words,
        ),
        hours_rule(
            "location_then_hours",
            r"\boffice\s*location/?hours?:[^;\n]+;\s*([mtwrf]\s+\d{1,2}:\d{2}[^.\n]+)",
            Stop::Raw,
        ),
        hours_rule(
            "day_per_line",
            &format!(r"\bhours?[ \t:]*\n({day_segment}[ \t]*(?:\n{day_segment}[ \t]*)+)"),
            Stop::Raw,
        ),
        hours_rule(
            "days_on_one_line",
            &format!(r"\bhours?[\s:]+({day_segment}(?:\s+{day_segment})+)"),
            Stop::Raw,
        ),
        hours_rule(
            "day_semicolon_list",
            r"\b(?:hours?|hrs?)[\s:]+([mtwrf][a-z]*[^.;\n]+;[^\n]*(?:\n[^\n]*){0,2})",
            Stop::Block,
        ),
        hours_rule(
            "day_line",
            r"\b(?:hours?|hrs?)[\s:]+([mtwrf][a-z]*[^\n.;]{5,150})",
            Stop::Words,
        ),
        hours_rule(
            "time_line",
            r"\b(?:hours?|hrs?)[\s:]+(\d{1,2}:\d{2}\s*[ap]m[^.\n]{0,80})",
            Stop::Words,
        ),
        hours_rule(
            "by_appointment",
            r"\b(?:office\s*)?hours?[\s:]+(by\s+appointment[^.\n]{0,120})",
            Stop::Raw,
        ),
        hours_rule(
            "scheduled_by_appointment",
            r"\boffice\s*hours?\s+are\s+(scheduled?\s+by\s+appointment[^\n]{0,50})",
            Stop::Raw,
        ),
        hours_rule(
            "by_arrangement",
            r"\b(?:office\s*)?hours?[\s:]+(by\s+arrangement[^.\n]{0,100})",
            Stop::Raw,
        ),
        hours_rule(
            "please_contact",
            r"\b(?:office\s*)?hours?[\s:]+(please\s+contact\s+(?:the\s+)?(?:instructor|professor)[^.\n]{0,100})",
            Stop::Raw,
        ),
        hours_rule(
            "appointment_in_person_or_virtual",
            r"\b(?:office\s*)?hours?[\s:]+(by\s+appointment[^;\n]*;\s*(?:available\s+)?in\s+person\s+or\s+virtual[^\n]*)",
            Stop::Raw,
        ),
        hours_rule(
            "available",
            r"\b(?:office\s*)?hours?[\s:]+(available\s+(?:in\s+person|virtually)[^\n]{0,100})",
            Stop::Raw,
        ),
        hours_rule(
            "anytime_zoom",
            r"\boffice\s*hours?[\s:]+(anytime\s+by\s+zoom[^\n.]{0,80})",
            Stop::Raw,
        ),
        hours_rule(
            "monday_zoom",
            r"(mondays?\s+\d{1,2}(?:[-:]\d{1,2})?\s*[ap]m\s*via\s*zoom[^\n]{0,50})",
            Stop::Raw,
        ),
        hours_rule(
            "monday_time",
            r"(mondays?\s+\d{1,2}[-:]\d{1,2}\s*[ap]m[^,\n]*(?:,\s*plus\s+by\s+appointment)?)",
            Stop::Raw,
        ),
        hours_rule(
            "hours_day_text",
            r"\b(?:office\s*)?hours?[\s:]+(?:on\s+)?([mtwrf][^\n]{5,80})",
            Stop::Words,
        ),
        hours_rule(
            "hours_time_text",
            r"\b(?:office\s*)?hours?[\s:]+(\d{1,2}(?::\d{2})?\s*[ap]m[^\n]{0,80})",
            Stop::Words,
        ),
    ]
}

static TBD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:office\s*)?hours?\s*:\s*TBD\b|\bhours\s+TBD\b)").unwrap()
});

/// Where a `Stop::Words` capture ends.
static WORD_STOP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b(?:phone|e-?mail|web|course|prerequisites?|text|instructor|I am)\b|\.(?:\s|$))",
    )
    .unwrap()
});

/// A line that starts the next section.
static SECTION_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[A-Z][a-z]+\s*(?:Prerequisite|Text|Course|Description|Location|Meeting|Schedule|Required|Recommended)|[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*:|(?i:phone|e-?mail|course|instructor|office)\b)",
    )
    .unwrap()
});

static DAY_SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:monday|tuesday|wednesday|thursday|friday)\s*[-:]\s*\d{1,2}:\d{2}\s*-\s*\d{1,2}:\d{2}")
        .unwrap()
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static SEMICOLON_NEWLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";[ \t]*\n[ \t]*").unwrap());
static SEMICOLON_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r";[ \t]+").unwrap());
static SECTION_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^section\s+[a-z]\d+:").unwrap());
static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Room references removed from hours text, in order.
static ROOM_REFERENCE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i),?\s*\b(?:pandora|p)\s*\d+[a-z]?\b",
        r"(?i),?\s*\broom\s*\d+[a-z]?",
        r"(?i),?\s*\brm\.?\s*\d+[a-z]?",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TRAILING_SENTENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\b(?:students are|i am|please|you may|you are)\b.*$").unwrap()
});
static DANGLING_WORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:in\s+my|or\s+an|and|to)$").unwrap());
static BY_APPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bby\s+appt\b\.?").unwrap());
static APPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bappt\b\.?").unwrap());
static IN_ADV_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bin\s+adv\b").unwrap());

/// Substrings of text that mention hours but are not office hours.
const INVALID_PHRASES: &[&str] = &[
    "to discuss ideas",
    "questions about the material",
    "meeting agenda",
    "click here for",
    "assignment submission",
    "to join the meeting",
    "feel free to contact me about",
    "hours of free individual tutoring",
    "tutoring appointment and access",
];

static CLASS_TIME_INDICATORS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)class\s+(?:meets|meeting|schedule|time)",
        r"(?i)lecture\s+(?:meets|time|schedule)",
        r"(?i)course\s+(?:meets|meeting|schedule)",
        r"(?i)session\s+time",
        r"(?i)class\s+(?:is\s+)?held",
        r"(?i)\blab\s+(?:times?|meets|schedule)",
    ])
    .unwrap()
});

static VALID_INDICATORS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\d{1,2}:\d{2}",
        r"(?i)\d{1,2}\s*[ap]\.?m\b",
        r"(?i)\b(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)s?\b",
        r"(?i)\b(?:mon|tue|tues|wed|thu|thur|thurs|fri)\b",
        r"\b[MTWRF]\s+\d",
        r"(?i)\bappointment\b",
        r"(?i)\barrangement\b",
        r"(?i)\bcontact\s+(?:the\s+)?(?:instructor|professor)\b",
        r"(?i)\bzoom\b",
        r"(?i)\bvirtual",
        r"(?i)\btbd\b",
        r"(?i)\banytime\b",
        r"(?i)\bavailable\b",
        r"(?i)\bscheduled?\b",
        r"(?i)\boffice\s+hours\b",
        r"(?i)\bcanvas\s+inbox\b",
        r"(?i)\bafter\s+(?:class|lecture)\b",
        r"(?i)\bhelp\s+session\b",
        r"(?i)calendly\.com",
        r"(?i)\bsee\s+schedule\b",
        r"(?i)\bsection\s+[a-z]\d+",
        r"(?i)\bweekend\b",
        r"(?i)\bmeetings?\s+by\b",
        r"(?i)\bto\s+be\s+determined\b",
        r"(?i)\bas\s+posted\b",
        r"(?i)\boutside\s+my\s+office\b",
        r"(?i)\bprivate\s+(?:zoom|teams)\b",
        r"(?i)\bfrom\s+a\s+link\b",
    ])
    .unwrap()
});

/// Phrases whose captures are kept verbatim apart from whitespace.
const VERBATIM_MARKERS: &[&str] = &[
    "monday",
    "calendly.com",
    "canvas inbox",
    "by arrangement",
    "please contact",
    "after-class",
    "help session",
    "see schedule",
    "meetings by appointment",
    "to be determined",
    "after lecture",
    "as posted",
    "from a link",
];

const WEEKDAYS: &[&str] = &["monday", "tuesday", "wednesday", "thursday", "friday"];

static DAY_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{DAY})\s*-\s*(?:{DAY})\b")).unwrap()
});
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}:\d{2}").unwrap());
static AM_PM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\d{1,2}\s*[ap]m\b").unwrap());
static DAY_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:\b(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*\b)|\b[MTWRF]{1,3}\b").unwrap()
});
static GENERIC_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsee\s+.*\s+from\s+a\s+link\b").unwrap());

/// One validated hours value and the line it came from.
#[derive(Debug, Clone, PartialEq)]
struct HoursValue {
    text: String,
    line_index: usize,
    rule: &'static str,
}

/// Rungs of the selection ladder, most descriptive first.
const LADDER: &[&str] = &[
    "weekly_schedule",
    "appointment_day_range",
    "day_and_time",
    "appointment_with_context",
    "monday_zoom",
    "time",
    "day",
    "scheduled_or_available",
    "longest",
];

#[derive(Debug)]
struct CompiledHoursRule {
    label: &'static str,
    regex: Regex,
    stop: Stop,
}

/// Office hours extractor.
#[derive(Debug)]
pub struct OfficeHoursDetector {
    rules: Vec<CompiledHoursRule>,
    calibration: Calibration,
}

impl OfficeHoursDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        let rules = hours_rules()
            .into_iter()
            .map(|rule| {
                let regex = Regex::new(&rule.pattern).with_context(|| {
                    format!("invalid pattern for office_hours rule '{}'", rule.label)
                })?;
                Ok(CompiledHoursRule {
                    label: rule.label,
                    regex,
                    stop: rule.stop,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let calibration = calibration_for(
            FieldName::OfficeHours,
            Calibration::new(LADDER.len() as f64, 0.55, 0.95),
            overrides,
        )?;
        Ok(Self { rules, calibration })
    }

    fn collect(&self, head: &str) -> Vec<HoursValue> {
        let mut values = Vec::new();
        let mut seen = HashSet::new();
        for rule in &self.rules {
            for caps in rule.regex.captures_iter(head) {
                let Some(capture) = caps.get(1) else {
                    continue;
                };
                let bounded = bound_capture(capture.as_str(), rule.stop);
                if bounded.trim().chars().count() <= 2 {
                    continue;
                }
                let cleaned = tidy_hours(&bounded);
                let key = NON_WORD_RE.replace_all(&cleaned.to_lowercase(), "").into_owned();
                if is_valid_hours(&cleaned) && seen.insert(key) {
                    debug!("office_hours: '{}' from rule '{}'", cleaned, rule.label);
                    values.push(HoursValue {
                        text: cleaned,
                        line_index: head[..capture.start()].matches('\n').count(),
                        rule: rule.label,
                    });
                }
            }
        }
        values
    }
}

/// Apply a rule's stop condition to its raw capture.
fn bound_capture(capture: &str, stop: Stop) -> String {
    match stop {
        Stop::Raw => capture.trim().to_string(),
        Stop::Words => {
            let line = capture.lines().next().unwrap_or_default();
            let end = WORD_STOP_RE
                .find_iter(line)
                .find(|m| m.start() > 0)
                .map_or(line.len(), |m| m.start());
            line[..end].trim().to_string()
        }
        Stop::Block => {
            let mut kept: Vec<&str> = Vec::new();
            for (i, line) in capture.lines().enumerate() {
                let trimmed = line.trim();
                if i > 0 && (trimmed.is_empty() || SECTION_LINE_RE.is_match(trimmed)) {
                    break;
                }
                kept.push(line);
            }
            crate::utils::text::truncate_words(kept.join("\n").trim(), 250)
        }
    }
}

/// Canonical form of an hours capture.
fn tidy_hours(capture: &str) -> String {
    let mut text = capture.trim().to_string();

    let segments: Vec<&str> = DAY_SEGMENT_RE.find_iter(&text).map(|m| m.as_str()).collect();
    if segments.len() >= 2 {
        let (last, rest) = segments.split_last().map_or(("", &[][..]), |(l, r)| (*l, r));
        text = format!("{};\n{}", rest.join(";"), last);
    }

    let lower = text.to_lowercase();
    let has_weekday = WEEKDAYS.iter().any(|day| lower.contains(day));

    if text.contains(';') && has_weekday {
        let collapsed = WHITESPACE_RE.replace_all(&text, " ");
        let collapsed = SEMICOLON_NEWLINE_RE.replace_all(&collapsed, ";\n");
        collapsed
            .split(";\n")
            .map(|part| SEMICOLON_SPACE_RE.replace_all(part.trim(), ";").into_owned())
            .collect::<Vec<_>>()
            .join(";\n")
    } else if (lower.contains("by appointment") && text.contains(';'))
        || (lower.contains("monday") && lower.contains("zoom"))
        || VERBATIM_MARKERS.iter().any(|marker| lower.contains(marker))
        || SECTION_PREFIX_RE.is_match(&text)
    {
        collapse(&text)
    } else {
        clean_hours(&text)
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// General cleanup: strip room references and incomplete trailing
/// sentences, expand abbreviations.
fn clean_hours(hours: &str) -> String {
    let mut hours = collapse(hours);
    for re in ROOM_REFERENCE_RES.iter() {
        hours = re.replace_all(&hours, "").into_owned();
    }
    hours = TRAILING_SENTENCE_RE.replace(&hours, "").into_owned();
    hours = DANGLING_WORDS_RE.replace(hours.trim_end(), "").into_owned();
    hours = hours
        .trim_end_matches(|c| matches!(c, '.' | ',' | ';'))
        .to_string();
    hours = BY_APPT_RE.replace_all(&hours, "by appointment").into_owned();
    hours = APPT_RE.replace_all(&hours, "appointment").into_owned();
    hours = IN_ADV_RE.replace_all(&hours, "in advance").into_owned();
    hours.trim().to_string()
}

fn is_valid_hours(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    if INVALID_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return false;
    }
    if CLASS_TIME_INDICATORS.is_match(text) {
        return false;
    }
    VALID_INDICATORS.is_match(text)
}

/// Pick the most descriptive value; returns its index and ladder rung.
fn select_hours(values: &[HoursValue]) -> Option<(usize, usize)> {
    if values.is_empty() {
        return None;
    }
    let lower: Vec<String> = values.iter().map(|v| v.text.to_lowercase()).collect();
    let has_weekday = |s: &str| WEEKDAYS.iter().any(|day| s.contains(day));

    let rungs: [&dyn Fn(usize) -> bool; 8] = [
        &|i| values[i].text.contains(';') && has_weekday(&lower[i]),
        &|i| {
            (lower[i].contains("by appointment") || lower[i].contains("by arrangement"))
                && DAY_RANGE_RE.is_match(&values[i].text)
                && AM_PM_RE.is_match(&values[i].text)
        },
        &|i| CLOCK_RE.is_match(&values[i].text) && DAY_NAME_RE.is_match(&values[i].text),
        &|i| {
            lower[i].contains("by appointment")
                && (values[i].text.contains(';')
                    || lower[i].contains("person")
                    || lower[i].contains("virtual"))
        },
        &|i| lower[i].contains("monday") && lower[i].contains("zoom"),
        &|i| CLOCK_RE.is_match(&values[i].text),
        &|i| DAY_NAME_RE.is_match(&values[i].text),
        &|i| lower[i].contains("scheduled") || lower[i].contains("available"),
    ];

    for (rung, accepts) in rungs.iter().enumerate() {
        if let Some(index) = (0..values.len()).find(|&i| accepts(i)) {
            return Some((index, rung));
        }
    }

    // First of the longest, preferring anything but a generic link pointer.
    let longest = |indices: Vec<usize>| {
        indices
            .into_iter()
            .rev()
            .max_by_key(|&i| values[i].text.chars().count())
    };
    let non_generic: Vec<usize> = (0..values.len())
        .filter(|&i| !GENERIC_LINK_RE.is_match(&values[i].text))
        .collect();
    let index = longest(non_generic).or_else(|| longest((0..values.len()).collect()))?;
    Some((index, LADDER.len() - 1))
}

impl FieldDetector for OfficeHoursDetector {
    fn field(&self) -> FieldName {
        FieldName::OfficeHours
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let head = doc.head(HOURS_SEARCH_CHARS);
        let full = calibrate(LADDER.len() as f64, &self.calibration);

        if let Some(m) = TBD_RE.find(head) {
            let line_index = head[..m.start()].matches('\n').count();
            return Ok(DetectionResult::found(
                "TBD",
                full,
                vec![evidence_line(doc, line_index)],
            ));
        }

        let values = self.collect(head);
        let Some((index, rung)) = select_hours(&values) else {
            return Ok(DetectionResult::not_found());
        };
        let winner = &values[index];
        let raw = (LADDER.len() - rung) as f64;
        Ok(DetectionResult::found(
            winner.text.clone(),
            calibrate(raw, &self.calibration),
            vec![
                evidence_line(doc, winner.line_index),
                format!("rule: {}", winner.rule),
                format!("selected by: {}", LADDER[rung]),
            ],
        ))
    }
}

// Office phone

const PHONE_RULES: &[RuleSpec] = &[
    RuleSpec::new(
        "phone_label",
        r"(?i)\b(?:office\s*)?phone[ \t:]+([(\d][\d \t().-]{8,14})",
        0.90,
    )
    .group(1),
    RuleSpec::new(
        "telephone_label",
        r"(?i)\btelephone[ \t:]+([(\d][\d \t().-]{8,14})",
        0.90,
    )
    .group(1),
    RuleSpec::new(
        "office_line",
        r"(?i)\boffice:[^\n]*?,[ \t]*([(\d][\d \t().-]{8,14})",
        0.80,
    )
    .group(1),
    RuleSpec::new(
        "regional_number",
        r"\b(?:603|434)[ .-]?\d{3}[ .-]?\d{4}\b",
        0.70,
    ),
    RuleSpec::new(
        "regional_number_parenthesized",
        r"\((?:603|434)\)[ .-]?\d{3}[ .-]?\d{4}\b",
        0.70,
    ),
];

static PHONE_JUNK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9().\- ]").unwrap());

/// Office phone extractor.
#[derive(Debug)]
pub struct OfficePhoneDetector {
    rules: Vec<PatternRule>,
    calibration: Calibration,
}

impl OfficePhoneDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        let name = FieldName::OfficePhone.to_string();
        let rules = PHONE_RULES
            .iter()
            .map(|spec| PatternRule::compile(&name, spec))
            .collect::<Result<Vec<_>>>()?;
        let calibration = calibration_for(
            FieldName::OfficePhone,
            Calibration::new(1.0, 0.0, 0.95),
            overrides,
        )?;
        Ok(Self { rules, calibration })
    }
}

/// Keep only phone characters, collapse spaces and trim separators.
fn clean_phone(raw: &str) -> String {
    let kept = PHONE_JUNK_RE.replace_all(raw, "");
    let collapsed = collapse(&kept);
    collapsed
        .trim_end_matches(|c| matches!(c, '.' | '-' | '(' | ' '))
        .trim_start_matches(|c| matches!(c, '.' | '-' | ' '))
        .to_string()
}

/// US formats only: 7 or 10 digits.
fn digits_of(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

impl FieldDetector for OfficePhoneDetector {
    fn field(&self) -> FieldName {
        FieldName::OfficePhone
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let head = doc.head(PHONE_SEARCH_CHARS);
        let mut found: Vec<(String, usize, f64)> = Vec::new();
        let mut seen = HashSet::new();

        for rule in &self.rules {
            for caps in rule.regex.captures_iter(head) {
                let Some(m) = caps.get(rule.group) else {
                    continue;
                };
                let phone = clean_phone(m.as_str());
                let digits = digits_of(&phone);
                if !matches!(digits.len(), 7 | 10) || !seen.insert(digits) {
                    continue;
                }
                debug!("office_phone: '{}' via rule '{}'", phone, rule.label);
                let line_index = head[..m.start()].matches('\n').count();
                found.push((phone, line_index, rule.weight));
            }
        }

        let Some((phone, line_index, weight)) = found.first().cloned() else {
            return Ok(DetectionResult::not_found());
        };
        let mut evidence = vec![evidence_line(doc, line_index)];
        evidence.extend(found.iter().skip(1).map(|(other, _, _)| format!("also: {other}")));
        Ok(DetectionResult::found(
            phone,
            calibrate(weight, &self.calibration),
            evidence,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FieldPipeline;

    fn location(text: &str) -> DetectionResult {
        FieldPipeline::build(&LOCATION_SPEC, None)
            .unwrap()
            .run(&Document::new(text))
    }

    fn hours(text: &str) -> DetectionResult {
        OfficeHoursDetector::new(None)
            .unwrap()
            .detect(&Document::new(text))
            .unwrap()
    }

    fn phone(text: &str) -> DetectionResult {
        OfficePhoneDetector::new(None)
            .unwrap()
            .detect(&Document::new(text))
            .unwrap()
    }

    #[test]
    fn test_office_room_beats_class_room() {
        let result = location("Office Hours: Room 201\nClass Location: Room 105");
        assert!(result.found);
        assert_eq!(result.content.as_deref(), Some("Room 201"));
    }

    #[test]
    fn test_location_formats() {
        assert_eq!(
            location("Office: Pandora Building, Room 452").content.as_deref(),
            Some("Pandora Room 452")
        );
        assert_eq!(location("Office: P380").content.as_deref(), Some("P380"));
        assert_eq!(location("Office: rm. 139").content.as_deref(), Some("Room 139"));
    }

    #[test]
    fn test_classroom_room_is_not_an_office() {
        let result = location("Instructor: Dr. Smith, Class Meeting: Tuesdays, Room 105");
        assert!(!result.found);
    }

    #[test]
    fn test_tbd_has_priority() {
        let result = hours("Office Hours: TBD\nMondays 2:00-3:00 pm");
        assert_eq!(result.content.as_deref(), Some("TBD"));
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_labelled_hours_are_cleaned() {
        let result = hours("Office Hours: Tuesdays 1:00 - 2:30 pm, Room 201 or by appt.\nPhone: 603-862-1234");
        assert!(result.found);
        assert_eq!(
            result.content.as_deref(),
            Some("Tuesdays 1:00 - 2:30 pm or by appointment")
        );
    }

    #[test]
    fn test_weekly_schedule_is_preferred() {
        let text = "Office Hours:\nTuesday - 4:00 - 5:00\nThursday - 3:00 - 5:00\nFriday - 1:00 - 2:00\n\nCourse Description";
        let result = hours(text);
        assert_eq!(
            result.content.as_deref(),
            Some("Tuesday - 4:00 - 5:00;Thursday - 3:00 - 5:00;\nFriday - 1:00 - 2:00")
        );
        assert_eq!(result.evidence[2], "selected by: weekly_schedule");
    }

    #[test]
    fn test_class_times_are_not_office_hours() {
        assert!(!is_valid_hours("class meets Monday 9:10 am"));
        assert!(!is_valid_hours("questions about the material"));
        assert!(is_valid_hours("by appointment"));
    }

    #[test]
    fn test_clean_hours() {
        assert_eq!(
            clean_hours("Wed 2-4 pm, Pandora 318. Students are welcome"),
            "Wed 2-4 pm"
        );
        assert_eq!(clean_hours("Mon 1-2 & by appt."), "Mon 1-2 & by appointment");
    }

    #[test]
    fn test_no_hours() {
        assert!(!hours("Course Readings\nChapter 1").found);
    }

    #[test]
    fn test_phone_validation() {
        let result = phone("Office: Room 139\nPhone: (603) 641-4321\nFax: 12345");
        assert_eq!(result.content.as_deref(), Some("(603) 641-4321"));
        assert_eq!(result.confidence, 0.9);

        assert!(!phone("Phone: 123-45678901234").found);
    }

    #[test]
    fn test_phone_duplicates_collapse() {
        let result = phone("Phone: 603-641-4321\nCall 603.641.4321 if needed");
        assert_eq!(result.evidence.len(), 1);
    }

    #[test]
    fn test_clean_phone() {
        assert_eq!(clean_phone("603-862-1234. "), "603-862-1234");
        assert_eq!(digits_of("(603) 862-1234"), "6038621234");
    }
}
