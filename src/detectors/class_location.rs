//! Class meeting location.
//!
//! Three stages, first hit wins:
//! 1. explicit class-meeting headers in the first 20 lines
//! 2. online / remote / appointment-based venues in the first 50 lines
//! 3. the generic room pipeline, which keeps office-hours and support
//!    office rooms out through context exclusion

use std::sync::LazyLock;

use anyhow::Result;
use log::debug;
use regex::Regex;

use super::FieldDetector;
use crate::engine::calibrate::Calibration;
use crate::engine::candidates::LineBounds;
use crate::engine::config::{Aggregation, CleanupSpec, FieldOverrides, FieldSpec, FieldTuning};
use crate::engine::rules::{PatternRule, PenaltyScope, PenaltySpec, RuleSpec, TierSpec};
use crate::engine::scoring::LabelScope;
use crate::engine::{DetectionResult, Document, FieldPipeline, evidence_line};
use crate::models::FieldName;

const HEADER_SCAN_LINES: usize = 20;
const ONLINE_SCAN_LINES: usize = 50;
const MAX_ONLINE_CHARS: usize = 100;

static DIGITS_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// Class-meeting headers that name the room outright.
const EXPLICIT_HEADERS: &[RuleSpec] = &[
    RuleSpec::new(
        "class_location_label",
        r"(?i)^\s*(?:class\s+location|classroom|lecture\s+room)\s*:\s*((?:room|rm\.?)\s*[A-Za-z]?\d{2,4}[A-Za-z]?|[A-Za-z]?\d{2,4})\b",
        0.97,
    )
    .group(1),
    RuleSpec::new(
        "time_and_location_p_room",
        r"(?i)class\s+time\s*&\s*location\s*:.*\b((?:pandora|pandra)?\s*(?:building)?\s*(?:\([^)]+\))?\s*P\s*\d{3,4})\b",
        0.97,
    )
    .group(1),
    RuleSpec::new(
        "time_and_location_room",
        r"(?i)class\s+time\s*&\s*location\s*:.*\b(room\s*\d{2,4})\b",
        0.97,
    )
    .group(1),
    RuleSpec::new(
        "class_meetings_p_room",
        r"(?i)class\s+meetings?\s*[:\s][^P]*\b(P\d{3,4})\b",
        0.97,
    )
    .group(1),
    RuleSpec::new(
        "class_meetings_room",
        r"(?i)class\s+meetings?\s*[:\s].*\b(room\s*\d{2,4})\b",
        0.97,
    )
    .group(1),
    RuleSpec::new(
        "class_meeting_room",
        r"(?i)class\s+meeting\s+room\s*[:\s]*([A-Za-z]?\d{2,4})",
        0.97,
    )
    .group(1),
    RuleSpec::new(
        "class_meets_in",
        r"(?i)class\s+meets?\s+(?:in\s+)?((?:room\s+)?[A-Za-z]?\d{2,4})",
        0.97,
    )
    .group(1),
    RuleSpec::new("lecture_p_room", r"(?i)lecture\s*[:\-]\s*(P\d{3,4})", 0.97).group(1),
    RuleSpec::new(
        "location_lecture_p_room",
        r"(?i)location[^:]*:\s*lecture\s*[:\-]\s*(P\d{3,4})",
        0.97,
    )
    .group(1),
];

/// Online, remote and appointment-based venues; the weight is the
/// reported confidence.
const ONLINE_VENUES: &[RuleSpec] = &[
    RuleSpec::new(
        "location_online",
        r"(?im)(?:time\s+and\s+location|location\s+and\s+time|class\s+location|meeting\s+location|class\s+meetings?|^location)[\s:]+[^\n]{0,100}?\b(online)\b",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "format_online",
        r"(?i)(?:course\s+format|class\s+format|modality)[\s:]+[^\n]{0,50}?\b(online(?:\s+asynchronous)?)",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "meeting_times_async",
        r"(?i)meeting\s+times?/locations?[^\n]{0,200}?\b(online\s+asynchronous)",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "day_pipe_online",
        r"(?i)(?:mon|tue|wed|thu|fri|sat|sun)[^\n]{0,50}?\|\s*(online(?:,?\s+synchronous)?)",
        0.98,
    )
    .group(1),
    RuleSpec::new("asynchronous_online", r"(?i)\b(asynchronous\s+online)\b", 0.98).group(1),
    RuleSpec::new(
        "as_an_online_course",
        r"(?i)(?:as|is)\s+an?\s+(online\s+(?:class|course))",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "location_online_aside",
        r"(?im)(?:time\s+and\s+location|location\s+and\s+time|class\s+location|meeting\s+location|where|^location)[\s:]+[^\n]{0,50}?\b(online\s*\([^)]{0,100}\))",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "location_remote",
        r"(?im)(?:time\s+and\s+location|location\s+and\s+time|class\s+location|meeting\s+location|where|^location)[\s:]+[^\n]{0,50}?\b(remote(?:\s+through\s+zoom)?)",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "canvas_online",
        r"(?i)\b(canvas\s*\([^)]*(?:online|learning\s+management\s+system|my\s+courses)[^)]*\))",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "mycourses_online",
        r"(?i)\b((?:unh\s+)?mycourses\s*\([^)]*online[^)]*\))",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "use_mycourses",
        r"(?i)(?:students?\s+)?(?:will\s+)?use\s+((?:unh\s+)?mycourses)",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "async_in_canvas_lms",
        r"(?i)\basynchronous(?:ly)?\s+online[^\n]{0,100}?\bin\s+(canvas)[,\s]+(?:our\s+)?learning\s+management\s+system",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "canvas_is_lms",
        r"(?i)\b(canvas)\s+is\s+(?:the\s+)?learning\s+management\s+system",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "online_course_site_canvas",
        r"(?i)(?:in\s+this|this\s+is\s+an?)\s+online\s+course[^\n]{0,100}?\bcourse\s+site\s+on\s+(canvas)",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "location_zoom",
        r"(?i)(?:location|where)[\s:]+[^\n]{0,50}?\b((?:remote\s+)?\(?\s*zoom\s*\))",
        0.95,
    )
    .group(1),
    RuleSpec::new(
        "zoom_online_meetings",
        r"(?i)\b(?:zoom|teams)\s+used\s+to\s+hold\s+(?:weekly\s+)?(online)\s+class\s+meetings?",
        0.98,
    )
    .group(1),
    RuleSpec::new(
        "location_zoom_teams",
        r"(?i)(?:location|where)[\s:]+[^\n]{0,50}?\b(zoom/teams[^\n]{0,60})",
        0.95,
    )
    .group(1),
    RuleSpec::new(
        "by_appointment",
        r"(?i)(?:location|where)[\s:]+[^\n]{0,30}?\b(by\s+appointment(?:\s+\([^)]{0,60}\))?)",
        0.95,
    )
    .group(1),
    RuleSpec::new(
        "hybrid",
        r"(?i)(?:location|where|modality)[\s:]+[^\n]{0,50}?\b(hybrid[^\n]{0,100})",
        0.93,
    )
    .group(1),
    RuleSpec::new("tbd_remote", r"(?i)\b(tbd\s*\(\s*remote\s*\))", 0.92).group(1),
    RuleSpec::new(
        "field_sites",
        r"(?i)(?:location|where)[\s:]+[^\n]{0,30}?\b(field\s+sites?[^\n]{0,80})",
        0.90,
    )
    .group(1),
    RuleSpec::new(
        "zoom_room_in_canvas",
        r"(?i)\b(zoom\s+room\s+provided\s+in\s+canvas)",
        0.95,
    )
    .group(1),
];

const ROOM_TIERS: &[TierSpec] = &[
    TierSpec {
        name: "labelled_meeting",
        rules: &[
            RuleSpec::new(
                "meeting_or_section_room",
                r"(?i)\b(?:class\s+meetings?|section\s+\w+)\b.*?\b((?:room|rm\.?)\s*[A-Za-z]?\d{2,4})\b",
                0.96,
            )
            .group(1),
            RuleSpec::new(
                "course_room_number",
                r"(?i)\bcourse\s+room\s+(?:number)?[\s:]+([A-Za-z]?\d{2,4})\b",
                0.96,
            )
            .group(1),
        ],
    },
    TierSpec {
        name: "room_with_building",
        rules: &[
            RuleSpec::new(
                "room_building",
                r"(?i)\b((?:room|rm\.?)\s+[A-Za-z]?\d{2,4}\s*[,\-]?\s*[\w ]+?(?:hall|building|bldg|mill|lab))\b",
                0.95,
            )
            .group(1),
            RuleSpec::new(
                "pandora_p_room",
                r"(?i)\b((?:pandora|pandra)\s+(?:building|mill|hall)?\s*(?:\([^)]+\))?\s*p\s*\d{3,4})\b",
                0.95,
            )
            .group(1),
            // `Hamilton Smith 129`, `Pandora Mill (UNHM) Rm 139`
            RuleSpec::new(
                "building_number",
                r"(?i)\b((?:pandora|pandra|hamilton\s+smith|dimond|parsons|kingsbury|morse|rudman|murkland)(?:\s+mill|\s+hall|\s+building|\s+lab)?(?:\s*\([^)]{1,20}\))?\s*[,\-]?\s*(?:room|rm\.?)?\s*[A-Za-z]?\d{2,4})\b",
                0.95,
            )
            .group(1),
            RuleSpec::new("lecture_number", r"(?i)\b(\d{3})\s*\(\s*lecture[;,]", 0.95).group(1),
            RuleSpec::new("room_p_number", r"(?i)\b(room\s+p\s*\d{3,4})\b", 0.95).group(1),
        ],
    },
    TierSpec {
        name: "room_shape",
        rules: &[
            RuleSpec::new("classroom_number", r"(?i)\b(classroom:?\s+[A-Za-z]?\d{2,4})\b", 0.85)
                .group(1),
            RuleSpec::new("lab_rm", r"(?i)\blab\s*\(\s*(rm\.?\s*\d{3,4})\s*\)", 0.85).group(1),
            RuleSpec::new("room_attached", r"(?i)\b((?:room|rm)\.?[A-Za-z]?\d{2,4})\b", 0.85)
                .group(1),
            RuleSpec::new("letter_digits", r"(?:^|[^A-Za-z0-9])([A-Z]\d{3,4})\b", 0.85).group(1),
            RuleSpec::new("letter_space_digits", r"(?:^|[^A-Za-z0-9])([A-Z]\s+\d{3,4})\b", 0.85)
                .group(1),
        ],
    },
    TierSpec {
        name: "bare_room",
        rules: &[RuleSpec::new("room", r"(?i)\b((?:room|rm\.?)\s+[A-Za-z]?\d{2,4})\b", 0.70).group(1)],
    },
];

const TARGET: &[&str] = &[
    r"(?i)class\s+location",
    r"(?i)class\s+meets?",
    r"(?i)class\s+meeting",
    r"(?i)meeting\s+location",
    r"(?i)meeting\s+place",
    r"(?i)meeting\s+time\s+and\s+place",
    r"(?i)location\s+and\s+time",
    r"(?i)time\s+and\s+location",
    r"(?i)where\s+we\s+meet",
    r"(?i)where\s+the\s+class\s+meets",
    r"(?i)course\s+location",
    r"(?i)course\s+room",
    r"(?i)lecture\s+location",
    r"(?i)when\s+and\s+where",
    r"(?i)schedule\s+and\s+location",
    r"(?i)classroom",
    r"(?i)lecture\s+room",
    r"(?i)\(lecture[;,]",
];

const EXCLUDED: &[&str] = &[
    r"(?i)office\s+hours?",
    r"(?i)office\s+location",
    r"(?i)instructor\s+office",
    r"(?i)professor\s+office",
    r"(?i)my\s+office",
    r"(?i)office\s+address",
    r"(?i)\boffice:",
    r"(?i)instructor\s+location",
    r"(?i)contact\s+information",
    r"(?i)contact\s+info",
    r"(?i)tutoring\s+center",
    r"(?i)writing\s+center",
    r"(?i)help\s+center",
    r"(?i)support\s+center",
    r"(?i)academic\s+support",
    r"(?i)drop[-\s]in\s+hours",
    r"(?i)consultation\s+hours",
    r"(?i)availability",
    r"(?i)\blab:",
    r"(?i)lab\s+location",
    r"(?i)lab\s+sessions?",
    r"(?i)tech\s+consultancy",
    r"(?i)tech\s+consultant",
    r"(?i)workroom",
    r"(?i)student\s+tech",
    r"(?i)title\s+ix",
    r"(?i)deputy\s+intake",
    r"(?i)coordinator.*room",
    r"(?i)advisors?\s+office",
    r"(?i)loan.*laptop",
    r"(?i)borrow.*laptop",
];

const PENALTIES: &[PenaltySpec] = &[
    PenaltySpec::new(
        "course_code",
        r"\b[A-Z]{2,4}[\s-]?\d{3,4}[A-Z]?\b",
        -10.0,
        PenaltyScope::Text,
    ),
    PenaltySpec::new("year", r"\b20\d{2}\b", -10.0, PenaltyScope::Text),
    PenaltySpec::new(
        "product_model",
        r"(?i)megafix|model|product|part|item|catalog|screw",
        -10.0,
        PenaltyScope::Before(20),
    ),
    PenaltySpec::new(
        "course_code_prefix",
        r"\b[A-Z]{2,4}\s*$",
        -10.0,
        PenaltyScope::Before(10),
    ),
];

pub const SPEC: FieldSpec = FieldSpec {
    field: FieldName::ClassLocation,
    tiers: ROOM_TIERS,
    bounds: LineBounds {
        min_chars: 2,
        max_chars: 500,
    },
    max_lines: Some(150),
    max_chars: None,
    target: TARGET,
    excluded: EXCLUDED,
    explicit_label: Some(r"(?i)\b(?:class\s+)?location\s*:"),
    label_scope: LabelScope::Immediate,
    penalties: PENALTIES,
    position_buckets: &[],
    aggregation: Aggregation::PerMatch,
    cleanup: CleanupSpec {
        strip_trailing_punct: true,
        rewrites: &[
            (r"(?i)\b(rm|room)\.?([A-Za-z]?\d)", "$1 $2"),
            (r"^(\d{2,4})$", "Room $1"),
        ],
        ..CleanupSpec::NONE
    },
    tuning: FieldTuning {
        header_lines: 20,
        header_bonus: 0.15,
        explicit_label_bonus: 0.25,
        target_bonus: 0.05,
        neutral_factor: 0.7,
        window_before: 2,
        window_after: 15,
        // A found room never reports below 0.45; explicit headers own 0.97.
        calibration: Calibration::new(1.2, 0.45, 0.97),
        ..FieldTuning::DEFAULT
    },
};

#[derive(Debug, Clone)]
pub struct ClassLocationDetector {
    explicit_headers: Vec<PatternRule>,
    online_venues: Vec<PatternRule>,
    rooms: FieldPipeline,
}

impl ClassLocationDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        let name = FieldName::ClassLocation.to_string();
        Ok(Self {
            explicit_headers: EXPLICIT_HEADERS
                .iter()
                .map(|spec| PatternRule::compile(&name, spec))
                .collect::<Result<_>>()?,
            online_venues: ONLINE_VENUES
                .iter()
                .map(|spec| PatternRule::compile(&name, spec))
                .collect::<Result<_>>()?,
            rooms: FieldPipeline::build(&SPEC, overrides)?,
        })
    }

    fn explicit_header(&self, doc: &Document) -> Option<DetectionResult> {
        for (index, line) in doc.lines().iter().take(HEADER_SCAN_LINES).enumerate() {
            for rule in &self.explicit_headers {
                let Some(room) = rule.regex.captures(line).and_then(|c| c.get(rule.group)) else {
                    continue;
                };
                let room = room.as_str().trim();
                let room = if DIGITS_ONLY_RE.is_match(room) {
                    format!("Room {room}")
                } else {
                    room.split_whitespace().collect::<Vec<_>>().join(" ")
                };
                debug!("class_location: explicit header '{}' on line {}", rule.label, index + 1);
                return Some(DetectionResult::found(
                    room,
                    rule.weight,
                    vec![evidence_line(doc, index)],
                ));
            }
        }
        None
    }

    fn online_venue(&self, doc: &Document) -> Option<DetectionResult> {
        let head = doc.span(0, ONLINE_SCAN_LINES).join("\n");
        for rule in &self.online_venues {
            let Some(caps) = rule.regex.captures(&head) else {
                continue;
            };
            let (Some(whole), Some(venue)) = (caps.get(0), caps.get(rule.group)) else {
                continue;
            };
            let content = clean_venue(venue.as_str(), whole.as_str());
            if content.is_empty() {
                continue;
            }
            let line_index = head[..whole.start()].matches('\n').count();
            debug!("class_location: online venue '{}' via rule '{}'", content, rule.label);
            return Some(DetectionResult::found(
                content,
                rule.weight,
                vec![evidence_line(doc, line_index)],
            ));
        }
        None
    }
}

/// Canonicalize an online venue capture.
fn clean_venue(venue: &str, whole_match: &str) -> String {
    let mut venue = venue.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = venue.to_lowercase();
    let whole = whole_match.to_lowercase();

    if lower == "canvas"
        && (whole.contains("learning management system") || whole.contains("online course"))
    {
        venue = "Canvas (online learning management system)".to_string();
    } else if matches!(
        lower.as_str(),
        "online" | "asynchronous online" | "online class" | "online course"
    ) {
        venue = "Online".to_string();
    } else if lower.contains("mycourses") && !lower.contains('(') {
        venue = "UNH MyCourses (online)".to_string();
    }

    let venue = venue.trim_matches(|c| matches!(c, ',' | ';' | ':')).trim();
    if venue.chars().count() <= MAX_ONLINE_CHARS {
        return venue.to_string();
    }
    let cut = venue
        .char_indices()
        .find(|&(i, c)| i > 20 && matches!(c, '.' | ';'))
        .map(|(i, _)| i);
    match cut {
        Some(i) => venue[..i].trim().to_string(),
        None => crate::utils::text::head_chars(venue, MAX_ONLINE_CHARS)
            .trim()
            .to_string(),
    }
}

impl FieldDetector for ClassLocationDetector {
    fn field(&self) -> FieldName {
        FieldName::ClassLocation
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        if let Some(result) = self.explicit_header(doc) {
            return Ok(result);
        }
        if let Some(result) = self.online_venue(doc) {
            return Ok(result);
        }
        Ok(self.rooms.run(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_venue() {
        assert_eq!(clean_venue("online", "Location: online"), "Online");
        assert_eq!(
            clean_venue("Canvas", "Canvas is the learning management system"),
            "Canvas (online learning management system)"
        );
        assert_eq!(clean_venue("mycourses", "use mycourses"), "UNH MyCourses (online)");
        assert_eq!(clean_venue("by appointment,", "Location: by appointment,"), "by appointment");
    }

    #[test]
    fn test_spec_compiles() {
        assert!(ClassLocationDetector::new(None).is_ok());
    }

    fn detect(text: &str) -> DetectionResult {
        ClassLocationDetector::new(None)
            .unwrap()
            .detect(&Document::new(text))
            .unwrap()
    }

    #[test]
    fn test_explicit_header() {
        let result = detect(
            "COMP 405: Computer Networks\nClass Location: Room 105, Pandora Building\nOffice: Room 201",
        );
        assert_eq!(result.content.as_deref(), Some("Room 105"));
        assert_eq!(result.confidence, 0.97);
        assert_eq!(
            result.evidence,
            vec!["line 2: Class Location: Room 105, Pandora Building"]
        );
    }

    #[test]
    fn test_office_room_is_not_the_class_room() {
        let result = detect(
            "Office Hours: Room 201\nThe class meets on Mondays in the science wing\nRoom 105",
        );
        assert_eq!(result.content.as_deref(), Some("Room 105"));
        assert_eq!(result.confidence, 0.75);
        assert_eq!(result.evidence, vec!["line 3: Room 105"]);
    }

    #[test]
    fn test_office_room_alone_is_not_found() {
        let result = detect("Office Hours: Room 201\nTuesdays 2-3pm");
        assert!(!result.found);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_online_venue_short_circuits() {
        let result = detect("COMP 405\nLocation: Online\nOffice Hours: Room 201");
        assert_eq!(result.content.as_deref(), Some("Online"));
        assert_eq!(result.confidence, 0.98);
        assert_eq!(result.evidence, vec!["line 2: Location: Online"]);
    }

    #[test]
    fn test_penalties_reject_codes_years_and_products() {
        assert!(!detect("Take BIOL A412 before enrolling.").found);
        assert!(!detect("Spring 2025\nRoom 2025 renovations").found);
        assert!(!detect("Bring calculator model T840 to every exam.").found);

        let result = detect("Lectures are held in P149.");
        assert_eq!(result.content.as_deref(), Some("P149"));
        assert_eq!(result.confidence, 0.62);
    }

    #[test]
    fn test_attached_room_number_is_spaced() {
        let result = detect("Lectures meet in Rm126");
        assert_eq!(result.content.as_deref(), Some("Rm 126"));
    }

    #[test]
    fn test_weak_room_is_floored() {
        let mut text = String::new();
        for week in 1..=25 {
            text.push_str(&format!("Week {week} notes\n"));
        }
        text.push_str("Room 105");
        let result = detect(&text);
        assert_eq!(result.content.as_deref(), Some("Room 105"));
        assert_eq!(result.confidence, 0.45);
    }
}
