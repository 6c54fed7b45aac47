//! Short-circuit phases of the modality controller.
//!
//! Each phase either returns a [`Verdict`] or `None` to hand over to the
//! next phase. Confidences are fixed per rule: a short-circuit reports how
//! direct the statement was, not an inference.

use std::sync::LazyLock;

use regex::Regex;

use super::sections::ModalityText;
use super::signals::{
    MEETING_ROOM_RE, has_physical_room_phrase, has_room, has_schedule_without_online_cues,
    has_zoom_class_phrase,
};
use super::{Modality, ModalityTuning, Verdict};
use crate::utils::text::{around, head_chars};

const HEAD_600: usize = 600;
const HEAD_800: usize = 800;
const HEAD_1000: usize = 1000;
const HEAD_1500: usize = 1500;

/// Hybrid statements, checked before the online list so that an
/// "online" substring never swallows a hybrid statement.
const HYBRID_DEFINITIVE: &[&str] = &[
    "hybrid course",
    "hy-flex",
    "hyflex",
    "blended course",
    "hybrid format",
    "blended format",
    "hybrid delivery",
];

const ONLINE_DEFINITIVE: &[&str] = &[
    "100% online",
    "fully online",
    "completely online",
    "entirely online",
    "online only",
    "course is online",
    "this course is online",
    "delivered entirely online",
    "offered online",
    "synchronous online",
    "meets online",
    "meets on zoom",
    "meets via zoom",
    "asynchronous online",
    "fully asynchronous",
    "entirely asynchronous",
    "this course meets synchronously online",
    "no scheduled class times",
    "no scheduled class meeting times",
    "there are no scheduled class times",
    "there are no scheduled meeting times",
];

/// Header phrases that state hybrid delivery in other words.
const HEADER_HYBRID: &[&str] = &[
    "hybrid delivery",
    "hybrid course",
    "hybrid format",
    "hybrid modality",
    "online with some campus",
];

const ROOM_WORDS: &[&str] = &["room", "rm", "hall", "building", "pandora", "pandra"];

const ASYNC_BAD_CONTEXT: &[&str] = &[
    "tutoring",
    "writing lab",
    "writing center",
    "owl",
    "support service",
    "recorded lectures",
    "temporary",
    "accommodations",
    "miss class",
];

const ASYNC_DELIVERY_CONTEXT: &[&str] = &[
    "online",
    "remote",
    "delivered",
    "format",
    "course is",
    "meets online",
    "delivery",
];

const ASYNC_PHYSICAL_CONTEXT: &[&str] = &["meets in", "classroom", "in person", "on campus"];

static ONLINE_ALSO_IN_ROOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:online|zoom|teams|webex).*\b(?:and also in|also in)\b.*\b(?:room|rm\.?|pandora|pandra|hall|building)\b",
    )
    .unwrap()
});

static LOCATION_ONLINE_AND_ROOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\blocation.*:.*\bonline\b.*\band\b.*\b(?:room|rm\.?|pandora|pandra)\b").unwrap()
});

static LOCATION_ONLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:time\s+and\s+)?location[:\s]+.*\bonline\b").unwrap());

static DAY_TIME_ONLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*[,\s]+\d{1,2}:\d{2}.*\bonline\b").unwrap()
});

static FACE_TO_FACE_ASYNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"face[-\s]?to[-\s]?face\s+(?:weekly|sessions?).*(?:async|online)").unwrap()
});

static DELIVERY_ONLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:delivery|modality|format|mode)\s*[:\-]?\s*(?:online|asynchronous|synchronous online)")
        .unwrap()
});

static IN_PERSON_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bin[ -]?person\b").unwrap());

/// Phase 1: unambiguous delivery statements.
pub fn definitive_statement(text: &ModalityText, _tuning: &ModalityTuning) -> Option<Verdict> {
    let lower = text.lower.as_str();

    if let Some(phrase) = HYBRID_DEFINITIVE.iter().find(|p| lower.contains(*p)) {
        return Some(Verdict::decided(Modality::Hybrid, 0.95, *phrase));
    }
    if let Some(phrase) = ONLINE_DEFINITIVE.iter().find(|p| lower.contains(*p)) {
        return Some(Verdict::decided(Modality::Online, 0.95, *phrase));
    }

    let head_1000 = head_chars(lower, HEAD_1000);
    if ONLINE_ALSO_IN_ROOM_RE.is_match(head_1000) {
        return Some(Verdict::decided(
            Modality::Hybrid,
            0.95,
            "online and also in a physical location",
        ));
    }
    if LOCATION_ONLINE_AND_ROOM_RE.is_match(head_1000) {
        return Some(Verdict::decided(
            Modality::Hybrid,
            0.95,
            "location lists both online and a room",
        ));
    }

    let head_800 = head_chars(lower, HEAD_800);
    if let Some(m) = LOCATION_ONLINE_RE.find(head_800) {
        let stated = around(lower, m.start(), m.end(), 0, 100);
        if !ROOM_WORDS.iter().any(|word| stated.contains(word)) {
            return Some(Verdict::decided(Modality::Online, 0.93, "location states online"));
        }
    }
    if DAY_TIME_ONLINE_RE.is_match(head_800) {
        return Some(Verdict::decided(Modality::Online, 0.93, "class time is listed as online"));
    }

    if FACE_TO_FACE_ASYNC_RE.is_match(lower) {
        return Some(Verdict::decided(
            Modality::Hybrid,
            0.92,
            "face-to-face sessions with asynchronous or online work",
        ));
    }

    let head_1500 = head_chars(lower, HEAD_1500);
    if head_1500.contains("hybrid") && HEADER_HYBRID.iter().any(|p| head_1500.contains(p)) {
        return Some(Verdict::decided(
            Modality::Hybrid,
            0.95,
            "header states hybrid delivery",
        ));
    }

    None
}

/// Phase 2: rules scoped to the class-location section only.
pub fn class_section(text: &ModalityText, _tuning: &ModalityTuning) -> Option<Verdict> {
    if has_zoom_class_phrase(&text.class_section) {
        return Some(Verdict::decided(
            Modality::Online,
            0.90,
            "class meets on Zoom, Teams or Webex",
        ));
    }
    if has_physical_room_phrase(&text.class_section) {
        return Some(Verdict::decided(
            Modality::InPerson,
            0.90,
            "class meets in a physical room",
        ));
    }
    None
}

/// Phase 3: weaker but direct signals near the top of the document, then
/// asynchronous delivery statements.
pub fn header_heuristics(text: &ModalityText, _tuning: &ModalityTuning) -> Option<Verdict> {
    let lower = text.lower.as_str();
    let hybrid_in_header = head_chars(lower, HEAD_1500).contains("hybrid");

    if DELIVERY_ONLINE_RE.is_match(head_chars(lower, HEAD_1000)) {
        return Some(Verdict::decided(
            Modality::Online,
            0.92,
            "delivery method states online",
        ));
    }

    let head_600 = head_chars(lower, HEAD_600);
    if let Some(m) = MEETING_ROOM_RE.find(head_600) {
        let near = around(head_600, m.start(), m.end(), 50, 150);
        if !near.contains("office") && !hybrid_in_header {
            return Some(Verdict::decided(
                Modality::InPerson,
                0.92,
                "header names a physical meeting room",
            ));
        }
    }

    if IN_PERSON_RE.is_match(head_600) && !head_600.contains("office") && !hybrid_in_header {
        return Some(Verdict::decided(Modality::InPerson, 0.90, "header says in person"));
    }

    let non_office = text.without_office();
    if !hybrid_in_header {
        if has_room(&non_office) {
            return Some(Verdict::decided(
                Modality::InPerson,
                0.90,
                "physical room outside office hours",
            ));
        }
        if has_schedule_without_online_cues(&non_office) {
            return Some(Verdict::decided(
                Modality::InPerson,
                0.86,
                "day and time schedule with no online cues",
            ));
        }
    }

    asynchronous_delivery(lower)
}

fn asynchronous_delivery(lower: &str) -> Option<Verdict> {
    let position = lower.find("asynchronous")?;
    let snippet = around(lower, position, position, 220, 220);
    if ASYNC_BAD_CONTEXT.iter().any(|bad| snippet.contains(bad)) {
        return None;
    }
    if ASYNC_DELIVERY_CONTEXT.iter().any(|w| snippet.contains(w))
        && !ASYNC_PHYSICAL_CONTEXT.iter().any(|w| snippet.contains(w))
    {
        return Some(Verdict::decided(
            Modality::Online,
            0.88,
            "asynchronous online delivery",
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Document;

    fn text(raw: &str) -> ModalityText {
        ModalityText::new(&Document::new(raw))
    }

    fn modality(verdict: Option<Verdict>) -> Option<Modality> {
        match verdict {
            Some(Verdict::Decided { modality, .. }) => Some(modality),
            _ => None,
        }
    }

    #[test]
    fn test_hybrid_phrase_checked_before_online() {
        let t = text("This hybrid course is offered online and on campus.");
        assert_eq!(
            modality(definitive_statement(&t, &ModalityTuning::default())),
            Some(Modality::Hybrid)
        );
    }

    #[test]
    fn test_location_online_without_room() {
        let t = text("Location: Online via Canvas");
        assert_eq!(
            modality(definitive_statement(&t, &ModalityTuning::default())),
            Some(Modality::Online)
        );
    }

    #[test]
    fn test_location_online_with_room_is_hybrid() {
        let t = text("Location: Online and Room 105");
        assert_eq!(
            modality(definitive_statement(&t, &ModalityTuning::default())),
            Some(Modality::Hybrid)
        );
    }

    #[test]
    fn test_class_section_zoom() {
        let t = text("Class Meeting Time: Wednesdays, class held on Zoom");
        assert_eq!(
            modality(class_section(&t, &ModalityTuning::default())),
            Some(Modality::Online)
        );
    }

    #[test]
    fn test_class_section_room() {
        let t = text("Class Location: Room 105, Pandora Mill");
        assert_eq!(
            modality(class_section(&t, &ModalityTuning::default())),
            Some(Modality::InPerson)
        );
    }

    #[test]
    fn test_office_room_does_not_make_in_person() {
        let t = text("Office Hours: Room 201\nTuesdays 2-3pm on Zoom");
        assert_eq!(modality(header_heuristics(&t, &ModalityTuning::default())), None);
    }

    #[test]
    fn test_asynchronous_delivery() {
        let t = text("Course Overview\nThe course is asynchronous with weekly modules.");
        assert_eq!(
            modality(header_heuristics(&t, &ModalityTuning::default())),
            Some(Modality::Online)
        );
    }
}
