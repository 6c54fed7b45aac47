//! Vocabulary and pattern predicates shared by the modality phases.
//!
//! Every predicate runs on lowercased text.

use std::sync::LazyLock;

use regex::Regex;

/// Words that name a physical teaching space.
pub const BUILDING_WORDS: &str = r"(?:rm\.?|room|hall|bldg\.?|building|lab|laboratory|lecture hall|classroom|pandra|pandora)";

const DAYS_TOKEN: &str = r"(?:m/w|mw|t/th|tth|tr|mon(?:day)?|tue(?:s)?(?:day)?|wed(?:nesday)?|thu(?:rs)?(?:day)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?)";

const TIME_TOKEN: &str = r"(?:\b\d{1,2}:\d{2}\s?(?:am|pm)?\b|\b\d{1,2}\s?(?:am|pm)\b)";

/// A building word followed, later on the line, by a room number.
pub static ROOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b{BUILDING_WORDS}\b.*\b[a-z]?\d{{2,4}}\b")).unwrap()
});

static MEETS_IN_BUILDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:meets?|meeting)\s+in\b.*\b{BUILDING_WORDS}\b")).unwrap()
});

static ZOOM_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:meets?|meeting|class|delivered|offered)\b.*\b(?:zoom|microsoft\s*teams|teams|webex)\b",
    )
    .unwrap()
});

/// A meeting verb, then a building word, then a room number.
pub static MEETING_ROOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:meets?|meeting)\b.*\b{BUILDING_WORDS}\b.*\b[a-z]?\d{{2,4}}\b"))
        .unwrap()
});

static DAYS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(DAYS_TOKEN).unwrap());

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(TIME_TOKEN).unwrap());

static ONLINE_CUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:online|zoom|microsoft\s*teams|webex|remote)\b").unwrap());

/// Support offices whose room numbers say nothing about class delivery.
pub const SUPPORT_CONTEXTS: &[&str] = &[
    "accessibility services",
    "student accessibility",
    "counseling services",
    "tutoring",
    "writing center",
    "library",
    "financial aid",
    "registrar",
    "dean's office",
    "advisement",
    "student services",
];

/// Vocabulary an evidence snippet must contain to be reported.
pub const DELIVERY_VOCABULARY: &[&str] = &[
    "online",
    "hybrid",
    "blended",
    "zoom",
    "teams",
    "webex",
    "remote",
    "asynchronous",
    "synchronous",
    "person",
    "campus",
    "room",
    "hall",
    "building",
    "classroom",
    "face",
];

/// Zoom, Teams or Webex named as the class meeting venue.
pub fn has_zoom_class_phrase(text: &str) -> bool {
    !text.is_empty() && ZOOM_CLASS_RE.is_match(text)
}

/// A physical room named for class meetings, outside support-office text.
pub fn has_physical_room_phrase(text: &str) -> bool {
    if text.is_empty() || SUPPORT_CONTEXTS.iter().any(|ctx| text.contains(ctx)) {
        return false;
    }
    ROOM_RE.is_match(text) || MEETS_IN_BUILDING_RE.is_match(text)
}

pub fn has_room(text: &str) -> bool {
    ROOM_RE.is_match(text)
}

/// A day and a time appear, and no online venue is mentioned.
pub fn has_schedule_without_online_cues(text: &str) -> bool {
    DAYS_RE.is_match(text) && TIME_RE.is_match(text) && !ONLINE_CUE_RE.is_match(text)
}

/// True when `snippet` mentions delivery vocabulary.
pub fn mentions_delivery(snippet: &str) -> bool {
    let lower = snippet.to_lowercase();
    DELIVERY_VOCABULARY.iter().any(|word| lower.contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_class_phrase() {
        assert!(has_zoom_class_phrase("class meets weekly on zoom"));
        assert!(!has_zoom_class_phrase("zoom link posted"));
        assert!(!has_zoom_class_phrase(""));
    }

    #[test]
    fn test_physical_room_phrase_ignores_support_offices() {
        assert!(has_physical_room_phrase("class location: room 105"));
        assert!(has_physical_room_phrase("we meet in the pandora building"));
        assert!(!has_physical_room_phrase("tutoring in room 110"));
    }

    #[test]
    fn test_schedule_without_online_cues() {
        assert!(has_schedule_without_online_cues("tuesday 9:00 am - 11:50 am"));
        assert!(!has_schedule_without_online_cues("tuesday 9:00 am on zoom"));
        assert!(!has_schedule_without_online_cues("no times listed"));
    }

    #[test]
    fn test_mentions_delivery() {
        assert!(mentions_delivery("Course is delivered Online"));
        assert!(!mentions_delivery("Final exam week"));
    }
}
