//! Phase 4: weighted soft-signal scoring.
//!
//! Online and in-person patterns accumulate into independent totals. When
//! both clear the signal threshold a hybrid total is synthesized from them;
//! room evidence that lives only in the office-hours section shifts weight
//! from in-person to online. The largest total wins with confidence
//! `max / sum`, or the document is undetermined.

use std::sync::LazyLock;

use log::debug;
use regex::{Regex, RegexSet};

use super::sections::ModalityText;
use super::signals::{BUILDING_WORDS, has_room, mentions_delivery};
use super::{Modality, ModalityTuning, Verdict};
use crate::engine::round2;
use crate::utils::text::{around, head_chars, truncate_words};

const ZOOM_HEADER_CHARS: usize = 1500;
const ZOOM_CONTEXT: usize = 60;
const ZOOM_HEADER_WEIGHT: f64 = 2.0;
const SNIPPET_CHARS: usize = 80;

static ONLINE_PATTERNS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    [
        (r"\bcourse\s+(?:is\s+)?(?:delivered|offered|taught)\s+online\b", 3.5),
        (r"\bonline\s+(?:course|format|delivery|instruction|modality)\b", 3.0),
        (r"\bsynchronous\s+online\b", 3.2),
        (r"\basynchronous\s+(?:course|format|delivery)\b", 3.2),
        (r"\bremote\s+(?:course|instruction|learning)\b", 2.5),
        (r"\bvirtual\s+course\b", 2.5),
        (r"\bclass\s+meets?\s+(?:on|via)\s+(?:zoom|microsoft\s*teams|teams|webex)\b", 3.5),
        (r"\bdelivered\s+(?:entirely\s+)?(?:online|remotely|asynchronously)\b", 3.5),
    ]
    .into_iter()
    .map(|(p, w)| (Regex::new(p).unwrap(), w))
    .collect()
});

static IN_PERSON_PATTERNS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    [
        (
            format!(r"\b(?:class|course|lecture)\s+(?:meets?|is held|location).*(?:{BUILDING_WORDS})\b"),
            3.0,
        ),
        (
            format!(r"\b(?:location|where)\b.*\b(?:{BUILDING_WORDS})\b.*\b[a-z]?\d{{2,4}}\b"),
            2.7,
        ),
        (r"\bin[-\s]?person\s+(?:class|course|instruction)\b".to_string(), 2.5),
        (r"\bon\s+campus\s+(?:course|class)\b".to_string(), 2.0),
        (r"\bclassroom\s+instruction\b".to_string(), 2.0),
        (r"\b[a-z]+(?:\s+(?:hall|building|lab))?\s+[a-z]?\d{2,4}\b".to_string(), 2.1),
        (r"\btaking\s+attendance\b".to_string(), 1.5),
        (r"\barrive\s+late\s+to\s+class\b".to_string(), 1.3),
        (r"\bleave\s+early\s+from\s+class\b".to_string(), 1.3),
        (r"\bneed\s+to\s+be\s+here\b".to_string(), 1.5),
        (r"\bin[ -]?person\b".to_string(), 2.0),
        (r"\bon[- ]site\b".to_string(), 1.8),
        (r"face[- ]to[- ]face\b".to_string(), 2.0),
        (r"\b(?:outdoor|field)\s+(?:meetings?|sessions?|labs?)\b".to_string(), 2.0),
    ]
    .into_iter()
    .map(|(p, w)| (Regex::new(&p).unwrap(), w))
    .collect()
});

/// Online mentions that describe materials rather than delivery.
const IRRELEVANT_ONLINE: &[&str] = &[
    "textbook online",
    "materials online",
    "resources online",
    "available online",
    "posted online",
    "submit online",
    "canvas online",
];

const SUPPORT_SERVICES: &[&str] = &[
    "accessibility",
    "counseling",
    "tutoring",
    "writing center",
    "library",
    "financial aid",
    "registrar",
    "advisement",
    "student services",
    "wellness",
    "health services",
];

/// Course codes and credit lines whose numbers look like rooms.
static COURSE_CODES: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\bcomp\s*\d",
        r"\bmath\s*\d",
        r"\bbms\s*\d",
        r"\bphys\s*\d",
        r"\banth\s*\d",
        r"\bpsyc\s*\d",
        r"\bbiol\s*\d",
        r"\bcmn\s*\d",
        r"\bnsia\s*\d",
        r"\bcredit",
        r"\bcrn\s*:",
    ])
    .unwrap()
});

const ZOOM_NEAR_EXCLUDED: &[&str] = &["office", "counseling", "support"];
const ZOOM_NEAR_REQUIRED: &[&str] = &["meet", "class", "course", "location", "delivery"];

/// The three running totals and the snippets that fed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoftScores {
    pub online: f64,
    pub hybrid: f64,
    pub in_person: f64,
    pub evidence: Vec<String>,
}

impl SoftScores {
    /// The winning category and its total; ties go to Online, then Hybrid.
    pub fn best(&self) -> (Modality, f64) {
        [
            (Modality::Online, self.online),
            (Modality::Hybrid, self.hybrid),
            (Modality::InPerson, self.in_person),
        ]
        .into_iter()
        .fold((Modality::Online, f64::MIN), |best, (modality, total)| {
            if total > best.1 { (modality, total) } else { best }
        })
    }

    pub fn sum(&self) -> f64 {
        self.online + self.hybrid + self.in_person
    }
}

/// Accumulate every soft signal in the document.
pub fn accumulate(text: &ModalityText, tuning: &ModalityTuning) -> SoftScores {
    let lower = text.lower.as_str();
    let mut scores = SoftScores::default();

    for (pattern, weight) in ONLINE_PATTERNS.iter() {
        let Some(m) = pattern.find(lower) else {
            continue;
        };
        let context = around(lower, m.start(), m.end(), 30, 30);
        if !IRRELEVANT_ONLINE.iter().any(|ctx| context.contains(ctx)) {
            scores.online += weight;
            push_snippet(&mut scores.evidence, "online", m.as_str());
        }
    }

    let head = head_chars(lower, ZOOM_HEADER_CHARS);
    if let Some(position) = head.find("zoom") {
        let near = around(head, position, position, ZOOM_CONTEXT, ZOOM_CONTEXT);
        if !ZOOM_NEAR_EXCLUDED.iter().any(|w| near.contains(w))
            && ZOOM_NEAR_REQUIRED.iter().any(|w| near.contains(w))
        {
            scores.online += ZOOM_HEADER_WEIGHT;
            push_snippet(&mut scores.evidence, "online", near.trim());
        }
    }

    for (pattern, weight) in IN_PERSON_PATTERNS.iter() {
        let Some(m) = pattern.find(lower) else {
            continue;
        };
        let context = around(lower, m.start(), m.end(), 50, 50);
        let is_course_code = COURSE_CODES.is_match(context);
        if !is_course_code && !SUPPORT_SERVICES.iter().any(|ctx| context.contains(ctx)) {
            scores.in_person += weight;
            push_snippet(&mut scores.evidence, "in-person", m.as_str());
        }
    }

    if scores.online > tuning.signal_threshold && scores.in_person > tuning.signal_threshold {
        scores.hybrid = scores
            .hybrid
            .max((scores.online + scores.in_person) * tuning.hybrid_blend);
    }

    if !text.office_section.is_empty() && scores.in_person > 0.0 {
        let room_in_class = has_room(&text.class_section);
        let room_in_office = has_room(&text.office_section);
        if room_in_office && !room_in_class {
            scores.in_person = (scores.in_person - tuning.office_room_penalty).max(0.0);
            scores
                .evidence
                .push("room appears only in office hours".to_string());
            if scores.online > tuning.online_boost_threshold {
                scores.online += tuning.online_boost;
            }
        }
    }

    debug!(
        "modality soft scores: online {:.2} hybrid {:.2} in-person {:.2}",
        scores.online, scores.hybrid, scores.in_person
    );
    scores
}

fn push_snippet(evidence: &mut Vec<String>, kind: &str, snippet: &str) {
    if mentions_delivery(snippet) {
        evidence.push(format!("{kind}: {}", truncate_words(snippet, SNIPPET_CHARS)));
    }
}

/// Phase 4: always terminal.
pub fn soft_scoring(text: &ModalityText, tuning: &ModalityTuning) -> Option<Verdict> {
    let scores = accumulate(text, tuning);
    let (modality, max) = scores.best();

    if max < tuning.absolute_floor {
        return Some(Verdict::unknown("no clear modality indicators"));
    }

    let total = scores.sum();
    let confidence = if total > 0.0 {
        round2(max / total).max(tuning.confidence_floor)
    } else {
        tuning.confidence_floor
    };

    let mut evidence = scores.evidence;
    if evidence.is_empty() {
        evidence.push(format!("{} indicators found", modality.to_string().to_lowercase()));
    }
    Some(Verdict::Decided {
        modality,
        confidence,
        evidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Document;

    fn text(raw: &str) -> ModalityText {
        ModalityText::new(&Document::new(raw))
    }

    #[test]
    fn test_hybrid_is_synthesized_from_both_totals() {
        let t = text(
            "This online course includes required in-person lab sessions.\n\
             Remote learning modules are posted weekly.\n\
             We will be taking attendance at the face-to-face labs.",
        );
        let tuning = ModalityTuning::default();
        let scores = accumulate(&t, &tuning);
        assert!(scores.online > tuning.signal_threshold);
        assert!(scores.in_person > tuning.signal_threshold);
        let expected = (scores.online + scores.in_person) * tuning.hybrid_blend;
        assert!((scores.hybrid - expected).abs() < 1e-9);
        assert_eq!(scores.best().0, Modality::Hybrid);
    }

    #[test]
    fn test_office_only_room_shifts_weight_to_online() {
        let t = text(
            "Welcome\nThis online course uses weekly modules.\n\n\
             Office Hours: Kingsbury Hall 201\nThursdays by appointment",
        );
        let scores = accumulate(&t, &ModalityTuning::default());
        assert_eq!(scores.in_person, 0.0);
        assert!(scores.online >= 5.0);
        assert!(scores.evidence.iter().any(|e| e.contains("office hours")));
    }

    #[test]
    fn test_thin_evidence_is_unknown() {
        let t = text("Readings are posted each week.");
        assert!(matches!(
            soft_scoring(&t, &ModalityTuning::default()),
            Some(Verdict::Unknown { .. })
        ));
    }

    #[test]
    fn test_best_prefers_online_on_ties() {
        let scores = SoftScores {
            online: 3.0,
            hybrid: 0.0,
            in_person: 3.0,
            evidence: Vec::new(),
        };
        assert_eq!(scores.best(), (Modality::Online, 3.0));
    }
}
