//! Lowercased views of a document used by the modality phases.

use std::sync::LazyLock;

use regex::RegexSet;

use crate::engine::Document;

const LOCATION_SEARCH_LINES: usize = 300;
const OFFICE_SEARCH_LINES: usize = 400;
const SECTION_BEFORE: usize = 1;
/// Exclusive: the section holds the header line and the five lines after it.
const SECTION_AFTER: usize = 6;

/// Headers that open a class-location section.
static CLASS_SECTION_HEADERS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)(?:class|course)\s+(?:location|meets?|meeting|time)",
        r"(?i)(?:meeting\s+)?(?:location|place|where)",
        r"(?i)(?:time\s+and\s+)?location",
        r"(?i)(?:class|course)\s+delivery",
        r"(?i)delivery\s+(?:method|format|mode)",
        r"(?i)modality",
        r"(?i)schedule",
    ])
    .unwrap()
});

static OFFICE_SECTION_HEADERS: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new([r"(?i)\boffice\s+hours?\b"]).unwrap());

/// The text each modality phase inspects.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalityText {
    /// The whole document, lowercased.
    pub lower: String,
    /// Lines around the first class-location header, lowercased; empty
    /// when there is none.
    pub class_section: String,
    /// Lines around the first office-hours header, lowercased; empty when
    /// there is none.
    pub office_section: String,
}

impl ModalityText {
    pub fn new(doc: &Document) -> Self {
        let lower = doc.text().to_lowercase();
        let lines: Vec<&str> = lower.split('\n').collect();
        let class_section = find_section(&lines, &CLASS_SECTION_HEADERS, LOCATION_SEARCH_LINES);
        let office_section = find_section(&lines, &OFFICE_SECTION_HEADERS, OFFICE_SEARCH_LINES);
        Self {
            lower,
            class_section,
            office_section,
        }
    }

    /// The document with the office-hours section cut out.
    pub fn without_office(&self) -> String {
        if self.office_section.is_empty() {
            self.lower.clone()
        } else {
            self.lower.replace(&self.office_section, "")
        }
    }
}

fn find_section(lines: &[&str], headers: &RegexSet, search_lines: usize) -> String {
    lines
        .iter()
        .take(search_lines)
        .position(|line| headers.is_match(line))
        .map(|index| {
            let start = index.saturating_sub(SECTION_BEFORE);
            let end = (index + SECTION_AFTER).min(lines.len());
            lines[start..end].join("\n")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_are_found_separately() {
        let doc = Document::new(
            "COMP 405\nInstructor: Dr. Lee\n\n\n\n\n\n\nOffice Hours: Room 201\nTuesdays 2-3pm",
        );
        let text = ModalityText::new(&doc);
        assert!(text.class_section.is_empty());
        assert!(text.office_section.contains("office hours: room 201"));
        assert!(!text.without_office().contains("room 201"));
    }

    #[test]
    fn test_class_section_window() {
        let doc = Document::new("Syllabus\nClass Location: Room 105\na\nb\nc\nd\ne\nf");
        let text = ModalityText::new(&doc);
        assert_eq!(text.class_section, "syllabus\nclass location: room 105\na\nb\nc\nd\ne");
    }
}
