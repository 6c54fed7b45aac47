//! Context classification of a candidate's surrounding lines.
//!
//! Resolution order for line `i`:
//! 1. Line `i` matches a Target keyword → [`ContextLabel::Target`]
//! 2. Line `i` matches an Excluded keyword → [`ContextLabel::Excluded`]
//! 3. The window `[i - before, i + after]` contains a Target keyword → Target
//! 4. The window contains an Excluded keyword that also occurs within
//!    `strict_radius` lines of `i` → Excluded
//! 5. Otherwise → [`ContextLabel::Neutral`]
//!
//! Acceptance looks at the loose window, rejection only at the tight one.

use super::document::Document;
use super::rules::KeywordSet;
use super::types::ContextLabel;

#[derive(Debug, Clone)]
pub struct ContextRules {
    pub target: KeywordSet,
    pub excluded: KeywordSet,
    pub before: usize,
    pub after: usize,
    pub strict_radius: usize,
}

impl ContextRules {
    pub fn new(target: KeywordSet, excluded: KeywordSet, before: usize, after: usize) -> Self {
        Self {
            target,
            excluded,
            before,
            after,
            strict_radius: 1,
        }
    }
}

/// Classify the context of line `line_index`.
pub fn classify(doc: &Document, line_index: usize, rules: &ContextRules) -> ContextLabel {
    let Some(line) = doc.line(line_index) else {
        return ContextLabel::Neutral;
    };

    if rules.target.is_match(line) {
        return ContextLabel::Target;
    }
    if rules.excluded.is_match(line) {
        return ContextLabel::Excluded;
    }

    let window = doc.window(line_index, rules.before, rules.after);
    if rules.target.any_line(window) {
        return ContextLabel::Target;
    }

    if rules.excluded.any_line(window) {
        let near = doc.window(line_index, rules.strict_radius, rules.strict_radius);
        if rules.excluded.any_line(near) {
            return ContextLabel::Excluded;
        }
    }

    ContextLabel::Neutral
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ContextRules {
        ContextRules::new(
            KeywordSet::compile("test", &[r"(?i)\bclass\s+location\b", r"(?i)\bclassroom\b"])
                .unwrap(),
            KeywordSet::compile("test", &[r"(?i)\boffice\s+hours?\b", r"(?i)\btutoring\b"])
                .unwrap(),
            2,
            15,
        )
    }

    #[test]
    fn test_current_line_target_overrides_exclusion() {
        let doc = Document::new("Class Location (not office hours): Room 105");
        assert_eq!(classify(&doc, 0, &rules()), ContextLabel::Target);
    }

    #[test]
    fn test_current_line_exclusion() {
        let doc = Document::new("Office Hours: Room 201\nClass Location: Room 105");
        assert_eq!(classify(&doc, 0, &rules()), ContextLabel::Excluded);
        assert_eq!(classify(&doc, 1, &rules()), ContextLabel::Target);
    }

    #[test]
    fn test_loose_window_accepts() {
        let doc = Document::new("Class Location\nMondays\nRoom 105");
        assert_eq!(classify(&doc, 2, &rules()), ContextLabel::Target);
    }

    #[test]
    fn test_tight_window_rejects_only_adjacent() {
        let doc = Document::new("Office Hours\nRoom 201\n\n\nRoom 105");
        assert_eq!(classify(&doc, 1, &rules()), ContextLabel::Excluded);
        // Exclusion keyword inside the loose window but not adjacent.
        let doc = Document::new("Tutoring\nsee below\nRoom 105");
        assert_eq!(classify(&doc, 2, &rules()), ContextLabel::Neutral);
    }

    #[test]
    fn test_out_of_range_line_is_neutral() {
        let doc = Document::new("Room 105");
        assert_eq!(classify(&doc, 7, &rules()), ContextLabel::Neutral);
    }
}
