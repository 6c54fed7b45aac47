//! Core value types shared by every stage of the engine.
//!
//! This module defines:
//! - [`ContextLabel`], the semantic label assigned to a candidate's line
//! - [`ScoreComponents`], the named additive parts of a candidate score
//! - [`Candidate`], a provisional field value with its scoring inputs
//! - [`DetectionResult`], the terminal per-field output

use std::collections::BTreeSet;

use serde::Serialize;

/// Semantic label for the lines around a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContextLabel {
    Target,
    Neutral,
    Excluded,
}

impl ContextLabel {
    /// Sort priority used by selection: lower is better.
    pub fn priority(self) -> u8 {
        match self {
            ContextLabel::Target => 0,
            ContextLabel::Neutral => 1,
            ContextLabel::Excluded => 2,
        }
    }
}

/// Named contributions to a candidate's score. The total is a pure sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreComponents {
    pub base: f64,
    pub header_bonus: f64,
    pub explicit_label_bonus: f64,
    pub context_bonus: f64,
    /// Negative adjustment standing in for the neutral-context multiplier.
    pub neutral_adjustment: f64,
    pub multiplicity_bonus: f64,
    pub position_bonus: f64,
    pub penalty: f64,
}

impl ScoreComponents {
    pub fn total(&self) -> f64 {
        self.base
            + self.header_bonus
            + self.explicit_label_bonus
            + self.context_bonus
            + self.neutral_adjustment
            + self.multiplicity_bonus
            + self.position_bonus
            + self.penalty
    }
}

/// A provisional value for one field, created fresh per detection call.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Cleaned candidate text.
    pub text: String,
    /// 0-based line index of the match.
    pub line_index: usize,
    /// Byte offset of the match inside its line.
    pub start: usize,
    /// Byte offset just past the match inside its line.
    pub end: usize,
    pub context: ContextLabel,
    pub raw_score: f64,
    /// Index of the tier that fired (0 = highest priority).
    pub tier: usize,
    /// Label of the rule that produced the candidate.
    pub rule: String,
    pub flags: BTreeSet<String>,
    pub components: ScoreComponents,
}

impl Candidate {
    pub fn new(text: String, line_index: usize, tier: usize, rule: &str, base: f64) -> Self {
        Self {
            text,
            line_index,
            start: 0,
            end: 0,
            context: ContextLabel::Neutral,
            raw_score: base,
            tier,
            rule: rule.to_string(),
            flags: BTreeSet::new(),
            components: ScoreComponents {
                base,
                ..ScoreComponents::default()
            },
        }
    }

    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

/// Terminal result for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub found: bool,
    pub content: Option<String>,
    /// Always within `[0, 1]`; exactly `0.0` whenever `found` is false.
    pub confidence: f64,
    pub evidence: Vec<String>,
}

impl DetectionResult {
    pub fn found(content: impl Into<String>, confidence: f64, evidence: Vec<String>) -> Self {
        Self {
            found: true,
            content: Some(content.into()),
            confidence: round2(confidence.clamp(0.0, 1.0)),
            evidence,
        }
    }

    pub fn not_found() -> Self {
        Self {
            found: false,
            content: None,
            confidence: 0.0,
            evidence: Vec::new(),
        }
    }

    /// A not-found result that still carries an explicit terminal label
    /// (e.g. `"Unknown"` for categorical fields).
    pub fn undetermined(label: impl Into<String>, evidence: Vec<String>) -> Self {
        Self {
            found: false,
            content: Some(label.into()),
            confidence: 0.0,
            evidence,
        }
    }
}

/// Round to two decimals, the precision reported for confidences.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_total_is_sum() {
        let components = ScoreComponents {
            base: 0.85,
            header_bonus: 0.15,
            explicit_label_bonus: 0.25,
            context_bonus: 0.1,
            neutral_adjustment: 0.0,
            multiplicity_bonus: 0.0,
            position_bonus: 0.05,
            penalty: -0.4,
        };
        assert!((components.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_context_priority_order() {
        assert!(ContextLabel::Target.priority() < ContextLabel::Neutral.priority());
        assert!(ContextLabel::Neutral.priority() < ContextLabel::Excluded.priority());
        assert_eq!(ContextLabel::Excluded.to_string(), "excluded");
    }

    #[test]
    fn test_detection_result_constructors() {
        let found = DetectionResult::found("Room 105", 1.7, vec!["line 2".to_string()]);
        assert!(found.found);
        assert_eq!(found.confidence, 1.0);

        let missing = DetectionResult::not_found();
        assert!(!missing.found);
        assert_eq!(missing.confidence, 0.0);
        assert!(missing.content.is_none());

        let unknown = DetectionResult::undetermined("Unknown", Vec::new());
        assert!(!unknown.found);
        assert_eq!(unknown.confidence, 0.0);
        assert_eq!(unknown.content.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_candidate_flags() {
        let mut candidate = Candidate::new("Canvas".to_string(), 3, 0, "platform", 50.0);
        candidate.flags.insert("section".to_string());
        assert!(candidate.has_flag("section"));
        assert_eq!(candidate.components.total(), 50.0);
    }
}
