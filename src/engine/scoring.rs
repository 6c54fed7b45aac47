//! Candidate scoring and deterministic selection.
//!
//! A score is the sum of the named [`ScoreComponents`]; no component looks
//! at any other candidate. Selection is relative and uses a fixed
//! comparator: total score (descending), context priority (Target first),
//! line index (earliest first), then tier and byte offset.

use std::cmp::Ordering;

use regex::Regex;

use super::rules::{Penalty, PenaltyScope};
use super::types::{Candidate, ContextLabel, ScoreComponents};
use crate::utils::text::before;

/// Whether an explicit label must sit right before the match or anywhere on
/// the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelScope {
    #[default]
    Immediate,
    Line,
}

/// A bonus for candidates whose relative position in the document is below
/// `max_ratio`. Buckets are checked in order; the first hit applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionBucket {
    pub max_ratio: f64,
    pub bonus: f64,
}

#[derive(Debug, Clone)]
pub struct ScoringRules {
    /// Lines with an index below this receive `header_bonus`.
    pub header_lines: usize,
    pub header_bonus: f64,
    pub explicit_label: Option<Regex>,
    pub label_scope: LabelScope,
    pub explicit_label_bonus: f64,
    pub target_bonus: f64,
    /// Neutral candidates keep this fraction of their base weight.
    pub neutral_factor: f64,
    pub multiplicity_bonus: f64,
    pub position_buckets: Vec<PositionBucket>,
    pub penalties: Vec<Penalty>,
    /// Candidates scoring below this are discarded.
    pub min_score: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            header_lines: 0,
            header_bonus: 0.0,
            explicit_label: None,
            label_scope: LabelScope::Immediate,
            explicit_label_bonus: 0.0,
            target_bonus: 0.0,
            neutral_factor: 1.0,
            multiplicity_bonus: 0.0,
            position_buckets: Vec::new(),
            penalties: Vec::new(),
            min_score: f64::MIN,
        }
    }
}

/// Inputs a score needs beyond the candidate itself.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    /// The unit (line or window text) the candidate was matched in.
    pub line: &'a str,
    pub total_lines: usize,
    /// Number of distinct values merged into this candidate.
    pub multiplicity: usize,
}

/// Compute the score components for one candidate.
pub fn score(candidate: &Candidate, input: &ScoreInput<'_>, rules: &ScoringRules) -> ScoreComponents {
    let base = candidate.components.base;
    let mut components = ScoreComponents {
        base,
        ..ScoreComponents::default()
    };

    if candidate.line_index < rules.header_lines {
        components.header_bonus = rules.header_bonus;
    }

    if let Some(label) = &rules.explicit_label
        && has_explicit_label(label, rules.label_scope, input.line, candidate.start)
    {
        components.explicit_label_bonus = rules.explicit_label_bonus;
    }

    match candidate.context {
        ContextLabel::Target => components.context_bonus = rules.target_bonus,
        ContextLabel::Neutral => components.neutral_adjustment = base * (rules.neutral_factor - 1.0),
        ContextLabel::Excluded => {}
    }

    if input.multiplicity > 1 {
        components.multiplicity_bonus = rules.multiplicity_bonus;
    }

    if input.total_lines > 0 {
        let ratio = candidate.line_index as f64 / input.total_lines as f64;
        if let Some(bucket) = rules.position_buckets.iter().find(|b| ratio < b.max_ratio) {
            components.position_bonus = bucket.bonus;
        }
    }

    components.penalty = rules
        .penalties
        .iter()
        .filter(|p| penalty_applies(p, candidate, input.line))
        .map(|p| p.weight)
        .sum();

    components
}

fn has_explicit_label(label: &Regex, scope: LabelScope, line: &str, start: usize) -> bool {
    match scope {
        LabelScope::Line => label.is_match(line),
        LabelScope::Immediate => {
            let prefix = before(line, start, start);
            label.find_iter(prefix).last().is_some_and(|m| {
                prefix[m.end()..]
                    .chars()
                    .all(|c| c.is_whitespace() || matches!(c, ':' | '-' | '(' | ','))
            })
        }
    }
}

fn penalty_applies(penalty: &Penalty, candidate: &Candidate, line: &str) -> bool {
    match penalty.scope {
        PenaltyScope::Text => penalty.regex.is_match(&candidate.text),
        PenaltyScope::Before(n) => penalty.regex.is_match(before(line, candidate.start, n)),
        PenaltyScope::Line => penalty.regex.is_match(line),
    }
}

/// The fixed selection comparator; `Less` means `a` is preferred.
pub fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    b.raw_score
        .total_cmp(&a.raw_score)
        .then_with(|| a.context.priority().cmp(&b.context.priority()))
        .then_with(|| a.line_index.cmp(&b.line_index))
        .then_with(|| a.tier.cmp(&b.tier))
        .then_with(|| a.start.cmp(&b.start))
}

/// Pick the winner among scored candidates. Excluded candidates never win.
pub fn select(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates
        .iter()
        .filter(|c| c.context != ContextLabel::Excluded)
        .min_by(|a, b| compare(a, b))
}
