//! Declarative rule specs and their compiled forms.
//!
//! Field tables are written as `const` [`RuleSpec`]/[`TierSpec`] values and
//! compiled once when the engine is built. An invalid pattern is a
//! construction error naming the field and rule, never a detection-time
//! failure.

use anyhow::{Context, Result};
use regex::{Regex, RegexSet};

/// Source form of one weighted pattern rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub label: &'static str,
    pub pattern: &'static str,
    /// Capture group holding the value; `0` is the whole match.
    pub group: usize,
    pub weight: f64,
    /// Canonical content reported instead of the matched text.
    pub display: Option<&'static str>,
}

impl RuleSpec {
    pub const fn new(label: &'static str, pattern: &'static str, weight: f64) -> Self {
        Self {
            label,
            pattern,
            group: 0,
            weight,
            display: None,
        }
    }

    pub const fn group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }

    pub const fn display(mut self, display: &'static str) -> Self {
        self.display = Some(display);
        self
    }
}

/// Source form of a priority bucket of rules.
#[derive(Debug, Clone, Copy)]
pub struct TierSpec {
    pub name: &'static str,
    pub rules: &'static [RuleSpec],
}

/// A compiled pattern rule.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub label: String,
    pub regex: Regex,
    pub group: usize,
    pub weight: f64,
    pub display: Option<String>,
}

impl PatternRule {
    pub fn compile(field: &str, spec: &RuleSpec) -> Result<Self> {
        let regex = Regex::new(spec.pattern)
            .with_context(|| format!("invalid pattern for {field} rule '{}'", spec.label))?;
        if spec.group > regex.captures_len().saturating_sub(1) {
            anyhow::bail!(
                "{field} rule '{}' selects group {} but the pattern has {} groups",
                spec.label,
                spec.group,
                regex.captures_len() - 1
            );
        }
        Ok(Self {
            label: spec.label.to_string(),
            regex,
            group: spec.group,
            weight: spec.weight,
            display: spec.display.map(str::to_string),
        })
    }
}

/// A compiled tier: rules tried together, suppressing lower tiers on a line.
#[derive(Debug, Clone)]
pub struct Tier {
    pub name: String,
    pub rules: Vec<PatternRule>,
}

/// Compile an ordered list of tier specs.
pub fn compile_tiers(field: &str, specs: &[TierSpec]) -> Result<Vec<Tier>> {
    specs
        .iter()
        .map(|spec| {
            let rules = spec
                .rules
                .iter()
                .map(|rule| PatternRule::compile(field, rule))
                .collect::<Result<Vec<_>>>()?;
            Ok(Tier {
                name: spec.name.to_string(),
                rules,
            })
        })
        .collect()
}

/// Compile a list of patterns.
pub fn compile_all(field: &str, patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("invalid pattern for {field}: {p}")))
        .collect()
}

/// A set of keyword patterns tested together.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    set: RegexSet,
}

impl KeywordSet {
    pub fn compile(field: &str, patterns: &[&str]) -> Result<Self> {
        let set = RegexSet::new(patterns)
            .with_context(|| format!("invalid keyword set for {field}"))?;
        Ok(Self { set })
    }

    pub fn empty() -> Self {
        Self {
            set: RegexSet::empty(),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        !self.set.is_empty() && self.set.is_match(text)
    }

    /// True if any line in `lines` matches.
    pub fn any_line(&self, lines: &[String]) -> bool {
        lines.iter().any(|line| self.is_match(line))
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// Where a penalty pattern is tested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PenaltyScope {
    /// The candidate text itself.
    Text,
    /// Up to this many bytes immediately before the match on its line.
    Before(usize),
    /// The whole line.
    Line,
}

#[derive(Debug, Clone, Copy)]
pub struct PenaltySpec {
    pub label: &'static str,
    pub pattern: &'static str,
    pub weight: f64,
    pub scope: PenaltyScope,
}

impl PenaltySpec {
    pub const fn new(
        label: &'static str,
        pattern: &'static str,
        weight: f64,
        scope: PenaltyScope,
    ) -> Self {
        Self {
            label,
            pattern,
            weight,
            scope,
        }
    }
}

/// A compiled negative signal for a known false-positive shape.
#[derive(Debug, Clone)]
pub struct Penalty {
    pub label: String,
    pub regex: Regex,
    pub weight: f64,
    pub scope: PenaltyScope,
}

pub fn compile_penalties(field: &str, specs: &[PenaltySpec]) -> Result<Vec<Penalty>> {
    specs
        .iter()
        .map(|spec| {
            let regex = Regex::new(spec.pattern).with_context(|| {
                format!("invalid penalty pattern for {field} rule '{}'", spec.label)
            })?;
            Ok(Penalty {
                label: spec.label.to_string(),
                regex,
                weight: spec.weight,
                scope: spec.scope,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIERS: &[TierSpec] = &[
        TierSpec {
            name: "labelled",
            rules: &[RuleSpec::new("label", r"(?i)location:\s*(room\s+\d+)", 0.95).group(1)],
        },
        TierSpec {
            name: "bare",
            rules: &[RuleSpec::new("room", r"(?i)room\s+\d+", 0.7).display("Room")],
        },
    ];

    #[test]
    fn test_compile_tiers() {
        let tiers = compile_tiers("class_location", TIERS).unwrap();
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[0].rules[0].group, 1);
        assert_eq!(tiers[1].rules[0].display.as_deref(), Some("Room"));
    }

    #[test]
    fn test_invalid_pattern_names_rule() {
        let bad = RuleSpec::new("broken", r"(unclosed", 1.0);
        let err = PatternRule::compile("credit_hours", &bad).unwrap_err();
        assert!(err.to_string().contains("credit_hours rule 'broken'"));
    }

    #[test]
    fn test_group_out_of_range_is_rejected() {
        let bad = RuleSpec::new("nogroup", r"room \d+", 1.0).group(2);
        assert!(PatternRule::compile("office_location", &bad).is_err());
    }

    #[test]
    fn test_keyword_set() {
        let set = KeywordSet::compile("test", &[r"(?i)\boffice\s+hours?\b", r"(?i)\btutoring\b"])
            .unwrap();
        assert!(set.is_match("Office Hours: Mon 2-3"));
        assert!(!set.is_match("Class meets in Room 105"));
        assert!(!KeywordSet::empty().is_match("anything"));
        assert!(set.any_line(&["x".to_string(), "Tutoring Center".to_string()]));
    }
}
