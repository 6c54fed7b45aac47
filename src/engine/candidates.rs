//! Candidate generation over lines.
//!
//! For every line the tiers are tried in priority order and the first
//! tier that produces any match wins that line; lower tiers are not tried.
//! Inside a tier every matching rule contributes, except that a match
//! overlapping one already taken from an earlier rule of the same tier is
//! dropped. Lines outside the configured length bounds are skipped before
//! any pattern runs.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::document::Document;
use super::rules::Tier;
use super::types::Candidate;

/// Parenthetical asides such as `(10%)` or `(embedded in Canvas)`.
static PARENTHETICAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());

/// Weight annotations such as `- 20%`, `20 %` or `15 points`.
static WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[-:]?\s*\d+(?:\.\d+)?\s*(?:%|percent\b|points?\b|pts\b)").unwrap()
});

/// Inclusive character-length bounds for a scanned line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineBounds {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for LineBounds {
    fn default() -> Self {
        Self {
            min_chars: 2,
            max_chars: 500,
        }
    }
}

/// Post-processing applied to matched text.
#[derive(Debug, Clone, Default)]
pub struct Cleanup {
    pub strip_trailing_punct: bool,
    pub strip_parentheticals: bool,
    pub strip_weights: bool,
    /// Ordered regex rewrites applied last.
    pub rewrites: Vec<(Regex, String)>,
    pub max_chars: Option<usize>,
}

impl Cleanup {
    pub fn apply(&self, text: &str) -> String {
        let mut s = text.trim().to_string();
        if self.strip_parentheticals {
            s = PARENTHETICAL_RE.replace_all(&s, "").into_owned();
        }
        if self.strip_weights {
            s = WEIGHT_RE.replace_all(&s, "").into_owned();
        }
        for (re, replacement) in &self.rewrites {
            s = re.replace_all(&s, replacement.as_str()).into_owned();
        }
        s = s.split_whitespace().collect::<Vec<_>>().join(" ");
        if self.strip_trailing_punct {
            s = s
                .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '-' | '!' | '?'))
                .trim_end()
                .to_string();
        }
        if let Some(max) = self.max_chars {
            s = crate::utils::text::truncate_words(&s, max);
        }
        s
    }
}

/// Everything the generator needs for one field.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub tiers: Vec<Tier>,
    pub bounds: LineBounds,
    /// Only the first `max_lines` lines are scanned.
    pub max_lines: Option<usize>,
    pub cleanup: Cleanup,
}

impl GeneratorConfig {
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self {
            tiers,
            bounds: LineBounds::default(),
            max_lines: None,
            cleanup: Cleanup::default(),
        }
    }
}

/// Generate candidates for every line of `doc`.
pub fn generate(doc: &Document, config: &GeneratorConfig) -> Vec<Candidate> {
    let limit = config
        .max_lines
        .map_or(doc.line_count(), |max| max.min(doc.line_count()));

    let mut candidates = Vec::new();
    for index in 0..limit {
        let line = doc.lines()[index].trim();

        let length = line.chars().count();
        if length < config.bounds.min_chars || length > config.bounds.max_chars {
            continue;
        }

        candidates.extend(match_line(line, index, config));
    }
    candidates
}

/// Apply tiers to one line with first-applicable-tier semantics.
fn match_line(line: &str, line_index: usize, config: &GeneratorConfig) -> Vec<Candidate> {
    for (tier_index, tier) in config.tiers.iter().enumerate() {
        let mut taken: Vec<(usize, usize)> = Vec::new();
        let mut found = Vec::new();

        for rule in &tier.rules {
            for caps in rule.regex.captures_iter(line) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                if taken
                    .iter()
                    .any(|&(s, e)| whole.start() < e && s < whole.end())
                {
                    continue;
                }
                let value = match &rule.display {
                    Some(display) => display.clone(),
                    None => match caps.get(rule.group) {
                        Some(m) => config.cleanup.apply(m.as_str()),
                        None => continue,
                    },
                };
                if value.is_empty() {
                    continue;
                }
                taken.push((whole.start(), whole.end()));
                debug!(
                    "candidate '{}' from rule '{}' (tier {}) on line {}",
                    value,
                    rule.label,
                    tier.name,
                    line_index + 1
                );
                found.push(
                    Candidate::new(value, line_index, tier_index, &rule.label, rule.weight)
                        .with_span(whole.start(), whole.end()),
                );
            }
        }

        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}
