//! The generic field pipeline: generate → classify → score → select →
//! calibrate.

use std::borrow::Cow;
use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::debug;
use regex::Regex;

use super::calibrate::{Calibration, calibrate};
use super::candidates::{Cleanup, GeneratorConfig, generate};
use super::config::{Aggregation, FieldOverrides, FieldSpec};
use super::context::{ContextRules, classify};
use super::document::Document;
use super::rules::{KeywordSet, compile_penalties, compile_tiers};
use super::scoring::{ScoreInput, ScoringRules, score, select};
use super::types::{Candidate, ContextLabel, DetectionResult};
use crate::models::FieldName;
use crate::utils::text::truncate_words;

/// Maximum length of one evidence line.
const EVIDENCE_CHARS: usize = 200;

/// A compiled, immutable field configuration.
#[derive(Debug, Clone)]
pub struct FieldPipeline {
    pub field: FieldName,
    pub generator: GeneratorConfig,
    pub context: Option<ContextRules>,
    pub scoring: ScoringRules,
    pub calibration: Calibration,
    pub aggregation: Aggregation,
    pub max_chars: Option<usize>,
}

impl FieldPipeline {
    /// Compile `spec`, applying `overrides` to its numeric tuning.
    pub fn build(spec: &FieldSpec, overrides: Option<&FieldOverrides>) -> Result<Self> {
        let field = spec.field;
        let name = field.to_string();
        let tuning = match overrides {
            Some(overrides) => spec.tuning.with_overrides(overrides),
            None => spec.tuning,
        };
        tuning.validate(field)?;

        let tiers = compile_tiers(&name, spec.tiers)?;
        let rewrites = spec
            .cleanup
            .rewrites
            .iter()
            .map(|(pattern, replacement)| {
                Regex::new(pattern)
                    .with_context(|| format!("invalid cleanup pattern for {name}: {pattern}"))
                    .map(|re| (re, (*replacement).to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let generator = GeneratorConfig {
            tiers,
            bounds: spec.bounds,
            max_lines: spec.max_lines,
            cleanup: Cleanup {
                strip_trailing_punct: spec.cleanup.strip_trailing_punct,
                strip_parentheticals: spec.cleanup.strip_parentheticals,
                strip_weights: spec.cleanup.strip_weights,
                rewrites,
                max_chars: spec.cleanup.max_chars,
            },
        };

        let context = if spec.target.is_empty() && spec.excluded.is_empty() {
            None
        } else {
            Some(ContextRules::new(
                KeywordSet::compile(&name, spec.target)?,
                KeywordSet::compile(&name, spec.excluded)?,
                tuning.window_before,
                tuning.window_after,
            ))
        };

        let explicit_label = spec
            .explicit_label
            .map(|p| Regex::new(p).with_context(|| format!("invalid label pattern for {name}")))
            .transpose()?;

        let scoring = ScoringRules {
            header_lines: tuning.header_lines,
            header_bonus: tuning.header_bonus,
            explicit_label,
            label_scope: spec.label_scope,
            explicit_label_bonus: tuning.explicit_label_bonus,
            target_bonus: tuning.target_bonus,
            neutral_factor: tuning.neutral_factor,
            multiplicity_bonus: tuning.multiplicity_bonus,
            position_buckets: spec.position_buckets.to_vec(),
            penalties: compile_penalties(&name, spec.penalties)?,
            min_score: tuning.min_score,
        };

        Ok(Self {
            field,
            generator,
            context,
            scoring,
            calibration: tuning.calibration,
            aggregation: spec.aggregation,
            max_chars: spec.max_chars,
        })
    }

    /// Scored, non-excluded candidates above the minimum score.
    pub fn candidates(&self, doc: &Document) -> Vec<Candidate> {
        let doc = match self.max_chars {
            Some(max) => doc.truncated(max),
            None => Cow::Borrowed(doc),
        };

        let mut candidates = generate(&doc, &self.generator);
        for candidate in &mut candidates {
            candidate.context = match &self.context {
                Some(rules) => classify(&doc, candidate.line_index, rules),
                None => ContextLabel::Neutral,
            };
        }
        candidates.retain(|c| c.context != ContextLabel::Excluded);

        let grouped: Vec<(Candidate, usize)> = match self.aggregation {
            Aggregation::PerMatch => candidates.into_iter().map(|c| (c, 1)).collect(),
            Aggregation::PerLine { separator } => merge_per_line(candidates, separator),
        };

        let total_lines = doc.line_count();
        let mut scored = Vec::with_capacity(grouped.len());
        for (mut candidate, multiplicity) in grouped {
            let input = ScoreInput {
                line: doc.line(candidate.line_index).unwrap_or_default().trim(),
                total_lines,
                multiplicity,
            };
            candidate.components = score(&candidate, &input, &self.scoring);
            candidate.raw_score = candidate.components.total();
            debug!(
                "{}: '{}' line {} context {} score {:.3}",
                self.field,
                candidate.text,
                candidate.line_index + 1,
                candidate.context,
                candidate.raw_score
            );
            if candidate.raw_score >= self.scoring.min_score {
                scored.push(candidate);
            }
        }
        scored
    }

    /// Run the full pipeline and build the field result.
    pub fn run(&self, doc: &Document) -> DetectionResult {
        let candidates = self.candidates(doc);
        match select(&candidates) {
            Some(winner) => self.result_for(doc, winner),
            None => DetectionResult::not_found(),
        }
    }

    /// Build a found result for `winner`.
    pub fn result_for(&self, doc: &Document, winner: &Candidate) -> DetectionResult {
        let confidence = calibrate(winner.raw_score, &self.calibration);
        DetectionResult::found(
            winner.text.clone(),
            confidence,
            vec![evidence_line(doc, winner.line_index)],
        )
    }
}

/// `"line N: text"` for the given 0-based line.
pub fn evidence_line(doc: &Document, index: usize) -> String {
    let text = doc.line(index).unwrap_or_default().trim();
    format!("line {}: {}", index + 1, truncate_words(text, EVIDENCE_CHARS))
}

/// Merge candidates sharing a line into one candidate per line.
fn merge_per_line(candidates: Vec<Candidate>, separator: &str) -> Vec<(Candidate, usize)> {
    let mut by_line: BTreeMap<usize, Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        by_line.entry(candidate.line_index).or_default().push(candidate);
    }

    by_line
        .into_values()
        .filter_map(|group| {
            let mut values: Vec<String> = Vec::new();
            for c in &group {
                if !values.iter().any(|v| v.eq_ignore_ascii_case(&c.text)) {
                    values.push(c.text.clone());
                }
            }
            values.sort_by_key(|v| v.to_lowercase());
            let multiplicity = values.len();

            let mut merged = group
                .into_iter()
                .max_by(|a, b| {
                    a.components
                        .base
                        .total_cmp(&b.components.base)
                        .then_with(|| b.tier.cmp(&a.tier))
                        .then_with(|| b.start.cmp(&a.start))
                })?;
            merged.text = values.join(separator);
            Some((merged, multiplicity))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::candidates::LineBounds;
    use crate::engine::config::{CleanupSpec, FieldTuning};
    use crate::engine::rules::{RuleSpec, TierSpec};
    use crate::engine::scoring::LabelScope;

    const ROOM_TIERS: &[TierSpec] = &[
        TierSpec {
            name: "room_building",
            rules: &[RuleSpec::new(
                "room_building",
                r"(?i)\b(?:room|rm\.?)\s*\d{2,4}[A-Z]?\s*,?\s*[A-Z][a-z]+\s+Hall\b",
                0.95,
            )],
        },
        TierSpec {
            name: "room",
            rules: &[RuleSpec::new("room", r"(?i)\broom\s+\d{2,4}[A-Z]?\b", 0.70)],
        },
    ];

    const SPEC: FieldSpec = FieldSpec {
        field: FieldName::ClassLocation,
        tiers: ROOM_TIERS,
        bounds: LineBounds {
            min_chars: 2,
            max_chars: 500,
        },
        max_lines: Some(150),
        max_chars: None,
        target: &[r"(?i)\bclass\s+location\b", r"(?i)\bclass\s+meets\b"],
        excluded: &[r"(?i)\boffice\s+hours?\b", r"(?i)\boffice\b"],
        explicit_label: Some(r"(?i)\blocation\s*:"),
        label_scope: LabelScope::Immediate,
        penalties: &[],
        position_buckets: &[],
        aggregation: Aggregation::PerMatch,
        cleanup: CleanupSpec::NONE,
        tuning: FieldTuning {
            header_lines: 20,
            header_bonus: 0.15,
            explicit_label_bonus: 0.25,
            target_bonus: 0.05,
            neutral_factor: 0.7,
            window_before: 2,
            window_after: 15,
            calibration: Calibration::new(1.0, 0.0, 1.0),
            ..FieldTuning::DEFAULT
        },
    };

    fn pipeline() -> FieldPipeline {
        FieldPipeline::build(&SPEC, None).unwrap()
    }

    #[test]
    fn test_office_room_is_excluded() {
        let doc = Document::new("Office Hours: Room 201\nClass Location: Room 105");
        let result = pipeline().run(&doc);
        assert!(result.found);
        assert_eq!(result.content.as_deref(), Some("Room 105"));
        assert_eq!(result.evidence, vec!["line 2: Class Location: Room 105"]);
    }

    #[test]
    fn test_exclusion_dominates_weight() {
        let doc = Document::new("Office: Room 220, Kingsbury Hall");
        let result = pipeline().run(&doc);
        assert!(!result.found);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_explicit_label_beats_higher_tier_later() {
        let mut text = String::from("Syllabus\nLocation: Room 105\n");
        for _ in 0..47 {
            text.push_str("filler text\n");
        }
        text.push_str("Lab sessions use Room 330, Parsons Hall\n");
        let doc = Document::new(&text);
        let result = pipeline().run(&doc);
        assert_eq!(result.content.as_deref(), Some("Room 105"));
    }

    #[test]
    fn test_deterministic() {
        let doc = Document::new("Class meets in Room 105\nRoom 110\nRoom 120");
        let p = pipeline();
        assert_eq!(p.run(&doc), p.run(&doc));
    }

    #[test]
    fn test_overrides_change_calibration() {
        let overrides = FieldOverrides {
            floor: Some(0.99),
            ..FieldOverrides::default()
        };
        let p = FieldPipeline::build(&SPEC, Some(&overrides)).unwrap();
        let doc = Document::new("Room 105");
        assert_eq!(p.run(&doc).confidence, 0.99);
    }

    #[test]
    fn test_invalid_override_fails_build() {
        let overrides = FieldOverrides {
            explicit_label_bonus: Some(0.01),
            ..FieldOverrides::default()
        };
        assert!(FieldPipeline::build(&SPEC, Some(&overrides)).is_err());
    }

    #[test]
    fn test_character_cap_limits_scan() {
        let text = "Course overview and welcome\nClass Location: Room 105";
        let capped = FieldSpec {
            max_chars: Some(27),
            ..SPEC
        };
        let doc = Document::new(text);
        assert!(!FieldPipeline::build(&capped, None).unwrap().run(&doc).found);
        assert_eq!(pipeline().run(&doc).content.as_deref(), Some("Room 105"));
    }

    #[test]
    fn test_merge_per_line() {
        let a = Candidate::new("MyOpenMath".to_string(), 2, 0, "a", 50.0).with_span(0, 5);
        let b = Candidate::new("Canvas".to_string(), 2, 0, "b", 50.0).with_span(10, 16);
        let c = Candidate::new("canvas".to_string(), 2, 0, "b", 50.0).with_span(20, 26);
        let d = Candidate::new("Canvas".to_string(), 4, 0, "b", 50.0);
        let merged = merge_per_line(vec![a, b, c, d], "; ");
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].0.text, "Canvas; MyOpenMath");
        assert_eq!(merged[0].1, 2);
        assert_eq!(merged[1].1, 1);
    }
}
