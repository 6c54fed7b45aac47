//! Course modality detection.
//!
//! Modality is categorical (Online, Hybrid, In-Person), so instead of the
//! generic candidate pipeline it runs an ordered list of phase functions:
//!
//! 1. [`phases::definitive_statement`]: unambiguous delivery statements
//! 2. [`phases::class_section`]: rules scoped to the class-location section
//! 3. [`phases::header_heuristics`]: direct signals near the document start
//! 4. [`soft_scoring::soft_scoring`]: weighted soft signals with hybrid
//!    synthesis
//!
//! The first phase that returns a [`Verdict`] ends detection. A document
//! with too little evidence is reported as `"Unknown"` with zero
//! confidence.

pub mod phases;
pub mod sections;
pub mod signals;
pub mod soft_scoring;

use anyhow::{Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::detectors::FieldDetector;
use crate::engine::{DetectionResult, Document};
use crate::models::FieldName;
use sections::ModalityText;

/// The reported label for an undetermined modality.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum Modality {
    Online,
    Hybrid,
    #[serde(rename = "In-Person")]
    #[strum(serialize = "In-Person")]
    InPerson,
}

/// Numeric knobs of the soft-scoring phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModalityTuning {
    /// Factor applied to `online + in_person` to synthesize a hybrid total.
    pub hybrid_blend: f64,
    /// Both online and in-person totals must exceed this for hybrid
    /// synthesis.
    pub signal_threshold: f64,
    /// Removed from in-person when rooms appear only in office hours.
    pub office_room_penalty: f64,
    /// Added to online in that case, when online exceeds
    /// `online_boost_threshold`.
    pub online_boost: f64,
    pub online_boost_threshold: f64,
    /// A winning total below this is undetermined.
    pub absolute_floor: f64,
    /// Minimum reported confidence for a scored decision.
    pub confidence_floor: f64,
    /// Maximum number of evidence snippets reported after the phase name.
    pub evidence_limit: usize,
}

impl Default for ModalityTuning {
    fn default() -> Self {
        Self {
            hybrid_blend: 0.55,
            signal_threshold: 1.3,
            office_room_penalty: 4.0,
            online_boost: 2.0,
            online_boost_threshold: 1.0,
            absolute_floor: 2.0,
            confidence_floor: 0.60,
            evidence_limit: 3,
        }
    }
}

impl ModalityTuning {
    pub fn validate(&self) -> Result<()> {
        if self.hybrid_blend <= 0.0 || self.hybrid_blend.is_nan() {
            bail!("modality: hybrid_blend must be positive, got {}", self.hybrid_blend);
        }
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            bail!(
                "modality: confidence_floor must be in [0, 1], got {}",
                self.confidence_floor
            );
        }
        if self.office_room_penalty < 0.0 || self.online_boost < 0.0 {
            bail!("modality: office_room_penalty and online_boost must not be negative");
        }
        if self.absolute_floor <= 0.0 {
            bail!(
                "modality: absolute_floor must be positive, got {}",
                self.absolute_floor
            );
        }
        Ok(())
    }
}

/// Outcome of a phase that reached a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Decided {
        modality: Modality,
        confidence: f64,
        evidence: Vec<String>,
    },
    Unknown {
        reason: String,
    },
}

impl Verdict {
    pub fn decided(modality: Modality, confidence: f64, reason: &str) -> Self {
        Verdict::Decided {
            modality,
            confidence,
            evidence: vec![reason.to_string()],
        }
    }

    pub fn unknown(reason: &str) -> Self {
        Verdict::Unknown {
            reason: reason.to_string(),
        }
    }

    fn into_result(self, phase: &str, evidence_limit: usize) -> DetectionResult {
        match self {
            Verdict::Decided {
                modality,
                confidence,
                evidence,
            } => {
                let mut reported = vec![format!("phase: {phase}")];
                reported.extend(evidence.into_iter().take(evidence_limit));
                DetectionResult::found(modality.to_string(), confidence, reported)
            }
            Verdict::Unknown { reason } => {
                DetectionResult::undetermined(UNKNOWN, vec![format!("phase: {phase}"), reason])
            }
        }
    }
}

/// A phase: inspect the document, decide or pass.
pub type Phase = fn(&ModalityText, &ModalityTuning) -> Option<Verdict>;

/// The phased decision controller.
#[derive(Debug, Clone)]
pub struct ModalityController {
    tuning: ModalityTuning,
    phases: Vec<(&'static str, Phase)>,
}

impl ModalityController {
    pub fn new(tuning: ModalityTuning) -> Result<Self> {
        tuning.validate()?;
        Ok(Self {
            tuning,
            phases: vec![
                ("definitive_statement", phases::definitive_statement as Phase),
                ("class_section", phases::class_section as Phase),
                ("header_heuristics", phases::header_heuristics as Phase),
                ("soft_scoring", soft_scoring::soft_scoring as Phase),
            ],
        })
    }

    pub fn tuning(&self) -> &ModalityTuning {
        &self.tuning
    }

    /// Names of the phases in evaluation order.
    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|(name, _)| *name).collect()
    }

    /// Run the phases in order and stop at the first verdict.
    pub fn decide(&self, doc: &Document) -> DetectionResult {
        if doc.is_empty() {
            return DetectionResult::undetermined(UNKNOWN, Vec::new());
        }
        let text = ModalityText::new(doc);
        for (name, phase) in &self.phases {
            if let Some(verdict) = phase(&text, &self.tuning) {
                debug!("modality decided by phase {name}: {verdict:?}");
                return verdict.into_result(name, self.tuning.evidence_limit);
            }
        }
        DetectionResult::undetermined(UNKNOWN, vec!["no clear modality indicators".to_string()])
    }
}

impl FieldDetector for ModalityController {
    fn field(&self) -> FieldName {
        FieldName::Modality
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        Ok(self.decide(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ModalityController {
        ModalityController::new(ModalityTuning::default()).unwrap()
    }

    #[test]
    fn test_fully_online_short_circuits() {
        let doc = Document::new(
            "COMP 405\nClass Location: Room 105, Pandora Mill\nThis course is fully online.",
        );
        let result = controller().decide(&doc);
        assert!(result.found);
        assert_eq!(result.content.as_deref(), Some("Online"));
        assert!(result.confidence >= 0.95);
        assert_eq!(result.evidence[0], "phase: definitive_statement");
    }

    #[test]
    fn test_no_keywords_is_unknown() {
        let doc = Document::new("Course Readings\nChapters are assigned weekly.\nExams cover the chapters.");
        let result = controller().decide(&doc);
        assert!(!result.found);
        assert_eq!(result.content.as_deref(), Some(UNKNOWN));
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_empty_document_is_unknown() {
        let result = controller().decide(&Document::new(""));
        assert_eq!(result.content.as_deref(), Some(UNKNOWN));
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_class_room_is_in_person() {
        let doc = Document::new("Class Location: Room 105, Pandora Mill\nMondays 9:10 am");
        let result = controller().decide(&doc);
        assert_eq!(result.content.as_deref(), Some("In-Person"));
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_phase_order() {
        assert_eq!(
            controller().phase_names(),
            vec!["definitive_statement", "class_section", "header_heuristics", "soft_scoring"]
        );
    }

    #[test]
    fn test_invalid_tuning_is_rejected() {
        let tuning = ModalityTuning {
            hybrid_blend: 0.0,
            ..ModalityTuning::default()
        };
        assert!(ModalityController::new(tuning).is_err());
    }

    #[test]
    fn test_deterministic() {
        let doc = Document::new("This online course includes in-person lab sessions.");
        assert_eq!(controller().decide(&doc), controller().decide(&doc));
    }
}
