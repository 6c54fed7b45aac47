//! Student learning outcomes section.
//!
//! Only learning-outcome titles count; "Course Objectives" and "Course
//! Goals" sections are a different thing and are not reported.

use anyhow::Result;

use super::section_title::SectionTitles;
use super::{FieldDetector, calibration_for};
use crate::engine::calibrate::Calibration;
use crate::engine::{DetectionResult, Document, FieldOverrides, calibrate, evidence_line};
use crate::models::FieldName;

const TITLES: SectionTitles = SectionTitles {
    titles: &[
        "student learning outcomes",
        "student learning outcome",
        "student learning objectives",
        "student learning objective",
        "student/program learning outcomes",
        "learning outcomes",
        "learning outcome",
        "learning objectives",
        "learning objective",
        "slos",
        "slo",
    ],
    stop_headers: &[
        "course description",
        "course objectives",
        "course goals",
        "prerequisites",
        "textbook",
        "grading",
        "schedule",
    ],
    threshold: 5,
    exact_line_score: None,
    leading_title_bonus: 0,
    isolated_titles: false,
    max_document_chars: 20_000,
    max_content_lines: 10,
    max_content_chars: 500,
};

#[derive(Debug, Clone)]
pub struct SloDetector {
    calibration: Calibration,
}

impl SloDetector {
    pub fn new(overrides: Option<&FieldOverrides>) -> Result<Self> {
        Ok(Self {
            calibration: calibration_for(
                FieldName::Slos,
                Calibration::new(20.0, 0.5, 0.95),
                overrides,
            )?,
        })
    }
}

impl FieldDetector for SloDetector {
    fn field(&self) -> FieldName {
        FieldName::Slos
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let Some(section) = TITLES.find(doc) else {
            return Ok(DetectionResult::not_found());
        };
        Ok(DetectionResult::found(
            section.content,
            calibrate(f64::from(section.score), &self.calibration),
            vec![
                evidence_line(doc, section.line_index),
                format!("header score: {}", section.score),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> DetectionResult {
        SloDetector::new(None)
            .unwrap()
            .detect(&Document::new(text))
            .unwrap()
    }

    #[test]
    fn test_outcomes_section() {
        let result = detect(
            "Course Description\nIntro to networks.\n\nStudent Learning Outcomes:\n- Understand key concepts\n- Apply knowledge\n\nGrading\nA 93-100",
        );
        assert!(result.found);
        assert_eq!(
            result.content.as_deref(),
            Some("Student Learning Outcomes:\n- Understand key concepts\n- Apply knowledge")
        );
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_course_objectives_not_accepted() {
        let result = detect("Course Objectives:\n- Learn things\n- Do things");
        assert!(!result.found);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_mention_in_sentence_not_accepted() {
        let result = detect(
            "Assignments are designed so that you can demonstrate each of the learning outcomes listed in the catalog.",
        );
        assert!(!result.found);
    }

    #[test]
    fn test_caps_header_beats_inline_mention() {
        let result = detect("Course learning outcomes are assessed below:\n\nLEARNING OUTCOMES\n1. Design circuits");
        assert_eq!(result.evidence[0], "line 3: LEARNING OUTCOMES");
    }
}
