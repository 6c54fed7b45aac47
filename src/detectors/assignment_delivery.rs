//! Where students hand in their work: a learning platform ("Canvas",
//! "MyOpenMath") or a physical hand-in ("collected in class").
//!
//! All platforms named on one line are reported together, sorted and joined
//! with `"; "`. A line that only says where grades or materials live is not
//! a submission statement.

use crate::engine::calibrate::Calibration;
use crate::engine::candidates::LineBounds;
use crate::engine::config::{Aggregation, CleanupSpec, FieldSpec, FieldTuning};
use crate::engine::rules::{RuleSpec, TierSpec};
use crate::engine::scoring::{LabelScope, PositionBucket};
use crate::models::FieldName;

const BASE: f64 = 50.0;

const TIERS: &[TierSpec] = &[TierSpec {
    name: "platform",
    // Longer names first so "Canvas (MyCourses)" is not also reported as
    // "Canvas" and "MyCourses".
    rules: &[
        RuleSpec::new("canvas_mycourses", r"(?i)\bcanvas\s*\(\s*mycourses\s*\)", BASE)
            .display("Canvas (MyCourses)"),
        RuleSpec::new("unh_mycourses", r"(?i)\bunh\s+mycourses\b", BASE).display("UNH MyCourses"),
        RuleSpec::new("mycourses", r"(?i)\bmycourses\b", BASE).display("MyCourses"),
        RuleSpec::new("canvas", r"(?i)\bcanvas\b", BASE).display("Canvas"),
        RuleSpec::new("myopenmath", r"(?i)\bmyopenmath\b", BASE).display("MyOpenMath"),
        RuleSpec::new(
            "mastering_ap",
            r"(?i)\bmastering\s*(?:a\s*&\s*p|anatomy\s*(?:and|&)\s*physiology)",
            BASE,
        )
        .display("Mastering A&P"),
        RuleSpec::new("mastering_physics", r"(?i)\bmastering\s*physics\b", BASE)
            .display("MasteringPhysics"),
        RuleSpec::new("blackboard", r"(?i)\bblackboard\b", BASE).display("Blackboard"),
        RuleSpec::new("google_classroom", r"(?i)\bgoogle\s+classroom\b", BASE)
            .display("Google Classroom"),
        RuleSpec::new("moodle", r"(?i)\bmoodle\b", BASE).display("Moodle"),
        RuleSpec::new("turnitin", r"(?i)\bturnitin\b", BASE).display("Turnitin"),
        RuleSpec::new(
            "written_collected_in_class",
            r"(?i)\bwritten\s+assignments?\s+collected\s+in\s+class\b",
            BASE,
        )
        .display("Written assignments collected in class"),
        RuleSpec::new("collected_in_class", r"(?i)\bcollected\s+in\s+class\b", BASE)
            .display("Collected in class"),
        RuleSpec::new("in_person", r"(?i)\bin\s*-?\s*person\s+submission\b", BASE)
            .display("In-person submission"),
        RuleSpec::new("handed_in", r"(?i)\bhanded?\s+in\b", BASE).display("Handed in"),
    ],
}];

/// Lines that introduce the submission section.
const SECTION_LABEL: &str = r"(?i)^\s*(?:assignment\s+(?:delivery|submission|platform)|submission\s+(?:method|platform|process)|how\s+to\s+submit|where\s+to\s+submit|(?:course|class)\s+(?:platform|management\s+system))\b";

/// Statements about submitting work somewhere.
const DELIVERY_CONTEXT: &[&str] = &[
    r"(?i)assignments?\s+(?:are\s+)?(?:submitted|uploaded|turned\s+in|posted|delivered)\s+(?:via|on|to|through|using|in)",
    r"(?i)submit\s+(?:all\s+)?(?:your\s+)?(?:assignments?|work|papers?|homework)\s+(?:via|on|to|through|using|in)",
    r"(?i)(?:upload|post|turn\s+in)\s+(?:your\s+)?(?:assignments?|work|homework)\s+(?:via|on|to|through|in)",
    r"(?i)all\s+(?:assignments?|work|homework)\s+(?:will\s+be\s+)?(?:submitted|posted|uploaded)\s+(?:via|on|to|in)",
    r"(?i)(?:assignments?|homework)\s+(?:should|must)\s+be\s+(?:submitted|uploaded|posted|turned\s+in)\s+(?:via|on|to|in)",
];

/// Platform mentions that are not about submission.
const WEAK_SIGNALS: &[&str] = &[
    r"(?i)\bgrades?\s+(?:are\s+)?(?:posted|available|viewable)\s+(?:on|in)",
    r"(?i)\bcourse\s+materials?\s+(?:are\s+)?(?:on|in|available\s+(?:on|in))",
    r"(?i)\bsyllabus\s+(?:is\s+)?(?:posted\s+)?(?:on|in)",
    r"(?i)\bresources?\s+(?:are\s+)?(?:on|in)",
];

const POSITION_BUCKETS: &[PositionBucket] = &[
    PositionBucket {
        max_ratio: 0.15,
        bonus: 25.0,
    },
    PositionBucket {
        max_ratio: 0.35,
        bonus: 18.0,
    },
    PositionBucket {
        max_ratio: 0.55,
        bonus: 10.0,
    },
    PositionBucket {
        max_ratio: 0.75,
        bonus: 5.0,
    },
];

pub const SPEC: FieldSpec = FieldSpec {
    field: FieldName::AssignmentDelivery,
    tiers: TIERS,
    bounds: LineBounds {
        min_chars: 5,
        max_chars: 500,
    },
    max_lines: None,
    max_chars: None,
    target: DELIVERY_CONTEXT,
    excluded: WEAK_SIGNALS,
    explicit_label: Some(SECTION_LABEL),
    label_scope: LabelScope::Line,
    penalties: &[],
    position_buckets: POSITION_BUCKETS,
    aggregation: Aggregation::PerLine { separator: "; " },
    cleanup: CleanupSpec::NONE,
    tuning: FieldTuning {
        explicit_label_bonus: 40.0,
        target_bonus: 35.0,
        multiplicity_bonus: 12.0,
        calibration: Calibration::new(162.0, 0.45, 1.0),
        ..FieldTuning::DEFAULT
    },
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DetectionResult, Document, FieldPipeline};

    fn detect(text: &str) -> DetectionResult {
        FieldPipeline::build(&SPEC, None)
            .unwrap()
            .run(&Document::new(text))
    }

    #[test]
    fn test_several_platforms_on_one_line() {
        let result =
            detect("MyOpenMath (embedded in Canvas); Written Assignments collected in class");
        assert_eq!(
            result.content.as_deref(),
            Some("Canvas; MyOpenMath; Written assignments collected in class")
        );
        // 50 base + 25 position + 12 multiplicity
        assert_eq!(result.confidence, 0.54);
    }

    #[test]
    fn test_combined_name_is_not_split() {
        let result = detect("Upload assignments to Canvas (myCourses)");
        assert_eq!(result.content.as_deref(), Some("Canvas (MyCourses)"));
    }

    #[test]
    fn test_submission_statement_beats_grades_line() {
        let result = detect(
            "Grades are posted on Blackboard.\nReadings are in the textbook.\nSubmit all work via MyCourses.",
        );
        assert_eq!(result.content.as_deref(), Some("MyCourses"));
        assert_eq!(result.evidence, vec!["line 3: Submit all work via MyCourses."]);
    }

    #[test]
    fn test_grades_only_line_is_not_delivery() {
        let result = detect("Grades are posted on Canvas.");
        assert!(!result.found);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_section_label_bonus() {
        let result = detect("Intro\nHow to submit: Moodle\nOther notes on Turnitin");
        assert_eq!(result.content.as_deref(), Some("Moodle"));
    }

    #[test]
    fn test_confidence_floor() {
        let filler = "Lorem ipsum dolor sit amet.\n".repeat(20);
        let result = detect(&format!("{filler}We also use Turnitin."));
        // 50 / 162 is below the floor
        assert_eq!(result.confidence, 0.45);
    }
}
