//! Title of the section describing the kinds of assignments ("Homework
//! Assignments", "Course Activities", "Assignments & Grading").
//!
//! Five tiers from the most specific complete titles down to single-word
//! headers followed by content. Grading-policy headers belong to the
//! grading fields and weekly schedule entries are not section titles, so
//! both are excluded.

use crate::engine::calibrate::Calibration;
use crate::engine::candidates::LineBounds;
use crate::engine::config::{Aggregation, CleanupSpec, FieldSpec, FieldTuning};
use crate::engine::rules::{PenaltyScope, PenaltySpec, RuleSpec, TierSpec};
use crate::engine::scoring::LabelScope;
use crate::models::FieldName;

const TIERS: &[TierSpec] = &[
    TierSpec {
        name: "exact",
        rules: &[
            RuleSpec::new("assignments_grades", r"(?i)^\s*assignments?\s*&\s*grades?\s*:?\s*$", 150.0),
            RuleSpec::new("assignments_grading", r"(?i)^\s*assignments?\s*&\s*grading\s*:?\s*$", 150.0),
            RuleSpec::new(
                "chapter_quizzes_discussions",
                r"(?i)^\s*textbook\s+chapter\s+quizzes\s*,?\s*discussions.*$",
                140.0,
            ),
            RuleSpec::new(
                "methods_of_testing",
                r"(?i)^\s*methods\s+of\s+testing\s+/\s+evaluation\s*:?\s*$",
                135.0,
            ),
            RuleSpec::new(
                "requirements_overview",
                r"(?i)^\s*course\s+requirements?\s+and\s+assessments?\s+overview\s*:?\s*$",
                135.0,
            ),
            RuleSpec::new(
                "paperwork_submissions",
                r"(?i)^\s*required\s+paperwork\s+and\s+submissions?\s*\.?\s*$",
                130.0,
            ),
            RuleSpec::new(
                "assignments_policies",
                r"(?i)^\s*assignments?\s+and\s+course\s+specific\s+policies\s*:?\s*$",
                130.0,
            ),
            RuleSpec::new(
                "grading_details_lab",
                r"(?i)^\s*assignment\s+and\s+grading\s+details?\s+lab\s*:?\s*$",
                125.0,
            ),
            RuleSpec::new(
                "student_evaluation_summary",
                r"(?i)^\s*summary\s+of\s+student\s+evaluation\s*:?\s*$",
                120.0,
            ),
            RuleSpec::new("grade_components", r"(?i)^\s*methods\s*,\s*grade\s+components.*$", 115.0),
        ],
    },
    TierSpec {
        name: "multiword_standalone",
        rules: &[
            RuleSpec::new(
                "homework_and_projects",
                r"(?i)^\s*homework\s+assignments?\s+and\s+projects?\s*(?:\([^)]+\))?\s*:?\s*$",
                112.0,
            ),
            RuleSpec::new("reading", r"(?i)^\s*reading\s+assignments?\s*(?:\([^)]+\))?\s*:?\s*$", 110.0),
            RuleSpec::new(
                "laboratory",
                r"(?i)^\s*laboratory\s+assignments?\s*(?:\([^)]+\))?\s*:?\s*$",
                110.0,
            ),
            RuleSpec::new("lab", r"(?i)^\s*lab\s+assignments?\s*(?:\([^)]+\))?\s*:?\s*$", 110.0),
            RuleSpec::new(
                "homework_problems",
                r"(?i)^\s*homework\s+problems\s*(?:\([^)]+\))?\s*:?\s*$",
                110.0,
            ),
            RuleSpec::new(
                "homework_assignments",
                r"(?i)^\s*homework\s+assignments?\s*(?:\([^)]+\))?\s*:?\s*$",
                110.0,
            ),
            RuleSpec::new(
                "course_assignments",
                r"(?i)^\s*course\s+assignments?\s*(?:\([^)]+\))?\s*:?\s*$",
                108.0,
            ),
            RuleSpec::new(
                "class_assignments",
                r"(?i)^\s*class\s+assignments?\s*(?:\([^)]+\))?\s*:?\s*$",
                108.0,
            ),
            RuleSpec::new("assessment_overview", r"(?i)^\s*assessment\s+overview\s*:?\s*$", 106.0),
            RuleSpec::new("major_projects", r"(?i)^\s*major\s+projects?\s*:?\s*$", 105.0),
            RuleSpec::new("course_activities", r"(?i)^\s*course\s+activities\s*:?\s*$", 105.0),
            RuleSpec::new("assignment_details", r"(?i)^\s*assignment\s+details?\s*:?\s*$", 102.0),
            RuleSpec::new("quizzes_and_exams", r"(?i)^\s*quizzes\s+and\s+exams?\s*:?\s*$", 100.0),
            RuleSpec::new("assignments_and_grading", r"(?i)^\s*assignments?\s+and\s+grading\s*:?\s*$", 98.0),
            RuleSpec::new("student_evaluation", r"(?i)^\s*student\s+evaluation\s*:?\s*$", 90.0),
            RuleSpec::new(
                "participation_assignments",
                r"(?i)^\s*assessment\s*,\s*participation\s+assignments?\s*:?\s*$",
                88.0,
            ),
        ],
    },
    TierSpec {
        name: "multiword_with_content",
        rules: &[
            RuleSpec::new(
                "methods_of_testing",
                r"(?i)^\s*(methods\s+of\s+testing\s*/\s*evaluation\s*:)",
                130.0,
            )
            .group(1),
            RuleSpec::new(
                "homework_and_projects",
                r"(?i)^\s*(homework\s+assignments?\s+and\s+projects?\s*(?:\([^)]+\))?\s*:)",
                87.0,
            )
            .group(1),
            RuleSpec::new("reading", r"(?i)^\s*(reading\s+assignments?\s*(?:\([^)]+\))?\s*:)", 85.0)
                .group(1),
            RuleSpec::new(
                "laboratory",
                r"(?i)^\s*(laboratory\s+assignments?\s*(?:\([^)]+\))?\s*:)",
                85.0,
            )
            .group(1),
            RuleSpec::new("lab", r"(?i)^\s*(lab\s+assignments?\s*(?:\([^)]+\))?\s*:)", 85.0).group(1),
            RuleSpec::new(
                "homework_problems",
                r"(?i)^\s*(homework\s+problems\s*(?:\([^)]+\))?\s*:)",
                85.0,
            )
            .group(1),
            RuleSpec::new(
                "homework_assignments",
                r"(?i)^\s*(homework\s+assignments?\s*(?:\([^)]+\))?\s*:)",
                85.0,
            )
            .group(1),
            RuleSpec::new("course_assignments", r"(?i)^\s*(course\s+assignments?\s*:)", 83.0).group(1),
            RuleSpec::new("class_assignments", r"(?i)^\s*(class\s+assignments?\s*:)", 83.0).group(1),
            RuleSpec::new("assessment_overview", r"(?i)^\s*(assessment\s+overview\s*:)", 81.0).group(1),
            RuleSpec::new("major_projects", r"(?i)^\s*(major\s+projects?\s*:)", 80.0).group(1),
            RuleSpec::new("course_activities", r"(?i)^\s*(course\s+activities\s*:)", 80.0).group(1),
            RuleSpec::new("assignment_details", r"(?i)^\s*(assignment\s+details?\s*:)", 77.0).group(1),
            RuleSpec::new("quizzes_and_exams", r"(?i)^\s*(quizzes\s+and\s+exams?\s*:)", 75.0).group(1),
            RuleSpec::new(
                "assignments_and_grading",
                r"(?i)^\s*(assignments?\s+and\s+grading\s*:)",
                73.0,
            )
            .group(1),
        ],
    },
    TierSpec {
        name: "single_word_standalone",
        rules: &[
            RuleSpec::new("assessment", r"(?i)^\s*assessment\s*:?\s*$", 70.0),
            RuleSpec::new("homework", r"(?i)^\s*homework\s*(?:\([^)]+\))?\s*:?\s*$", 65.0),
            RuleSpec::new("assignments", r"(?i)^\s*assignments?\s*:?\s*$", 60.0),
            RuleSpec::new("evaluation", r"(?i)^\s*evaluation\s*:?\s*$", 50.0),
        ],
    },
    TierSpec {
        name: "single_word_with_content",
        rules: &[
            RuleSpec::new("assessment", r"(?i)^\s*(assessment\s*:)", 55.0).group(1),
            RuleSpec::new("homework", r"(?i)^\s*(homework\s*(?:\([^)]+\))?\s*:)", 50.0).group(1),
            RuleSpec::new("assignments", r"(?i)^\s*(assignments?\s*:)", 45.0).group(1),
        ],
    },
];

/// Grading-policy headers.
const GRADING_HEADERS: &[&str] = &[
    r"(?i)evaluation\s+of\s+student\s+work",
    r"(?i)grading\s+(?:policy|procedure|distribution|scale)",
    r"(?i)grade\s+distribution",
    r"(?i)final\s+grade\s+(?:calculation|scale)",
    r"(?i)course\s+grading",
    r"(?i)rubric\s+and\s+evaluation",
    r"(?i)grading.*evaluation|evaluation.*grading",
    // Weekly schedule entries.
    r"(?i)week\s*#?\s*\d+",
    r"(?i)homework\s*:\s*(?:reading|complete|work\s+on|finish|continue|start)",
    r"(?i)due\s+(?:by\s+)?next\s+week",
    r"(?i)lecture\s*-\s*review",
];

/// A header followed by schedule-like content is a schedule entry.
const PENALTIES: &[PenaltySpec] = &[PenaltySpec::new(
    "schedule_content",
    r"(?i):.*\b(?:complete|work\s+on|due)\b",
    -1000.0,
    PenaltyScope::Line,
)];

pub const SPEC: FieldSpec = FieldSpec {
    field: FieldName::AssignmentTypes,
    tiers: TIERS,
    bounds: LineBounds {
        min_chars: 2,
        max_chars: 250,
    },
    max_lines: None,
    max_chars: None,
    target: &[],
    excluded: GRADING_HEADERS,
    explicit_label: None,
    label_scope: LabelScope::Immediate,
    penalties: PENALTIES,
    position_buckets: &[],
    aggregation: Aggregation::PerMatch,
    cleanup: CleanupSpec {
        strip_parentheticals: true,
        rewrites: &[(r"\s+:$", ":")],
        ..CleanupSpec::NONE
    },
    tuning: FieldTuning {
        window_before: 5,
        window_after: 5,
        calibration: Calibration::new(150.0, 0.3, 0.95),
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
    fn test_header_with_content_drops_weight() {
        let result = detect("Homework Assignments (10%): Weekly problem sets from the text");
        assert_eq!(result.content.as_deref(), Some("Homework Assignments:"));
        assert_eq!(result.confidence, 0.57);
    }

    #[test]
    fn test_more_specific_tier_wins() {
        let result = detect("Assignments:\nSee below.\n\nCourse Activities\nDiscussions and labs.");
        assert_eq!(result.content.as_deref(), Some("Course Activities"));
        assert_eq!(result.evidence, vec!["line 4: Course Activities"]);
    }

    #[test]
    fn test_exact_title() {
        let result = detect("Assignments & Grading:");
        assert_eq!(result.content.as_deref(), Some("Assignments & Grading:"));
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_grading_policy_header_excluded() {
        assert!(!detect("Grading Policy and Assignments:").found);
    }

    #[test]
    fn test_schedule_content_rejected() {
        assert!(!detect("Homework: complete problems 1-10 from chapter 2").found);
    }
}
