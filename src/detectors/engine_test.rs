use anyhow::{Result, bail};

use super::*;

struct Failing;

impl FieldDetector for Failing {
    fn field(&self) -> FieldName {
        FieldName::Workload
    }

    fn detect(&self, _doc: &Document) -> Result<DetectionResult> {
        bail!("pattern budget exceeded")
    }
}

struct Panicking;

impl FieldDetector for Panicking {
    fn field(&self) -> FieldName {
        FieldName::CreditHours
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        let lines = doc.lines();
        Ok(DetectionResult::found(lines[lines.len() + 3].clone(), 1.0, Vec::new()))
    }
}

const SYLLABUS: &str = "\
COMP 405: Computer Networks (4 credits)
Instructor: Dr. Jane Smith, Associate Professor, Department of Computer Science
Email: jane.smith@unh.edu

Class Location: Room 105, Pandora Building
This course meets in person on Tuesdays and Thursdays.
";

fn email_detector() -> Box<dyn FieldDetector> {
    Box::new(contact::EmailDetector::new(None).unwrap())
}

#[test]
fn test_failures_are_contained_per_field() {
    let engine = SyllabusEngine::from_detectors(vec![
        Box::new(Failing),
        email_detector(),
        Box::new(Panicking),
    ]);

    let detections = engine.detect(SYLLABUS);

    assert_eq!(detections.fields.len(), 3);
    let workload = detections.get(FieldName::Workload).unwrap();
    assert_eq!(workload, &DetectionResult::not_found());
    let credits = detections.get(FieldName::CreditHours).unwrap();
    assert!(!credits.found);
    assert_eq!(credits.confidence, 0.0);

    let email = detections.get(FieldName::Email).unwrap();
    assert!(email.found);
    assert_eq!(email.content.as_deref(), Some("jane.smith@unh.edu"));

    assert_eq!(detections.errors.len(), 2);
    assert_eq!(detections.errors[0], "workload: pattern budget exceeded");
    assert!(detections.errors[1].starts_with("credit_hours: detector panicked: "));
    assert_eq!(detections.found_count(), 1);
}

#[test]
fn test_with_fields_builds_only_selected() {
    let engine = SyllabusEngine::with_fields(
        &EngineConfig::default(),
        &[FieldName::CreditHours, FieldName::Email],
    )
    .unwrap();
    // Declaration order, not argument order.
    assert_eq!(engine.fields(), vec![FieldName::Email, FieldName::CreditHours]);

    let detections = engine.detect(SYLLABUS);
    assert_eq!(detections.fields.len(), 2);
    assert_eq!(
        detections.get(FieldName::CreditHours).unwrap().content.as_deref(),
        Some("4 credits")
    );
    assert!(detections.get(FieldName::Modality).is_none());
}

#[test]
fn test_every_field_is_reported() {
    let engine = SyllabusEngine::new(&EngineConfig::default()).unwrap();
    let detections = engine.detect(SYLLABUS);

    assert_eq!(detections.fields.len(), FieldName::iter().count());
    assert!(detections.errors.is_empty());
    for (field, result) in &detections.fields {
        assert!(
            (0.0..=1.0).contains(&result.confidence),
            "{field} confidence out of range"
        );
        if !result.found {
            assert_eq!(result.confidence, 0.0, "{field} not found but confident");
        }
    }
}

#[test]
fn test_empty_document() {
    let engine = SyllabusEngine::new(&EngineConfig::default()).unwrap();
    let detections = engine.detect("");
    assert!(detections.errors.is_empty());
    assert_eq!(detections.found_count(), 0);
}

#[test]
fn test_invalid_calibration_fails_construction() {
    let mut config = EngineConfig::default();
    config.fields.insert(
        FieldName::Email,
        FieldOverrides {
            floor: Some(0.9),
            ceiling: Some(0.2),
            ..FieldOverrides::default()
        },
    );
    let err = SyllabusEngine::new(&config).unwrap_err();
    assert!(format!("{err:#}").contains("email"));
}
