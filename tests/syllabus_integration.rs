use glob::Pattern;
use indicatif::ProgressBar;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use syllabus_check::{EngineConfig, FieldName, SyllabusEngine, process, process_document};

const SYLLABI: &str = "testdata/syllabi";

fn engine() -> SyllabusEngine {
    SyllabusEngine::new(&EngineConfig::default()).expect("engine should build")
}

fn content(report: &syllabus_check::DocumentReport, field: FieldName) -> Option<String> {
    report.get(field).and_then(|r| r.content.clone())
}

#[test]
fn test_online_syllabus() {
    let report = process_document(Path::new("testdata/syllabi/online_networks.txt"), &engine());

    assert!(report.scan_errors.is_empty(), "{:?}", report.scan_errors);
    assert_eq!(report.fields.len(), 17);

    assert_eq!(content(&report, FieldName::Modality).as_deref(), Some("Online"));
    assert_eq!(report.get(FieldName::Modality).unwrap().confidence, 0.95);
    assert_eq!(content(&report, FieldName::CreditHours).as_deref(), Some("4 credits"));
    assert_eq!(
        content(&report, FieldName::Email).as_deref(),
        Some("rachel.jones@unh.edu")
    );
    assert_eq!(
        content(&report, FieldName::Workload).as_deref(),
        Some("minimum 3 hours of engaged time per week per credit over a 15-week semester")
    );
    assert_eq!(content(&report, FieldName::ClassLocation).as_deref(), Some("Online"));
    assert_eq!(content(&report, FieldName::AssignmentDelivery).as_deref(), Some("Canvas"));
    assert_eq!(
        report.get(FieldName::AssignmentDelivery).unwrap().evidence[0],
        "line 17: All assignments will be submitted via Canvas."
    );
    assert_eq!(
        content(&report, FieldName::LatePolicy).as_deref(),
        Some("Late Work Policy\nAssignments lose 10% per day late.\nNothing is accepted after five days.")
    );

    let slos = content(&report, FieldName::Slos).unwrap();
    assert!(slos.starts_with("Student Learning Outcomes:\n- Explain"), "{slos}");

    let scale = content(&report, FieldName::GradingScale).unwrap();
    assert!(scale.starts_with("A 93-100"), "{scale}");
}

#[test]
fn test_in_person_syllabus() {
    let report = process_document(Path::new("testdata/syllabi/in_person_biology.txt"), &engine());

    assert!(report.scan_errors.is_empty(), "{:?}", report.scan_errors);
    assert_eq!(content(&report, FieldName::Modality).as_deref(), Some("In-Person"));
    assert_eq!(content(&report, FieldName::CreditHours).as_deref(), Some("Credit Hours: 3"));
    assert_eq!(content(&report, FieldName::ClassLocation).as_deref(), Some("Room 105"));
    assert_eq!(report.get(FieldName::ClassLocation).unwrap().confidence, 0.97);
    assert_eq!(
        content(&report, FieldName::AssignmentTypes).as_deref(),
        Some("Homework Assignments:")
    );
    assert_eq!(
        content(&report, FieldName::AssignmentDelivery).as_deref(),
        Some("Handed in; Written assignments collected in class")
    );
    assert!(!report.get(FieldName::Workload).unwrap().found);
    assert!(!report.get(FieldName::GradingScale).unwrap().found);
}

#[test]
fn test_every_result_is_well_formed() {
    let engine = engine();
    let progress = Arc::new(ProgressBar::hidden());
    let patterns: Vec<Pattern> = vec![];

    let result = process(SYLLABI, 50, progress, &patterns, &engine).expect("scan should succeed");
    let names: Vec<&str> = result.documents.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["in_person_biology.txt", "online_networks.txt"]);

    for document in &result.documents {
        for (field, detection) in &document.fields {
            assert!((0.0..=1.0).contains(&detection.confidence), "{field}");
            if detection.found {
                assert!(detection.content.is_some(), "{field} found without content");
                assert!(!detection.evidence.is_empty(), "{field} found without evidence");
            } else {
                assert_eq!(detection.confidence, 0.0, "{field}");
            }
        }
    }
}

#[test]
fn test_detection_is_deterministic() {
    let engine = engine();
    let text = fs::read_to_string("testdata/syllabi/online_networks.txt").unwrap();
    let first = engine.detect(&text);
    for _ in 0..3 {
        assert_eq!(engine.detect(&text), first);
    }
}

#[test]
fn test_calibration_file_changes_confidence_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calibration.yaml");
    fs::write(&path, "fields:\n  credit_hours:\n    floor: 0.5\n    ceiling: 0.5\n").unwrap();

    let config = EngineConfig::load(&path).unwrap();
    let tuned = SyllabusEngine::with_fields(&config, &[FieldName::CreditHours]).unwrap();
    let default = SyllabusEngine::with_fields(&EngineConfig::default(), &[FieldName::CreditHours])
        .unwrap();

    let text = fs::read_to_string("testdata/syllabi/online_networks.txt").unwrap();
    let tuned = tuned.detect(&text);
    let default = default.detect(&text);

    let tuned = tuned.get(FieldName::CreditHours).unwrap();
    let default = default.get(FieldName::CreditHours).unwrap();
    assert_eq!(tuned.content, default.content);
    assert_eq!(tuned.confidence, 0.5);
    assert_eq!(default.confidence, 0.9);
}

#[test]
fn test_report_serializes_to_json() {
    let report = process_document(Path::new("testdata/syllabi/in_person_biology.txt"), &engine());
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["name"], "in_person_biology.txt");
    assert_eq!(json["fields"]["modality"]["content"], "In-Person");
    assert!(json["fields"]["workload"]["content"].is_null());
}
