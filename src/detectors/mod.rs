//! Syllabus field detectors and the engine that runs them.
//!
//! Every field is a [`FieldDetector`]. Most are declarative
//! [`FieldSpec`](crate::engine::FieldSpec) tables run by the generic
//! [`FieldPipeline`]; the rest are field-specific extractors built from the
//! same engine primitives. [`SyllabusEngine`] owns one detector per enabled
//! field and contains failures per field: an error or a panic in one
//! detector turns that field into a not-found result and never affects the
//! others.

pub mod assignment_delivery;
pub mod assignment_types;
pub mod class_location;
pub mod contact;
pub mod credit_hours;
pub mod grading_process;
pub mod grading_scale;
pub mod instructor;
pub mod late_policy;
pub mod office;
pub mod response_time;
mod section_title;
pub mod slo;
pub mod workload;

#[cfg(test)]
mod engine_test;

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::engine::{Calibration, DetectionResult, Document, EngineConfig, FieldOverrides, FieldPipeline};
use crate::modality::ModalityController;
use crate::models::FieldName;

/// One field's detector.
///
/// Implementations hold only immutable, pre-compiled configuration, so a
/// single instance can serve any number of documents concurrently.
pub trait FieldDetector: Send + Sync {
    fn field(&self) -> FieldName;

    /// Detect the field in a normalized document.
    ///
    /// An `Err` is contained by [`SyllabusEngine`] and reported as not found.
    fn detect(&self, doc: &Document) -> Result<DetectionResult>;
}

impl FieldDetector for FieldPipeline {
    fn field(&self) -> FieldName {
        self.field
    }

    fn detect(&self, doc: &Document) -> Result<DetectionResult> {
        Ok(self.run(doc))
    }
}

/// Apply calibration overrides to a field-specific extractor's default
/// calibration.
pub(crate) fn calibration_for(
    field: FieldName,
    default: Calibration,
    overrides: Option<&FieldOverrides>,
) -> Result<Calibration> {
    let mut calibration = default;
    if let Some(overrides) = overrides {
        if let Some(scale) = overrides.scale {
            calibration.scale = scale;
        }
        if let Some(floor) = overrides.floor {
            calibration.floor = floor;
        }
        if let Some(ceiling) = overrides.ceiling {
            calibration.ceiling = ceiling;
        }
    }
    calibration
        .validate()
        .with_context(|| format!("{field}: invalid calibration"))?;
    Ok(calibration)
}

/// Build the detector for `field`.
pub fn build_detector(field: FieldName, config: &EngineConfig) -> Result<Box<dyn FieldDetector>> {
    let overrides = config.overrides_for(field);
    let detector: Box<dyn FieldDetector> = match field {
        FieldName::Slos => Box::new(slo::SloDetector::new(overrides)?),
        FieldName::Instructor => Box::new(instructor::InstructorDetector::new(overrides)?),
        FieldName::GradingScale => Box::new(grading_scale::GradingScaleDetector::new(overrides)?),
        FieldName::Modality => Box::new(ModalityController::new(config.modality.clone())?),
        FieldName::OfficeLocation => {
            Box::new(FieldPipeline::build(&office::LOCATION_SPEC, overrides)?)
        }
        FieldName::OfficeHours => Box::new(office::OfficeHoursDetector::new(overrides)?),
        FieldName::OfficePhone => Box::new(office::OfficePhoneDetector::new(overrides)?),
        FieldName::Email => Box::new(contact::EmailDetector::new(overrides)?),
        FieldName::PreferredContact => {
            Box::new(contact::PreferredContactDetector::new(overrides)?)
        }
        FieldName::LatePolicy => Box::new(late_policy::LatePolicyDetector::new(overrides)?),
        FieldName::CreditHours => Box::new(credit_hours::CreditHoursDetector::new(overrides)?),
        FieldName::Workload => Box::new(workload::WorkloadDetector::new(overrides)?),
        FieldName::AssignmentDelivery => {
            Box::new(FieldPipeline::build(&assignment_delivery::SPEC, overrides)?)
        }
        FieldName::AssignmentTypes => {
            Box::new(FieldPipeline::build(&assignment_types::SPEC, overrides)?)
        }
        FieldName::GradingProcess => {
            Box::new(grading_process::GradingProcessDetector::new(overrides)?)
        }
        FieldName::ResponseTime => Box::new(response_time::ResponseTimeDetector::new(overrides)?),
        FieldName::ClassLocation => {
            Box::new(class_location::ClassLocationDetector::new(overrides)?)
        }
    };
    Ok(detector)
}

/// Per-field results of one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Detections {
    pub fields: BTreeMap<FieldName, DetectionResult>,
    /// Contained per-field failures, one message each.
    pub errors: Vec<String>,
}

impl Detections {
    pub fn get(&self, field: FieldName) -> Option<&DetectionResult> {
        self.fields.get(&field)
    }

    pub fn found_count(&self) -> usize {
        self.fields.values().filter(|r| r.found).count()
    }
}

/// The configured set of field detectors.
pub struct SyllabusEngine {
    detectors: Vec<Box<dyn FieldDetector>>,
}

impl std::fmt::Debug for SyllabusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyllabusEngine")
            .field("fields", &self.fields())
            .finish()
    }
}

impl SyllabusEngine {
    /// Build detectors for every field.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let all: Vec<FieldName> = FieldName::iter().collect();
        Self::with_fields(config, &all)
    }

    /// Build detectors for the given fields only, in declaration order.
    ///
    /// Any invalid pattern or calibration aborts construction.
    pub fn with_fields(config: &EngineConfig, fields: &[FieldName]) -> Result<Self> {
        let detectors = FieldName::iter()
            .filter(|field| fields.contains(field))
            .map(|field| {
                build_detector(field, config)
                    .with_context(|| format!("failed to build detector for {field}"))
            })
            .collect::<Result<Vec<_>>>()?;
        info!("syllabus engine ready with {} field detectors", detectors.len());
        Ok(Self { detectors })
    }

    /// Wrap already-built detectors.
    pub fn from_detectors(detectors: Vec<Box<dyn FieldDetector>>) -> Self {
        Self { detectors }
    }

    pub fn fields(&self) -> Vec<FieldName> {
        self.detectors.iter().map(|d| d.field()).collect()
    }

    /// Normalize `raw` and run every field on it.
    pub fn detect(&self, raw: &str) -> Detections {
        self.detect_document(&Document::new(raw))
    }

    /// Run every field on an already normalized document.
    pub fn detect_document(&self, doc: &Document) -> Detections {
        let mut detections = Detections::default();
        for detector in &self.detectors {
            let field = detector.field();
            let result = match detect_contained(detector.as_ref(), doc) {
                Ok(result) => result,
                Err(message) => {
                    warn!("{message}");
                    detections.errors.push(message);
                    DetectionResult::not_found()
                }
            };
            detections.fields.insert(field, result);
        }
        detections
    }
}

/// Run one detector, turning an error or a panic into a message.
fn detect_contained(
    detector: &dyn FieldDetector,
    doc: &Document,
) -> std::result::Result<DetectionResult, String> {
    let field = detector.field();
    match catch_unwind(AssertUnwindSafe(|| detector.detect(doc))) {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(format!("{field}: {e:#}")),
        Err(payload) => Err(format!(
            "{field}: detector panicked: {}",
            panic_message(payload.as_ref())
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
