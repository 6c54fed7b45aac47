use std::collections::BTreeMap;

use derive_builder::Builder;
use serde::Serialize;

use super::FieldName;
use crate::engine::DetectionResult;

/// Results for one scanned syllabus.
#[derive(Debug, Clone, Builder, Serialize)]
#[builder(build_fn(skip))]
pub struct DocumentReport {
    pub name: String,
    pub path: String,
    pub size: u64,
    #[builder(default)]
    pub date: Option<String>,
    #[builder(default)]
    pub sha256: Option<String>,
    #[builder(default)]
    pub fields: BTreeMap<FieldName, DetectionResult>,
    #[builder(default)]
    pub scan_errors: Vec<String>,
}

impl DocumentReportBuilder {
    pub fn build(&self) -> Result<DocumentReport, String> {
        Ok(DocumentReport {
            name: self.name.clone().ok_or("Missing field: name")?,
            path: self.path.clone().ok_or("Missing field: path")?,
            size: self.size.ok_or("Missing field: size")?,
            date: self.date.clone().flatten(),
            sha256: self.sha256.clone().flatten(),
            fields: self.fields.clone().unwrap_or_default(),
            scan_errors: self.scan_errors.clone().unwrap_or_default(),
        })
    }
}

impl DocumentReport {
    pub fn get(&self, field: FieldName) -> Option<&DetectionResult> {
        self.fields.get(&field)
    }

    pub fn found_count(&self) -> usize {
        self.fields.values().filter(|r| r.found).count()
    }
}
