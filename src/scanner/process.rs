use crate::detectors::SyllabusEngine;
use crate::models::{DocumentReport, DocumentReportBuilder};
use crate::scanner::ProcessResult;
use crate::utils::file::{get_creation_date, is_path_excluded};
use crate::utils::hash::calculate_sha256;
use anyhow::{Error, anyhow};
use content_inspector::{ContentType, inspect};
use glob::Pattern;
use indicatif::ProgressBar;
use log::warn;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Scan `path` recursively, running the engine on every document.
///
/// Documents within a directory are processed in parallel; each document is
/// evaluated field by field on a single worker.
pub fn process<P: AsRef<Path>>(
    path: P,
    max_depth: usize,
    progress_bar: Arc<ProgressBar>,
    exclude_patterns: &[Pattern],
    engine: &SyllabusEngine,
) -> Result<ProcessResult, Error> {
    let path = path.as_ref();

    if is_path_excluded(path, exclude_patterns) {
        return Ok(ProcessResult {
            documents: Vec::new(),
            excluded_count: 1,
        });
    }

    let mut all_documents = Vec::new();
    let mut total_excluded = 0;

    let mut entries: Vec<_> = fs::read_dir(path)?.filter_map(Result::ok).collect();
    entries.sort_by_key(|entry| entry.path());

    let mut file_entries = Vec::new();
    let mut dir_entries = Vec::new();

    for entry in entries {
        let path = entry.path();

        if is_path_excluded(&path, exclude_patterns) {
            total_excluded += 1;
            continue;
        }

        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => file_entries.push((path, metadata)),
            Ok(_) if path.is_dir() => dir_entries.push(path),
            _ => continue,
        }
    }

    all_documents.append(
        &mut file_entries
            .par_iter()
            .map(|(path, metadata)| {
                let report = process_file(path, metadata, engine);
                progress_bar.inc(1);
                report
            })
            .collect(),
    );

    if max_depth > 0 {
        for path in dir_entries {
            match process(
                &path,
                max_depth - 1,
                progress_bar.clone(),
                exclude_patterns,
                engine,
            ) {
                Ok(mut result) => {
                    all_documents.append(&mut result.documents);
                    total_excluded += result.excluded_count;
                }
                Err(e) => warn!("Error processing directory {}: {}", path.display(), e),
            }
        }
    }

    Ok(ProcessResult {
        documents: all_documents,
        excluded_count: total_excluded,
    })
}

/// Scan a single document.
pub fn process_document(path: &Path, engine: &SyllabusEngine) -> DocumentReport {
    match fs::metadata(path) {
        Ok(metadata) => process_file(path, &metadata, engine),
        Err(e) => failed_report(path, 0, format!("failed to read metadata: {e}")),
    }
}

fn process_file(path: &Path, metadata: &fs::Metadata, engine: &SyllabusEngine) -> DocumentReport {
    let mut builder = DocumentReportBuilder::default();
    builder
        .name(file_name(path))
        .path(path.to_string_lossy().to_string())
        .size(metadata.len())
        .date(get_creation_date(metadata));

    if let Err(e) = extract_fields(&mut builder, path, engine) {
        warn!("{}: {e:#}", path.display());
        builder.scan_errors(vec![format!("{e:#}")]);
    }

    builder
        .build()
        .unwrap_or_else(|e| failed_report(path, metadata.len(), e))
}

fn extract_fields(
    builder: &mut DocumentReportBuilder,
    path: &Path,
    engine: &SyllabusEngine,
) -> Result<(), Error> {
    let buffer = fs::read(path)?;
    builder.sha256(Some(calculate_sha256(&buffer)));

    let text = match inspect(&buffer) {
        ContentType::UTF_8 | ContentType::UTF_8_BOM => String::from_utf8_lossy(&buffer),
        other => return Err(anyhow!("not a UTF-8 text document ({other:?})")),
    };
    let detections = engine.detect(text.trim_start_matches('\u{feff}'));
    builder.fields(detections.fields).scan_errors(detections.errors);
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn failed_report(path: &Path, size: u64, error: String) -> DocumentReport {
    DocumentReport {
        name: file_name(path),
        path: path.to_string_lossy().to_string(),
        size,
        date: None,
        sha256: None,
        fields: Default::default(),
        scan_errors: vec![error],
    }
}
