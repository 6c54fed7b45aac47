use chrono::{DateTime, Utc};
use glob::Pattern;
use std::fs;
use std::path::Path;

/// Get the creation date of a file as an RFC3339 string.
pub fn get_creation_date(metadata: &fs::Metadata) -> Option<String> {
    metadata
        .created()
        .ok()
        .map(|time| DateTime::<Utc>::from(time).to_rfc3339())
}

/// Check if a path should be excluded based on a list of glob patterns.
pub fn is_path_excluded(path: &Path, exclude_patterns: &[Pattern]) -> bool {
    let path_str = path.to_string_lossy();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();

    exclude_patterns
        .iter()
        .any(|pattern| pattern.matches(&path_str) || pattern.matches(&file_name))
}

/// Compile glob patterns, skipping invalid ones.
pub fn compile_exclude_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|pattern| match Pattern::new(pattern) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                log::warn!("ignoring invalid exclude pattern {pattern:?}: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_by_name_or_path() {
        let patterns = compile_exclude_patterns(&["*.pdf".to_string(), "drafts".to_string()]);
        assert!(is_path_excluded(Path::new("syllabi/comp405.pdf"), &patterns));
        assert!(is_path_excluded(Path::new("syllabi/drafts"), &patterns));
        assert!(!is_path_excluded(Path::new("syllabi/comp405.txt"), &patterns));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let patterns = compile_exclude_patterns(&["[".to_string(), "*.tmp".to_string()]);
        assert_eq!(patterns.len(), 1);
    }
}
