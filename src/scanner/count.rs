use crate::utils::file::is_path_excluded;
use glob::Pattern;
use std::fs;
use std::path::Path;

/// Count the files, directories and excluded entries a scan of `path` will
/// visit, so the progress bar knows its length up front.
pub fn count<P: AsRef<Path>>(
    path: P,
    max_depth: usize,
    exclude_patterns: &[Pattern],
) -> std::io::Result<(usize, usize, usize)> {
    let path = path.as_ref();

    if is_path_excluded(path, exclude_patterns) {
        return Ok((0, 0, 1));
    }

    let mut files_count = 0;
    let mut dirs_count = 1; // Count the current directory
    let mut excluded_count = 0;

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();

        if is_path_excluded(&entry_path, exclude_patterns) {
            excluded_count += 1;
            continue;
        }

        let metadata = entry.metadata()?;
        if metadata.is_file() {
            files_count += 1;
        } else if metadata.is_dir() {
            dirs_count += 1;

            if max_depth > 0 {
                let (sub_files, sub_dirs, sub_excluded) =
                    count(&entry_path, max_depth - 1, exclude_patterns)?;

                files_count += sub_files;
                dirs_count += sub_dirs - 1; // Avoid double-counting this directory
                excluded_count += sub_excluded;
            }
        }
    }

    Ok((files_count, dirs_count, excluded_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::file::compile_exclude_patterns;

    #[test]
    fn test_counts_respect_depth_and_exclusions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "A").unwrap();
        fs::write(dir.path().join("skip.tmp"), "x").unwrap();
        fs::create_dir(dir.path().join("fall")).unwrap();
        fs::write(dir.path().join("fall").join("b.txt"), "B").unwrap();

        let patterns = compile_exclude_patterns(&["*.tmp".to_string()]);
        assert_eq!(count(dir.path(), 50, &patterns).unwrap(), (2, 2, 1));
        assert_eq!(count(dir.path(), 0, &patterns).unwrap(), (1, 2, 1));
    }
}
