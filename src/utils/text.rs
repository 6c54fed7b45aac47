//! Small string helpers shared by the engine and the field detectors.
//!
//! All offsets handled here are byte offsets into UTF-8 strings; every
//! helper snaps them to character boundaries before slicing.

/// Case-insensitive ASCII substring search without allocation.
pub fn contains_ascii_ci(haystack: &str, needle: &str) -> bool {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

/// Largest char boundary that is `<= idx`.
pub fn floor_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary that is `>= idx`.
pub fn ceil_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// The first `max_chars` characters of `s`.
pub fn head_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Slice `[start - before, end + after)` of `s`, clamped to the string and
/// snapped to character boundaries.
pub fn around(s: &str, start: usize, end: usize, before: usize, after: usize) -> &str {
    let from = floor_boundary(s, start.saturating_sub(before));
    let to = ceil_boundary(s, end.saturating_add(after));
    &s[from..to]
}

/// Text before byte offset `idx`, limited to the last `max_bytes` bytes.
pub fn before(s: &str, idx: usize, max_bytes: usize) -> &str {
    let end = floor_boundary(s, idx);
    let from = ceil_boundary(s, end.saturating_sub(max_bytes));
    &s[from..end]
}

/// Lowercase and collapse every whitespace run to a single space.
pub fn fold(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate to at most `max_chars` characters, cutting at the last word
/// boundary when one exists.
pub fn truncate_words(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head = head_chars(s, max_chars);
    match head.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => head[..idx].trim_end().to_string(),
        _ => head.to_string(),
    }
}

/// True when every cased character in `s` is uppercase and there is at
/// least one.
pub fn is_all_caps(s: &str) -> bool {
    let mut saw_letter = false;
    for c in s.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            saw_letter = true;
        }
    }
    saw_letter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_ascii_ci() {
        assert!(contains_ascii_ci("Office HOURS: Mon", "office hours"));
        assert!(!contains_ascii_ci("Office", "office hours"));
        assert!(contains_ascii_ci("anything", ""));
    }

    #[test]
    fn test_head_chars_respects_multibyte() {
        assert_eq!(head_chars("héllo", 2), "hé");
        assert_eq!(head_chars("abc", 10), "abc");
    }

    #[test]
    fn test_around_clamps_to_bounds() {
        let s = "class meets in Room 105 on Monday";
        let start = s.find("Room").unwrap();
        assert_eq!(around(s, start, start + 8, 3, 3), "in Room 105 on");
        assert_eq!(around(s, 0, 5, 100, 0), "class");
    }

    #[test]
    fn test_before_snaps_to_boundary() {
        let s = "é Room";
        assert_eq!(before(s, s.find("Room").unwrap(), 2), " ");
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("  Contact   INFO\t here "), "contact info here");
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("online via zoom meetings", 12), "online via");
        assert_eq!(truncate_words("short", 12), "short");
    }

    #[test]
    fn test_is_all_caps() {
        assert!(is_all_caps("LATE WORK:"));
        assert!(!is_all_caps("Late Work"));
        assert!(!is_all_caps("123"));
    }
}
