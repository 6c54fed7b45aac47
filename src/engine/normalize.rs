//! Text normalization applied before any pattern runs.
//!
//! Canonicalizes a raw document so that field patterns only ever see ASCII
//! punctuation and single spaces:
//! - Unicode NFKC (full-width forms, ligatures, non-breaking spaces)
//! - Dash, quote and bullet glyphs → ASCII equivalents
//! - Zero-width characters removed before composition, line endings
//!   unified to `\n`
//! - Horizontal whitespace runs → one space, trailing whitespace dropped
//! - Runs of three or more blank lines → a single blank line
//!
//! `normalize(normalize(x)) == normalize(x)` holds for every input.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Three or more consecutive blank lines (four or more line breaks).
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{4,}").unwrap());

/// Dash-like code points folded to `-`.
const DASHES: &[char] = &[
    '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}', '\u{2212}', '\u{FE58}',
    '\u{FE63}', '\u{FF0D}',
];

const SINGLE_QUOTES: &[char] = &['\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}', '\u{2032}'];

const DOUBLE_QUOTES: &[char] = &['\u{201C}', '\u{201D}', '\u{201E}', '\u{201F}', '\u{2033}'];

/// Bullet glyphs rewritten to a `- ` list marker.
const BULLETS: &[char] = &[
    '\u{2022}', '\u{25AA}', '\u{2023}', '\u{25E6}', '\u{25CF}', '\u{25A0}', '\u{25A1}', '\u{25AB}',
    '\u{2043}', '\u{2219}', '\u{F0B7}', '\u{F0A7}',
];

const ZERO_WIDTH: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// Normalize a raw document.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    // Zero-width characters are dropped before NFKC: a mark they separate
    // from its base must compose in this pass.
    let unified: String = raw
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !ZERO_WIDTH.contains(c))
        .collect();

    let mut mapped = String::with_capacity(unified.len());
    for c in unified.nfkc() {
        if DASHES.contains(&c) {
            mapped.push('-');
        } else if SINGLE_QUOTES.contains(&c) {
            mapped.push('\'');
        } else if DOUBLE_QUOTES.contains(&c) {
            mapped.push('"');
        } else if BULLETS.contains(&c) {
            mapped.push_str("- ");
        } else if c == '\u{2026}' {
            mapped.push_str("...");
        } else {
            mapped.push(c);
        }
    }

    let lines: Vec<String> = mapped.split('\n').map(collapse_horizontal).collect();
    let joined = lines.join("\n");

    BLANK_RUN_RE.replace_all(&joined, "\n\n").into_owned()
}

/// Collapse horizontal whitespace inside one line and trim its end.
fn collapse_horizontal(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_space = false;
    for c in line.chars() {
        if c.is_whitespace() || c.is_control() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Document;

    #[test]
    fn test_normalize_punctuation() {
        assert_eq!(
            normalize("Office\u{FF1A} Room 105 \u{2014} \u{201C}Mon\u{201D}"),
            "Office: Room 105 - \"Mon\""
        );
    }

    #[test]
    fn test_normalize_bullets_and_spaces() {
        assert_eq!(normalize("\u{2022}\tHomework\u{00A0}\u{00A0}10%"), "- Homework 10%");
    }

    #[test]
    fn test_normalize_blank_lines() {
        assert_eq!(normalize("a\n\n\n\nb\r\n\r\nc"), "a\n\nb\n\nc");
        assert_eq!(normalize("a\n   \n \n \nb"), "a\n\nb");
    }

    #[test]
    fn test_short_blank_runs_are_kept() {
        assert_eq!(normalize("a\n\nb"), "a\n\nb");
        assert_eq!(normalize("a\n\n\nb"), "a\n\n\nb");
        assert_eq!(normalize("a\n   \n \nb"), "a\n\n\nb");
        assert_eq!(Document::new("a\n\n\nb").line(3), Some("b"));
    }

    #[test]
    fn test_long_blank_runs_collapse_to_one() {
        assert_eq!(normalize("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize("a\n\n\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_zero_width_between_letter_and_mark() {
        let once = normalize("cafe\u{200B}\u{0301}");
        assert_eq!(once, "caf\u{e9}");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "  Class   Location\u{FF1A}  Kingsbury Hall\u{2013}N101 \n\n\n\n\u{25E6} online",
            "\u{FEFF}Syllabus\r\n\r\n\r\n\tGrading \u{2022}\u{2022} A = 93\u{2013}100",
            "\u{2026}\u{2019}tis \u{FB01}ne\n \n \n \nend   ",
            "\n\n\n",
            "cafe\u{200B}\u{0301} Hall\u{2060}\u{0308}\n\n\n\u{FEFF}\u{0327}c",
            "n\u{200D}\u{0303}o \u{2014} A\u{200C}\u{030A}\n\n\n\n\nx",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }
}
