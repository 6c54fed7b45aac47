//! Section lookup by approved title, shared by fields that report a
//! whole section (learning outcomes, late-work policy).
//!
//! A line qualifies as a section header when it contains an approved title
//! in a header-like shape. Qualifying lines are scored and the best one
//! wins; its content is the title line plus the lines that follow, up to
//! the next known section header.

use log::debug;

use crate::engine::Document;
use crate::utils::text::is_all_caps;

const SCORE_STARTS_WITH_TITLE: i32 = 10;
const SCORE_SHORT_LINE: i32 = 5;
const SCORE_LONG_LINE: i32 = -5;
const SCORE_COLON: i32 = 3;
const SCORE_ALL_CAPS: i32 = 2;
const SHORT_LINE_CHARS: usize = 50;
const LONG_LINE_CHARS: usize = 100;

const MAX_EXTRA_WORDS_SHORT: usize = 2;
const MAX_EXTRA_WORDS_START: usize = 4;
const MAX_EXTRA_WORDS_END: usize = 3;

/// Title vocabulary and scoring knobs for one section field.
#[derive(Debug, Clone, Copy)]
pub struct SectionTitles {
    /// Lowercase approved titles.
    pub titles: &'static [&'static str],
    /// Lowercase phrases that start the next section.
    pub stop_headers: &'static [&'static str],
    /// Minimum score for the best header.
    pub threshold: i32,
    /// Score for a line that is exactly an approved title, bypassing the
    /// shape checks.
    pub exact_line_score: Option<i32>,
    /// Bonus for a line starting with a title within 100 characters.
    pub leading_title_bonus: i32,
    /// Accept short titles standing alone inside a longer line.
    pub isolated_titles: bool,
    pub max_document_chars: usize,
    pub max_content_lines: usize,
    pub max_content_chars: usize,
}

/// The winning section.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub line_index: usize,
    pub score: i32,
    pub content: String,
}

/// Lowercase and drop colons and periods.
fn bare(line: &str) -> String {
    line.trim()
        .to_lowercase()
        .replace([':', '.'], "")
        .trim()
        .to_string()
}

fn is_isolated(haystack: &str, needle: &str) -> bool {
    const EDGES: &[char] = &[' ', '\t', ':', '-', '.', '(', ')', '[', ']'];
    let Some(start) = haystack.find(needle) else {
        return false;
    };
    let end = start + needle.len();
    let before_ok = haystack[..start].chars().next_back().is_none_or(|c| EDGES.contains(&c));
    let after_ok = haystack[end..].chars().next().is_none_or(|c| EDGES.contains(&c));
    before_ok && after_ok
}

impl SectionTitles {
    fn is_exact(&self, line: &str) -> bool {
        let lower = line.trim().to_lowercase();
        let bare = bare(line);
        self.titles
            .iter()
            .any(|t| *t == bare || *t == lower.trim_end_matches(':'))
    }

    /// Whether `line` carries an approved title in a header-like shape.
    fn is_header(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();
        let bare = bare(line);
        let line_words = bare.split_whitespace().count();
        let has_colon = trimmed.contains(':');

        self.titles.iter().filter(|t| bare.contains(*t)).any(|title| {
            let title_words = title.split_whitespace().count();
            if line_words <= title_words + MAX_EXTRA_WORDS_SHORT {
                has_colon
                    || is_all_caps(trimmed)
                    || (line_words == title_words
                        && !lower.ends_with([',', ';', '.', '!', '?']))
            } else if bare.starts_with(title) {
                has_colon || line_words <= title_words + MAX_EXTRA_WORDS_START
            } else if bare.ends_with(title) {
                line_words <= title_words + MAX_EXTRA_WORDS_END
            } else if self.isolated_titles && title_words <= 3 {
                let slack = if title_words == 2 { 6 } else { 4 };
                is_isolated(&bare, title) && line_words <= title_words + slack
            } else {
                false
            }
        })
    }

    fn score(&self, line: &str) -> i32 {
        let trimmed = line.trim();
        let bare = bare(line);
        let mut score = 0;
        if self.leading_title_bonus != 0
            && self
                .titles
                .iter()
                .any(|t| bare.starts_with(t) && bare.len() <= t.len() + LONG_LINE_CHARS)
        {
            score += self.leading_title_bonus;
        }
        if self.titles.iter().any(|t| bare.starts_with(t)) {
            score += SCORE_STARTS_WITH_TITLE;
        }
        if bare.len() < SHORT_LINE_CHARS {
            score += SCORE_SHORT_LINE;
        }
        if bare.len() > LONG_LINE_CHARS {
            score += SCORE_LONG_LINE;
        }
        if trimmed.contains(':') {
            score += SCORE_COLON;
        }
        if is_all_caps(trimmed) {
            score += SCORE_ALL_CAPS;
        }
        score
    }

    fn starts_section(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.stop_headers.iter().any(|h| lower.contains(h))
    }

    /// Find the best-scoring header and collect its content. Ties go to the
    /// earliest line.
    pub fn find(&self, doc: &Document) -> Option<Section> {
        let doc = doc.truncated(self.max_document_chars);
        let lines = doc.lines();

        let mut best: Option<(i32, usize)> = None;
        for (index, line) in lines.iter().enumerate() {
            let score = match self.exact_line_score {
                Some(exact) if self.is_exact(line) => exact,
                _ if self.is_header(line) => self.score(line),
                _ => continue,
            };
            if best.is_none_or(|(s, _)| score > s) {
                best = Some((score, index));
            }
        }
        let (score, index) = best?;
        if score < self.threshold {
            debug!("section title at line {} scored {score}, below threshold", index + 1);
            return None;
        }

        let title = lines[index].trim();
        let mut content = vec![title];
        let mut length = title.len();
        for line in lines
            .iter()
            .take(index + self.max_content_lines)
            .skip(index + 1)
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if self.starts_section(line) {
                break;
            }
            content.push(line);
            length += line.len();
            if length > self.max_content_chars {
                break;
            }
        }
        Some(Section {
            line_index: index,
            score,
            content: content.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLES: SectionTitles = SectionTitles {
        titles: &["learning outcomes", "late work"],
        stop_headers: &["grading", "schedule"],
        threshold: 5,
        exact_line_score: None,
        leading_title_bonus: 0,
        isolated_titles: false,
        max_document_chars: 20_000,
        max_content_lines: 10,
        max_content_chars: 500,
    };

    #[test]
    fn test_header_shapes() {
        assert!(TITLES.is_header("Learning Outcomes:"));
        assert!(TITLES.is_header("LEARNING OUTCOMES"));
        assert!(TITLES.is_header("Learning Outcomes"));
        assert!(TITLES.is_header("Learning outcomes for this course:"));
        assert!(!TITLES.is_header("Learning outcomes."));
        assert!(!TITLES.is_header(
            "We will revisit the learning outcomes many times throughout the semester"
        ));
    }

    #[test]
    fn test_score() {
        assert_eq!(TITLES.score("LEARNING OUTCOMES:"), 10 + 5 + 3 + 2);
        assert_eq!(TITLES.score("Course learning outcomes"), 5);
    }

    #[test]
    fn test_content_stops_at_next_section() {
        let doc = Document::new("Late Work:\nLate work loses 10% per day.\n\nGrading\nA 93");
        let section = TITLES.find(&doc).unwrap();
        assert_eq!(section.line_index, 0);
        assert_eq!(section.content, "Late Work:\nLate work loses 10% per day.");
    }

    #[test]
    fn test_isolated_title() {
        let lenient = SectionTitles {
            isolated_titles: true,
            ..TITLES
        };
        let line = "policies (late work) for the course";
        assert!(!TITLES.is_header(line));
        assert!(lenient.is_header(line));
    }
}
