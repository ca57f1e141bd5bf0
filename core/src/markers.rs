//! Markdown list, checkbox and blockquote marker detection.
//!
//! Detection runs on a raw line (line ending removed, leading whitespace
//! kept). The returned content is always the tail of that line, so
//! `marker_len + content.len() == line.len()` and the content's offset
//! inside the line is exactly `marker_len`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// Checkbox has to be tried before the plain bullet, otherwise `- [ ] task`
// reads as a bullet whose content starts with `[ ]`.
static CHECKBOX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*+]\s*\[[xX\s]\]\s*").expect("valid checkbox regex"));
static ORDERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[0-9]+\.\s+").expect("valid ordered list regex"));
static UNORDERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*+]\s+").expect("valid unordered list regex"));
static BLOCKQUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\s*>\s*)+").expect("valid blockquote regex"));

/// Kind of leading marker found on a line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerKind {
    Checkbox,
    Ordered,
    Unordered,
    Blockquote,
}

/// A recognised marker and the content that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker<'a> {
    pub kind: MarkerKind,
    /// Text after the marker, a suffix of the input line.
    pub content: &'a str,
    /// Bytes consumed from the start of the line, including leading
    /// whitespace and the whitespace the marker rule swallows.
    pub marker_len: usize,
}

/// Recognise a leading marker on `line`.
///
/// Rules are tried in priority order: checkbox, ordered, unordered,
/// blockquote. Returns `None` when the line is plain prose.
pub fn detect(line: &str) -> Option<ListMarker<'_>> {
    let rules: [(&Lazy<Regex>, MarkerKind); 4] = [
        (&CHECKBOX_RE, MarkerKind::Checkbox),
        (&ORDERED_RE, MarkerKind::Ordered),
        (&UNORDERED_RE, MarkerKind::Unordered),
        (&BLOCKQUOTE_RE, MarkerKind::Blockquote),
    ];
    rules.iter().find_map(|(re, kind)| {
        re.find(line).map(|m| ListMarker {
            kind: *kind,
            content: &line[m.end()..],
            marker_len: m.end(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tail(line: &str, marker: &ListMarker<'_>) {
        assert_eq!(marker.marker_len + marker.content.len(), line.len());
        assert_eq!(&line[marker.marker_len..], marker.content);
    }

    #[test]
    fn strips_checkbox_with_leading_indent() {
        let line = "  - [x] Done quickly now.";
        let marker = detect(line).unwrap();
        assert_eq!(marker.kind, MarkerKind::Checkbox);
        assert_eq!(marker.content, "Done quickly now.");
        assert_eq!(marker.marker_len, 8);
        assert_tail(line, &marker);
    }

    #[test]
    fn checkbox_wins_over_bullet() {
        for line in ["- [ ] todo item", "* [X] shipped", "+[ ] tight"] {
            let marker = detect(line).unwrap();
            assert_eq!(marker.kind, MarkerKind::Checkbox, "line {line:?}");
            assert!(!marker.content.starts_with('['));
            assert_tail(line, &marker);
        }
    }

    #[test]
    fn strips_ordered_marker() {
        let marker = detect("2. Short one.").unwrap();
        assert_eq!(marker.kind, MarkerKind::Ordered);
        assert_eq!(marker.content, "Short one.");
        assert_eq!(marker.marker_len, 3);
    }

    #[test]
    fn ordered_marker_needs_space_after_dot() {
        assert!(detect("3.14 is close to pi.").is_none());
        assert!(detect("2) not supported").is_none());
    }

    #[test]
    fn strips_unordered_markers() {
        for (line, content) in [("- item", "item"), ("*   spaced", "spaced"), ("\t+ tabbed", "tabbed")] {
            let marker = detect(line).unwrap();
            assert_eq!(marker.kind, MarkerKind::Unordered);
            assert_eq!(marker.content, content);
            assert_tail(line, &marker);
        }
    }

    #[test]
    fn bullet_without_space_is_prose() {
        assert!(detect("-dash start").is_none());
        assert!(detect("---").is_none());
        assert!(detect("**bold** start").is_none());
    }

    #[test]
    fn strips_nested_blockquote_chevrons() {
        let line = " > > quoted words";
        let marker = detect(line).unwrap();
        assert_eq!(marker.kind, MarkerKind::Blockquote);
        assert_eq!(marker.content, "quoted words");
        assert_tail(line, &marker);
    }

    #[test]
    fn marker_only_lines_have_empty_content() {
        for line in ["- ", "- [ ]", ">", "1. "] {
            let marker = detect(line).unwrap();
            assert!(marker.content.is_empty(), "line {line:?}");
            assert_eq!(marker.marker_len, line.len());
        }
    }

    #[test]
    fn plain_prose_has_no_marker() {
        assert!(detect("Just a sentence.").is_none());
        assert!(detect("").is_none());
    }

    #[test]
    fn long_whitespace_runs_do_not_blow_up() {
        let line = format!("{}-{}x", " ".repeat(50_000), " ".repeat(50_000));
        let marker = detect(&line).unwrap();
        assert_eq!(marker.content, "x");
        assert_tail(&line, &marker);
    }
}
