//! Sentence segmentation within a single line.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

// Anything up to a run of terminal punctuation plus the whitespace after it.
// Text after the last run has no match and closes at the end of the line.
static BOUNDARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]*[.!?]+\s*").expect("valid sentence boundary regex"));

/// Default abbreviation list used when abbreviation awareness is on.
pub const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "vs.", "etc.", "e.g.", "i.e.",
    "cf.", "approx.",
];

// Quotes and brackets that may wrap an abbreviation token.
const TOKEN_WRAPPERS: usize = 8;

/// Lowercased abbreviations that must not end a sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abbreviations {
    words: HashSet<String>,
    /// Byte length of the longest entry plus room for wrappers. Tokens
    /// longer than this cannot match, so the scan around a boundary stops.
    window: usize,
}

impl Abbreviations {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: HashSet<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        let longest = words.iter().map(String::len).max().unwrap_or(0);
        Self {
            words,
            window: longest + TOKEN_WRAPPERS,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whitespace-delimited token around `punct_end`, or `None` once it
    /// grows past the window. Work per call is bounded by the window.
    fn token_around<'l>(&self, line: &'l str, punct_end: usize) -> Option<&'l str> {
        let mut start = punct_end;
        for (idx, ch) in line[..punct_end].char_indices().rev() {
            if ch.is_whitespace() {
                break;
            }
            start = idx;
            if punct_end - start > self.window {
                return None;
            }
        }
        let mut end = punct_end;
        for (idx, ch) in line[punct_end..].char_indices() {
            if ch.is_whitespace() {
                break;
            }
            end = punct_end + idx + ch.len_utf8();
            if end - start > self.window {
                return None;
            }
        }
        Some(&line[start..end])
    }

    /// Whether the token around the punctuation run ending at `punct_end`
    /// is a known abbreviation.
    fn holds_boundary(&self, line: &str, punct_end: usize) -> bool {
        let Some(token) = self.token_around(line, punct_end) else {
            return false;
        };
        let token = token
            .trim_start_matches(|c: char| matches!(c, '"' | '\'' | '(' | '[' | '\u{201C}' | '\u{2018}'))
            .trim_end_matches(|c: char| matches!(c, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}'));
        self.words.contains(&token.to_lowercase())
    }
}

/// A raw piece of a line, before whitespace trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSegment<'a> {
    /// Byte offset of `text` inside the line.
    pub start: usize,
    pub text: &'a str,
}

impl RawSegment<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Forward-only iterator over the raw segments of one line.
///
/// Segments are contiguous: each starts where the previous ended and the
/// last one ends at the end of the line.
pub struct Segments<'a> {
    line: &'a str,
    pos: usize,
    abbreviations: Option<&'a Abbreviations>,
}

impl<'a> Segments<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            line,
            pos: 0,
            abbreviations: None,
        }
    }

    /// Suppress boundaries that fall on one of `abbreviations`.
    pub fn with_abbreviations(mut self, abbreviations: Option<&'a Abbreviations>) -> Self {
        self.abbreviations = abbreviations.filter(|a| !a.is_empty());
        self
    }

    fn boundary_after(&self, from: usize) -> usize {
        match BOUNDARY_RE.find_at(self.line, from) {
            Some(m) if m.end() > from => m.end(),
            _ => self.line.len(),
        }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = RawSegment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.line.len() {
            return None;
        }
        let start = self.pos;
        let mut end = self.boundary_after(start);
        if let Some(abbreviations) = self.abbreviations {
            while end < self.line.len() {
                let punct_end = start + self.line[start..end].trim_end().len();
                if !abbreviations.holds_boundary(self.line, punct_end) {
                    break;
                }
                end = self.boundary_after(end);
            }
        }
        self.pos = end;
        Some(RawSegment {
            start,
            text: &self.line[start..end],
        })
    }
}
