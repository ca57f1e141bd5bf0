//! Turn text into ordered, non-overlapping category spans.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::classify::{classify, Category};
use crate::markers;
use crate::segments::{RawSegment, Segments};
use crate::words::count_words;
use crate::Settings;

/// A classified stretch of text. Offsets are bytes in the caller's
/// coordinate space (`base_offset` already applied).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub category: Category,
    pub words: usize,
}

impl Span {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn shifted(self, by: usize) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
            ..self
        }
    }
}

/// Spans plus document totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub word_count: usize,
    pub spans: Vec<Span>,
    pub category_counts: BTreeMap<Category, usize>,
}

impl DocumentReport {
    pub fn count(&self, category: Category) -> usize {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Highest category present, if any span was emitted.
    pub fn worst(&self) -> Option<Category> {
        self.spans.iter().map(|s| s.category).max()
    }
}

/// Classify every sentence and list item in `text`.
///
/// `base_offset` is the position of `text` inside a larger document and is
/// added to every span, so a viewport slice can be highlighted on its own.
pub fn compute(text: &str, settings: &Settings, base_offset: usize) -> Vec<Span> {
    Decorations::new(text, settings, base_offset).collect()
}

/// Compute spans and tally them.
pub fn report(text: &str, settings: &Settings) -> DocumentReport {
    let spans = compute(text, settings, 0);
    let mut category_counts = BTreeMap::new();
    let mut word_count = 0;
    for span in &spans {
        *category_counts.entry(span.category).or_default() += 1;
        word_count += span.words;
    }
    DocumentReport {
        word_count,
        spans,
        category_counts,
    }
}

/// Lazy span producer walking `text` line by line, left to right.
pub struct Decorations<'a> {
    lines: std::str::SplitInclusive<'a, char>,
    settings: &'a Settings,
    base_offset: usize,
    cursor: usize,
    current: Option<LineSegments<'a>>,
}

struct LineSegments<'a> {
    segments: Segments<'a>,
    origin: usize,
}

impl<'a> Decorations<'a> {
    pub fn new(text: &'a str, settings: &'a Settings, base_offset: usize) -> Self {
        Self {
            lines: text.split_inclusive('\n'),
            settings,
            base_offset,
            cursor: 0,
            current: None,
        }
    }

    fn advance_line(&mut self) -> Option<()> {
        let settings = self.settings;
        loop {
            let raw = self.lines.next()?;
            let line_start = self.cursor;
            self.cursor += raw.len();

            let line = raw.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            let (body, body_offset) = match markers::detect(line) {
                Some(marker) => (marker.content, marker.marker_len),
                None => (line, 0),
            };
            if body.trim().is_empty() {
                continue;
            }
            self.current = Some(LineSegments {
                segments: Segments::new(body)
                    .with_abbreviations(settings.abbreviations.as_ref()),
                origin: self.base_offset + line_start + body_offset,
            });
            return Some(());
        }
    }
}

impl Iterator for Decorations<'_> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        loop {
            if let Some(line) = self.current.as_mut() {
                for segment in line.segments.by_ref() {
                    if let Some(span) = measure(segment, line.origin, self.settings) {
                        return Some(span);
                    }
                }
                self.current = None;
            }
            self.advance_line()?;
        }
    }
}

fn measure(segment: RawSegment<'_>, origin: usize, settings: &Settings) -> Option<Span> {
    let leading = segment.text.len() - segment.text.trim_start().len();
    let content = segment.text.trim();
    if content.is_empty() {
        return None;
    }
    let words = count_words(content, settings.word_rule);
    if words == 0 {
        return None;
    }
    let start = origin + segment.start + leading;
    Some(Span {
        start,
        end: start + content.len(),
        category: classify(words, &settings.thresholds),
        words,
    })
}
