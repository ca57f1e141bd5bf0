//! Byte offset conversions for hosts that count lines, UTF-16 units or chars.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::decorate::Span;

/// Zero-based line and UTF-16 column, as editors speak it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

/// Location metadata in 1-based line/column coordinates (columns in chars).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Line start table over a borrowed document.
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { text, line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line_of(&self, byte_offset: usize) -> usize {
        match self.line_starts.binary_search(&byte_offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    fn floor_boundary(&self, byte_offset: usize) -> usize {
        let mut offset = byte_offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    /// Byte range of `line` without its line ending.
    pub fn line_content(&self, line: usize) -> Option<Range<usize>> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let content = &self.text[start..end];
        Some(start..start + content.trim_end_matches('\r').len())
    }

    /// Byte range covering whole lines `first..=last`, line endings included.
    /// A `last` past the end clamps to the final line; a `first` past the
    /// end yields an empty range at the document end.
    pub fn line_span(&self, first: usize, last: usize) -> Range<usize> {
        let last_line = self.line_count() - 1;
        if first > last_line {
            return self.text.len()..self.text.len();
        }
        let last = last.clamp(first, last_line);
        let start = self.line_starts[first];
        let end = self
            .line_starts
            .get(last + 1)
            .copied()
            .unwrap_or(self.text.len());
        start..end
    }

    pub fn position(&self, byte_offset: usize) -> Position {
        let offset = self.floor_boundary(byte_offset);
        let line = self.line_of(offset);
        let start = self.line_starts[line];
        Position {
            line,
            character: self.text[start..offset].encode_utf16().count(),
        }
    }

    pub fn location(&self, byte_offset: usize) -> Location {
        let offset = self.floor_boundary(byte_offset);
        let line = self.line_of(offset);
        let start = self.line_starts[line];
        Location {
            line: line + 1,
            column: self.text[start..offset].chars().count() + 1,
        }
    }

    /// Byte offset of `position`. Columns past the end of the line clamp to
    /// the line's end; lines past the end clamp to the document end.
    pub fn offset(&self, position: Position) -> usize {
        let Some(content) = self.line_content(position.line) else {
            return self.text.len();
        };
        let mut units = 0;
        for (idx, ch) in self.text[content.clone()].char_indices() {
            if units >= position.character {
                return content.start + idx;
            }
            units += ch.len_utf16();
        }
        content.end
    }
}

/// Unit in which span offsets are reported to a host.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OffsetEncoding {
    #[default]
    Utf8,
    Utf16,
    Char,
}

impl OffsetEncoding {
    fn units(self, ch: char) -> usize {
        match self {
            OffsetEncoding::Utf8 => ch.len_utf8(),
            OffsetEncoding::Utf16 => ch.len_utf16(),
            OffsetEncoding::Char => 1,
        }
    }
}

impl std::str::FromStr for OffsetEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" | "byte" | "bytes" => Ok(OffsetEncoding::Utf8),
            "utf16" | "utf-16" => Ok(OffsetEncoding::Utf16),
            "char" | "chars" => Ok(OffsetEncoding::Char),
            other => Err(format!("unknown offset encoding `{other}`")),
        }
    }
}

/// Re-express spans computed over `text` (with a zero base offset) in
/// `encoding`. Relies on spans being ascending, which `compute` guarantees.
pub fn encode_spans(text: &str, spans: &[Span], encoding: OffsetEncoding) -> Vec<Span> {
    if encoding == OffsetEncoding::Utf8 {
        return spans.to_vec();
    }
    let mut chars = text.char_indices().peekable();
    let mut units = 0;
    let mut advance_to = |byte_offset: usize| {
        while let Some(&(idx, ch)) = chars.peek() {
            if idx >= byte_offset {
                break;
            }
            units += encoding.units(ch);
            chars.next();
        }
        units
    };
    spans
        .iter()
        .map(|span| {
            let start = advance_to(span.start);
            let end = advance_to(span.end);
            Span { start, end, ..*span }
        })
        .collect()
}
