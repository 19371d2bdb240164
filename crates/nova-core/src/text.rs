//! Text coordinates: byte sizes, LSP positions, and line lookup tables.

use serde::{Deserialize, Serialize};

pub use text_size::{TextRange, TextSize};

/// LSP-compatible position (0-based line, UTF-16 code units).
#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// LSP-compatible half-open range.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// An empty range at `pos` (an insertion point).
    #[inline]
    pub const fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Pre-computed line boundaries for one text snapshot.
///
/// `\n`, `\r\n` and lone `\r` all terminate a line. `line_end` excludes the terminator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    line_ends: Vec<TextSize>,
    text_len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = vec![TextSize::from(0)];
        let mut line_ends = Vec::new();

        let mut i = 0;
        while i < bytes.len() {
            let terminator_len = match bytes[i] {
                b'\n' => 1,
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => 2,
                b'\r' => 1,
                _ => {
                    i += 1;
                    continue;
                }
            };
            line_ends.push(TextSize::from(i as u32));
            i += terminator_len;
            line_starts.push(TextSize::from(i as u32));
        }
        line_ends.push(TextSize::from(text.len() as u32));

        Self {
            line_starts,
            line_ends,
            text_len: TextSize::from(text.len() as u32),
        }
    }

    #[inline]
    pub fn text_len(&self) -> TextSize {
        self.text_len
    }

    /// Number of lines; an empty text (or one ending in a newline) still has a last, empty line.
    #[inline]
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    #[inline]
    pub fn last_line(&self) -> u32 {
        self.line_count() - 1
    }

    #[inline]
    pub fn line_start(&self, line: u32) -> Option<TextSize> {
        self.line_starts.get(line as usize).copied()
    }

    #[inline]
    pub fn line_end(&self, line: u32) -> Option<TextSize> {
        self.line_ends.get(line as usize).copied()
    }

    /// The content of `line`, without its terminator.
    pub fn line_text<'t>(&self, text: &'t str, line: u32) -> Option<&'t str> {
        let start = u32::from(self.line_start(line)?) as usize;
        let end = u32::from(self.line_end(line)?) as usize;
        text.get(start..end)
    }

    fn line_of(&self, offset: TextSize) -> usize {
        let offset = offset.min(self.text_len);
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert) => insert.saturating_sub(1),
        }
    }

    /// Convert a byte offset to a UTF-16 position.
    ///
    /// Offsets past the end clamp to EOF; offsets inside a line terminator clamp to the line end.
    pub fn position(&self, text: &str, offset: TextSize) -> Position {
        debug_assert_eq!(TextSize::from(text.len() as u32), self.text_len);
        let line = self.line_of(offset);
        let line_start = u32::from(self.line_starts[line]) as usize;
        let offset = u32::from(offset.min(self.line_ends[line])) as usize;
        let character = text[line_start..offset]
            .chars()
            .map(|c| c.len_utf16() as u32)
            .sum();

        Position {
            line: line as u32,
            character,
        }
    }

    /// Convert a UTF-16 position into a byte offset.
    ///
    /// Returns `None` when the line is out of bounds, the character is past the end of the line,
    /// or the character points inside a surrogate pair.
    pub fn offset_of_position(&self, text: &str, position: Position) -> Option<TextSize> {
        debug_assert_eq!(TextSize::from(text.len() as u32), self.text_len);
        let line_start = self.line_start(position.line)?;
        let line = self.line_text(text, position.line)?;

        let mut utf16 = 0u32;
        for (byte_idx, ch) in line.char_indices() {
            if utf16 == position.character {
                return Some(line_start + TextSize::from(byte_idx as u32));
            }
            utf16 += ch.len_utf16() as u32;
            if utf16 > position.character {
                return None;
            }
        }

        (utf16 == position.character).then(|| line_start + TextSize::from(line.len() as u32))
    }

    /// Like [`LineIndex::offset_of_position`] but never fails: lines clamp to the last line,
    /// characters clamp to the line end, and a position inside a surrogate pair snaps to the
    /// start of that character.
    pub fn clamped_offset(&self, text: &str, position: Position) -> TextSize {
        let line_no = position.line.min(self.last_line());
        let line_start = self.line_starts[line_no as usize];
        let line = self.line_text(text, line_no).unwrap_or("");

        let mut utf16 = 0u32;
        for (byte_idx, ch) in line.char_indices() {
            let next = utf16 + ch.len_utf16() as u32;
            if next > position.character {
                return line_start + TextSize::from(byte_idx as u32);
            }
            utf16 = next;
        }
        line_start + TextSize::from(line.len() as u32)
    }

    pub fn range(&self, text: &str, range: TextRange) -> Range {
        Range {
            start: self.position(text, range.start()),
            end: self.position(text, range.end()),
        }
    }

    pub fn text_range(&self, text: &str, range: Range) -> Option<TextRange> {
        let start = self.offset_of_position(text, range.start)?;
        let end = self.offset_of_position(text, range.end)?;
        (start <= end).then(|| TextRange::new(start, end))
    }
}
