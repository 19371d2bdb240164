use crate::{LineIndex, Position, Range, TextRange, TextSize};

/// An immutable snapshot of an open document.
///
/// Positions passed in are clamped to the document so lookups never fail; this mirrors how
/// editors treat stale cursor positions.
#[derive(Clone, Debug)]
pub struct TextDocument {
    name: String,
    text: String,
    index: LineIndex,
}

impl TextDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let index = LineIndex::new(&text);
        Self {
            name: name.into(),
            text,
            index,
        }
    }

    /// Display name (usually a path or URI), used in diffs and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    pub fn line_count(&self) -> u32 {
        self.index.line_count()
    }

    pub fn line(&self, line: u32) -> Option<&str> {
        self.index.line_text(&self.text, line)
    }

    pub fn offset_at(&self, position: Position) -> TextSize {
        self.index.clamped_offset(&self.text, position)
    }

    pub fn position_at(&self, offset: TextSize) -> Position {
        self.index.position(&self.text, offset)
    }

    pub fn text_range(&self, range: Range) -> TextRange {
        let start = self.offset_at(range.start);
        let end = self.offset_at(range.end).max(start);
        TextRange::new(start, end)
    }

    pub fn range_of(&self, range: TextRange) -> Range {
        self.index.range(&self.text, range)
    }

    /// Text covered by `range`, or the whole document when `None`.
    pub fn get_text(&self, range: Option<Range>) -> &str {
        match range {
            Some(range) => &self.text[self.text_range(range)],
            None => &self.text,
        }
    }

    /// Split the document at `position` into the text before and after it.
    pub fn split_at(&self, position: Position) -> (&str, &str) {
        self.text.split_at(u32::from(self.offset_at(position)) as usize)
    }

    /// The position just past the last character.
    pub fn end_position(&self) -> Position {
        self.position_at(self.index.text_len())
    }
}
