//! Byte-offset text edits and a deterministic applier.

use std::fmt;

use crate::{TextRange, TextSize};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TextEdit {
    pub range: TextRange,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(range: TextRange, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(offset: TextSize, text: impl Into<String>) -> Self {
        Self::new(TextRange::empty(offset), text)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EditError {
    RangeOutOfBounds { range: TextRange, text_len: TextSize },
    InvalidUtf8Boundary { offset: TextSize },
    OverlappingEdits { first: TextRange, second: TextRange },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::RangeOutOfBounds { range, text_len } => {
                write!(f, "edit range {range:?} exceeds text length {text_len:?}")
            }
            EditError::InvalidUtf8Boundary { offset } => {
                write!(f, "offset {offset:?} splits a UTF-8 character")
            }
            EditError::OverlappingEdits { first, second } => {
                write!(f, "edit {first:?} overlaps edit {second:?}")
            }
        }
    }
}

impl std::error::Error for EditError {}

/// Apply `edits` to `text`.
///
/// Edits are sorted by `(start, end)` and spliced back to front, so the input order does not
/// matter. Overlapping edits (including two insertions at the same offset) are rejected.
pub fn apply_text_edits(text: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let mut edits = edits.to_vec();
    normalize_text_edits(text, &mut edits)?;

    let mut out = text.to_string();
    for edit in edits.iter().rev() {
        let start = u32::from(edit.range.start()) as usize;
        let end = u32::from(edit.range.end()) as usize;
        out.replace_range(start..end, &edit.replacement);
    }
    Ok(out)
}

/// Sort `edits` in place and validate them against `text`.
pub fn normalize_text_edits(text: &str, edits: &mut [TextEdit]) -> Result<(), EditError> {
    edits.sort_by_key(|e| (e.range.start(), e.range.end()));

    let text_len = TextSize::from(text.len() as u32);
    for edit in edits.iter() {
        if edit.range.end() > text_len {
            return Err(EditError::RangeOutOfBounds {
                range: edit.range,
                text_len,
            });
        }
        for offset in [edit.range.start(), edit.range.end()] {
            if !text.is_char_boundary(u32::from(offset) as usize) {
                return Err(EditError::InvalidUtf8Boundary { offset });
            }
        }
    }

    for pair in edits.windows(2) {
        let (first, second) = (pair[0].range, pair[1].range);
        let same_insertion_point = first.is_empty() && second.is_empty() && first == second;
        if first.end() > second.start() || same_insertion_point {
            return Err(EditError::OverlappingEdits { first, second });
        }
    }

    Ok(())
}
