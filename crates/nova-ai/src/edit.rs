//! Resolved edits and inline completions, and applying them to a document.

use nova_core::{apply_text_edits, EditError, Range, TextDocument, TextEdit};
use serde::Serialize;

/// A single replacement in document coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub range: Range,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// An inline suggestion, inserted at the cursor it was requested for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Completion {
    pub fn into_edit(self, cursor: nova_core::Position) -> Edit {
        Edit {
            range: Range::point(cursor),
            text: self.text,
            reason: self.reason,
        }
    }
}

/// Apply one edit. Out-of-range positions clamp to the document, so this cannot fail.
pub fn apply_edit(document: &TextDocument, edit: &Edit) -> String {
    let range = document.text_range(edit.range);
    let mut out = document.text().to_owned();
    out.replace_range(
        u32::from(range.start()) as usize..u32::from(range.end()) as usize,
        &edit.text,
    );
    out
}

/// Apply several edits at once. Fails only if two edits overlap.
pub fn apply_edits(document: &TextDocument, edits: &[Edit]) -> Result<String, EditError> {
    let edits: Vec<TextEdit> = edits
        .iter()
        .map(|edit| TextEdit::new(document.text_range(edit.range), edit.text.clone()))
        .collect();
    apply_text_edits(document.text(), &edits)
}
