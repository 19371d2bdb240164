//! Human-readable previews of resolved edits.

use nova_core::{EditError, TextDocument};
use similar::TextDiff;

use crate::{apply_edits, Edit};

/// Unified diff between two snapshots, with `a/label` and `b/label` headers and three lines of
/// context. Identical inputs produce an empty string.
pub fn unified_diff(before: &str, after: &str, label: &str) -> String {
    if before == after {
        return String::new();
    }

    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{label}"), &format!("b/{label}"))
        .to_string()
}

/// The document after applying a set of edits, with its diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPreview {
    pub after: String,
    pub diff: String,
    pub edit_count: usize,
}

impl EditPreview {
    pub fn new(document: &TextDocument, edits: &[Edit]) -> Result<Self, EditError> {
        let after = apply_edits(document, edits)?;
        let diff = unified_diff(document.text(), &after, document.name());
        Ok(Self {
            after,
            diff,
            edit_count: edits.len(),
        })
    }

    pub fn is_noop(&self) -> bool {
        self.diff.is_empty()
    }
}
