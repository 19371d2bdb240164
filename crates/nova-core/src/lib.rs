//! Core shared types for the AI completion pipeline.
//!
//! This crate is intentionally small: text coordinates, edits, and a read-only
//! document snapshot that the pipeline resolves model output against.

mod document;
mod edit;
mod text;

pub use document::TextDocument;
pub use edit::{apply_text_edits, normalize_text_edits, EditError, TextEdit};
pub use text::{LineIndex, Position, Range, TextRange, TextSize};

use std::any::Any;

/// Best-effort rendering of a panic payload for logs.
///
/// `panic!("...")` produces `&'static str` payloads and formatted panics produce `String`;
/// everything else is reported as opaque.
pub fn panic_payload_to_str(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return message;
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.as_str();
    }
    "<non-string panic payload>"
}
