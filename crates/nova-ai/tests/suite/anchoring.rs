use nova_ai::{apply_edit, apply_edits, extract_hints, resolve_hint, resolve_hints, HintShape};
use nova_core::{Position, TextDocument, TextSize};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn prefix_suffix_hint(prefix: &str, existing: &str, suffix: &str, text: &str) -> nova_ai::Hint {
    let raw = json!([{ "prefix": prefix, "existing": existing, "suffix": suffix, "text": text }]);
    extract_hints(&raw.to_string(), HintShape::PrefixSuffix)
        .unwrap()
        .hints
        .remove(0)
}

#[test]
fn replaces_the_anchored_literal() {
    let doc = TextDocument::new("main.ts", "const x = 1;");
    let hint = prefix_suffix_hint("const x = ", "1", ";", "42");
    let edit = resolve_hint(&doc, &hint, None).unwrap();
    assert_eq!(apply_edit(&doc, &edit), "const x = 42;");
}

#[test]
fn duplicate_anchors_resolve_nearest_the_cursor() {
    let doc = TextDocument::new("a.py", "x = 1\ny = 2\nx = 1\n");
    let hint = prefix_suffix_hint("x = ", "1", "\n", "9");

    let near_end = resolve_hint(&doc, &hint, Some(Position::new(2, 0))).unwrap();
    assert_eq!(apply_edit(&doc, &near_end), "x = 1\ny = 2\nx = 9\n");

    let without_cursor = resolve_hint(&doc, &hint, None).unwrap();
    assert_eq!(apply_edit(&doc, &without_cursor), "x = 9\ny = 2\nx = 1\n");
}

#[test]
fn whitespace_padded_anchors_fall_back_to_trimmed_matching() {
    let doc = TextDocument::new("a.rs", "let a = 1;\n");
    let hint = prefix_suffix_hint("\n  let a = ", "1", ";  \n\n", "2");
    let edit = resolve_hint(&doc, &hint, None).unwrap();
    assert_eq!(apply_edit(&doc, &edit), "let a = 2;\n");
}

#[test]
fn line_ranges_are_one_indexed_and_clamped() {
    let doc = TextDocument::new("a.py", "one\ntwo\nthree\n");
    let raw = json!([
        { "startLine": 2, "endLine": 2, "text": "TWO\n" },
    ])
    .to_string();
    let hints = extract_hints(&raw, HintShape::LineRange).unwrap().hints;
    let edits = resolve_hints(&doc, &hints, None).unwrap();
    assert_eq!(apply_edits(&doc, &edits).unwrap(), "one\nTWO\nthree\n");

    // Line 0 is read as line 1; an end before the start collapses onto the start; lines past the
    // end clamp to the last line.
    let raw = json!([
        { "startLine": 0, "endLine": 0, "text": "ONE" },
        { "startLine": 99, "endLine": 3, "text": "END" },
    ])
    .to_string();
    let hints = extract_hints(&raw, HintShape::LineRange).unwrap().hints;
    let edits = resolve_hints(&doc, &hints, None).unwrap();
    assert_eq!(apply_edits(&doc, &edits).unwrap(), "ONE\ntwo\nthree\nEND");
}

#[test]
fn batches_with_no_placeable_hint_fail_as_conversion() {
    let doc = TextDocument::new("a.ts", "let y = 2;");
    let hint = prefix_suffix_hint("const x = ", "1", ";", "42");
    let err = resolve_hints(&doc, &[hint], None).unwrap_err();
    assert_eq!(err.kind(), nova_ai::ParseErrorKind::ConversionFailed);

    // Nothing usable is not a failure.
    assert_eq!(resolve_hints(&doc, &[], None).unwrap(), vec![]);
}

fn document_and_span() -> impl Strategy<Value = (String, usize, usize)> {
    "[a-c \r\n;=]{1,48}".prop_flat_map(|text| {
        let len = text.len();
        (Just(text), 0..=len, 0..=len).prop_map(|(text, a, b)| (text, a.min(b), a.max(b)))
    })
}

fn splits_crlf(text: &str, offset: usize) -> bool {
    text[..offset].ends_with('\r') && text[offset..].starts_with('\n')
}

proptest! {
    #[test]
    fn anchored_spans_always_equal_existing(
        (text, start, end) in document_and_span(),
        context in 0usize..6,
    ) {
        let prefix = &text[start.saturating_sub(context)..start];
        let existing = &text[start..end];
        let suffix = &text[end..(end + context).min(text.len())];
        let doc = TextDocument::new("gen.txt", text.clone());
        let hint = prefix_suffix_hint(prefix, existing, suffix, "X");

        let cursor = doc.position_at(TextSize::from(start as u32));
        let edit = resolve_hint(&doc, &hint, Some(cursor));
        let representable = !splits_crlf(&text, start) && !splits_crlf(&text, end);
        if representable {
            prop_assert!(edit.is_some());
        }
        let Some(edit) = edit else {
            return Ok(());
        };
        prop_assert_eq!(doc.get_text(Some(edit.range)), existing);
        if representable {
            prop_assert_eq!(edit.range.start, cursor);
        }

        // Resolved edits always apply, and replace exactly `existing`.
        let range = doc.text_range(edit.range);
        let expected = format!(
            "{}X{}",
            &text[..usize::from(range.start())],
            &text[usize::from(range.end())..]
        );
        let after = apply_edits(&doc, &[edit]);
        prop_assert_eq!(after.ok(), Some(expected));
    }
}
