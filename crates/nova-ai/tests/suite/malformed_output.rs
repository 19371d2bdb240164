use nova_ai::{classify, extract_hints, HintShape, ParseErrorKind, PipelineError};
use pretty_assertions::assert_eq;

fn kind(raw: &str, shape: HintShape) -> ParseErrorKind {
    match extract_hints(raw, shape) {
        Ok(_) => ParseErrorKind::None,
        Err(err) => classify(&err),
    }
}

#[test]
fn garbage_is_a_parse_or_extraction_failure() {
    let kind = kind("this is not valid JSON {[}", HintShape::PrefixSuffix);
    assert!(
        matches!(kind, ParseErrorKind::JsonParse | ParseErrorKind::ExtractionFailed),
        "{kind}"
    );
}

#[test]
fn each_failure_maps_to_one_kind() {
    let cases = [
        ("no brackets at all", ParseErrorKind::ExtractionFailed),
        (r#"{"prefix": "a"}"#, ParseErrorKind::ExtractionFailed),
        ("Here you go: [1, 2,] and more", ParseErrorKind::JsonParse),
        ("Here you go: [1, 2,", ParseErrorKind::ExtractionFailed),
        (r#"[{"existing": "a", "suffix": "", "text": "b"}]"#, ParseErrorKind::SchemaInvalid),
        ("[]", ParseErrorKind::None),
        ("", ParseErrorKind::JsonParse),
        ("  \n\t", ParseErrorKind::JsonParse),
    ];
    for (raw, expected) in cases {
        assert_eq!(kind(raw, HintShape::PrefixSuffix), expected, "{raw:?}");
    }
}

#[test]
fn schema_errors_name_the_offending_element() {
    let raw = r#"```json
[{"startLine": 1, "endLine": 1, "text": "ok"}, {"startLine": -1, "endLine": 1, "text": "x"}]
```"#;
    let err = extract_hints(raw, HintShape::LineRange).unwrap_err();
    match err {
        PipelineError::SchemaInvalid { index, field, .. } => {
            assert_eq!(index, 1);
            assert_eq!(field, Some("startLine"));
        }
        other => panic!("expected a schema error, got {other}"),
    }
}

#[test]
fn blank_texts_are_valid_but_unusable() {
    let raw = r#"Sure! [{"text": "   "}, {"text": "x", "reason": "finish the call"}] Hope this helps."#;
    let extracted = extract_hints(raw, HintShape::Inline).unwrap();
    assert_eq!(extracted.total, 2);
    assert_eq!(extracted.hints.len(), 1);
    assert_eq!(extracted.hints[0].reason(), Some("finish the call"));
}
