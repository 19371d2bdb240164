//! Turning raw model text into validated [`Hint`]s.
//!
//! Models wrap JSON in markdown fences, surround it with prose, or return something else
//! entirely. Extraction is lenient about the wrapping and strict about the payload: every array
//! element must match the requested shape or the whole batch is rejected.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::hint::{Hint, HintShape, InlineHint, LineRangeHint, PrefixSuffixHint};
use crate::util::{find_matching_bracket, first_fenced_block};
use crate::PipelineError;

// Bound the heuristic scan on pathological outputs (long prose full of brackets).
const MAX_EMBEDDED_CANDIDATES: usize = 64;

/// Result of a successful extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedHints {
    /// Usable hints, in the order the model returned them.
    pub hints: Vec<Hint>,
    /// Number of array elements seen, including ones dropped for whitespace-only text.
    pub total: usize,
}

/// Extract and validate hints of `shape` from raw model output.
///
/// An empty array is a valid, empty result. Blank output is not JSON and fails to parse.
pub fn extract_hints(raw: &str, shape: HintShape) -> Result<ExtractedHints, PipelineError> {
    let items = extract_json_array(raw)?;

    let total = items.len();
    let mut hints = Vec::with_capacity(total);
    for (index, item) in items.into_iter().enumerate() {
        let hint = validate_item(index, item, shape)?;
        if hint.is_usable() {
            hints.push(hint);
        }
    }

    tracing::trace!(
        target: "nova.ai",
        total,
        usable = hints.len(),
        "extracted hints from model output"
    );
    Ok(ExtractedHints { hints, total })
}

/// Strip a surrounding markdown fence, if any, and return the fenced body.
pub fn strip_code_fence(raw: &str) -> &str {
    match first_fenced_block(raw) {
        Some(block) => block.body,
        None => raw,
    }
}

/// Locate the JSON array in `raw`.
fn extract_json_array(raw: &str) -> Result<Vec<Value>, PipelineError> {
    let payload = strip_code_fence(raw).trim();
    if payload.is_empty() {
        return Err(PipelineError::JsonParse("model output is empty".to_owned()));
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(items)) => return Ok(items),
        Ok(other) => {
            return Err(PipelineError::ExtractionFailed(format!(
                "expected a JSON array, found {}",
                value_kind(&other)
            )))
        }
        Err(_) => {}
    }

    scan_embedded_array(raw)
}

/// Heuristic scan for a bracket-balanced JSON array embedded in prose.
///
/// Arrays are preferred over objects. A parsed object is reported as the wrong payload type;
/// balanced candidates that never parse are reported as invalid JSON.
fn scan_embedded_array(raw: &str) -> Result<Vec<Value>, PipelineError> {
    let mut last_parse_error: Option<serde_json::Error> = None;
    let mut found_object = false;

    for open in ['[', '{'] {
        let candidates = raw
            .match_indices(open)
            .take(MAX_EMBEDDED_CANDIDATES)
            .filter_map(|(start, _)| find_matching_bracket(raw, start).map(|end| (start, end)));

        for (start, end) in candidates {
            let mut de = serde_json::Deserializer::from_str(&raw[start..end]);
            match Value::deserialize(&mut de) {
                Ok(Value::Array(items)) => return Ok(items),
                Ok(_) => found_object = true,
                Err(err) => last_parse_error = Some(err),
            }
        }
    }

    if found_object {
        return Err(PipelineError::ExtractionFailed(
            "expected a JSON array, found object".to_owned(),
        ));
    }
    match last_parse_error {
        Some(err) => Err(PipelineError::JsonParse(err.to_string())),
        None => Err(PipelineError::ExtractionFailed(
            "no JSON payload found in model output".to_owned(),
        )),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn validate_item(index: usize, item: Value, shape: HintShape) -> Result<Hint, PipelineError> {
    let Value::Object(mut obj) = item else {
        return Err(PipelineError::SchemaInvalid {
            index,
            field: None,
            message: format!("expected an object, found {}", value_kind(&item)),
        });
    };

    let hint = match shape {
        HintShape::PrefixSuffix => Hint::PrefixSuffix(PrefixSuffixHint {
            prefix: take_string(&mut obj, index, "prefix")?,
            existing: take_string(&mut obj, index, "existing")?,
            suffix: take_string(&mut obj, index, "suffix")?,
            text: take_string(&mut obj, index, "text")?,
            reason: take_reason(&mut obj, index)?,
        }),
        HintShape::LineRange => Hint::LineRange(LineRangeHint {
            start_line: take_line(&mut obj, index, "startLine")?,
            end_line: take_line(&mut obj, index, "endLine")?,
            text: take_string(&mut obj, index, "text")?,
            reason: take_reason(&mut obj, index)?,
        }),
        HintShape::Inline => Hint::Inline(InlineHint {
            text: take_string(&mut obj, index, "text")?,
            reason: take_reason(&mut obj, index)?,
        }),
    };
    Ok(hint)
}

fn schema_error(index: usize, field: &'static str, message: &str) -> PipelineError {
    PipelineError::SchemaInvalid {
        index,
        field: Some(field),
        message: format!("`{field}` {message}"),
    }
}

fn take_string(
    obj: &mut Map<String, Value>,
    index: usize,
    field: &'static str,
) -> Result<String, PipelineError> {
    match obj.remove(field) {
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(schema_error(index, field, "must be a string")),
        None => Err(schema_error(index, field, "is required")),
    }
}

fn take_line(
    obj: &mut Map<String, Value>,
    index: usize,
    field: &'static str,
) -> Result<u32, PipelineError> {
    let value = obj
        .remove(field)
        .ok_or_else(|| schema_error(index, field, "is required"))?;
    value
        .as_u64()
        .and_then(|line| u32::try_from(line).ok())
        .ok_or_else(|| schema_error(index, field, "must be a non-negative integer"))
}

fn take_reason(obj: &mut Map<String, Value>, index: usize) -> Result<Option<String>, PipelineError> {
    match obj.remove("reason") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(reason)) => Ok(Some(reason)),
        Some(_) => Err(schema_error(index, "reason", "must be a string when present")),
    }
}
