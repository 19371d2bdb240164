//! Resolving validated hints to exact document ranges.
//!
//! Prefix-suffix hints are located by content: the span must equal `existing`, be immediately
//! preceded by `prefix` and immediately followed by `suffix`. When several spans qualify, the one
//! starting nearest the cursor wins; ties (and calls without a cursor) pick the earliest.

use nova_core::{Position, TextDocument, TextRange, TextSize};

use crate::hint::{Hint, LineRangeHint, PrefixSuffixHint};
use crate::{Edit, PipelineError};

/// Resolve one hint. `None` means the hint cannot be placed (or carries no text).
pub fn resolve_hint(document: &TextDocument, hint: &Hint, cursor: Option<Position>) -> Option<Edit> {
    if !hint.is_usable() {
        return None;
    }

    let range = match hint {
        Hint::PrefixSuffix(hint) => {
            let cursor_offset = cursor.map(|pos| u32::from(document.offset_at(pos)) as usize);
            let (start, end) = find_anchored_span(document.text(), hint, cursor_offset)?;
            document.range_of(TextRange::new(
                TextSize::from(start as u32),
                TextSize::from(end as u32),
            ))
        }
        Hint::LineRange(hint) => line_range(document, hint),
        Hint::Inline(_) => {
            let cursor = document.position_at(document.offset_at(cursor?));
            nova_core::Range::point(cursor)
        }
    };

    let text = match hint {
        Hint::LineRange(_) => strip_trailing_newline(hint.text()),
        _ => hint.text(),
    };

    Some(Edit {
        range,
        text: text.to_owned(),
        reason: hint.reason().map(str::to_owned),
    })
}

/// Resolve a batch of hints.
///
/// Hints that cannot be placed, or that would overlap an earlier resolved edit, are dropped. If
/// there was at least one usable hint and none resolved, the batch fails with
/// [`PipelineError::ConversionFailed`].
pub fn resolve_hints(
    document: &TextDocument,
    hints: &[Hint],
    cursor: Option<Position>,
) -> Result<Vec<Edit>, PipelineError> {
    let attempted = hints.iter().filter(|hint| hint.is_usable()).count();
    let mut accepted: Vec<(TextRange, Edit)> = Vec::with_capacity(attempted);

    for hint in hints {
        let Some(edit) = resolve_hint(document, hint, cursor) else {
            if hint.is_usable() {
                tracing::debug!(
                    target: "nova.ai",
                    shape = ?hint.shape(),
                    "dropping hint that could not be anchored"
                );
            }
            continue;
        };
        let range = document.text_range(edit.range);
        if accepted.iter().any(|(other, _)| overlaps(*other, range)) {
            tracing::debug!(target: "nova.ai", ?range, "dropping hint overlapping an earlier edit");
            continue;
        }
        accepted.push((range, edit));
    }

    if attempted > 0 && accepted.is_empty() {
        return Err(PipelineError::ConversionFailed { attempted });
    }
    Ok(accepted.into_iter().map(|(_, edit)| edit).collect())
}

fn overlaps(a: TextRange, b: TextRange) -> bool {
    if a.is_empty() && b.is_empty() {
        return a.start() == b.start();
    }
    a.start() < b.end() && b.start() < a.end()
}

fn strip_trailing_newline(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

/// Whole-line replacement for a 1-indexed inclusive line range.
fn line_range(document: &TextDocument, hint: &LineRangeHint) -> nova_core::Range {
    let index = document.line_index();
    let last = index.last_line();
    let start = hint.start_line.saturating_sub(1).min(last);
    let end = hint.end_line.saturating_sub(1).min(last).max(start);

    let start_offset = index.line_start(start).unwrap_or_default();
    let end_offset = index.line_end(end).unwrap_or_else(|| index.text_len());
    document.range_of(TextRange::new(start_offset, end_offset))
}

/// Byte span `(start, end)` of the best anchored match for `hint`.
fn find_anchored_span(
    text: &str,
    hint: &PrefixSuffixHint,
    cursor: Option<usize>,
) -> Option<(usize, usize)> {
    let exact = (hint.prefix.as_str(), hint.suffix.as_str());
    let relaxed = (hint.prefix.trim_start(), hint.suffix.trim_end());

    let mut passes = vec![exact];
    if relaxed != exact {
        passes.push(relaxed);
    }

    passes.into_iter().find_map(|(prefix, suffix)| {
        let starts = candidate_starts(text, prefix, &hint.existing, suffix);
        let len = hint.existing.len();
        pick_nearest(starts, cursor).map(|start| (start, start + len))
    })
}

fn candidate_starts(text: &str, prefix: &str, existing: &str, suffix: &str) -> Vec<usize> {
    let mut starts = anchored_starts(text, prefix, existing, suffix);
    // A span edge between `\r` and `\n` has no position, so it cannot become an edit.
    starts.retain(|&start| {
        !splits_crlf(text, start) && !splits_crlf(text, start + existing.len())
    });
    starts
}

fn anchored_starts(text: &str, prefix: &str, existing: &str, suffix: &str) -> Vec<usize> {
    let is_anchored = |start: usize| {
        let end = start + existing.len();
        text[..start].ends_with(prefix) && text[end..].starts_with(suffix)
    };

    if !existing.is_empty() {
        return find_all(text, existing)
            .into_iter()
            .filter(|&start| is_anchored(start))
            .collect();
    }

    // Pure insertion: the point where `prefix` ends and `suffix` begins.
    if !prefix.is_empty() {
        find_all(text, prefix)
            .into_iter()
            .map(|start| start + prefix.len())
            .filter(|&point| is_anchored(point))
            .collect()
    } else if !suffix.is_empty() {
        find_all(text, suffix)
    } else {
        // No anchors at all: every boundary qualifies, so the tie-break decides.
        text.char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(text.len()))
            .collect()
    }
}

fn splits_crlf(text: &str, offset: usize) -> bool {
    text[..offset].ends_with('\r') && text[offset..].starts_with('\n')
}

/// Start offsets of every (possibly overlapping) occurrence of `needle`.
fn find_all(haystack: &str, needle: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut from = 0usize;
    while let Some(rel) = haystack[from..].find(needle) {
        let start = from + rel;
        out.push(start);
        let step = haystack[start..].chars().next().map_or(1, char::len_utf8);
        from = start + step;
    }
    out
}

fn pick_nearest(starts: Vec<usize>, cursor: Option<usize>) -> Option<usize> {
    match cursor {
        // `min_by_key` keeps the first minimum, and `starts` is ascending.
        Some(cursor) => starts.into_iter().min_by_key(|&start| start.abs_diff(cursor)),
        None => starts.into_iter().next(),
    }
}
