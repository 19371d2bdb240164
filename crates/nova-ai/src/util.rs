//! Text scanning helpers shared by the response parsers.

/// A fenced markdown block found in model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FencedBlock<'a> {
    /// Info string after the opening fence (for example `json` or `python`), possibly empty.
    pub(crate) lang: &'a str,
    /// Text between the fences, excluding both fence lines.
    pub(crate) body: &'a str,
    /// Byte offset of the opening fence line.
    pub(crate) start: usize,
    /// Byte offset just past the closing fence line (or the end of input if unterminated).
    pub(crate) end: usize,
}

/// Find the first fenced code block.
///
/// Any line whose trimmed form starts with three backticks opens or closes a fence. An
/// unterminated fence extends to the end of the text. The newline before the closing fence is
/// not part of the body.
pub(crate) fn first_fenced_block(raw: &str) -> Option<FencedBlock<'_>> {
    let mut offset = 0usize;
    let mut open: Option<(usize, usize, &str)> = None;

    for line in raw.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            match open {
                None => {
                    let lang = trimmed.trim_start_matches('`').trim();
                    open = Some((offset, offset + line.len(), lang));
                }
                Some((start, body_start, lang)) => {
                    let body = trim_one_newline(&raw[body_start..offset]);
                    return Some(FencedBlock {
                        lang,
                        body,
                        start,
                        end: offset + line.len(),
                    });
                }
            }
        }
        offset += line.len();
    }

    open.map(|(start, body_start, lang)| FencedBlock {
        lang,
        body: &raw[body_start.min(raw.len())..],
        start,
        end: raw.len(),
    })
}

fn trim_one_newline(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

/// Bracket-balanced regions of `raw` that open with `open` (`[` or `{`), in order of their start.
pub fn balanced_regions(raw: &str, open: char) -> impl Iterator<Item = &str> + '_ {
    raw.match_indices(open)
        .filter_map(move |(start, _)| find_matching_bracket(raw, start).map(|end| &raw[start..end]))
}

/// Given `raw[start]` is `[` or `{`, return the offset just past its matching closer.
///
/// Brackets inside JSON string literals are ignored. Mismatched nesting (`{[}`) yields `None`.
pub(crate) fn find_matching_bracket(raw: &str, start: usize) -> Option<usize> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for (rel_idx, ch) in raw.get(start..)?.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ']' | '}' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(start + rel_idx + 1);
                }
            }
            _ => {}
        }

        if rel_idx == 0 && stack.is_empty() {
            // `raw[start]` was not an opening bracket.
            return None;
        }
    }

    None
}
