//! Validated edit hints.
//!
//! Hints are only constructed by [`crate::extract_hints`]; holding one means the model output
//! matched the expected shape.

/// The element shape a prompt strategy asks the model to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintShape {
    /// `{prefix, existing, suffix, text, reason?}`
    PrefixSuffix,
    /// `{startLine, endLine, text, reason?}` with 1-indexed, inclusive lines.
    LineRange,
    /// `{text, reason?}`
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixSuffixHint {
    pub(crate) prefix: String,
    pub(crate) existing: String,
    pub(crate) suffix: String,
    pub(crate) text: String,
    pub(crate) reason: Option<String>,
}

impl PrefixSuffixHint {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn existing(&self) -> &str {
        &self.existing
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRangeHint {
    pub(crate) start_line: u32,
    pub(crate) end_line: u32,
    pub(crate) text: String,
    pub(crate) reason: Option<String>,
}

impl LineRangeHint {
    /// 1-indexed first line, as written by the model.
    pub fn start_line(&self) -> u32 {
        self.start_line
    }

    /// 1-indexed last line (inclusive), as written by the model.
    pub fn end_line(&self) -> u32 {
        self.end_line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineHint {
    pub(crate) text: String,
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hint {
    PrefixSuffix(PrefixSuffixHint),
    LineRange(LineRangeHint),
    Inline(InlineHint),
}

impl Hint {
    pub fn shape(&self) -> HintShape {
        match self {
            Hint::PrefixSuffix(_) => HintShape::PrefixSuffix,
            Hint::LineRange(_) => HintShape::LineRange,
            Hint::Inline(_) => HintShape::Inline,
        }
    }

    /// Replacement or insertion text.
    pub fn text(&self) -> &str {
        match self {
            Hint::PrefixSuffix(hint) => &hint.text,
            Hint::LineRange(hint) => &hint.text,
            Hint::Inline(hint) => &hint.text,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Hint::PrefixSuffix(hint) => hint.reason.as_deref(),
            Hint::LineRange(hint) => hint.reason.as_deref(),
            Hint::Inline(hint) => hint.reason.as_deref(),
        }
    }

    /// Whitespace-only text carries no edit.
    pub fn is_usable(&self) -> bool {
        !self.text().trim().is_empty()
    }
}
