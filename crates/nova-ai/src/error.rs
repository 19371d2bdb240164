use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy recorded for every generation.
///
/// A failed generation maps to exactly one kind; a successful one to [`ParseErrorKind::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    JsonParse,
    ExtractionFailed,
    SchemaInvalid,
    ConversionFailed,
    GenerationFailed,
    UnsupportedPrompt,
    None,
}

impl ParseErrorKind {
    pub const ALL: [ParseErrorKind; 7] = [
        ParseErrorKind::JsonParse,
        ParseErrorKind::ExtractionFailed,
        ParseErrorKind::SchemaInvalid,
        ParseErrorKind::ConversionFailed,
        ParseErrorKind::GenerationFailed,
        ParseErrorKind::UnsupportedPrompt,
        ParseErrorKind::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParseErrorKind::JsonParse => "json_parse",
            ParseErrorKind::ExtractionFailed => "extraction_failed",
            ParseErrorKind::SchemaInvalid => "schema_invalid",
            ParseErrorKind::ConversionFailed => "conversion_failed",
            ParseErrorKind::GenerationFailed => "generation_failed",
            ParseErrorKind::UnsupportedPrompt => "unsupported_prompt",
            ParseErrorKind::None => "none",
        }
    }

    pub fn is_failure(self) -> bool {
        self != ParseErrorKind::None
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a [`crate::ModelClient`] or while constructing one.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("model request timed out")]
    Timeout,
    #[error("model provider error: {0}")]
    Provider(String),
    #[error("unknown model provider `{0}`")]
    UnknownProvider(String),
    #[error("invalid provider config: {0}")]
    InvalidConfig(String),
    #[error("model call panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("model output is not valid JSON: {0}")]
    JsonParse(String),
    #[error("could not extract a JSON array from model output: {0}")]
    ExtractionFailed(String),
    #[error("hint {index} does not match the expected shape: {message}")]
    SchemaInvalid {
        index: usize,
        field: Option<&'static str>,
        message: String,
    },
    #[error("none of the {attempted} hint(s) could be anchored in the document")]
    ConversionFailed { attempted: usize },
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl PipelineError {
    pub fn kind(&self) -> ParseErrorKind {
        classify(self)
    }
}

/// Substrings providers use to say a prompt style is not available for a model.
///
/// Matched case-insensitively. A hit means "retry through the chat interface".
const UNSUPPORTED_PROMPT_MARKERS: &[&str] = &[
    "does not support completion",
    "does not support fim",
    "endpoint not found",
    "not supported in the v1/completions endpoint",
    "no endpoints found",
    "suffix is not supported",
    "fim is not supported",
    "is not a completion model",
];

pub fn is_unsupported_prompt_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    UNSUPPORTED_PROMPT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

pub fn classify(err: &PipelineError) -> ParseErrorKind {
    match err {
        PipelineError::JsonParse(_) => ParseErrorKind::JsonParse,
        PipelineError::ExtractionFailed(_) => ParseErrorKind::ExtractionFailed,
        PipelineError::SchemaInvalid { .. } => ParseErrorKind::SchemaInvalid,
        PipelineError::ConversionFailed { .. } => ParseErrorKind::ConversionFailed,
        PipelineError::Model(err) => classify_model_error(err),
    }
}

pub fn classify_model_error(err: &ModelError) -> ParseErrorKind {
    match err {
        ModelError::Provider(message) => classify_message(message),
        ModelError::Timeout
        | ModelError::UnknownProvider(_)
        | ModelError::InvalidConfig(_)
        | ModelError::Panicked(_) => ParseErrorKind::GenerationFailed,
    }
}

/// Classify a provider failure known only by its message.
pub fn classify_message(message: &str) -> ParseErrorKind {
    if is_unsupported_prompt_message(message) {
        ParseErrorKind::UnsupportedPrompt
    } else {
        ParseErrorKind::GenerationFailed
    }
}

pub fn classify_outcome<T>(outcome: &Result<T, PipelineError>) -> ParseErrorKind {
    match outcome {
        Ok(_) => ParseErrorKind::None,
        Err(err) => classify(err),
    }
}
