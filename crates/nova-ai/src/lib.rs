//! `nova-ai` turns free-form model output into precise document edits.
//!
//! The pipeline builds a prompt for one of several [`Strategy`]s, calls a [`ModelClient`],
//! extracts and validates structured [`Hint`]s from the raw text, anchors them in the live
//! document and classifies anything that goes wrong into a [`ParseErrorKind`]. Model transport is
//! not part of this crate: providers plug in through [`ProviderRegistry`].

mod anchor;
mod completion;
mod cost;
mod diff;
mod edit;
mod error;
mod extract;
mod fim;
mod hint;
mod prompt;
mod provider;
pub mod providers;
mod timing;
mod util;

pub use anchor::{resolve_hint, resolve_hints};
pub use completion::{CompletionEngine, GenerationOutcome};
pub use cost::{ModelPricing, PriceTable, TokenUsage, Usage};
pub use diff::{unified_diff, EditPreview};
pub use edit::{apply_edit, apply_edits, Completion, Edit};
pub use error::{
    classify, classify_message, classify_model_error, classify_outcome,
    is_unsupported_prompt_message, ModelError, ParseErrorKind, PipelineError,
};
pub use extract::{extract_hints, strip_code_fence, ExtractedHints};
pub use fim::{clean_fim_response, FimTemplate, FimTemplateRegistry, TemplateSelection};
pub use hint::{Hint, HintShape, InlineHint, LineRangeHint, PrefixSuffixHint};
pub use prompt::{
    ChatMessage, ChatRole, CursorWindow, Prompt, PromptBuilder, Strategy, UnknownStrategy,
    CURSOR_MARKER,
};
pub use provider::{
    ClientCache, GenerateOptions, Generation, ModelClient, ProviderConstructor, ProviderRegistry,
};
pub use timing::Stopwatch;
pub use util::balanced_regions;
