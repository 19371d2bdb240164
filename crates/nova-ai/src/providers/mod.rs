//! Offline model clients.
//!
//! Network-backed providers are registered by the embedding application through
//! [`crate::ProviderRegistry::register`].

mod replay;
mod static_response;

pub use replay::ReplayClient;
pub use static_response::StaticClient;

use crate::cost::Usage;
use crate::prompt::Prompt;

/// Scripted responses starting with this prefix are returned as provider errors.
pub const ERROR_RESPONSE_PREFIX: &str = "error:";

/// Rough token count for offline clients (about four characters per token).
pub(crate) fn estimate_tokens(chars: usize) -> u64 {
    chars.div_ceil(4) as u64
}

pub(crate) fn estimated_usage(prompt: &Prompt, output: &str) -> Usage {
    Usage {
        input_tokens: estimate_tokens(prompt.char_len()),
        output_tokens: estimate_tokens(output.chars().count()),
        ..Usage::default()
    }
}
