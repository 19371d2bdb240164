//! Optional quality scoring of successful generations.

use std::sync::Arc;

use futures::future::BoxFuture;
use nova_ai::{
    balanced_regions, strip_code_fence, ChatMessage, GenerateOptions, GenerationOutcome,
    ModelClient, Prompt, Strategy, CURSOR_MARKER,
};
use serde::Deserialize;

use crate::cases::TestCase;

pub const MAX_SCORE: f64 = 10.0;

/// What the critic gets to see for one run.
#[derive(Debug, Clone, Copy)]
pub struct Review<'a> {
    pub case: &'a TestCase,
    pub strategy: Strategy,
    pub outcome: &'a GenerationOutcome,
    /// Document text after applying the run's edits.
    pub after: &'a str,
}

pub trait Critic: Send + Sync {
    /// A score in `0..=10`, or `None` when no verdict could be obtained.
    fn score<'a>(&'a self, review: Review<'a>) -> BoxFuture<'a, Option<f64>>;
}

/// Asks a chat model for a `{"score": n}` verdict.
pub struct ModelCritic {
    client: Arc<dyn ModelClient>,
    model: String,
}

impl ModelCritic {
    pub fn new(client: Arc<dyn ModelClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn prompt(review: &Review<'_>) -> Prompt {
        let document = &review.case.document;
        let (before, after) = document.split_at(review.case.cursor);
        Prompt::Chat(vec![
            ChatMessage::system(
                "You grade code suggestions made by an editor assistant. Judge whether the change \
is correct, minimal and what the developer most likely wanted at the cursor. Reply with only a \
JSON object: {\"score\": <integer 0-10>}.",
            ),
            ChatMessage::user(format!(
                "File: {name}\n\nBefore (cursor at {CURSOR_MARKER}):\n```\n{before}{CURSOR_MARKER}{after}\n```\n\n\
After applying the suggestion:\n```\n{result}\n```",
                name = document.name(),
                result = review.after,
            )),
        ])
    }
}

impl Critic for ModelCritic {
    fn score<'a>(&'a self, review: Review<'a>) -> BoxFuture<'a, Option<f64>> {
        Box::pin(async move {
            let options = GenerateOptions {
                max_tokens: 32,
                temperature: 0.0,
                ..GenerateOptions::new(self.model.clone(), Strategy::Chat)
            };
            match self.client.generate(Self::prompt(&review), options).await {
                Ok(generation) => {
                    let score = parse_score(&generation.text);
                    if score.is_none() {
                        tracing::debug!(
                            target: "nova.ai.bench",
                            case = %review.case.name,
                            "critic reply had no usable score"
                        );
                    }
                    score
                }
                Err(err) => {
                    tracing::debug!(
                        target: "nova.ai.bench",
                        case = %review.case.name,
                        error = %err,
                        "critic request failed"
                    );
                    None
                }
            }
        })
    }
}

#[derive(Deserialize)]
struct Verdict {
    score: f64,
}

/// Read `{"score": n}` from a critic reply, tolerating fences and surrounding prose.
pub fn parse_score(raw: &str) -> Option<f64> {
    let body = strip_code_fence(raw).trim();
    let verdict = serde_json::from_str::<Verdict>(body).ok().or_else(|| {
        balanced_regions(body, '{').find_map(|region| serde_json::from_str::<Verdict>(region).ok())
    })?;
    (verdict.score.is_finite() && (0.0..=MAX_SCORE).contains(&verdict.score)).then_some(verdict.score)
}
