//! End-to-end completion: prompt, model call, extraction and anchoring.

use std::sync::Arc;
use std::time::Duration;

use nova_config::NovaAiConfig;
use nova_core::{Position, TextDocument};

use crate::anchor::resolve_hints;
use crate::cost::Usage;
use crate::extract::extract_hints;
use crate::fim::{clean_fim_response, TemplateSelection};
use crate::prompt::{PromptBuilder, Strategy};
use crate::timing::Stopwatch;
use crate::{
    Completion, Edit, GenerateOptions, Generation, ModelClient, ModelError, ParseErrorKind,
    PipelineError,
};

/// Everything one generation produced, successful or not at the edit level.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub strategy: Strategy,
    /// Raw model text before any cleaning.
    pub raw: String,
    pub edits: Vec<Edit>,
    /// The cleaned continuation for chat and FIM strategies.
    pub completion: Option<Completion>,
    /// Hints (or continuations) the model returned.
    pub hint_count: usize,
    /// Of those, how many became edits.
    pub valid_hint_count: usize,
    pub usage: Option<Usage>,
}

pub struct CompletionEngine {
    client: Arc<dyn ModelClient>,
    builder: PromptBuilder,
    max_tokens: u32,
    temperature: f32,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for CompletionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionEngine")
            .field("client", &self.client.id())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CompletionEngine {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            builder: PromptBuilder::new(),
            max_tokens: 512,
            temperature: 0.2,
            timeout: None,
        }
    }

    /// Engine configured from `[completion]` and `[fim]`.
    pub fn from_config(client: Arc<dyn ModelClient>, config: &NovaAiConfig) -> Result<Self, ModelError> {
        let builder = PromptBuilder::new()
            .with_context_chars(config.completion.context_chars)
            .with_fim_selection(TemplateSelection::from_config(&config.fim))?;
        Ok(Self::new(client)
            .with_prompt_builder(builder)
            .with_max_tokens(config.completion.max_tokens)
            .with_temperature(config.completion.temperature))
    }

    pub fn with_prompt_builder(mut self, builder: PromptBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Fail a model call with [`ModelError::Timeout`] after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn client(&self) -> &Arc<dyn ModelClient> {
        &self.client
    }

    pub fn prompt_builder(&self) -> &PromptBuilder {
        &self.builder
    }

    /// Run one generation with `strategy` and turn the output into edits.
    pub async fn try_generate(
        &self,
        document: &TextDocument,
        cursor: Position,
        strategy: Strategy,
        model: &str,
    ) -> Result<GenerationOutcome, PipelineError> {
        let prompt = self.builder.build(document, cursor, strategy, model)?;
        let stop = match strategy {
            Strategy::Fim => self.builder.fim_template(model)?.stop,
            _ => Vec::new(),
        };
        let generation = self.call(prompt, strategy, model, stop).await?;

        match strategy.hint_shape() {
            Some(shape) => {
                let extracted = extract_hints(&generation.text, shape)?;
                let edits = resolve_hints(document, &extracted.hints, Some(cursor))?;
                Ok(GenerationOutcome {
                    strategy,
                    hint_count: extracted.total,
                    valid_hint_count: edits.len(),
                    edits,
                    completion: None,
                    raw: generation.text,
                    usage: generation.usage,
                })
            }
            None => {
                let completion =
                    self.clean_continuation(document, cursor, strategy, model, &generation.text)?;
                let edits: Vec<Edit> = completion
                    .iter()
                    .cloned()
                    .map(|completion| completion.into_edit(cursor))
                    .collect();
                Ok(GenerationOutcome {
                    strategy,
                    hint_count: edits.len(),
                    valid_hint_count: edits.len(),
                    edits,
                    completion,
                    raw: generation.text,
                    usage: generation.usage,
                })
            }
        }
    }

    /// Next-edit suggestions. Continuation strategies yield at most one insertion at the cursor.
    pub async fn try_next_edits(
        &self,
        document: &TextDocument,
        cursor: Position,
        strategy: Strategy,
        model: &str,
    ) -> Result<Vec<Edit>, PipelineError> {
        Ok(self.try_generate(document, cursor, strategy, model).await?.edits)
    }

    /// Like [`Self::try_next_edits`], but any failure degrades to no edits.
    pub async fn next_edits(
        &self,
        document: &TextDocument,
        cursor: Position,
        strategy: Strategy,
        model: &str,
    ) -> Vec<Edit> {
        match self.try_next_edits(document, cursor, strategy, model).await {
            Ok(edits) => edits,
            Err(err) => {
                tracing::debug!(
                    target: "nova.ai",
                    model,
                    strategy = %strategy,
                    kind = %err.kind(),
                    error = %err,
                    "next-edit request failed"
                );
                Vec::new()
            }
        }
    }

    /// FIM completion. An endpoint without FIM support surfaces as an
    /// [`ParseErrorKind::UnsupportedPrompt`] error so the caller can fall back to chat.
    pub async fn try_fim_completion(
        &self,
        document: &TextDocument,
        cursor: Position,
        model: &str,
    ) -> Result<Option<Completion>, PipelineError> {
        Ok(self
            .try_generate(document, cursor, Strategy::Fim, model)
            .await?
            .completion)
    }

    pub async fn try_chat_completion(
        &self,
        document: &TextDocument,
        cursor: Position,
        model: &str,
    ) -> Result<Option<Completion>, PipelineError> {
        Ok(self
            .try_generate(document, cursor, Strategy::Chat, model)
            .await?
            .completion)
    }

    /// FIM first, then chat if the model does not accept FIM prompts.
    pub async fn try_inline_completion(
        &self,
        document: &TextDocument,
        cursor: Position,
        model: &str,
    ) -> Result<Option<Completion>, PipelineError> {
        match self.try_fim_completion(document, cursor, model).await {
            Err(err) if err.kind() == ParseErrorKind::UnsupportedPrompt => {
                tracing::debug!(
                    target: "nova.ai",
                    model,
                    error = %err,
                    "FIM prompt not supported; retrying as chat"
                );
                self.try_chat_completion(document, cursor, model).await
            }
            other => other,
        }
    }

    /// Inline completion for the editor. Failures are logged and yield `None`.
    pub async fn inline_completion(
        &self,
        document: &TextDocument,
        cursor: Position,
        model: &str,
    ) -> Option<Completion> {
        match self.try_inline_completion(document, cursor, model).await {
            Ok(completion) => completion,
            Err(err) => {
                tracing::debug!(
                    target: "nova.ai",
                    model,
                    kind = %err.kind(),
                    error = %err,
                    "inline completion failed"
                );
                None
            }
        }
    }

    async fn call(
        &self,
        prompt: crate::Prompt,
        strategy: Strategy,
        model: &str,
        stop: Vec<String>,
    ) -> Result<Generation, ModelError> {
        let options = GenerateOptions {
            model: model.to_owned(),
            strategy,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stop,
        };

        let mut watch = Stopwatch::start("model call");
        let request = self.client.generate(prompt, options);
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, request)
                .await
                .unwrap_or(Err(ModelError::Timeout)),
            None => request.await,
        };
        let elapsed = watch.stop();

        tracing::debug!(
            target: "nova.ai",
            provider = self.client.id(),
            model,
            strategy = %strategy,
            latency_ms = elapsed.as_secs_f64() * 1_000.0,
            ok = result.is_ok(),
            "model call finished"
        );
        result
    }

    fn clean_continuation(
        &self,
        document: &TextDocument,
        cursor: Position,
        strategy: Strategy,
        model: &str,
        raw: &str,
    ) -> Result<Option<Completion>, ModelError> {
        let window = self.builder.window(document, cursor);
        let template = match strategy {
            Strategy::Fim => Some(self.builder.fim_template(model)?),
            _ => None,
        };
        let text = clean_fim_response(raw, window.before, template.as_ref());
        Ok((!text.is_empty()).then_some(Completion { text, reason: None }))
    }
}
