use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use nova_config::ProviderConfig;

use super::{estimated_usage, ERROR_RESPONSE_PREFIX};
use crate::prompt::{Prompt, Strategy};
use crate::{GenerateOptions, Generation, ModelClient, ModelError};

#[derive(Debug, Default)]
struct Script {
    responses: Vec<String>,
    next: AtomicUsize,
}

impl Script {
    fn next(&self) -> Option<&str> {
        if self.responses.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.responses.len();
        Some(&self.responses[index])
    }
}

/// Answers from recorded responses, one script per strategy, cycling when exhausted.
///
/// A response beginning with `error:` is returned as a provider error carrying the rest of the
/// text, which lets recorded failures (such as an endpoint without FIM support) be replayed too.
#[derive(Debug, Default)]
pub struct ReplayClient {
    id: String,
    scripts: BTreeMap<Strategy, Script>,
}

impl ReplayClient {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scripts: BTreeMap::new(),
        }
    }

    pub fn with_responses<I, S>(mut self, strategy: Strategy, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripts.insert(
            strategy,
            Script {
                responses: responses.into_iter().map(Into::into).collect(),
                next: AtomicUsize::new(0),
            },
        );
        self
    }

    pub fn from_responses(id: impl Into<String>, responses: &BTreeMap<Strategy, Vec<String>>) -> Self {
        responses
            .iter()
            .fold(Self::new(id), |client, (strategy, texts)| {
                client.with_responses(*strategy, texts.iter().cloned())
            })
    }

    /// `[provider.options]` keys are strategy names; each value is a single scripted response.
    pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn ModelClient>, ModelError> {
        let mut client = Self::new(config.model.as_deref().unwrap_or("replay"));
        for (key, response) in &config.options {
            let strategy: Strategy = key
                .parse()
                .map_err(|err| ModelError::InvalidConfig(format!("provider.options: {err}")))?;
            client = client.with_responses(strategy, [response.clone()]);
        }
        Ok(Arc::new(client))
    }

    fn respond(&self, prompt: &Prompt, strategy: Strategy) -> Result<Generation, ModelError> {
        let text = self
            .scripts
            .get(&strategy)
            .and_then(Script::next)
            .ok_or_else(|| {
                ModelError::Provider(format!(
                    "no recorded response for strategy `{strategy}` in replay client `{}`",
                    self.id
                ))
            })?;

        if let Some(message) = text.strip_prefix(ERROR_RESPONSE_PREFIX) {
            return Err(ModelError::Provider(message.trim().to_owned()));
        }

        Ok(Generation {
            text: text.to_owned(),
            usage: Some(estimated_usage(prompt, text)),
        })
    }
}

impl ModelClient for ReplayClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn generate<'a>(
        &'a self,
        prompt: Prompt,
        options: GenerateOptions,
    ) -> BoxFuture<'a, Result<Generation, ModelError>> {
        Box::pin(async move { self.respond(&prompt, options.strategy) })
    }
}
