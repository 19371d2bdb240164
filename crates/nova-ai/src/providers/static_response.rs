use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use nova_config::ProviderConfig;

use super::estimated_usage;
use crate::prompt::Prompt;
use crate::{GenerateOptions, Generation, ModelClient, ModelError};

/// Returns the same response (or the same error) for every request.
#[derive(Debug)]
pub struct StaticClient {
    id: String,
    response: Result<String, String>,
    calls: AtomicUsize,
}

impl StaticClient {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: "static".to_owned(),
            response: Ok(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every request fails with a provider error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            id: "static".to_owned(),
            response: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Reads `[provider.options] text` or `error`.
    pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn ModelClient>, ModelError> {
        let client = match (config.options.get("text"), config.options.get("error")) {
            (Some(_), Some(_)) => {
                return Err(ModelError::InvalidConfig(
                    "static provider takes either `text` or `error`, not both".to_owned(),
                ))
            }
            (_, Some(error)) => Self::failing(error.clone()),
            (text, None) => Self::new(text.cloned().unwrap_or_default()),
        };
        let id = config.model.as_deref().unwrap_or("static");
        Ok(Arc::new(client.with_id(id)))
    }
}

impl ModelClient for StaticClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn generate<'a>(
        &'a self,
        prompt: Prompt,
        _options: GenerateOptions,
    ) -> BoxFuture<'a, Result<Generation, ModelError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.response {
            Ok(text) => Ok(Generation {
                usage: Some(estimated_usage(&prompt, text)),
                text: text.clone(),
            }),
            Err(message) => Err(ModelError::Provider(message.clone())),
        };
        Box::pin(futures::future::ready(result))
    }
}
