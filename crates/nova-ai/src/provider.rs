//! The model-invocation seam and the registry of statically known providers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use nova_config::ProviderConfig;

use crate::cost::Usage;
use crate::prompt::{Prompt, Strategy};
use crate::providers::{ReplayClient, StaticClient};
use crate::ModelError;

/// Per-request generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub model: String,
    pub strategy: Strategy,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Extra stop sequences (FIM template stop tokens, for example).
    pub stop: Vec<String>,
}

impl GenerateOptions {
    pub fn new(model: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            model: model.into(),
            strategy,
            max_tokens: 512,
            temperature: 0.2,
            stop: Vec::new(),
        }
    }
}

/// Raw model output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Generation {
    pub text: String,
    pub usage: Option<Usage>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// A model backend. Implementations own transport, retries and per-call timeouts.
pub trait ModelClient: Send + Sync {
    /// Provider id, used in logs.
    fn id(&self) -> &str;

    fn generate<'a>(
        &'a self,
        prompt: Prompt,
        options: GenerateOptions,
    ) -> BoxFuture<'a, Result<Generation, ModelError>>;
}

impl fmt::Debug for dyn ModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClient").field("id", &self.id()).finish()
    }
}

pub type ProviderConstructor = fn(&ProviderConfig) -> Result<Arc<dyn ModelClient>, ModelError>;

/// Maps provider ids (`[provider] kind`) to constructors.
#[derive(Clone)]
pub struct ProviderRegistry {
    constructors: BTreeMap<String, ProviderConstructor>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// The offline providers shipped with the crate: `replay` and `static`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("replay", ReplayClient::from_config);
        registry.register("static", StaticClient::from_config);
        registry
    }

    pub fn register(&mut self, id: &str, constructor: ProviderConstructor) {
        self.constructors
            .insert(id.trim().to_ascii_lowercase(), constructor);
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn ModelClient>, ModelError> {
        let id = config.kind.trim().to_ascii_lowercase();
        let constructor = self
            .constructors
            .get(&id)
            .ok_or_else(|| ModelError::UnknownProvider(config.kind.clone()))?;
        tracing::debug!(target: "nova.ai", provider = %id, model = ?config.model, "building model client");
        constructor(config)
    }
}

/// Clients built from a [`ProviderRegistry`], reused per `(kind, model)`.
///
/// Create one per process (or per test) and pass it by reference.
#[derive(Debug)]
pub struct ClientCache {
    registry: ProviderRegistry,
    clients: Mutex<HashMap<String, Arc<dyn ModelClient>>>,
}

impl ClientCache {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn get_or_create(&self, config: &ProviderConfig) -> Result<Arc<dyn ModelClient>, ModelError> {
        let key = format!(
            "{}:{}",
            config.kind.trim().to_ascii_lowercase(),
            config.model.as_deref().unwrap_or_default()
        );

        let mut clients = self.clients.lock().unwrap_or_else(|err| err.into_inner());
        if let Some(client) = clients.get(&key) {
            return Ok(Arc::clone(client));
        }
        let client = self.registry.build(config)?;
        clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.clients
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clear();
    }
}
