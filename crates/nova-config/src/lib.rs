//! Configuration for the AI completion pipeline and its benchmark harness.
//!
//! Configs are TOML files. Every section is optional; a missing section falls back to its
//! `Default` so `NovaAiConfig::load_from_str("")` is a valid, fully-defaulted config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;

mod validation;

pub use validation::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};

/// Env var consulted by [`NovaAiConfig::discover`] when no explicit path is given.
pub const NOVA_AI_CONFIG_ENV_VAR: &str = "NOVA_AI_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NovaAiConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub fim: FimConfig,

    /// Per-model token prices, keyed by model id.
    #[serde(default)]
    pub pricing: BTreeMap<String, PricingConfig>,

    #[serde(default)]
    pub bench: BenchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,

    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to this file as well. If it cannot be opened, file logging is skipped.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            level @ ("trace" | "debug" | "info" | "error") => level.to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// The effective filter: configured directives, with `RUST_LOG` appended when set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        match env_directives {
            Some(env_directives) => {
                let config_directives = Self::normalize_level_directives(&self.level);
                tracing_subscriber::EnvFilter::try_new(format!(
                    "{config_directives},{env_directives}"
                ))
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&env_directives))
                .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

/// Which model client to build and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider id looked up in the provider registry (for example `replay`).
    #[serde(default = "ProviderConfig::default_kind")]
    pub kind: String,

    /// Default model id when none is given on the command line.
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Provider-specific options passed through untouched.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ProviderConfig {
    fn default_kind() -> String {
        "replay".to_owned()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: Self::default_kind(),
            model: None,
            endpoint: None,
            api_key: None,
            options: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionConfig {
    /// Characters of context kept on each side of the cursor for windowed prompts.
    #[serde(default = "CompletionConfig::default_context_chars")]
    pub context_chars: usize,

    #[serde(default = "CompletionConfig::default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,
}

impl CompletionConfig {
    fn default_context_chars() -> usize {
        1_500
    }

    fn default_max_tokens() -> u32 {
        512
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            context_chars: Self::default_context_chars(),
            max_tokens: Self::default_max_tokens(),
            temperature: 0.0,
        }
    }
}

/// FIM template selection. `template` names a built-in; `custom` supplies literal tokens.
/// Neither set means auto-detection from the model id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FimConfig {
    #[serde(default)]
    pub template: Option<String>,

    #[serde(default)]
    pub custom: Option<CustomFimTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomFimTemplate {
    pub prefix: String,
    pub suffix: String,
    pub middle: String,
    #[serde(default)]
    pub stop: Vec<String>,
}

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    pub input: f64,
    pub output: f64,
    #[serde(default)]
    pub cached_input: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    #[serde(default = "BenchConfig::default_runs")]
    pub runs: usize,

    /// Maximum number of generations in flight at once.
    #[serde(default = "BenchConfig::default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub models: Vec<String>,

    /// Strategy names (`prefix-suffix`, `line-number`, `chat`, `fim`). Empty means all.
    #[serde(default)]
    pub strategies: Vec<String>,

    /// Model used to score generations. Unset disables scoring.
    #[serde(default)]
    pub critic_model: Option<String>,

    #[serde(default)]
    pub preview: bool,
}

impl BenchConfig {
    fn default_runs() -> usize {
        1
    }

    fn default_concurrency() -> usize {
        4
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            runs: Self::default_runs(),
            concurrency: Self::default_concurrency(),
            models: Vec::new(),
            strategies: Vec::new(),
            critic_model: None,
            preview: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid config: {0}")]
    Invalid(ValidationDiagnostics),
}

/// Redact user-provided values from a TOML error message.
///
/// Messages like `invalid type: string "sk-...", expected a boolean` echo config values back, and
/// `provider.api_key` is a secret. Quoted substrings and backticked values are replaced.
fn sanitize_toml_error_message(message: &str) -> String {
    static QUOTED_RE: OnceLock<regex::Regex> = OnceLock::new();
    static BACKTICK_VALUE_RE: OnceLock<regex::Regex> = OnceLock::new();

    let quoted = QUOTED_RE.get_or_init(|| {
        regex::Regex::new(r#""(?:\\.|[^"\\])*"|'(?:\\.|[^'\\])*'"#)
            .expect("quoted-string regex should compile")
    });
    let out = quoted.replace_all(message, "\"<redacted>\"");

    // `missing field `foo`` names a schema field and is kept.
    let backtick = BACKTICK_VALUE_RE.get_or_init(|| {
        regex::Regex::new(r"(unknown field|unknown variant|invalid type: \w+|invalid value: \w+) `[^`]*`")
            .expect("backtick regex should compile")
    });
    backtick.replace_all(&out, "$1 `<redacted>`").into_owned()
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // `Display` includes a source snippet; keep only the message.
        ConfigError::Toml(sanitize_toml_error_message(err.message()))
    }
}

impl NovaAiConfig {
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: NovaAiConfig = toml::from_str(text)?;
        let diagnostics = config.validate();
        for warning in &diagnostics.warnings {
            tracing::warn!(target: "nova.config", warning = %warning, "config warning");
        }
        if !diagnostics.errors.is_empty() {
            return Err(ConfigError::Invalid(diagnostics));
        }
        Ok(config)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    /// Load from `path`, else from `$NOVA_AI_CONFIG_PATH`, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }
        match std::env::var_os(NOVA_AI_CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load_from_path(PathBuf::from(path)),
            _ => Ok(Self::default()),
        }
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the global `tracing` subscriber.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        let file = config.file.as_ref().and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
        let file_open_failed = config.file.is_some() && file.is_none();

        // Without any sink the subscriber still filters; events are simply dropped.
        let mut make_writer = BoxMakeWriter::new(std::io::sink);
        if config.stderr {
            // `cargo test` only captures stdlib printing; `TestWriter` keeps debug-build tests quiet.
            make_writer = if cfg!(debug_assertions) {
                BoxMakeWriter::new(
                    make_writer.and(tracing_subscriber::fmt::writer::TestWriter::with_stderr),
                )
            } else {
                BoxMakeWriter::new(make_writer.and(std::io::stderr))
            };
        }
        if let Some(file) = file {
            make_writer = BoxMakeWriter::new(make_writer.and(Mutex::new(file)));
        }

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() && file_open_failed {
            if let Some(path) = config.file.as_ref() {
                tracing::warn!(
                    target: "nova.config",
                    path = %path.display(),
                    "failed to open log file; file logging disabled"
                );
            }
        }
    });
}
