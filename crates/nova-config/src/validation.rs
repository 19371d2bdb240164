use std::fmt;

use crate::{LoggingConfig, NovaAiConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    InvalidValue { toml_path: String, message: String },
    FimTemplateConflict,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValidationError::InvalidValue { toml_path, message } => {
                write!(f, "{toml_path}: {message}")
            }
            ConfigValidationError::FimTemplateConflict => {
                f.write_str("fim.template and fim.custom are mutually exclusive")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    LoggingLevelInvalid { value: String },
    UnpricedModel { model: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::LoggingLevelInvalid { value } => {
                write!(f, "logging.level {value:?} is not a valid filter; using info")
            }
            ConfigWarning::UnpricedModel { model } => {
                write!(f, "bench model {model:?} has no [pricing] entry; costs will be omitted")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationDiagnostics {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigWarning>,
}

impl fmt::Display for ValidationDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, error) in self.errors.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl NovaAiConfig {
    /// Check semantic invariants serde cannot express.
    ///
    /// Reports every problem found rather than stopping at the first.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();
        validate_logging(self, &mut out);
        validate_provider(self, &mut out);
        validate_fim(self, &mut out);
        validate_pricing(self, &mut out);
        validate_bench(self, &mut out);
        out
    }
}

fn invalid(out: &mut ValidationDiagnostics, toml_path: impl Into<String>, message: &str) {
    out.errors.push(ConfigValidationError::InvalidValue {
        toml_path: toml_path.into(),
        message: message.to_owned(),
    });
}

fn validate_logging(config: &NovaAiConfig, out: &mut ValidationDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&config.logging.level);
    if tracing_subscriber::EnvFilter::try_new(normalized).is_err() {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: config.logging.level.clone(),
        });
    }
}

fn validate_provider(config: &NovaAiConfig, out: &mut ValidationDiagnostics) {
    if config.provider.kind.trim().is_empty() {
        invalid(out, "provider.kind", "must not be empty");
    }
}

fn validate_fim(config: &NovaAiConfig, out: &mut ValidationDiagnostics) {
    if config.fim.template.is_some() && config.fim.custom.is_some() {
        out.errors.push(ConfigValidationError::FimTemplateConflict);
    }
    if let Some(custom) = &config.fim.custom {
        for (field, value) in [
            ("prefix", &custom.prefix),
            ("suffix", &custom.suffix),
            ("middle", &custom.middle),
        ] {
            if value.is_empty() {
                invalid(out, format!("fim.custom.{field}"), "must not be empty");
            }
        }
    }
}

fn validate_pricing(config: &NovaAiConfig, out: &mut ValidationDiagnostics) {
    for (model, price) in &config.pricing {
        let fields = [
            ("input", Some(price.input)),
            ("output", Some(price.output)),
            ("cached_input", price.cached_input),
        ];
        for (field, value) in fields {
            if matches!(value, Some(v) if !(v.is_finite() && v >= 0.0)) {
                invalid(
                    out,
                    format!("pricing.{model}.{field}"),
                    "must be a non-negative number",
                );
            }
        }
    }
    for model in &config.bench.models {
        if !config.pricing.contains_key(model) {
            out.warnings.push(ConfigWarning::UnpricedModel {
                model: model.clone(),
            });
        }
    }
}

fn validate_bench(config: &NovaAiConfig, out: &mut ValidationDiagnostics) {
    if config.bench.runs == 0 {
        invalid(out, "bench.runs", "must be >= 1");
    }
    if config.bench.concurrency == 0 {
        invalid(out, "bench.concurrency", "must be >= 1");
    }
}
