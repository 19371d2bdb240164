//! Fill-in-the-middle prompt templates and response cleaning.

use std::collections::BTreeMap;

use nova_config::FimConfig;
use serde::{Deserialize, Serialize};

use crate::util::first_fenced_block;
use crate::ModelError;

/// Sentinel tokens framing a FIM prompt: `{prefix}{before}{suffix}{after}{middle}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FimTemplate {
    pub prefix: String,
    pub suffix: String,
    pub middle: String,
    /// Tokens that end the middle section. Anything from the first one onwards is discarded.
    #[serde(default)]
    pub stop: Vec<String>,
}

impl FimTemplate {
    pub fn new(
        prefix: impl Into<String>,
        suffix: impl Into<String>,
        middle: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            middle: middle.into(),
            stop: Vec::new(),
        }
    }

    pub fn with_stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop = stop.into_iter().map(Into::into).collect();
        self
    }

    pub fn build_prompt(&self, before: &str, after: &str) -> String {
        let mut out = String::with_capacity(
            self.prefix.len() + before.len() + self.suffix.len() + after.len() + self.middle.len(),
        );
        out.push_str(&self.prefix);
        out.push_str(before);
        out.push_str(&self.suffix);
        out.push_str(after);
        out.push_str(&self.middle);
        out
    }
}

/// Model families with the lowercase markers that identify them. Checked in order; the first
/// family with a matching marker wins.
const FAMILY_MARKERS: &[(&str, &[&str])] = &[
    ("deepseek", &["deepseek"]),
    ("codellama", &["codellama", "code-llama", "code_llama"]),
    ("qwen", &["qwen"]),
    ("starcoder", &["starcoder", "bigcode", "santacoder"]),
];

const DEFAULT_TEMPLATE: &str = "openai";

/// How to pick a template for a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TemplateSelection {
    /// Detect from the model id.
    #[default]
    Auto,
    /// A registered template name (case-insensitive).
    Named(String),
    Custom(FimTemplate),
}

impl TemplateSelection {
    pub fn from_config(config: &FimConfig) -> Self {
        if let Some(custom) = &config.custom {
            return TemplateSelection::Custom(
                FimTemplate::new(&custom.prefix, &custom.suffix, &custom.middle)
                    .with_stop(custom.stop.iter().cloned()),
            );
        }
        match &config.template {
            Some(name) if !name.trim().is_empty() => TemplateSelection::Named(name.trim().to_owned()),
            _ => TemplateSelection::Auto,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FimTemplateRegistry {
    templates: BTreeMap<String, FimTemplate>,
}

impl Default for FimTemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FimTemplateRegistry {
    /// Registry holding the five built-in templates.
    pub fn builtin() -> Self {
        let qwen_style = FimTemplate::new("<|fim_prefix|>", "<|fim_suffix|>", "<|fim_middle|>");

        let mut templates = BTreeMap::new();
        templates.insert(
            "openai".to_owned(),
            qwen_style.clone().with_stop(["<|endoftext|>", "<|fim_pad|>"]),
        );
        templates.insert(
            "qwen".to_owned(),
            qwen_style.with_stop(["<|endoftext|>", "<|fim_pad|>", "<|file_sep|>", "<|im_end|>"]),
        );
        templates.insert(
            "starcoder".to_owned(),
            FimTemplate::new("<fim_prefix>", "<fim_suffix>", "<fim_middle>")
                .with_stop(["<|endoftext|>", "<file_sep>"]),
        );
        templates.insert(
            "codellama".to_owned(),
            FimTemplate::new("<PRE> ", " <SUF>", " <MID>").with_stop(["<EOT>"]),
        );
        templates.insert(
            "deepseek".to_owned(),
            FimTemplate::new("<｜fim▁begin｜>", "<｜fim▁hole｜>", "<｜fim▁end｜>")
                .with_stop(["<｜end▁of▁sentence｜>", "<|EOT|>"]),
        );
        Self { templates }
    }

    /// Add or replace a template. Names are stored lowercase.
    pub fn register(&mut self, name: &str, template: FimTemplate) {
        self.templates.insert(name.to_ascii_lowercase(), template);
    }

    pub fn get(&self, name: &str) -> Option<&FimTemplate> {
        self.templates.get(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Name of the template family for `model_id`. Falls back to `openai`.
    pub fn detect_name(model_id: &str) -> &'static str {
        let model = model_id.to_ascii_lowercase();
        FAMILY_MARKERS
            .iter()
            .find(|(_, markers)| markers.iter().any(|marker| model.contains(marker)))
            .map_or(DEFAULT_TEMPLATE, |(name, _)| *name)
    }

    pub fn detect(&self, model_id: &str) -> Option<&FimTemplate> {
        self.get(Self::detect_name(model_id))
            .or_else(|| self.get(DEFAULT_TEMPLATE))
    }

    /// Check a selection up front so prompt building cannot fail later.
    pub fn validate(&self, selection: &TemplateSelection) -> Result<(), ModelError> {
        match selection {
            TemplateSelection::Named(name) if self.get(name).is_none() => {
                Err(ModelError::InvalidConfig(format!(
                    "unknown FIM template `{name}` (known: {})",
                    self.names().collect::<Vec<_>>().join(", ")
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn resolve(
        &self,
        selection: &TemplateSelection,
        model_id: &str,
    ) -> Result<FimTemplate, ModelError> {
        self.validate(selection)?;
        let template = match selection {
            TemplateSelection::Custom(template) => Some(template),
            TemplateSelection::Named(name) => self.get(name),
            TemplateSelection::Auto => self.detect(model_id),
        };
        template.cloned().ok_or_else(|| {
            ModelError::InvalidConfig(format!("no FIM template available for `{model_id}`"))
        })
    }
}

/// Clean a raw FIM (or chat continuation) response.
///
/// 1. Everything from the first stop token of `template` onwards is dropped.
/// 2. If the response starts with the exact prompt prefix (the model echoed it), that leading
///    copy is removed. An echo anywhere else is left alone.
/// 3. Otherwise a response wrapped in a markdown fence is unwrapped.
///
/// A whitespace-only result becomes empty. Cleaning a clean response returns it unchanged.
pub fn clean_fim_response(raw: &str, prompt_prefix: &str, template: Option<&FimTemplate>) -> String {
    let mut text: &str = raw;

    if let Some(template) = template {
        if let Some(cut) = template
            .stop
            .iter()
            .filter(|stop| !stop.is_empty())
            .filter_map(|stop| text.find(stop.as_str()))
            .min()
        {
            text = &text[..cut];
        }
    }

    if !prompt_prefix.is_empty() && text.starts_with(prompt_prefix) {
        text = &text[prompt_prefix.len()..];
    } else if text.trim_start().starts_with("```") {
        if let Some(block) = first_fenced_block(text) {
            text = block.body;
        }
    }

    if text.trim().is_empty() {
        String::new()
    } else {
        text.to_owned()
    }
}
