//! Prompt construction for each completion strategy.

use std::fmt;
use std::str::FromStr;

use nova_core::{Position, TextDocument};
use serde::{Deserialize, Serialize};

use crate::fim::{FimTemplate, FimTemplateRegistry, TemplateSelection};
use crate::hint::HintShape;
use crate::ModelError;

/// Marker shown to the model where the cursor sits.
pub const CURSOR_MARKER: &str = "<|cursor|>";

const DEFAULT_CONTEXT_CHARS: usize = 1_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    PrefixSuffix,
    LineNumber,
    Chat,
    Fim,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::PrefixSuffix,
        Strategy::LineNumber,
        Strategy::Chat,
        Strategy::Fim,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::PrefixSuffix => "prefix-suffix",
            Strategy::LineNumber => "line-number",
            Strategy::Chat => "chat",
            Strategy::Fim => "fim",
        }
    }

    /// Element shape expected back, or `None` for free-form continuation strategies.
    pub fn hint_shape(self) -> Option<HintShape> {
        match self {
            Strategy::PrefixSuffix => Some(HintShape::PrefixSuffix),
            Strategy::LineNumber => Some(HintShape::LineRange),
            Strategy::Chat | Strategy::Fim => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy `{0}` (expected one of: prefix-suffix, line-number, chat, fim)")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| UnknownStrategy(s.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// A single completion-style prompt.
    Text(String),
    Chat(Vec<ChatMessage>),
}

impl Prompt {
    /// Total prompt characters, used for rough token estimates.
    pub fn char_len(&self) -> usize {
        match self {
            Prompt::Text(text) => text.chars().count(),
            Prompt::Chat(messages) => messages.iter().map(|m| m.content.chars().count()).sum(),
        }
    }
}

/// Text around the cursor, cut on line boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorWindow<'a> {
    pub before: &'a str,
    pub after: &'a str,
}

/// Builds prompts for every [`Strategy`].
///
/// Building is a pure function of the document, cursor and configuration.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    context_chars: usize,
    registry: FimTemplateRegistry,
    selection: TemplateSelection,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            context_chars: DEFAULT_CONTEXT_CHARS,
            registry: FimTemplateRegistry::builtin(),
            selection: TemplateSelection::Auto,
        }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    pub fn with_registry(mut self, registry: FimTemplateRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Fails for a named template the registry does not know.
    pub fn with_fim_selection(mut self, selection: TemplateSelection) -> Result<Self, ModelError> {
        self.registry.validate(&selection)?;
        self.selection = selection;
        Ok(self)
    }

    pub fn fim_template(&self, model_id: &str) -> Result<FimTemplate, ModelError> {
        self.registry.resolve(&self.selection, model_id)
    }

    /// Up to `context_chars` characters on each side of the cursor.
    ///
    /// The before-window starts at a line start and the after-window ends at a line end, unless
    /// that would leave the window empty while the cursor line itself is longer than the budget.
    pub fn window<'a>(&self, document: &'a TextDocument, cursor: Position) -> CursorWindow<'a> {
        let (before, after) = document.split_at(cursor);
        CursorWindow {
            before: tail_on_line_boundary(before, self.context_chars),
            after: head_on_line_boundary(after, self.context_chars),
        }
    }

    pub fn build(
        &self,
        document: &TextDocument,
        cursor: Position,
        strategy: Strategy,
        model_id: &str,
    ) -> Result<Prompt, ModelError> {
        let prompt = match strategy {
            Strategy::PrefixSuffix => Prompt::Text(self.prefix_suffix_prompt(document, cursor)),
            Strategy::LineNumber => Prompt::Text(line_number_prompt(document, cursor)),
            Strategy::Chat => Prompt::Chat(self.chat_prompt(document, cursor)),
            Strategy::Fim => {
                let window = self.window(document, cursor);
                let template = self.fim_template(model_id)?;
                Prompt::Text(template.build_prompt(window.before, window.after))
            }
        };
        Ok(prompt)
    }

    fn prefix_suffix_prompt(&self, document: &TextDocument, cursor: Position) -> String {
        let window = self.window(document, cursor);
        format!(
            "You are a code editing engine. Suggest the edits the developer most likely wants \
next, near the cursor marked {CURSOR_MARKER}.\n\
\n\
Return ONLY a JSON array. Each element describes one edit:\n\
{{\"prefix\": \"...\", \"existing\": \"...\", \"suffix\": \"...\", \"text\": \"...\", \"reason\": \"...\"}}\n\
- \"existing\" is the exact current text to replace; use \"\" to insert.\n\
- \"prefix\" is a short snippet (a few characters) immediately before \"existing\".\n\
- \"suffix\" is a short snippet immediately after \"existing\".\n\
- \"text\" is the new text. Do not use line numbers or offsets.\n\
Return [] if nothing should change.\n\
\n\
File: {name}\n\
```\n\
{before}{CURSOR_MARKER}{after}\n\
```\n",
            name = document.name(),
            before = window.before,
            after = window.after,
        )
    }

    fn chat_prompt(&self, document: &TextDocument, cursor: Position) -> Vec<ChatMessage> {
        let window = self.window(document, cursor);
        vec![
            ChatMessage::system(
                "You are an expert programmer completing code inside an editor. Reply with only \
the code to insert at the cursor: no explanations, no markdown fences, and do not repeat the code \
before the cursor.",
            ),
            ChatMessage::user(format!(
                "Complete the code at {CURSOR_MARKER} in {name}.\n\n{before}{CURSOR_MARKER}{after}",
                name = document.name(),
                before = window.before,
                after = window.after,
            )),
        ]
    }
}

fn line_number_prompt(document: &TextDocument, cursor: Position) -> String {
    let line_count = document.line_count();
    let width = line_count.to_string().len();
    let mut numbered = String::new();
    for line in 0..line_count {
        let text = document.line(line).unwrap_or_default();
        numbered.push_str(&format!("{:>width$} | {text}\n", line + 1));
    }

    format!(
        "You are a code editing engine. Suggest the edits the developer most likely wants next. \
The cursor is on line {cursor_line}.\n\
\n\
Return ONLY a JSON array. Each element replaces a range of whole lines:\n\
{{\"startLine\": 1, \"endLine\": 1, \"text\": \"...\", \"reason\": \"...\"}}\n\
- Lines are numbered from 1 as shown below; the range is inclusive.\n\
- \"text\" replaces those lines entirely. Do not include the line numbers.\n\
Return [] if nothing should change.\n\
\n\
File: {name}\n\
{numbered}",
        cursor_line = cursor.line + 1,
        name = document.name(),
    )
}

fn tail_on_line_boundary(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    let Some((cut, _)) = text.char_indices().rev().nth(max_chars - 1) else {
        return text;
    };
    let tail = &text[cut..];
    // Drop the partial first line, unless that is all there is.
    match tail.find('\n') {
        Some(nl) if nl + 1 < tail.len() => &tail[nl + 1..],
        _ => tail,
    }
}

fn head_on_line_boundary(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };
    let head = &text[..cut];
    match head.rfind('\n') {
        Some(nl) if nl > 0 => &head[..nl],
        _ => head,
    }
}
