//! Benchmark test cases.
//!
//! A case file is a JSON array:
//!
//! ```json
//! [
//!   {
//!     "name": "greeting",
//!     "file": "greet.ts",
//!     "document": "const msg = '<|cursor|>';",
//!     "responses": { "fim": "Hello, world!" }
//!   }
//! ]
//! ```
//!
//! The cursor is either an explicit `{"line", "character"}` object or a single `<|cursor|>`
//! marker inside `document` (removed on load). `responses` holds recorded model output per
//! strategy, a string or a list of strings, used when running against the `replay` provider.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use nova_ai::{Strategy, CURSOR_MARKER};
use nova_core::{Position, TextDocument, TextSize};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub document: TextDocument,
    pub cursor: Position,
    pub responses: BTreeMap<Strategy, Vec<String>>,
}

#[derive(Debug, Error)]
pub enum CaseLoadError {
    #[error("failed to read test cases from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid test case file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("test case file contains no cases")]
    Empty,
    #[error("duplicate test case name `{0}`")]
    DuplicateName(String),
    #[error("test case `{0}` has no cursor (add `cursor` or a `<|cursor|>` marker)")]
    MissingCursor(String),
    #[error("test case `{0}` has more than one cursor")]
    AmbiguousCursor(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCase {
    name: String,
    #[serde(default)]
    file: Option<String>,
    document: String,
    #[serde(default)]
    cursor: Option<Position>,
    #[serde(default)]
    responses: BTreeMap<Strategy, OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(text) => vec![text],
            OneOrMany::Many(texts) => texts,
        }
    }
}

pub fn load_cases(path: impl AsRef<Path>) -> Result<Vec<TestCase>, CaseLoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| CaseLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cases = parse_cases(&text)?;
    tracing::debug!(
        target: "nova.ai.bench",
        path = %path.display(),
        cases = cases.len(),
        "loaded test cases"
    );
    Ok(cases)
}

pub fn parse_cases(json: &str) -> Result<Vec<TestCase>, CaseLoadError> {
    let raw: Vec<RawCase> = serde_json::from_str(json)?;
    if raw.is_empty() {
        return Err(CaseLoadError::Empty);
    }

    let mut seen = HashSet::new();
    let mut cases = Vec::with_capacity(raw.len());
    for case in raw {
        if !seen.insert(case.name.clone()) {
            return Err(CaseLoadError::DuplicateName(case.name));
        }
        cases.push(case.into_test_case()?);
    }
    Ok(cases)
}

impl RawCase {
    fn into_test_case(self) -> Result<TestCase, CaseLoadError> {
        let file = self.file.unwrap_or_else(|| self.name.clone());
        let markers = self.document.matches(CURSOR_MARKER).count();

        let (document, cursor) = match (self.cursor, markers) {
            (Some(cursor), 0) => (TextDocument::new(file, self.document), cursor),
            (None, 1) => {
                let offset = self.document.find(CURSOR_MARKER).unwrap_or_default();
                let text = self.document.replacen(CURSOR_MARKER, "", 1);
                let document = TextDocument::new(file, text);
                let cursor = document.position_at(TextSize::from(offset as u32));
                (document, cursor)
            }
            (None, 0) => return Err(CaseLoadError::MissingCursor(self.name)),
            _ => return Err(CaseLoadError::AmbiguousCursor(self.name)),
        };

        Ok(TestCase {
            name: self.name,
            document,
            cursor,
            responses: self
                .responses
                .into_iter()
                .map(|(strategy, texts)| (strategy, texts.into_vec()))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cursor_marker_is_removed_and_located() {
        let cases = parse_cases(
            r#"[{"name": "a", "document": "x = 1\ny = <|cursor|>2", "responses": {"chat": "3"}}]"#,
        )
        .unwrap();
        let case = &cases[0];
        assert_eq!(case.document.text(), "x = 1\ny = 2");
        assert_eq!(case.cursor, Position::new(1, 4));
        assert_eq!(case.document.name(), "a");
        assert_eq!(case.responses[&Strategy::Chat], vec!["3".to_owned()]);
    }

    #[test]
    fn explicit_cursor_and_response_lists() {
        let cases = parse_cases(
            r#"[{
                "name": "b",
                "file": "b.py",
                "document": "pass\n",
                "cursor": {"line": 0, "character": 4},
                "responses": {"line-number": ["[]", "not json"]}
            }]"#,
        )
        .unwrap();
        assert_eq!(cases[0].cursor, Position::new(0, 4));
        assert_eq!(cases[0].document.name(), "b.py");
        assert_eq!(cases[0].responses[&Strategy::LineNumber].len(), 2);
    }

    #[test]
    fn rejects_bad_files() {
        assert!(matches!(parse_cases("[]"), Err(CaseLoadError::Empty)));
        assert!(matches!(
            parse_cases(r#"[{"name": "a", "document": "x"}]"#),
            Err(CaseLoadError::MissingCursor(name)) if name == "a"
        ));
        assert!(matches!(
            parse_cases(r#"[{"name": "a", "document": "<|cursor|>x<|cursor|>"}]"#),
            Err(CaseLoadError::AmbiguousCursor(_))
        ));
        assert!(matches!(
            parse_cases(
                r#"[{"name": "a", "document": "<|cursor|>"}, {"name": "a", "document": "<|cursor|>"}]"#
            ),
            Err(CaseLoadError::DuplicateName(_))
        ));
        assert!(matches!(
            parse_cases(r#"[{"name": "a", "document": "<|cursor|>", "responses": {"diff": "x"}}]"#),
            Err(CaseLoadError::Json(_))
        ));
    }
}
