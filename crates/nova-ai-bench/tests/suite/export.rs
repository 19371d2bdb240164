use std::sync::Arc;

use futures::future::BoxFuture;
use nova_ai::{GenerationOutcome, PipelineError, Strategy};
use nova_ai_bench::{
    export_json, parse_cases, write_export, BenchmarkPlan, BenchmarkReport, BenchmarkRunner,
    Generator, TestCase,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

/// Chat succeeds, everything else fails to parse.
struct ChatOnly;

impl Generator for ChatOnly {
    fn generate<'a>(
        &'a self,
        _case: &'a TestCase,
        _model: &'a str,
        strategy: Strategy,
    ) -> BoxFuture<'a, Result<GenerationOutcome, PipelineError>> {
        Box::pin(async move {
            if strategy != Strategy::Chat {
                return Err(PipelineError::JsonParse("trailing comma".into()));
            }
            Ok(GenerationOutcome {
                strategy,
                raw: "42".to_owned(),
                edits: Vec::new(),
                completion: None,
                hint_count: 0,
                valid_hint_count: 0,
                usage: None,
            })
        })
    }
}

async fn report() -> BenchmarkReport {
    let cases = parse_cases(r#"[{"name": "only", "document": "let x = <|cursor|>;"}]"#).unwrap();
    let plan = BenchmarkPlan::cross(
        &["m".to_owned()],
        &[Strategy::Chat, Strategy::LineNumber],
        cases,
        3,
        2,
    );
    BenchmarkRunner::new(Arc::new(ChatOnly)).run(&plan).await
}

#[tokio::test(flavor = "current_thread")]
async fn export_is_keyed_by_model_and_strategy() {
    let report = report().await;
    let json = export_json(&report).unwrap();
    assert!(json.ends_with("}\n"));

    let value: Value = serde_json::from_str(&json).unwrap();
    let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["m:chat", "m:line-number"]);

    assert_eq!(value["m:chat"]["parse_success_rate"], 100.0);
    assert_eq!(value["m:chat"]["strategy"], "chat");
    assert_eq!(value["m:line-number"]["parse_success_rate"], 0.0);
    assert_eq!(value["m:line-number"]["error_counts"]["json_parse"], 3);
    assert_eq!(value["m:line-number"]["avg_score"], Value::Null);
}

#[tokio::test(flavor = "current_thread")]
async fn write_export_creates_parent_directories() {
    let report = report().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results").join("nested").join("bench.json");

    write_export(&path, &report).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, export_json(&report).unwrap());
}
