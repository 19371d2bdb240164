use std::sync::Arc;

use futures::future::BoxFuture;
use nova_ai::{ParseErrorKind, Strategy};
use nova_ai_bench::{
    load_cases, parse_cases, report, BenchmarkPlan, BenchmarkRunner, Critic, EngineGenerator,
    Review,
};
use nova_config::NovaAiConfig;
use pretty_assertions::assert_eq;

const CASES: &str = r#"[
  {
    "name": "literal",
    "file": "main.ts",
    "document": "const x = 1;<|cursor|>\n",
    "responses": {
      "prefix-suffix": "```json\n[{\"prefix\": \"const x = \", \"existing\": \"1\", \"suffix\": \";\", \"text\": \"42\"}]\n```",
      "line-number": "Sure, here is the edit: [{\"startLine\": 1, \"endLine\": 1, \"text\": \"const x = 42;\"}]",
      "chat": "this is not valid JSON {[}",
      "fim": "error: This model does not support FIM requests"
    }
  },
  {
    "name": "greeting",
    "file": "greet.ts",
    "document": "const msg = '<|cursor|>",
    "responses": {
      "prefix-suffix": ["[]", "not json at all"],
      "line-number": "[{\"startLine\": 1, \"endLine\": 1}]",
      "chat": "const msg = 'Hello, world!';",
      "fim": "Hello, world!';<|endoftext|>"
    }
  }
]"#;

struct FixedCritic(f64);

impl Critic for FixedCritic {
    fn score<'a>(&'a self, _review: Review<'a>) -> BoxFuture<'a, Option<f64>> {
        Box::pin(futures::future::ready(Some(self.0)))
    }
}

#[tokio::test(flavor = "current_thread")]
async fn replayed_cases_exercise_every_strategy() {
    let config = NovaAiConfig::default();
    let generator = Arc::new(EngineGenerator::replay(&config).unwrap());
    let runner = BenchmarkRunner::new(generator).with_critic(Arc::new(FixedCritic(8.0)));
    let plan = BenchmarkPlan::cross(
        &["gpt-4o-mini".to_owned()],
        &Strategy::ALL,
        parse_cases(CASES).unwrap(),
        2,
        3,
    );
    let report = runner.run(&plan).await;

    let by_strategy = |strategy: Strategy| {
        report
            .approaches
            .iter()
            .find(|result| result.approach.strategy == strategy)
            .unwrap()
    };

    // literal succeeds twice; greeting alternates between an empty array and prose.
    let prefix_suffix = by_strategy(Strategy::PrefixSuffix);
    assert_eq!(prefix_suffix.summary.successes, 3);
    assert_eq!(
        prefix_suffix.summary.error_counts[&ParseErrorKind::ExtractionFailed],
        1
    );
    assert_eq!(prefix_suffix.summary.avg_score, Some(8.0));
    assert_eq!(prefix_suffix.previews.len(), 1);
    assert!(prefix_suffix.previews[0]
        .diff
        .contains("-const x = 1;\n+const x = 42;\n"));

    let line_number = by_strategy(Strategy::LineNumber);
    assert_eq!(line_number.summary.successes, 2);
    assert_eq!(
        line_number.summary.error_counts[&ParseErrorKind::SchemaInvalid],
        2
    );

    let chat = by_strategy(Strategy::Chat);
    assert_eq!(chat.summary.successes, 4);
    assert_eq!(chat.previews.len(), 2);

    let fim = by_strategy(Strategy::Fim);
    assert_eq!(
        fim.summary.error_counts[&ParseErrorKind::UnsupportedPrompt],
        2
    );
    assert_eq!(fim.summary.successes, 2);

    let table = report::render_approaches(&report);
    assert!(table.contains("gpt-4o-mini:prefix-suffix"), "{table}");
    assert!(table.contains("unsupported_prompt=2"), "{table}");
}

#[tokio::test(flavor = "current_thread")]
async fn duplicate_blocks_resolve_near_the_cursor() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/cases.json");
    let cases = load_cases(&path).unwrap();
    let generator = Arc::new(EngineGenerator::replay(&NovaAiConfig::default()).unwrap());
    let plan = BenchmarkPlan::cross(
        &["qwen2.5-coder".to_owned()],
        &[Strategy::PrefixSuffix, Strategy::LineNumber],
        cases,
        1,
        2,
    );
    let report = BenchmarkRunner::new(generator).run(&plan).await;

    // `return True` closes three validators; the anchors admit two, the cursor picks the phone one.
    let prefix_suffix = &report.approaches[0];
    assert_eq!(prefix_suffix.summary.successes, 1);
    let diff = &prefix_suffix.previews[0].diff;
    assert_eq!(diff.matches("-    return True\n").count(), 1, "{diff}");
    assert!(diff.contains("     if '@' not in phone:\n"), "{diff}");
    assert!(diff.contains("+    return phone.replace('-', '').isdigit()\n"), "{diff}");

    let line_number = &report.approaches[1];
    assert_eq!(line_number.summary.successes, 1);
    assert!(line_number.previews[0]
        .diff
        .contains("-    if '@' not in phone:\n+    if not phone.replace('-', '').isdigit():\n"));
}
