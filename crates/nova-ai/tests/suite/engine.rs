use std::sync::Arc;

use nova_ai::providers::StaticClient;
use nova_ai::{
    ClientCache, CompletionEngine, EditPreview, ModelClient, ParseErrorKind, PriceTable,
    ProviderRegistry, Strategy,
};
use nova_config::NovaAiConfig;
use nova_core::{Position, TextDocument};
use pretty_assertions::assert_eq;

const CONFIG: &str = r#"
[provider]
kind = "replay"
model = "qwen2.5-coder"

[provider.options]
fim = "'Hello, world!';<|endoftext|><|fim_pad|>"
line-number = '[{"startLine": 1, "endLine": 1, "text": "const msg = \"hi\";"}]'

[completion]
context_chars = 200

[pricing."qwen2.5-coder"]
input = 1.0
output = 2.0
"#;

fn document() -> TextDocument {
    TextDocument::new("greet.ts", "const msg = ;\nconsole.log(msg);\n")
}

#[tokio::test(flavor = "current_thread")]
async fn configured_replay_provider_drives_the_pipeline() {
    let config = NovaAiConfig::load_from_str(CONFIG).unwrap();
    let cache = ClientCache::new(ProviderRegistry::builtin());
    let client = cache.get_or_create(&config.provider).unwrap();
    assert_eq!(client.id(), "qwen2.5-coder");

    let engine = CompletionEngine::from_config(client, &config).unwrap();
    let doc = document();
    let cursor = Position::new(0, 12);

    let outcome = engine
        .try_generate(&doc, cursor, Strategy::Fim, "qwen2.5-coder")
        .await
        .unwrap();
    let completion = outcome.completion.unwrap();
    assert_eq!(completion.text, "'Hello, world!';");

    let edits = engine
        .try_next_edits(&doc, cursor, Strategy::LineNumber, "qwen2.5-coder")
        .await
        .unwrap();
    let preview = EditPreview::new(&doc, &edits).unwrap();
    assert_eq!(preview.after, "const msg = \"hi\";\nconsole.log(msg);\n");
    assert!(preview.diff.starts_with("--- a/greet.ts\n+++ b/greet.ts\n"));

    let prices = PriceTable::from_config(&config.pricing);
    let usage = outcome.usage.unwrap();
    let tokens = prices.token_usage("qwen2.5-coder", &usage);
    assert!(tokens.cost.unwrap() > 0.0);
}

#[tokio::test(flavor = "current_thread")]
async fn missing_recordings_are_generation_failures() {
    let config = NovaAiConfig::load_from_str(CONFIG).unwrap();
    let client = ProviderRegistry::builtin().build(&config.provider).unwrap();
    let engine = CompletionEngine::new(client);

    let err = engine
        .try_generate(&document(), Position::new(0, 12), Strategy::Chat, "m")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::GenerationFailed);
}

#[tokio::test(flavor = "current_thread")]
async fn inline_completion_uses_the_cursor_window() {
    let client = Arc::new(StaticClient::new("const msg = 'Hello, world!';"));
    let engine = CompletionEngine::new(client.clone());
    let doc = TextDocument::new("greet.ts", "const msg = '");

    let completion = engine
        .inline_completion(&doc, Position::new(0, 13), "gpt-3.5-turbo-instruct")
        .await
        .unwrap();
    assert_eq!(completion.text, "Hello, world!';");
    assert_eq!(client.calls(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn blank_replies_are_parse_failures() {
    for strategy in [Strategy::PrefixSuffix, Strategy::LineNumber] {
        let engine = CompletionEngine::new(Arc::new(StaticClient::new("  \n")));
        let err = engine
            .try_generate(&document(), Position::new(0, 12), strategy, "m")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::JsonParse, "{strategy}");
    }
}
