use nova_config::{ConfigError, ConfigValidationError, NovaAiConfig};
use pretty_assertions::assert_eq;

#[test]
fn full_config_round_trips_through_toml() {
    let text = r#"
[logging]
level = "nova.ai=debug"
json = true

[provider]
kind = "replay"
model = "starcoder2-15b"

[provider.options]
region = "eu"

[completion]
context_chars = 800
max_tokens = 128

[fim]
template = "starcoder"

[pricing.gpt-4o-mini]
input = 0.15
output = 0.6
cached_input = 0.075

[bench]
runs = 5
concurrency = 2
models = ["gpt-4o-mini"]
strategies = ["prefix-suffix", "fim"]
critic_model = "gpt-4o"
preview = true
"#;

    let config = NovaAiConfig::load_from_str(text).expect("config should parse");
    assert_eq!(config.logging.level, "nova.ai=debug");
    assert!(config.logging.json);
    assert_eq!(config.provider.model.as_deref(), Some("starcoder2-15b"));
    assert_eq!(config.provider.options["region"], "eu");
    assert_eq!(config.completion.context_chars, 800);
    assert_eq!(config.fim.template.as_deref(), Some("starcoder"));
    assert_eq!(config.pricing["gpt-4o-mini"].cached_input, Some(0.075));
    assert_eq!(config.bench.runs, 5);
    assert_eq!(config.bench.strategies, vec!["prefix-suffix", "fim"]);
    assert_eq!(config.bench.critic_model.as_deref(), Some("gpt-4o"));

    let reserialized = toml::to_string(&config).expect("serialize");
    assert_eq!(NovaAiConfig::load_from_str(&reserialized).unwrap(), config);
}

#[test]
fn custom_fim_template_parses() {
    let config = NovaAiConfig::load_from_str(
        r#"
[fim.custom]
prefix = "<PRE>"
suffix = "<SUF>"
middle = "<MID>"
stop = ["<EOT>"]
"#,
    )
    .unwrap();
    let custom = config.fim.custom.expect("custom template");
    assert_eq!(custom.middle, "<MID>");
    assert_eq!(custom.stop, vec!["<EOT>"]);
}

#[test]
fn unknown_sections_are_rejected() {
    let err = NovaAiConfig::load_from_str("[telemetry]\nenabled = true\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err:?}");
}

#[test]
fn semantic_errors_surface_as_invalid() {
    let err = NovaAiConfig::load_from_str("[bench]\nconcurrency = 0\n").unwrap_err();
    match err {
        ConfigError::Invalid(diagnostics) => assert_eq!(
            diagnostics.errors,
            vec![ConfigValidationError::InvalidValue {
                toml_path: "bench.concurrency".into(),
                message: "must be >= 1".into(),
            }]
        ),
        other => panic!("expected Invalid, got {other:?}"),
    }
}
