use nova_ai::{clean_fim_response, FimTemplateRegistry};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn echoed_prompt_prefix_is_removed() {
    assert_eq!(
        clean_fim_response("const msg = 'Hello, world!';", "const msg = '", None),
        "Hello, world!';"
    );
}

#[test]
fn echo_in_the_middle_is_kept() {
    let raw = "greet();\nconst msg = 'Hello';";
    assert_eq!(clean_fim_response(raw, "const msg = '", None), raw);
}

#[test]
fn fenced_python_is_unwrapped() {
    assert_eq!(
        clean_fim_response("```python\nx = 42\n```", "", None),
        "x = 42"
    );
}

#[test]
fn every_builtin_template_drops_its_stop_tokens() {
    let registry = FimTemplateRegistry::builtin();
    for name in registry.names() {
        let template = registry.get(name).unwrap();
        for stop in &template.stop {
            let raw = format!("value{stop}trailing junk");
            assert_eq!(
                clean_fim_response(&raw, "", Some(template)),
                "value",
                "{name}: {stop}"
            );
        }
    }
}

proptest! {
    // Text with no fence, no stop token and no echoed prefix is already clean.
    #[test]
    fn cleaning_clean_text_is_the_identity(text in "[a-z0-9 ();=\n]{0,40}") {
        let registry = FimTemplateRegistry::builtin();
        let template = registry.get("qwen");
        let cleaned = clean_fim_response(&text, "PREFIX", template);
        if text.trim().is_empty() {
            prop_assert_eq!(cleaned, "");
        } else {
            prop_assert_eq!(&cleaned, &text);
            prop_assert_eq!(clean_fim_response(&cleaned, "PREFIX", template), cleaned.clone());
        }
    }
}
