use nova_config::{ConfigError, NovaAiConfig};

#[test]
fn explicit_path_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nova-ai.toml");
    std::fs::write(&path, "[bench]\nruns = 3\n").unwrap();

    let config = NovaAiConfig::discover(Some(&path)).unwrap();
    assert_eq!(config.bench.runs, 3);
}

#[test]
fn missing_file_reports_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = NovaAiConfig::load_from_path(&path).unwrap_err();
    match &err {
        ConfigError::Io { path: reported, .. } => {
            assert!(reported.ends_with("absent.toml"), "{reported}")
        }
        other => panic!("expected Io error, got {other:?}"),
    }
}
