use super::*;
use tempfile::tempdir;

#[test]
fn test_default_config_parses() {
    let config = SpecflowConfig::default_config();
    assert!(config.storage.root.is_none());
    assert!(config.history.keep_latest.is_none());
    assert_eq!(config.generation.max_clarification_questions, 5);
    let provider = config.provider.expect("default provider");
    assert_eq!(provider.command, "claude");
    assert_eq!(provider.timeout_secs, 900);
}

#[test]
fn test_partial_yaml_fills_defaults() {
    let yaml = r#"
history:
  keep_latest: 10
generation:
  model: "sonnet"
  temperature: 0.3
"#;
    let config: SpecflowConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.history.keep_latest, Some(10));
    assert_eq!(config.generation.max_clarification_questions, 5);
    assert!(config.provider.is_none());

    let options = config.generation.options();
    assert_eq!(options.model.as_deref(), Some("sonnet"));
    assert_eq!(options.temperature, Some(0.3));
    assert!(options.max_tokens.is_none());
}

#[test]
fn test_unknown_keys_are_rejected() {
    let yaml = "generation:\n  modle: x\n";
    assert!(serde_yaml::from_str::<SpecflowConfig>(yaml).is_err());
}

#[test]
fn test_load_validates_values() {
    let dir = tempdir().unwrap();
    let cases = [
        ("generation:\n  temperature: 3.5\n", "temperature"),
        ("generation:\n  max_clarification_questions: 0\n", "max_clarification_questions"),
        ("history:\n  keep_latest: 0\n", "keep_latest"),
        ("provider:\n  command: \"  \"\n", "provider.command"),
        ("provider:\n  command: claude\n  timeout_secs: 0\n", "timeout_secs"),
    ];
    for (yaml, field) in cases {
        let path = dir.path().join("specflow.yaml");
        std::fs::write(&path, yaml).unwrap();
        let err = SpecflowConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains(field), "{}: {}", field, err);
    }
}

#[test]
fn test_load_reports_missing_file() {
    let dir = tempdir().unwrap();
    let err = SpecflowConfig::load(&dir.path().join("nope.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_discover_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let config = SpecflowConfig::discover(dir.path()).unwrap();
    assert_eq!(config, SpecflowConfig::default_config());

    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "storage:\n  root: specs\n",
    )
    .unwrap();
    let config = SpecflowConfig::discover(dir.path()).unwrap();
    assert_eq!(config.store_root(dir.path()), dir.path().join("specs"));
    assert!(config.provider.is_none());
}

#[test]
fn test_store_root_resolution() {
    let project = Path::new("/work/project");
    let mut config = SpecflowConfig::default();
    assert_eq!(config.store_root(project), project.join(DEFAULT_STORE_DIR));

    config.storage.root = Some(PathBuf::from("/var/specs"));
    assert_eq!(config.store_root(project), PathBuf::from("/var/specs"));

    if let Some(home) = dirs::home_dir() {
        config.storage.root = Some(PathBuf::from("~/specs"));
        assert_eq!(config.store_root(project), home.join("specs"));
    }
}

#[test]
fn test_provider_command_config() {
    let provider = ProviderConfig {
        command: "agent".into(),
        args: vec!["--print".into(), "{prompt}".into()],
        working_dir: Some(PathBuf::from("sub")),
        timeout_secs: 30,
    };
    let command = provider.command_config(Path::new("/work"));
    assert_eq!(command.command, "agent");
    assert_eq!(command.args, vec!["--print", "{prompt}"]);
    assert_eq!(command.working_dir, Some(PathBuf::from("/work/sub")));
    assert_eq!(command.timeout, Duration::from_secs(30));

    let provider = ProviderConfig {
        working_dir: None,
        ..provider
    };
    assert_eq!(
        provider.command_config(Path::new("/work")).working_dir,
        Some(PathBuf::from("/work"))
    );
}
