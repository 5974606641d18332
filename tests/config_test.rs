use taskforge::config::loader;
use taskforge::config::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use std::fs;
use std::path::PathBuf;

#[test]
fn test_load_settings_with_defaults() {
    let yaml_content = r#"
google:
  api_key: "secret-key"
"#;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("taskforge.yaml");
    fs::write(&file_path, yaml_content).expect("Failed to write temp file");

    let settings = loader::load_settings_from_yaml(&file_path).expect("Failed to load settings");
    assert_eq!(settings.google.api_key.as_deref(), Some("secret-key"));
    assert_eq!(settings.google.model, DEFAULT_MODEL);
    assert_eq!(settings.google.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(settings.workspace, PathBuf::from("."));
    assert_eq!(settings.python, "python3");
    assert_eq!(settings.summary_chars, 50);
}

#[test]
fn test_load_settings_overrides() {
    let yaml_content = r#"
google:
  api_key: "k"
  model: "gemini-1.5-pro"
workspace: "/srv/projects"
python: "python3.12"
summary_chars: 30
"#;
    let settings = loader::parse_settings(yaml_content).expect("Failed to parse settings");
    assert_eq!(settings.google.model, "gemini-1.5-pro");
    assert_eq!(settings.workspace, PathBuf::from("/srv/projects"));
    assert_eq!(settings.python, "python3.12");
    assert_eq!(settings.summary_chars, 30);
}

#[test]
fn test_missing_api_key_is_an_error() {
    let err = loader::parse_settings("google:\n  model: gemini-1.5-flash\n").unwrap_err();
    assert!(format!("{err:#}").contains("missing google.api_key"));

    assert!(loader::parse_settings("google:\n  api_key: \"  \"\n").is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let err = loader::load_settings_from_yaml(&temp_dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
