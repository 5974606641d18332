use anyhow::{Result, Context as AnyhowContext};
use std::fs;
use std::path::Path;
use crate::config::Settings;
use crate::error::ForgeError;

pub fn load_settings_from_yaml(file_path: &Path) -> Result<Settings> {
    let yaml_content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read config file from {}", file_path.display()))?;

    parse_settings(&yaml_content)
        .with_context(|| format!("Failed to load settings from {}", file_path.display()))
}

/// Parses settings and checks the credential is present. A missing or blank
/// `google.api_key` is an error: nothing works without it.
pub fn parse_settings(yaml_content: &str) -> Result<Settings> {
    let settings: Settings = serde_yaml::from_str(yaml_content)
        .context("Failed to deserialize YAML settings")?;

    match settings.google.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(settings),
        _ => Err(ForgeError::Config("missing google.api_key".to_string()).into()),
    }
}
