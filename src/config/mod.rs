pub mod loader;

use std::path::PathBuf;
use serde::{Serialize, Deserialize};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Settings read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub google: GoogleSettings,
    /// Directory new projects are created in.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
    /// Host interpreter used to create project environments.
    #[serde(default = "default_python")]
    pub python: String,
    /// Character budget of a node label in the task graph.
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleSettings {
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_summary_chars() -> usize {
    50
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
