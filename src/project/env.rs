use async_trait::async_trait;
use anyhow::{Result, anyhow};
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::process::Command;
use tracing::{info, warn};

/// Creates project-scoped interpreter environments and installs packages into them.
#[async_trait]
pub trait EnvironmentManager: Send + Sync + Debug {
    async fn create(&self, env_dir: &Path) -> Result<()>;
    async fn install(&self, env_dir: &Path, package: &str) -> Result<()>;
    /// Interpreter inside `env_dir` that generated code runs with.
    fn interpreter(&self, env_dir: &Path) -> PathBuf;
}

/// Result of installing inferred libraries. Failures do not abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl InstallReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Installs every distinct package in order, collecting failures.
pub async fn install_all(manager: &dyn EnvironmentManager, env_dir: &Path, packages: &[String]) -> InstallReport {
    let mut report = InstallReport::default();
    let mut seen = HashSet::new();

    for package in packages {
        if !seen.insert(package.as_str()) {
            continue;
        }
        match manager.install(env_dir, package).await {
            Ok(()) => report.installed.push(package.clone()),
            Err(e) => {
                warn!(package = %package, error = %e, "Package install failed");
                report.failed.push((package.clone(), e.to_string()));
            }
        }
    }
    report
}

fn scripts_dir(env_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        env_dir.join("Scripts")
    } else {
        env_dir.join("bin")
    }
}

/// `python -m venv` backed environments.
#[derive(Debug, Clone)]
pub struct VenvManager {
    python: String,
}

impl VenvManager {
    pub fn new(python: impl Into<String>) -> Self {
        Self { python: python.into() }
    }
}

#[async_trait]
impl EnvironmentManager for VenvManager {
    async fn create(&self, env_dir: &Path) -> Result<()> {
        info!(env_dir = %env_dir.display(), "Creating virtual environment");
        let output = Command::new(&self.python)
            .arg("-m")
            .arg("venv")
            .arg(env_dir)
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!(
                "venv creation failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }

    async fn install(&self, env_dir: &Path, package: &str) -> Result<()> {
        let pip = scripts_dir(env_dir).join("pip");
        info!(pip = %pip.display(), package = %package, "Installing package");
        let output = Command::new(&pip)
            .arg("install")
            .arg(package)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().last().unwrap_or_default().trim().to_string();
            return Err(anyhow!("pip install {} failed ({}): {}", package, output.status, last));
        }
        Ok(())
    }

    fn interpreter(&self, env_dir: &Path) -> PathBuf {
        scripts_dir(env_dir).join("python")
    }
}

/// Environment manager that only records what it was asked to do.
/// Runs code with a fixed host interpreter.
#[derive(Debug)]
pub struct InMemoryEnvironment {
    interpreter: PathBuf,
    unavailable: HashSet<String>,
    created: Mutex<Vec<PathBuf>>,
    installed: Mutex<Vec<String>>,
}

impl InMemoryEnvironment {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            unavailable: HashSet::new(),
            created: Mutex::new(Vec::new()),
            installed: Mutex::new(Vec::new()),
        }
    }

    /// Packages whose install will fail.
    pub fn with_unavailable(mut self, packages: &[&str]) -> Self {
        self.unavailable.extend(packages.iter().map(|p| p.to_string()));
        self
    }

    pub fn created(&self) -> Vec<PathBuf> {
        self.created.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn installed(&self) -> Vec<String> {
        self.installed.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EnvironmentManager for InMemoryEnvironment {
    async fn create(&self, env_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(env_dir).await?;
        if let Ok(mut created) = self.created.lock() {
            created.push(env_dir.to_path_buf());
        }
        Ok(())
    }

    async fn install(&self, _env_dir: &Path, package: &str) -> Result<()> {
        if self.unavailable.contains(package) {
            return Err(anyhow!("No matching distribution found for {}", package));
        }
        if let Ok(mut installed) = self.installed.lock() {
            installed.push(package.to_string());
        }
        Ok(())
    }

    fn interpreter(&self, _env_dir: &Path) -> PathBuf {
        self.interpreter.clone()
    }
}
