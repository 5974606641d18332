pub mod env;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Context as AnyhowContext;
use tracing::info;
use crate::error::{ForgeError, Result};
use crate::project::env::EnvironmentManager;

pub const ENV_DIR: &str = "venv";
pub const SCAFFOLD_FILE: &str = "main.py";

/// An opened project: its directory, its environment and the current file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub dir: PathBuf,
    pub env_dir: PathBuf,
    pub current_file: Option<PathBuf>,
}

impl Project {
    fn at(dir: PathBuf) -> Self {
        let env_dir = dir.join(ENV_DIR);
        Self { dir, env_dir, current_file: None }
    }

    pub fn name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.dir.display().to_string())
    }

    /// Absolute path of a file inside the project.
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Creates `<name>.py` empty and makes it the current file.
    pub fn create_file(&mut self, name: &str) -> Result<PathBuf> {
        let file_name = format!("{}.py", validate_name(name)?);
        let path = self.path(&file_name);
        fs::write(&path, "")?;
        info!(file = %path.display(), "Created new file");
        self.current_file = Some(path.clone());
        Ok(path)
    }

    /// Reads an existing project file and makes it the current file.
    pub fn open_file(&mut self, name: &str) -> Result<String> {
        let name = validate_name(name)?;
        let file_name = if Path::new(name).extension().is_some() {
            name.to_string()
        } else {
            format!("{name}.py")
        };
        let path = self.path(&file_name);
        if !path.is_file() {
            return Err(ForgeError::FileNotFound(path));
        }
        let content = fs::read_to_string(&path)?;
        self.current_file = Some(path);
        Ok(content)
    }

    pub fn write_file(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(validate_name(file_name)?);
        fs::write(&path, content)?;
        info!(file = %path.display(), bytes = content.len(), "Updated file");
        Ok(path)
    }

    pub fn read_file(&self, file_name: &str) -> Result<String> {
        let path = self.path(validate_name(file_name)?);
        if !path.is_file() {
            return Err(ForgeError::FileNotFound(path));
        }
        Ok(fs::read_to_string(path)?)
    }

    pub fn has_environment(&self) -> bool {
        self.env_dir.is_dir()
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ForgeError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Creates and opens projects under a workspace directory.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    workspace: PathBuf,
    env: Arc<dyn EnvironmentManager>,
}

impl ProjectStore {
    pub fn new(workspace: impl Into<PathBuf>, env: Arc<dyn EnvironmentManager>) -> Self {
        Self { workspace: workspace.into(), env }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn environment(&self) -> &Arc<dyn EnvironmentManager> {
        &self.env
    }

    /// Creates `<workspace>/<name>/` with an empty `main.py` and its environment.
    pub async fn create_project(&self, name: &str) -> anyhow::Result<Project> {
        let dir = absolute(&self.workspace.join(validate_name(name)?))?;
        tokio::fs::create_dir_all(&dir).await
            .with_context(|| format!("Failed to create project directory {}", dir.display()))?;
        info!(dir = %dir.display(), "Created project directory");

        let project = Project::at(dir);
        tokio::fs::write(project.path(SCAFFOLD_FILE), "").await?;

        self.env.create(&project.env_dir).await
            .with_context(|| format!("Failed to create environment in {}", project.env_dir.display()))?;
        info!(env_dir = %project.env_dir.display(), "Created virtual environment");
        Ok(project)
    }

    /// Opens an existing directory; relative paths resolve against the workspace.
    pub fn open_project(&self, path: &Path) -> Result<Project> {
        let dir = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        };
        if !dir.is_dir() {
            return Err(ForgeError::ProjectNotFound(dir));
        }
        let project = Project::at(absolute(&dir)?);
        info!(project = %project.name(), "Opened project");
        Ok(project)
    }

    /// Creates the project's environment if it does not exist yet.
    pub async fn ensure_environment(&self, project: &Project) -> anyhow::Result<()> {
        if !project.has_environment() {
            self.env.create(&project.env_dir).await?;
        }
        Ok(())
    }

    pub fn interpreter(&self, project: &Project) -> PathBuf {
        self.env.interpreter(&project.env_dir)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
