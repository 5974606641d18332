use std::fmt;
use std::path::PathBuf;
use serde::{Serialize, Deserialize};

/// Stable index of a node in the task arena. Never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Complete,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// One unit of requested code generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub prompt: String,
    pub code: Option<String>,
    pub output: Option<String>,
    pub status: TaskStatus,
    /// Where the generated code was persisted, if anywhere.
    pub file: Option<PathBuf>,
}

impl Task {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self.status = TaskStatus::InProgress;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.status == TaskStatus::Complete
    }
}
