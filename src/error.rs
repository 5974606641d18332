use std::path::PathBuf;
use thiserror::Error;

/// Domain failures of a single user action. None of them are fatal to the
/// session; the triggering action is aborted and prior state is kept.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("No project opened. Please create or open a project first.")]
    NoProject,

    #[error("Project directory not found: {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("No file opened. Please open a file first.")]
    NoFile,

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("No code to {0}.")]
    EmptyCode(&'static str),

    #[error("Cannot delete the root task.")]
    RootDeletion,

    #[error("Cannot {0} a completed task.")]
    TaskCompleted(&'static str),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("No active subtasks.")]
    NoSubtasks,

    #[error("Unknown subtask #{0}")]
    UnknownSubtask(usize),

    #[error("Subtask #{0} is already approved.")]
    SubtaskApproved(usize),

    #[error("Subtask #{0} has not finished executing yet.")]
    NotExecuted(usize),

    #[error("Subtask #{included} was not offered to subtask #{target}.")]
    NotOffered { included: usize, target: usize },

    #[error("{0} subtasks are still waiting for approval.")]
    BoardOpen(usize),

    #[error("{0} is already in progress.")]
    Busy(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ForgeError>;
