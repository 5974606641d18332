use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use tracing::{info, warn};
use crate::error::{ForgeError, Result};
use crate::project::Project;
use crate::runner::{OutputBuffer, RunEvent};
use crate::tree::{Task, TaskId, TaskStatus, TaskTree};
use crate::visual::SummaryCache;
use crate::workflow::board::{compose_prompts, ApprovalOutcome, SubtaskBoard};

/// Which output buffer a running process feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunTarget {
    Main(TaskId),
    Subtask { board: Uuid, index: usize },
    Scratch,
}

/// All mutable state of one workflow instance. Passed explicitly to every
/// operation; there is no process-wide current project or file.
#[derive(Debug, Default)]
pub struct Session {
    pub tree: TaskTree,
    pub current: TaskId,
    pub project: Option<Project>,
    pub board: Option<SubtaskBoard>,
    /// Output of the latest run of each task node.
    pub main_outputs: HashMap<TaskId, OutputBuffer>,
    pub scratch_output: OutputBuffer,
    pub last_analysis: String,
    pub summaries: SummaryCache,
}

pub fn main_task_stem(timestamp: u64) -> String {
    format!("main_task_{timestamp}")
}

impl Session {
    pub fn new() -> Self {
        let tree = TaskTree::default();
        let current = tree.root();
        Self { tree, current, ..Default::default() }
    }

    pub fn project(&self) -> Result<&Project> {
        self.project.as_ref().ok_or(ForgeError::NoProject)
    }

    pub fn project_mut(&mut self) -> Result<&mut Project> {
        self.project.as_mut().ok_or(ForgeError::NoProject)
    }

    pub fn set_project(&mut self, project: Project) {
        info!(project = %project.name(), "Current project set");
        self.project = Some(project);
    }

    pub fn current_task(&self) -> Result<&Task> {
        self.tree.get(self.current)
    }

    pub fn board(&self) -> Result<&SubtaskBoard> {
        self.board.as_ref().ok_or(ForgeError::NoSubtasks)
    }

    pub fn board_mut(&mut self) -> Result<&mut SubtaskBoard> {
        self.board.as_mut().ok_or(ForgeError::NoSubtasks)
    }

    fn ensure_board_replaceable(&self) -> Result<()> {
        match &self.board {
            Some(board) if !board.is_complete() => Err(ForgeError::BoardOpen(board.pending_count())),
            _ => Ok(()),
        }
    }

    /// Checks made before an analysis request is sent.
    pub fn check_submit(&self, prompt: &str) -> Result<()> {
        if prompt.trim().is_empty() {
            return Err(ForgeError::InvalidCommand("empty prompt".to_string()));
        }
        self.project()?;
        Ok(())
    }

    /// SIMPLE result: persists the code as `main_task_<ts>.py` and adds a
    /// child of the current node, which becomes the new current node.
    pub fn apply_simple(&mut self, prompt: &str, code: &str, timestamp: u64) -> Result<TaskId> {
        if code.trim().is_empty() {
            return Err(ForgeError::EmptyCode("save"));
        }
        let file_name = format!("{}.py", main_task_stem(timestamp));
        let path = self.project()?.write_file(&file_name, code)?;
        self.project_mut()?.current_file = Some(path.clone());

        let mut task = Task::new(prompt).with_code(code);
        task.output = Some(String::new());
        task.file = Some(path);
        let id = self.tree.add_child(self.current, task)?;
        self.current = id;
        info!(task = %id, filename = %self.tree.filename(id)?, "Task created");
        Ok(id)
    }

    /// SUBTASKS result: adds a node for the overall task with one child per
    /// subtask and opens a board for them.
    pub fn apply_decomposition(&mut self, prompt: &str, listing: &str, items: &[String], timestamp: u64) -> Result<&SubtaskBoard> {
        if items.is_empty() {
            return Err(ForgeError::NoSubtasks);
        }
        self.ensure_board_replaceable()?;
        let stem = main_task_stem(timestamp);
        let main_path = self.project()?.path(&format!("{stem}.py"));
        self.project_mut()?.current_file = Some(main_path);

        let mut overall = Task::new(prompt);
        overall.status = TaskStatus::InProgress;
        let parent = self.tree.add_child(self.current, overall)?;

        let prompts = compose_prompts(prompt, listing, items.len());
        let mut subtasks = Vec::with_capacity(items.len());
        for (item, composed) in items.iter().zip(prompts) {
            let node = self.tree.add_child(parent, Task::new(item.clone()))?;
            subtasks.push((composed, node));
        }

        self.current = parent;
        let board = SubtaskBoard::new(parent, stem, subtasks);
        info!(board = %board.id, subtasks = board.total(), "Task broken down into subtasks");
        Ok(self.board.insert(board))
    }

    /// Checks made before a breakdown request; returns the prompt to break down.
    pub fn check_breakdown(&self) -> Result<String> {
        let task = self.current_task()?;
        if task.is_complete() {
            return Err(ForgeError::TaskCompleted("break down"));
        }
        self.project()?;
        self.ensure_board_replaceable()?;
        Ok(task.prompt.clone())
    }

    /// One subtask per line of the breakdown reply, as children of `node`.
    pub fn apply_breakdown(&mut self, node: TaskId, lines: &[String]) -> Result<&SubtaskBoard> {
        if lines.is_empty() {
            return Err(ForgeError::NoSubtasks);
        }
        self.ensure_board_replaceable()?;
        let base = match self.tree.get(node)?.file.as_deref().and_then(Path::file_stem) {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => self.tree.filename(node)?,
        };

        let mut subtasks = Vec::with_capacity(lines.len());
        for line in lines {
            let child = self.tree.add_child(node, Task::new(line.clone()))?;
            subtasks.push((line.clone(), child));
        }
        let board = SubtaskBoard::new(node, base, subtasks);
        info!(board = %board.id, subtasks = board.total(), "Task broken down further");
        Ok(self.board.insert(board))
    }

    /// Returns true when the task was newly completed, false when it already was.
    pub fn approve_current(&mut self) -> Result<bool> {
        let task = self.tree.get_mut(self.current)?;
        if task.is_complete() {
            return Ok(false);
        }
        task.status = TaskStatus::Complete;
        Ok(true)
    }

    /// Checks made before a refactor request; returns the code to refactor.
    pub fn check_refactor(&self) -> Result<String> {
        let task = self.current_task()?;
        if task.is_complete() {
            return Err(ForgeError::TaskCompleted("refactor"));
        }
        match task.code.as_deref() {
            Some(code) if !code.trim().is_empty() => Ok(code.to_string()),
            _ => Err(ForgeError::EmptyCode("refactor")),
        }
    }

    pub fn apply_refactor(&mut self, node: TaskId, code: &str) -> Result<()> {
        if code.trim().is_empty() {
            return Err(ForgeError::EmptyCode("save"));
        }
        let task = self.tree.get(node)?;
        if task.is_complete() {
            return Err(ForgeError::TaskCompleted("refactor"));
        }
        if let Some(path) = &task.file {
            std::fs::write(path, code)?;
        }
        self.tree.get_mut(node)?.code = Some(code.to_string());
        Ok(())
    }

    /// Removes the current node and its subtree; the parent becomes current.
    pub fn delete_current(&mut self) -> Result<TaskId> {
        let parent = self.tree.remove(self.current)?;
        self.current = parent;
        self.summaries.retain_reachable(&self.tree);
        self.main_outputs.retain(|id, _| self.tree.contains(*id));
        Ok(parent)
    }

    /// Selects a node by derived filename (e.g. `Root-1-2`).
    pub fn select(&mut self, name: &str) -> Result<TaskId> {
        let id = self
            .tree
            .find_by_filename(name)
            .ok_or_else(|| ForgeError::UnknownTask(name.to_string()))?;
        self.current = id;
        Ok(id)
    }

    /// File the current node runs from: its persisted file, or the derived filename.
    pub fn execution_file(&self) -> Result<PathBuf> {
        let project = self.project()?;
        let task = self.current_task()?;
        let path = match &task.file {
            Some(path) => path.clone(),
            None => project.path(&format!("{}.py", self.tree.filename(self.current)?)),
        };
        if !path.is_file() {
            return Err(ForgeError::FileNotFound(path));
        }
        Ok(path)
    }

    pub fn scratch_file(&self) -> Result<PathBuf> {
        let project = self.project()?;
        let path = project.current_file.clone().ok_or(ForgeError::NoFile)?;
        if !path.is_file() {
            return Err(ForgeError::FileNotFound(path));
        }
        Ok(path)
    }

    /// Persists generated subtask code, then records it on the run and its node.
    pub fn apply_subtask_code(&mut self, index: usize, code: &str) -> Result<PathBuf> {
        if code.trim().is_empty() {
            return Err(ForgeError::EmptyCode("save for this subtask"));
        }
        let board = self.board()?;
        let node = board.run(index)?.node;
        let file_name = board.file_name(index);
        let path = self.project()?.write_file(&file_name, code)?;

        self.board_mut()?.record_code(index, code.to_string())?;
        if let Ok(task) = self.tree.get_mut(node) {
            task.code = Some(code.to_string());
            task.file = Some(path.clone());
            task.status = TaskStatus::InProgress;
        }
        Ok(path)
    }

    /// Marks the subtask running and returns the file to execute.
    pub fn begin_subtask_execution(&mut self, index: usize) -> Result<PathBuf> {
        let file_name = self.board()?.file_name(index);
        let path = self.project()?.path(&file_name);
        if !path.is_file() {
            return Err(ForgeError::FileNotFound(path));
        }
        self.board_mut()?.begin_execution(index)?;
        Ok(path)
    }

    pub fn approve_subtask(&mut self, index: usize) -> Result<ApprovalOutcome> {
        let board = self.board_mut()?;
        let outcome = board.approve(index)?;
        let node = board.run(index)?.node;
        if let Ok(task) = self.tree.get_mut(node) {
            task.status = TaskStatus::Complete;
        }
        Ok(outcome)
    }

    /// Pulls the saved file of an approved subtask into `target`'s code and
    /// rewrites `target`'s file, so the next execution runs the merged code.
    pub fn include_subtask(&mut self, target: usize, included: usize) -> Result<PathBuf> {
        let board = self.board()?;
        let node = board.run(target)?.node;
        let target_file = board.file_name(target);
        let approved_code = self.project()?.read_file(&board.file_name(included))?;
        let code = board.included_code(target, included, &approved_code)?;

        let path = self.project()?.write_file(&target_file, &code)?;
        self.board_mut()?.record_code(target, code.clone())?;
        if let Ok(task) = self.tree.get_mut(node) {
            task.code = Some(code);
            task.file = Some(path.clone());
        }
        Ok(path)
    }

    /// Starts a fresh output buffer for `node` before its process is spawned.
    pub fn begin_main_execution(&mut self, node: TaskId) {
        self.main_outputs.insert(node, OutputBuffer::default());
    }

    pub fn begin_scratch_execution(&mut self) {
        self.scratch_output.restart();
    }

    /// Routes a process event to the buffer its target owns. Events of a
    /// replaced board are dropped.
    pub fn apply_run_event(&mut self, target: RunTarget, event: &RunEvent) {
        match target {
            RunTarget::Main(node) => {
                let buffer = self.main_outputs.entry(node).or_default();
                buffer.apply(event);
                if matches!(event, RunEvent::Finished(_)) {
                    let text = buffer.text().to_string();
                    if let Ok(task) = self.tree.get_mut(node) {
                        task.output = Some(text);
                    }
                }
            }
            RunTarget::Subtask { board, index } => match self.board.as_mut() {
                Some(active) if active.id == board => {
                    if let Err(e) = active.apply_run_event(index, event) {
                        warn!(error = %e, "Dropped process event");
                    }
                }
                _ => warn!(board = %board, subtask = index, "Process event for a replaced board dropped"),
            },
            RunTarget::Scratch => self.scratch_output.apply(event),
        }
    }
}
