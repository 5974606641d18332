pub mod task;

pub use task::{Task, TaskId, TaskStatus};

use crate::error::{ForgeError, Result};

pub const ROOT_LABEL: &str = "Root";

#[derive(Debug, Clone)]
struct TaskRecord {
    task: Task,
    parent: Option<TaskId>,
    children: Vec<TaskId>,
    attached: bool,
}

/// A visited node during a depth-first walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    pub id: TaskId,
    pub depth: usize,
    /// 0-based position among the parent's children (0 for the root).
    pub sibling_index: usize,
}

/// Arena of task records. Parents own an ordered child list; children point
/// back to their parent by index.
#[derive(Debug, Clone)]
pub struct TaskTree {
    records: Vec<TaskRecord>,
}

impl TaskTree {
    pub fn new(root_label: &str) -> Self {
        let root = Task {
            prompt: root_label.to_string(),
            status: TaskStatus::InProgress,
            ..Default::default()
        };
        Self {
            records: vec![TaskRecord {
                task: root,
                parent: None,
                children: Vec::new(),
                attached: true,
            }],
        }
    }

    pub fn root(&self) -> TaskId {
        TaskId(0)
    }

    fn record(&self, id: TaskId) -> Result<&TaskRecord> {
        self.records
            .get(id.0)
            .filter(|r| r.attached)
            .ok_or_else(|| ForgeError::UnknownTask(id.to_string()))
    }

    /// Whether `id` is reachable from the root.
    pub fn contains(&self, id: TaskId) -> bool {
        self.record(id).is_ok()
    }

    pub fn get(&self, id: TaskId) -> Result<&Task> {
        self.record(id).map(|r| &r.task)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Result<&mut Task> {
        self.records
            .get_mut(id.0)
            .filter(|r| r.attached)
            .map(|r| &mut r.task)
            .ok_or_else(|| ForgeError::UnknownTask(id.to_string()))
    }

    pub fn parent(&self, id: TaskId) -> Option<TaskId> {
        self.record(id).ok().and_then(|r| r.parent)
    }

    pub fn children(&self, id: TaskId) -> &[TaskId] {
        self.record(id).map(|r| r.children.as_slice()).unwrap_or(&[])
    }

    pub fn add_child(&mut self, parent: TaskId, task: Task) -> Result<TaskId> {
        self.record(parent)?;
        let id = TaskId(self.records.len());
        self.records.push(TaskRecord {
            task,
            parent: Some(parent),
            children: Vec::new(),
            attached: true,
        });
        self.records[parent.0].children.push(id);
        Ok(id)
    }

    /// Detaches `id` and its subtree. Returns the former parent.
    pub fn remove(&mut self, id: TaskId) -> Result<TaskId> {
        let parent = match self.record(id)?.parent {
            Some(p) => p,
            None => return Err(ForgeError::RootDeletion),
        };

        self.records[parent.0].children.retain(|c| *c != id);

        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let record = &mut self.records[next.0];
            record.attached = false;
            stack.extend(record.children.iter().copied());
        }
        Ok(parent)
    }

    /// Derived filename: the root's label for the root, `"{parent}-{k}"` (1-based) otherwise.
    pub fn filename(&self, id: TaskId) -> Result<String> {
        let record = self.record(id)?;
        match record.parent {
            None => Ok(record.task.prompt.clone()),
            Some(parent) => {
                let position = self.records[parent.0]
                    .children
                    .iter()
                    .position(|c| *c == id)
                    .ok_or_else(|| ForgeError::UnknownTask(id.to_string()))?;
                Ok(format!("{}-{}", self.filename(parent)?, position + 1))
            }
        }
    }

    /// Looks a node up by its derived filename.
    pub fn find_by_filename(&self, name: &str) -> Option<TaskId> {
        self.walk()
            .into_iter()
            .map(|v| v.id)
            .find(|id| self.filename(*id).map(|f| f == name).unwrap_or(false))
    }

    /// Depth-first pre-order over reachable nodes.
    pub fn walk(&self) -> Vec<Visit> {
        let mut visits = Vec::new();
        let mut stack = vec![Visit { id: self.root(), depth: 0, sibling_index: 0 }];
        while let Some(visit) = stack.pop() {
            visits.push(visit);
            let children = &self.records[visit.id.0].children;
            for (i, child) in children.iter().enumerate().rev() {
                stack.push(Visit { id: *child, depth: visit.depth + 1, sibling_index: i });
            }
        }
        visits
    }

    /// Indented text view used by the shell.
    pub fn outline(&self, current: TaskId) -> String {
        let mut out = String::new();
        for visit in self.walk() {
            let record = &self.records[visit.id.0];
            let name = self.filename(visit.id).unwrap_or_default();
            let marker = if visit.id == current { "*" } else { " " };
            let prompt: String = record.task.prompt.lines().next().unwrap_or_default().chars().take(60).collect();
            out.push_str(&format!(
                "{}{} {} [{}] {}\n",
                "  ".repeat(visit.depth),
                marker,
                name,
                record.task.status,
                prompt
            ));
        }
        out
    }
}

impl Default for TaskTree {
    fn default() -> Self {
        Self::new(ROOT_LABEL)
    }
}
