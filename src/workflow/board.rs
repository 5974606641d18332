use uuid::Uuid;
use tracing::info;
use crate::error::{ForgeError, Result};
use crate::llm::prompts::subtask_prompt;
use crate::runner::{OutputBuffer, RunEvent};
use crate::tree::TaskId;

/// Per-subtask state: prompt, generated code, execution output and approval.
#[derive(Debug, Clone)]
pub struct SubtaskRun {
    pub index: usize,
    pub total: usize,
    pub prompt: String,
    pub code: String,
    pub output: OutputBuffer,
    pub approved: bool,
    pub running: bool,
    /// Approved siblings whose code this subtask may pull in.
    pub offers: Vec<usize>,
    pub node: TaskId,
}

impl SubtaskRun {
    pub fn can_approve(&self) -> bool {
        !self.approved && !self.running && self.output.is_finished()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalOutcome {
    /// Subtasks that were offered the approved code.
    pub offered_to: Vec<usize>,
    /// True exactly once per board, on the approval that completes it.
    pub all_complete: bool,
}

/// Composes one prompt per subtask, each embedding the overall task and the full listing.
pub fn compose_prompts(overall: &str, listing: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| subtask_prompt(i, count, overall, listing)).collect()
}

/// Orchestrates a set of independently approved subtasks.
#[derive(Debug, Clone)]
pub struct SubtaskBoard {
    pub id: Uuid,
    pub parent: TaskId,
    base: String,
    runs: Vec<SubtaskRun>,
    completion_signalled: bool,
}

impl SubtaskBoard {
    /// `base` is the file stem subtask files are named after; `subtasks`
    /// pairs each prompt with its node in the task tree.
    pub fn new(parent: TaskId, base: impl Into<String>, subtasks: Vec<(String, TaskId)>) -> Self {
        let total = subtasks.len();
        let runs = subtasks
            .into_iter()
            .enumerate()
            .map(|(i, (prompt, node))| SubtaskRun {
                index: i + 1,
                total,
                prompt,
                code: String::new(),
                output: OutputBuffer::default(),
                approved: false,
                running: false,
                offers: Vec::new(),
                node,
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            parent,
            base: base.into(),
            runs,
            completion_signalled: false,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn total(&self) -> usize {
        self.runs.len()
    }

    pub fn runs(&self) -> &[SubtaskRun] {
        &self.runs
    }

    pub fn approved_count(&self) -> usize {
        self.runs.iter().filter(|r| r.approved).count()
    }

    pub fn pending_count(&self) -> usize {
        self.total() - self.approved_count()
    }

    pub fn is_complete(&self) -> bool {
        self.pending_count() == 0
    }

    pub fn run(&self, index: usize) -> Result<&SubtaskRun> {
        index
            .checked_sub(1)
            .and_then(|i| self.runs.get(i))
            .ok_or(ForgeError::UnknownSubtask(index))
    }

    fn run_mut(&mut self, index: usize) -> Result<&mut SubtaskRun> {
        index
            .checked_sub(1)
            .and_then(|i| self.runs.get_mut(i))
            .ok_or(ForgeError::UnknownSubtask(index))
    }

    fn open_run_mut(&mut self, index: usize) -> Result<&mut SubtaskRun> {
        let run = self.run_mut(index)?;
        if run.approved {
            return Err(ForgeError::SubtaskApproved(index));
        }
        Ok(run)
    }

    /// `"{base}-{index}.py"`
    pub fn file_name(&self, index: usize) -> String {
        format!("{}-{}.py", self.base, index)
    }

    /// Prompt to send for `index`, replacing the stored one when edited.
    pub fn prepare_submit(&mut self, index: usize, edited: Option<String>) -> Result<String> {
        let run = self.open_run_mut(index)?;
        if let Some(prompt) = edited.filter(|p| !p.trim().is_empty()) {
            run.prompt = prompt;
        }
        Ok(run.prompt.clone())
    }

    pub fn record_code(&mut self, index: usize, code: String) -> Result<()> {
        let run = self.open_run_mut(index)?;
        run.code = code;
        Ok(())
    }

    pub fn begin_execution(&mut self, index: usize) -> Result<()> {
        let run = self.open_run_mut(index)?;
        if run.code.trim().is_empty() {
            return Err(ForgeError::EmptyCode("execute for this subtask"));
        }
        if run.running {
            return Err(ForgeError::Busy(format!("Execution of subtask #{index}")));
        }
        run.running = true;
        run.output.restart();
        Ok(())
    }

    /// Clears the running flag after a launch failure without completing the run.
    pub fn abort_execution(&mut self, index: usize) -> Result<()> {
        self.run_mut(index)?.running = false;
        Ok(())
    }

    pub fn apply_run_event(&mut self, index: usize, event: &RunEvent) -> Result<()> {
        let run = self.run_mut(index)?;
        run.output.apply(event);
        if matches!(event, RunEvent::Finished(_)) {
            run.running = false;
        }
        Ok(())
    }

    /// Marks `index` approved and offers its code to every other open subtask.
    pub fn approve(&mut self, index: usize) -> Result<ApprovalOutcome> {
        let run = self.open_run_mut(index)?;
        if !run.can_approve() {
            return Err(ForgeError::NotExecuted(index));
        }
        run.approved = true;

        let mut offered_to = Vec::new();
        for other in self.runs.iter_mut().filter(|r| r.index != index && !r.approved) {
            other.offers.push(index);
            offered_to.push(other.index);
        }

        let all_complete = self.is_complete() && !self.completion_signalled;
        if all_complete {
            self.completion_signalled = true;
        }
        info!(board = %self.id, subtask = index, approved = self.approved_count(), total = self.total(), "Subtask approved");

        Ok(ApprovalOutcome { offered_to, all_complete })
    }

    /// `target`'s current code with the code of an approved sibling prepended.
    /// Leaves the board unchanged.
    pub fn included_code(&self, target: usize, included: usize, approved_code: &str) -> Result<String> {
        let run = self.run(target)?;
        if run.approved {
            return Err(ForgeError::SubtaskApproved(target));
        }
        if !run.offers.contains(&included) {
            return Err(ForgeError::NotOffered { included, target });
        }
        Ok(format!(
            "# Including code from subtask #{included}\n# Begin included code\n{approved_code}\n# End included code\n\n# Original code for this subtask\n{}",
            run.code
        ))
    }

    pub fn include(&mut self, target: usize, included: usize, approved_code: &str) -> Result<()> {
        let code = self.included_code(target, included, approved_code)?;
        self.record_code(target, code)
    }

    /// One line per subtask for the shell.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            let state = if run.approved {
                "approved"
            } else if run.running {
                "running"
            } else if run.output.is_finished() {
                "executed"
            } else if !run.code.is_empty() {
                "generated"
            } else {
                "pending"
            };
            let offers = if run.offers.is_empty() {
                String::new()
            } else {
                format!(" includes available: {:?}", run.offers)
            };
            out.push_str(&format!("#{} [{}] {}{}\n", run.index, state, self.file_name(run.index), offers));
        }
        out
    }
}
