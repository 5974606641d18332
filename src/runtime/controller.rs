use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;
use crate::error::ForgeError;
use crate::llm::LlmClient;
use crate::llm::prompts::{analysis_prompt, breakdown_prompt, refactor_prompt};
use crate::parsing::code::extract_code;
use crate::parsing::imports::parse_libraries;
use crate::parsing::subtasks::{classify, split_lines, Classification};
use crate::project::env::{install_all, InstallReport};
use crate::project::{Project, ProjectStore};
use crate::runner::{send_input, ProcessRunner, RunEvent};
use crate::runtime::command::{Command, HELP};
use crate::runtime::notice::{Notice, Notifier};
use crate::tree::TaskId;
use crate::visual::layout;
use crate::visual::summary::{generate_summaries, SummaryRequest};
use crate::workflow::{RunTarget, Session};

/// Work running off the loop. At most one of each kind at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    Project,
    Analysis,
    Refactor,
    Breakdown,
    Summaries,
    Subtask(usize),
    Run(RunTarget),
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Project => f.write_str("Project creation"),
            Job::Analysis => f.write_str("Prompt analysis"),
            Job::Refactor => f.write_str("Refactoring"),
            Job::Breakdown => f.write_str("Breakdown"),
            Job::Summaries => f.write_str("Rendering"),
            Job::Subtask(i) => write!(f, "Generation for subtask #{i}"),
            Job::Run(RunTarget::Main(id)) => write!(f, "Execution of task {id}"),
            Job::Run(RunTarget::Subtask { index, .. }) => write!(f, "Execution of subtask #{index}"),
            Job::Run(RunTarget::Scratch) => f.write_str("Execution of the current file"),
        }
    }
}

/// Result of the analysis job: the raw reply, its classification and, for
/// SIMPLE replies, what happened when installing inferred libraries.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub response: String,
    pub classification: Classification,
    pub install: Option<InstallReport>,
}

enum Event {
    ProjectCreated(Result<Project>),
    Analysis { prompt: String, timestamp: u64, result: Result<AnalysisOutcome> },
    Refactored { node: TaskId, result: Result<String> },
    BrokenDown { node: TaskId, result: Result<String> },
    SubtaskGenerated { board: Uuid, index: usize, result: Result<String> },
    Summaries { path: PathBuf, results: Vec<(SummaryRequest, Result<String>)> },
    Process { target: RunTarget, event: RunEvent },
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Owns the session and drives it from one loop. Commands come in from the
/// shell; network calls, environment work and processes run in spawned tasks
/// and report back as events, so the session is only ever touched here.
pub struct Controller {
    session: Session,
    llm: Arc<dyn LlmClient>,
    store: ProjectStore,
    notifier: Arc<dyn Notifier>,
    summary_chars: usize,
    in_flight: HashSet<Job>,
    inputs: HashMap<RunTarget, mpsc::UnboundedSender<String>>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
}

impl Controller {
    pub fn new(llm: Arc<dyn LlmClient>, store: ProjectStore, notifier: Arc<dyn Notifier>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(),
            llm,
            store,
            notifier,
            summary_chars: 50,
            in_flight: HashSet::new(),
            inputs: HashMap::new(),
            events_tx: tx,
            events_rx: rx,
        }
    }

    pub fn with_summary_chars(mut self, chars: usize) -> Self {
        self.summary_chars = chars;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs until `quit`, or until the command channel closes and every
    /// in-flight job has reported back. Returns the final session.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Session {
        info!("Controller started.");
        let mut accepting = true;

        loop {
            if !accepting && self.in_flight.is_empty() {
                break;
            }

            tokio::select! {
                command = commands.recv(), if accepting => match command {
                    Some(Command::Quit) => break,
                    Some(command) => self.handle_command(command),
                    None => {
                        accepting = false;
                        // closes stdin of anything still waiting for input
                        self.inputs.clear();
                    }
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        info!(pending = self.in_flight.len(), "Controller stopped.");
        self.session
    }

    fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    fn claim(&mut self, job: Job) -> Result<(), ForgeError> {
        if !self.in_flight.insert(job) {
            warn!(job = %job, "Rejected: already in flight");
            return Err(ForgeError::Busy(job.to_string()));
        }
        Ok(())
    }

    fn release(&mut self, job: Job) {
        self.in_flight.remove(&job);
    }

    pub fn handle_command(&mut self, command: Command) {
        let title = match &command {
            Command::NewProject(_) | Command::OpenProject(_) => "Project",
            Command::NewFile(_) | Command::OpenFile(_) => "File",
            Command::Submit(_) => "Submit",
            Command::Execute | Command::Run | Command::Input(_) => "Execute",
            Command::Approve => "Approve",
            Command::Refactor => "Refactor",
            Command::Breakdown => "Breakdown",
            Command::Delete => "Delete",
            Command::Render(_) => "Render",
            _ => "Task",
        };

        if let Err(e) = self.dispatch(command) {
            warn!(error = %e, "Command rejected");
            self.notify(Notice::from_error(title, &e));
        }
    }

    fn dispatch(&mut self, command: Command) -> Result<(), ForgeError> {
        match command {
            Command::NewProject(name) => self.start_project(name),
            Command::OpenProject(path) => {
                let project = self.store.open_project(&path)?;
                let name = project.name();
                self.session.set_project(project);
                self.notify(Notice::info("Project", format!("Current Project: {name}")));
                Ok(())
            }
            Command::NewFile(name) => {
                let path = self.session.project_mut()?.create_file(&name)?;
                self.notify(Notice::info("File", format!("Created new file: {}", path.display())));
                Ok(())
            }
            Command::OpenFile(name) => {
                let content = self.session.project_mut()?.open_file(&name)?;
                self.notify(Notice::info("File", content));
                Ok(())
            }
            Command::Submit(prompt) => self.start_analysis(prompt),
            Command::Execute => {
                let file = self.session.execution_file()?;
                let node = self.session.current;
                let target = RunTarget::Main(node);
                self.claim(Job::Run(target))?;
                self.session.begin_main_execution(node);
                self.launch(target, file)
            }
            Command::Run => {
                let file = self.session.scratch_file()?;
                self.claim(Job::Run(RunTarget::Scratch))?;
                self.session.begin_scratch_execution();
                self.launch(RunTarget::Scratch, file)
            }
            Command::Input(text) => {
                let sender = self.inputs.get(&RunTarget::Scratch)
                    .ok_or_else(|| ForgeError::InvalidCommand("no running process to send input to".to_string()))?;
                sender.send(text)
                    .map_err(|_| ForgeError::InvalidCommand("process input is closed".to_string()))
            }
            Command::Approve => {
                if self.session.approve_current()? {
                    self.notify(Notice::info("Approve", "Task approved and marked as complete."));
                } else {
                    self.notify(Notice::info("Approve", "Task already completed."));
                }
                Ok(())
            }
            Command::Refactor => self.start_refactor(),
            Command::Breakdown => self.start_breakdown(),
            Command::Delete => {
                self.session.delete_current()?;
                self.notify(Notice::info("Delete", "Task deleted."));
                Ok(())
            }
            Command::Select(name) => {
                let id = self.session.select(&name)?;
                self.notify(Notice::info("Task", format!("Selected {name} ({id})")));
                Ok(())
            }
            Command::Show => {
                let text = self.describe_current()?;
                self.notify(Notice::info("Task", text));
                Ok(())
            }
            Command::Tree => {
                let outline = self.session.tree.outline(self.session.current);
                self.notify(Notice::info("Task Tree", outline));
                Ok(())
            }
            Command::Render(path) => self.start_render(path),
            Command::Subtasks => {
                let text = self.session.board()?.describe();
                self.notify(Notice::info("Subtasks", text));
                Ok(())
            }
            Command::SubtaskSubmit { index, prompt } => self.start_subtask(index, prompt),
            Command::SubtaskExecute(index) => {
                let board = self.session.board()?.id;
                let target = RunTarget::Subtask { board, index };
                self.claim(Job::Run(target))?;
                let file = match self.session.begin_subtask_execution(index) {
                    Ok(file) => file,
                    Err(e) => {
                        self.release(Job::Run(target));
                        return Err(e);
                    }
                };
                self.launch(target, file)
            }
            Command::SubtaskApprove(index) => {
                let outcome = self.session.approve_subtask(index)?;
                self.notify(Notice::info("Subtask", format!("Subtask #{index} approved.")));
                if !outcome.offered_to.is_empty() {
                    self.notify(Notice::info(
                        "Subtask",
                        format!("Include Subtask #{index} is now available to subtasks {:?}", outcome.offered_to),
                    ));
                }
                if outcome.all_complete {
                    self.notify(Notice::info("Success", "All subtasks have been completed and approved!"));
                }
                Ok(())
            }
            Command::SubtaskInclude { target, included } => {
                self.session.include_subtask(target, included)?;
                self.notify(Notice::info(
                    "Subtask Included",
                    format!("Code from subtask #{included} has been included in this subtask."),
                ));
                Ok(())
            }
            Command::SubtaskShow(index) => {
                let run = self.session.board()?.run(index)?;
                let text = format!(
                    "Subtask {} of {}\n{}\n--- code ---\n{}\n--- output ---\n{}",
                    run.index, run.total, run.prompt, run.code, run.output.text()
                );
                self.notify(Notice::info("Subtask", text));
                Ok(())
            }
            Command::Help => {
                self.notify(Notice::info("Help", HELP));
                Ok(())
            }
            Command::Quit => Ok(()),
        }
    }

    fn describe_current(&self) -> Result<String, ForgeError> {
        let id = self.session.current;
        let task = self.session.current_task()?;
        Ok(format!(
            "{} [{}]\n{}\n--- code ---\n{}\n--- output ---\n{}",
            self.session.tree.filename(id)?,
            task.status,
            task.prompt,
            task.code.as_deref().unwrap_or_default(),
            task.output.as_deref().unwrap_or_default()
        ))
    }

    fn start_project(&mut self, name: String) -> Result<(), ForgeError> {
        self.claim(Job::Project)?;
        let store = self.store.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = store.create_project(&name).await;
            let _ = tx.send(Event::ProjectCreated(result));
        });
        Ok(())
    }

    fn start_analysis(&mut self, prompt: String) -> Result<(), ForgeError> {
        self.session.check_submit(&prompt)?;
        let project = self.session.project()?.clone();
        self.claim(Job::Analysis)?;

        let llm = self.llm.clone();
        let store = self.store.clone();
        let tx = self.events_tx.clone();
        let timestamp = unix_timestamp();
        self.notify(Notice::info("Submit", "Analyzing prompt..."));

        tokio::spawn(async move {
            let result = analyse(llm.as_ref(), &store, &project, &prompt).await;
            let _ = tx.send(Event::Analysis { prompt, timestamp, result });
        });
        Ok(())
    }

    fn start_refactor(&mut self) -> Result<(), ForgeError> {
        let code = self.session.check_refactor()?;
        self.claim(Job::Refactor)?;
        let node = self.session.current;
        let llm = self.llm.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = llm.generate(&refactor_prompt(&code)).await;
            let _ = tx.send(Event::Refactored { node, result });
        });
        Ok(())
    }

    fn start_breakdown(&mut self) -> Result<(), ForgeError> {
        let prompt = self.session.check_breakdown()?;
        self.claim(Job::Breakdown)?;
        let node = self.session.current;
        let llm = self.llm.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = llm.generate(&breakdown_prompt(&prompt)).await;
            let _ = tx.send(Event::BrokenDown { node, result });
        });
        Ok(())
    }

    fn start_subtask(&mut self, index: usize, edited: Option<String>) -> Result<(), ForgeError> {
        self.session.project()?;
        let board_id = self.session.board()?.id;
        self.claim(Job::Subtask(index))?;
        let prompt = match self.session.board_mut().and_then(|b| b.prepare_submit(index, edited)) {
            Ok(prompt) => prompt,
            Err(e) => {
                self.release(Job::Subtask(index));
                return Err(e);
            }
        };

        let llm = self.llm.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = llm.generate(&prompt).await;
            let _ = tx.send(Event::SubtaskGenerated { board: board_id, index, result });
        });
        Ok(())
    }

    fn start_render(&mut self, path: PathBuf) -> Result<(), ForgeError> {
        self.claim(Job::Summaries)?;
        let requests = self.session.summaries.stale(&self.session.tree);
        info!(requests = requests.len(), "Refreshing task summaries");
        let llm = self.llm.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let results = generate_summaries(llm.as_ref(), requests).await;
            let _ = tx.send(Event::Summaries { path, results });
        });
        Ok(())
    }

    /// Starts the process for `target`; the run job must already be claimed.
    fn launch(&mut self, target: RunTarget, file: PathBuf) -> Result<(), ForgeError> {
        let started = self.session.project()
            .map_err(anyhow::Error::from)
            .and_then(|project| ProcessRunner::new(self.store.interpreter(project)).start(&file));
        let running = match started {
            Ok(running) => running,
            Err(e) => {
                self.release(Job::Run(target));
                if let RunTarget::Subtask { index, .. } = target {
                    let _ = self.session.board_mut().and_then(|b| b.abort_execution(index));
                }
                error!(error = ?e, file = %file.display(), "Failed to start process");
                self.notify(Notice::info("Error", format!("Exception in run_code: {e:#}")));
                return Ok(());
            }
        };

        let (mut events, stdin) = running.into_parts();
        if let Some(mut stdin) = stdin {
            let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
            tokio::spawn(async move {
                while let Some(line) = input_rx.recv().await {
                    if let Err(e) = send_input(&mut stdin, &line).await {
                        warn!(error = %e, "Failed to write process input");
                        break;
                    }
                }
            });
            self.inputs.insert(target, input_tx);
        }

        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if tx.send(Event::Process { target, event }).is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::ProjectCreated(result) => {
                self.release(Job::Project);
                match result {
                    Ok(project) => {
                        let name = project.name();
                        self.session.set_project(project);
                        self.notify(Notice::info("Project", format!("Current Project: {name}")));
                    }
                    Err(e) => {
                        error!(error = ?e, "Project creation failed");
                        self.notify(Notice::error("Error", format!("An error occurred: {e:#}")));
                    }
                }
            }
            Event::Analysis { prompt, timestamp, result } => {
                self.release(Job::Analysis);
                match result {
                    Ok(outcome) => self.apply_analysis(&prompt, timestamp, outcome),
                    Err(e) => {
                        error!(error = ?e, "Analysis failed");
                        self.notify(Notice::error(
                            "Error",
                            format!("An error occurred while analyzing complexity: {e:#}"),
                        ));
                    }
                }
            }
            Event::Refactored { node, result } => {
                self.release(Job::Refactor);
                match result {
                    Ok(response) => match self.session.apply_refactor(node, &extract_code(&response)) {
                        Ok(()) => self.notify(Notice::info("Refactor", "Task refactored successfully.")),
                        Err(e) => self.notify(Notice::from_error("Refactor", &e)),
                    },
                    Err(e) => {
                        error!(error = ?e, "Refactor failed");
                        self.notify(Notice::error(
                            "Error",
                            format!("An error occurred while refactoring: {e:#}"),
                        ));
                    }
                }
            }
            Event::BrokenDown { node, result } => {
                self.release(Job::Breakdown);
                match result {
                    Ok(response) => match self.session.apply_breakdown(node, &split_lines(&response)) {
                        Ok(board) => {
                            let text = format!("Task broken down into {} subtasks.\n{}", board.total(), board.describe());
                            self.notify(Notice::info("Breakdown", text));
                        }
                        Err(e) => self.notify(Notice::from_error("Breakdown", &e)),
                    },
                    Err(e) => {
                        error!(error = ?e, "Breakdown failed");
                        self.notify(Notice::error(
                            "Error",
                            format!("An error occurred while breaking down the task: {e:#}"),
                        ));
                    }
                }
            }
            Event::SubtaskGenerated { board, index, result } => {
                self.release(Job::Subtask(index));
                if self.session.board.as_ref().map(|b| b.id) != Some(board) {
                    warn!(board = %board, subtask = index, "Generated code for a replaced board dropped");
                    return;
                }
                match result {
                    Ok(response) => match self.session.apply_subtask_code(index, &extract_code(&response)) {
                        Ok(path) => {
                            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                            self.notify(Notice::info("Success", format!("Subtask saved successfully as {name}")));
                        }
                        Err(e) => self.notify(Notice::from_error("Subtask", &e)),
                    },
                    Err(e) => {
                        error!(error = ?e, subtask = index, "Subtask generation failed");
                        self.notify(Notice::error(
                            "Error",
                            format!("An error occurred while submitting subtask: {e:#}"),
                        ));
                    }
                }
            }
            Event::Summaries { path, results } => {
                self.release(Job::Summaries);
                let labels = self.session.summaries.absorb(results);
                let scene = layout(&self.session.tree, &labels, self.summary_chars);
                match std::fs::write(&path, scene.to_svg()) {
                    Ok(()) => self.notify(Notice::info("Render", format!("Task tree rendered to {}", path.display()))),
                    Err(e) => {
                        error!(error = ?e, path = %path.display(), "Failed to write task graph");
                        self.notify(Notice::error("Error", format!("Failed to write {}: {e}", path.display())));
                    }
                }
            }
            Event::Process { target, event } => {
                match &event {
                    RunEvent::Output(chunk) => self.notifier.stream(&label(target), chunk),
                    RunEvent::Finished(code) => {
                        self.release(Job::Run(target));
                        self.inputs.remove(&target);
                        let message = match (target, code) {
                            (RunTarget::Subtask { index, .. }, _) => {
                                format!("Process finished. Subtask #{index} can now be approved.")
                            }
                            (_, Some(code)) => format!("Process finished with exit code {code}."),
                            (_, None) => "Process finished.".to_string(),
                        };
                        self.notify(Notice::info("Execute", message));
                    }
                }
                self.session.apply_run_event(target, &event);
            }
        }
    }

    fn apply_analysis(&mut self, prompt: &str, timestamp: u64, outcome: AnalysisOutcome) {
        self.session.last_analysis = outcome.response.clone();
        self.notify(Notice::info("Complete Output", outcome.response));

        if let Some(report) = outcome.install.filter(|r| !r.is_clean()) {
            self.notify(Notice::warning(
                "Install",
                format!("Some libraries could not be installed: {}", report.failed_names().join(", ")),
            ));
        }

        match outcome.classification {
            Classification::Simple { code } => match self.session.apply_simple(prompt, &code, timestamp) {
                Ok(id) => {
                    let filename = self.session.tree.filename(id).unwrap_or_default();
                    self.notify(Notice::info("Submit", format!("Code generation completed ({filename}).\n{code}")));
                }
                Err(e) => self.notify(Notice::from_error("Submit", &e)),
            },
            Classification::Subtasks { listing, items } => {
                match self.session.apply_decomposition(prompt, &listing, &items, timestamp) {
                    Ok(board) => {
                        let text = format!("Task broken down into {} subtasks.\n{}", board.total(), board.describe());
                        self.notify(Notice::info("Submit", text));
                    }
                    Err(e) => self.notify(Notice::from_error("Submit", &e)),
                }
            }
        }
    }
}

fn label(target: RunTarget) -> String {
    match target {
        RunTarget::Main(id) => format!("task {id}"),
        RunTarget::Subtask { index, .. } => format!("subtask #{index}"),
        RunTarget::Scratch => "run".to_string(),
    }
}

/// Classifies the prompt and, for SIMPLE replies with code, prepares the
/// project environment and installs the inferred libraries.
pub async fn analyse(
    llm: &dyn LlmClient,
    store: &ProjectStore,
    project: &Project,
    prompt: &str,
) -> Result<AnalysisOutcome> {
    info!(llm = llm.name(), "Requesting prompt analysis");
    let response = llm.generate(&analysis_prompt(prompt)).await?.trim().to_string();
    let classification = classify(&response);

    let install = match &classification {
        Classification::Simple { code } if !code.trim().is_empty() => {
            store.ensure_environment(project).await?;
            let libraries = parse_libraries(code);
            info!(libraries = ?libraries, "Installing inferred libraries");
            Some(install_all(store.environment().as_ref(), &project.env_dir, &libraries).await)
        }
        _ => None,
    };

    Ok(AnalysisOutcome { response, classification, install })
}
