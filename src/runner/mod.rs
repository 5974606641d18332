use std::path::{Path, PathBuf};
use std::process::Stdio;
use anyhow::{Result, Context as AnyhowContext, anyhow};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub const FINISHED_MARKER: &str = "Process finished.";

/// Streamed from a running process, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A chunk of merged stdout/stderr. May split lines.
    Output(String),
    /// Both streams closed and the child exited. `None` when killed by a signal.
    Finished(Option<i32>),
}

/// Append-only text buffer for process output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBuffer {
    text: String,
    finished: bool,
}

impl OutputBuffer {
    pub fn push_chunk(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    /// Appends the completion marker on its own line and flips the completion flag.
    pub fn finish(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(FINISHED_MARKER);
        self.text.push('\n');
        self.finished = true;
    }

    pub fn apply(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Output(chunk) => self.push_chunk(chunk),
            RunEvent::Finished(_) => self.finish(),
        }
    }

    /// Starts a new run. Previous output is kept; the completion flag resets.
    pub fn restart(&mut self) {
        self.finished = false;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A started process. Events arrive on `events`; stdin stays open until dropped.
#[derive(Debug)]
pub struct RunningProcess {
    pub pid: Option<u32>,
    pub events: mpsc::UnboundedReceiver<RunEvent>,
    stdin: Option<ChildStdin>,
}

impl RunningProcess {
    /// Splits the stdin handle off so events can be consumed elsewhere.
    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<RunEvent>, Option<ChildStdin>) {
        (self.events, self.stdin)
    }
}

/// Writes one line to a running process.
pub async fn send_input(stdin: &mut ChildStdin, line: &str) -> Result<()> {
    stdin.write_all(format!("{line}\n").as_bytes()).await?;
    stdin.flush().await?;
    Ok(())
}

/// Launches an interpreter against a file.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    interpreter: PathBuf,
}

impl ProcessRunner {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self { interpreter: interpreter.into() }
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Spawns `<interpreter> <file>` with the system environment plus
    /// `PYTHONUNBUFFERED=1`. No timeout; the process runs until it exits.
    pub fn start(&self, file: &Path) -> Result<RunningProcess> {
        if !file.is_file() {
            return Err(anyhow!("File not found: {}", file.display()));
        }

        let mut child = Command::new(&self.interpreter)
            .arg(file)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.interpreter.display()))?;

        let pid = child.id();
        info!(pid = ?pid, interpreter = %self.interpreter.display(), file = %file.display(), "Process started");

        let stdout = child.stdout.take().ok_or_else(|| anyhow!("stdout not captured"))?;
        let stderr = child.stderr.take().ok_or_else(|| anyhow!("stderr not captured"))?;
        let stdin = child.stdin.take();

        let (tx, rx) = mpsc::unbounded_channel();
        let out_reader = tokio::spawn(forward(stdout, tx.clone()));
        let err_reader = tokio::spawn(forward(stderr, tx.clone()));

        tokio::spawn(async move {
            let _ = out_reader.await;
            let _ = err_reader.await;
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    error!(pid = ?pid, error = ?e, "Failed to reap process");
                    None
                }
            };
            info!(pid = ?pid, code = ?code, "Process exited");
            let _ = tx.send(RunEvent::Finished(code));
        });

        Ok(RunningProcess { pid, events: rx, stdin })
    }
}

async fn forward<R: AsyncRead + Unpin>(mut reader: R, tx: mpsc::UnboundedSender<RunEvent>) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                if tx.send(RunEvent::Output(chunk)).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "Output stream closed with error");
                break;
            }
        }
    }
}
