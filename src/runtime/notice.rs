use std::sync::Mutex;
use crate::error::ForgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing message; the shell's stand-in for a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, title: title.into(), message: message.into() }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, title: title.into(), message: message.into() }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, title: title.into(), message: message.into() }
    }

    /// Guard failures are warnings; I/O failures are errors.
    pub fn from_error(title: impl Into<String>, e: &ForgeError) -> Self {
        match e {
            ForgeError::Io(_) => Self::error(title, e.to_string()),
            _ => Self::warning(title, e.to_string()),
        }
    }
}

/// Receives notices and streamed process output.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
    fn stream(&self, _label: &str, _chunk: &str) {}
}

/// Prints to the terminal.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => println!("[{}] {}", notice.title, notice.message),
            NoticeLevel::Warning => eprintln!("[warning: {}] {}", notice.title, notice.message),
            NoticeLevel::Error => eprintln!("[error: {}] {}", notice.title, notice.message),
        }
    }

    fn stream(&self, label: &str, chunk: &str) {
        for line in chunk.lines() {
            println!("{label}| {line}");
        }
    }
}

/// Keeps every notice; used by tests and for replaying a session.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn titled(&self, title: &str) -> Vec<Notice> {
        self.notices().into_iter().filter(|n| n.title == title).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}
