use regex::Regex;
use std::sync::OnceLock;
use crate::parsing::code::extract_code;

pub const SUBTASKS_MARKER: &str = "SUBTASKS:";
pub const SIMPLE_MARKER: &str = "SIMPLE:";

fn numbered() -> &'static Regex {
    static NUMBERED: OnceLock<Regex> = OnceLock::new();
    NUMBERED.get_or_init(|| Regex::new(r"^\d+\.").expect("numbered item pattern is valid"))
}

/// Outcome of the analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Generated directly; `code` may be empty when the model produced no block.
    Simple { code: String },
    /// `listing` is the numbered list as the model wrote it, `items` one entry per subtask.
    Subtasks { listing: String, items: Vec<String> },
}

pub fn classify(response: &str) -> Classification {
    if !response.contains(SUBTASKS_MARKER) {
        return Classification::Simple { code: extract_code(response) };
    }

    let listing = numbered_listing(response).unwrap_or_default().to_string();
    let items = split_tasks(&listing);
    Classification::Subtasks { listing, items }
}

/// Slice of `text` starting at the first line that begins with a numeral and a period.
fn numbered_listing(text: &str) -> Option<&str> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if numbered().is_match(trimmed) {
            let indent = line.len() - trimmed.len();
            return Some(&text[offset + indent..]);
        }
        offset += line.len();
    }
    None
}

/// Splits a numbered list into one entry per item. Lines are trimmed; a line
/// without a leading numeral continues the previous item and is appended
/// without a separator.
pub fn split_tasks(text: &str) -> Vec<String> {
    let mut tasks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let line = line.trim();
        if numbered().is_match(line) && !current.is_empty() {
            tasks.push(std::mem::take(&mut current));
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        tasks.push(current);
    }
    tasks
}

/// Splits a free-form breakdown reply into one subtask per non-empty line.
pub fn split_lines(text: &str) -> Vec<String> {
    text.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
