use std::path::PathBuf;
use std::str::FromStr;
use crate::error::ForgeError;

pub const HELP: &str = "\
Commands:
  project new <name>            create a project with main.py and a venv
  project open <path>           open an existing project directory
  file new <name>               create <name>.py in the project
  file open <name>              open a project file as the current file
  submit <prompt>               classify and generate code for a prompt
  execute                       run the current task's file
  approve                       mark the current task complete
  refactor                      ask the model to refactor the current task
  breakdown                     break the current task into subtasks
  delete                        delete the current task and its subtree
  select <name>                 select a task by filename (e.g. Root-1)
  show                          show the current task
  tree                          print the task tree
  render <file.svg>             render the task graph with summaries
  run                           run the current project file
  input <text>                  send a line to the running file
  subtasks                      list the active subtasks
  subtask <i> submit [prompt]   generate code for subtask i
  subtask <i> execute           run subtask i
  subtask <i> approve           approve subtask i
  subtask <i> include <j>       prepend approved subtask j to subtask i
  subtask <i> show              show subtask i
  help | quit";

/// One user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    NewProject(String),
    OpenProject(PathBuf),
    NewFile(String),
    OpenFile(String),
    Submit(String),
    Execute,
    Approve,
    Refactor,
    Breakdown,
    Delete,
    Select(String),
    Show,
    Tree,
    Render(PathBuf),
    Run,
    Input(String),
    Subtasks,
    SubtaskSubmit { index: usize, prompt: Option<String> },
    SubtaskExecute(usize),
    SubtaskApprove(usize),
    SubtaskInclude { target: usize, included: usize },
    SubtaskShow(usize),
    Help,
    Quit,
}

fn required(rest: &str, what: &str) -> Result<String, ForgeError> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(ForgeError::InvalidCommand(format!("missing {what}")));
    }
    Ok(rest.to_string())
}

fn index(word: Option<&str>) -> Result<usize, ForgeError> {
    word.and_then(|w| w.trim_start_matches('#').parse().ok())
        .ok_or_else(|| ForgeError::InvalidCommand("expected a subtask number".to_string()))
}

impl FromStr for Command {
    type Err = ForgeError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match head {
            "project" => {
                let (sub, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                match sub {
                    "new" => Command::NewProject(required(arg, "project name")?),
                    "open" => Command::OpenProject(PathBuf::from(required(arg, "project path")?)),
                    _ => return Err(ForgeError::InvalidCommand(line.to_string())),
                }
            }
            "file" => {
                let (sub, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                match sub {
                    "new" => Command::NewFile(required(arg, "file name")?),
                    "open" => Command::OpenFile(required(arg, "file name")?),
                    _ => return Err(ForgeError::InvalidCommand(line.to_string())),
                }
            }
            "submit" => Command::Submit(required(rest, "prompt")?),
            "execute" => Command::Execute,
            "approve" => Command::Approve,
            "refactor" => Command::Refactor,
            "breakdown" => Command::Breakdown,
            "delete" => Command::Delete,
            "select" => Command::Select(required(rest, "task name")?),
            "show" => Command::Show,
            "tree" => Command::Tree,
            "render" => Command::Render(PathBuf::from(required(rest, "output path")?)),
            "run" => Command::Run,
            "input" => Command::Input(rest.to_string()),
            "subtasks" => Command::Subtasks,
            "subtask" => {
                let mut words = rest.splitn(3, char::is_whitespace);
                let target = index(words.next())?;
                let action = words.next().unwrap_or("show");
                let arg = words.next().map(str::trim).unwrap_or_default();
                match action {
                    "submit" => Command::SubtaskSubmit {
                        index: target,
                        prompt: (!arg.is_empty()).then(|| arg.to_string()),
                    },
                    "execute" => Command::SubtaskExecute(target),
                    "approve" => Command::SubtaskApprove(target),
                    "include" => Command::SubtaskInclude { target, included: index(Some(arg))? },
                    "show" => Command::SubtaskShow(target),
                    _ => return Err(ForgeError::InvalidCommand(line.to_string())),
                }
            }
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(ForgeError::InvalidCommand(line.to_string())),
        };
        Ok(command)
    }
}
