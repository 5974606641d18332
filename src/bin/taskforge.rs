use clap::Parser;
use taskforge::config::loader::load_settings_from_yaml;
use taskforge::llm::gemini::GeminiClient;
use taskforge::project::ProjectStore;
use taskforge::project::env::VenvManager;
use taskforge::runtime::command::Command;
use taskforge::runtime::controller::Controller;
use taskforge::runtime::notice::{ConsoleNotifier, Notice, Notifier};
use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Generate, run and approve LLM-written code as a task tree", long_about = None)]
struct Cli {
    /// Path to the YAML settings file
    #[arg(long, short, default_value = "taskforge.yaml")]
    config: PathBuf,

    /// Directory new projects are created in (overrides the settings file)
    #[arg(long, short)]
    workspace: Option<PathBuf>,

    /// Read commands from a file instead of stdin
    #[arg(long)]
    script: Option<PathBuf>,
}

async fn read_commands<R: AsyncBufRead + Unpin>(reader: R, tx: mpsc::Sender<Command>, notifier: Arc<dyn Notifier>) {
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                let quit = command == Command::Quit;
                if tx.send(command).await.is_err() || quit {
                    break;
                }
            }
            Err(e) => notifier.notify(Notice::warning("Command", format!("{e} (try `help`)"))),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // Missing credentials are fatal.
    let mut settings = load_settings_from_yaml(&cli.config)?;
    if let Some(workspace) = cli.workspace {
        settings.workspace = workspace;
    }
    info!(model = %settings.google.model, workspace = %settings.workspace.display(), "Settings loaded");

    let llm = Arc::new(GeminiClient::from_settings(&settings.google)?);
    let store = ProjectStore::new(settings.workspace.clone(), Arc::new(VenvManager::new(settings.python.clone())));
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    let controller = Controller::new(llm, store, notifier.clone())
        .with_summary_chars(settings.summary_chars);

    let (tx, rx) = mpsc::channel(32);
    match cli.script {
        Some(path) => {
            let file = tokio::fs::File::open(&path).await?;
            tokio::spawn(read_commands(BufReader::new(file), tx, notifier.clone()));
        }
        None => {
            println!("Type `help` for commands.");
            tokio::spawn(read_commands(BufReader::new(tokio::io::stdin()), tx, notifier.clone()));
        }
    }

    let session = controller.run(rx).await;
    info!(tasks = session.tree.walk().len(), "Session ended.");
    Ok(())
}
