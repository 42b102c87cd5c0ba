mod app;

use anyhow::Context;
use clap::{Parser, Subcommand};
use doc_chat_lib::doc_processor::extract_all;
use doc_chat_lib::session::{ChatSession, IngestReport};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "doc-chat", about = "Ask questions about your documents", version)]
struct Cli {
    /// Config file (default: <config dir>/doc-chat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the key store (default: <data dir>/doc-chat)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// API key; takes precedence over the stored key
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Print the text extracted from files
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, default_value = "plain")]
        format: OutputFormat,
    },

    /// Index files and answer one question
    Ask {
        /// File to index (repeatable)
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,
        question: String,
    },

    /// Index files and chat interactively (`/docs` lists files, `/quit` exits)
    Chat {
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,
    },

    /// Manage the stored API key
    #[command(subcommand)]
    Key(KeyCommand),
}

#[derive(Subcommand)]
enum KeyCommand {
    /// Store a key
    Set { value: String },
    /// Show the stored key, masked
    Show,
    /// Remove the stored key
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let open_app = || app::App::new(cli.config.as_deref(), cli.data_dir.as_deref(), cli.api_key.clone());

    match &cli.command {
        Command::Extract { files, format } => extract(files, format).await,
        Command::Ask { files, question } => ask(&open_app()?, files, question).await,
        Command::Chat { files } => chat(&open_app()?, files).await,
        Command::Key(command) => key(&open_app()?, command),
    }
}

async fn extract(files: &[PathBuf], format: &OutputFormat) -> anyhow::Result<()> {
    let docs = extract_all(app::read_files(files)?).await;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&docs)?),
        OutputFormat::Plain => {
            for doc in docs {
                println!("==> {} <==", doc.name);
                println!("{}\n", doc.text);
            }
        }
    }
    Ok(())
}

async fn ask(app: &app::App, files: &[PathBuf], question: &str) -> anyhow::Result<()> {
    let (embedder, provider) = app.clients()?;
    let mut session = ChatSession::new(app.config.clone());
    let report = session.ingest(&embedder, app::read_files(files)?).await;
    print_report(&report);
    let answer = session
        .ask(&embedder, &provider, question)
        .await
        .context("answering question")?;
    println!("{}", answer);
    Ok(())
}

async fn chat(app: &app::App, files: &[PathBuf]) -> anyhow::Result<()> {
    let (embedder, provider) = app.clients()?;
    let mut session = ChatSession::new(app.config.clone());
    if !files.is_empty() {
        let report = session.ingest(&embedder, app::read_files(files)?).await;
        print_report(&report);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/docs" => {
                for doc in session.documents() {
                    println!(
                        "{} ({}, {} bytes, {} chunks){}",
                        doc.file.name,
                        doc.file.mime_type,
                        doc.file.size,
                        doc.chunk_count,
                        if doc.degraded { " [unreadable]" } else { "" }
                    );
                }
            }
            text => {
                let reply = session.send_message(&embedder, &provider, text).await?;
                println!("{}\n", reply.text);
            }
        }
    }
    Ok(())
}

fn key(app: &app::App, command: &KeyCommand) -> anyhow::Result<()> {
    match command {
        KeyCommand::Set { value } => {
            app.key_store.set_api_key(value)?;
            println!("API key saved.");
        }
        KeyCommand::Show => match app.key_store.masked_api_key()? {
            Some(masked) => println!("{}", masked),
            None => println!("No API key stored."),
        },
        KeyCommand::Clear => {
            app.key_store.clear_api_key()?;
            println!("API key removed.");
        }
    }
    Ok(())
}

fn print_report(report: &IngestReport) {
    eprintln!(
        "Indexed {} file(s), {} chunk(s).",
        report.indexed.len(),
        report.chunks_added
    );
    for name in &report.degraded {
        eprintln!("warning: could not extract text from {}", name);
    }
    for name in &report.failed {
        eprintln!("warning: {} was not indexed", name);
    }
}
