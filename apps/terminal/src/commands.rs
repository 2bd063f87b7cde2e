//! Slash commands typed at the prompt. Anything else is a chat question.

use std::{path::PathBuf, sync::Arc};

use client_core::{advisory_upload_check, DocQaController, UploadFile, DEFAULT_AUDIT_PAGE_SIZE};
use tracing::{debug, warn};

pub const HELP: &str = "\
Type a question and press enter, or use one of:
  /upload <path>...   upload documents
  /refresh            rebuild the document index
  /clear              remove all documents
  /docs               reload the document list
  /status             check backend status again
  /audit [page]       show the requirement traceability report
  /master <file.csv>  import the master requirement list
  /help               show this text
  /quit               exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    Upload(Vec<PathBuf>),
    Refresh,
    Clear,
    Docs,
    Status,
    Audit { page: u32 },
    Master(PathBuf),
    Help,
    Quit,
    Invalid(String),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Submit(_) => "submit",
            Command::Upload(_) => "upload",
            Command::Refresh => "refresh",
            Command::Clear => "clear",
            Command::Docs => "docs",
            Command::Status => "status",
            Command::Audit { .. } => "audit",
            Command::Master(_) => "master",
            Command::Help => "help",
            Command::Quit => "quit",
            Command::Invalid(_) => "invalid",
        }
    }
}

pub fn parse(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Submit(line.to_string());
    };
    let mut words = rest.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match (verb, args.as_slice()) {
        ("upload", []) => Command::Invalid("usage: /upload <path>...".into()),
        ("upload", paths) => Command::Upload(paths.iter().map(PathBuf::from).collect()),
        ("refresh", []) => Command::Refresh,
        ("clear", []) => Command::Clear,
        ("docs", []) => Command::Docs,
        ("status", []) => Command::Status,
        ("audit", []) => Command::Audit { page: 1 },
        ("audit", [page]) => match page.parse() {
            Ok(page) => Command::Audit { page },
            Err(_) => Command::Invalid(format!("not a page number: {page}")),
        },
        ("master", [path]) => Command::Master(PathBuf::from(path)),
        ("master", _) => Command::Invalid("usage: /master <file.csv>".into()),
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        _ => Command::Invalid(format!("unknown command: {trimmed}")),
    }
}

/// Runs a command. Controller work is spawned so the prompt stays responsive;
/// overlapping actions are serialized by the controller.
pub async fn dispatch(controller: &Arc<DocQaController>, command: Command) {
    debug!(command = command.name(), "dispatching");
    let controller = Arc::clone(controller);
    match command {
        Command::Submit(text) => {
            tokio::spawn(async move {
                controller.submit_message(&text).await;
            });
        }
        Command::Upload(paths) => {
            tokio::spawn(async move {
                let files = read_files(&paths).await;
                let selection =
                    advisory_upload_check(files.iter().map(|file| file.file_name.as_str()));
                if !selection.unexpected.is_empty() {
                    println!(
                        "warning: the backend may reject {}",
                        selection.unexpected.join(", ")
                    );
                }
                controller.upload_documents(files).await;
            });
        }
        Command::Refresh => {
            tokio::spawn(async move {
                controller.refresh_index().await;
            });
        }
        Command::Clear => {
            tokio::spawn(async move {
                controller.clear_documents().await;
            });
        }
        Command::Docs => {
            tokio::spawn(async move {
                controller.load_documents().await;
            });
        }
        Command::Status => {
            if controller.recheck_status().is_none() {
                println!("backend is ready");
            }
        }
        Command::Audit { page } => {
            tokio::spawn(async move {
                controller
                    .load_audit_report(page, DEFAULT_AUDIT_PAGE_SIZE)
                    .await;
            });
        }
        Command::Master(path) => {
            tokio::spawn(async move {
                match UploadFile::read(&path).await {
                    Ok(file) => {
                        controller.import_master_list(file).await;
                    }
                    Err(err) => println!("error: {err:#}"),
                }
            });
        }
        Command::Help => println!("{HELP}"),
        Command::Invalid(reason) => println!("{reason}"),
        Command::Quit => {}
    }
}

async fn read_files(paths: &[PathBuf]) -> Vec<UploadFile> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match UploadFile::read(path).await {
            Ok(file) => files.push(file),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable file");
                println!("error: {err:#}");
            }
        }
    }
    files
}
