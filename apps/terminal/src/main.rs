use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use client_core::{
    load_settings, BackendUnavailablePolicy, DocQaController, HttpBackend, SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

use commands::Command;

#[derive(Parser, Debug)]
#[command(name = "docqa", about = "Ask questions about your documents from the terminal")]
struct Args {
    /// Base URL of the backend API, e.g. http://127.0.0.1:8000/api
    #[arg(long)]
    api_root: Option<String>,
    /// TOML settings file (defaults to ./docqa.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// `degrade` or `surface-error`
    #[arg(long)]
    on_backend_unavailable: Option<BackendUnavailablePolicy>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(api_root) = &args.api_root {
        settings.set_api_root(api_root)?;
    }
    if let Some(policy) = args.on_backend_unavailable {
        settings.on_backend_unavailable = policy;
    }
    info!(api_root = %settings.api_root, policy = ?settings.on_backend_unavailable, "starting session");

    let backend = HttpBackend::from_settings(&settings)?;
    let controller = DocQaController::new(Arc::new(backend), Arc::new(SystemClock), settings);
    let renderer = tokio::spawn(render::run(controller.subscribe_events()));
    let _startup = controller.start();

    println!("{}", commands::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match commands::parse(&line) {
            Command::Quit => break,
            command => commands::dispatch(&controller, command).await,
        }
    }

    renderer.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_flag_is_parsed_by_clap() {
        let args = Args::try_parse_from(["docqa", "--on-backend-unavailable", "degrade"])
            .expect("valid flag");
        assert_eq!(
            args.on_backend_unavailable,
            Some(BackendUnavailablePolicy::Degrade)
        );

        let args = Args::try_parse_from(["docqa"]).expect("no flags");
        assert_eq!(args.on_backend_unavailable, None);
    }

    #[test]
    fn unknown_policy_is_rejected_at_parse_time() {
        let err = Args::try_parse_from(["docqa", "--on-backend-unavailable", "shrug"])
            .expect_err("invalid flag");
        assert!(err.to_string().contains("shrug"));
    }
}
