use std::{io, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{AuthState, InMemoryTodoBackend, SessionIdentity, TodoListController};
use shared::domain::OwnerId;
use tracing::info;

mod config;
mod shell;

use config::{load_settings, Settings};
use shell::Shell;

#[derive(Parser, Debug)]
#[command(about = "Personal todo list in the terminal")]
struct Args {
    #[arg(long, default_value = "todo.toml")]
    config: PathBuf,
    /// Sign in as this user at startup.
    #[arg(long)]
    owner: Option<String>,
    /// Artificial backend delay per mutation.
    #[arg(long)]
    latency_ms: Option<u64>,
    #[arg(long)]
    log_filter: Option<String>,
    /// Print views as JSON.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(owner) = &self.owner {
            settings.owner_id = Some(owner.clone());
        }
        if let Some(latency_ms) = self.latency_ms {
            settings.latency_ms = latency_ms;
        }
        if let Some(filter) = &self.log_filter {
            settings.log_filter = filter.clone();
        }
        settings.json |= self.json;
    }
}

fn build_backend(settings: &Settings) -> Arc<InMemoryTodoBackend> {
    let backend = if settings.latency_ms > 0 {
        InMemoryTodoBackend::with_latency(Duration::from_millis(settings.latency_ms))
    } else {
        InMemoryTodoBackend::new()
    };
    if let Some(owner_id) = &settings.owner_id {
        let owner_id = OwnerId::from(owner_id.as_str());
        for text in &settings.seed {
            backend.seed(&owner_id, text, false);
        }
    }
    Arc::new(backend)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config)
        .with_context(|| format!("failed to load settings from {}", args.config.display()))?;
    args.apply(&mut settings);

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(io::stderr)
        .init();
    info!(owner = ?settings.owner_id, latency_ms = settings.latency_ms, "starting todo shell");

    let backend = build_backend(&settings);
    let identity = Arc::new(match &settings.owner_id {
        Some(owner_id) => SessionIdentity::signed_in(owner_id.as_str()),
        None => SessionIdentity::new(AuthState::SignedOut),
    });
    let controller = TodoListController::new(backend, identity.clone())?;

    Shell::new(controller, identity, io::stdout())
        .with_json(settings.json)
        .run()
        .await
}
