// Dayboard - personal productivity dashboard sync core
// Entry point: opens the configured backend, restores staged edits and runs one command

use anyhow::{bail, Context};
use dayboard::app::{data_dir_from_env, AppState};
use dayboard::database::{Idea, Todo};
use dayboard::services::LogNotifier;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: dayboard [list | flush | add-todo <task> [category] | \
add-idea <idea> [category] | complete-todo <id> | complete-idea <id>]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dayboard=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Dayboard");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let data_dir = data_dir_from_env();

    let state = AppState::open(data_dir.clone(), Arc::new(LogNotifier))
        .await
        .with_context(|| format!("failed to open data directory {:?}", data_dir))?;

    // Picks up edits left staged by an earlier session
    state.reload_all().await.context("failed to load lists")?;

    match args.first().map(String::as_str) {
        None | Some("list") | Some("flush") => {}
        Some("add-todo") => {
            let Some(task) = args.get(1) else { bail!(USAGE) };
            let category = args.get(2).cloned().unwrap_or_default();
            state.todos.add(Todo::new(task.clone(), category));
        }
        Some("add-idea") => {
            let Some(idea) = args.get(1) else { bail!(USAGE) };
            let category = args.get(2).cloned().unwrap_or_default();
            state.ideas.add(Idea::new(idea.clone(), category));
        }
        Some("complete-todo") => {
            let Some(id) = args.get(1) else { bail!(USAGE) };
            if !state.todos.complete(id) {
                bail!("no todo with id {}", id);
            }
        }
        Some("complete-idea") => {
            let Some(id) = args.get(1) else { bail!(USAGE) };
            if !state.ideas.complete(id) {
                bail!("no idea with id {}", id);
            }
        }
        Some(other) => bail!("unknown command '{}'\n{}", other, USAGE),
    }

    state.shutdown().await.context("failed to commit staged changes")?;

    let listing = serde_json::json!({
        "todos": state.todos.items(),
        "ideas": state.ideas.items(),
    });
    println!("{}", serde_json::to_string_pretty(&listing)?);

    Ok(())
}
