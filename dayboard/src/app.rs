//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::{DATA_DIR_ENV, PREF_KEY_PREFIX};
use crate::database::{create_pool, Idea, SqliteTable, Todo};
use crate::error::Result;
use crate::remote::{RemoteTable, WebhookTable};
use crate::services::{BackendSettings, ListView, Notifier, SettingsService};
use crate::storage::{read_json, write_json, FileStore, KeyValueStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub settings: SettingsService,
    pub store: Arc<dyn KeyValueStore>,
    pub todos: ListView<Todo>,
    pub ideas: ListView<Idea>,
}

impl AppState {
    /// Application setup - called once on startup
    pub async fn open(app_data_dir: PathBuf, notifier: Arc<dyn Notifier>) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("App data directory: {:?}", app_data_dir);

        // Create necessary directories
        std::fs::create_dir_all(&app_data_dir)?;

        let settings = SettingsService::new(app_data_dir.clone());
        let app_settings = settings.load().await?;

        let local = FileStore::new(app_data_dir.join("local"));
        local.initialize()?;
        let store: Arc<dyn KeyValueStore> = Arc::new(local);

        let backend = open_backend(&app_data_dir, &app_settings.backend).await?;

        let todos = ListView::open(
            Arc::clone(&backend),
            Arc::clone(&store),
            Arc::clone(&notifier),
            app_settings.staging.clone(),
        );
        let ideas = ListView::open(backend, Arc::clone(&store), notifier, app_settings.staging);

        tracing::info!("Application initialized successfully");

        Ok(Self {
            app_data_dir,
            settings,
            store,
            todos,
            ideas,
        })
    }

    /// Refresh every list from the backend
    pub async fn reload_all(&self) -> Result<()> {
        let (todos, ideas) = tokio::join!(self.todos.reload(), self.ideas.reload());
        todos?;
        ideas?;
        Ok(())
    }

    /// Commit whatever is still staged; call before exiting
    pub async fn shutdown(&self) -> Result<()> {
        let (todos, ideas) = tokio::join!(self.todos.shutdown(), self.ideas.shutdown());
        todos?;
        ideas?;
        tracing::info!("All staged changes committed");
        Ok(())
    }

    /// Read a UI preference flag
    pub fn preference(&self, name: &str) -> Option<bool> {
        read_json(self.store.as_ref(), &format!("{}{}", PREF_KEY_PREFIX, name))
    }

    /// Store a UI preference flag (best effort)
    pub fn set_preference(&self, name: &str, value: bool) {
        write_json(
            self.store.as_ref(),
            &format!("{}{}", PREF_KEY_PREFIX, name),
            &value,
        );
    }
}

/// Data directory from the environment, or `./dayboard-data`
pub fn data_dir_from_env() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("dayboard-data"))
}

async fn open_backend(
    app_data_dir: &Path,
    backend: &BackendSettings,
) -> Result<Arc<dyn RemoteTable>> {
    match backend {
        BackendSettings::Sqlite { path } => {
            let db_path = app_data_dir.join(path);
            let pool = create_pool(&db_path).await?;
            Ok(Arc::new(SqliteTable::new(pool)))
        }
        BackendSettings::Webhook { base_url, api_key } => {
            tracing::info!("Using webhook backend at {}", base_url);
            Ok(Arc::new(WebhookTable::new(base_url.clone(), api_key.clone())?))
        }
    }
}
