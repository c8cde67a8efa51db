//! Settings service
//!
//! Manages application settings persistence using JSON file storage.

use crate::config::{
    DEFAULT_COMMIT_DELAY_MS, DEFAULT_DATABASE_FILE, DEFAULT_UNDO_TTL_MS, MAX_COMMIT_DELAY_MS,
    MIN_COMMIT_DELAY_MS,
};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// Where list rows are stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendSettings {
    /// Direct table client over a SQLite file (relative paths resolve against the data dir)
    Sqlite {
        #[serde(default = "default_database_file")]
        path: String,
    },
    /// HTTP webhook endpoints
    Webhook {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
    },
}

fn default_database_file() -> String {
    DEFAULT_DATABASE_FILE.to_string()
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings::Sqlite {
            path: default_database_file(),
        }
    }
}

/// Staging and undo behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingSettings {
    /// Undo window before staged edits are committed, in milliseconds
    #[serde(default = "default_commit_delay")]
    pub commit_delay_ms: u64,
    /// How long Undo notifications stay visible
    #[serde(default = "default_undo_ttl")]
    pub undo_ttl_ms: u64,
    /// Keep staged edits in the local store so a restart does not lose them
    #[serde(default = "default_true")]
    pub persist_staged: bool,
}

fn default_commit_delay() -> u64 {
    DEFAULT_COMMIT_DELAY_MS
}

fn default_undo_ttl() -> u64 {
    DEFAULT_UNDO_TTL_MS
}

fn default_true() -> bool {
    true
}

impl Default for StagingSettings {
    fn default() -> Self {
        Self {
            commit_delay_ms: default_commit_delay(),
            undo_ttl_ms: default_undo_ttl(),
            persist_staged: true,
        }
    }
}

impl StagingSettings {
    /// Commit delay clamped to the supported range
    pub fn commit_delay(&self) -> Duration {
        Duration::from_millis(
            self.commit_delay_ms
                .clamp(MIN_COMMIT_DELAY_MS, MAX_COMMIT_DELAY_MS),
        )
    }

    fn validate(&self) -> Result<()> {
        if !(MIN_COMMIT_DELAY_MS..=MAX_COMMIT_DELAY_MS).contains(&self.commit_delay_ms) {
            return Err(AppError::Settings(format!(
                "Commit delay must be between {} and {} ms",
                MIN_COMMIT_DELAY_MS, MAX_COMMIT_DELAY_MS
            )));
        }
        Ok(())
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub staging: StagingSettings,
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join("settings.json"),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Settings(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Settings(format!("Failed to serialize settings: {}", e)))?;

        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Get backend settings
    pub async fn get_backend(&self) -> Result<BackendSettings> {
        let settings = self.load().await?;
        Ok(settings.backend)
    }

    /// Update backend settings; takes effect on next start
    pub async fn update_backend(&self, backend: BackendSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.backend = backend;
        self.save(&settings).await?;
        Ok(())
    }

    /// Get staging settings
    pub async fn get_staging(&self) -> Result<StagingSettings> {
        let settings = self.load().await?;
        Ok(settings.staging)
    }

    /// Update staging settings
    pub async fn update_staging(&self, staging: StagingSettings) -> Result<()> {
        staging.validate()?;

        let mut settings = self.load().await?;
        settings.staging = staging;
        self.save(&settings).await?;
        Ok(())
    }
}
