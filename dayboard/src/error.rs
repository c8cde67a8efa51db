//! Error types for Dayboard
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to a frontend as plain messages.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote rejected request: {0}")]
    Remote(String),

    #[error("Request failed: {0}")]
    Fetch(String),

    #[error("Local storage error: {0}")]
    Storage(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
