//! Remote backend access
//!
//! The backend is treated purely as a set of named tables supporting
//! select, upsert-by-key and delete-by-ids. Two clients are provided: the
//! direct SQLite table client in [`crate::database`] and an HTTP webhook
//! client.

pub mod inflight;
pub mod sync;
pub mod webhook;

pub use inflight::InflightRegistry;
pub use sync::RemoteSync;
pub use webhook::WebhookTable;

use crate::error::Result;
use crate::staging::Fields;
use async_trait::async_trait;
use serde_json::Value;

/// Table-oriented backend client
#[async_trait]
pub trait RemoteTable: Send + Sync {
    /// Fetch every row of `table`
    async fn select(&self, table: &str) -> Result<Vec<Value>>;

    /// Insert rows, or merge their fields into existing rows matched on `conflict_key`
    async fn upsert(&self, table: &str, rows: Vec<Fields>, conflict_key: &str) -> Result<()>;

    /// Delete the rows whose `conflict_key` is one of `ids`
    async fn delete(&self, table: &str, conflict_key: &str, ids: Vec<String>) -> Result<()>;
}
