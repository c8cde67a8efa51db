//! HTTP webhook table client
//!
//! Talks to a hosted backend through three JSON endpoints per table:
//!
//! - `POST {base}/{table}/select` → array of rows
//! - `POST {base}/{table}/upsert` with `{ "rows": [...], "on_conflict": key }`
//! - `POST {base}/{table}/delete` with `{ "key": key, "ids": [...] }`
//!
//! No timeout or retry is applied here; transport defaults govern.

use super::RemoteTable;
use crate::error::{AppError, Result};
use crate::staging::Fields;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct UpsertBody<'a> {
    rows: &'a [Fields],
    on_conflict: &'a str,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    key: &'a str,
    ids: &'a [String],
}

/// `RemoteTable` reached over HTTP
#[derive(Clone)]
pub struct WebhookTable {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl WebhookTable {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("Dayboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, table: &str, action: &str) -> String {
        format!("{}/{}/{}", self.base_url, table, action)
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!("Webhook {} returned status: {}", url, status);
            return Err(AppError::Remote(format!("{} returned {}: {}", url, status, detail)));
        }

        Ok(response)
    }
}

#[async_trait]
impl RemoteTable for WebhookTable {
    async fn select(&self, table: &str) -> Result<Vec<Value>> {
        let url = self.endpoint(table, "select");
        let response = self.post(&url, &serde_json::json!({})).await?;
        let rows: Vec<Value> = response.json().await?;

        tracing::debug!("Fetched {} rows from {}", rows.len(), url);
        Ok(rows)
    }

    async fn upsert(&self, table: &str, rows: Vec<Fields>, conflict_key: &str) -> Result<()> {
        let url = self.endpoint(table, "upsert");
        self.post(
            &url,
            &UpsertBody {
                rows: &rows,
                on_conflict: conflict_key,
            },
        )
        .await?;

        tracing::debug!("Upserted {} rows via {}", rows.len(), url);
        Ok(())
    }

    async fn delete(&self, table: &str, conflict_key: &str, ids: Vec<String>) -> Result<()> {
        let url = self.endpoint(table, "delete");
        self.post(
            &url,
            &DeleteBody {
                key: conflict_key,
                ids: &ids,
            },
        )
        .await?;

        tracing::debug!("Deleted {} rows via {}", ids.len(), url);
        Ok(())
    }
}
