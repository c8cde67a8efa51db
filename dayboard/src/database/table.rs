//! Direct table client over SQLite
//!
//! Every list table lives in one `records` table as JSON documents keyed by
//! `(tbl, id)`. Upserts merge the incoming fields into the stored document
//! with `json_patch`, so a partial row only touches the fields it carries.
//! All writes use transactions for safety.

use crate::error::{AppError, Result};
use crate::remote::RemoteTable;
use crate::staging::{id_from_value, Fields};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;

/// `RemoteTable` backed by a local SQLite pool
#[derive(Clone)]
pub struct SqliteTable {
    pool: SqlitePool,
}

impl SqliteTable {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RemoteTable for SqliteTable {
    async fn select(&self, table: &str) -> Result<Vec<Value>> {
        let docs: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT data FROM records
            WHERE tbl = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let rows = docs
            .iter()
            .map(|doc| serde_json::from_str(doc))
            .collect::<std::result::Result<Vec<Value>, _>>()?;

        Ok(rows)
    }

    async fn upsert(&self, table: &str, rows: Vec<Fields>, conflict_key: &str) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for row in &rows {
            let id = row.get(conflict_key).and_then(id_from_value).ok_or_else(|| {
                AppError::Remote(format!("{} row is missing key '{}'", table, conflict_key))
            })?;
            let data = serde_json::to_string(row)?;

            sqlx::query(
                r#"
                INSERT INTO records (tbl, id, data, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(tbl, id) DO UPDATE SET
                    data = json_patch(records.data, excluded.data),
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(table)
            .bind(&id)
            .bind(&data)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!("Upserted {} rows into {}", rows.len(), table);
        Ok(())
    }

    async fn delete(&self, table: &str, _conflict_key: &str, ids: Vec<String>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for id in &ids {
            sqlx::query("DELETE FROM records WHERE tbl = ? AND id = ?")
                .bind(table)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!("Deleted {} rows from {}", ids.len(), table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_table() -> SqliteTable {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        SqliteTable::new(pool)
    }

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_select() {
        let table = create_test_table().await;

        table
            .upsert(
                "todos",
                vec![
                    fields(json!({"id": "1", "task": "read", "category": "Home"})),
                    fields(json!({"id": "2", "task": "write", "category": "Work"})),
                ],
                "id",
            )
            .await
            .unwrap();

        let rows = table.select("todos").await.unwrap();
        assert_eq!(rows.len(), 2);

        // Tables are isolated from each other
        assert!(table.select("ideas").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_upsert_merges_fields() {
        let table = create_test_table().await;

        table
            .upsert(
                "todos",
                vec![fields(json!({"id": "1", "task": "read", "category": "Home"}))],
                "id",
            )
            .await
            .unwrap();
        table
            .upsert("todos", vec![fields(json!({"id": "1", "category": "Work"}))], "id")
            .await
            .unwrap();

        let rows = table.select("todos").await.unwrap();
        assert_eq!(rows, vec![json!({"id": "1", "task": "read", "category": "Work"})]);
    }

    #[tokio::test]
    async fn test_numeric_keys_are_accepted() {
        let table = create_test_table().await;

        table
            .upsert("todos", vec![fields(json!({"id": 7, "task": "read"}))], "id")
            .await
            .unwrap();
        table
            .delete("todos", "id", vec!["7".to_string()])
            .await
            .unwrap();

        assert!(table.select("todos").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_without_key_fails_atomically() {
        let table = create_test_table().await;

        let result = table
            .upsert(
                "todos",
                vec![
                    fields(json!({"id": "1", "task": "read"})),
                    fields(json!({"task": "no key"})),
                ],
                "id",
            )
            .await;

        assert!(result.is_err());
        assert!(table.select("todos").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_ids() {
        let table = create_test_table().await;

        table
            .upsert(
                "ideas",
                vec![
                    fields(json!({"id": "a", "idea": "x"})),
                    fields(json!({"id": "b", "idea": "y"})),
                ],
                "id",
            )
            .await
            .unwrap();

        table
            .delete("ideas", "id", vec!["a".to_string(), "missing".to_string()])
            .await
            .unwrap();

        let rows = table.select("ideas").await.unwrap();
        assert_eq!(rows, vec![json!({"id": "b", "idea": "y"})]);
    }
}
