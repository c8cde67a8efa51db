//! Record table schema
//!
//! All lists share one `records` table of JSON documents. The schema
//! version lives in SQLite's `user_version`, so opening an up-to-date file
//! costs a single pragma read.

use crate::error::Result;
use sqlx::sqlite::SqlitePool;

/// Ordered schema scripts; entry `n` upgrades `user_version` from `n` to `n + 1`
const SCHEMA_SCRIPTS: &[&str] = &[include_str!("migrations/001_initial_schema.sql")];

/// Latest schema version this build understands
pub const SCHEMA_VERSION: i64 = SCHEMA_SCRIPTS.len() as i64;

/// Bring the record table up to [`SCHEMA_VERSION`]
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    let mut version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    if version > SCHEMA_VERSION {
        tracing::warn!(
            "Database schema version {} is newer than {}; opening anyway",
            version,
            SCHEMA_VERSION
        );
        return Ok(());
    }

    for script in &SCHEMA_SCRIPTS[version as usize..] {
        version += 1;
        tracing::info!("Upgrading record schema to version {}", version);

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(script).execute(&mut *tx).await?;
        // Pragmas do not take bind parameters
        sqlx::raw_sql(&format!("PRAGMA user_version = {}", version))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    tracing::debug!("Record schema at version {}", version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn user_version(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_database_gets_record_table() {
        let pool = memory_pool().await;

        initialize_database(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(user_version(&pool).await, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_initialize_twice_keeps_rows() {
        let pool = memory_pool().await;
        initialize_database(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO records (tbl, id, data, created_at, updated_at) \
             VALUES ('todos', '1', '{}', 'now', 'now')",
        )
        .execute(&pool)
        .await
        .unwrap();

        initialize_database(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(user_version(&pool).await, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_newer_schema_is_left_alone() {
        let pool = memory_pool().await;
        sqlx::raw_sql("PRAGMA user_version = 99")
            .execute(&pool)
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        assert_eq!(user_version(&pool).await, 99);
    }
}
