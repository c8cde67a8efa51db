//! Remote sync adapter
//!
//! Sends a staged batch to the backend, then refreshes the cache mirror with
//! the authoritative list. Fetches for the same list are deduplicated.

use super::{InflightRegistry, RemoteTable};
use crate::error::Result;
use crate::staging::{CacheMirror, Entity, Fields, Staged};
use crate::storage::KeyValueStore;
use serde_json::Value;
use std::sync::Arc;

/// Batched commit and fetch for one list type
pub struct RemoteSync<T: Entity> {
    table: Arc<dyn RemoteTable>,
    cache: CacheMirror<T>,
    inflight: InflightRegistry<Arc<Vec<T>>>,
}

impl<T: Entity> RemoteSync<T> {
    pub fn new(table: Arc<dyn RemoteTable>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            table,
            cache: CacheMirror::new(store),
            inflight: InflightRegistry::new(),
        }
    }

    pub fn cache(&self) -> &CacheMirror<T> {
        &self.cache
    }

    /// Fetch the full list, sharing any fetch already in flight
    pub async fn fetch(&self) -> Result<Arc<Vec<T>>> {
        let table = Arc::clone(&self.table);
        let rows = self
            .inflight
            .run(T::TABLE, move || async move {
                let raw = table.select(T::TABLE).await?;
                Ok(Arc::new(decode_rows::<T>(raw)))
            })
            .await?;

        self.cache.replace(rows.to_vec());
        Ok(rows)
    }

    /// Commit a staged batch and return the refreshed list.
    ///
    /// Field patches carry only their changed fields plus the conflict key,
    /// so untouched fields edited elsewhere are not overwritten.
    pub async fn commit(&self, staged: &Staged) -> Result<Vec<T>> {
        let rows = commit_rows::<T>(staged);
        let inserts = staged.updates.iter().filter(|p| p.is_new).count();

        if !rows.is_empty() {
            self.table.upsert(T::TABLE, rows, T::CONFLICT_KEY).await?;
        }

        if !staged.completes.is_empty() {
            self.table
                .delete(T::TABLE, T::CONFLICT_KEY, staged.completes.clone())
                .await?;
        }

        tracing::info!(
            "Committed {} {}: {} inserts, {} patches, {} deletes",
            staged.len(),
            T::LIST,
            inserts,
            staged.updates.len() - inserts,
            staged.completes.len()
        );

        // Straight to the backend: a fetch started before the commit is stale
        let fresh = decode_rows::<T>(self.table.select(T::TABLE).await?);
        self.cache.replace(fresh.clone());

        Ok(fresh)
    }
}

/// Build the upsert payload for a batch
fn commit_rows<T: Entity>(staged: &Staged) -> Vec<Fields> {
    staged
        .updates
        .iter()
        .map(|patch| {
            let mut row = Fields::new();
            if patch.is_new {
                row = patch.field_values.clone();
            } else {
                patch.apply_to(&mut row);
            }
            row.insert(T::CONFLICT_KEY.to_string(), Value::String(patch.id.clone()));
            row
        })
        .collect()
}

fn decode_rows<T: Entity>(raw: Vec<Value>) -> Vec<T> {
    raw.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!("Skipping undecodable {} row: {}", T::TABLE, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Todo;
    use crate::staging::PatchStore;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_commit_rows_send_only_changed_fields() {
        let mut store = PatchStore::default();
        store.stage_edit("1", fields(json!({"category": "Work"})));
        store.stage_new(
            "2",
            fields(json!({"task": "plan", "category": "Home", "priority": "low", "status": "open"})),
        );

        let rows = commit_rows::<Todo>(&store.get_staged());

        assert_eq!(
            rows,
            vec![
                fields(json!({"id": "1", "category": "Work"})),
                fields(json!({
                    "id": "2",
                    "task": "plan",
                    "category": "Home",
                    "priority": "low",
                    "status": "open"
                })),
            ]
        );
    }

    #[test]
    fn test_decode_rows_skips_bad_rows() {
        let rows = decode_rows::<Todo>(vec![
            json!({"id": "1", "task": "read"}),
            json!({"id": "2"}),
        ]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task, "read");
    }
}
