//! Cache mirror of the last server-confirmed list
//!
//! Lets a view render immediately on open. Snapshots are only ever replaced
//! wholesale with a freshly fetched list.

use super::entity::Entity;
use crate::config::CACHE_KEY_PREFIX;
use crate::storage::{read_json, remove_key, write_json, KeyValueStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

/// Last confirmed server state for one list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot<T> {
    pub timestamp: DateTime<Utc>,
    pub data: Vec<T>,
}

/// Local-store view of the cached snapshot for `T::LIST`
pub struct CacheMirror<T> {
    store: Arc<dyn KeyValueStore>,
    key: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> CacheMirror<T> {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: format!("{}{}", CACHE_KEY_PREFIX, T::LIST),
            _entity: PhantomData,
        }
    }

    /// Read the cached snapshot, `None` when absent or unreadable
    pub fn read(&self) -> Option<CacheSnapshot<T>> {
        read_json(self.store.as_ref(), &self.key)
    }

    /// Replace the cached snapshot with `data`
    pub fn replace(&self, data: Vec<T>) -> CacheSnapshot<T> {
        let snapshot = CacheSnapshot {
            timestamp: Utc::now(),
            data,
        };

        if write_json(self.store.as_ref(), &self.key, &snapshot) {
            tracing::debug!("Cached {} {} rows", snapshot.data.len(), T::LIST);
        }

        snapshot
    }

    pub fn clear(&self) {
        remove_key(self.store.as_ref(), &self.key);
    }
}
