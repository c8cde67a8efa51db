//! Entity shape shared by every staged list
//!
//! A list row is any serde type with a stable string id. Staging works on the
//! row's JSON field map, so the same machinery serves todos, ideas and any
//! future list without per-type patch code.

use crate::config::DEFAULT_CONFLICT_KEY;
use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// JSON field map of a row or a partial row
pub type Fields = Map<String, Value>;

/// A row type that can be staged, merged and synced
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Backend table holding rows of this type
    const TABLE: &'static str;

    /// Local list name, used for cache and staged-state keys
    const LIST: &'static str;

    /// Field the backend uses to match rows on upsert
    const CONFLICT_KEY: &'static str = DEFAULT_CONFLICT_KEY;

    /// Stable identifier of this row
    fn id(&self) -> &str;
}

/// Serialize an entity into its field map
pub fn to_fields<T: Entity>(entity: &T) -> Result<Fields> {
    match serde_json::to_value(entity)? {
        Value::Object(fields) => Ok(fields),
        other => Err(AppError::Generic(format!(
            "{} rows must serialize to objects, got {}",
            T::TABLE,
            other
        ))),
    }
}

/// Rebuild an entity from its field map
pub fn from_fields<T: Entity>(fields: Fields) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Read a row id out of a JSON value, accepting string or numeric keys
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
