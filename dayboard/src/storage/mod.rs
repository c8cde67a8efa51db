//! Storage module
//!
//! Provides the synchronous client-local key-value store used for cached
//! snapshots, staged patches and preference flags.

pub mod local_store;

pub use local_store::{read_json, remove_key, write_json, FileStore, KeyValueStore, MemoryStore};
