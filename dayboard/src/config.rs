//! Application configuration constants
//!
//! Central location for timing defaults, limits and local storage keys
//! used throughout the staging and sync layers.

// ===== Commit Scheduling =====

/// Default undo window before staged edits are committed, in milliseconds
pub const DEFAULT_COMMIT_DELAY_MS: u64 = 2_500;

/// Minimum commit delay in milliseconds.
/// Shorter windows leave no practical time to press Undo.
pub const MIN_COMMIT_DELAY_MS: u64 = 250;

/// Maximum commit delay in milliseconds (1 minute).
/// Longer windows risk losing edits when the app is closed.
pub const MAX_COMMIT_DELAY_MS: u64 = 60_000;

// ===== Notifications =====

/// How long an Undo notification stays visible
pub const DEFAULT_UNDO_TTL_MS: u64 = 5_000;

/// How long an error notification stays visible
pub const ERROR_NOTIFICATION_TTL_MS: u64 = 8_000;

/// Label shown on the undo action of staging notifications
pub const UNDO_ACTION_LABEL: &str = "Undo";

// ===== Local Storage Keys =====

/// Prefix for cached server snapshots, followed by the list name
pub const CACHE_KEY_PREFIX: &str = "cache:";

/// Prefix for persisted staged patches, followed by the list name
pub const STAGED_KEY_PREFIX: &str = "staged:";

/// Prefix for small UI preference flags
pub const PREF_KEY_PREFIX: &str = "pref:";

// ===== Backend =====

/// Default conflict key used by the backend for upserts
pub const DEFAULT_CONFLICT_KEY: &str = "id";

/// Default SQLite database file name inside the data directory
pub const DEFAULT_DATABASE_FILE: &str = "dayboard.db";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "DAYBOARD_DATA_DIR";
