//! Services module
//!
//! Coordination between staged list views, the backend, notifications and
//! persisted settings.

pub mod lists;
pub mod notifications;
pub mod settings;

pub use lists::ListView;
pub use notifications::{
    ChannelNotifier, LogNotifier, Notification, NotificationAction, NotificationKind, Notifier,
};
pub use settings::{AppSettings, BackendSettings, SettingsService, StagingSettings};
