//! List view service
//!
//! One `ListView` per rendered list. It owns the staged patches for that
//! list, renders them over the last confirmed rows, offers Undo for every
//! change and commits in one batch once the debounce window passes.
//!
//! Staging calls are synchronous but start a tokio timer, so they must run
//! inside a tokio runtime.

use crate::config::{ERROR_NOTIFICATION_TTL_MS, STAGED_KEY_PREFIX, UNDO_ACTION_LABEL};
use crate::error::Result;
use crate::remote::{RemoteSync, RemoteTable};
use crate::services::notifications::{Notification, NotificationAction, Notifier};
use crate::services::settings::StagingSettings;
use crate::staging::{
    apply_staged, to_fields, CommitScheduler, Entity, Fields, PatchStore, SchedulerPhase, Staged,
    UndoSnapshot,
};
use crate::storage::{read_json, remove_key, write_json, KeyValueStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

struct ListState<T> {
    /// Last confirmed server rows
    base: Vec<T>,
    patches: PatchStore,
    confirmed_at: Option<DateTime<Utc>>,
}

impl<T: Entity> ListState<T> {
    fn base_fields(&self, id: &str) -> Option<Fields> {
        let entity = self.base.iter().find(|e| e.id() == id)?;
        match to_fields(entity) {
            Ok(fields) => Some(fields),
            Err(e) => {
                tracing::warn!("Cannot read {} row {}: {}", T::LIST, id, e);
                None
            }
        }
    }

    /// Fields of `id` as the user last saw them, ignoring completion
    fn current_fields(&self, id: &str) -> Option<Fields> {
        let patch = self.patches.patch(id);
        match self.base_fields(id) {
            Some(mut fields) => {
                if let Some(patch) = patch {
                    patch.apply_to(&mut fields);
                }
                Some(fields)
            }
            None => patch
                .filter(|patch| patch.is_new)
                .map(|patch| patch.field_values.clone()),
        }
    }

    /// Drop staged values that already match the confirmed row
    fn prune(&mut self, id: &str) {
        if let Some(base) = self.base_fields(id) {
            self.patches.discard_noop_fields(id, &base);
        }
    }

    fn prune_all(&mut self) {
        let ids: Vec<String> = self.patches.patches().map(|p| p.id.clone()).collect();
        for id in ids {
            self.prune(&id);
        }
    }
}

struct ListInner<T: Entity> {
    state: Mutex<ListState<T>>,
    sync: RemoteSync<T>,
    scheduler: CommitScheduler,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    staging: StagingSettings,
    staged_key: String,
    /// Set after a failed commit until one succeeds
    commit_failed: AtomicBool,
}

/// Staged, optimistically rendered view of one list
pub struct ListView<T: Entity> {
    inner: Arc<ListInner<T>>,
}

impl<T: Entity> Clone for ListView<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> ListView<T> {
    /// Open a view, rendering from the cache and restoring staged edits
    pub fn open(
        table: Arc<dyn RemoteTable>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        staging: StagingSettings,
    ) -> Self {
        let staged_key = format!("{}{}", STAGED_KEY_PREFIX, T::LIST);

        let restored = if staging.persist_staged {
            read_json::<PatchStore>(store.as_ref(), &staged_key)
        } else {
            None
        };
        let patches = match restored {
            Some(patches) => {
                tracing::info!(
                    "Restored {} staged {} changes",
                    patches.get_staged().len(),
                    T::LIST
                );
                patches.with_key_field(T::CONFLICT_KEY)
            }
            None => PatchStore::new(T::CONFLICT_KEY),
        };

        let sync = RemoteSync::new(table, Arc::clone(&store));
        let (base, confirmed_at) = match sync.cache().read() {
            Some(snapshot) => (snapshot.data, Some(snapshot.timestamp)),
            None => (Vec::new(), None),
        };

        tracing::debug!("Opened {} view with {} cached rows", T::LIST, base.len());

        Self {
            inner: Arc::new(ListInner {
                state: Mutex::new(ListState {
                    base,
                    patches,
                    confirmed_at,
                }),
                sync,
                scheduler: CommitScheduler::new(staging.commit_delay()),
                store,
                notifier,
                staging,
                staged_key,
                commit_failed: AtomicBool::new(false),
            }),
        }
    }

    /// Rows to render: confirmed rows with staged changes applied
    pub fn items(&self) -> Vec<T> {
        let state = self.inner.state.lock();
        apply_staged(&state.base, &state.patches)
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.items().into_iter().find(|e| e.id() == id)
    }

    /// When the rendered base was last confirmed by the server
    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().confirmed_at
    }

    /// Work waiting for the next commit
    pub fn staged(&self) -> Staged {
        self.inner.state.lock().patches.get_staged()
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.inner.scheduler.phase()
    }

    /// Fetch fresh rows; staged changes stay applied on top.
    ///
    /// Staged work left over from a failed commit or a previous session is
    /// scheduled for commit again. A commit already pending keeps its deadline.
    pub async fn reload(&self) -> Result<Vec<T>> {
        let rows = match self.inner.sync.fetch().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("Failed to load {}: {}", T::LIST, e);
                self.notify_error(format!("Could not load {}: {}", T::LIST, e));
                return Err(e);
            }
        };

        let pending = {
            let mut state = self.inner.state.lock();
            state.base = rows.to_vec();
            state.confirmed_at = Some(Utc::now());
            state.prune_all();
            self.persist(&state.patches);
            !state.patches.get_staged().is_empty()
        };

        if pending && self.phase() == SchedulerPhase::Idle {
            self.schedule_commit();
        }

        Ok(self.items())
    }

    /// Stage field edits for a row; returns false if the row is unknown
    pub fn edit(&self, id: &str, fields: Fields) -> bool {
        let snapshot = {
            let mut state = self.inner.state.lock();
            let Some(current) = state.current_fields(id) else {
                tracing::warn!("Ignoring edit for unknown {} row {}", T::LIST, id);
                return false;
            };

            let snapshot = UndoSnapshot::for_edit(id, &current, &fields);
            state.patches.stage_edit(id, fields);
            state.prune(id);
            self.persist(&state.patches);
            snapshot
        };

        tracing::debug!("Staged edit for {} row {}", T::LIST, id);
        self.schedule_commit();
        self.offer_undo("Item updated", snapshot);
        true
    }

    /// Stage a new row; returns its id
    pub fn add(&self, entity: T) -> Option<String> {
        let id = entity.id().to_string();
        let fields = match to_fields(&entity) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!("Cannot stage new {} row: {}", T::LIST, e);
                return None;
            }
        };

        {
            let mut state = self.inner.state.lock();
            state.patches.stage_new(&id, fields);
            self.persist(&state.patches);
        }

        tracing::debug!("Staged new {} row {}", T::LIST, id);
        self.schedule_commit();
        self.offer_undo("Item added", UndoSnapshot::Insert { id: id.clone() });
        Some(id)
    }

    /// Stage removal of a row; returns false if it is not visible
    pub fn complete(&self, id: &str) -> bool {
        let snapshot = {
            let mut state = self.inner.state.lock();
            if state.patches.is_completed(id) || state.current_fields(id).is_none() {
                return false;
            }

            let restore = state
                .patches
                .patch(id)
                .filter(|patch| patch.is_new)
                .map(|patch| patch.field_values.clone());

            state.patches.stage_complete(id);
            self.persist(&state.patches);

            UndoSnapshot::Complete {
                id: id.to_string(),
                restore,
            }
        };

        tracing::debug!("Staged completion of {} row {}", T::LIST, id);
        self.schedule_commit();
        self.offer_undo("Item completed", snapshot);
        true
    }

    /// Stage the inverse of an earlier change
    pub fn undo(&self, snapshot: UndoSnapshot) {
        {
            let mut state = self.inner.state.lock();
            let id = snapshot.id().to_string();
            snapshot.revert(&mut state.patches);
            state.prune(&id);
            self.persist(&state.patches);
        }

        tracing::debug!("Undo staged for {}", T::LIST);
        self.schedule_commit();
    }

    /// Commit now instead of waiting out the undo window
    pub async fn commit_now(&self) -> Result<()> {
        self.inner.scheduler.cancel();
        self.commit().await
    }

    /// Commit anything still staged before the view goes away
    pub async fn shutdown(&self) -> Result<()> {
        if self.inner.scheduler.cancel() {
            tracing::debug!("Committing pending {} changes on shutdown", T::LIST);
        }
        self.commit().await
    }

    async fn commit(&self) -> Result<()> {
        let staged = self.inner.state.lock().patches.get_staged();
        if staged.is_empty() {
            tracing::debug!("Nothing staged for {}, skipping commit", T::LIST);
            return Ok(());
        }

        match self.inner.sync.commit(&staged).await {
            Ok(fresh) => {
                let mut state = self.inner.state.lock();
                state.base = fresh;
                state.confirmed_at = Some(Utc::now());
                state.patches.clear_committed(&staged);
                state.prune_all();
                self.persist(&state.patches);
                drop(state);

                if self.inner.commit_failed.swap(false, Ordering::SeqCst) {
                    tracing::info!("Recovered from failed {} commit", T::LIST);
                    self.inner
                        .notifier
                        .notify(Notification::success(format!("All {} changes saved", T::LIST)));
                }
                Ok(())
            }
            Err(e) => {
                self.inner.commit_failed.store(true, Ordering::SeqCst);
                tracing::error!("Failed to commit {} changes to {}: {}", staged.len(), T::LIST, e);
                self.notify_error(format!("Could not save {}: {}", T::LIST, e));
                Err(e)
            }
        }
    }

    fn schedule_commit(&self) {
        let view = self.clone();
        self.inner.scheduler.schedule(move || async move {
            // Failures are already logged and surfaced by commit
            let _ = view.commit().await;
        });
    }

    fn persist(&self, patches: &PatchStore) {
        if !self.inner.staging.persist_staged {
            return;
        }
        let store = self.inner.store.as_ref();
        if patches.is_empty() {
            remove_key(store, &self.inner.staged_key);
        } else {
            write_json(store, &self.inner.staged_key, patches);
        }
    }

    fn offer_undo(&self, message: &str, snapshot: UndoSnapshot) {
        let view: Weak<ListInner<T>> = Arc::downgrade(&self.inner);
        let slot = Mutex::new(Some(snapshot));
        let runtime = tokio::runtime::Handle::try_current().ok();

        let action = NotificationAction::new(UNDO_ACTION_LABEL, move || {
            let Some(inner) = view.upgrade() else {
                return;
            };
            let Some(snapshot) = slot.lock().take() else {
                return;
            };
            let _guard = runtime.as_ref().map(|handle| handle.enter());
            ListView { inner }.undo(snapshot);
        });

        self.inner.notifier.notify(
            Notification::info(message)
                .with_ttl(self.inner.staging.undo_ttl_ms)
                .with_action(action),
        );
    }

    fn notify_error(&self, message: String) {
        self.inner
            .notifier
            .notify(Notification::error(message).with_ttl(ERROR_NOTIFICATION_TTL_MS));
    }
}
