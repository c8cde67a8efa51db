//! Patch store
//!
//! Pending field-level edits keyed by row id, plus the set of ids pending
//! deletion. Everything here is synchronous and infallible; persistence of
//! the store is the caller's concern.

use super::entity::Fields;
use crate::config::DEFAULT_CONFLICT_KEY;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A pending change to one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub id: String,
    /// Names of the fields this patch overrides
    pub changed_fields: BTreeSet<String>,
    /// New values; a full row when `is_new`, otherwise only changed fields
    pub field_values: Fields,
    /// Row does not exist on the backend yet
    pub is_new: bool,
}

impl Patch {
    fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            changed_fields: BTreeSet::new(),
            field_values: Fields::new(),
            is_new: false,
        }
    }

    /// Copy the changed fields of this patch over `fields`
    pub fn apply_to(&self, fields: &mut Fields) {
        for name in &self.changed_fields {
            if let Some(value) = self.field_values.get(name) {
                fields.insert(name.clone(), value.clone());
            }
        }
    }

    /// Whether committing this patch would send anything
    pub fn is_effective(&self) -> bool {
        self.is_new || !self.changed_fields.is_empty()
    }
}

/// Snapshot of staged work handed to a commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Staged {
    pub updates: Vec<Patch>,
    pub completes: Vec<String>,
    /// Sum of changed fields across updates, for a pending-changes badge
    pub field_change_count: usize,
}

impl Staged {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.completes.is_empty()
    }

    /// Number of rows touched by this batch
    pub fn len(&self) -> usize {
        self.updates.len() + self.completes.len()
    }
}

fn default_key_field() -> String {
    DEFAULT_CONFLICT_KEY.to_string()
}

/// Pending patches and completions for one list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchStore {
    /// The key field never counts as a changed field
    #[serde(skip, default = "default_key_field")]
    key_field: String,
    #[serde(default)]
    patches: BTreeMap<String, Patch>,
    #[serde(default)]
    completes: BTreeSet<String>,
}

impl Default for PatchStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFLICT_KEY)
    }
}

impl PatchStore {
    pub fn new(key_field: &str) -> Self {
        Self {
            key_field: key_field.to_string(),
            patches: BTreeMap::new(),
            completes: BTreeSet::new(),
        }
    }

    /// Rebind the key field, used after restoring a persisted store
    pub fn with_key_field(mut self, key_field: &str) -> Self {
        self.key_field = key_field.to_string();
        self
    }

    /// Stage field edits for `id`.
    ///
    /// Fields merge into any existing patch, later values winning. Staging an
    /// edit for a completed id takes it back out of the completion set.
    pub fn stage_edit(&mut self, id: &str, fields: Fields) {
        if self.completes.remove(id) {
            tracing::debug!("Restored completed row {}", id);
        }

        let key_field = &self.key_field;
        let patch = self
            .patches
            .entry(id.to_string())
            .or_insert_with(|| Patch::empty(id));

        for (name, value) in fields {
            if &name == key_field {
                continue;
            }
            patch.changed_fields.insert(name.clone());
            patch.field_values.insert(name, value);
        }
    }

    /// Stage a brand new row carrying its full field set
    pub fn stage_new(&mut self, id: &str, mut fields: Fields) {
        self.completes.remove(id);

        fields.insert(self.key_field.clone(), id.into());
        let changed_fields = fields
            .keys()
            .filter(|name| **name != self.key_field)
            .cloned()
            .collect();

        self.patches.insert(
            id.to_string(),
            Patch {
                id: id.to_string(),
                changed_fields,
                field_values: fields,
                is_new: true,
            },
        );
    }

    /// Mark `id` for deletion, dropping any pending edit.
    ///
    /// A row that only exists as a staged insert is simply forgotten.
    pub fn stage_complete(&mut self, id: &str) {
        let dropped = self.patches.remove(id);
        if dropped.is_some_and(|patch| patch.is_new) {
            return;
        }
        self.completes.insert(id.to_string());
    }

    /// Drop fields of a non-new patch that already equal the confirmed row.
    ///
    /// Removes the patch entirely when nothing is left to send.
    pub fn discard_noop_fields(&mut self, id: &str, base: &Fields) {
        let Some(patch) = self.patches.get_mut(id) else {
            return;
        };
        if patch.is_new {
            return;
        }

        let unchanged: Vec<String> = patch
            .changed_fields
            .iter()
            .filter(|name| base.get(*name) == patch.field_values.get(*name))
            .cloned()
            .collect();

        for name in unchanged {
            patch.changed_fields.remove(&name);
            patch.field_values.remove(&name);
        }

        if patch.changed_fields.is_empty() {
            self.patches.remove(id);
        }
    }

    /// Take fields back out of a non-new patch, removing it when empty
    pub fn discard_fields(&mut self, id: &str, names: &[String]) {
        let Some(patch) = self.patches.get_mut(id) else {
            return;
        };
        if patch.is_new {
            return;
        }

        for name in names {
            patch.changed_fields.remove(name);
            patch.field_values.remove(name);
        }

        if patch.changed_fields.is_empty() {
            self.patches.remove(id);
        }
    }

    /// Everything that would be sent by a commit right now
    pub fn get_staged(&self) -> Staged {
        let updates: Vec<Patch> = self
            .patches
            .values()
            .filter(|patch| patch.is_effective())
            .cloned()
            .collect();
        let field_change_count = updates.iter().map(|p| p.changed_fields.len()).sum();

        Staged {
            updates,
            completes: self.completes.iter().cloned().collect(),
            field_change_count,
        }
    }

    /// Forget all staged work
    pub fn clear_staged(&mut self) {
        self.patches.clear();
        self.completes.clear();
    }

    /// Forget the entries of a committed batch.
    ///
    /// Patches re-staged after the batch was taken differ from the committed
    /// copy and are kept for the next commit.
    pub fn clear_committed(&mut self, committed: &Staged) {
        for patch in &committed.updates {
            if self.patches.get(&patch.id) == Some(patch) {
                self.patches.remove(&patch.id);
            }
        }
        for id in &committed.completes {
            self.completes.remove(id);
        }
    }

    pub fn patch(&self, id: &str) -> Option<&Patch> {
        self.patches.get(id)
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completes.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty() && self.completes.is_empty()
    }

    pub(crate) fn patches(&self) -> impl Iterator<Item = &Patch> {
        self.patches.values()
    }
}
