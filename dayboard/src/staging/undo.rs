//! Undo snapshots
//!
//! Each staging action yields a snapshot of what it replaced. Reverting
//! stages the inverse, which rides the same debounce window as any edit.

use super::entity::Fields;
use super::patch::PatchStore;

/// What a staging action replaced
#[derive(Debug, Clone, PartialEq)]
pub enum UndoSnapshot {
    /// Field values as rendered before an edit; `added` names fields the
    /// row did not have
    Edit {
        id: String,
        previous: Fields,
        added: Vec<String>,
    },
    /// A completed row; `restore` holds the full row when it was a staged insert
    Complete { id: String, restore: Option<Fields> },
    /// A staged insert
    Insert { id: String },
}

impl UndoSnapshot {
    /// Capture the values `edit` is about to overwrite in `current`
    pub fn for_edit(id: &str, current: &Fields, edit: &Fields) -> Self {
        let mut previous = Fields::new();
        let mut added = Vec::new();
        for name in edit.keys() {
            match current.get(name) {
                Some(value) => {
                    previous.insert(name.clone(), value.clone());
                }
                None => added.push(name.clone()),
            }
        }

        UndoSnapshot::Edit {
            id: id.to_string(),
            previous,
            added,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            UndoSnapshot::Edit { id, .. }
            | UndoSnapshot::Complete { id, .. }
            | UndoSnapshot::Insert { id } => id,
        }
    }

    /// Stage the inverse of the captured action
    pub fn revert(self, store: &mut PatchStore) {
        match self {
            UndoSnapshot::Edit {
                id,
                previous,
                added,
            } => {
                store.stage_edit(&id, previous);
                store.discard_fields(&id, &added);
            }
            UndoSnapshot::Complete { id, restore: None } => store.stage_edit(&id, Fields::new()),
            UndoSnapshot::Complete {
                id,
                restore: Some(fields),
            } => store.stage_new(&id, fields),
            UndoSnapshot::Insert { id } => store.stage_complete(&id),
        }
    }
}
