//! Merge staged patches onto a confirmed list for rendering

use super::entity::{from_fields, to_fields, Entity};
use super::patch::PatchStore;
use std::collections::HashSet;

/// Produce the list a view should render.
///
/// Completed rows are skipped, patched rows get their changed fields
/// overlaid, and staged inserts missing from `base` are appended. A non-new
/// patch whose row is gone from `base` is dropped rather than resurrecting
/// the row. Base order is preserved; sorting is up to the caller.
pub fn apply_staged<T: Entity>(base: &[T], store: &PatchStore) -> Vec<T> {
    let mut merged = Vec::with_capacity(base.len());
    let mut seen = HashSet::with_capacity(base.len());

    for entity in base {
        let id = entity.id();
        seen.insert(id);

        if store.is_completed(id) {
            continue;
        }

        match store.patch(id) {
            Some(patch) => match overlay(entity, |fields| patch.apply_to(fields)) {
                Some(patched) => merged.push(patched),
                None => merged.push(entity.clone()),
            },
            None => merged.push(entity.clone()),
        }
    }

    for patch in store.patches() {
        if !patch.is_new || seen.contains(patch.id.as_str()) {
            continue;
        }
        match from_fields::<T>(patch.field_values.clone()) {
            Ok(entity) => merged.push(entity),
            Err(e) => tracing::warn!("Skipping staged {} row {}: {}", T::LIST, patch.id, e),
        }
    }

    merged
}

fn overlay<T: Entity>(entity: &T, apply: impl FnOnce(&mut super::Fields)) -> Option<T> {
    let mut fields = match to_fields(entity) {
        Ok(fields) => fields,
        Err(e) => {
            tracing::warn!("Cannot patch {} row {}: {}", T::LIST, entity.id(), e);
            return None;
        }
    };

    apply(&mut fields);

    match from_fields(fields) {
        Ok(patched) => Some(patched),
        Err(e) => {
            tracing::warn!("Staged patch does not fit {} row {}: {}", T::LIST, entity.id(), e);
            None
        }
    }
}
