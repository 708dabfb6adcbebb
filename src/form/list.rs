//! Structural edits on rendered lists.
//!
//! A list is never patched in place: its live state is flattened, the element
//! indices are shifted, and the subtree is rendered again from the rehydrated
//! value. Paths therefore never go stale, at the cost of egui-side state such as
//! collapse toggles inside the list.

use crate::form::codec::{flatten, rehydrate, FlatRecord, FlatRecordSet, LeafValue};
use crate::form::path::Path;
use crate::form::render::render_list;
use crate::form::widget::{ListWidget, Widget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEdit {
    Insert(usize),
    Delete(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListEditError {
    #[error("no active list at `{0}`")]
    NotFound(Path),
    #[error("index {index} out of range for list `{path}` of length {len}")]
    OutOfRange { path: Path, index: usize, len: usize },
}

pub fn insert_at(root: &mut Widget, list_path: &Path, index: usize) -> Result<(), ListEditError> {
    apply(root, list_path, ListEdit::Insert(index))
}

pub fn delete_at(root: &mut Widget, list_path: &Path, index: usize) -> Result<(), ListEditError> {
    apply(root, list_path, ListEdit::Delete(index))
}

pub fn apply(root: &mut Widget, list_path: &Path, edit: ListEdit) -> Result<(), ListEditError> {
    let list = root
        .list_mut(list_path)
        .ok_or_else(|| ListEditError::NotFound(list_path.clone()))?;
    apply_to_list(list, edit)
}

pub fn apply_to_list(list: &mut ListWidget, edit: ListEdit) -> Result<(), ListEditError> {
    let len = list.items.len();
    let in_range = match edit {
        ListEdit::Insert(index) => index <= len,
        ListEdit::Delete(index) => index < len,
    };
    if !in_range {
        let index = match edit {
            ListEdit::Insert(index) | ListEdit::Delete(index) => index,
        };
        return Err(ListEditError::OutOfRange {
            path: list.path.clone(),
            index,
            len,
        });
    }

    let snapshot = snapshot(list);
    let records = shift_records(snapshot, edit);
    let value = rehydrate(&records);

    tracing::debug!(path = %list.path, ?edit, "rebuilding list");
    *list = render_list(&list.element, list.path.clone(), Some(&value));
    Ok(())
}

/// Live state of the list, re-rooted so the list itself sits at the root path.
fn snapshot(list: &ListWidget) -> FlatRecordSet {
    let mut records = vec![FlatRecord::new(Path::root(), LeafValue::EmptyList)];
    for item in &list.items {
        for record in flatten(item) {
            if let Some(relative) = record.path.strip_prefix(&list.path) {
                records.push(FlatRecord {
                    path: relative,
                    value: record.value,
                });
            }
        }
    }
    records
}

fn shift_records(records: FlatRecordSet, edit: ListEdit) -> FlatRecordSet {
    let root = Path::root();
    match edit {
        ListEdit::Insert(index) => {
            let mut shifted: FlatRecordSet = records
                .into_iter()
                .map(|record| FlatRecord {
                    path: record.path.shift_indices_from(&root, index, 1),
                    value: record.value,
                })
                .collect();
            shifted.push(FlatRecord::new(root.index(index), LeafValue::Vacant));
            shifted
        }
        ListEdit::Delete(index) => records
            .into_iter()
            .filter(|record| record.path.index_under(&root) != Some(index))
            .map(|record| FlatRecord {
                path: record.path.shift_indices_from(&root, index + 1, -1),
                value: record.value,
            })
            .collect(),
    }
}
