//! Local-wins union of local and remote collections.
//!
//! `merged = dedupe_by_id(local ++ remote)`, keeping the first occurrence, then
//! sorted into the record's canonical order. A record present locally is never
//! replaced by its remote version, whatever the timestamps say; remote only
//! contributes ids the local side has not seen. Concurrent edits of the same
//! record on two devices are therefore not merged field by field.

use std::collections::HashSet;

use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::hierarchy::FlatSnapshot;
use crate::grocery_model::SyncRecord;

/// Merges one collection. Idempotent: `merge_by_id(l, &merge_by_id(l, r))`
/// equals `merge_by_id(l, r)`.
///
/// ```rust
/// use grocery_core::grocery_model::Category;
/// use grocery_core::merge_policy::merge_by_id;
///
/// let mut local = Category::new("A", 1, None);
/// local.id = "1".into();
/// let mut stale = local.clone();
/// stale.name = "B".into();
/// let mut extra = Category::new("C", 2, None);
/// extra.id = "2".into();
///
/// let merged = merge_by_id(&[local], &[stale, extra]);
/// let names: Vec<_> = merged.iter().map(|c| c.name.as_str()).collect();
/// assert_eq!(names, ["A", "C"]);
/// ```
pub fn merge_by_id<T: SyncRecord>(local: &[T], remote: &[T]) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut merged: Vec<T> = local
        .iter()
        .chain(remote)
        .filter(|record| seen.insert(record.id()))
        .cloned()
        .collect();
    T::sort_canonical(&mut merged);
    merged
}

/// Decodes remote documents, skipping (and logging) any that do not parse.
pub fn decode_records<T: SyncRecord>(documents: Vec<Value>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|document| match serde_json::from_value::<T>(document) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed remote {} record: {e}", T::COLLECTION.key());
                None
            }
        })
        .collect()
}

/// Number of records the remote side added per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub categories_added: usize,
    pub sub_categories_added: usize,
    pub groceries_added: usize,
    pub groups_added: usize,
}

impl MergeReport {
    pub fn total(&self) -> usize {
        self.categories_added + self.sub_categories_added + self.groceries_added + self.groups_added
    }
}

impl FlatSnapshot {
    /// Merges every collection of `remote` into `self` with local-wins.
    pub fn merge(&self, remote: &FlatSnapshot) -> (FlatSnapshot, MergeReport) {
        let merged = FlatSnapshot {
            categories: merge_by_id(&self.categories, &remote.categories),
            sub_categories: merge_by_id(&self.sub_categories, &remote.sub_categories),
            groceries: merge_by_id(&self.groceries, &remote.groceries),
            groups: merge_by_id(&self.groups, &remote.groups),
        };
        let report = MergeReport {
            categories_added: added(&self.categories, &merged.categories),
            sub_categories_added: added(&self.sub_categories, &merged.sub_categories),
            groceries_added: added(&self.groceries, &merged.groceries),
            groups_added: added(&self.groups, &merged.groups),
        };
        (merged, report)
    }
}

fn added<T: SyncRecord>(before: &[T], after: &[T]) -> usize {
    let known: HashSet<&str> = before.iter().map(SyncRecord::id).collect();
    after.iter().filter(|record| !known.contains(record.id())).count()
}
