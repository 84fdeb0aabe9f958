//! Nested Category → SubCategory → Grocery tree.
//!
//! The tree is rebuilt from the flat persisted lists and flattened back into
//! them on every write. Ordering rules for display:
//!
//! - categories by `viewOrder` ascending (stable)
//! - sub-categories by name ascending, ignoring case (stable)
//! - groceries in insertion order
//!
//! Records whose parent is missing are kept aside as orphans. They are not
//! part of the visible tree but are written back unchanged.

use std::collections::{HashMap, HashSet};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::grocery_model::{Category, Grocery, Group, SubCategory, SyncRecord};

/// The four flat collections as they are persisted and exchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlatSnapshot {
    pub categories: Vec<Category>,
    pub sub_categories: Vec<SubCategory>,
    pub groceries: Vec<Grocery>,
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategoryNode {
    #[serde(flatten)]
    pub sub_category: SubCategory,
    pub groceries: Vec<Grocery>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub sub_categories: Vec<SubCategoryNode>,
}

/// Immutable, ordered view of the tree at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchySnapshot {
    pub categories: Vec<CategoryNode>,
}

impl HierarchySnapshot {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn sub_categories(&self) -> impl Iterator<Item = &SubCategoryNode> {
        self.categories.iter().flat_map(|node| node.sub_categories.iter())
    }

    pub fn groceries(&self) -> impl Iterator<Item = &Grocery> {
        self.sub_categories().flat_map(|node| node.groceries.iter())
    }

    pub fn category_by_name(&self, name: &str) -> Option<&CategoryNode> {
        self.categories.iter().find(|node| node.category.name == name)
    }
}

/// Working state owned by the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Hierarchy {
    pub categories: Vec<CategoryNode>,
    pub orphan_sub_categories: Vec<SubCategory>,
    pub orphan_groceries: Vec<Grocery>,
    pub groups: Vec<Group>,
}

/// Drops records whose id was already seen, keeping the first.
fn unique_by_id<T: SyncRecord>(records: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    let total = records.len();
    let unique: Vec<T> = records
        .into_iter()
        .filter(|record| seen.insert(record.id().to_string()))
        .collect();
    if unique.len() != total {
        warn!(
            "Dropped {} duplicate id(s) from {}",
            total - unique.len(),
            T::COLLECTION.key()
        );
    }
    unique
}

impl Hierarchy {
    pub fn rebuild(flat: FlatSnapshot) -> Self {
        let mut categories: Vec<CategoryNode> = unique_by_id(flat.categories)
            .into_iter()
            .map(|category| CategoryNode {
                category,
                sub_categories: Vec::new(),
            })
            .collect();
        let category_index: HashMap<String, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, node)| (node.category.id.clone(), i))
            .collect();

        let mut orphan_sub_categories = Vec::new();
        for sub_category in unique_by_id(flat.sub_categories) {
            match category_index.get(&sub_category.category_id) {
                Some(&ci) => categories[ci].sub_categories.push(SubCategoryNode {
                    sub_category,
                    groceries: Vec::new(),
                }),
                None => orphan_sub_categories.push(sub_category),
            }
        }

        let sub_category_index: HashMap<String, (usize, usize)> = categories
            .iter()
            .enumerate()
            .flat_map(|(ci, node)| {
                node.sub_categories
                    .iter()
                    .enumerate()
                    .map(move |(si, sub)| (sub.sub_category.id.clone(), (ci, si)))
            })
            .collect();

        let mut orphan_groceries = Vec::new();
        for grocery in unique_by_id(flat.groceries) {
            match sub_category_index.get(&grocery.sub_category_id) {
                Some(&(ci, si)) => categories[ci].sub_categories[si].groceries.push(grocery),
                None => orphan_groceries.push(grocery),
            }
        }

        let mut tree = Self {
            categories,
            orphan_sub_categories,
            orphan_groceries,
            groups: unique_by_id(flat.groups),
        };
        tree.normalize();
        tree
    }

    pub fn flatten(&self) -> FlatSnapshot {
        let mut flat = FlatSnapshot {
            groups: self.groups.clone(),
            ..FlatSnapshot::default()
        };
        for node in &self.categories {
            flat.categories.push(node.category.clone());
            for sub in &node.sub_categories {
                flat.sub_categories.push(sub.sub_category.clone());
                flat.groceries.extend(sub.groceries.iter().cloned());
            }
        }
        flat.sub_categories
            .extend(self.orphan_sub_categories.iter().cloned());
        flat.groceries.extend(self.orphan_groceries.iter().cloned());
        flat
    }

    /// Restores display order after a mutation.
    pub fn normalize(&mut self) {
        self.categories
            .sort_by_key(|node| node.category.view_order);
        for node in &mut self.categories {
            node.sub_categories.sort_by(|a, b| {
                crate::grocery_model::compare_names(&a.sub_category.name, &b.sub_category.name)
            });
        }
    }

    pub fn snapshot(&self) -> HierarchySnapshot {
        HierarchySnapshot {
            categories: self.categories.clone(),
        }
    }

    pub fn category_index(&self, id: &str) -> Option<usize> {
        self.categories.iter().position(|node| node.category.id == id)
    }

    pub fn locate_sub_category(&self, id: &str) -> Option<(usize, usize)> {
        self.categories.iter().enumerate().find_map(|(ci, node)| {
            node.sub_categories
                .iter()
                .position(|sub| sub.sub_category.id == id)
                .map(|si| (ci, si))
        })
    }

    pub fn locate_grocery(&self, id: &str) -> Option<(usize, usize, usize)> {
        self.categories.iter().enumerate().find_map(|(ci, node)| {
            node.sub_categories.iter().enumerate().find_map(|(si, sub)| {
                sub.groceries
                    .iter()
                    .position(|grocery| grocery.id == id)
                    .map(|gi| (ci, si, gi))
            })
        })
    }

    pub fn max_view_order(&self) -> Option<i64> {
        self.categories
            .iter()
            .map(|node| node.category.view_order)
            .max()
    }
}
