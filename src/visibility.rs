//! Which categories and sub-categories are expanded for a search query.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::hierarchy::HierarchySnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    pub expanded_category_ids: BTreeSet<String>,
    pub expanded_sub_category_ids: BTreeSet<String>,
}

impl Visibility {
    pub fn is_category_expanded(&self, id: &str) -> bool {
        self.expanded_category_ids.contains(id)
    }

    pub fn is_sub_category_expanded(&self, id: &str) -> bool {
        self.expanded_sub_category_ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.expanded_category_ids.is_empty() && self.expanded_sub_category_ids.is_empty()
    }
}

/// Derives the expanded nodes for `query`.
///
/// A blank query expands everything or nothing, following `all_expanded`.
/// Otherwise only the ancestors of groceries whose name contains the trimmed
/// query (ignoring case) are expanded, and `all_expanded` has no effect. A
/// query that matches nothing yields an empty result.
pub fn compute_visibility(
    snapshot: &HierarchySnapshot,
    query: &str,
    all_expanded: bool,
) -> Visibility {
    let needle = query.trim().to_lowercase();

    if needle.is_empty() {
        if !all_expanded {
            return Visibility::default();
        }
        return Visibility {
            expanded_category_ids: snapshot
                .categories
                .iter()
                .map(|node| node.category.id.clone())
                .collect(),
            expanded_sub_category_ids: snapshot
                .sub_categories()
                .map(|node| node.sub_category.id.clone())
                .collect(),
        };
    }

    let mut visibility = Visibility::default();
    for category in &snapshot.categories {
        for sub in &category.sub_categories {
            let matched = sub
                .groceries
                .iter()
                .any(|grocery| grocery.name.to_lowercase().contains(&needle));
            if matched {
                visibility
                    .expanded_sub_category_ids
                    .insert(sub.sub_category.id.clone());
                visibility
                    .expanded_category_ids
                    .insert(category.category.id.clone());
            }
        }
    }
    visibility
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grocery_model::{Category, Grocery, SubCategory};
    use crate::hierarchy::{CategoryNode, SubCategoryNode};

    fn node(name: &str, view_order: i64, groceries: &[&str]) -> CategoryNode {
        let category = Category::new(name, view_order, None);
        let sub = SubCategory::general(&category.id);
        let groceries = groceries
            .iter()
            .map(|g| Grocery::new(*g, &sub.id, None))
            .collect();
        CategoryNode {
            category,
            sub_categories: vec![SubCategoryNode {
                sub_category: sub,
                groceries,
            }],
        }
    }

    fn fixture() -> HierarchySnapshot {
        HierarchySnapshot {
            categories: vec![
                node("Vegetables", 2, &["Carrot"]),
                node("Fruits", 3, &["Apple", "Banana"]),
            ],
        }
    }

    #[test]
    fn query_expands_only_matching_branches() {
        let snapshot = fixture();
        let fruits = &snapshot.categories[1];

        let visibility = compute_visibility(&snapshot, "app", false);
        assert_eq!(
            visibility.expanded_category_ids,
            BTreeSet::from([fruits.category.id.clone()])
        );
        assert_eq!(
            visibility.expanded_sub_category_ids,
            BTreeSet::from([fruits.sub_categories[0].sub_category.id.clone()])
        );
        assert!(!visibility.is_category_expanded(&snapshot.categories[0].category.id));
    }

    #[test]
    fn matching_ignores_case_and_global_toggle() {
        let snapshot = fixture();
        let visibility = compute_visibility(&snapshot, "  CARR ", true);
        assert!(visibility.is_category_expanded(&snapshot.categories[0].category.id));
        assert_eq!(visibility.expanded_category_ids.len(), 1);
    }

    #[test]
    fn blank_query_follows_global_toggle() {
        let snapshot = fixture();

        let expanded = compute_visibility(&snapshot, "   ", true);
        assert_eq!(expanded.expanded_category_ids.len(), 2);
        assert_eq!(expanded.expanded_sub_category_ids.len(), 2);

        assert!(compute_visibility(&snapshot, "", false).is_empty());
    }

    #[test]
    fn no_match_yields_empty_sets() {
        let snapshot = fixture();
        let visibility = compute_visibility(&snapshot, "zucchini", true);
        assert!(visibility.is_empty());
        assert_eq!(visibility, compute_visibility(&snapshot, "zucchini", true));
    }
}
