//! Authoritative owner of the grocery hierarchy for one session.
//!
//! Every mutation is applied to a copy of the tree, the copy is flattened and
//! written to the [`LocalStore`] in one `put_many`, and only then does it
//! replace the live tree. Remote pushes are queued after the local write has
//! succeeded and never influence the result of the call.
//!
//! The repository is not meant to be mutated from several threads at once;
//! callers serialize access (mutating methods take `&mut self`).
//!
//! # Example
//!
//! ```rust
//! use grocery_core::hierarchy_repository::HierarchyRepository;
//! use grocery_core::local_store::MemoryStore;
//! use grocery_core::remote_sync::SyncHandle;
//!
//! let mut repo = HierarchyRepository::open(MemoryStore::new(), SyncHandle::disabled())?;
//! assert_eq!(repo.snapshot().categories.len(), 3);
//!
//! let dairy = repo.create_category("Dairy", None, None)?;
//! let snapshot = repo.snapshot();
//! let general = &snapshot.category_by_name("Dairy").unwrap().sub_categories[0];
//! let milk = repo.create_grocery("Milk", &general.sub_category.id, None)?;
//! repo.set_in_shopping_list(&milk.id, true)?;
//!
//! assert_eq!(repo.shopping_list().len(), 1);
//! assert!(repo.delete_category(&dairy.id).is_ok());
//! # Ok::<(), grocery_core::error::RepositoryError>(())
//! ```

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};

use crate::error::{EntityKind, RepositoryError, Result};
use crate::grocery_model::{Category, Collection, Grocery, Group, SubCategory, SyncRecord};
use crate::hierarchy::{CategoryNode, FlatSnapshot, Hierarchy, HierarchySnapshot, SubCategoryNode};
use crate::local_store::{LocalStore, StoreError};
use crate::merge_policy::{decode_records, MergeReport};
use crate::remote_sync::SyncHandle;

/// Seed categories written when the store holds no categories:
/// `(name, view order, protected)`.
const SEED_CATEGORIES: [(&str, i64, bool); 3] =
    [("Other", 1, true), ("Vegetables", 2, false), ("Fruits", 3, false)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryState {
    Uninitialized,
    Loading,
    Ready,
}

/// Rejects blank names and returns the trimmed name.
fn validate_name(name: &str, entity: EntityKind) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::invalid_input(format!(
            "{entity} name must not be blank"
        )));
    }
    Ok(trimmed.to_string())
}

/// Parses a view order typed into a form.
pub fn parse_view_order(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| RepositoryError::invalid_input(format!("'{raw}' is not a valid view order")))
}

fn seed_tree() -> Hierarchy {
    let mut tree = Hierarchy::default();
    for (name, view_order, is_protected) in SEED_CATEGORIES {
        let category = Category {
            is_default: true,
            is_protected,
            ..Category::new(name, view_order, None)
        };
        let general = SubCategory::general(&category.id);
        tree.categories.push(CategoryNode {
            category,
            sub_categories: vec![SubCategoryNode {
                sub_category: general,
                groceries: Vec::new(),
            }],
        });
    }
    tree
}

pub struct HierarchyRepository<S: LocalStore> {
    store: S,
    sync: SyncHandle,
    tree: Hierarchy,
    state: RepositoryState,
}

impl<S: LocalStore> HierarchyRepository<S> {
    /// Creates an uninitialized repository. Call [`Self::initialize`] before
    /// use, or use [`Self::open`].
    pub fn new(store: S, sync: SyncHandle) -> Self {
        Self {
            store,
            sync,
            tree: Hierarchy::default(),
            state: RepositoryState::Uninitialized,
        }
    }

    /// Creates and initializes a repository.
    pub fn open(store: S, sync: SyncHandle) -> Result<Self> {
        let mut repository = Self::new(store, sync);
        repository.initialize()?;
        Ok(repository)
    }

    pub fn state(&self) -> RepositoryState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sync_handle(&self) -> &SyncHandle {
        &self.sync
    }

    /// Creates a repository and initializes it with
    /// [`Self::initialize_with_remote`].
    pub async fn open_with_remote(store: S, sync: SyncHandle) -> Result<Self> {
        let mut repository = Self::new(store, sync);
        repository.initialize_with_remote().await?;
        Ok(repository)
    }

    /// Loads the flat collections, rebuilds the tree and seeds the default
    /// categories when none exist. Seeded records are queued for the remote.
    ///
    /// A collection that fails to deserialize is replaced by an empty one.
    /// A failing store read aborts initialization instead, so that seeding
    /// never overwrites data that merely could not be read.
    pub fn initialize(&mut self) -> Result<()> {
        self.state = RepositoryState::Loading;
        let loaded = self
            .load_local()
            .and_then(|mut tree| self.seed_if_empty(&mut tree).map(|()| tree));
        self.finish_loading(loaded)
    }

    /// Like [`Self::initialize`], but a store without categories first pulls
    /// the remote collections and adopts them. Seeding only happens when the
    /// remote has no categories either or cannot be reached.
    pub async fn initialize_with_remote(&mut self) -> Result<()> {
        self.state = RepositoryState::Loading;
        let loaded = self.load_with_remote().await;
        self.finish_loading(loaded)
    }

    async fn load_with_remote(&self) -> Result<Hierarchy> {
        let mut tree = self.load_local()?;
        if tree.categories.is_empty() && self.sync.is_enabled() {
            let remote = self.fetch_remote_snapshot().await;
            let (merged, report) = tree.flatten().merge(&remote);
            if report.total() > 0 {
                tree = Hierarchy::rebuild(merged);
                self.persist(&tree)?;
                info!("Adopted {} remote records on first start", report.total());
            }
        }
        self.seed_if_empty(&mut tree)?;
        Ok(tree)
    }

    fn finish_loading(&mut self, loaded: Result<Hierarchy>) -> Result<()> {
        match loaded {
            Ok(tree) => {
                self.tree = tree;
                self.state = RepositoryState::Ready;
                info!(
                    "Hierarchy ready with {} categories",
                    self.tree.categories.len()
                );
                Ok(())
            }
            Err(e) => {
                self.state = RepositoryState::Uninitialized;
                Err(e)
            }
        }
    }

    fn load_local(&self) -> Result<Hierarchy> {
        let flat = FlatSnapshot {
            categories: self.load_collection()?,
            sub_categories: self.load_collection()?,
            groceries: self.load_collection()?,
            groups: self.load_collection()?,
        };
        Ok(Hierarchy::rebuild(flat))
    }

    fn seed_if_empty(&self, tree: &mut Hierarchy) -> Result<()> {
        if !tree.categories.is_empty() {
            return Ok(());
        }
        info!("No categories stored, seeding defaults");
        tree.categories = seed_tree().categories;
        tree.normalize();
        self.persist(tree)?;

        for node in &tree.categories {
            self.sync.save(&node.category);
            for sub in &node.sub_categories {
                self.sync.save(&sub.sub_category);
            }
        }
        Ok(())
    }

    fn load_collection<T: SyncRecord>(&self) -> Result<Vec<T>> {
        let key = T::COLLECTION.key();
        let Some(bytes) = self.store.get(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_slice(&bytes) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!("Stored '{key}' is malformed, starting it empty: {e}");
                Ok(Vec::new())
            }
        }
    }

    fn persist(&self, tree: &Hierarchy) -> Result<()> {
        let flat = tree.flatten();
        let entries = [
            (Collection::Categories.key(), encode(&flat.categories)?),
            (Collection::SubCategories.key(), encode(&flat.sub_categories)?),
            (Collection::Groceries.key(), encode(&flat.groceries)?),
            (Collection::Groups.key(), encode(&flat.groups)?),
        ];
        self.store.put_many(&entries)?;
        Ok(())
    }

    /// Persists `next` and makes it the live tree. On failure the live tree
    /// is untouched.
    fn commit(&mut self, mut next: Hierarchy) -> Result<()> {
        next.normalize();
        self.persist(&next)?;
        self.tree = next;
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state == RepositoryState::Ready {
            Ok(())
        } else {
            Err(RepositoryError::NotReady)
        }
    }

    /// Ordered copy of the whole tree. Empty before initialization.
    pub fn snapshot(&self) -> HierarchySnapshot {
        if self.state != RepositoryState::Ready {
            return HierarchySnapshot::default();
        }
        self.tree.snapshot()
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.tree
            .category_index(id)
            .map(|ci| &self.tree.categories[ci].category)
    }

    pub fn sub_category(&self, id: &str) -> Option<&SubCategory> {
        self.tree
            .locate_sub_category(id)
            .map(|(ci, si)| &self.tree.categories[ci].sub_categories[si].sub_category)
    }

    pub fn grocery(&self, id: &str) -> Option<&Grocery> {
        self.tree
            .locate_grocery(id)
            .map(|(ci, si, gi)| &self.tree.categories[ci].sub_categories[si].groceries[gi])
    }

    /// Groceries flagged for the shopping list, in display order.
    pub fn shopping_list(&self) -> Vec<Grocery> {
        self.tree
            .categories
            .iter()
            .flat_map(|node| node.sub_categories.iter())
            .flat_map(|sub| sub.groceries.iter())
            .filter(|grocery| grocery.in_shopping_list)
            .cloned()
            .collect()
    }

    /// Creates a category together with its protected "General"
    /// sub-category. `view_order` defaults to one past the current maximum.
    pub fn create_category(
        &mut self,
        name: &str,
        view_order: Option<i64>,
        group_id: Option<String>,
    ) -> Result<Category> {
        self.ensure_ready()?;
        let name = validate_name(name, EntityKind::Category)?;
        let view_order = match view_order {
            Some(view_order) => view_order,
            None => match self.tree.max_view_order() {
                None => 1,
                Some(max) => max.checked_add(1).ok_or_else(|| {
                    RepositoryError::invalid_input(
                        "no view order left after the last category, pass one explicitly",
                    )
                })?,
            },
        };

        let category = Category::new(name, view_order, group_id);
        let general = SubCategory::general(&category.id);

        let mut next = self.tree.clone();
        next.categories.push(CategoryNode {
            category: category.clone(),
            sub_categories: vec![SubCategoryNode {
                sub_category: general.clone(),
                groceries: Vec::new(),
            }],
        });
        self.commit(next)?;

        debug!("Created category {} '{}'", category.id, category.name);
        self.sync.save(&category);
        self.sync.save(&general);
        Ok(category)
    }

    /// Replaces the category with the same id and refreshes `last_update`.
    /// `is_protected` and `is_default` keep their stored values.
    pub fn update_category(&mut self, category: Category) -> Result<Category> {
        self.ensure_ready()?;
        let name = validate_name(&category.name, EntityKind::Category)?;
        let ci = self
            .tree
            .category_index(&category.id)
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Category, &category.id))?;
        let stored = &self.tree.categories[ci].category;

        let updated = Category {
            name,
            last_update: Utc::now(),
            is_protected: stored.is_protected,
            is_default: stored.is_default,
            ..category
        };
        let mut next = self.tree.clone();
        next.categories[ci].category = updated.clone();
        self.commit(next)?;

        self.sync.save(&updated);
        Ok(updated)
    }

    /// Removes a category with its sub-categories and their groceries.
    pub fn delete_category(&mut self, id: &str) -> Result<()> {
        self.ensure_ready()?;
        let ci = self
            .tree
            .category_index(id)
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Category, id))?;
        if self.tree.categories[ci].category.is_protected {
            return Err(RepositoryError::protected(EntityKind::Category, id));
        }

        let mut next = self.tree.clone();
        let removed = next.categories.remove(ci);
        self.commit(next)?;

        debug!(
            "Deleted category {id} with {} sub-categories",
            removed.sub_categories.len()
        );
        self.sync.delete(Collection::Categories, id);
        for sub in &removed.sub_categories {
            self.push_sub_category_removal(sub);
        }
        Ok(())
    }

    fn push_sub_category_removal(&self, sub: &SubCategoryNode) {
        self.sync
            .delete(Collection::SubCategories, &sub.sub_category.id);
        for grocery in &sub.groceries {
            self.sync.delete(Collection::Groceries, &grocery.id);
        }
    }

    pub fn create_sub_category(&mut self, category_id: &str, name: &str) -> Result<SubCategory> {
        self.ensure_ready()?;
        let name = validate_name(name, EntityKind::SubCategory)?;
        let ci = self
            .tree
            .category_index(category_id)
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Category, category_id))?;

        let sub_category = SubCategory::new(category_id, name);
        let mut next = self.tree.clone();
        next.categories[ci].sub_categories.push(SubCategoryNode {
            sub_category: sub_category.clone(),
            groceries: Vec::new(),
        });
        self.commit(next)?;

        self.sync.save(&sub_category);
        Ok(sub_category)
    }

    /// Replaces the sub-category with the same id. A changed `category_id`
    /// moves it, groceries included, to that category. `is_protected` keeps
    /// its stored value.
    pub fn update_sub_category(&mut self, sub_category: SubCategory) -> Result<SubCategory> {
        self.ensure_ready()?;
        let name = validate_name(&sub_category.name, EntityKind::SubCategory)?;
        let (ci, si) = self
            .tree
            .locate_sub_category(&sub_category.id)
            .ok_or_else(|| RepositoryError::not_found(EntityKind::SubCategory, &sub_category.id))?;
        let target = self
            .tree
            .category_index(&sub_category.category_id)
            .ok_or_else(|| {
                RepositoryError::not_found(EntityKind::Category, &sub_category.category_id)
            })?;

        let updated = SubCategory {
            name,
            is_protected: self.tree.categories[ci].sub_categories[si]
                .sub_category
                .is_protected,
            ..sub_category
        };
        let mut next = self.tree.clone();
        if target == ci {
            next.categories[ci].sub_categories[si].sub_category = updated.clone();
        } else {
            let mut node = next.categories[ci].sub_categories.remove(si);
            node.sub_category = updated.clone();
            next.categories[target].sub_categories.push(node);
        }
        self.commit(next)?;

        self.sync.save(&updated);
        Ok(updated)
    }

    /// Removes a sub-category and its groceries.
    pub fn delete_sub_category(&mut self, id: &str) -> Result<()> {
        self.ensure_ready()?;
        let (ci, si) = self
            .tree
            .locate_sub_category(id)
            .ok_or_else(|| RepositoryError::not_found(EntityKind::SubCategory, id))?;
        if self.tree.categories[ci].sub_categories[si].sub_category.is_protected {
            return Err(RepositoryError::protected(EntityKind::SubCategory, id));
        }

        let mut next = self.tree.clone();
        let removed = next.categories[ci].sub_categories.remove(si);
        self.commit(next)?;

        self.push_sub_category_removal(&removed);
        Ok(())
    }

    pub fn create_grocery(
        &mut self,
        name: &str,
        sub_category_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Grocery> {
        self.ensure_ready()?;
        let name = validate_name(name, EntityKind::Grocery)?;
        let (ci, si) = self
            .tree
            .locate_sub_category(sub_category_id)
            .ok_or_else(|| RepositoryError::not_found(EntityKind::SubCategory, sub_category_id))?;

        let grocery = Grocery::new(name, sub_category_id, date);
        let mut next = self.tree.clone();
        next.categories[ci].sub_categories[si]
            .groceries
            .push(grocery.clone());
        self.commit(next)?;

        self.sync.save(&grocery);
        Ok(grocery)
    }

    /// Replaces the grocery with the same id. A changed `sub_category_id`
    /// moves it to the end of that sub-category.
    pub fn update_grocery(&mut self, grocery: Grocery) -> Result<Grocery> {
        self.ensure_ready()?;
        let name = validate_name(&grocery.name, EntityKind::Grocery)?;
        let (ci, si, gi) = self
            .tree
            .locate_grocery(&grocery.id)
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Grocery, &grocery.id))?;
        let (tci, tsi) = self
            .tree
            .locate_sub_category(&grocery.sub_category_id)
            .ok_or_else(|| {
                RepositoryError::not_found(EntityKind::SubCategory, &grocery.sub_category_id)
            })?;

        let updated = Grocery { name, ..grocery };
        let mut next = self.tree.clone();
        if (tci, tsi) == (ci, si) {
            next.categories[ci].sub_categories[si].groceries[gi] = updated.clone();
        } else {
            next.categories[ci].sub_categories[si].groceries.remove(gi);
            next.categories[tci].sub_categories[tsi]
                .groceries
                .push(updated.clone());
        }
        self.commit(next)?;

        self.sync.save(&updated);
        Ok(updated)
    }

    pub fn set_in_shopping_list(&mut self, id: &str, in_shopping_list: bool) -> Result<Grocery> {
        let grocery = self
            .grocery(id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Grocery, id))?;
        self.update_grocery(Grocery {
            in_shopping_list,
            ..grocery
        })
    }

    pub fn set_bought(&mut self, id: &str, is_bought: bool) -> Result<Grocery> {
        let grocery = self
            .grocery(id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Grocery, id))?;
        self.update_grocery(Grocery { is_bought, ..grocery })
    }

    /// Removes a grocery. An unknown id is reported as `NotFound`.
    pub fn delete_grocery(&mut self, id: &str) -> Result<()> {
        self.ensure_ready()?;
        let (ci, si, gi) = self
            .tree
            .locate_grocery(id)
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Grocery, id))?;

        let mut next = self.tree.clone();
        next.categories[ci].sub_categories[si].groceries.remove(gi);
        self.commit(next)?;

        self.sync.delete(Collection::Groceries, id);
        Ok(())
    }

    /// Clears categories, sub-categories and groceries (orphans included)
    /// and requests remote deletion of every one of them. Groups are kept.
    /// The next [`Self::initialize`] seeds the defaults again.
    pub fn delete_all(&mut self) -> Result<()> {
        self.ensure_ready()?;
        let known = self.tree.flatten();

        let next = Hierarchy {
            groups: self.tree.groups.clone(),
            ..Hierarchy::default()
        };
        self.commit(next)?;

        info!(
            "Deleted all data ({} categories, {} sub-categories, {} groceries)",
            known.categories.len(),
            known.sub_categories.len(),
            known.groceries.len()
        );
        for category in &known.categories {
            self.sync.delete(Collection::Categories, &category.id);
        }
        for sub in &known.sub_categories {
            self.sync.delete(Collection::SubCategories, &sub.id);
        }
        for grocery in &known.groceries {
            self.sync.delete(Collection::Groceries, &grocery.id);
        }
        Ok(())
    }

    pub fn groups(&self) -> &[Group] {
        &self.tree.groups
    }

    pub fn group_by_code(&self, code: &str) -> Option<&Group> {
        self.tree.groups.iter().find(|group| group.code == code)
    }

    /// Creates a sharing group with a random 8-digit code. Codes are not
    /// checked against existing groups.
    pub fn create_group(&mut self) -> Result<Group> {
        self.ensure_ready()?;
        let group = Group::generate(&mut rand::thread_rng());

        let mut next = self.tree.clone();
        next.groups.push(group.clone());
        self.commit(next)?;

        self.sync.save(&group);
        Ok(group)
    }

    /// Merges an externally fetched remote snapshot into local data
    /// (local wins), persists the result and rebuilds the tree.
    pub fn apply_remote_snapshot(&mut self, remote: &FlatSnapshot) -> Result<MergeReport> {
        self.ensure_ready()?;
        let (merged, report) = self.tree.flatten().merge(remote);
        if report.total() == 0 {
            debug!("Remote snapshot added nothing");
            return Ok(report);
        }

        self.commit(Hierarchy::rebuild(merged))?;
        info!("Merged {} remote records into local data", report.total());
        Ok(report)
    }

    /// Pulls every collection from the remote and merges it into local data.
    /// A collection that cannot be fetched is left as it is locally.
    pub async fn sync_with_remote(&mut self) -> Result<MergeReport> {
        self.ensure_ready()?;
        let remote = self.fetch_remote_snapshot().await;
        self.apply_remote_snapshot(&remote)
    }

    async fn fetch_remote_snapshot(&self) -> FlatSnapshot {
        FlatSnapshot {
            categories: self.fetch_remote().await,
            sub_categories: self.fetch_remote().await,
            groceries: self.fetch_remote().await,
            groups: self.fetch_remote().await,
        }
    }

    async fn fetch_remote<T: SyncRecord>(&self) -> Vec<T> {
        match self.sync.fetch_all(T::COLLECTION).await {
            Ok(documents) => decode_records(documents),
            Err(e) => {
                warn!("Could not pull remote {}: {e}", T::COLLECTION.key());
                Vec::new()
            }
        }
    }
}

fn encode<T: serde::Serialize>(records: &[T]) -> Result<Vec<u8>> {
    serde_json::to_vec(records).map_err(|e| RepositoryError::LocalPersist(StoreError::from(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_store::MemoryStore;

    fn open() -> HierarchyRepository<MemoryStore> {
        HierarchyRepository::open(MemoryStore::new(), SyncHandle::disabled()).unwrap()
    }

    #[test]
    fn operations_require_initialization() {
        let mut repo = HierarchyRepository::new(MemoryStore::new(), SyncHandle::disabled());
        assert_eq!(repo.state(), RepositoryState::Uninitialized);
        assert!(repo.snapshot().is_empty());
        assert!(matches!(
            repo.create_category("Dairy", None, None),
            Err(RepositoryError::NotReady)
        ));

        repo.initialize().unwrap();
        assert_eq!(repo.state(), RepositoryState::Ready);
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut repo = open();
        let before = repo.snapshot();
        assert!(matches!(
            repo.create_category("   ", None, None),
            Err(RepositoryError::InvalidInput(_))
        ));
        assert_eq!(repo.snapshot(), before);
    }

    #[test]
    fn default_view_order_follows_maximum() {
        let mut repo = open();
        let dairy = repo.create_category("Dairy", None, None).unwrap();
        assert_eq!(dairy.view_order, 4);
        let first = repo.create_category("Bakery", Some(0), None).unwrap();
        assert_eq!(repo.snapshot().categories[0].category.id, first.id);
    }

    #[test]
    fn default_view_order_refuses_to_overflow() {
        let mut repo = open();
        repo.create_category("Last", Some(i64::MAX), None).unwrap();
        let before = repo.snapshot();

        assert!(matches!(
            repo.create_category("Next", None, None),
            Err(RepositoryError::InvalidInput(_))
        ));
        assert_eq!(repo.snapshot(), before);

        let explicit = repo.create_category("Next", Some(5), None).unwrap();
        assert_eq!(explicit.view_order, 5);
    }

    #[test]
    fn updates_keep_stored_protection() {
        let mut repo = open();
        let snapshot = repo.snapshot();
        let other = snapshot.category_by_name("Other").unwrap();
        let general = other.sub_categories[0].sub_category.clone();

        let updated = repo
            .update_category(Category {
                name: "Misc".to_string(),
                is_protected: false,
                is_default: false,
                ..other.category.clone()
            })
            .unwrap();
        assert!(updated.is_protected);
        assert!(updated.is_default);
        assert_eq!(updated.name, "Misc");
        assert!(matches!(
            repo.delete_category(&other.category.id),
            Err(RepositoryError::Protected { .. })
        ));

        let renamed = repo
            .update_sub_category(SubCategory {
                name: "Everything".to_string(),
                is_protected: false,
                ..general.clone()
            })
            .unwrap();
        assert!(renamed.is_protected);
        assert!(matches!(
            repo.delete_sub_category(&general.id),
            Err(RepositoryError::Protected { .. })
        ));
        assert_eq!(repo.snapshot().categories.len(), 3);
    }

    #[test]
    fn new_categories_get_a_protected_general_sub_category() {
        let mut repo = open();
        let dairy = repo.create_category(" Dairy ", None, None).unwrap();
        assert_eq!(dairy.name, "Dairy");

        let snapshot = repo.snapshot();
        let node = snapshot.category_by_name("Dairy").unwrap();
        assert_eq!(node.sub_categories.len(), 1);
        let general = &node.sub_categories[0].sub_category;
        assert_eq!(general.name, "General");
        assert!(matches!(
            repo.delete_sub_category(&general.id),
            Err(RepositoryError::Protected { .. })
        ));
    }

    #[test]
    fn parse_view_order_rejects_garbage() {
        assert_eq!(parse_view_order(" 12 ").unwrap(), 12);
        assert!(matches!(
            parse_view_order("twelve"),
            Err(RepositoryError::InvalidInput(_))
        ));
    }
}
