//! Entity definitions for the grocery hierarchy.
//!
//! This module defines the flat records that are persisted to the local store
//! and exchanged with the remote document collection. The nested, display-ready
//! view of the same data lives in [`crate::hierarchy`].
//!
//! # Structure
//!
//! - [`Category`]: top level grouping, ordered by `viewOrder`
//! - [`SubCategory`]: belongs to exactly one category through `categoryId`
//! - [`Grocery`]: belongs to exactly one sub-category through `subCategoryId`
//! - [`Group`]: sharing group identified by an 8-digit numeric code
//!
//! All records serialize to camelCase JSON objects. Calendar dates on
//! [`Grocery`] use the `YYYY-MM-DD` form and never carry a time zone; a
//! malformed date deserializes to `None` instead of failing the whole record.
//!
//! ```rust
//! use grocery_core::grocery_model::{Category, Grocery};
//!
//! let fruits = Category::new("Fruits", 3, None);
//! let json = serde_json::to_string(&fruits)?;
//! assert!(json.contains("\"viewOrder\":3"));
//!
//! let raw = r#"{"id":"g1","name":"Milk","subCategoryId":"s1","date":"not-a-date"}"#;
//! let milk: Grocery = serde_json::from_str(raw)?;
//! assert!(milk.date.is_none());
//! # Ok::<(), serde_json::Error>(())
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to the sub-category created alongside every category.
pub const GENERAL_SUB_CATEGORY: &str = "General";

/// Generates a fresh opaque identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logical collections shared by the local store keys and the remote
/// collection names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Categories,
    SubCategories,
    Groceries,
    Groups,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Categories,
        Collection::SubCategories,
        Collection::Groceries,
        Collection::Groups,
    ];

    /// Key under which the flat list is stored locally, also used as the
    /// remote collection name.
    pub fn key(self) -> &'static str {
        match self {
            Collection::Categories => "categories",
            Collection::SubCategories => "subcategories",
            Collection::Groceries => "groceries",
            Collection::Groups => "groups",
        }
    }
}

/// Behaviour shared by every record that is persisted as a flat list and
/// merged against a remote copy.
pub trait SyncRecord: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// Puts records into their canonical order. Must be a stable sort so that
    /// merging stays idempotent. The default keeps insertion order.
    fn sort_canonical(records: &mut [Self]) {
        let _ = records;
    }
}

/// Top level grouping of sub-categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    /// Display position, ascending. Not unique.
    #[serde(default)]
    pub view_order: i64,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub is_protected: bool,
    /// Informational only, never used to resolve conflicts.
    #[serde(default)]
    pub last_update: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>, view_order: i64, group_id: Option<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            is_default: false,
            view_order,
            group_id,
            is_protected: false,
            last_update: Utc::now(),
        }
    }
}

impl SyncRecord for Category {
    const COLLECTION: Collection = Collection::Categories;

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_canonical(records: &mut [Self]) {
        records.sort_by_key(|category| category.view_order);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: String,
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub is_protected: bool,
}

impl SubCategory {
    pub fn new(category_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            category_id: category_id.into(),
            name: name.into(),
            is_protected: false,
        }
    }

    /// The protected "General" sub-category that accompanies a category.
    pub fn general(category_id: impl Into<String>) -> Self {
        Self {
            is_protected: true,
            ..Self::new(category_id, GENERAL_SUB_CATEGORY)
        }
    }
}

impl SyncRecord for SubCategory {
    const COLLECTION: Collection = Collection::SubCategories;

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_canonical(records: &mut [Self]) {
        records.sort_by(|a, b| compare_names(&a.name, &b.name));
    }
}

/// Case-insensitive name ordering used for sub-categories.
pub(crate) fn compare_names(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grocery {
    pub id: String,
    pub name: String,
    pub sub_category_id: String,
    #[serde(default, with = "calendar_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, with = "calendar_date")]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub in_shopping_list: bool,
    #[serde(default)]
    pub is_bought: bool,
}

impl Grocery {
    pub fn new(
        name: impl Into<String>,
        sub_category_id: impl Into<String>,
        date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            sub_category_id: sub_category_id.into(),
            date,
            expiration_date: None,
            in_shopping_list: false,
            is_bought: false,
        }
    }
}

impl SyncRecord for Grocery {
    const COLLECTION: Collection = Collection::Groceries;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Sharing group. Only the entity shape and code generation exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub code: String,
}

impl Group {
    /// Creates a group with a freshly drawn code. Codes are not checked for
    /// collisions against existing groups.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            id: new_id(),
            code: generate_group_code(rng),
        }
    }
}

impl SyncRecord for Group {
    const COLLECTION: Collection = Collection::Groups;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Draws an 8-digit numeric code (no leading zero).
pub fn generate_group_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(10_000_000u32..100_000_000u32).to_string()
}

/// Parses a calendar date, accepting either `YYYY-MM-DD` or an ISO-8601
/// timestamp whose first ten characters form one. The time part is ignored.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, calendar_date::FORMAT)
        .ok()
        .or_else(|| {
            raw.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, calendar_date::FORMAT).ok())
        })
}

/// Serde adapter for optional calendar dates.
pub mod calendar_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    /// Never fails on content: anything that is not a recognisable date
    /// string becomes `None`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(Value::as_str)
            .and_then(super::parse_calendar_date))
    }
}
