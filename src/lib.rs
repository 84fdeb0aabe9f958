//! # Grocery Core
//!
//! Local-first data layer for a grocery list application. It owns the
//! Category → SubCategory → Grocery hierarchy, keeps it consistent with
//! on-device storage (LMDB) and pushes changes to a remote document store on
//! a best-effort basis.
//!
//! ## Features
//!
//! - **Single source of truth**: [`hierarchy_repository::HierarchyRepository`]
//!   owns the tree and persists a complete snapshot on every mutation
//! - **Atomic snapshots**: all collections are written in one LMDB transaction
//! - **Best-effort sync**: remote pushes run on a background worker and never
//!   fail or roll back a local change
//! - **Local-wins merge**: remote data only adds records the device has not seen
//! - **Search projection**: [`visibility::compute_visibility`] derives which
//!   branches to expand for a query
//! - **FFI-ready**: JSON-in / JSON-out C functions for Flutter hosts
//!
//! ## Quick Start
//!
//! ```no_run
//! use grocery_core::{create_store, get_snapshot};
//! use std::ffi::CString;
//!
//! let config = CString::new(r#"{"databasePath":"groceries"}"#).unwrap();
//! let store = create_store(config.as_ptr());
//!
//! let snapshot = get_snapshot(store);
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_store`] - Open the store and load or seed the hierarchy
//! - [`get_snapshot`] - Ordered tree as JSON
//! - [`create_category`], [`update_category`], [`delete_category`]
//! - [`create_sub_category`], [`update_sub_category`], [`delete_sub_category`]
//! - [`create_grocery`], [`update_grocery`], [`delete_grocery`]
//! - [`delete_all`] - Clear every category, sub-category and grocery
//! - [`search_visibility`] - Expanded ids for a search query
//! - [`merge_remote_snapshot`] - Merge collections fetched by the host
//! - [`close_store`] - Release the store
//! - [`free_response`] - Release a string returned by any function above
//!
//! The FFI build runs without a remote worker: the host performs remote I/O
//! itself and hands fetched data to [`merge_remote_snapshot`].

pub mod app_response;
pub mod config;
pub mod error;
pub mod grocery_model;
pub mod hierarchy;
pub mod hierarchy_repository;
pub mod local_store;
pub mod merge_policy;
pub mod remote_sync;
pub mod visibility;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use chrono::NaiveDate;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app_response::AppResponse;
use crate::config::CoreConfig;
use crate::error::RepositoryError;
use crate::grocery_model::{calendar_date, Category, Grocery, SubCategory};
use crate::hierarchy::FlatSnapshot;
use crate::hierarchy_repository::{parse_view_order, HierarchyRepository};
use crate::local_store::LmdbStore;
use crate::remote_sync::SyncHandle;
use crate::visibility::compute_visibility;

/// Store handle handed to FFI callers.
pub type GroceryStore = HierarchyRepository<LmdbStore>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewCategoryRequest {
    name: String,
    /// Number or numeric string, as typed into a form.
    #[serde(default)]
    view_order: Option<Value>,
    #[serde(default)]
    group_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSubCategoryRequest {
    category_id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewGroceryRequest {
    name: String,
    sub_category_id: String,
    #[serde(default, with = "calendar_date")]
    date: Option<NaiveDate>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct SearchRequest {
    query: String,
    all_expanded: bool,
}

fn view_order_from(value: &Value) -> Result<Option<i64>, RepositoryError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => number.as_i64().map(Some).ok_or_else(|| {
            RepositoryError::invalid_input(format!("'{number}' is not a valid view order"))
        }),
        Value::String(raw) => parse_view_order(raw).map(Some),
        other => Err(RepositoryError::invalid_input(format!(
            "'{other}' is not a valid view order"
        ))),
    }
}

/// Opens the LMDB store described by `config_json` and initializes the
/// hierarchy, seeding the default categories on first use.
///
/// # Parameters
///
/// * `config_json` - Null-terminated JSON [`CoreConfig`]; missing fields use
///   their defaults
///
/// # Returns
///
/// A pointer to the [`GroceryStore`], or null on failure. Release it with
/// [`close_store`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use grocery_core::{close_store, create_store};
///
/// let config = CString::new(r#"{"databasePath":"groceries","mapSizeBytes":1048576}"#).unwrap();
/// let store = create_store(config.as_ptr());
/// if !store.is_null() {
///     close_store(store);
/// }
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_store(config_json: *const c_char) -> *mut GroceryStore {
    if config_json.is_null() {
        warn!("Null config pointer passed to create_store");
        return std::ptr::null_mut();
    }

    let raw = match unsafe { CStr::from_ptr(config_json).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in config parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    let config = match CoreConfig::from_json(raw) {
        Ok(config) => config,
        Err(e) => {
            warn!("Invalid store configuration: {e}");
            return std::ptr::null_mut();
        }
    };

    let store = match LmdbStore::open(&config.database_path, config.map_size_bytes) {
        Ok(store) => store,
        Err(e) => {
            warn!("❌ Failed to open store at {}: {e}", config.database_path);
            return std::ptr::null_mut();
        }
    };

    match HierarchyRepository::open(store, SyncHandle::disabled()) {
        Ok(repository) => {
            info!("✅ Grocery store initialized");
            Box::into_raw(Box::new(repository))
        }
        Err(e) => {
            warn!("❌ Failed to initialize hierarchy: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Returns the ordered hierarchy as JSON (`{"categories":[...]}` with nested
/// `subCategories` and `groceries`).
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_snapshot(state: *mut GroceryStore) -> *const c_char {
    with_store(state, "get_snapshot", |store| {
        AppResponse::json(&store.snapshot())
    })
}

/// Creates a category.
///
/// # JSON Format
///
/// ```json
/// { "name": "Dairy", "viewOrder": 4, "groupId": null }
/// ```
///
/// `viewOrder` is optional and may be a number or a numeric string.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_category(state: *mut GroceryStore, json_ptr: *const c_char) -> *const c_char {
    let request: NewCategoryRequest = match parse_json(json_ptr) {
        Ok(request) => request,
        Err(error_ptr) => return error_ptr,
    };

    with_store(state, "create_category", |store| {
        let view_order = match request.view_order.as_ref().map(view_order_from) {
            Some(Ok(view_order)) => view_order,
            Some(Err(e)) => return AppResponse::from(e),
            None => None,
        };
        respond(store.create_category(&request.name, view_order, request.group_id))
    })
}

/// Replaces a category by id. Takes a full category object; `isProtected`
/// and `isDefault` keep their stored values.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_category(state: *mut GroceryStore, json_ptr: *const c_char) -> *const c_char {
    let category: Category = match parse_json(json_ptr) {
        Ok(category) => category,
        Err(error_ptr) => return error_ptr,
    };
    with_store(state, "update_category", |store| respond(store.update_category(category)))
}

/// Deletes a category with everything below it. Protected categories are
/// refused with a `Protected` response.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_category(state: *mut GroceryStore, id: *const c_char) -> *const c_char {
    let id = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(error_ptr) => return error_ptr,
    };
    with_store(state, "delete_category", |store| {
        acknowledge(store.delete_category(&id), "Category deleted successfully")
    })
}

/// Creates a sub-category: `{ "categoryId": "...", "name": "..." }`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_sub_category(state: *mut GroceryStore, json_ptr: *const c_char) -> *const c_char {
    let request: NewSubCategoryRequest = match parse_json(json_ptr) {
        Ok(request) => request,
        Err(error_ptr) => return error_ptr,
    };
    with_store(state, "create_sub_category", |store| {
        respond(store.create_sub_category(&request.category_id, &request.name))
    })
}

/// Replaces a sub-category by id. A different `categoryId` moves it, with its
/// groceries, to that category.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_store`]
/// * `json_ptr` - Null-terminated JSON sub-category object
///
/// # Returns
///
/// The stored sub-category as an `Ok` envelope. `isProtected` keeps its
/// stored value whatever the request says. Free it with [`free_response`].
///
/// # Errors
///
/// * `SerializationError` - the JSON does not describe a sub-category
/// * `NotFound` - unknown sub-category id or target category
/// * `ValidationError` - blank name
/// * `BadRequest` - null pointers
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_sub_category(state: *mut GroceryStore, json_ptr: *const c_char) -> *const c_char {
    let sub_category: SubCategory = match parse_json(json_ptr) {
        Ok(sub_category) => sub_category,
        Err(error_ptr) => return error_ptr,
    };
    with_store(state, "update_sub_category", |store| {
        respond(store.update_sub_category(sub_category))
    })
}

/// Deletes a sub-category and its groceries.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_store`]
/// * `id` - Null-terminated sub-category id
///
/// # Returns
///
/// An `Ok` envelope with a confirmation message.
///
/// # Errors
///
/// * `Protected` - the sub-category is a protected "General" one
/// * `NotFound` - unknown id
/// * `DatabaseError` - the store rejected the write; nothing was removed
/// * `BadRequest` - null pointers
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_sub_category(state: *mut GroceryStore, id: *const c_char) -> *const c_char {
    let id = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(error_ptr) => return error_ptr,
    };
    with_store(state, "delete_sub_category", |store| {
        acknowledge(store.delete_sub_category(&id), "Sub-category deleted successfully")
    })
}

/// Creates a grocery:
/// `{ "name": "Milk", "subCategoryId": "...", "date": "2024-05-01" }`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_grocery(state: *mut GroceryStore, json_ptr: *const c_char) -> *const c_char {
    let request: NewGroceryRequest = match parse_json(json_ptr) {
        Ok(request) => request,
        Err(error_ptr) => return error_ptr,
    };
    with_store(state, "create_grocery", |store| {
        respond(store.create_grocery(&request.name, &request.sub_category_id, request.date))
    })
}

/// Replaces a grocery by id. A different `subCategoryId` moves it to the end
/// of that sub-category.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_store`]
/// * `json_ptr` - Null-terminated JSON grocery object; dates use `YYYY-MM-DD`
///
/// # Returns
///
/// The stored grocery as an `Ok` envelope.
///
/// # Errors
///
/// * `SerializationError` - the JSON does not describe a grocery
/// * `NotFound` - unknown grocery id or target sub-category
/// * `ValidationError` - blank name
/// * `BadRequest` - null pointers
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_grocery(state: *mut GroceryStore, json_ptr: *const c_char) -> *const c_char {
    let grocery: Grocery = match parse_json(json_ptr) {
        Ok(grocery) => grocery,
        Err(error_ptr) => return error_ptr,
    };
    with_store(state, "update_grocery", |store| respond(store.update_grocery(grocery)))
}

/// Deletes a grocery.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_store`]
/// * `id` - Null-terminated grocery id
///
/// # Returns
///
/// An `Ok` envelope with a confirmation message.
///
/// # Errors
///
/// * `NotFound` - unknown id
/// * `DatabaseError` - the store rejected the write
/// * `BadRequest` - null pointers
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_grocery(state: *mut GroceryStore, id: *const c_char) -> *const c_char {
    let id = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(error_ptr) => return error_ptr,
    };
    with_store(state, "delete_grocery", |store| {
        acknowledge(store.delete_grocery(&id), "Grocery deleted successfully")
    })
}

/// Clears every category, sub-category and grocery. Sharing groups are
/// kept. The default categories are seeded again the next time the store
/// is opened.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_store`]
///
/// # Returns
///
/// An `Ok` envelope with a confirmation message.
///
/// # Errors
///
/// * `DatabaseError` - the store rejected the write; nothing was cleared
/// * `BadRequest` - null state pointer
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_all(state: *mut GroceryStore) -> *const c_char {
    with_store(state, "delete_all", |store| {
        acknowledge(store.delete_all(), "All records cleared successfully")
    })
}

/// Computes expanded ids: `{ "query": "app", "allExpanded": false }`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn search_visibility(state: *mut GroceryStore, json_ptr: *const c_char) -> *const c_char {
    let request: SearchRequest = match parse_json(json_ptr) {
        Ok(request) => request,
        Err(error_ptr) => return error_ptr,
    };
    with_store(state, "search_visibility", |store| {
        let snapshot = store.snapshot();
        AppResponse::json(&compute_visibility(&snapshot, &request.query, request.all_expanded))
    })
}

/// Merges collections fetched from the remote by the host. Local records win.
///
/// # JSON Format
///
/// ```json
/// { "categories": [], "subCategories": [], "groceries": [], "groups": [] }
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn merge_remote_snapshot(state: *mut GroceryStore, json_ptr: *const c_char) -> *const c_char {
    let remote: FlatSnapshot = match parse_json(json_ptr) {
        Ok(remote) => remote,
        Err(error_ptr) => return error_ptr,
    };
    with_store(state, "merge_remote_snapshot", |store| {
        respond(store.apply_remote_snapshot(&remote))
    })
}

/// Releases a store created by [`create_store`]. The pointer must not be
/// used afterwards. LMDB closes the environment when the store is dropped.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_store(state: *mut GroceryStore) -> *const c_char {
    if state.is_null() {
        let error = AppResponse::BadRequest("Null state pointer passed to close_store".to_string());
        return response_to_c_string(&error);
    }

    drop(unsafe { Box::from_raw(state) });
    response_to_c_string(&AppResponse::success("Store closed successfully"))
}

/// Releases a string returned by this library.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr as *mut c_char) });
    }
}

fn with_store<F>(state: *mut GroceryStore, operation: &str, f: F) -> *const c_char
where
    F: FnOnce(&mut GroceryStore) -> AppResponse,
{
    match unsafe { state.as_mut() } {
        Some(store) => response_to_c_string(&f(store)),
        None => {
            let error = AppResponse::BadRequest(format!("Null state pointer passed to {operation}"));
            response_to_c_string(&error)
        }
    }
}

fn respond<T: Serialize>(result: Result<T, RepositoryError>) -> AppResponse {
    match result {
        Ok(value) => AppResponse::json(&value),
        Err(e) => AppResponse::from(e),
    }
}

fn acknowledge(result: Result<(), RepositoryError>, message: &str) -> AppResponse {
    match result {
        Ok(()) => AppResponse::success(message),
        Err(e) => AppResponse::from(e),
    }
}

fn parse_json<T: DeserializeOwned>(ptr: *const c_char) -> Result<T, *const c_char> {
    let raw = c_ptr_to_string(ptr, "JSON")?;
    serde_json::from_str(&raw).map_err(|e| {
        let error = AppResponse::SerializationError(format!("Invalid JSON: {e}"));
        response_to_c_string(&error)
    })
}

/// Serializes `response` into a newly allocated C string. Null if that fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer into a `String`, or an error response for
/// null pointers and invalid UTF-8.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
