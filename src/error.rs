//! Error types surfaced by the hierarchy repository.

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::local_store::StoreError;

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Entity type named in [`RepositoryError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Category,
    SubCategory,
    Grocery,
    Group,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Category => "category",
            EntityKind::SubCategory => "sub-category",
            EntityKind::Grocery => "grocery",
            EntityKind::Group => "group",
        };
        f.write_str(name)
    }
}

/// Failures returned by repository operations.
///
/// Every variant except [`RepositoryError::LocalPersist`] is raised before the
/// tree is touched. A persist failure discards the pending change, so in all
/// cases the tree is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },

    #[error("{entity} '{id}' is protected and cannot be deleted")]
    Protected { entity: EntityKind, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Writing the snapshot to the local store failed.
    #[error("local persist failed: {0}")]
    LocalPersist(#[from] StoreError),

    #[error("repository is not initialized")]
    NotReady,
}

impl RepositoryError {
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn protected(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::Protected {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
