//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The caller is known but may not touch this resource.
    #[error("Access denied")]
    AccessDenied,

    /// Checkout was attempted on a cart with no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The operation needs an identified caller.
    #[error("Authentication required")]
    NotAuthenticated,

    /// Storage failed in a way that may succeed on retry.
    #[error("Storage temporarily unavailable: {0}")]
    TransientStorage(StoreError),

    /// Storage rejected the operation and retrying will not help.
    #[error("Storage error: {0}")]
    Storage(StoreError),

    /// An error in the cart rules.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// An error in the order rules.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error in the catalog rules.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        DomainError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns true if the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::TransientStorage(_))
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::InsufficientStock {
                book_id,
                requested,
                available,
            } => DomainError::Order(OrderError::InsufficientStock {
                book_id,
                requested,
                available,
            }),
            StoreError::QuantityOverflow { book_id, max } => {
                DomainError::Cart(CartError::QuantityOverflow { book_id, max })
            }
            StoreError::InvalidRecord(_) | StoreError::Migration(_) => DomainError::Storage(err),
            // A status mismatch means another writer moved the order first.
            StoreError::StatusMismatch { .. }
            | StoreError::ConcurrencyConflict { .. }
            | StoreError::Unavailable(_) => DomainError::TransientStorage(err),
            StoreError::Database(_) if err.is_transient() => DomainError::TransientStorage(err),
            StoreError::Database(_) => DomainError::Storage(err),
        }
    }
}
