use common::{BookId, OrderStatus};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A stock decrement would take a book below zero.
    #[error("Insufficient stock for book {book_id}: requested {requested}, available {available}")]
    InsufficientStock {
        book_id: BookId,
        requested: u32,
        available: i64,
    },

    /// Adding to a cart line would push it past the largest storable quantity.
    #[error("Cart quantity for book {book_id} would exceed {max}")]
    QuantityOverflow { book_id: BookId, max: u32 },

    /// The rows a mutation was planned against changed before it committed.
    /// Safe to retry after re-reading.
    #[error("Concurrency conflict on {entity} {id}: {reason}")]
    ConcurrencyConflict {
        entity: &'static str,
        id: i64,
        reason: String,
    },

    /// The stored status of an order is not the one the transition expected.
    #[error("Order {order_id} is {actual}, expected {expected}")]
    StatusMismatch {
        order_id: i64,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// A record handed to the store violates a structural rule.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The backend could not complete the operation. Safe to retry.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn conflict(entity: &'static str, id: impl Into<i64>, reason: impl Into<String>) -> Self {
        StoreError::ConcurrencyConflict {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if repeating the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::ConcurrencyConflict { .. } | StoreError::Unavailable(_) => true,
            StoreError::Database(err) => is_transient_sqlx(err),
            _ => false,
        }
    }
}

/// Connection trouble, serialization failures and deadlocks can clear up on
/// retry. Constraint violations and malformed queries cannot.
fn is_transient_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => {
            matches!(db_err.code().as_deref(), Some("40001" | "40P01"))
        }
        _ => false,
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
