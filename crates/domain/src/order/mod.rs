//! Order rules: the status guard and order queries.

mod service;

pub use service::OrderService;

use common::{BookId, OrderStatus};
use thiserror::Error;

/// Errors raised by order rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// A cart line asks for more units than the book has.
    #[error("Insufficient stock for book {book_id}: requested {requested}, available {available}")]
    InsufficientStock {
        book_id: BookId,
        requested: u32,
        available: i64,
    },

    /// The requested status change is not allowed.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Checks a status change against the order state machine.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(OrderError::InvalidStatusTransition { from, to })
    }
}
