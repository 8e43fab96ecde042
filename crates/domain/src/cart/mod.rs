//! Cart rules: quantities, totals and the view returned to callers.

mod service;

pub use service::CartService;

use common::{BookId, CartId, CartItemId, Money};
use serde::Serialize;
use store::CartLine;
use thiserror::Error;

/// Errors raised by cart rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: i64 },

    /// The line for this book already holds the largest storable quantity.
    #[error("Quantity for book {book_id} cannot exceed {max}")]
    QuantityOverflow { book_id: BookId, max: u32 },

    /// A line total or the cart total does not fit in the money range.
    #[error("Cart amount out of range for book {book_id}")]
    AmountOverflow { book_id: BookId },
}

/// Checks a requested add-to-cart quantity.
pub fn validate_quantity(quantity: i64) -> Result<u32, CartError> {
    match u32::try_from(quantity) {
        Ok(q) if q >= 1 => Ok(q),
        _ => Err(CartError::InvalidQuantity { quantity }),
    }
}

/// A cart line priced at the book's current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub item_id: CartItemId,
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

impl TryFrom<CartLine> for CartLineView {
    type Error = CartError;

    fn try_from(line: CartLine) -> Result<Self, Self::Error> {
        let line_total = line.line_total().ok_or(CartError::AmountOverflow {
            book_id: line.book_id,
        })?;
        Ok(Self {
            item_id: line.item_id,
            book_id: line.book_id,
            title: line.title,
            author: line.author,
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total,
        })
    }
}

/// The caller's cart with its total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// `None` until the first item is added.
    pub cart_id: Option<CartId>,
    pub lines: Vec<CartLineView>,
    pub total: Money,
}

impl CartView {
    pub fn empty() -> Self {
        Self {
            cart_id: None,
            lines: Vec::new(),
            total: Money::zero(),
        }
    }

    /// Prices the lines and sums them.
    pub fn from_lines(cart_id: CartId, lines: Vec<CartLine>) -> Result<Self, CartError> {
        let lines = lines
            .into_iter()
            .map(CartLineView::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut total = Money::zero();
        for line in &lines {
            total = total
                .checked_add(line.line_total)
                .ok_or(CartError::AmountOverflow {
                    book_id: line.book_id,
                })?;
        }

        Ok(Self {
            cart_id: Some(cart_id),
            lines,
            total,
        })
    }

    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Result of applying an action to a cart item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemUpdate {
    pub item_id: CartItemId,
    /// Zero once the line has been removed.
    pub quantity: u32,
    pub line_total: Money,
    pub cart: CartView,
}
