//! Building an order plan from cart lines.

use common::{CartId, Money, UserId};
use domain::{CartError, DomainError, OrderError};
use serde::{Deserialize, Serialize};
use store::{CartLine, NewOrder, PlannedLine};

/// What the caller supplies at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: String,
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutRequest {
    pub fn new(shipping_address: impl Into<String>, payment_method: impl Into<String>) -> Self {
        Self {
            shipping_address: shipping_address.into(),
            payment_method: payment_method.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Rejects blank address or payment method and trims every field.
    pub fn validate(self) -> Result<Self, OrderError> {
        let shipping_address = self.shipping_address.trim().to_string();
        if shipping_address.is_empty() {
            return Err(OrderError::InvalidInput(
                "shipping address must not be blank".to_string(),
            ));
        }

        let payment_method = self.payment_method.trim().to_string();
        if payment_method.is_empty() {
            return Err(OrderError::InvalidInput(
                "payment method must not be blank".to_string(),
            ));
        }

        Ok(Self {
            shipping_address,
            payment_method,
            notes: self
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        })
    }
}

/// Plans an order from the cart as it looks now.
///
/// Prices are the books' current prices. A line asking for more than the
/// book's stock fails the whole plan.
pub fn plan_order(
    user_id: UserId,
    cart_id: CartId,
    lines: Vec<CartLine>,
    request: &CheckoutRequest,
) -> Result<NewOrder, DomainError> {
    if lines.is_empty() {
        return Err(DomainError::EmptyCart);
    }

    let mut planned = Vec::with_capacity(lines.len());
    let mut total_amount = Money::zero();
    for line in lines {
        if i64::from(line.quantity) > line.stock {
            return Err(OrderError::InsufficientStock {
                book_id: line.book_id,
                requested: line.quantity,
                available: line.stock,
            }
            .into());
        }

        let planned_line = PlannedLine {
            item_id: line.item_id,
            book_id: line.book_id,
            title: line.title,
            quantity: line.quantity,
            unit_price: line.unit_price,
        };
        total_amount = planned_line
            .line_total()
            .and_then(|line_total| total_amount.checked_add(line_total))
            .ok_or(CartError::AmountOverflow {
                book_id: planned_line.book_id,
            })?;
        planned.push(planned_line);
    }

    Ok(NewOrder {
        user_id,
        cart_id,
        shipping_address: request.shipping_address.clone(),
        payment_method: request.payment_method.clone(),
        notes: request.notes.clone(),
        lines: planned,
        total_amount,
    })
}
