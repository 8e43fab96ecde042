//! Checkout: turning a cart into an order.
//!
//! The coordinator reads the caller's cart, plans an order at current prices
//! and hands the plan to the store, which applies it in one transaction:
//! 1. Insert the order and its frozen line items
//! 2. Decrement stock for every line
//! 3. Empty the cart
//!
//! If the cart or a price moved between planning and committing, the store
//! reports a conflict and the coordinator plans again.

pub mod coordinator;
pub mod plan;

pub use coordinator::{CheckoutCoordinator, DEFAULT_MAX_RETRIES};
pub use plan::{CheckoutRequest, plan_order};
