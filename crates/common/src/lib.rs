//! Shared types for the bookstore workspace.
//!
//! Identifiers, money and the order status state machine are used by every
//! layer (storage, domain, transport), so they live here.

pub mod ids;
pub mod money;
pub mod status;

pub use ids::{BookId, CartId, CartItemId, CategoryId, OrderId, UserId, WishlistEntryId};
pub use money::Money;
pub use status::{OrderStatus, ParseOrderStatusError};
