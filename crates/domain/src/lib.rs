//! Domain layer for the bookstore.
//!
//! This crate holds the business rules that sit on top of the store:
//! - Caller identity and access checks
//! - Cart quantities and totals
//! - Catalog validation and ownership
//! - The order status guard with restock on cancel
//! - Wishlists

pub mod caller;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;
pub mod wishlist;

pub use caller::Caller;
pub use cart::{CartError, CartItemUpdate, CartLineView, CartService, CartView, validate_quantity};
pub use catalog::{BookInput, CatalogError, CatalogService};
pub use error::DomainError;
pub use order::{OrderError, OrderService, check_transition};
pub use wishlist::WishlistService;
