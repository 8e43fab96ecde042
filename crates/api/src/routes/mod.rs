//! HTTP route handlers and the shared application state.

pub mod books;
pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod wishlist;

use checkout::CheckoutCoordinator;
use domain::{CartService, CatalogService, OrderService, WishlistService};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub wishlist: WishlistService<S>,
    pub checkout: CheckoutCoordinator<S>,
}

/// Parses a numeric path id, answering 400 on garbage.
pub(crate) fn parse_id<T: From<i64>>(id: &str) -> Result<T, ApiError> {
    id.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .map(T::from)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid ID format: {id}")))
}
