//! HTTP API server with observability for the bookstore.
//!
//! Provides REST endpoints for the catalog, carts, checkout, orders and
//! wishlists, with structured logging (tracing) and Prometheus metrics.
//! Caller identity comes from the `x-user-id` and `x-user-role` headers.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::CheckoutCoordinator;
use domain::{CartService, CatalogService, OrderService, WishlistService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/categories",
            get(routes::books::list_categories::<S>).post(routes::books::create_category::<S>),
        )
        .route(
            "/books",
            get(routes::books::list::<S>).post(routes::books::create::<S>),
        )
        .route("/books/mine", get(routes::books::mine::<S>))
        .route(
            "/books/{id}",
            get(routes::books::get::<S>)
                .put(routes::books::update::<S>)
                .delete(routes::books::delete::<S>),
        )
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart/count", get(routes::cart::count::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route("/cart/items/{id}", post(routes::cart::update_item::<S>))
        .route("/checkout", post(routes::cart::checkout::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/admin/orders", get(routes::orders::list_all::<S>))
        .route(
            "/admin/orders/{id}/status",
            post(routes::orders::update_status::<S>),
        )
        .route("/wishlist", get(routes::wishlist::list::<S>))
        .route("/wishlist/{book_id}", post(routes::wishlist::add::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state with every service sharing one store.
pub fn create_default_state<S: Store + Clone + 'static>(
    store: S,
    checkout_max_retries: u32,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        catalog: CatalogService::new(store.clone()),
        carts: CartService::new(store.clone()),
        orders: OrderService::new(store.clone()),
        wishlist: WishlistService::new(store.clone()),
        checkout: CheckoutCoordinator::new(store).with_max_retries(checkout_max_retries),
    })
}
