//! Cart and checkout endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::CheckoutRequest;
use common::{BookId, CartItemId, Money, OrderId, OrderStatus};
use domain::{CartItemUpdate, CartView};
use serde::{Deserialize, Serialize};
use store::{CartItemAction, Store};

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::Identity;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub book_id: BookId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub action: CartItemAction,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartItemResponse {
    pub item_id: CartItemId,
    pub book_id: BookId,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct CartCountResponse {
    pub count: usize,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total_amount: Money,
}

// -- Handlers --

/// GET /cart — the caller's lines at current prices with the total.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts.get_totals(caller).await?))
}

/// GET /cart/count — number of distinct lines, zero when anonymous.
#[tracing::instrument(skip(state))]
pub async fn count<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
) -> Result<Json<CartCountResponse>, ApiError> {
    let count = state.carts.item_count(caller).await?;
    Ok(Json(CartCountResponse { count }))
}

/// POST /cart/items — add a book to the caller's cart.
#[tracing::instrument(skip(state))]
pub async fn add_item<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItemResponse>), ApiError> {
    let item = state
        .carts
        .add_item(caller, req.book_id, req.quantity)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CartItemResponse {
            item_id: item.id,
            book_id: item.book_id,
            quantity: item.quantity,
        }),
    ))
}

/// POST /cart/items/{id} — increase, decrease or remove a line.
#[tracing::instrument(skip(state))]
pub async fn update_item<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartItemUpdate>, ApiError> {
    let item_id: CartItemId = parse_id(&id)?;
    Ok(Json(
        state.carts.update_item(caller, item_id, req.action).await?,
    ))
}

/// POST /checkout — turn the caller's cart into a pending order.
#[tracing::instrument(skip(state, req))]
pub async fn checkout<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let order = state.checkout.checkout(caller, req).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_id: order.id,
            status: order.status,
            total_amount: order.total_amount,
        }),
    ))
}
