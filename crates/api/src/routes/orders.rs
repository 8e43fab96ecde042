//! Order history and administrative status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{OrderId, OrderStatus};
use serde::Deserialize;
use store::{Order, Store};

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::Identity;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// GET /orders — the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_orders(caller).await?))
}

/// GET /orders/{id} — one order with its frozen items (owner or admin).
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    Ok(Json(state.orders.get_order(caller, order_id).await?))
}

/// GET /admin/orders — every order (admin).
#[tracing::instrument(skip(state))]
pub async fn list_all<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_all_orders(caller).await?))
}

/// POST /admin/orders/{id}/status — move an order along its lifecycle (admin).
#[tracing::instrument(skip(state))]
pub async fn update_status<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: common::ParseOrderStatusError| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(
        state.orders.update_status(caller, order_id, status).await?,
    ))
}
