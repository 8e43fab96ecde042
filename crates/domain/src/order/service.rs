//! Order service providing order queries and administrative status changes.

use common::{OrderId, OrderStatus};
use store::{Order, Store, StoreError};

use super::{OrderError, check_transition};
use crate::{Caller, DomainError};

/// Service for reading orders and moving them through their lifecycle.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns an order with its items. Owner or admin only.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, caller: Caller, order_id: OrderId) -> Result<Order, DomainError> {
        caller.user_id()?;
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id))?;
        caller.require_access(order.user_id)?;
        Ok(order)
    }

    /// The caller's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, caller: Caller) -> Result<Vec<Order>, DomainError> {
        let user_id = caller.user_id()?;
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    /// Every order, newest first. Admin only.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_orders(&self, caller: Caller) -> Result<Vec<Order>, DomainError> {
        caller.require_admin()?;
        Ok(self.store.list_orders().await?)
    }

    /// Moves an order to `to`. Admin only.
    ///
    /// Cancelling returns every line's quantity to stock in the same
    /// transaction as the status change.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        caller: Caller,
        order_id: OrderId,
        to: OrderStatus,
    ) -> Result<Order, DomainError> {
        caller.require_admin()?;

        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id))?;
        let from = order.status;
        check_transition(from, to)?;

        let restock = to == OrderStatus::Cancelled;
        let updated = self
            .store
            .transition_order_status(order_id, from, to, restock)
            .await
            .map_err(|e| match e {
                StoreError::StatusMismatch { actual, .. } if !actual.can_transition_to(to) => {
                    DomainError::Order(OrderError::InvalidStatusTransition { from: actual, to })
                }
                other => DomainError::from(other),
            })?;

        metrics::counter!(
            "order_status_changes_total",
            "from" => from.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
        tracing::info!(%order_id, %from, %to, restock, "order status changed");
        Ok(updated)
    }
}
