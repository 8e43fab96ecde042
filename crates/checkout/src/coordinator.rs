//! Checkout coordinator with optimistic retries.

use std::time::Instant;

use domain::{Caller, DomainError};
use store::{Order, Store, StoreError};

use crate::plan::{CheckoutRequest, plan_order};

/// Retries after the first attempt when the cart moves under a checkout.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Orchestrates checkout: read the cart, plan the order, commit atomically.
///
/// The store re-verifies the plan inside its transaction. On a concurrency
/// conflict the whole procedure runs again, up to `max_retries` more times.
pub struct CheckoutCoordinator<S: Store> {
    store: S,
    max_retries: u32,
}

impl<S: Store> CheckoutCoordinator<S> {
    /// Creates a coordinator with the default retry budget.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Turns the caller's cart into a pending order.
    ///
    /// Either the order exists with its items, stock is decremented and the
    /// cart is empty, or nothing changed.
    #[tracing::instrument(skip(self, request))]
    pub async fn checkout(
        &self,
        caller: Caller,
        request: CheckoutRequest,
    ) -> Result<Order, DomainError> {
        metrics::counter!("checkout_total").increment(1);
        let start = Instant::now();

        let result = self.run(caller, request).await;

        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                tracing::info!(
                    order_id = %order.id,
                    user_id = %order.user_id,
                    total_cents = order.total_amount.cents(),
                    items = order.items.len(),
                    "checkout completed"
                );
            }
            Err(e) => {
                metrics::counter!("checkout_failed_total").increment(1);
                tracing::warn!(error = %e, retryable = e.is_retryable(), "checkout failed");
            }
        }

        result
    }

    async fn run(&self, caller: Caller, request: CheckoutRequest) -> Result<Order, DomainError> {
        let user_id = caller.user_id()?;
        let request = request.validate()?;

        let mut attempt: u32 = 0;
        loop {
            let Some(cart) = self.store.find_cart(user_id).await? else {
                return Err(DomainError::EmptyCart);
            };
            let lines = self.store.cart_lines(cart.id).await?;
            let plan = plan_order(user_id, cart.id, lines, &request)?;

            match self.store.place_order(plan).await {
                Ok(order) => return Ok(order),
                Err(e @ StoreError::ConcurrencyConflict { .. }) => {
                    metrics::counter!("checkout_conflicts_total").increment(1);
                    if attempt >= self.max_retries {
                        return Err(DomainError::TransientStorage(e));
                    }
                    attempt += 1;
                    tracing::warn!(%user_id, attempt, error = %e, "checkout conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
