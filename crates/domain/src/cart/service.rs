//! Cart service.

use common::{BookId, CartItemId, Money};
use store::{CartItem, CartItemAction, Store};

use super::{CartItemUpdate, CartView, validate_quantity};
use crate::{Caller, DomainError};

/// Service for managing the caller's cart.
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds `quantity` units of a book, creating the cart on first use.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        caller: Caller,
        book_id: BookId,
        quantity: i64,
    ) -> Result<CartItem, DomainError> {
        let user_id = caller.user_id()?;
        let quantity = validate_quantity(quantity)?;

        if self.store.find_book(book_id).await?.is_none() {
            return Err(DomainError::not_found("book", book_id));
        }

        let cart = self.store.get_or_create_cart(user_id).await?;
        let item = self
            .store
            .add_cart_quantity(cart.id, book_id, quantity)
            .await?;

        metrics::counter!("cart_items_added_total").increment(u64::from(quantity));
        tracing::info!(%user_id, %book_id, quantity = item.quantity, "cart item added");
        Ok(item)
    }

    /// Applies an increase, decrease or remove action to one of the caller's items.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        caller: Caller,
        item_id: CartItemId,
        action: CartItemAction,
    ) -> Result<CartItemUpdate, DomainError> {
        let user_id = caller.user_id()?;

        let item = self
            .store
            .find_cart_item(item_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart item", item_id))?;
        let cart = self.store.find_cart(user_id).await?;
        if cart.as_ref().map(|c| c.id) != Some(item.cart_id) {
            return Err(DomainError::AccessDenied);
        }

        let updated = self.store.apply_cart_action(item_id, action).await?;
        let lines = self.store.cart_lines(item.cart_id).await?;
        let view = CartView::from_lines(item.cart_id, lines)?;

        let (quantity, line_total) = view
            .lines
            .iter()
            .find(|l| l.item_id == item_id)
            .map(|l| (l.quantity, l.line_total))
            .unwrap_or((0, Money::zero()));

        metrics::counter!("cart_items_updated_total").increment(1);
        tracing::info!(
            %user_id,
            %item_id,
            ?action,
            removed = updated.is_none(),
            quantity,
            "cart item updated"
        );

        Ok(CartItemUpdate {
            item_id,
            quantity,
            line_total,
            cart: view,
        })
    }

    /// Returns the caller's lines at current prices. Does not create a cart.
    #[tracing::instrument(skip(self))]
    pub async fn get_totals(&self, caller: Caller) -> Result<CartView, DomainError> {
        let user_id = caller.user_id()?;

        match self.store.find_cart(user_id).await? {
            Some(cart) => Ok(CartView::from_lines(
                cart.id,
                self.store.cart_lines(cart.id).await?,
            )?),
            None => Ok(CartView::empty()),
        }
    }

    /// Number of distinct lines in the caller's cart. Zero for anonymous callers.
    #[tracing::instrument(skip(self))]
    pub async fn item_count(&self, caller: Caller) -> Result<usize, DomainError> {
        let Some(user_id) = caller.id() else {
            return Ok(0);
        };

        match self.store.find_cart(user_id).await? {
            Some(cart) => Ok(self.store.count_cart_items(cart.id).await?),
            None => Ok(0),
        }
    }
}
