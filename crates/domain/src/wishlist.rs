//! Per-user wishlists.

use common::BookId;
use store::{Store, WishlistInsert, WishlistLine};

use crate::{Caller, DomainError};

pub struct WishlistService<S: Store> {
    store: S,
}

impl<S: Store> WishlistService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a book to the caller's wishlist. Adding it twice is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn add(&self, caller: Caller, book_id: BookId) -> Result<WishlistInsert, DomainError> {
        let user_id = caller.user_id()?;

        if self.store.find_book(book_id).await?.is_none() {
            return Err(DomainError::not_found("book", book_id));
        }

        let outcome = self.store.add_wishlist_entry(user_id, book_id).await?;
        tracing::info!(%user_id, %book_id, ?outcome, "wishlist updated");
        Ok(outcome)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, caller: Caller) -> Result<Vec<WishlistLine>, DomainError> {
        let user_id = caller.user_id()?;
        Ok(self.store.wishlist_lines(user_id).await?)
    }
}
