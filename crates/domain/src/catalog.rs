//! Catalog rules and service: books and categories.

use common::{BookId, CategoryId, Money};
use serde::{Deserialize, Serialize};
use store::{
    Book, BookQuery, BookRemoval, BookUpdate, Category, NewBook, NewCategory, Store,
};
use thiserror::Error;

use crate::{Caller, DomainError};

/// Errors raised by catalog validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Invalid price: {cents} cents (must be greater than 0)")]
    InvalidPrice { cents: i64 },

    #[error("Invalid stock: {stock} (must not be negative)")]
    InvalidStock { stock: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Editable fields of a book, as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub category_id: CategoryId,
}

impl BookInput {
    /// Checks the field rules and returns a trimmed copy.
    pub fn validate(self) -> Result<Self, CatalogError> {
        let title = required("title", &self.title)?;
        let author = required("author", &self.author)?;
        if !self.price.is_positive() {
            return Err(CatalogError::InvalidPrice {
                cents: self.price.cents(),
            });
        }
        if self.stock < 0 {
            return Err(CatalogError::InvalidStock { stock: self.stock });
        }

        Ok(Self {
            title,
            author,
            description: optional(self.description),
            ..self
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, CatalogError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidInput(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Service for browsing and maintaining the catalog.
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists books matching an optional category and search term.
    #[tracing::instrument(skip(self))]
    pub async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>, DomainError> {
        Ok(self.store.list_books(query).await?)
    }

    /// Lists the books the caller put up for sale.
    #[tracing::instrument(skip(self))]
    pub async fn list_my_books(&self, caller: Caller) -> Result<Vec<Book>, DomainError> {
        let owner_id = caller.user_id()?;
        Ok(self.store.list_books(BookQuery::new().owner(owner_id)).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_book(&self, book_id: BookId) -> Result<Book, DomainError> {
        self.store
            .find_book(book_id)
            .await?
            .ok_or_else(|| DomainError::not_found("book", book_id))
    }

    /// Lists a book owned by the caller.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_book(&self, caller: Caller, input: BookInput) -> Result<Book, DomainError> {
        let owner_id = caller.user_id()?;
        let input = input.validate()?;

        let book = self
            .store
            .insert_book(NewBook {
                title: input.title,
                author: input.author,
                description: input.description,
                price: input.price,
                stock: input.stock,
                category_id: input.category_id,
                owner_id,
            })
            .await?;

        tracing::info!(book_id = %book.id, %owner_id, "book created");
        Ok(book)
    }

    /// Replaces a book's fields. Owner or admin only.
    #[tracing::instrument(skip(self, input))]
    pub async fn update_book(
        &self,
        caller: Caller,
        book_id: BookId,
        input: BookInput,
    ) -> Result<Book, DomainError> {
        let existing = self.get_book(book_id).await?;
        caller.require_access(existing.owner_id)?;
        let input = input.validate()?;

        let book = self
            .store
            .update_book(
                book_id,
                BookUpdate {
                    title: input.title,
                    author: input.author,
                    description: input.description,
                    price: input.price,
                    stock: input.stock,
                    category_id: input.category_id,
                },
            )
            .await?;

        tracing::info!(%book_id, "book updated");
        Ok(book)
    }

    /// Deletes a book with its cart and wishlist rows. Order history is kept.
    #[tracing::instrument(skip(self))]
    pub async fn delete_book(
        &self,
        caller: Caller,
        book_id: BookId,
    ) -> Result<BookRemoval, DomainError> {
        let existing = self.get_book(book_id).await?;
        caller.require_access(existing.owner_id)?;

        let removal = self.store.delete_book(book_id).await?;
        tracing::info!(
            %book_id,
            cart_items_removed = removal.cart_items_removed,
            wishlist_entries_removed = removal.wishlist_entries_removed,
            "book deleted"
        );
        Ok(removal)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        Ok(self.store.list_categories().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_category(&self, category_id: CategoryId) -> Result<Category, DomainError> {
        self.store
            .find_category(category_id)
            .await?
            .ok_or_else(|| DomainError::not_found("category", category_id))
    }

    /// Creates a category. Admin only.
    #[tracing::instrument(skip(self))]
    pub async fn create_category(
        &self,
        caller: Caller,
        name: &str,
        description: Option<String>,
    ) -> Result<Category, DomainError> {
        caller.require_admin()?;
        let name = required("name", name)?;

        let category = self
            .store
            .insert_category(NewCategory {
                name,
                description: optional(description),
            })
            .await?;

        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> BookInput {
        BookInput {
            title: "  Dune ".to_string(),
            author: "Frank Herbert".to_string(),
            description: Some("   ".to_string()),
            price: Money::from_cents(1000),
            stock: 3,
            category_id: CategoryId::new(1),
        }
    }

    #[test]
    fn validate_trims_fields() {
        let valid = input().validate().unwrap();
        assert_eq!(valid.title, "Dune");
        assert_eq!(valid.description, None);
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = BookInput {
            title: " ".to_string(),
            ..input()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[test]
    fn price_must_be_positive() {
        let err = BookInput {
            price: Money::zero(),
            ..input()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, CatalogError::InvalidPrice { cents: 0 });
    }

    #[test]
    fn stock_must_not_be_negative() {
        let err = BookInput {
            stock: -1,
            ..input()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, CatalogError::InvalidStock { stock: -1 });
    }
}
