//! Catalog endpoints: categories and books.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{BookId, CategoryId};
use domain::BookInput;
use serde::{Deserialize, Serialize};
use store::{Book, BookQuery, Category, Store};

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::Identity;

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct BookListParams {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl BookListParams {
    fn into_query(self) -> Result<BookQuery, ApiError> {
        let mut query = BookQuery::new();
        if let Some(id) = self.category_id {
            query = query.category(CategoryId::new(id));
        }
        if let Some(term) = self.search {
            query = query.search(term);
        }
        if let Some(limit) = self.limit {
            query = query.limit(within_i64("limit", limit)?);
        }
        if let Some(offset) = self.offset {
            query = query.offset(within_i64("offset", offset)?);
        }
        Ok(query)
    }
}

fn within_i64(name: &str, value: usize) -> Result<usize, ApiError> {
    i64::try_from(value)
        .map(|_| value)
        .map_err(|_| ApiError::BadRequest(format!("{name} out of range: {value}")))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookDeletedResponse {
    pub book_id: BookId,
    pub cart_items_removed: u64,
    pub wishlist_entries_removed: u64,
}

// -- Handlers --

/// GET /categories — list all categories by name.
#[tracing::instrument(skip(state))]
pub async fn list_categories<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.catalog.list_categories().await?))
}

/// POST /categories — create a category (admin).
#[tracing::instrument(skip(state, req))]
pub async fn create_category<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state
        .catalog
        .create_category(caller, &req.name, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /books — list books, optionally filtered by category and search term.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<BookListParams>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.catalog.list_books(params.into_query()?).await?))
}

/// GET /books/mine — books listed by the caller.
#[tracing::instrument(skip(state))]
pub async fn mine<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.catalog.list_my_books(caller).await?))
}

/// GET /books/{id} — a single book.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    let book_id: BookId = parse_id(&id)?;
    Ok(Json(state.catalog.get_book(book_id).await?))
}

/// POST /books — list a new book owned by the caller.
#[tracing::instrument(skip(state, input))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Json(input): Json<BookInput>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = state.catalog.create_book(caller, input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /books/{id} — replace a book's fields (owner or admin).
#[tracing::instrument(skip(state, input))]
pub async fn update<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(id): Path<String>,
    Json(input): Json<BookInput>,
) -> Result<Json<Book>, ApiError> {
    let book_id: BookId = parse_id(&id)?;
    Ok(Json(state.catalog.update_book(caller, book_id, input).await?))
}

/// DELETE /books/{id} — delete a book with its cart and wishlist rows (owner or admin).
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(id): Path<String>,
) -> Result<Json<BookDeletedResponse>, ApiError> {
    let book_id: BookId = parse_id(&id)?;
    let removal = state.catalog.delete_book(caller, book_id).await?;

    Ok(Json(BookDeletedResponse {
        book_id,
        cart_items_removed: removal.cart_items_removed,
        wishlist_entries_removed: removal.wishlist_entries_removed,
    }))
}
