//! Wishlist endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{BookId, WishlistEntryId};
use serde::Serialize;
use store::{Store, WishlistInsert, WishlistLine};

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::Identity;

#[derive(Serialize)]
pub struct WishlistAddResponse {
    pub book_id: BookId,
    pub added: bool,
    pub entry_id: Option<WishlistEntryId>,
}

/// GET /wishlist — the caller's wishlist with book details.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
) -> Result<Json<Vec<WishlistLine>>, ApiError> {
    Ok(Json(state.wishlist.list(caller).await?))
}

/// POST /wishlist/{book_id} — add a book; 201 when new, 200 when already there.
#[tracing::instrument(skip(state))]
pub async fn add<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(book_id): Path<String>,
) -> Result<(StatusCode, Json<WishlistAddResponse>), ApiError> {
    let book_id: BookId = parse_id(&book_id)?;

    let response = match state.wishlist.add(caller, book_id).await? {
        WishlistInsert::Added(entry_id) => (
            StatusCode::CREATED,
            WishlistAddResponse {
                book_id,
                added: true,
                entry_id: Some(entry_id),
            },
        ),
        WishlistInsert::AlreadyPresent => (
            StatusCode::OK,
            WishlistAddResponse {
                book_id,
                added: false,
                entry_id: None,
            },
        ),
    };

    Ok((response.0, Json(response.1)))
}
