//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CartError, CatalogError, DomainError, OrderError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::AccessDenied => StatusCode::FORBIDDEN,
        DomainError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        DomainError::EmptyCart => StatusCode::BAD_REQUEST,
        DomainError::Cart(CartError::InvalidQuantity { .. }) => StatusCode::BAD_REQUEST,
        DomainError::Cart(CartError::QuantityOverflow { .. } | CartError::AmountOverflow { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DomainError::Order(order_err) => match order_err {
            OrderError::InsufficientStock { .. } | OrderError::InvalidStatusTransition { .. } => {
                StatusCode::CONFLICT
            }
            OrderError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        },
        DomainError::Catalog(
            CatalogError::InvalidPrice { .. }
            | CatalogError::InvalidStock { .. }
            | CatalogError::InvalidInput(_),
        ) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::TransientStorage(_) => {
            tracing::warn!(error = %err, "transient storage failure");
            StatusCode::SERVICE_UNAVAILABLE
        }
        DomainError::Storage(_) => {
            tracing::error!(error = %err, "storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BookId, OrderStatus};

    fn status_of(err: DomainError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn access_errors_map_to_auth_statuses() {
        assert_eq!(status_of(DomainError::NotAuthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(DomainError::AccessDenied), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(DomainError::not_found("book", BookId::new(1))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn rule_violations_map_to_client_errors() {
        assert_eq!(status_of(DomainError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(DomainError::Order(OrderError::InvalidStatusTransition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Paid,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::Catalog(CatalogError::InvalidStock { stock: -1 })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(DomainError::Cart(CartError::QuantityOverflow {
                book_id: BookId::new(1),
                max: u32::MAX,
            })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(DomainError::Cart(CartError::AmountOverflow {
                book_id: BookId::new(1),
            })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn transient_storage_is_unavailable() {
        let err = DomainError::TransientStorage(store::StoreError::Unavailable("down".to_string()));
        assert_eq!(status_of(err), StatusCode::SERVICE_UNAVAILABLE);
    }
}
