pub mod auth;
pub mod books;
pub mod health;

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::domain::DomainError;
use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Books
        .route("/books", get(books::home).post(books::add_book))
        .route("/books/new", get(books::new_book_form))
        .route("/books/:id", get(books::book_detail).put(books::edit_book))
        .route("/books/:id/edit", get(books::edit_book_form))
        .route(
            "/books/:id/delete",
            get(books::confirm_delete).post(books::delete_book),
        )
        .with_state(state)
}

/// Handler-layer error: either a business failure or a set of field-level
/// form errors.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    Form(BTreeMap<&'static str, String>),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Form(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            ApiError::Domain(err) => {
                let status = match &err {
                    DomainError::NotFound => StatusCode::NOT_FOUND,
                    DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    DomainError::Fetch(_) => StatusCode::BAD_GATEWAY,
                    DomainError::Database(_) | DomainError::Storage(_) => {
                        tracing::error!("unexpected error: {}", err);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };

                (status, Json(json!({ "error": err.to_string() }))).into_response()
            }
        }
    }
}
