//! HTTP handlers for the books module.

use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookshelf_http::error::{AppError, URL_NOT_FOUND_MESSAGE};
use serde_json::{json, Value};

use super::{catalog::BookCatalog, models::Book};

/// Id the create endpoint checks for before "inserting".
const NEW_BOOK_ID: i64 = 1;

/// Routes relative to the module mount point.
pub fn router(catalog: Arc<BookCatalog>) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/{id}", get(get_book))
        .with_state(catalog)
}

/// List every book in id order
pub async fn list_books(State(catalog): State<Arc<BookCatalog>>) -> Json<Vec<Book>> {
    Json(catalog.all().cloned().collect())
}

/// Fetch a single book by id
///
/// The `{id}` segment must be an optionally negative run of digits; anything
/// else does not match the route. Digits beyond the `i64` range name a book
/// that cannot exist.
pub async fn get_book(
    State(catalog): State<Arc<BookCatalog>>,
    raw: Result<Path<String>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(raw) = raw?;
    let id = parse_book_id(&raw)?;

    id.and_then(|id| catalog.get(id))
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            AppError::not_found(format!("Book with ID {} not found.", display_id(&raw)))
        })
}

/// `Ok(None)` for an integer too large for `i64`.
fn parse_book_id(raw: &str) -> Result<Option<i64>, AppError> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::not_found(URL_NOT_FOUND_MESSAGE));
    }
    Ok(raw.parse().ok())
}

/// Integer text without redundant leading zeros or a negative zero.
fn display_id(raw: &str) -> String {
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", raw),
    };
    match digits.trim_start_matches('0') {
        "" => "0".to_string(),
        trimmed => format!("{sign}{trimmed}"),
    }
}

/// Create endpoint. The request body is never read and nothing is stored;
/// with the seeded catalog this always fails with 400.
pub async fn create_book(
    State(catalog): State<Arc<BookCatalog>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if catalog.contains(NEW_BOOK_ID) {
        return Err(AppError::bad_request(format!(
            "A book with ID {NEW_BOOK_ID} already exists."
        )));
    }

    tracing::info!(id = NEW_BOOK_ID, "book create accepted without storage");
    Ok((StatusCode::CREATED, Json(json!({ "message": "Book created" }))))
}
