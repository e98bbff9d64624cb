//! HTTP routes for the books module.
//!
//! `/records/{key}` serves GET by id plus PUT and DELETE by ISBN, since one
//! path shape cannot carry two differently named parameters.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use shelf_http::AppError;

use super::handler::BookHandler;
use super::models::{Book, BookPayload, DeletedCount, InsertedId, UpdatedCount};

type Books = State<Arc<BookHandler>>;

/// Build the books router around a shared handler.
pub fn router(handler: Arc<BookHandler>) -> Router {
    Router::new()
        .route("/records", get(list_records))
        .route(
            "/records/{key}",
            get(get_record)
                .put(update_record_by_isbn)
                .delete(delete_record_by_isbn),
        )
        .route("/record", post(create_record))
        .route(
            "/record/{id}",
            put(update_record_by_id).delete(delete_record_by_id),
        )
        .with_state(handler)
}

#[tracing::instrument(skip(books))]
async fn list_records(State(books): Books) -> Result<Json<Vec<Book>>, AppError> {
    books.list().await.map(Json)
}

#[tracing::instrument(skip(books))]
async fn get_record(State(books): Books, Path(id): Path<String>) -> Result<Json<Book>, AppError> {
    books.get_one(&id).await.map(Json)
}

#[tracing::instrument(skip_all)]
async fn create_record(
    State(books): Books,
    body: Result<Json<BookPayload>, JsonRejection>,
) -> Result<Json<InsertedId>, AppError> {
    let Json(payload) = body.map_err(rejected_body)?;
    books.create(payload).await.map(Json)
}

/// The body `id` selects the row; the path segment is only traced. A request
/// without a JSON body is treated as an empty payload, so it fails on the
/// missing id.
#[tracing::instrument(skip(books, body))]
async fn delete_record_by_id(
    State(books): Books,
    Path(id): Path<String>,
    body: Result<Json<BookPayload>, JsonRejection>,
) -> Result<Json<DeletedCount>, AppError> {
    let payload = match body {
        Ok(Json(payload)) => payload,
        Err(JsonRejection::MissingJsonContentType(_)) => BookPayload::default(),
        Err(rejection) => return Err(rejected_body(rejection)),
    };
    books.delete_by_id(payload).await.map(Json)
}

#[tracing::instrument(skip(books))]
async fn delete_record_by_isbn(
    State(books): Books,
    Path(isbn): Path<String>,
) -> Result<Json<DeletedCount>, AppError> {
    books.delete_by_isbn(&isbn).await.map(Json)
}

/// The body `id` selects the row; the path segment is only traced.
#[tracing::instrument(skip(books, body))]
async fn update_record_by_id(
    State(books): Books,
    Path(id): Path<String>,
    body: Result<Json<BookPayload>, JsonRejection>,
) -> Result<Json<UpdatedCount>, AppError> {
    let Json(payload) = body.map_err(rejected_body)?;
    books.update_by_id(payload).await.map(Json)
}

#[tracing::instrument(skip(books, body))]
async fn update_record_by_isbn(
    State(books): Books,
    Path(isbn): Path<String>,
    body: Result<Json<BookPayload>, JsonRejection>,
) -> Result<Json<UpdatedCount>, AppError> {
    let Json(payload) = body.map_err(rejected_body)?;
    books.update_by_isbn(&isbn, payload).await.map(Json)
}

fn rejected_body(rejection: JsonRejection) -> AppError {
    AppError::validation(format!("invalid request body: {}", rejection.body_text()))
}
