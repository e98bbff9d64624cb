//! Record handler for books: validate, run the storage query, shape the reply.
//!
//! Check-then-act sequences (delete by id, delete by ISBN, update by ISBN)
//! are not transactional. A concurrent delete between the existence check
//! and the mutation surfaces as a success reporting zero affected rows.

use std::sync::Arc;

use shelf_http::AppError;

use super::models::{
    parse_id, Book, BookPayload, DeletedCount, InsertedId, UpdatedCount, MISSING_ISBN,
};
use super::repository::BookRepository;

const NOT_FOUND_BY_ID: &str = "no book found with the given id";
const NOT_FOUND_BY_ISBN: &str = "no book found with the given isbn";

/// Owns the storage handle; constructed once at startup and shared by the router.
pub struct BookHandler {
    repo: Arc<dyn BookRepository>,
}

impl BookHandler {
    pub fn new(repo: Arc<dyn BookRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Book>, AppError> {
        self.repo
            .list()
            .await
            .map_err(storage_error("list books", "failed to fetch books"))
    }

    pub async fn get_one(&self, raw_id: &str) -> Result<Book, AppError> {
        let id = parse_id(raw_id)?;

        self.repo
            .find_by_id(id)
            .await
            .map_err(storage_error("get book", "failed to fetch the book"))?
            .ok_or_else(|| AppError::not_found(NOT_FOUND_BY_ID))
    }

    pub async fn create(&self, payload: BookPayload) -> Result<InsertedId, AppError> {
        let book = payload.into_new_book()?;

        let inserted_id = self
            .repo
            .insert(&book)
            .await
            .map_err(storage_error("create book", "failed to add the book"))?;

        tracing::info!(id = inserted_id, isbn = %book.isbn, "book created");
        Ok(InsertedId { inserted_id })
    }

    pub async fn delete_by_id(&self, payload: BookPayload) -> Result<DeletedCount, AppError> {
        let id = payload.require_id()?;
        let on_error = || storage_error("delete book", "failed to delete the book");

        if !self.repo.exists_by_id(id).await.map_err(on_error())? {
            return Err(AppError::not_found(NOT_FOUND_BY_ID));
        }

        let deleted_count = self.repo.delete_by_id(id).await.map_err(on_error())?;

        tracing::info!(id, deleted_count, "book deleted");
        Ok(DeletedCount { deleted_count })
    }

    pub async fn delete_by_isbn(&self, isbn: &str) -> Result<DeletedCount, AppError> {
        let isbn = require_isbn(isbn)?;
        let on_error = || storage_error("delete book by isbn", "failed to delete the book");

        if !self.repo.exists_by_isbn(isbn).await.map_err(on_error())? {
            return Err(AppError::not_found(NOT_FOUND_BY_ISBN));
        }

        let deleted_count = self.repo.delete_by_isbn(isbn).await.map_err(on_error())?;

        tracing::info!(isbn, deleted_count, "books deleted by isbn");
        Ok(DeletedCount { deleted_count })
    }

    /// No existence check: an unknown id reports zero updated rows.
    pub async fn update_by_id(&self, payload: BookPayload) -> Result<UpdatedCount, AppError> {
        let (id, book) = payload.into_replacement()?;

        let updated_count = self
            .repo
            .update_by_id(id, &book)
            .await
            .map_err(storage_error("update book", "failed to update the book"))?;

        tracing::info!(id, updated_count, "book updated");
        Ok(UpdatedCount { updated_count })
    }

    pub async fn update_by_isbn(
        &self,
        isbn: &str,
        payload: BookPayload,
    ) -> Result<UpdatedCount, AppError> {
        let isbn = require_isbn(isbn)?;
        let details = payload.into_details()?;
        let on_error = || storage_error("update book by isbn", "failed to update the book");

        if !self.repo.exists_by_isbn(isbn).await.map_err(on_error())? {
            return Err(AppError::not_found(NOT_FOUND_BY_ISBN));
        }

        // Resending the stored values reports zero changed rows, not 404.
        let updated_count = self
            .repo
            .update_by_isbn(isbn, &details)
            .await
            .map_err(on_error())?;

        tracing::info!(isbn, updated_count, "books updated by isbn");
        Ok(UpdatedCount { updated_count })
    }
}

fn require_isbn(raw: &str) -> Result<&str, AppError> {
    let isbn = raw.trim();
    if isbn.is_empty() {
        return Err(AppError::validation(MISSING_ISBN));
    }
    Ok(isbn)
}

/// Tags a storage failure with the operation name; the client sees `message` only.
fn storage_error(
    operation: &'static str,
    message: &'static str,
) -> impl FnOnce(anyhow::Error) -> AppError {
    move |source| AppError::internal(operation, message, source)
}
