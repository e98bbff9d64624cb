//! Storage access for book records.
//!
//! Every statement binds its values positionally; nothing from a request is
//! ever spliced into SQL text.

use anyhow::Context;
use async_trait::async_trait;
use shelf_kernel::TableSchema;
use sqlx::SqlitePool;

use super::models::{Book, BookDetails, NewBook};

pub const BOOKS_TABLE: TableSchema = TableSchema {
    name: "books",
    ddl: r#"
        CREATE TABLE IF NOT EXISTS books (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            name             TEXT    NOT NULL CHECK (name <> ''),
            author           TEXT    NOT NULL CHECK (author <> ''),
            category         TEXT    NOT NULL CHECK (category <> ''),
            publication_year INTEGER NOT NULL,
            isbn             TEXT    NOT NULL CHECK (isbn <> '')
        );
        CREATE INDEX IF NOT EXISTS idx_books_isbn ON books (isbn);
    "#,
};

const LIST_BOOKS: &str =
    "SELECT id, name, author, category, publication_year, isbn FROM books ORDER BY id";
const FIND_BOOK: &str =
    "SELECT id, name, author, category, publication_year, isbn FROM books WHERE id = ?";

/// Persistence operations the record handler needs.
///
/// Mutations return the row count reported by the backend.
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Book>>;

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Book>>;

    async fn exists_by_id(&self, id: i64) -> anyhow::Result<bool>;

    async fn exists_by_isbn(&self, isbn: &str) -> anyhow::Result<bool>;

    /// Returns the storage-assigned id.
    async fn insert(&self, book: &NewBook) -> anyhow::Result<i64>;

    /// Counts only rows whose values actually changed.
    async fn update_by_id(&self, id: i64, book: &NewBook) -> anyhow::Result<u64>;

    /// Counts only rows carrying `isbn` whose values actually changed.
    async fn update_by_isbn(&self, isbn: &str, details: &BookDetails) -> anyhow::Result<u64>;

    async fn delete_by_id(&self, id: i64) -> anyhow::Result<u64>;

    /// Removes every row carrying `isbn`.
    async fn delete_by_isbn(&self, isbn: &str) -> anyhow::Result<u64>;
}

/// `BookRepository` over a SQLite pool.
#[derive(Clone)]
pub struct SqlBookRepository {
    pool: SqlitePool,
}

impl SqlBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for SqlBookRepository {
    async fn list(&self) -> anyhow::Result<Vec<Book>> {
        sqlx::query_as::<_, Book>(LIST_BOOKS)
            .fetch_all(&self.pool)
            .await
            .context("select all books")
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Book>> {
        sqlx::query_as::<_, Book>(FIND_BOOK)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("select book {id}"))
    }

    async fn exists_by_id(&self, id: i64) -> anyhow::Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("check book {id} exists"))?;
        Ok(row.is_some())
    }

    async fn exists_by_isbn(&self, isbn: &str) -> anyhow::Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM books WHERE isbn = ? LIMIT 1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await
            .context("check isbn exists")?;
        Ok(row.is_some())
    }

    async fn insert(&self, book: &NewBook) -> anyhow::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO books (name, author, category, publication_year, isbn) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&book.name)
        .bind(&book.author)
        .bind(&book.category)
        .bind(book.publication_year)
        .bind(&book.isbn)
        .execute(&self.pool)
        .await
        .context("insert book")?;

        Ok(result.last_insert_rowid())
    }

    async fn update_by_id(&self, id: i64, book: &NewBook) -> anyhow::Result<u64> {
        // The guard skips rows already holding these values so the count
        // reports changed rows, not matched rows.
        let result = sqlx::query(
            "UPDATE books SET name = ?1, author = ?2, category = ?3, publication_year = ?4, isbn = ?5 \
             WHERE id = ?6 \
             AND (name <> ?1 OR author <> ?2 OR category <> ?3 OR publication_year <> ?4 OR isbn <> ?5)",
        )
        .bind(&book.name)
        .bind(&book.author)
        .bind(&book.category)
        .bind(book.publication_year)
        .bind(&book.isbn)
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("update book {id}"))?;

        Ok(result.rows_affected())
    }

    async fn update_by_isbn(&self, isbn: &str, details: &BookDetails) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "UPDATE books SET name = ?1, author = ?2, category = ?3, publication_year = ?4 \
             WHERE isbn = ?5 \
             AND (name <> ?1 OR author <> ?2 OR category <> ?3 OR publication_year <> ?4)",
        )
        .bind(&details.name)
        .bind(&details.author)
        .bind(&details.category)
        .bind(details.publication_year)
        .bind(isbn)
        .execute(&self.pool)
        .await
        .context("update books by isbn")?;

        Ok(result.rows_affected())
    }

    async fn delete_by_id(&self, id: i64) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("delete book {id}"))?;

        Ok(result.rows_affected())
    }

    async fn delete_by_isbn(&self, isbn: &str) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = ?")
            .bind(isbn)
            .execute(&self.pool)
            .await
            .context("delete books by isbn")?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_kernel::settings::DatabaseSettings;

    async fn repository() -> SqlBookRepository {
        let settings = DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            ..DatabaseSettings::default()
        };
        let pool = shelf_db::connect(&settings).await.unwrap();
        shelf_db::ensure_schema(&pool, &[("books", BOOKS_TABLE)])
            .await
            .unwrap();
        SqlBookRepository::new(pool)
    }

    fn book(name: &str, isbn: &str) -> NewBook {
        NewBook {
            name: name.to_string(),
            author: "Herbert".to_string(),
            category: "SciFi".to_string(),
            publication_year: 1965,
            isbn: isbn.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_then_find() {
        let repo = repository().await;
        let id = repo.insert(&book("Dune", "0441172719")).await.unwrap();

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.name, "Dune");
        assert_eq!(found.publication_year, 1965);
        assert!(repo.exists_by_id(id).await.unwrap());
        assert!(repo.exists_by_isbn("0441172719").await.unwrap());
        assert!(repo.find_by_id(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_returns_rows_in_id_order() {
        let repo = repository().await;
        assert!(repo.list().await.unwrap().is_empty());

        let first = repo.insert(&book("Dune", "1")).await.unwrap();
        let second = repo.insert(&book("Dune Messiah", "2")).await.unwrap();

        let ids: Vec<i64> = repo.list().await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn update_by_id_counts_changed_rows_only() {
        let repo = repository().await;
        let id = repo.insert(&book("Dune", "1")).await.unwrap();

        let renamed = book("Dune (1965)", "1");
        assert_eq!(repo.update_by_id(id, &renamed).await.unwrap(), 1);
        assert_eq!(repo.update_by_id(id, &renamed).await.unwrap(), 0);
        assert_eq!(repo.update_by_id(id + 100, &renamed).await.unwrap(), 0);

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.name, "Dune (1965)");
    }

    #[tokio::test]
    async fn isbn_operations_touch_every_matching_row() {
        let repo = repository().await;
        repo.insert(&book("Dune", "dup")).await.unwrap();
        repo.insert(&book("Dune again", "dup")).await.unwrap();
        let other = repo.insert(&book("Emma", "other")).await.unwrap();

        let details = BookDetails {
            name: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            category: "SciFi".to_string(),
            publication_year: 1965,
        };
        assert_eq!(repo.update_by_isbn("dup", &details).await.unwrap(), 2);
        assert_eq!(repo.update_by_isbn("missing", &details).await.unwrap(), 0);

        assert_eq!(repo.delete_by_isbn("dup").await.unwrap(), 2);
        assert!(!repo.exists_by_isbn("dup").await.unwrap());
        assert!(repo.exists_by_id(other).await.unwrap());
    }

    #[tokio::test]
    async fn update_by_isbn_counts_changed_rows_only() {
        let repo = repository().await;
        repo.insert(&book("Dune", "0441172719")).await.unwrap();
        repo.insert(&book("Dune Messiah", "0441172719")).await.unwrap();

        let details = BookDetails {
            name: "Dune".to_string(),
            author: "Herbert".to_string(),
            category: "SciFi".to_string(),
            publication_year: 1965,
        };
        // Only the second row differs from the new values.
        assert_eq!(repo.update_by_isbn("0441172719", &details).await.unwrap(), 1);
        assert_eq!(repo.update_by_isbn("0441172719", &details).await.unwrap(), 0);
        assert!(repo.exists_by_isbn("0441172719").await.unwrap());
    }

    #[tokio::test]
    async fn delete_by_id_removes_one_row() {
        let repo = repository().await;
        let id = repo.insert(&book("Dune", "1")).await.unwrap();

        assert_eq!(repo.delete_by_id(id).await.unwrap(), 1);
        assert_eq!(repo.delete_by_id(id).await.unwrap(), 0);
        assert!(!repo.exists_by_id(id).await.unwrap());
    }

    #[tokio::test]
    async fn values_are_bound_not_interpolated() {
        let repo = repository().await;
        let hostile = "x'; DROP TABLE books; --";
        let id = repo.insert(&book(hostile, hostile)).await.unwrap();

        assert!(repo.exists_by_isbn(hostile).await.unwrap());
        assert_eq!(repo.find_by_id(id).await.unwrap().unwrap().name, hostile);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
