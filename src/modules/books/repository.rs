use anyhow::Context;
use async_trait::async_trait;
use sqlx::SqlitePool;

use super::models::{Book, NewBook};

const BOOK_COLUMNS: &str = "id, title, author, date_published, cover_image";

/// Persistence gateway for books.
///
/// Every operation touches at most one row. Unknown ids surface as `None`,
/// never as errors.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a book and return it with its assigned id.
    async fn create(&self, book: NewBook) -> anyhow::Result<Book>;

    /// Up to `limit` books after skipping `skip`, in insertion order.
    async fn list(&self, skip: u32, limit: u32) -> anyhow::Result<Vec<Book>>;

    async fn get(&self, id: i64) -> anyhow::Result<Option<Book>>;

    /// Replace all content fields of an existing book.
    async fn update(&self, id: i64, book: NewBook) -> anyhow::Result<Option<Book>>;

    async fn delete(&self, id: i64) -> anyhow::Result<Option<Book>>;
}

/// SQLite-backed [`BookRepository`].
#[derive(Debug, Clone)]
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn create(&self, book: NewBook) -> anyhow::Result<Book> {
        let sql = format!(
            "INSERT INTO books (title, author, date_published, cover_image) \
             VALUES (?, ?, ?, ?) RETURNING {BOOK_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Book>(&sql)
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.date_published)
            .bind(&book.cover_image)
            .fetch_one(&self.pool)
            .await
            .context("failed to insert book")?;

        tracing::debug!(id = created.id, "book created");
        Ok(created)
    }

    async fn list(&self, skip: u32, limit: u32) -> anyhow::Result<Vec<Book>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY id LIMIT ? OFFSET ?");
        sqlx::query_as::<_, Book>(&sql)
            .bind(i64::from(limit))
            .bind(i64::from(skip))
            .fetch_all(&self.pool)
            .await
            .context("failed to list books")
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<Book>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?");
        sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to fetch book {id}"))
    }

    async fn update(&self, id: i64, book: NewBook) -> anyhow::Result<Option<Book>> {
        // Single statement: the write lock is taken up front, never upgraded from a read.
        let sql = format!(
            "UPDATE books SET title = ?, author = ?, date_published = ?, cover_image = ? \
             WHERE id = ? RETURNING {BOOK_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Book>(&sql)
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.date_published)
            .bind(&book.cover_image)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to update book {id}"))?;

        if updated.is_some() {
            tracing::debug!(id, "book updated");
        }
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<Option<Book>> {
        let sql = format!("DELETE FROM books WHERE id = ? RETURNING {BOOK_COLUMNS}");
        let deleted = sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to delete book {id}"))?;

        if deleted.is_some() {
            tracing::debug!(id, "book deleted");
        }
        Ok(deleted)
    }
}
