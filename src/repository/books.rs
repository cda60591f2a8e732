//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::page_window;
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, NewBook},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Book>;
    async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)>;
    async fn create(&self, book: &NewBook) -> AppResult<Book>;
    async fn update(&self, id: i32, book: &NewBook) -> AppResult<Book>;
    async fn delete(&self, id: i32) -> AppResult<()>;
    /// Take one copy off the shelf. `None` when no copy is left.
    async fn take_copy(&self, id: i32) -> AppResult<Option<Book>>;
    /// Put one copy back, never above the total
    async fn return_copy(&self, id: i32) -> AppResult<Book>;
}

#[derive(Clone)]
pub struct PgBookRepository {
    pool: Pool<Postgres>,
}

impl PgBookRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE book_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (_, per_page, offset) = page_window(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(format!("%{}%", search.to_lowercase()));
            conditions.push(format!(
                "(LOWER(title) LIKE ${0} OR LOWER(author) LIKE ${0} OR LOWER(isbn) LIKE ${0})",
                params.len()
            ));
        }

        if let Some(genre) = query.genre.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(genre.to_lowercase());
            conditions.push(format!("LOWER(genre) = ${}", params.len()));
        }

        if query.available == Some(true) {
            conditions.push("copies_available > 0".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM books {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            r#"
            SELECT * FROM books {}
            ORDER BY title, book_id
            LIMIT {} OFFSET {}
            "#,
            where_clause, per_page, offset
        );
        let mut select_builder = sqlx::query_as::<_, Book>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let books = select_builder.fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, author, isbn, publisher, publication_year, genre,
                copies_available, total_copies
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.genre)
        .bind(book.copies_available)
        .bind(book.total_copies)
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    async fn update(&self, id: i32, book: &NewBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = $2, author = $3, isbn = $4, publisher = $5,
                publication_year = $6, genre = $7,
                copies_available = $8, total_copies = $9
            WHERE book_id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.genre)
        .bind(book.copies_available)
        .bind(book.total_copies)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(id))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE book_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn take_copy(&self, id: i32) -> AppResult<Option<Book>> {
        // Single statement so two concurrent borrows cannot both take the last copy
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET copies_available = copies_available - 1
            WHERE book_id = $1 AND copies_available > 0
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn return_copy(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET copies_available = LEAST(copies_available + 1, total_copies)
            WHERE book_id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(id))
    }
}
