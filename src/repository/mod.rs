//! Repository layer for database operations
//!
//! Each entity has an async trait (mocked in service tests) and a
//! PostgreSQL implementation.

pub mod books;
pub mod fines;
pub mod members;
pub mod notifications;
pub mod transactions;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::error::{AppError, AppResult};

pub use books::{BookRepository, PgBookRepository};
pub use fines::{FineRepository, PgFineRepository};
pub use members::{MemberRepository, PgMemberRepository};
pub use notifications::{NotificationRepository, PgNotificationRepository};
pub use transactions::{PgTransactionRepository, TransactionRepository};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Normalize list paging into `(page, per_page, offset)`
pub fn page_window(page: Option<i64>, per_page: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page, (page - 1) * per_page)
}

/// Map a foreign-key violation to `NotFound`, leaving other errors untouched
pub(crate) fn missing_reference(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::NotFound(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

/// Database connectivity probe used by the readiness endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthRepository: Send + Sync {
    async fn ping(&self) -> AppResult<()>;
}

pub struct PgHealthRepository {
    pool: Pool<Postgres>,
}

#[async_trait]
impl HealthRepository for PgHealthRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Main repository struct holding one handle per entity
#[derive(Clone)]
pub struct Repository {
    pub health: Arc<dyn HealthRepository>,
    pub members: Arc<dyn MemberRepository>,
    pub books: Arc<dyn BookRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub fines: Arc<dyn FineRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            health: Arc::new(PgHealthRepository { pool: pool.clone() }),
            members: Arc::new(PgMemberRepository::new(pool.clone())),
            books: Arc::new(PgBookRepository::new(pool.clone())),
            transactions: Arc::new(PgTransactionRepository::new(pool.clone())),
            fines: Arc::new(PgFineRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool)),
        }
    }
}
