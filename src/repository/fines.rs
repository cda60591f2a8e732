//! Fines repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{missing_reference, page_window};
use crate::{
    error::{AppError, AppResult},
    models::fine::{Fine, FineChanges, FineQuery, FineStatus, NewFine},
};

const MISSING_REFERENCE: &str = "Member not found";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FineRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Fine>;
    async fn search(&self, query: &FineQuery) -> AppResult<(Vec<Fine>, i64)>;
    /// A missing transaction date is stored as today
    async fn create(&self, fine: &NewFine) -> AppResult<Fine>;
    async fn update(&self, changes: &FineChanges) -> AppResult<Fine>;
    /// Settle an unpaid fine. `None` when it was already paid.
    async fn mark_paid(&self, id: i32) -> AppResult<Option<Fine>>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgFineRepository {
    pool: Pool<Postgres>,
}

impl PgFineRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Fine with id {} not found", id))
}

#[async_trait]
impl FineRepository for PgFineRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>("SELECT * FROM fines WHERE fine_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn search(&self, query: &FineQuery) -> AppResult<(Vec<Fine>, i64)> {
        let (_, per_page, offset) = page_window(query.page, query.per_page);
        let filter = "WHERE ($1::INTEGER IS NULL OR member_id = $1) AND ($2::TEXT IS NULL OR status = $2)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM fines {}", filter))
            .bind(query.member_id)
            .bind(&query.status)
            .fetch_one(&self.pool)
            .await?;

        let fines = sqlx::query_as::<_, Fine>(&format!(
            "SELECT * FROM fines {} ORDER BY transaction_date DESC, fine_id DESC LIMIT {} OFFSET {}",
            filter, per_page, offset
        ))
        .bind(query.member_id)
        .bind(&query.status)
        .fetch_all(&self.pool)
        .await?;

        Ok((fines, total))
    }

    async fn create(&self, fine: &NewFine) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>(
            r#"
            INSERT INTO fines (member_id, amount, status, transaction_date)
            VALUES ($1, $2, $3, COALESCE($4, CURRENT_DATE))
            RETURNING *
            "#,
        )
        .bind(fine.member_id)
        .bind(fine.amount)
        .bind(&fine.status)
        .bind(fine.transaction_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| missing_reference(e, MISSING_REFERENCE))
    }

    async fn update(&self, changes: &FineChanges) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>(
            r#"
            UPDATE fines SET member_id = $2, amount = $3, status = $4, transaction_date = $5
            WHERE fine_id = $1
            RETURNING *
            "#,
        )
        .bind(changes.fine_id)
        .bind(changes.member_id)
        .bind(changes.amount)
        .bind(&changes.status)
        .bind(changes.transaction_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| missing_reference(e, MISSING_REFERENCE))?
        .ok_or_else(|| not_found(changes.fine_id))
    }

    async fn mark_paid(&self, id: i32) -> AppResult<Option<Fine>> {
        let fine = sqlx::query_as::<_, Fine>(
            "UPDATE fines SET status = $2 WHERE fine_id = $1 AND status <> $2 RETURNING *",
        )
        .bind(id)
        .bind(FineStatus::Paid.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(fine)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM fines WHERE fine_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}
