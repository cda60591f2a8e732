//! Borrowing transactions repository

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use super::{missing_reference, page_window};
use crate::{
    error::{AppError, AppResult},
    models::transaction::{BorrowingTransaction, NewTransaction, TransactionQuery, TransactionStatus},
};

const MISSING_REFERENCE: &str = "Referenced book or member not found";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<BorrowingTransaction>;
    async fn search(&self, query: &TransactionQuery) -> AppResult<(Vec<BorrowingTransaction>, i64)>;
    async fn create(&self, transaction: &NewTransaction) -> AppResult<BorrowingTransaction>;
    async fn update(&self, id: i32, transaction: &NewTransaction) -> AppResult<BorrowingTransaction>;
    /// Close an open transaction. `None` when it was already returned.
    async fn mark_returned(&self, id: i32, return_date: NaiveDate) -> AppResult<Option<BorrowingTransaction>>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgTransactionRepository {
    pool: Pool<Postgres>,
}

impl PgTransactionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Transaction with id {} not found", id))
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<BorrowingTransaction> {
        sqlx::query_as::<_, BorrowingTransaction>(
            "SELECT * FROM borrowing_transactions WHERE transaction_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(id))
    }

    async fn search(&self, query: &TransactionQuery) -> AppResult<(Vec<BorrowingTransaction>, i64)> {
        let (_, per_page, offset) = page_window(query.page, query.per_page);

        // $1..$3 are always bound; NULL disables the filter
        let filter = r#"
            WHERE ($1::INTEGER IS NULL OR member_id = $1)
              AND ($2::INTEGER IS NULL OR book_id = $2)
              AND ($3::TEXT IS NULL OR status = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM borrowing_transactions {}",
            filter
        ))
        .bind(query.member_id)
        .bind(query.book_id)
        .bind(&query.status)
        .fetch_one(&self.pool)
        .await?;

        let transactions = sqlx::query_as::<_, BorrowingTransaction>(&format!(
            r#"
            SELECT * FROM borrowing_transactions {}
            ORDER BY borrow_date DESC, transaction_id DESC
            LIMIT {} OFFSET {}
            "#,
            filter, per_page, offset
        ))
        .bind(query.member_id)
        .bind(query.book_id)
        .bind(&query.status)
        .fetch_all(&self.pool)
        .await?;

        Ok((transactions, total))
    }

    async fn create(&self, transaction: &NewTransaction) -> AppResult<BorrowingTransaction> {
        sqlx::query_as::<_, BorrowingTransaction>(
            r#"
            INSERT INTO borrowing_transactions (book_id, member_id, borrow_date, return_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(transaction.book_id)
        .bind(transaction.member_id)
        .bind(transaction.borrow_date)
        .bind(transaction.return_date)
        .bind(&transaction.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| missing_reference(e, MISSING_REFERENCE))
    }

    async fn update(&self, id: i32, transaction: &NewTransaction) -> AppResult<BorrowingTransaction> {
        sqlx::query_as::<_, BorrowingTransaction>(
            r#"
            UPDATE borrowing_transactions SET
                book_id = $2, member_id = $3, borrow_date = $4,
                return_date = $5, status = $6
            WHERE transaction_id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(transaction.book_id)
        .bind(transaction.member_id)
        .bind(transaction.borrow_date)
        .bind(transaction.return_date)
        .bind(&transaction.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| missing_reference(e, MISSING_REFERENCE))?
        .ok_or_else(|| not_found(id))
    }

    async fn mark_returned(&self, id: i32, return_date: NaiveDate) -> AppResult<Option<BorrowingTransaction>> {
        let transaction = sqlx::query_as::<_, BorrowingTransaction>(
            r#"
            UPDATE borrowing_transactions SET return_date = $2, status = $3
            WHERE transaction_id = $1 AND status <> $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(return_date)
        .bind(TransactionStatus::Returned.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM borrowing_transactions WHERE transaction_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}
