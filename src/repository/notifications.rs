//! Notifications repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{missing_reference, page_window};
use crate::{
    error::{AppError, AppResult},
    models::notification::{NewNotification, Notification, NotificationQuery},
};

const MISSING_REFERENCE: &str = "Member not found";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Notification>;
    async fn search(&self, query: &NotificationQuery) -> AppResult<(Vec<Notification>, i64)>;
    async fn create(&self, notification: &NewNotification) -> AppResult<Notification>;
    async fn update(&self, id: i32, notification: &NewNotification) -> AppResult<Notification>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: Pool<Postgres>,
}

impl PgNotificationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Notification with id {} not found", id))
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE notification_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn search(&self, query: &NotificationQuery) -> AppResult<(Vec<Notification>, i64)> {
        let (_, per_page, offset) = page_window(query.page, query.per_page);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE ($1::INTEGER IS NULL OR member_id = $1)",
        )
        .bind(query.member_id)
        .fetch_one(&self.pool)
        .await?;

        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT * FROM notifications
            WHERE ($1::INTEGER IS NULL OR member_id = $1)
            ORDER BY date_sent DESC, notification_id DESC
            LIMIT {} OFFSET {}
            "#,
            per_page, offset
        ))
        .bind(query.member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok((notifications, total))
    }

    async fn create(&self, notification: &NewNotification) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (member_id, message) VALUES ($1, $2) RETURNING *",
        )
        .bind(notification.member_id)
        .bind(&notification.message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| missing_reference(e, MISSING_REFERENCE))
    }

    async fn update(&self, id: i32, notification: &NewNotification) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET member_id = $2, message = $3
            WHERE notification_id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(notification.member_id)
        .bind(&notification.message)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| missing_reference(e, MISSING_REFERENCE))?
        .ok_or_else(|| not_found(id))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE notification_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}
