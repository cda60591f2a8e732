//! Members repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::page_window;
use crate::{
    error::{conflict_on_unique, AppError, AppResult},
    models::member::{Member, MemberChanges, MemberQuery, NewMember},
};

const DUPLICATE_EMAIL: &str = "A member with this email already exists";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Member>;
    /// Case-insensitive lookup used by login
    async fn get_by_email(&self, email: &str) -> AppResult<Option<Member>>;
    async fn search(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)>;
    /// `member.password` must already be hashed
    async fn create(&self, member: &NewMember) -> AppResult<Member>;
    async fn update(&self, changes: &MemberChanges) -> AppResult<Member>;
    async fn update_status(&self, id: i32, status: &str) -> AppResult<Member>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgMemberRepository {
    pool: Pool<Postgres>,
}

impl PgMemberRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberRepository for PgMemberRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE member_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            "SELECT * FROM members WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    async fn search(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)> {
        let (_, per_page, offset) = page_window(query.page, query.per_page);

        let mut params: Vec<String> = Vec::new();
        let where_clause = match query.search.as_deref().map(str::trim) {
            Some(search) if !search.is_empty() => {
                params.push(format!("%{}%", search.to_lowercase()));
                "WHERE LOWER(name) LIKE $1 OR LOWER(email) LIKE $1".to_string()
            }
            _ => String::new(),
        };

        let count_query = format!("SELECT COUNT(*) FROM members {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            r#"
            SELECT * FROM members {}
            ORDER BY name, member_id
            LIMIT {} OFFSET {}
            "#,
            where_clause, per_page, offset
        );
        let mut select_builder = sqlx::query_as::<_, Member>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let members = select_builder.fetch_all(&self.pool).await?;

        Ok((members, total))
    }

    async fn create(&self, member: &NewMember) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (name, email, password, phone, address, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&member.name)
        .bind(&member.email)
        .bind(&member.password)
        .bind(&member.phone)
        .bind(&member.address)
        .bind(member.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_EMAIL))
    }

    async fn update(&self, changes: &MemberChanges) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET
                name = $2,
                email = $3,
                phone = $4,
                address = $5,
                membership_status = COALESCE($6, membership_status)
            WHERE member_id = $1
            RETURNING *
            "#,
        )
        .bind(changes.member_id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.address)
        .bind(&changes.membership_status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_EMAIL))?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", changes.member_id)))
    }

    async fn update_status(&self, id: i32, status: &str) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            "UPDATE members SET membership_status = $2 WHERE member_id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM members WHERE member_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }
        Ok(())
    }
}
