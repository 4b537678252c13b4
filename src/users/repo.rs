use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::error::AppResult;
use crate::users::repo_types::{UserChanges, UserFilter, UserRow};

/// Persistence port for user records. Implementations must enforce email
/// uniqueness atomically and report a collision as `AppError::Conflict`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: UserRow) -> AppResult<UserRow>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserRow>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRow>>;

    /// Returns the requested page, newest first, plus the total match count.
    async fn list(&self, filter: &UserFilter) -> AppResult<(Vec<UserRow>, i64)>;

    /// Returns `None` when no record has this id.
    async fn update(
        &self,
        id: Uuid,
        changes: &UserChanges,
        updated_at: OffsetDateTime,
    ) -> AppResult<Option<UserRow>>;

    /// Returns `false` when no record has this id.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    async fn ping(&self) -> anyhow::Result<()>;
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, age, phone, role, \
                            is_active, created_at, updated_at";

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL
           OR first_name ILIKE $1
           OR last_name ILIKE $1
           OR email ILIKE $1)
      AND ($2::user_role IS NULL OR role = $2)
      AND ($3::boolean IS NULL OR is_active = $3)
"#;

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert(&self, user: UserRow) -> AppResult<UserRow> {
        let sql = format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password_hash, age, phone,
                               role, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.age)
            .bind(&user.phone)
            .bind(user.role)
            .bind(user.is_active)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &UserFilter) -> AppResult<(Vec<UserRow>, i64)> {
        let pattern = filter.like_pattern();

        let count_sql = format!("SELECT COUNT(*) FROM users {FILTER_CLAUSE}");
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(&pattern)
            .bind(filter.role)
            .bind(filter.is_active)
            .fetch_one(&self.pool)
            .await?;

        let page_sql = format!(
            "SELECT {USER_COLUMNS} FROM users {FILTER_CLAUSE} \
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query_as::<_, UserRow>(&page_sql)
            .bind(&pattern)
            .bind(filter.role)
            .bind(filter.is_active)
            .bind(filter.limit)
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    #[instrument(skip(self, changes))]
    async fn update(
        &self,
        id: Uuid,
        changes: &UserChanges,
        updated_at: OffsetDateTime,
    ) -> AppResult<Option<UserRow>> {
        let sql = format!(
            r#"
            UPDATE users
               SET first_name = COALESCE($2, first_name),
                   last_name  = COALESCE($3, last_name),
                   email      = COALESCE($4, email),
                   age        = COALESCE($5, age),
                   phone      = COALESCE($6, phone),
                   role       = COALESCE($7, role),
                   is_active  = COALESCE($8, is_active),
                   updated_at = $9
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(&changes.first_name)
            .bind(&changes.last_name)
            .bind(&changes.email)
            .bind(changes.age)
            .bind(&changes.phone)
            .bind(changes.role)
            .bind(changes.is_active)
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        crate::db::ping(&self.pool).await
    }
}

