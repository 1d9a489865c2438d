use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::repo_types::{AuthTokenRecord, NewUser, ProfilePatch, User, UserRow},
    db::PgStore,
    error::{is_unique_violation, AppError, AppResult},
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Inserts a user. A taken email yields `AppError::Conflict`, decided by
    /// the storage constraint rather than a prior lookup.
    async fn insert_user(&self, new: NewUser) -> AppResult<User>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    /// Applies the set fields of `patch`, returns `None` when the user is gone.
    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait TokenRepo: Send + Sync {
    async fn insert_token(&self, record: AuthTokenRecord) -> AppResult<()>;
    async fn find_token(&self, token: &str) -> AppResult<Option<AuthTokenRecord>>;
    /// Returns whether a record was removed.
    async fn delete_token(&self, token: &str) -> AppResult<bool>;
    /// Deletes every token with `expires_at < now`, returns how many.
    async fn delete_expired_tokens(&self, now: OffsetDateTime) -> AppResult<u64>;
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, phone, user_type, created_at, updated_at";

#[async_trait]
impl UserRepo for PgStore {
    async fn insert_user(&self, new: NewUser) -> AppResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, password_hash, name, phone, user_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.name)
            .bind(&new.phone)
            .bind(new.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("User already exists")
                } else {
                    AppError::Database(e)
                }
            })?;
        row.try_into()
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> AppResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET name = COALESCE($1, name),
                   phone = COALESCE($2, phone),
                   updated_at = NOW()
             WHERE id = $3
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(patch.name)
            .bind(patch.phone)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl TokenRepo for PgStore {
    async fn insert_token(&self, record: AuthTokenRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (token, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.token)
        .bind(record.user_id)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_token(&self, token: &str) -> AppResult<Option<AuthTokenRecord>> {
        let record = sqlx::query_as::<_, AuthTokenRecord>(
            r#"
            SELECT token, user_id, expires_at, created_at
              FROM auth_tokens
             WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn delete_token(&self, token: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_tokens(&self, now: OffsetDateTime) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
