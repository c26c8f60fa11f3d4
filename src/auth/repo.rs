use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::error::StoreError;

/// Durable accounts and their bearer credentials.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Resolves a bearer token to the account owning it.
    async fn find_user_by_token(&self, token: &str) -> anyhow::Result<Option<User>>;

    /// Creates the account and its credential as one unit.
    async fn create_user(&self, new: NewUser, token: &str) -> Result<User, StoreError>;

    /// Returns the user's existing token, creating the credential or filling
    /// an empty token with `candidate` when needed.
    async fn ensure_token(&self, user_id: Uuid, candidate: &str) -> Result<String, StoreError>;
}

#[derive(Clone)]
pub struct PgIdentityStore {
    db: PgPool,
}

impl PgIdentityStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_user_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.name, u.password_hash, u.created_at
            FROM credentials c
            JOIN users u ON u.id = c.user_id
            WHERE c.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .context("find user by token")?;
        Ok(user)
    }

    async fn create_user(&self, new: NewUser, token: &str) -> Result<User, StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.db.begin().await.context("begin tx")?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO credentials (user_id, token, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user.id)
        .bind(token)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.context("commit tx")?;
        Ok(user)
    }

    async fn ensure_token(&self, user_id: Uuid, candidate: &str) -> Result<String, StoreError> {
        let token: String = sqlx::query_scalar(
            r#"
            INSERT INTO credentials (user_id, token, created_at)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id)
            DO UPDATE SET token = COALESCE(credentials.token, EXCLUDED.token)
            RETURNING token
            "#,
        )
        .bind(user_id)
        .bind(candidate)
        .fetch_one(&self.db)
        .await?;
        Ok(token)
    }
}
