use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::models::user::{NewUser, User};

/// Owner of the durable `users` collection.
///
/// Every call goes to the store; implementations keep no copy of the rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserGateway: Send + Sync {
    /// All users, oldest first.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Insert a user and return it with its store-assigned `id` and `created_at`.
    ///
    /// Fails with [`Error::ConstraintViolation`] when the email is taken.
    async fn insert_user(&self, new_user: NewUser) -> Result<User>;

    /// Delete by id. A missing id is not an error.
    async fn delete_user(&self, id: i64) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct PgUserGateway {
    pool: PgPool,
}

impl PgUserGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserGateway for PgUserGateway {
    async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at
            FROM users
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email)
            VALUES ($1, $2)
            RETURNING id, name, email, created_at
            "#,
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match Error::from(e) {
            Error::ConstraintViolation(_) => Error::ConstraintViolation(format!(
                "A user with email {} already exists",
                new_user.email
            )),
            other => other,
        })?;

        tracing::info!(user_id = user.id, "user inserted");
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(user_id = id, "delete matched no rows");
        } else {
            tracing::info!(user_id = id, "user deleted");
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
