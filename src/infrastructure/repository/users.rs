use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::user::{RoleChange, User};
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT id, email, first_name, last_name, is_admin, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ShopError::NotFound("user"))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT id, email, first_name, last_name, is_admin, created_at FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Registers a customer account. Emails are stored lowercased.
    pub async fn create(&self, email: &str, first_name: &str, last_name: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, first_name, last_name, is_admin) VALUES ($1, $2, $3, $4, FALSE) \
             RETURNING id, email, first_name, last_name, is_admin, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(email.trim().to_lowercase())
        .bind(first_name.trim())
        .bind(last_name.trim())
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn change_role(&self, actor: &User, target: Uuid, change: RoleChange) -> Result<User> {
        actor.check_can_modify(target)?;
        let mut user = self.get(target).await?;
        user.apply(change);
        sqlx::query("UPDATE users SET is_admin = $2 WHERE id = $1").bind(user.id).bind(user.is_admin).execute(&self.pool).await?;
        tracing::info!(actor = %actor.id, user_id = %user.id, ?change, "user role changed");
        Ok(user)
    }

    /// Fails with a conflict while the user still has orders.
    pub async fn delete(&self, actor: &User, target: Uuid) -> Result<()> {
        actor.check_can_modify(target)?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(target).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(ShopError::NotFound("user"));
        }
        tracing::info!(actor = %actor.id, user_id = %target, "user deleted");
        Ok(())
    }
}
