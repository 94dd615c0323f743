use crate::domain::{models::{user::User, analytics::UserStats}, ports::UserRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;

const USER_COLUMNS: &str = "id, tenant_id, email, password_hash, first_name, last_name, role, is_active, plan, is_trial, trial_ends_at, last_login_at, created_at, updated_at";

pub struct PostgresUserRepo {
    pool: PgPool,
}

impl PostgresUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepo {
    async fn create(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING {USER_COLUMNS}"
        ))
            .bind(&user.id)
            .bind(&user.tenant_id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.role)
            .bind(user.is_active)
            .bind(&user.plan)
            .bind(user.is_trial)
            .bind(user.trial_ends_at)
            .bind(user.last_login_at)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update_profile(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET first_name = $1, last_name = $2, updated_at = $3 WHERE id = $4 RETURNING {USER_COLUMNS}"
        ))
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(Utc::now())
            .bind(&user.id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn set_active(&self, id: &str, is_active: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET is_active = $1, updated_at = $2 WHERE id = $3")
            .bind(is_active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Postgres user activation update failed: {:?}", e);
                AppError::Database(e)
            })?;
        Ok(())
    }

    async fn set_role(&self, id: &str, role: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET role = $1, updated_at = $2 WHERE id = $3")
            .bind(role)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn count_active_by_tenant(&self, tenant_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND is_active = $2")
            .bind(tenant_id)
            .bind(true)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn stats_by_tenant(&self, tenant_id: &str, since: DateTime<Utc>) -> Result<UserStats, AppError> {
        let (total_users, active_users, new_users) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN is_active = $1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN created_at >= $2 THEN 1 ELSE 0 END), 0)
             FROM users WHERE tenant_id = $3"
        )
            .bind(true)
            .bind(since)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(UserStats { total_users, active_users, new_users })
    }
}
