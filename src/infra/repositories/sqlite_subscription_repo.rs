use crate::domain::{models::subscription::{Subscription, STATUS_ACTIVE, STATUS_TRIALING}, ports::SubscriptionRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

pub struct SqliteSubscriptionRepo { pool: SqlitePool }
impl SqliteSubscriptionRepo { pub fn new(pool: SqlitePool) -> Self { Self { pool } } }

#[async_trait]
impl SubscriptionRepository for SqliteSubscriptionRepo {
    async fn create(&self, subscription: &Subscription) -> Result<Subscription, AppError> {
        sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions (id, user_id, tenant_id, plan, status, current_period_end, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id, user_id, tenant_id, plan, status, current_period_end, created_at"
        )
            .bind(&subscription.id)
            .bind(&subscription.user_id)
            .bind(&subscription.tenant_id)
            .bind(&subscription.plan)
            .bind(&subscription.status)
            .bind(subscription.current_period_end)
            .bind(subscription.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_active(&self, user_id: &str, tenant_id: &str) -> Result<Option<Subscription>, AppError> {
        sqlx::query_as::<_, Subscription>(
            "SELECT id, user_id, tenant_id, plan, status, current_period_end, created_at
             FROM subscriptions
             WHERE user_id = ? AND tenant_id = ? AND status IN (?, ?) AND current_period_end > ?
             ORDER BY created_at DESC LIMIT 1"
        )
            .bind(user_id)
            .bind(tenant_id)
            .bind(STATUS_ACTIVE)
            .bind(STATUS_TRIALING)
            .bind(Utc::now())
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn update_status(&self, id: &str, status: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE subscriptions SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}
