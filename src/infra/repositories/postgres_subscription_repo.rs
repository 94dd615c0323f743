use crate::domain::{models::subscription::{Subscription, STATUS_ACTIVE, STATUS_TRIALING}, ports::SubscriptionRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

pub struct PostgresSubscriptionRepo { pool: PgPool }
impl PostgresSubscriptionRepo { pub fn new(pool: PgPool) -> Self { Self { pool } } }

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepo {
    async fn create(&self, subscription: &Subscription) -> Result<Subscription, AppError> {
        sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions (id, user_id, tenant_id, plan, status, current_period_end, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
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
             WHERE user_id = $1 AND tenant_id = $2 AND status IN ($3, $4) AND current_period_end > $5
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
        sqlx::query("UPDATE subscriptions SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}
