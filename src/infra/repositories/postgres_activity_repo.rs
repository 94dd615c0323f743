use crate::domain::{
    models::{audit::AuditLog, analytics::{AnalyticsEvent, EventCount}},
    ports::{AuditRepository, AnalyticsRepository, HealthRepository},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Append-only audit trail, analytics events and the liveness ping.
pub struct PostgresActivityRepo { pool: PgPool }
impl PostgresActivityRepo { pub fn new(pool: PgPool) -> Self { Self { pool } } }

#[async_trait]
impl AuditRepository for PostgresActivityRepo {
    async fn append(&self, entry: &AuditLog) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO audit_logs (id, tenant_id, user_id, action, resource, resource_id, details, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        )
            .bind(&entry.id)
            .bind(&entry.tenant_id)
            .bind(&entry.user_id)
            .bind(&entry.action)
            .bind(&entry.resource)
            .bind(&entry.resource_id)
            .bind(entry.details.to_string())
            .bind(entry.created_at)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}

#[async_trait]
impl AnalyticsRepository for PostgresActivityRepo {
    async fn append(&self, event: &AnalyticsEvent) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO analytics_events (id, event_type, entity_id, entity_type, user_id, tenant_id, data, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        )
            .bind(&event.id)
            .bind(event.event_type.as_str())
            .bind(&event.entity_id)
            .bind(&event.entity_type)
            .bind(&event.user_id)
            .bind(&event.tenant_id)
            .bind(event.data.to_string())
            .bind(event.created_at)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn count_by_type(&self, tenant_id: &str, since: DateTime<Utc>) -> Result<Vec<EventCount>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT event_type, COUNT(*) FROM analytics_events
             WHERE tenant_id = $1 AND created_at >= $2
             GROUP BY event_type ORDER BY event_type ASC"
        )
            .bind(tenant_id)
            .bind(since)
            .fetch_all(&self.pool).await.map_err(AppError::Database)?;

        Ok(rows.into_iter().map(|(event_type, count)| EventCount { event_type, count }).collect())
    }
}

#[async_trait]
impl HealthRepository for PostgresActivityRepo {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}
