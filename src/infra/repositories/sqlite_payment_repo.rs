use crate::domain::{models::payment::{Payment, Invoice, RevenuePoint}, ports::PaymentRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

const PAYMENT_COLUMNS: &str = "id, tenant_id, user_id, amount_cents, currency, provider, status, description, external_id, created_at, updated_at";
const INVOICE_COLUMNS: &str = "id, tenant_id, user_id, payment_id, number, amount_cents, currency, status, due_date, created_at";

pub struct SqlitePaymentRepo {
    pool: SqlitePool,
}

impl SqlitePaymentRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepo {
    async fn create(&self, payment: &Payment) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments ({PAYMENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {PAYMENT_COLUMNS}"
        ))
            .bind(&payment.id)
            .bind(&payment.tenant_id)
            .bind(&payment.user_id)
            .bind(payment.amount_cents)
            .bind(&payment.currency)
            .bind(&payment.provider)
            .bind(&payment.status)
            .bind(&payment.description)
            .bind(&payment.external_id)
            .bind(payment.created_at)
            .bind(payment.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_owned(&self, id: &str, user_id: &str) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ? AND user_id = ?"))
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_in_tenant(&self, id: &str, tenant_id: &str) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ? AND tenant_id = ?"))
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_user(&self, user_id: &str, limit: i64, offset: i64) -> Result<Vec<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?"
        ))
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update_status(&self, id: &str, status: &str) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>(&format!(
            "UPDATE payments SET status = ?, updated_at = ? WHERE id = ? RETURNING {PAYMENT_COLUMNS}"
        ))
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn revenue_by_day(&self, tenant_id: &str, since: DateTime<Utc>) -> Result<Vec<RevenuePoint>, AppError> {
        let rows = sqlx::query_as::<_, (String, String, i64, i64)>(
            "SELECT substr(created_at, 1, 10) AS day, currency, COALESCE(SUM(amount_cents), 0), COUNT(*)
             FROM payments
             WHERE tenant_id = ? AND status = 'COMPLETED' AND created_at >= ?
             GROUP BY day, currency
             ORDER BY day ASC"
        )
            .bind(tenant_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(rows.into_iter()
            .map(|(day, currency, amount_cents, payments)| RevenuePoint { day, currency, amount_cents, payments })
            .collect())
    }

    async fn create_invoice(&self, invoice: &Invoice) -> Result<Invoice, AppError> {
        sqlx::query_as::<_, Invoice>(&format!(
            "INSERT INTO invoices ({INVOICE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {INVOICE_COLUMNS}"
        ))
            .bind(&invoice.id)
            .bind(&invoice.tenant_id)
            .bind(&invoice.user_id)
            .bind(&invoice.payment_id)
            .bind(&invoice.number)
            .bind(invoice.amount_cents)
            .bind(&invoice.currency)
            .bind(&invoice.status)
            .bind(invoice.due_date)
            .bind(invoice.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_invoice_owned(&self, id: &str, user_id: &str) -> Result<Option<Invoice>, AppError> {
        sqlx::query_as::<_, Invoice>(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ? AND user_id = ?"))
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_invoices_by_user(&self, user_id: &str) -> Result<Vec<Invoice>, AppError> {
        sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE user_id = ? ORDER BY created_at DESC"
        ))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
