use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

pub const PAYMENT_STATUSES: [&str; 4] = ["PENDING", "COMPLETED", "FAILED", "REFUNDED"];
pub const PAYMENT_PROVIDERS: [&str; 2] = ["STRIPE", "PAYPAL"];
pub const INVOICE_STATUSES: [&str; 4] = ["DRAFT", "ISSUED", "PAID", "VOID"];

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub provider: String,
    pub status: String,
    pub description: Option<String>,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(tenant_id: String, user_id: String, amount_cents: i64, currency: String, provider: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            user_id,
            amount_cents,
            currency,
            provider,
            status: "PENDING".to_string(),
            description: None,
            external_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub payment_id: Option<String>,
    pub number: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(tenant_id: String, user_id: String, amount_cents: i64, currency: String, due_in_days: i64) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Self {
            number: invoice_number(now, &id),
            id: id.to_string(),
            tenant_id,
            user_id,
            payment_id: None,
            amount_cents,
            currency,
            status: "ISSUED".to_string(),
            due_date: now + Duration::days(due_in_days),
            created_at: now,
        }
    }
}

/// `INV-<yyyymmdd>-<first 8 hex of id>`, unique per invoice id.
fn invoice_number(at: DateTime<Utc>, id: &Uuid) -> String {
    let simple = id.simple().to_string();
    format!("INV-{}-{}", at.format("%Y%m%d"), &simple[..8].to_uppercase())
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePoint {
    pub day: String,
    pub currency: String,
    pub amount_cents: i64,
    pub payments: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_number_format() {
        let invoice = Invoice::new("t".into(), "u".into(), 1000, "USD".into(), 30);
        assert!(invoice.number.starts_with("INV-"));
        assert_eq!(invoice.number.len(), "INV-20250101-ABCDEF12".len());
        assert_eq!(invoice.status, "ISSUED");
    }
}
