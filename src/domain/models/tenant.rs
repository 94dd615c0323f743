use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub domain: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: String, domain: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            domain,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
