use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    pub id: String,
    pub tenant_id: String,
    pub owner_id: String,
    pub chatbot_id: Option<String>,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub is_active: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Faq {
    pub fn new(tenant_id: String, owner_id: String, question: String, answer: String, category: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            owner_id,
            chatbot_id: None,
            question,
            answer,
            category,
            is_active: true,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
