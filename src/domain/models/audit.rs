use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize, Clone)]
pub struct AuditLog {
    pub id: String,
    pub tenant_id: Option<String>,
    pub user_id: String,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<String>,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(user_id: &str, action: &str, resource: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: None,
            user_id: user_id.to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
            resource_id: None,
            details: Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn tenant(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(tenant_id.to_string());
        self
    }

    pub fn resource_id(mut self, resource_id: &str) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}
