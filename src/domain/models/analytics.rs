use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    UserRegistered,
    UserLogin,
    ChatbotCreated,
    ChatbotUpdated,
    ChatbotDeleted,
    MessageSent,
    FaqCreated,
    FaqViewed,
    PaymentCreated,
    PaymentCompleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserRegistered => "USER_REGISTERED",
            EventType::UserLogin => "USER_LOGIN",
            EventType::ChatbotCreated => "CHATBOT_CREATED",
            EventType::ChatbotUpdated => "CHATBOT_UPDATED",
            EventType::ChatbotDeleted => "CHATBOT_DELETED",
            EventType::MessageSent => "MESSAGE_SENT",
            EventType::FaqCreated => "FAQ_CREATED",
            EventType::FaqViewed => "FAQ_VIEWED",
            EventType::PaymentCreated => "PAYMENT_CREATED",
            EventType::PaymentCompleted => "PAYMENT_COMPLETED",
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct AnalyticsEvent {
    pub id: String,
    pub event_type: EventType,
    pub entity_id: String,
    pub entity_type: String,
    pub user_id: Option<String>,
    pub tenant_id: Option<String>,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn new(event_type: EventType, entity_type: &str, entity_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            entity_id: entity_id.to_string(),
            entity_type: entity_type.to_string(),
            user_id: None,
            tenant_id: None,
            data: Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn by(mut self, user_id: &str, tenant_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self.tenant_id = Some(tenant_id.to_string());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
}

impl TimeRange {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "7d" => Some(TimeRange::Week),
            "30d" => Some(TimeRange::Month),
            "90d" => Some(TimeRange::Quarter),
            "1y" => Some(TimeRange::Year),
            _ => None,
        }
    }

    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let days = match self {
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::Quarter => 90,
            TimeRange::Year => 365,
        };
        now - Duration::days(days)
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventCount {
    pub event_type: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    pub new_users: i64,
}
