use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Chatbot {
    pub id: String,
    pub tenant_id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub model: String,
    pub personality: String,
    pub temperature: f64,
    pub max_tokens: i32,
    pub system_prompt: Option<String>,
    pub welcome_message: Option<String>,
    pub is_active: bool,
    pub total_messages: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const CHATBOT_MODELS: [&str; 5] = ["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo", "gpt-4o", "gpt-4o-mini"];
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

impl Chatbot {
    pub fn new(tenant_id: String, owner_id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            owner_id,
            name,
            description: None,
            model: DEFAULT_MODEL.to_string(),
            personality: "professional".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            system_prompt: None,
            welcome_message: None,
            is_active: true,
            total_messages: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub chatbot_id: String,
    pub tenant_id: String,
    pub session_id: String,
    pub user_message: String,
    pub bot_response: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(chatbot: &Chatbot, session_id: String, user_message: String, bot_response: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chatbot_id: chatbot.id.clone(),
            tenant_id: chatbot.tenant_id.clone(),
            session_id,
            user_message,
            bot_response,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatbotStats {
    pub total_chatbots: i64,
    pub active_chatbots: i64,
    pub total_messages: i64,
}
