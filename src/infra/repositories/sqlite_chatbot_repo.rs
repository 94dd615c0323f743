use crate::domain::{models::chatbot::{Chatbot, ChatMessage, ChatbotStats}, ports::ChatbotRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

const CHATBOT_COLUMNS: &str = "id, tenant_id, owner_id, name, description, model, personality, temperature, max_tokens, system_prompt, welcome_message, is_active, total_messages, created_at, updated_at";

pub struct SqliteChatbotRepo {
    pool: SqlitePool,
}

impl SqliteChatbotRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatbotRepository for SqliteChatbotRepo {
    async fn create(&self, chatbot: &Chatbot) -> Result<Chatbot, AppError> {
        sqlx::query_as::<_, Chatbot>(&format!(
            "INSERT INTO chatbots ({CHATBOT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {CHATBOT_COLUMNS}"
        ))
            .bind(&chatbot.id)
            .bind(&chatbot.tenant_id)
            .bind(&chatbot.owner_id)
            .bind(&chatbot.name)
            .bind(&chatbot.description)
            .bind(&chatbot.model)
            .bind(&chatbot.personality)
            .bind(chatbot.temperature)
            .bind(chatbot.max_tokens)
            .bind(&chatbot.system_prompt)
            .bind(&chatbot.welcome_message)
            .bind(chatbot.is_active)
            .bind(chatbot.total_messages)
            .bind(chatbot.created_at)
            .bind(chatbot.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_owned(&self, id: &str, owner_id: &str) -> Result<Option<Chatbot>, AppError> {
        sqlx::query_as::<_, Chatbot>(&format!("SELECT {CHATBOT_COLUMNS} FROM chatbots WHERE id = ? AND owner_id = ?"))
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_owner(&self, owner_id: &str, search: Option<&str>, limit: i64, offset: i64) -> Result<Vec<Chatbot>, AppError> {
        let pattern = search.map(|s| format!("%{}%", s.to_lowercase()));
        sqlx::query_as::<_, Chatbot>(&format!(
            "SELECT {CHATBOT_COLUMNS} FROM chatbots
             WHERE owner_id = ? AND (? IS NULL OR LOWER(name) LIKE ?)
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        ))
            .bind(owner_id)
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chatbots WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, chatbot: &Chatbot) -> Result<Chatbot, AppError> {
        sqlx::query_as::<_, Chatbot>(&format!(
            "UPDATE chatbots SET name = ?, description = ?, model = ?, personality = ?, temperature = ?, max_tokens = ?,
                system_prompt = ?, welcome_message = ?, is_active = ?, updated_at = ?
             WHERE id = ? AND owner_id = ?
             RETURNING {CHATBOT_COLUMNS}"
        ))
            .bind(&chatbot.name)
            .bind(&chatbot.description)
            .bind(&chatbot.model)
            .bind(&chatbot.personality)
            .bind(chatbot.temperature)
            .bind(chatbot.max_tokens)
            .bind(&chatbot.system_prompt)
            .bind(&chatbot.welcome_message)
            .bind(chatbot.is_active)
            .bind(Utc::now())
            .bind(&chatbot.id)
            .bind(&chatbot.owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn delete_owned(&self, id: &str, owner_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM chatbots WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn stats_by_owner(&self, owner_id: &str) -> Result<ChatbotStats, AppError> {
        let (total_chatbots, active_chatbots, total_messages) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN is_active = ? THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(total_messages), 0)
             FROM chatbots WHERE owner_id = ?"
        )
            .bind(true)
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(ChatbotStats { total_chatbots, active_chatbots, total_messages })
    }

    async fn record_message(&self, message: &ChatMessage) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query(
            "INSERT INTO chat_messages (id, chatbot_id, tenant_id, session_id, user_message, bot_response, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
            .bind(&message.id)
            .bind(&message.chatbot_id)
            .bind(&message.tenant_id)
            .bind(&message.session_id)
            .bind(&message.user_message)
            .bind(&message.bot_response)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        sqlx::query("UPDATE chatbots SET total_messages = total_messages + 1 WHERE id = ?")
            .bind(&message.chatbot_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)
    }

    async fn count_messages_by_tenant(&self, tenant_id: &str, since: DateTime<Utc>) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chat_messages WHERE tenant_id = ? AND created_at >= ?")
            .bind(tenant_id)
            .bind(since)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
