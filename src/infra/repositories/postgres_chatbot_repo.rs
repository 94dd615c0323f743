use crate::domain::{models::chatbot::{Chatbot, ChatMessage, ChatbotStats}, ports::ChatbotRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const CHATBOT_COLUMNS: &str = "id, tenant_id, owner_id, name, description, model, personality, temperature, max_tokens, system_prompt, welcome_message, is_active, total_messages, created_at, updated_at";

pub struct PostgresChatbotRepo {
    pool: PgPool,
}

impl PostgresChatbotRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatbotRepository for PostgresChatbotRepo {
    async fn create(&self, chatbot: &Chatbot) -> Result<Chatbot, AppError> {
        sqlx::query_as::<_, Chatbot>(&format!(
            "INSERT INTO chatbots ({CHATBOT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING {CHATBOT_COLUMNS}"
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
        sqlx::query_as::<_, Chatbot>(&format!("SELECT {CHATBOT_COLUMNS} FROM chatbots WHERE id = $1 AND owner_id = $2"))
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
             WHERE owner_id = $1 AND ($2::text IS NULL OR LOWER(name) LIKE $3)
             ORDER BY created_at DESC LIMIT $4 OFFSET $5"
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
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chatbots WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, chatbot: &Chatbot) -> Result<Chatbot, AppError> {
        sqlx::query_as::<_, Chatbot>(&format!(
            "UPDATE chatbots SET name = $1, description = $2, model = $3, personality = $4, temperature = $5, max_tokens = $6,
                system_prompt = $7, welcome_message = $8, is_active = $9, updated_at = $10
             WHERE id = $11 AND owner_id = $12
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
        let result = sqlx::query("DELETE FROM chatbots WHERE id = $1 AND owner_id = $2")
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
                    COALESCE(SUM(CASE WHEN is_active = $1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(total_messages), 0)::BIGINT
             FROM chatbots WHERE owner_id = $2"
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
            "INSERT INTO chat_messages (id, chatbot_id, tenant_id, session_id, user_message, bot_response, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)"
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

        sqlx::query("UPDATE chatbots SET total_messages = total_messages + 1 WHERE id = $1")
            .bind(&message.chatbot_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)
    }

    async fn count_messages_by_tenant(&self, tenant_id: &str, since: DateTime<Utc>) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chat_messages WHERE tenant_id = $1 AND created_at >= $2")
            .bind(tenant_id)
            .bind(since)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
