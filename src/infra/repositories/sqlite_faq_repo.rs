use crate::domain::{models::faq::Faq, ports::FaqRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

const FAQ_COLUMNS: &str = "id, tenant_id, owner_id, chatbot_id, question, answer, category, is_active, view_count, created_at, updated_at";

pub struct SqliteFaqRepo {
    pool: SqlitePool,
}

impl SqliteFaqRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FaqRepository for SqliteFaqRepo {
    async fn create(&self, faq: &Faq) -> Result<Faq, AppError> {
        sqlx::query_as::<_, Faq>(&format!(
            "INSERT INTO faqs ({FAQ_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {FAQ_COLUMNS}"
        ))
            .bind(&faq.id)
            .bind(&faq.tenant_id)
            .bind(&faq.owner_id)
            .bind(&faq.chatbot_id)
            .bind(&faq.question)
            .bind(&faq.answer)
            .bind(&faq.category)
            .bind(faq.is_active)
            .bind(faq.view_count)
            .bind(faq.created_at)
            .bind(faq.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_owned(&self, id: &str, owner_id: &str) -> Result<Option<Faq>, AppError> {
        sqlx::query_as::<_, Faq>(&format!("SELECT {FAQ_COLUMNS} FROM faqs WHERE id = ? AND owner_id = ?"))
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_owner(&self, owner_id: &str, chatbot_id: Option<&str>, category: Option<&str>) -> Result<Vec<Faq>, AppError> {
        sqlx::query_as::<_, Faq>(&format!(
            "SELECT {FAQ_COLUMNS} FROM faqs
             WHERE owner_id = ? AND (? IS NULL OR chatbot_id = ?) AND (? IS NULL OR category = ?)
             ORDER BY category ASC, created_at DESC"
        ))
            .bind(owner_id)
            .bind(chatbot_id)
            .bind(chatbot_id)
            .bind(category)
            .bind(category)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_active_for_chatbot(&self, chatbot_id: &str) -> Result<Vec<Faq>, AppError> {
        sqlx::query_as::<_, Faq>(&format!(
            "SELECT {FAQ_COLUMNS} FROM faqs WHERE chatbot_id = ? AND is_active = ? ORDER BY view_count DESC"
        ))
            .bind(chatbot_id)
            .bind(true)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM faqs WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, faq: &Faq) -> Result<Faq, AppError> {
        sqlx::query_as::<_, Faq>(&format!(
            "UPDATE faqs SET chatbot_id = ?, question = ?, answer = ?, category = ?, is_active = ?, updated_at = ?
             WHERE id = ? AND owner_id = ?
             RETURNING {FAQ_COLUMNS}"
        ))
            .bind(&faq.chatbot_id)
            .bind(&faq.question)
            .bind(&faq.answer)
            .bind(&faq.category)
            .bind(faq.is_active)
            .bind(Utc::now())
            .bind(&faq.id)
            .bind(&faq.owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn delete_owned(&self, id: &str, owner_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM faqs WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_views(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE faqs SET view_count = view_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
