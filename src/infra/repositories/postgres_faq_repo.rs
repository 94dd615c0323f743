use crate::domain::{models::faq::Faq, ports::FaqRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

const FAQ_COLUMNS: &str = "id, tenant_id, owner_id, chatbot_id, question, answer, category, is_active, view_count, created_at, updated_at";

pub struct PostgresFaqRepo {
    pool: PgPool,
}

impl PostgresFaqRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FaqRepository for PostgresFaqRepo {
    async fn create(&self, faq: &Faq) -> Result<Faq, AppError> {
        sqlx::query_as::<_, Faq>(&format!(
            "INSERT INTO faqs ({FAQ_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {FAQ_COLUMNS}"
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
        sqlx::query_as::<_, Faq>(&format!("SELECT {FAQ_COLUMNS} FROM faqs WHERE id = $1 AND owner_id = $2"))
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_owner(&self, owner_id: &str, chatbot_id: Option<&str>, category: Option<&str>) -> Result<Vec<Faq>, AppError> {
        sqlx::query_as::<_, Faq>(&format!(
            "SELECT {FAQ_COLUMNS} FROM faqs
             WHERE owner_id = $1 AND ($2::text IS NULL OR chatbot_id = $3) AND ($4::text IS NULL OR category = $5)
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
            "SELECT {FAQ_COLUMNS} FROM faqs WHERE chatbot_id = $1 AND is_active = $2 ORDER BY view_count DESC"
        ))
            .bind(chatbot_id)
            .bind(true)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM faqs WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, faq: &Faq) -> Result<Faq, AppError> {
        sqlx::query_as::<_, Faq>(&format!(
            "UPDATE faqs SET chatbot_id = $1, question = $2, answer = $3, category = $4, is_active = $5, updated_at = $6
             WHERE id = $7 AND owner_id = $8
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
        let result = sqlx::query("DELETE FROM faqs WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_views(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE faqs SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
