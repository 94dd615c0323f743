use crate::domain::models::{
    tenant::Tenant, user::User, subscription::Subscription,
    chatbot::{Chatbot, ChatMessage, ChatbotStats}, faq::Faq,
    payment::{Payment, Invoice, RevenuePoint}, audit::AuditLog,
    analytics::{AnalyticsEvent, EventCount, UserStats},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create(&self, tenant: &Tenant) -> Result<Tenant, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Tenant>, AppError>;
    async fn set_active(&self, id: &str, is_active: bool) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn update_profile(&self, user: &User) -> Result<User, AppError>;
    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn set_active(&self, id: &str, is_active: bool) -> Result<(), AppError>;
    async fn set_role(&self, id: &str, role: &str) -> Result<(), AppError>;
    async fn count_active_by_tenant(&self, tenant_id: &str) -> Result<i64, AppError>;
    async fn stats_by_tenant(&self, tenant_id: &str, since: DateTime<Utc>) -> Result<UserStats, AppError>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, subscription: &Subscription) -> Result<Subscription, AppError>;
    async fn find_active(&self, user_id: &str, tenant_id: &str) -> Result<Option<Subscription>, AppError>;
    async fn update_status(&self, id: &str, status: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait ChatbotRepository: Send + Sync {
    async fn create(&self, chatbot: &Chatbot) -> Result<Chatbot, AppError>;
    async fn find_owned(&self, id: &str, owner_id: &str) -> Result<Option<Chatbot>, AppError>;
    async fn list_by_owner(&self, owner_id: &str, search: Option<&str>, limit: i64, offset: i64) -> Result<Vec<Chatbot>, AppError>;
    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, AppError>;
    async fn update(&self, chatbot: &Chatbot) -> Result<Chatbot, AppError>;
    async fn delete_owned(&self, id: &str, owner_id: &str) -> Result<bool, AppError>;
    async fn stats_by_owner(&self, owner_id: &str) -> Result<ChatbotStats, AppError>;
    async fn record_message(&self, message: &ChatMessage) -> Result<(), AppError>;
    async fn count_messages_by_tenant(&self, tenant_id: &str, since: DateTime<Utc>) -> Result<i64, AppError>;
}

#[async_trait]
pub trait FaqRepository: Send + Sync {
    async fn create(&self, faq: &Faq) -> Result<Faq, AppError>;
    async fn find_owned(&self, id: &str, owner_id: &str) -> Result<Option<Faq>, AppError>;
    async fn list_by_owner(&self, owner_id: &str, chatbot_id: Option<&str>, category: Option<&str>) -> Result<Vec<Faq>, AppError>;
    async fn list_active_for_chatbot(&self, chatbot_id: &str) -> Result<Vec<Faq>, AppError>;
    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, AppError>;
    async fn update(&self, faq: &Faq) -> Result<Faq, AppError>;
    async fn delete_owned(&self, id: &str, owner_id: &str) -> Result<bool, AppError>;
    async fn increment_views(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: &Payment) -> Result<Payment, AppError>;
    async fn find_owned(&self, id: &str, user_id: &str) -> Result<Option<Payment>, AppError>;
    async fn find_in_tenant(&self, id: &str, tenant_id: &str) -> Result<Option<Payment>, AppError>;
    async fn list_by_user(&self, user_id: &str, limit: i64, offset: i64) -> Result<Vec<Payment>, AppError>;
    async fn update_status(&self, id: &str, status: &str) -> Result<Payment, AppError>;
    async fn revenue_by_day(&self, tenant_id: &str, since: DateTime<Utc>) -> Result<Vec<RevenuePoint>, AppError>;

    async fn create_invoice(&self, invoice: &Invoice) -> Result<Invoice, AppError>;
    async fn find_invoice_owned(&self, id: &str, user_id: &str) -> Result<Option<Invoice>, AppError>;
    async fn list_invoices_by_user(&self, user_id: &str) -> Result<Vec<Invoice>, AppError>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: &AuditLog) -> Result<(), AppError>;
}

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn append(&self, event: &AnalyticsEvent) -> Result<(), AppError>;
    async fn count_by_type(&self, tenant_id: &str, since: DateTime<Utc>) -> Result<Vec<EventCount>, AppError>;
}

#[async_trait]
pub trait HealthRepository: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;
}

pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub user_message: &'a str,
    pub temperature: f64,
    pub max_tokens: i32,
}

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<String, AppError>;
}

/// The cache backend could not be reached or refused the command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cache unavailable: {0}")]
pub struct CacheUnavailable(pub String);

/// Raw key-value store behind `CacheService`. Values are opaque strings.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheUnavailable>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheUnavailable>;
    async fn del(&self, key: &str) -> Result<bool, CacheUnavailable>;
    async fn exists(&self, key: &str) -> Result<bool, CacheUnavailable>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheUnavailable>;
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, CacheUnavailable>;
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheUnavailable>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheUnavailable>;
    async fn hdel(&self, key: &str, field: &str) -> Result<bool, CacheUnavailable>;
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheUnavailable>;
    async fn ping(&self) -> Result<(), CacheUnavailable>;
    async fn close(&self);
}
