pub mod sqlite_tenant_repo;
pub mod sqlite_user_repo;
pub mod sqlite_subscription_repo;
pub mod sqlite_chatbot_repo;
pub mod sqlite_faq_repo;
pub mod sqlite_payment_repo;
pub mod sqlite_activity_repo;

pub mod postgres_tenant_repo;
pub mod postgres_user_repo;
pub mod postgres_subscription_repo;
pub mod postgres_chatbot_repo;
pub mod postgres_faq_repo;
pub mod postgres_payment_repo;
pub mod postgres_activity_repo;
