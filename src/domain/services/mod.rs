pub mod auth_service;
pub mod base_service;
pub mod cache_service;
pub mod chatbot_service;
pub mod rate_limiter;
