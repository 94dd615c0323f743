pub mod analytics;
pub mod audit;
pub mod auth;
pub mod chatbot;
pub mod faq;
pub mod payment;
pub mod subscription;
pub mod tenant;
pub mod user;
