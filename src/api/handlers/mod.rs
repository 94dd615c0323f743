pub mod analytics;
pub mod auth;
pub mod chatbot;
pub mod faq;
pub mod health;
pub mod payment;
