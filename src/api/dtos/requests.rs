use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::domain::models::chatbot::CHATBOT_MODELS;
use crate::domain::models::payment::{INVOICE_STATUSES, PAYMENT_PROVIDERS, PAYMENT_STATUSES};

pub const PERSONALITIES: [&str; 5] = ["professional", "friendly", "casual", "formal", "enthusiastic"];
const PASSWORD_SPECIALS: &str = "@$!%*?&#^()_-+=.,;:";

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    let strong = password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if strong {
        Ok(())
    } else {
        Err(invalid(
            "password_complexity",
            "Password must be at least 8 characters and contain uppercase, lowercase, number and special character",
        ))
    }
}

fn validate_person_name(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if (1..=50).contains(&len) && name.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '\'' || c == '-') {
        Ok(())
    } else {
        Err(invalid("name", "Name must be 1-50 letters, spaces, apostrophes or hyphens"))
    }
}

fn validate_chatbot_name(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '\'' | '!' | '?');
    if (1..=100).contains(&len) && name.chars().all(allowed) {
        Ok(())
    } else {
        Err(invalid("chatbot_name", "Chatbot name must be 1-100 characters of letters, numbers and basic punctuation"))
    }
}

fn validate_model(model: &str) -> Result<(), ValidationError> {
    if CHATBOT_MODELS.contains(&model) {
        Ok(())
    } else {
        Err(invalid("one_of", "Model must be one of gpt-3.5-turbo, gpt-4, gpt-4-turbo, gpt-4o, gpt-4o-mini"))
    }
}

fn validate_personality(personality: &str) -> Result<(), ValidationError> {
    if PERSONALITIES.contains(&personality) {
        Ok(())
    } else {
        Err(invalid("one_of", "Personality must be one of professional, friendly, casual, formal, enthusiastic"))
    }
}

fn validate_uuid(raw: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(raw).map(|_| ()).map_err(|_| invalid("uuid", "Must be a valid UUID"))
}

fn validate_currency(raw: &str) -> Result<(), ValidationError> {
    if raw.len() == 3 && raw.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(invalid("currency", "Currency must be a 3-letter ISO code"))
    }
}

fn validate_provider(raw: &str) -> Result<(), ValidationError> {
    if PAYMENT_PROVIDERS.contains(&raw) {
        Ok(())
    } else {
        Err(invalid("one_of", "Provider must be STRIPE or PAYPAL"))
    }
}

fn validate_payment_status(raw: &str) -> Result<(), ValidationError> {
    if PAYMENT_STATUSES.contains(&raw) {
        Ok(())
    } else {
        Err(invalid("one_of", "Status must be one of PENDING, COMPLETED, FAILED, REFUNDED"))
    }
}

fn validate_invoice_status(raw: &str) -> Result<(), ValidationError> {
    if INVOICE_STATUSES.contains(&raw) {
        Ok(())
    } else {
        Err(invalid("one_of", "Status must be one of DRAFT, ISSUED, PAID, VOID"))
    }
}

fn validate_time_range(raw: &str) -> Result<(), ValidationError> {
    if ["7d", "30d", "90d", "1y"].contains(&raw) {
        Ok(())
    } else {
        Err(invalid("one_of", "Time range must be one of 7d, 30d, 90d, 1y"))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Please provide a valid email address"), length(max = 255))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[validate(custom(function = "validate_person_name"))]
    pub first_name: String,
    #[validate(custom(function = "validate_person_name"))]
    pub last_name: String,
    #[validate(length(min = 1, max = 100, message = "Company name must be 1-100 characters"))]
    pub company_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(custom(function = "validate_person_name"))]
    pub first_name: Option<String>,
    #[validate(custom(function = "validate_person_name"))]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatbotRequest {
    #[validate(custom(function = "validate_chatbot_name"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_model"))]
    pub model: Option<String>,
    #[validate(custom(function = "validate_personality"))]
    pub personality: Option<String>,
    #[validate(range(min = 0.0, max = 2.0, message = "Temperature must be between 0 and 2"))]
    pub temperature: Option<f64>,
    #[validate(range(min = 100, max = 4000, message = "Max tokens must be between 100 and 4000"))]
    pub max_tokens: Option<i32>,
    #[validate(length(max = 2000, message = "System prompt must be at most 2000 characters"))]
    pub system_prompt: Option<String>,
    #[validate(length(max = 500, message = "Welcome message must be at most 500 characters"))]
    pub welcome_message: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChatbotRequest {
    #[validate(custom(function = "validate_chatbot_name"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_model"))]
    pub model: Option<String>,
    #[validate(custom(function = "validate_personality"))]
    pub personality: Option<String>,
    #[validate(range(min = 0.0, max = 2.0, message = "Temperature must be between 0 and 2"))]
    pub temperature: Option<f64>,
    #[validate(range(min = 100, max = 4000, message = "Max tokens must be between 100 and 4000"))]
    pub max_tokens: Option<i32>,
    #[validate(length(max = 2000, message = "System prompt must be at most 2000 characters"))]
    pub system_prompt: Option<String>,
    #[validate(length(max = 500, message = "Welcome message must be at most 500 characters"))]
    pub welcome_message: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
    #[validate(length(min = 1, max = 100))]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFaqRequest {
    #[validate(length(min = 5, max = 500, message = "Question must be 5-500 characters"))]
    pub question: String,
    #[validate(length(min = 1, max = 5000, message = "Answer must be 1-5000 characters"))]
    pub answer: String,
    #[validate(length(min = 1, max = 50, message = "Category must be 1-50 characters"))]
    pub category: Option<String>,
    #[validate(custom(function = "validate_uuid"))]
    pub chatbot_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFaqRequest {
    #[validate(length(min = 5, max = 500, message = "Question must be 5-500 characters"))]
    pub question: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "Answer must be 1-5000 characters"))]
    pub answer: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Category must be 1-50 characters"))]
    pub category: Option<String>,
    #[validate(custom(function = "validate_uuid"))]
    pub chatbot_id: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FaqListQuery {
    #[validate(custom(function = "validate_uuid"))]
    pub chatbot_id: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[validate(range(min = 0.01, max = 1_000_000.0, message = "Amount must be between 0.01 and 1000000"))]
    pub amount: f64,
    #[validate(custom(function = "validate_currency"))]
    pub currency: String,
    #[validate(custom(function = "validate_provider"))]
    pub provider: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(url(message = "Webhook URL must be a valid URL"))]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentStatusRequest {
    #[validate(custom(function = "validate_payment_status"))]
    pub status: String,
    #[validate(length(min = 1, max = 255))]
    pub external_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    #[validate(range(min = 0.01, max = 1_000_000.0, message = "Amount must be between 0.01 and 1000000"))]
    pub amount: f64,
    #[validate(custom(function = "validate_currency"))]
    pub currency: String,
    #[validate(range(min = 0, max = 365, message = "Due days must be between 0 and 365"))]
    pub due_in_days: Option<i64>,
    #[validate(custom(function = "validate_uuid"))]
    pub payment_id: Option<String>,
    #[validate(custom(function = "validate_invoice_status"))]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    #[validate(range(min = 1, max = 10_000, message = "Page must be between 1 and 10000"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
    #[validate(length(max = 100))]
    pub search: Option<String>,
}

impl PaginationQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    #[validate(custom(function = "validate_time_range"))]
    pub time_range: Option<String>,
    #[validate(custom(function = "validate_uuid"))]
    pub tenant_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(password: &str, first_name: &str) -> RegisterRequest {
        RegisterRequest {
            email: "owner@shop.example".into(),
            password: password.into(),
            first_name: first_name.into(),
            last_name: "O'Neil-Smith".into(),
            company_name: None,
        }
    }

    #[test]
    fn test_password_complexity() {
        assert!(register("Str0ng!Pass", "Ann").validate().is_ok());
        for weak in ["short1!", "alllowercase1!", "ALLUPPER1!", "NoDigits!!", "NoSpecial12"] {
            let errors = register(weak, "Ann").validate().unwrap_err();
            assert!(errors.field_errors().contains_key("password"), "{} should be rejected", weak);
        }
    }

    #[test]
    fn test_name_charset() {
        assert!(register("Str0ng!Pass", "Ann Marie").validate().is_ok());
        assert!(register("Str0ng!Pass", "Ann2").validate().is_err());
        assert!(register("Str0ng!Pass", "").validate().is_err());
    }

    #[test]
    fn test_chatbot_enums_and_ranges() {
        let request = CreateChatbotRequest {
            name: "Support Bot".into(),
            description: None,
            model: Some("gpt-5".into()),
            personality: Some("grumpy".into()),
            temperature: Some(2.5),
            max_tokens: Some(50),
            system_prompt: None,
            welcome_message: None,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["model", "personality", "temperature", "max_tokens"] {
            assert!(fields.contains_key(field), "{} should fail", field);
        }
    }

    #[test]
    fn test_pagination_defaults() {
        let query = PaginationQuery { page: None, limit: None, search: None };
        assert_eq!((query.page(), query.limit(), query.offset()), (1, 10, 0));
        let query = PaginationQuery { page: Some(3), limit: Some(20), search: None };
        assert_eq!(query.offset(), 40);
        assert!(PaginationQuery { page: Some(0), limit: Some(101), search: None }.validate().is_err());
    }

    #[test]
    fn test_huge_page_is_rejected_and_offset_never_overflows() {
        let query = PaginationQuery { page: Some(i64::MAX), limit: Some(100), search: None };
        assert!(query.validate().unwrap_err().field_errors().contains_key("page"));
        assert_eq!(query.offset(), i64::MAX);
        assert!(PaginationQuery { page: Some(10_000), limit: Some(100), search: None }.validate().is_ok());
    }

    #[test]
    fn test_amount_has_an_upper_bound() {
        let payment = CreatePaymentRequest {
            amount: 1e300,
            currency: "USD".into(),
            provider: "STRIPE".into(),
            description: None,
            webhook_url: None,
        };
        assert!(payment.validate().unwrap_err().field_errors().contains_key("amount"));
        let payment = CreatePaymentRequest { amount: 1_000_000.0, ..payment };
        assert!(payment.validate().is_ok());
    }
}
