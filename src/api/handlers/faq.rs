use axum::{extract::{Path, State}, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::api::dtos::requests::{CreateFaqRequest, FaqListQuery, UpdateFaqRequest};
use crate::api::dtos::responses::{created, ok, ok_with_message};
use crate::api::extractors::auth::AuthUser;
use crate::api::validation::{ValidatedJson, ValidatedQuery};
use crate::domain::models::{
    analytics::{AnalyticsEvent, EventType},
    audit::AuditLog,
    faq::Faq,
};
use crate::domain::services::base_service::ResourceKind;
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_CATEGORY: &str = "general";

fn not_found() -> AppError {
    AppError::NotFound("FAQ not found".to_string())
}

async fn ensure_chatbot_owned(state: &AppState, auth: &AuthUser, chatbot_id: Option<&str>) -> Result<(), AppError> {
    if let Some(chatbot_id) = chatbot_id
        && !state.base_service.check_resource_ownership(ResourceKind::Chatbot, chatbot_id, auth.id()).await? {
        return Err(AppError::NotFound("Chatbot not found".to_string()));
    }
    Ok(())
}

pub async fn list_faqs(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedQuery(query): ValidatedQuery<FaqListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let faqs = state.repos.faqs
        .list_by_owner(auth.id(), query.chatbot_id.as_deref(), query.category.as_deref())
        .await?;
    Ok(ok(faqs))
}

pub async fn list_by_category(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let faqs = state.repos.faqs.list_by_owner(auth.id(), None, Some(&category)).await?;
    Ok(ok(faqs))
}

pub async fn create_faq(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateFaqRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_chatbot_owned(&state, &auth, payload.chatbot_id.as_deref()).await?;

    let category = payload.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let mut faq = Faq::new(auth.tenant_id().to_string(), auth.id().to_string(), payload.question, payload.answer, category);
    faq.chatbot_id = payload.chatbot_id;

    let faq = state.repos.faqs.create(&faq).await?;

    state.base_service.audit_log(
        AuditLog::new(auth.id(), "FAQ_CREATED", "faq").tenant(auth.tenant_id()).resource_id(&faq.id),
    ).await;
    state.base_service.track_analytics(
        AnalyticsEvent::new(EventType::FaqCreated, "faq", &faq.id)
            .by(auth.id(), auth.tenant_id())
            .data(json!({ "category": faq.category })),
    ).await;

    Ok(created(faq, "FAQ created successfully"))
}

pub async fn get_faq(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let faq = state.repos.faqs.find_owned(&id, auth.id()).await?.ok_or_else(not_found)?;

    if let Err(e) = state.repos.faqs.increment_views(&faq.id).await {
        warn!(faq_id = %faq.id, error = %e, "Failed to bump FAQ view count");
    }
    state.base_service.track_analytics(
        AnalyticsEvent::new(EventType::FaqViewed, "faq", &faq.id).by(auth.id(), auth.tenant_id()),
    ).await;

    Ok(ok(faq))
}

pub async fn update_faq(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateFaqRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut faq = state.repos.faqs.find_owned(&id, auth.id()).await?.ok_or_else(not_found)?;
    ensure_chatbot_owned(&state, &auth, payload.chatbot_id.as_deref()).await?;

    if let Some(question) = payload.question {
        faq.question = question;
    }
    if let Some(answer) = payload.answer {
        faq.answer = answer;
    }
    if let Some(category) = payload.category {
        faq.category = category;
    }
    if payload.chatbot_id.is_some() {
        faq.chatbot_id = payload.chatbot_id;
    }
    if let Some(is_active) = payload.is_active {
        faq.is_active = is_active;
    }

    let updated = state.repos.faqs.update(&faq).await?;
    state.base_service.audit_log(
        AuditLog::new(auth.id(), "FAQ_UPDATED", "faq").tenant(auth.tenant_id()).resource_id(&updated.id),
    ).await;

    Ok(ok_with_message(updated, "FAQ updated successfully"))
}

pub async fn delete_faq(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.repos.faqs.delete_owned(&id, auth.id()).await? {
        return Err(not_found());
    }
    state.base_service.audit_log(
        AuditLog::new(auth.id(), "FAQ_DELETED", "faq").tenant(auth.tenant_id()).resource_id(&id),
    ).await;

    Ok(ok_with_message(json!({ "id": id }), "FAQ deleted successfully"))
}
