use axum::{extract::{Path, State}, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{ChatMessageRequest, CreateChatbotRequest, PaginationQuery, UpdateChatbotRequest};
use crate::api::dtos::responses::{created, ok, ok_with_message, Paginated, Pagination};
use crate::api::extractors::auth::AuthUser;
use crate::api::validation::{ValidatedJson, ValidatedQuery};
use crate::domain::models::{
    analytics::{AnalyticsEvent, EventType},
    audit::AuditLog,
    chatbot::Chatbot,
    subscription::LimitedResource,
};
use crate::error::AppError;
use crate::state::AppState;

fn not_found() -> AppError {
    AppError::NotFound("Chatbot not found".to_string())
}

/// Loads a chatbot owned by the caller, preferring the cache. Foreign and
/// missing ids are both reported as not found.
async fn load_owned(state: &AppState, auth: &AuthUser, id: &str) -> Result<Chatbot, AppError> {
    if let Ok(Some(cached)) = state.cache.get_cached_chatbot(id).await
        && cached.owner_id == auth.id() {
        return Ok(cached);
    }

    let chatbot = state.repos.chatbots.find_owned(id, auth.id()).await?.ok_or_else(not_found)?;
    let _ = state.cache.cache_chatbot(&chatbot).await;
    Ok(chatbot)
}

pub async fn list_chatbots(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let search = query.search.as_deref().filter(|s| !s.is_empty());
    let items = state.repos.chatbots.list_by_owner(auth.id(), search, query.limit(), query.offset()).await?;
    let total = state.repos.chatbots.count_by_owner(auth.id()).await?;

    Ok(ok(Paginated {
        items,
        pagination: Pagination::new(query.page(), query.limit(), total),
    }))
}

pub async fn create_chatbot(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateChatbotRequest>,
) -> Result<impl IntoResponse, AppError> {
    let limit = state.base_service
        .check_subscription_limits(auth.id(), auth.tenant_id(), LimitedResource::Chatbots)
        .await?;
    if !limit.can_create {
        info!(user_id = %auth.id(), limit = limit.limit, current = limit.current, "Chatbot limit reached");
        return Err(AppError::Forbidden("Chatbot limit reached for your plan".to_string()));
    }

    let mut chatbot = Chatbot::new(auth.tenant_id().to_string(), auth.id().to_string(), payload.name);
    chatbot.description = payload.description;
    chatbot.model = payload.model.unwrap_or_else(|| state.config.openai_model.clone());
    if let Some(personality) = payload.personality {
        chatbot.personality = personality;
    }
    if let Some(temperature) = payload.temperature {
        chatbot.temperature = temperature;
    }
    if let Some(max_tokens) = payload.max_tokens {
        chatbot.max_tokens = max_tokens;
    }
    chatbot.system_prompt = payload.system_prompt;
    chatbot.welcome_message = payload.welcome_message;

    let chatbot = state.base_service.execute_with_logging(
        "create_chatbot",
        auth.id(),
        state.repos.chatbots.create(&chatbot),
    ).await?;
    let _ = state.cache.cache_chatbot(&chatbot).await;

    state.base_service.audit_log(
        AuditLog::new(auth.id(), "CHATBOT_CREATED", "chatbot")
            .tenant(auth.tenant_id())
            .resource_id(&chatbot.id)
            .details(json!({ "name": chatbot.name, "model": chatbot.model })),
    ).await;
    state.base_service.track_analytics(
        AnalyticsEvent::new(EventType::ChatbotCreated, "chatbot", &chatbot.id).by(auth.id(), auth.tenant_id()),
    ).await;

    Ok(created(chatbot, "Chatbot created successfully"))
}

pub async fn chatbot_stats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.repos.chatbots.stats_by_owner(auth.id()).await?;
    Ok(ok(stats))
}

pub async fn get_chatbot(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let chatbot = load_owned(&state, &auth, &id).await?;
    Ok(ok(chatbot))
}

pub async fn update_chatbot(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateChatbotRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut chatbot = state.repos.chatbots.find_owned(&id, auth.id()).await?.ok_or_else(not_found)?;

    if let Some(name) = payload.name {
        chatbot.name = name;
    }
    if payload.description.is_some() {
        chatbot.description = payload.description;
    }
    if let Some(model) = payload.model {
        chatbot.model = model;
    }
    if let Some(personality) = payload.personality {
        chatbot.personality = personality;
    }
    if let Some(temperature) = payload.temperature {
        chatbot.temperature = temperature;
    }
    if let Some(max_tokens) = payload.max_tokens {
        chatbot.max_tokens = max_tokens;
    }
    if payload.system_prompt.is_some() {
        chatbot.system_prompt = payload.system_prompt;
    }
    if payload.welcome_message.is_some() {
        chatbot.welcome_message = payload.welcome_message;
    }
    if let Some(is_active) = payload.is_active {
        chatbot.is_active = is_active;
    }

    let updated = state.repos.chatbots.update(&chatbot).await?;
    let _ = state.cache.invalidate_chatbot(&updated.id).await;

    state.base_service.audit_log(
        AuditLog::new(auth.id(), "CHATBOT_UPDATED", "chatbot").tenant(auth.tenant_id()).resource_id(&updated.id),
    ).await;
    state.base_service.track_analytics(
        AnalyticsEvent::new(EventType::ChatbotUpdated, "chatbot", &updated.id).by(auth.id(), auth.tenant_id()),
    ).await;

    Ok(ok_with_message(updated, "Chatbot updated successfully"))
}

pub async fn delete_chatbot(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.repos.chatbots.delete_owned(&id, auth.id()).await? {
        return Err(not_found());
    }
    let _ = state.cache.invalidate_chatbot(&id).await;

    state.base_service.audit_log(
        AuditLog::new(auth.id(), "CHATBOT_DELETED", "chatbot").tenant(auth.tenant_id()).resource_id(&id),
    ).await;
    state.base_service.track_analytics(
        AnalyticsEvent::new(EventType::ChatbotDeleted, "chatbot", &id).by(auth.id(), auth.tenant_id()),
    ).await;

    info!(chatbot_id = %id, "Chatbot deleted");
    Ok(ok_with_message(json!({ "id": id }), "Chatbot deleted successfully"))
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<ChatMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let chatbot = state.repos.chatbots.find_owned(&id, auth.id()).await?.ok_or_else(not_found)?;
    let reply = state.chatbot_service.reply(&auth.user, &chatbot, &payload.message, payload.session_id).await?;
    // total_messages changed; drop the cached copy.
    let _ = state.cache.invalidate_chatbot(&chatbot.id).await;
    Ok(ok(reply))
}
