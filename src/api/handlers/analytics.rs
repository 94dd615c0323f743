use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::api::dtos::requests::AnalyticsQuery;
use crate::api::dtos::responses::ok;
use crate::api::extractors::{auth::AuthUser, role::RequireAdmin};
use crate::api::validation::ValidatedQuery;
use crate::domain::models::{analytics::TimeRange, subscription::LimitedResource, user::Role};
use crate::error::AppError;
use crate::state::AppState;

/// Resolves the tenant a report is scoped to. Only a super admin may look
/// at a tenant other than their own.
async fn report_tenant(state: &AppState, auth: &AuthUser, requested: Option<&str>) -> Result<String, AppError> {
    let Some(requested) = requested.filter(|t| *t != auth.tenant_id()) else {
        return Ok(auth.tenant_id().to_string());
    };
    if auth.user.role() == Role::SuperAdmin
        || state.base_service.validate_tenant_access(auth.id(), requested).await {
        return Ok(requested.to_string());
    }
    warn!(user_id = %auth.id(), tenant_id = requested, "Cross-tenant analytics request denied");
    Err(AppError::Forbidden("Access denied to this tenant".to_string()))
}

fn time_range(query: &AnalyticsQuery) -> TimeRange {
    query.time_range.as_deref().and_then(TimeRange::parse).unwrap_or_default()
}

pub async fn overview(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedQuery(query): ValidatedQuery<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let tenant_id = report_tenant(&state, &auth, query.tenant_id.as_deref()).await?;
    let range = time_range(&query);
    let since = range.since(Utc::now());

    let events = state.repos.analytics.count_by_type(&tenant_id, since).await?;
    let messages = state.repos.chatbots.count_messages_by_tenant(&tenant_id, since).await?;

    Ok(ok(json!({
        "tenantId": tenant_id,
        "timeRange": range,
        "since": since,
        "events": events,
        "totalMessages": messages,
    })))
}

pub async fn revenue(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedQuery(query): ValidatedQuery<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let tenant_id = report_tenant(&state, &auth, query.tenant_id.as_deref()).await?;
    let range = time_range(&query);
    let since = range.since(Utc::now());

    let points = state.repos.payments.revenue_by_day(&tenant_id, since).await?;
    let total_cents: i64 = points.iter().map(|p| p.amount_cents).sum();

    Ok(ok(json!({
        "tenantId": tenant_id,
        "timeRange": range,
        "totalCents": total_cents,
        "daily": points,
    })))
}

pub async fn users(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    ValidatedQuery(query): ValidatedQuery<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let auth = &admin.0;
    let tenant_id = report_tenant(&state, auth, query.tenant_id.as_deref()).await?;
    let range = time_range(&query);

    let stats = state.repos.users.stats_by_tenant(&tenant_id, range.since(Utc::now())).await?;
    Ok(ok(json!({
        "tenantId": tenant_id,
        "timeRange": range,
        "users": stats,
    })))
}

/// Per-user overview: chatbots, FAQs, plan usage and recent payments.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let chatbots = state.repos.chatbots.stats_by_owner(auth.id()).await?;
    let faqs = state.repos.faqs.count_by_owner(auth.id()).await?;
    let subscription = state.repos.subscriptions.find_active(auth.id(), auth.tenant_id()).await?;
    let chatbot_limit = state.base_service
        .check_subscription_limits(auth.id(), auth.tenant_id(), LimitedResource::Chatbots)
        .await?;
    let recent_payments = state.repos.payments.list_by_user(auth.id(), 5, 0).await?;

    Ok(ok(json!({
        "chatbots": chatbots,
        "totalFaqs": faqs,
        "subscription": subscription,
        "chatbotLimit": chatbot_limit,
        "recentPayments": recent_payments,
    })))
}
