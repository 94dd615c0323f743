use axum::{extract::State, response::IntoResponse};
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::dtos::requests::{LoginRequest, LogoutRequest, RefreshTokenRequest, RegisterRequest, UpdateProfileRequest};
use crate::api::dtos::responses::{created, ok, ok_with_message};
use crate::api::extractors::{auth::AuthUser, client_ip::ClientIp};
use crate::api::validation::ValidatedJson;
use crate::domain::models::{
    analytics::{AnalyticsEvent, EventType},
    audit::AuditLog,
    auth::{AuthResponse, SessionRecord},
    subscription::{Plan, Subscription},
    tenant::Tenant,
    user::{User, UserProfile},
};
use crate::error::AppError;
use crate::state::AppState;

const DUPLICATE_EMAIL: &str = "User with this email already exists";

pub async fn register(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.to_lowercase();
    if state.repos.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(DUPLICATE_EMAIL.to_string()));
    }

    let password_hash = state.auth_service.hash_password(&payload.password)?;
    let tenant_name = payload.company_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("{} {}", payload.first_name, payload.last_name));
    let tenant = state.repos.tenants.create(&Tenant::new(tenant_name, None)).await?;

    let user = User::new(tenant.id.clone(), email, password_hash, payload.first_name, payload.last_name);
    let user = state.repos.users.create(&user).await.map_err(|e| match e.status() {
        StatusCode::CONFLICT => AppError::Conflict(DUPLICATE_EMAIL.to_string()),
        _ => e,
    })?;
    state.repos.subscriptions
        .create(&Subscription::trial(user.id.clone(), tenant.id.clone(), Plan::Starter))
        .await?;

    let tokens = state.auth_service.generate_tokens(&user)?;

    state.base_service.audit_log(
        AuditLog::new(&user.id, "USER_REGISTERED", "user")
            .tenant(&tenant.id)
            .resource_id(&user.id)
            .details(json!({ "ip": ip })),
    ).await;
    state.base_service.track_analytics(
        AnalyticsEvent::new(EventType::UserRegistered, "user", &user.id).by(&user.id, &tenant.id),
    ).await;

    info!(user_id = %user.id, tenant_id = %tenant.id, "User registered");
    Ok(created(
        AuthResponse {
            user: UserProfile::from(&user),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        },
        "User registered successfully",
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = state.repos.users.find_by_email(&payload.email.to_lowercase()).await?
        .ok_or_else(invalid)?;
    if !state.auth_service.verify_password(&payload.password, &user.password_hash) {
        warn!(user_id = %user.id, ip = %ip, "Login with wrong password");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(AppError::Unauthorized("User not found or inactive".to_string()));
    }
    let tenant_active = state.repos.tenants.find_by_id(&user.tenant_id).await?
        .is_some_and(|t| t.is_active);
    if !tenant_active {
        return Err(AppError::Unauthorized("User not found or inactive".to_string()));
    }

    let now = Utc::now();
    state.repos.users.touch_last_login(&user.id, now).await?;
    let user = User { last_login_at: Some(now), ..user };
    let tokens = state.auth_service.generate_tokens(&user)?;

    let _ = state.cache.cache_session(&SessionRecord {
        user_id: user.id.clone(),
        tenant_id: user.tenant_id.clone(),
        ip: ip.clone(),
        logged_in_at: now,
    }).await;
    let _ = state.cache.cache_user(&user).await;

    state.base_service.track_analytics(
        AnalyticsEvent::new(EventType::UserLogin, "user", &user.id)
            .by(&user.id, &user.tenant_id)
            .data(json!({ "ip": ip })),
    ).await;

    info!(user_id = %user.id, "User logged in");
    Ok(ok_with_message(
        AuthResponse {
            user: UserProfile::from(&user),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        },
        "Login successful",
    ))
}

/// Exchanges a refresh token for a new pair. The presented token is revoked.
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let claims = state.auth_service.verify_refresh_token(&payload.refresh_token).await
        .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    let user = state.repos.users.find_by_id(&claims.user_id).await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found or inactive".to_string()))?;

    let tokens = state.auth_service.generate_tokens(&user)?;
    if let Err(e) = state.auth_service.revoke_refresh_token(&payload.refresh_token).await {
        warn!(user_id = %user.id, error = %e, "Could not revoke rotated refresh token");
    }

    info!(user_id = %user.id, "Tokens refreshed");
    Ok(ok(tokens))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<LogoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = payload.refresh_token.as_deref()
        && let Err(e) = state.auth_service.revoke_refresh_token(token).await {
        warn!(user_id = %auth.id(), error = %e, "Refresh token not revoked on logout");
    }
    let _ = state.cache.del(&format!("session:{}", auth.id())).await;
    let _ = state.cache.invalidate_user(auth.id()).await;

    state.base_service.audit_log(
        AuditLog::new(auth.id(), "USER_LOGOUT", "user").tenant(auth.tenant_id()).resource_id(auth.id()),
    ).await;

    info!(user_id = %auth.id(), "User logged out");
    Ok(ok_with_message(json!(null), "Logged out successfully"))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let _ = state.cache.cache_user(&auth.user).await;
    Ok(ok(json!({
        "user": UserProfile::from(&auth.user),
        "tenant": auth.tenant,
    })))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = auth.user.clone();
    if let Some(first_name) = payload.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = payload.last_name {
        user.last_name = last_name;
    }

    let updated = state.base_service.execute_with_logging(
        "update_profile",
        auth.id(),
        state.repos.users.update_profile(&user),
    ).await?;
    let _ = state.cache.invalidate_user(&updated.id).await;

    state.base_service.audit_log(
        AuditLog::new(auth.id(), "PROFILE_UPDATED", "user").tenant(auth.tenant_id()).resource_id(auth.id()),
    ).await;

    Ok(ok_with_message(UserProfile::from(&updated), "Profile updated successfully"))
}
