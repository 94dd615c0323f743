use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use crate::state::AppState;
use crate::domain::models::{tenant::Tenant, user::User};
use crate::domain::services::auth_service::TokenError;
use crate::error::AppError;
use std::sync::Arc;
use tracing::{error, Span};

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user: User,
    pub tenant: Tenant,
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant.id
    }
}

pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts.headers.get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<AuthUser>() {
            return Ok(resolved.clone());
        }

        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;

        let claims = state.auth_service.verify_access_token(token).map_err(|e| match e {
            TokenError::Expired => AppError::Unauthorized("Token expired".to_string()),
            TokenError::Invalid => AppError::Unauthorized("Invalid token".to_string()),
            TokenError::Other => AppError::AuthenticationFailed,
        })?;

        let inactive = || AppError::Unauthorized("User not found or inactive".to_string());

        let user = state.repos.users.find_by_id(&claims.user_id).await
            .map_err(|e| {
                error!("User lookup failed during authentication: {}", e);
                AppError::AuthenticationFailed
            })?
            .filter(|u| u.is_active)
            .ok_or_else(inactive)?;

        let tenant = state.repos.tenants.find_by_id(&user.tenant_id).await
            .map_err(|e| {
                error!("Tenant lookup failed during authentication: {}", e);
                AppError::AuthenticationFailed
            })?
            .filter(|t| t.is_active)
            .ok_or_else(inactive)?;

        Span::current().record("tenant_id", tenant.id.as_str());
        Span::current().record("user_id", user.id.as_str());

        let resolved = AuthUser { user, tenant };
        parts.extensions.insert(resolved.clone());
        Ok(resolved)
    }
}
