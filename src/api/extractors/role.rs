use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::domain::models::user::Role;
use crate::error::AppError;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

pub trait AllowedRoles: Send + Sync {
    const ROLES: &'static [Role];
}

pub struct Admins;
impl AllowedRoles for Admins {
    const ROLES: &'static [Role] = &[Role::Admin, Role::SuperAdmin];
}

pub struct SuperAdmins;
impl AllowedRoles for SuperAdmins {
    const ROLES: &'static [Role] = &[Role::SuperAdmin];
}

/// An authenticated caller whose role is one of `R::ROLES`.
pub struct RequireRole<R: AllowedRoles>(pub AuthUser, PhantomData<R>);

pub type RequireAdmin = RequireRole<Admins>;
pub type RequireSuperAdmin = RequireRole<SuperAdmins>;

impl<R: AllowedRoles> FromRequestParts<Arc<AppState>> for RequireRole<R> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let role = auth.user.role();
        if !R::ROLES.contains(&role) {
            warn!(user_id = %auth.user.id, %role, path = %parts.uri.path(), "Role check failed");
            return Err(AppError::Forbidden("Insufficient permissions".to_string()));
        }
        Ok(RequireRole(auth, PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_super_admin_passes_every_gate() {
        assert!(Admins::ROLES.contains(&Role::SuperAdmin));
        assert!(SuperAdmins::ROLES.contains(&Role::SuperAdmin));
        assert!(!SuperAdmins::ROLES.contains(&Role::Admin));
        assert!(!Admins::ROLES.contains(&Role::User));
    }
}
