use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

/// Like `AuthUser`, but any failure leaves the caller anonymous.
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<Arc<AppState>> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(e) => {
                debug!("Optional auth ignored: {}", e);
                Ok(MaybeAuthUser(None))
            }
        }
    }
}
