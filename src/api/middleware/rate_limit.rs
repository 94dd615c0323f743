use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use crate::api::extractors::{client_ip::client_ip, maybe_auth::MaybeAuthUser};
use crate::domain::services::rate_limiter::{RateLimitDecision, RateLimiter};
use crate::error::AppError;
use crate::state::AppState;

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let reset_secs = decision.reset_after.as_secs_f64().ceil() as u64;
    for (name, value) in [
        ("ratelimit-limit", decision.limit),
        ("ratelimit-remaining", decision.remaining),
        ("ratelimit-reset", reset_secs),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
            headers.insert(name, value);
        }
    }
}

/// Counts the request against `limiter`. Use with
/// `middleware::from_fn_with_state((state, limiter), enforce_rate_limit)`.
pub async fn enforce_rate_limit(
    State((state, limiter)): State<(Arc<AppState>, Arc<RateLimiter>)>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();
    let mut key = client_ip(&parts.headers, &parts.extensions);

    if limiter.policy().per_user {
        let MaybeAuthUser(auth) = match MaybeAuthUser::from_request_parts(&mut parts, &state).await {
            Ok(auth) => auth,
            Err(never) => match never {},
        };
        if let Some(auth) = auth {
            key = format!("{}:{}", key, auth.id());
        }
    }

    let decision = limiter.check(&key).await;
    if !decision.allowed {
        warn!(
            limiter = limiter.policy().name,
            key = %key,
            path = %parts.uri.path(),
            "Rate limit exceeded"
        );
        let mut response = AppError::RateLimited(limiter.policy().message.to_string()).into_response();
        apply_headers(response.headers_mut(), &decision);
        return response;
    }

    let mut response = next.run(Request::from_parts(parts, body)).await;
    // A route-level limiter runs inside the general one; its headers win.
    if !response.headers().contains_key("ratelimit-limit") {
        apply_headers(response.headers_mut(), &decision);
    }
    response
}
