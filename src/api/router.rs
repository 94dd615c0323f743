use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    classify::ServerErrorsFailureClass,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, info_span, warn, Span};
use uuid::Uuid;

use crate::api::handlers::{analytics, auth, chatbot, faq, health, payment};
use crate::api::middleware::{monitoring, rate_limit::enforce_rate_limit, security};
use crate::config::Config;
use crate::state::AppState;

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config.cors_origins.iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_limit = from_fn_with_state((state.clone(), state.limiters.auth.clone()), enforce_rate_limit);
    let api_limit = from_fn_with_state((state.clone(), state.limiters.api.clone()), enforce_rate_limit);
    let general_limit = from_fn_with_state((state.clone(), state.limiters.general.clone()), enforce_rate_limit);

    let auth_attempts = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh-token", post(auth::refresh_token))
        .route_layer(auth_limit);

    let chat = Router::new()
        .route("/api/chatbots/{id}/message", post(chatbot::send_message))
        .route_layer(api_limit);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/health", get(health::health_check))

        // Auth
        .merge(auth_attempts)
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/profile", get(auth::get_profile).put(auth::update_profile))

        // Chatbots
        .route("/api/chatbots", get(chatbot::list_chatbots).post(chatbot::create_chatbot))
        .route("/api/chatbots/stats", get(chatbot::chatbot_stats))
        .route("/api/chatbots/{id}", get(chatbot::get_chatbot).put(chatbot::update_chatbot).delete(chatbot::delete_chatbot))
        .merge(chat)

        // FAQs
        .route("/api/faqs", get(faq::list_faqs).post(faq::create_faq))
        .route("/api/faqs/category/{category}", get(faq::list_by_category))
        .route("/api/faqs/{id}", get(faq::get_faq).put(faq::update_faq).delete(faq::delete_faq))

        // Payments
        .route("/api/payments", get(payment::list_payments).post(payment::create_payment))
        .route("/api/payments/invoices", get(payment::list_invoices).post(payment::create_invoice))
        .route("/api/payments/{id}/status", patch(payment::update_payment_status))

        // Analytics
        .route("/api/analytics", get(analytics::overview))
        .route("/api/analytics/revenue", get(analytics::revenue))
        .route("/api/analytics/users", get(analytics::users))
        .route("/api/dashboard", get(analytics::dashboard))

        // Innermost first: the last layer added sees the request first.
        .layer(general_limit)
        .layer(from_fn_with_state(state.clone(), security::xss_protection))
        .layer(from_fn_with_state(state.clone(), security::sql_injection_protection))
        .layer(from_fn_with_state(state.clone(), security::sanitize_input))
        .layer(from_fn(security::security_audit))
        .layer(from_fn_with_state(state.clone(), security::ip_filter))
        .layer(from_fn_with_state(state.clone(), security::request_size_limit))
        .layer(from_fn_with_state(state.clone(), monitoring::request_metrics))
        .layer(DefaultBodyLimit::max(state.config.max_request_bytes as usize))
        .layer(cors_layer(&state.config))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        tenant_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
