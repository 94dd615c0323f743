use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header, request::Parts, uri::PathAndQuery, HeaderValue, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use regex::{Regex, RegexSet};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

use crate::api::extractors::client_ip::client_ip;
use crate::api::validation::is_sensitive_key;
use crate::error::AppError;
use crate::state::AppState;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static JAVASCRIPT_URI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").expect("valid regex"));
static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bon\w+\s*=").expect("valid regex"));

static SQL_INJECTION: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\bunion\b\s+(all\s+)?\bselect\b",
        r"(?i)\bselect\b.+\bfrom\b.+\bwhere\b.+=",
        r"(?i)\binsert\s+into\b\s+\w+.*\bvalues\b",
        r"(?i)\bdelete\s+from\b\s+\w+",
        r"(?i)\bdrop\s+(table|database)\b",
        r"(?i);\s*(drop|delete|truncate|alter|update|insert)\b",
        r"(?i)'\s*or\s+'?\w+'?\s*=\s*'?\w+",
        r"'\s*(--|#|/\*)",
        r"(?i)\bexec(\s|\()+xp_\w+",
    ])
    .expect("valid regex")
});

static XSS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)<\s*script\b",
        r"(?i)<\s*/\s*script\s*>",
        r"(?i)javascript\s*:",
        r"(?i)vbscript\s*:",
        r"(?i)\bon\w+\s*=",
        r"(?i)<\s*(iframe|object|embed|applet|meta|link)\b",
        r"(?i)expression\s*\(",
        r"(?i)data\s*:\s*text/html",
    ])
    .expect("valid regex")
});

static BOT_AGENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)bot|crawler|spider|scraper|curl|wget|python-requests").expect("valid regex"));

/// Removes script blocks, `javascript:` URIs and inline event handlers.
pub fn strip_dangerous(raw: &str) -> String {
    let cleaned = SCRIPT_BLOCK.replace_all(raw, "");
    let cleaned = JAVASCRIPT_URI.replace_all(&cleaned, "");
    let cleaned = EVENT_HANDLER.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

fn strip_value(value: &mut Value) {
    match value {
        Value::String(s) => *s = strip_dangerous(s),
        Value::Array(items) => items.iter_mut().for_each(strip_value),
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                if !is_sensitive_key(key) {
                    strip_value(item);
                }
            }
        }
        _ => {}
    }
}

fn string_leaves<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|item| string_leaves(item, out)),
        Value::Object(map) => {
            for (key, item) in map {
                if !is_sensitive_key(key) {
                    string_leaves(item, out);
                }
            }
        }
        _ => {}
    }
}

pub fn looks_like_sql_injection(input: &str) -> bool {
    SQL_INJECTION.is_match(input)
}

pub fn looks_like_xss(input: &str) -> bool {
    XSS.is_match(input)
}

fn is_json(parts: &Parts) -> bool {
    parts.headers.get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

async fn buffer_body(req: Request, limit: u64) -> Result<(Parts, Bytes), Response> {
    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, limit as usize)
        .await
        .map_err(|_| AppError::PayloadTooLarge.into_response())?;
    Ok((parts, bytes))
}

fn rebuild(mut parts: Parts, bytes: Bytes) -> Request {
    if let Ok(len) = HeaderValue::from_str(&bytes.len().to_string())
        && parts.headers.contains_key(header::CONTENT_LENGTH) {
        parts.headers.insert(header::CONTENT_LENGTH, len);
    }
    Request::from_parts(parts, Body::from(bytes))
}

fn decoded_query(uri: &Uri) -> Vec<(String, String)> {
    url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Every user-controlled string on the request: query values, path
/// segments and JSON body leaves. Sensitive keys are skipped.
fn request_strings(parts: &Parts, body: Option<&Value>) -> Vec<String> {
    let mut out: Vec<String> = decoded_query(&parts.uri)
        .into_iter()
        .filter(|(k, _)| !is_sensitive_key(k))
        .map(|(_, v)| v)
        .collect();

    out.extend(parts.uri.path().split('/').filter(|s| !s.is_empty()).map(|segment| {
        url::form_urlencoded::parse(format!("s={}", segment).as_bytes())
            .next()
            .map(|(_, v)| v.into_owned())
            .unwrap_or_else(|| segment.to_string())
    }));

    if let Some(body) = body {
        let mut leaves = Vec::new();
        string_leaves(body, &mut leaves);
        out.extend(leaves.into_iter().map(str::to_string));
    }
    out
}

fn reject(kind: &str, parts: &Parts) -> Response {
    warn!(
        ip = %client_ip(&parts.headers, &parts.extensions),
        path = %parts.uri.path(),
        method = %parts.method,
        "{} attempt detected",
        kind
    );
    AppError::BadRequest("Invalid request".to_string()).into_response()
}

async fn scan(state: &AppState, req: Request, next: Next, kind: &str, detector: fn(&str) -> bool) -> Response {
    let (parts, bytes) = match buffer_body(req, state.config.max_request_bytes).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };

    let body = if is_json(&parts) && !bytes.is_empty() {
        serde_json::from_slice::<Value>(&bytes).ok()
    } else {
        None
    };

    if request_strings(&parts, body.as_ref()).iter().any(|s| detector(s)) {
        return reject(kind, &parts);
    }

    next.run(rebuild(parts, bytes)).await
}

/// Strips script content from the query string and JSON body, rewriting
/// the request before it reaches the detectors and handlers.
pub async fn sanitize_input(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let (mut parts, bytes) = match buffer_body(req, state.config.max_request_bytes).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };

    if parts.uri.query().is_some() {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in decoded_query(&parts.uri) {
            if is_sensitive_key(&key) {
                query.append_pair(&key, &value);
            } else {
                query.append_pair(&key, &strip_dangerous(&value));
            }
        }
        let rebuilt = format!("{}?{}", parts.uri.path(), query.finish());
        if let Ok(path_and_query) = rebuilt.parse::<PathAndQuery>() {
            let mut uri_parts = parts.uri.clone().into_parts();
            uri_parts.path_and_query = Some(path_and_query);
            if let Ok(uri) = Uri::from_parts(uri_parts) {
                parts.uri = uri;
            }
        }
    }

    let bytes = if is_json(&parts) && !bytes.is_empty() {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(mut value) => {
                strip_value(&mut value);
                serde_json::to_vec(&value).map(Bytes::from).unwrap_or(bytes)
            }
            Err(_) => bytes,
        }
    } else {
        bytes
    };

    next.run(rebuild(parts, bytes)).await
}

pub async fn sql_injection_protection(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    scan(&state, req, next, "SQL injection", looks_like_sql_injection).await
}

pub async fn xss_protection(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    scan(&state, req, next, "XSS", looks_like_xss).await
}

pub async fn request_size_limit(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let declared = req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    if let Some(length) = declared
        && length > state.config.max_request_bytes {
        warn!(
            ip = %client_ip(req.headers(), req.extensions()),
            length,
            limit = state.config.max_request_bytes,
            "Request body too large"
        );
        return AppError::PayloadTooLarge.into_response();
    }
    next.run(req).await
}

pub async fn ip_filter(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let ip = client_ip(req.headers(), req.extensions());
    if state.config.ip_blacklist.iter().any(|blocked| blocked == &ip) {
        warn!(ip = %ip, path = %req.uri().path(), "Blocked request from blacklisted IP");
        return AppError::Forbidden("Access denied".to_string()).into_response();
    }

    if let Some(agent) = req.headers().get(header::USER_AGENT).and_then(|v| v.to_str().ok())
        && BOT_AGENT.is_match(agent) {
        info!(ip = %ip, user_agent = agent, path = %req.uri().path(), "Automated client detected");
    }
    next.run(req).await
}

fn is_admin_path(path: &str) -> bool {
    path.starts_with("/admin") || path.starts_with("/api/admin") || path.starts_with("/api/analytics/users")
}

pub async fn security_audit(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let audited = path.starts_with("/api/auth/") || is_admin_path(&path);
    if audited {
        let user_agent = req.headers().get(header::USER_AGENT).and_then(|v| v.to_str().ok()).unwrap_or("unknown");
        info!(
            method = %req.method(),
            path = %path,
            ip = %client_ip(req.headers(), req.extensions()),
            user_agent,
            kind = if is_admin_path(&path) { "admin_access" } else { "auth_attempt" },
            "Security audit"
        );
    }
    next.run(req).await
}
