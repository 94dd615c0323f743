use orchestrator_backend::{
    api::router::create_router,
    config::Config,
    domain::ports::{CompletionRequest, LlmService},
    error::AppError,
    infra::{cache::memory_store::MemoryCacheStore, factory::connect_repositories},
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "Str0ng!Passw0rd";
pub const DEFAULT_IP: &str = "203.0.113.10";

pub struct MockLlmService;

#[async_trait]
impl LlmService for MockLlmService {
    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<String, AppError> {
        Ok(format!("Mock reply to: {}", request.user_message))
    }
}

pub struct FailingLlmService;

#[async_trait]
impl LlmService for FailingLlmService {
    async fn generate(&self, _request: &CompletionRequest<'_>) -> Result<String, AppError> {
        Err(AppError::InternalWithMsg("provider down".to_string()))
    }
}

#[allow(dead_code)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub tenant_id: String,
}

#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub db_filename: String,
    next_ip: AtomicU32,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::build(&[], Some(Arc::new(MockLlmService))).await
    }

    pub async fn with_env(overrides: &[(&str, &str)]) -> Self {
        Self::build(overrides, Some(Arc::new(MockLlmService))).await
    }

    pub async fn build(overrides: &[(&str, &str)], llm: Option<Arc<dyn LlmService>>) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());

        let mut env: HashMap<String, String> = HashMap::from([
            ("DATABASE_URL".to_string(), format!("sqlite://{}?mode=rwc", db_filename)),
            ("JWT_SECRET".to_string(), "test-access-secret-0123456789abcdef".to_string()),
            ("JWT_REFRESH_SECRET".to_string(), "test-refresh-secret-0123456789abcdef".to_string()),
            ("RATE_LIMIT_MAX_REQUESTS".to_string(), "1000".to_string()),
        ]);
        for (key, value) in overrides {
            env.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_lookup(|name| env.get(name).cloned()).expect("Invalid test config");
        let repos = connect_repositories(&config).await.expect("Failed to set up test db");
        let state = Arc::new(AppState::new(config, repos, Arc::new(MemoryCacheStore::new()), llm));
        let router = create_router(state.clone());

        Self { router, state, db_filename, next_ip: AtomicU32::new(1) }
    }

    /// A fresh client address, so helper traffic stays clear of per-IP limits.
    pub fn fresh_ip(&self) -> String {
        format!("198.51.100.{}", self.next_ip.fetch_add(1, Ordering::Relaxed))
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        TestResponse { status, headers, body }
    }

    pub async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        self.call_from(DEFAULT_IP, method, uri, token, body).await
    }

    pub async fn call_from(&self, ip: &str, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", ip);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn register(&self, email: &str) -> Session {
        let ip = self.fresh_ip();
        let res = self.call_from(&ip, "POST", "/api/auth/register", None, Some(json!({
            "email": email,
            "password": PASSWORD,
            "firstName": "Test",
            "lastName": "User",
            "companyName": "Test Shop",
        }))).await;
        assert_eq!(res.status, StatusCode::CREATED, "register failed: {}", res.body);
        session_from(&res.body)
    }

    pub async fn login(&self, email: &str) -> Session {
        let ip = self.fresh_ip();
        let res = self.call_from(&ip, "POST", "/api/auth/login", None, Some(json!({
            "email": email,
            "password": PASSWORD,
        }))).await;
        assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.body);
        session_from(&res.body)
    }

    pub async fn set_role(&self, user_id: &str, role: &str) {
        self.state.repos.users.set_role(user_id, role).await.unwrap();
    }

    pub async fn create_chatbot(&self, token: &str, name: &str) -> TestResponse {
        self.call("POST", "/api/chatbots", Some(token), Some(json!({ "name": name }))).await
    }
}

fn session_from(body: &Value) -> Session {
    let data = &body["data"];
    Session {
        access_token: data["accessToken"].as_str().unwrap().to_string(),
        refresh_token: data["refreshToken"].as_str().unwrap().to_string(),
        user_id: data["user"]["id"].as_str().unwrap().to_string(),
        tenant_id: data["user"]["tenantId"].as_str().unwrap().to_string(),
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.db_filename, suffix));
        }
    }
}
