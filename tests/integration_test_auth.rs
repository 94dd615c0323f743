mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{TestApp, PASSWORD};
use jsonwebtoken::{encode, EncodingKey, Header};
use orchestrator_backend::domain::models::auth::AccessClaims;
use serde_json::json;

fn signed_access_token(user_id: &str, secret: &str, exp_offset_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = AccessClaims {
        user_id: user_id.to_string(),
        role: "USER".to_string(),
        iat: (now - 3600) as usize,
        exp: (now + exp_offset_secs) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = TestApp::new().await;

    let res = app.call("GET", "/api/auth/profile", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["error"], "Access token required");

    let res = app.call("GET", "/api/chatbots", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "Access token required");
}

#[tokio::test]
async fn test_invalid_and_expired_tokens() {
    let app = TestApp::new().await;
    let session = app.register("tokens@example.com").await;

    let res = app.call("GET", "/api/auth/profile", Some("not.a.jwt"), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "Invalid token");

    let forged = signed_access_token(&session.user_id, "some-other-secret-0123456789abcdef", 600);
    let res = app.call("GET", "/api/auth/profile", Some(&forged), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "Invalid token");

    // A refresh token is signed with the other secret and must not pass as an access token.
    let res = app.call("GET", "/api/auth/profile", Some(&session.refresh_token), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "Invalid token");

    let expired = signed_access_token(&session.user_id, &app.state.config.jwt_secret, -60);
    let res = app.call("GET", "/api/auth/profile", Some(&expired), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "Token expired");

    let res = app.call("GET", "/api/auth/profile", Some(&session.access_token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["user"]["email"], "tokens@example.com");
    assert!(res.body["data"]["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_inactive_user_or_tenant_is_rejected() {
    let app = TestApp::new().await;
    let alice = app.register("alice@example.com").await;
    let bob = app.register("bob@example.com").await;

    app.state.repos.users.set_active(&alice.user_id, false).await.unwrap();
    let res = app.call("GET", "/api/auth/profile", Some(&alice.access_token), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "User not found or inactive");

    app.state.repos.tenants.set_active(&bob.tenant_id, false).await.unwrap();
    let res = app.call("GET", "/api/auth/profile", Some(&bob.access_token), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "User not found or inactive");
}

#[tokio::test]
async fn test_register_creates_tenant_and_trial() {
    let app = TestApp::new().await;
    let session = app.register("Owner@Example.com").await;

    let user = app.state.repos.users.find_by_id(&session.user_id).await.unwrap().unwrap();
    assert_eq!(user.email, "owner@example.com");
    assert_eq!(user.role, "USER");
    assert!(user.is_trial);

    let tenant = app.state.repos.tenants.find_by_id(&session.tenant_id).await.unwrap().unwrap();
    assert_eq!(tenant.name, "Test Shop");

    let subscription = app.state.repos.subscriptions
        .find_active(&session.user_id, &session.tenant_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.plan, "STARTER");
    assert_eq!(subscription.status, "TRIALING");
}

#[tokio::test]
async fn test_register_duplicate_and_invalid_input() {
    let app = TestApp::new().await;
    app.register("dupe@example.com").await;

    let res = app.call_from(&app.fresh_ip(), "POST", "/api/auth/register", None, Some(json!({
        "email": "dupe@example.com",
        "password": PASSWORD,
        "firstName": "Dupe",
        "lastName": "User",
    }))).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"], "User with this email already exists");

    let res = app.call_from(&app.fresh_ip(), "POST", "/api/auth/register", None, Some(json!({
        "email": "not-an-email",
        "password": "weak",
        "firstName": "Jo",
        "lastName": "Doe",
    }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Validation failed");
    let fields: Vec<&str> = res.body["details"].as_array().unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn test_login_wrong_credentials_and_rate_limit() {
    let app = TestApp::new().await;
    app.register("victim@example.com").await;

    let ip = "192.0.2.77";
    for attempt in 1..=5 {
        let res = app.call_from(ip, "POST", "/api/auth/login", None, Some(json!({
            "email": "victim@example.com",
            "password": "Wrong!Passw0rd",
        }))).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "attempt {}", attempt);
        assert_eq!(res.body["error"], "Invalid credentials");
        assert_eq!(res.headers["ratelimit-limit"], "5");
        assert_eq!(res.headers["ratelimit-remaining"], (5 - attempt).to_string().as_str());
    }

    let res = app.call_from(ip, "POST", "/api/auth/login", None, Some(json!({
        "email": "victim@example.com",
        "password": PASSWORD,
    }))).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(res.body["error"].as_str().unwrap().contains("Too many"));
    assert_eq!(res.headers["ratelimit-remaining"], "0");
    assert!(res.headers.get("ratelimit-reset").is_some());
    assert!(res.headers.get("x-ratelimit-limit").is_none());

    // Other clients are unaffected.
    app.login("victim@example.com").await;
}

#[tokio::test]
async fn test_unknown_email_and_wrong_password_look_the_same() {
    let app = TestApp::new().await;
    app.register("known@example.com").await;

    let unknown = app.call_from(&app.fresh_ip(), "POST", "/api/auth/login", None, Some(json!({
        "email": "nobody@example.com",
        "password": PASSWORD,
    }))).await;
    let wrong = app.call_from(&app.fresh_ip(), "POST", "/api/auth/login", None, Some(json!({
        "email": "known@example.com",
        "password": "Wrong!Passw0rd",
    }))).await;

    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.body, wrong.body);
}

#[tokio::test]
async fn test_login_records_last_login_and_session() {
    let app = TestApp::new().await;
    let registered = app.register("session@example.com").await;
    let session = app.login("session@example.com").await;
    assert_eq!(session.user_id, registered.user_id);

    let user = app.state.repos.users.find_by_id(&session.user_id).await.unwrap().unwrap();
    assert!(user.last_login_at.is_some());

    let cached = app.state.cache.exists(&format!("session:{}", session.user_id)).await.unwrap();
    assert!(cached);
}

#[tokio::test]
async fn test_refresh_rotates_and_logout_revokes() {
    let app = TestApp::new().await;
    let session = app.register("refresh@example.com").await;

    let res = app.call_from(&app.fresh_ip(), "POST", "/api/auth/refresh-token", None, Some(json!({
        "refreshToken": session.refresh_token,
    }))).await;
    assert_eq!(res.status, StatusCode::OK);
    let rotated = res.body["data"]["refreshToken"].as_str().unwrap().to_string();
    let access = res.body["data"]["accessToken"].as_str().unwrap().to_string();
    assert_ne!(rotated, session.refresh_token);

    let res = app.call_from(&app.fresh_ip(), "POST", "/api/auth/refresh-token", None, Some(json!({
        "refreshToken": session.refresh_token,
    }))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    // An access token is not accepted as a refresh token.
    let res = app.call_from(&app.fresh_ip(), "POST", "/api/auth/refresh-token", None, Some(json!({
        "refreshToken": access,
    }))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.call("POST", "/api/auth/logout", Some(&access), Some(json!({ "refreshToken": rotated }))).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.call_from(&app.fresh_ip(), "POST", "/api/auth/refresh-token", None, Some(json!({
        "refreshToken": rotated,
    }))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "Invalid refresh token");
}

#[tokio::test]
async fn test_update_profile_sanitizes_and_invalidates_cache() {
    let app = TestApp::new().await;
    let session = app.register("profile@example.com").await;

    app.call("GET", "/api/auth/profile", Some(&session.access_token), None).await;
    assert!(app.state.cache.get_cached_user(&session.user_id).await.unwrap().is_some());

    let res = app.call("PUT", "/api/auth/profile", Some(&session.access_token), Some(json!({
        "firstName": "  Mary   Ann ",
    }))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["firstName"], "Mary Ann");
    assert_eq!(res.body["data"]["lastName"], "User");
    assert!(app.state.cache.get_cached_user(&session.user_id).await.unwrap().is_none());

    let res = app.call("PUT", "/api/auth/profile", Some(&session.access_token), Some(json!({
        "firstName": "R2D2",
    }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["details"][0]["field"], "firstName");
}

#[tokio::test]
async fn test_role_gate() {
    let app = TestApp::new().await;
    let session = app.register("member@example.com").await;

    let res = app.call("GET", "/api/analytics/users", Some(&session.access_token), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "Insufficient permissions");

    let res = app.call("GET", "/api/analytics/users", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    app.set_role(&session.user_id, "ADMIN").await;
    let res = app.call("GET", "/api/analytics/users", Some(&session.access_token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["users"]["totalUsers"], 1);
}
