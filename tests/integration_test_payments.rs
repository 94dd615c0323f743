mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_payment_flow_and_admin_status_update() {
    let app = TestApp::new().await;
    let customer = app.register("customer@example.com").await;

    let res = app.call("POST", "/api/payments", Some(&customer.access_token), Some(json!({
        "amount": 49.99,
        "currency": "EUR",
        "provider": "STRIPE",
        "description": "Professional plan",
        "webhookUrl": "https://shop.example.com/hooks/payments",
    }))).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["amountCents"], 4999);
    assert_eq!(res.body["data"]["status"], "PENDING");
    let payment_id = res.body["data"]["id"].as_str().unwrap().to_string();

    let res = app.call("GET", "/api/payments", Some(&customer.access_token), None).await;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);

    let status_uri = format!("/api/payments/{}/status", payment_id);
    let res = app.call("PATCH", &status_uri, Some(&customer.access_token), Some(json!({ "status": "COMPLETED" }))).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    app.set_role(&customer.user_id, "ADMIN").await;
    let res = app.call("PATCH", &status_uri, Some(&customer.access_token), Some(json!({ "status": "COMPLETED" }))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], "COMPLETED");

    let res = app.call("PATCH", &status_uri, Some(&customer.access_token), Some(json!({ "status": "LOST" }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.call("GET", "/api/analytics/revenue?timeRange=7d", Some(&customer.access_token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["totalCents"], 4999);
    assert_eq!(res.body["data"]["timeRange"], "7d");
}

#[tokio::test]
async fn test_admin_cannot_touch_other_tenants_payments() {
    let app = TestApp::new().await;
    let customer = app.register("payer@example.com").await;
    let admin = app.register("otheradmin@example.com").await;
    app.set_role(&admin.user_id, "ADMIN").await;

    let res = app.call("POST", "/api/payments", Some(&customer.access_token), Some(json!({
        "amount": 10,
        "currency": "USD",
        "provider": "PAYPAL",
    }))).await;
    let payment_id = res.body["data"]["id"].as_str().unwrap().to_string();

    let res = app.call(
        "PATCH",
        &format!("/api/payments/{}/status", payment_id),
        Some(&admin.access_token),
        Some(json!({ "status": "REFUNDED" })),
    ).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "Payment not found");
}

#[tokio::test]
async fn test_payment_validation() {
    let app = TestApp::new().await;
    let session = app.register("badpay@example.com").await;

    let res = app.call("POST", "/api/payments", Some(&session.access_token), Some(json!({
        "amount": 0,
        "currency": "euro",
        "provider": "BITCOIN",
        "webhookUrl": "not a url",
    }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["details"].as_array().unwrap().len(), 4);

    let res = app.call("POST", "/api/payments", Some(&session.access_token), Some(json!({
        "amount": 1e300,
        "currency": "USD",
        "provider": "STRIPE",
    }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["details"][0]["field"], "amount");

    let res = app.call("POST", "/api/payments/invoices", Some(&session.access_token), Some(json!({
        "amount": 1_000_000.01,
        "currency": "USD",
    }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.call("GET", "/api/payments", Some(&session.access_token), None).await;
    assert!(res.body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invoices() {
    let app = TestApp::new().await;
    let session = app.register("invoices@example.com").await;
    let other = app.register("stranger@example.com").await;

    let res = app.call("POST", "/api/payments", Some(&other.access_token), Some(json!({
        "amount": 5,
        "currency": "USD",
        "provider": "STRIPE",
    }))).await;
    let foreign_payment = res.body["data"]["id"].as_str().unwrap().to_string();

    let res = app.call("POST", "/api/payments/invoices", Some(&session.access_token), Some(json!({
        "amount": 5,
        "currency": "USD",
        "paymentId": foreign_payment,
    }))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.call("POST", "/api/payments/invoices", Some(&session.access_token), Some(json!({
        "amount": 120.5,
        "currency": "USD",
        "dueInDays": 14,
    }))).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["amountCents"], 12050);
    assert!(res.body["data"]["number"].as_str().unwrap().starts_with("INV-"));

    let res = app.call("GET", "/api/payments/invoices", Some(&session.access_token), None).await;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    let res = app.call("GET", "/api/payments/invoices", Some(&other.access_token), None).await;
    assert!(res.body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_analytics_overview_and_dashboard() {
    let app = TestApp::new().await;
    let session = app.register("analyst@example.com").await;
    let token = session.access_token.as_str();

    let res = app.create_chatbot(token, "Metrics Bot").await;
    let id = res.body["data"]["id"].as_str().unwrap().to_string();
    app.call("POST", &format!("/api/chatbots/{}/message", id), Some(token), Some(json!({ "message": "hello there" }))).await;

    let res = app.call("GET", "/api/analytics", Some(token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["timeRange"], "30d");
    assert_eq!(res.body["data"]["totalMessages"], 1);
    let events = res.body["data"]["events"].as_array().unwrap();
    for expected in ["USER_REGISTERED", "CHATBOT_CREATED", "MESSAGE_SENT"] {
        assert!(events.iter().any(|e| e["eventType"] == expected), "missing {}", expected);
    }

    let res = app.call("GET", "/api/analytics?timeRange=2w", Some(token), None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let other = app.register("other-analyst@example.com").await;
    let res = app.call("GET", &format!("/api/analytics?tenantId={}", other.tenant_id), Some(token), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.call("GET", "/api/dashboard", Some(token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["chatbots"]["totalChatbots"], 1);
    assert_eq!(res.body["data"]["chatbotLimit"]["canCreate"], false);
    assert_eq!(res.body["data"]["subscription"]["plan"], "STARTER");
}

#[tokio::test]
async fn test_faq_crud_and_category() {
    let app = TestApp::new().await;
    let session = app.register("faqs@example.com").await;
    let token = session.access_token.as_str();

    let res = app.call("POST", "/api/faqs", Some(token), Some(json!({
        "question": "What are your opening hours?",
        "answer": "9 to 5 on weekdays",
        "category": "store",
    }))).await;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.body["data"]["id"].as_str().unwrap().to_string();

    app.call("POST", "/api/faqs", Some(token), Some(json!({
        "question": "Do you offer gift cards?",
        "answer": "Yes",
    }))).await;

    let res = app.call("GET", "/api/faqs/category/store", Some(token), None).await;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    let res = app.call("GET", "/api/faqs?category=general", Some(token), None).await;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);

    let res = app.call("GET", &format!("/api/faqs/{}", id), Some(token), None).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.call("PUT", &format!("/api/faqs/{}", id), Some(token), Some(json!({ "answer": "10 to 6" }))).await;
    assert_eq!(res.body["data"]["answer"], "10 to 6");

    let stranger = app.register("faq-stranger@example.com").await;
    let res = app.call("GET", &format!("/api/faqs/{}", id), Some(&stranger.access_token), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.call("DELETE", &format!("/api/faqs/{}", id), Some(token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.call("GET", &format!("/api/faqs/{}", id), Some(token), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
