mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_chatbot_lifecycle() {
    let app = TestApp::new().await;
    let session = app.register("bots@example.com").await;
    let token = session.access_token.as_str();

    let res = app.call("POST", "/api/chatbots", Some(token), Some(json!({
        "name": "Support Bot",
        "description": "Answers shipping questions",
        "model": "gpt-4o",
        "personality": "friendly",
        "temperature": 0.2,
        "maxTokens": 500,
    }))).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["success"], true);
    let id = res.body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(res.body["data"]["model"], "gpt-4o");
    assert_eq!(res.body["data"]["ownerId"], session.user_id.as_str());
    assert_eq!(res.body["data"]["tenantId"], session.tenant_id.as_str());

    let res = app.call("GET", "/api/chatbots?page=1&limit=5", Some(token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(res.body["data"]["pagination"]["total"], 1);
    assert_eq!(res.body["data"]["pagination"]["limit"], 5);

    let res = app.call("PUT", &format!("/api/chatbots/{}", id), Some(token), Some(json!({
        "name": "Returns Bot",
        "isActive": false,
    }))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "Returns Bot");
    assert_eq!(res.body["data"]["isActive"], false);

    let res = app.call("GET", &format!("/api/chatbots/{}", id), Some(token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "Returns Bot");

    let res = app.call("GET", "/api/chatbots/stats", Some(token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["totalChatbots"], 1);
    assert_eq!(res.body["data"]["activeChatbots"], 0);

    let res = app.call("DELETE", &format!("/api/chatbots/{}", id), Some(token), None).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.call("GET", &format!("/api/chatbots/{}", id), Some(token), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_foreign_and_missing_chatbots_are_indistinguishable() {
    let app = TestApp::new().await;
    let owner = app.register("owner@example.com").await;
    let intruder = app.register("intruder@example.com").await;

    let res = app.create_chatbot(&owner.access_token, "Private Bot").await;
    let id = res.body["data"]["id"].as_str().unwrap().to_string();

    let foreign = app.call("GET", &format!("/api/chatbots/{}", id), Some(&intruder.access_token), None).await;
    let missing = app.call(
        "GET",
        "/api/chatbots/00000000-0000-4000-8000-000000000000",
        Some(&intruder.access_token),
        None,
    ).await;

    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(foreign.body, missing.body);
    assert_eq!(foreign.body["error"], "Chatbot not found");

    let res = app.call("PUT", &format!("/api/chatbots/{}", id), Some(&intruder.access_token), Some(json!({ "name": "Mine" }))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = app.call("DELETE", &format!("/api/chatbots/{}", id), Some(&intruder.access_token), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = app.call("POST", &format!("/api/chatbots/{}/message", id), Some(&intruder.access_token), Some(json!({ "message": "hi" }))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    // The owner still sees it untouched.
    let res = app.call("GET", &format!("/api/chatbots/{}", id), Some(&owner.access_token), None).await;
    assert_eq!(res.body["data"]["name"], "Private Bot");
}

#[tokio::test]
async fn test_starter_plan_chatbot_limit() {
    let app = TestApp::new().await;
    let session = app.register("limits@example.com").await;

    let res = app.create_chatbot(&session.access_token, "First Bot").await;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = app.create_chatbot(&session.access_token, "Second Bot").await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "Chatbot limit reached for your plan");
}

#[tokio::test]
async fn test_script_is_stripped_from_stored_name() {
    let app = TestApp::new().await;
    let session = app.register("sanitize@example.com").await;

    let res = app.create_chatbot(&session.access_token, "<script>alert(1)</script>Bot").await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["name"], "Bot");

    let id = res.body["data"]["id"].as_str().unwrap();
    let stored = app.state.repos.chatbots.find_owned(id, &session.user_id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Bot");
}

#[tokio::test]
async fn test_chatbot_validation_reports_every_field() {
    let app = TestApp::new().await;
    let session = app.register("validation@example.com").await;

    let res = app.call("POST", "/api/chatbots", Some(&session.access_token), Some(json!({
        "name": "",
        "model": "gpt-2",
        "temperature": 3.5,
        "maxTokens": 10,
    }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Validation failed");
    let fields: Vec<&str> = res.body["details"].as_array().unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["maxTokens", "model", "name", "temperature"]);
}

#[tokio::test]
async fn test_message_uses_llm_and_records_history() {
    let app = TestApp::new().await;
    let session = app.register("chat@example.com").await;
    let res = app.create_chatbot(&session.access_token, "Chat Bot").await;
    let id = res.body["data"]["id"].as_str().unwrap().to_string();

    let res = app.call("POST", &format!("/api/chatbots/{}/message", id), Some(&session.access_token), Some(json!({
        "message": "Where is my order?",
    }))).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["source"], "llm");
    assert_eq!(res.body["data"]["response"], "Mock reply to: Where is my order?");
    assert!(res.headers.get("ratelimit-limit").is_some());
    let session_id = res.body["data"]["sessionId"].as_str().unwrap().to_string();

    let res = app.call("POST", &format!("/api/chatbots/{}/message", id), Some(&session.access_token), Some(json!({
        "message": "Thanks",
        "sessionId": session_id,
    }))).await;
    assert_eq!(res.body["data"]["sessionId"], session_id.as_str());

    let stored = app.state.repos.chatbots.find_owned(&id, &session.user_id).await.unwrap().unwrap();
    assert_eq!(stored.total_messages, 2);

    let res = app.call("GET", &format!("/api/chatbots/{}", id), Some(&session.access_token), None).await;
    assert_eq!(res.body["data"]["totalMessages"], 2);
}

#[tokio::test]
async fn test_message_falls_back_to_faqs() {
    let app = TestApp::build(&[], Some(Arc::new(common::FailingLlmService))).await;
    let session = app.register("faqbot@example.com").await;
    let token = session.access_token.as_str();
    let res = app.create_chatbot(token, "FAQ Bot").await;
    let id = res.body["data"]["id"].as_str().unwrap().to_string();

    let res = app.call("POST", "/api/faqs", Some(token), Some(json!({
        "question": "How do I return an item?",
        "answer": "Use the returns portal within 30 days.",
        "chatbotId": id,
    }))).await;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = app.call("POST", &format!("/api/chatbots/{}/message", id), Some(token), Some(json!({
        "message": "how can I return my item",
    }))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["source"], "faq");
    assert_eq!(res.body["data"]["response"], "Use the returns portal within 30 days.");

    let res = app.call("POST", &format!("/api/chatbots/{}/message", id), Some(token), Some(json!({
        "message": "Do you ship to Canada",
    }))).await;
    assert_eq!(res.body["data"]["source"], "fallback");
}

#[tokio::test]
async fn test_inactive_chatbot_refuses_messages() {
    let app = TestApp::new().await;
    let session = app.register("paused@example.com").await;
    let res = app.create_chatbot(&session.access_token, "Paused Bot").await;
    let id = res.body["data"]["id"].as_str().unwrap().to_string();

    app.call("PUT", &format!("/api/chatbots/{}", id), Some(&session.access_token), Some(json!({ "isActive": false }))).await;

    let res = app.call("POST", &format!("/api/chatbots/{}/message", id), Some(&session.access_token), Some(json!({
        "message": "Hello?",
    }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Chatbot is not active");
}

#[tokio::test]
async fn test_out_of_range_page_is_a_validation_error() {
    let app = TestApp::new().await;
    let session = app.register("pages@example.com").await;

    let res = app.call("GET", "/api/chatbots?page=9223372036854775807&limit=100", Some(&session.access_token), None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["details"][0]["field"], "page");

    let res = app.call("GET", "/api/chatbots?page=10000&limit=100", Some(&session.access_token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_configured_model_is_the_default() {
    let app = TestApp::with_env(&[("OPENAI_MODEL", "gpt-4")]).await;
    let session = app.register("models@example.com").await;

    let res = app.create_chatbot(&session.access_token, "Default Bot").await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["model"], "gpt-4");
}
