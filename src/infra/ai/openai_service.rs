use crate::domain::ports::{CompletionRequest, LlmService};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{error, info, warn, instrument};
use std::time::Duration;
use tokio::time::sleep;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;
const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiService {
    client: Client,
    api_key: String,
    url: String,
}

impl OpenAiService {
    pub fn new(api_key: String) -> Self {
        Self::with_url(api_key, COMPLETIONS_URL.to_string())
    }

    pub fn with_url(api_key: String, url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            url,
        }
    }

    async fn send_request_with_retry(&self, payload: &Value) -> Result<String, AppError> {
        let mut retries = 0;
        let mut backoff = INITIAL_BACKOFF_MS;

        loop {
            let res = self.client.post(&self.url)
                .bearer_auth(&self.api_key)
                .json(payload)
                .send()
                .await;

            match res {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body: Value = response.json().await.map_err(|e| {
                            error!("Failed to parse completion response JSON: {:?}", e);
                            AppError::Internal
                        })?;
                        return extract_content(&body);
                    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        if retries >= MAX_RETRIES {
                            error!("LLM API failed after {} retries. Status: {}", retries, status);
                            return Err(AppError::Unavailable("AI provider unavailable".to_string()));
                        }
                        warn!("LLM API transient error {}. Retrying in {}ms...", status, backoff);
                    } else {
                        let text = response.text().await.unwrap_or_default();
                        error!("LLM API terminal error {}: {}", status, text);
                        return Err(AppError::InternalWithMsg(format!("AI request rejected: {}", status)));
                    }
                }
                Err(e) => {
                    if retries >= MAX_RETRIES {
                        error!("LLM network error after {} retries: {:?}", retries, e);
                        return Err(AppError::Unavailable("AI provider unavailable".to_string()));
                    }
                    warn!("LLM network error. Retrying in {}ms... {:?}", backoff, e);
                }
            }

            sleep(Duration::from_millis(backoff)).await;
            retries += 1;
            backoff *= 2;
        }
    }
}

fn extract_content(body: &Value) -> Result<String, AppError> {
    if let Some(choice) = body.get("choices").and_then(|c| c.as_array()).and_then(|c| c.first()) {
        if let Some(reason) = choice.get("finish_reason").and_then(|r| r.as_str())
            && reason == "content_filter" {
                warn!("Completion blocked by content filter");
                return Err(AppError::BadRequest("Message was rejected by the content filter".to_string()));
            }

        if let Some(text) = choice.get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str()) {
            return Ok(text.trim().to_string());
        }
    }

    error!("Unexpected completion response structure: {:?}", body);
    Err(AppError::InternalWithMsg("AI response missing content".to_string()))
}

#[async_trait]
impl LlmService for OpenAiService {
    #[instrument(skip(self, request), fields(model = request.model, message_len = request.user_message.len()))]
    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<String, AppError> {
        let payload = json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_message }
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        info!("Sending completion request");
        let result = self.send_request_with_retry(&payload).await?;
        info!("Completion received");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content() {
        let body = json!({"choices": [{"message": {"content": "  Hello there \n"}, "finish_reason": "stop"}]});
        assert_eq!(extract_content(&body).unwrap(), "Hello there");
    }

    #[test]
    fn test_content_filter_is_bad_request() {
        let body = json!({"choices": [{"message": {"content": ""}, "finish_reason": "content_filter"}]});
        assert!(matches!(extract_content(&body), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_missing_choices_is_internal() {
        assert!(matches!(extract_content(&json!({})), Err(AppError::InternalWithMsg(_))));
    }
}
