use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::{
    analytics::{AnalyticsEvent, EventType},
    chatbot::{ChatMessage, Chatbot},
    faq::Faq,
    user::User,
};
use crate::domain::ports::{ChatbotRepository, CompletionRequest, FaqRepository, LlmService};
use crate::domain::services::base_service::BaseService;
use crate::error::AppError;

const FALLBACK_RESPONSE: &str =
    "Thanks for your message! I don't have an answer for that yet, but our team will get back to you shortly.";
const MIN_MATCH_SCORE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Llm,
    Faq,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub session_id: String,
    pub response: String,
    pub source: ReplySource,
    pub faq_id: Option<String>,
}

/// Answers chatbot messages through the LLM port, falling back to the
/// chatbot's FAQs when no provider is configured or the provider fails.
pub struct ChatbotService {
    chatbots: Arc<dyn ChatbotRepository>,
    faqs: Arc<dyn FaqRepository>,
    llm: Option<Arc<dyn LlmService>>,
    base: Arc<BaseService>,
}

impl ChatbotService {
    pub fn new(
        chatbots: Arc<dyn ChatbotRepository>,
        faqs: Arc<dyn FaqRepository>,
        llm: Option<Arc<dyn LlmService>>,
        base: Arc<BaseService>,
    ) -> Self {
        Self { chatbots, faqs, llm, base }
    }

    pub async fn reply(&self, user: &User, chatbot: &Chatbot, message: &str, session_id: Option<String>) -> Result<ChatReply, AppError> {
        if !chatbot.is_active {
            return Err(AppError::BadRequest("Chatbot is not active".to_string()));
        }
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let (response, source, faq_id) = match self.ask_llm(chatbot, message).await {
            Some(text) => (text, ReplySource::Llm, None),
            None => self.answer_from_faqs(chatbot, message).await?,
        };

        let record = ChatMessage::new(chatbot, session_id.clone(), message.to_string(), response.clone());
        self.chatbots.record_message(&record).await?;

        self.base.track_analytics(
            AnalyticsEvent::new(EventType::MessageSent, "chatbot", &chatbot.id)
                .by(&user.id, &user.tenant_id)
                .data(json!({ "sessionId": session_id, "source": source })),
        ).await;

        info!(chatbot_id = %chatbot.id, ?source, "Chatbot replied");
        Ok(ChatReply { session_id, response, source, faq_id })
    }

    async fn ask_llm(&self, chatbot: &Chatbot, message: &str) -> Option<String> {
        let llm = self.llm.as_ref()?;
        let system_prompt = chatbot.system_prompt.clone().unwrap_or_else(|| {
            format!("You are {}, a {} customer support assistant.", chatbot.name, chatbot.personality)
        });
        let request = CompletionRequest {
            model: &chatbot.model,
            system_prompt: &system_prompt,
            user_message: message,
            temperature: chatbot.temperature,
            max_tokens: chatbot.max_tokens,
        };

        match llm.generate(&request).await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!(chatbot_id = %chatbot.id, error = %e, "LLM generation failed, falling back to FAQs");
                None
            }
        }
    }

    async fn answer_from_faqs(&self, chatbot: &Chatbot, message: &str) -> Result<(String, ReplySource, Option<String>), AppError> {
        let faqs = self.faqs.list_active_for_chatbot(&chatbot.id).await?;
        match best_faq_match(&faqs, message) {
            Some(faq) => {
                if let Err(e) = self.faqs.increment_views(&faq.id).await {
                    warn!(faq_id = %faq.id, error = %e, "Failed to bump FAQ view count");
                }
                Ok((faq.answer.clone(), ReplySource::Faq, Some(faq.id.clone())))
            }
            None => {
                let text = chatbot.welcome_message.clone()
                    .filter(|_| faqs.is_empty())
                    .unwrap_or_else(|| FALLBACK_RESPONSE.to_string());
                Ok((text, ReplySource::Fallback, None))
            }
        }
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Picks the FAQ whose question shares the largest fraction of its words
/// with the message.
pub fn best_faq_match<'a>(faqs: &'a [Faq], message: &str) -> Option<&'a Faq> {
    let words = tokens(message);
    if words.is_empty() {
        return None;
    }

    faqs.iter()
        .filter_map(|faq| {
            let question = tokens(&faq.question);
            if question.is_empty() {
                return None;
            }
            let score = question.intersection(&words).count() as f64 / question.len() as f64;
            (score >= MIN_MATCH_SCORE).then_some((faq, score))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(faq, _)| faq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faq(question: &str, answer: &str) -> Faq {
        Faq::new("t".into(), "u".into(), question.into(), answer.into(), "general".into())
    }

    #[test]
    fn test_best_match_prefers_overlap() {
        let faqs = vec![
            faq("What are your opening hours?", "9 to 5"),
            faq("How do I return an item?", "Use the returns portal"),
        ];
        let hit = best_faq_match(&faqs, "how can I return my item").unwrap();
        assert_eq!(hit.answer, "Use the returns portal");
    }

    #[test]
    fn test_no_match_below_threshold() {
        let faqs = vec![faq("What are your opening hours?", "9 to 5")];
        assert!(best_faq_match(&faqs, "shipping to Canada").is_none());
        assert!(best_faq_match(&faqs, "?!").is_none());
    }
}
