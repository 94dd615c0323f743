use std::sync::Arc;

use crate::config::Config;
use crate::domain::ports::{
    AnalyticsRepository, AuditRepository, CacheStore, ChatbotRepository, FaqRepository, HealthRepository,
    LlmService, PaymentRepository, SubscriptionRepository, TenantRepository, UserRepository,
};
use crate::domain::services::{
    auth_service::AuthService,
    base_service::BaseService,
    cache_service::CacheService,
    chatbot_service::ChatbotService,
    rate_limiter::{RateLimitPolicy, RateLimiter},
};

/// Storage ports for one database backend.
#[derive(Clone)]
pub struct Repositories {
    pub tenants: Arc<dyn TenantRepository>,
    pub users: Arc<dyn UserRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub chatbots: Arc<dyn ChatbotRepository>,
    pub faqs: Arc<dyn FaqRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub analytics: Arc<dyn AnalyticsRepository>,
    pub health: Arc<dyn HealthRepository>,
}

pub struct RateLimiters {
    pub general: Arc<RateLimiter>,
    pub auth: Arc<RateLimiter>,
    pub api: Arc<RateLimiter>,
}

pub struct AppState {
    pub config: Config,
    pub repos: Repositories,
    pub cache: CacheService,
    pub auth_service: Arc<AuthService>,
    pub base_service: Arc<BaseService>,
    pub chatbot_service: Arc<ChatbotService>,
    pub limiters: RateLimiters,
}

impl AppState {
    pub fn new(
        config: Config,
        repos: Repositories,
        cache_store: Arc<dyn CacheStore>,
        llm: Option<Arc<dyn LlmService>>,
    ) -> Self {
        let cache = CacheService::new(cache_store);
        let auth_service = Arc::new(AuthService::new(&config, cache.clone()));
        let base_service = Arc::new(BaseService::new(
            repos.users.clone(),
            repos.subscriptions.clone(),
            repos.chatbots.clone(),
            repos.faqs.clone(),
            repos.payments.clone(),
            repos.audit.clone(),
            repos.analytics.clone(),
        ));
        let chatbot_service = Arc::new(ChatbotService::new(
            repos.chatbots.clone(),
            repos.faqs.clone(),
            llm,
            base_service.clone(),
        ));
        let limiters = RateLimiters {
            general: Arc::new(RateLimiter::new(RateLimitPolicy::general(&config.rate_limit), cache.clone())),
            auth: Arc::new(RateLimiter::new(RateLimitPolicy::auth(), cache.clone())),
            api: Arc::new(RateLimiter::new(RateLimitPolicy::api(), cache.clone())),
        };

        Self { config, repos, cache, auth_service, base_service, chatbot_service, limiters }
    }
}
