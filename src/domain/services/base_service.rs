use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::domain::models::{
    analytics::AnalyticsEvent,
    audit::AuditLog,
    subscription::{LimitedResource, Plan, SubscriptionLimit},
};
use crate::domain::ports::{
    AnalyticsRepository, AuditRepository, ChatbotRepository, FaqRepository, PaymentRepository,
    SubscriptionRepository, UserRepository,
};
use crate::error::AppError;

pub use crate::error::handle_database_error;

/// Resources that carry an owner and can be checked with
/// `check_resource_ownership`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Chatbot,
    Faq,
    Payment,
    Invoice,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Chatbot => "chatbot",
            ResourceKind::Faq => "faq",
            ResourceKind::Payment => "payment",
            ResourceKind::Invoice => "invoice",
        }
    }
}

/// Cross-cutting checks shared by every resource handler.
pub struct BaseService {
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    chatbots: Arc<dyn ChatbotRepository>,
    faqs: Arc<dyn FaqRepository>,
    payments: Arc<dyn PaymentRepository>,
    audit: Arc<dyn AuditRepository>,
    analytics: Arc<dyn AnalyticsRepository>,
}

impl BaseService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        chatbots: Arc<dyn ChatbotRepository>,
        faqs: Arc<dyn FaqRepository>,
        payments: Arc<dyn PaymentRepository>,
        audit: Arc<dyn AuditRepository>,
        analytics: Arc<dyn AnalyticsRepository>,
    ) -> Self {
        Self { users, subscriptions, chatbots, faqs, payments, audit, analytics }
    }

    /// Runs `op`, logging its start, duration and outcome. Errors are
    /// logged and handed back untouched.
    pub async fn execute_with_logging<T, F>(&self, operation: &str, context: &str, op: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let started = Instant::now();
        info!(operation, context, "Starting operation");

        match op.await {
            Ok(value) => {
                info!(operation, context, duration_ms = started.elapsed().as_millis() as u64, "Operation completed");
                Ok(value)
            }
            Err(e) => {
                error!(operation, context, duration_ms = started.elapsed().as_millis() as u64, error = %e, "Operation failed");
                Err(e)
            }
        }
    }

    pub async fn audit_log(&self, entry: AuditLog) {
        if let Err(e) = self.audit.append(&entry).await {
            warn!(action = %entry.action, resource = %entry.resource, error = %e, "Failed to write audit log");
        }
    }

    pub async fn track_analytics(&self, event: AnalyticsEvent) {
        if let Err(e) = self.analytics.append(&event).await {
            warn!(event_type = event.event_type.as_str(), error = %e, "Failed to track analytics event");
        }
    }

    /// True only for an existing, active user of `tenant_id`.
    pub async fn validate_tenant_access(&self, user_id: &str, tenant_id: &str) -> bool {
        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) => user.is_active && user.tenant_id == tenant_id,
            Ok(None) => false,
            Err(e) => {
                error!(user_id, tenant_id, error = %e, "Tenant access check failed");
                false
            }
        }
    }

    pub async fn check_resource_ownership(&self, kind: ResourceKind, resource_id: &str, user_id: &str) -> Result<bool, AppError> {
        let owned = match kind {
            ResourceKind::Chatbot => self.chatbots.find_owned(resource_id, user_id).await?.is_some(),
            ResourceKind::Faq => self.faqs.find_owned(resource_id, user_id).await?.is_some(),
            ResourceKind::Payment => self.payments.find_owned(resource_id, user_id).await?.is_some(),
            ResourceKind::Invoice => self.payments.find_invoice_owned(resource_id, user_id).await?.is_some(),
        };
        if !owned {
            warn!(resource = kind.as_str(), resource_id, user_id, "Ownership check failed");
        }
        Ok(owned)
    }

    pub async fn check_subscription_limits(
        &self,
        user_id: &str,
        tenant_id: &str,
        resource: LimitedResource,
    ) -> Result<SubscriptionLimit, AppError> {
        let subscription = self.subscriptions.find_active(user_id, tenant_id).await?;
        let Some(plan) = subscription.filter(|s| s.is_active()).and_then(|s| Plan::parse(&s.plan)) else {
            return Ok(SubscriptionLimit { can_create: false, limit: 0, current: 0 });
        };

        let limit = plan.limit(resource);
        let current = match resource {
            LimitedResource::Chatbots => self.chatbots.count_by_owner(user_id).await?,
            LimitedResource::Users => self.users.count_active_by_tenant(tenant_id).await?,
        };

        Ok(SubscriptionLimit { can_create: current < limit, limit, current })
    }
}
