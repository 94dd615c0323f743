use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_TRIALING: &str = "TRIALING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Starter,
    Professional,
    Enterprise,
}

/// Resources whose creation is capped per plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitedResource {
    Chatbots,
    Users,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Starter => "STARTER",
            Plan::Professional => "PROFESSIONAL",
            Plan::Enterprise => "ENTERPRISE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "STARTER" => Some(Plan::Starter),
            "PROFESSIONAL" => Some(Plan::Professional),
            "ENTERPRISE" => Some(Plan::Enterprise),
            _ => None,
        }
    }

    pub fn limit(&self, resource: LimitedResource) -> i64 {
        match (self, resource) {
            (Plan::Starter, LimitedResource::Chatbots) => 1,
            (Plan::Starter, LimitedResource::Users) => 2,
            (Plan::Professional, LimitedResource::Chatbots) => 5,
            (Plan::Professional, LimitedResource::Users) => 10,
            (Plan::Enterprise, LimitedResource::Chatbots) => 50,
            (Plan::Enterprise, LimitedResource::Users) => 100,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub plan: String,
    pub status: String,
    pub current_period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn trial(user_id: String, tenant_id: String, plan: Plan) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            tenant_id,
            plan: plan.as_str().to_string(),
            status: STATUS_TRIALING.to_string(),
            current_period_end: now + Duration::days(14),
            created_at: now,
        }
    }

    /// Active or trialing, and the paid or trial period has not ended.
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        (self.status == STATUS_ACTIVE || self.status == STATUS_TRIALING) && self.current_period_end > now
    }
}

/// Outcome of a plan-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionLimit {
    pub can_create: bool,
    pub limit: i64,
    pub current: i64,
}
