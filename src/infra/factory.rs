use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::{info, warn};
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::ports::{CacheStore, LlmService};
use crate::error::StartupError;
use crate::state::{AppState, Repositories};
use crate::infra::ai::openai_service::OpenAiService;
use crate::infra::cache::{memory_store::MemoryCacheStore, redis_store::RedisCacheStore};
use crate::infra::repositories::{
    postgres_activity_repo::PostgresActivityRepo, postgres_chatbot_repo::PostgresChatbotRepo,
    postgres_faq_repo::PostgresFaqRepo, postgres_payment_repo::PostgresPaymentRepo,
    postgres_subscription_repo::PostgresSubscriptionRepo, postgres_tenant_repo::PostgresTenantRepo,
    postgres_user_repo::PostgresUserRepo,
    sqlite_activity_repo::SqliteActivityRepo, sqlite_chatbot_repo::SqliteChatbotRepo,
    sqlite_faq_repo::SqliteFaqRepo, sqlite_payment_repo::SqlitePaymentRepo,
    sqlite_subscription_repo::SqliteSubscriptionRepo, sqlite_tenant_repo::SqliteTenantRepo,
    sqlite_user_repo::SqliteUserRepo,
};

pub async fn bootstrap_state(config: &Config) -> Result<AppState, StartupError> {
    let repos = connect_repositories(config).await?;
    let cache_store = build_cache_store(config)?;

    let llm: Option<Arc<dyn LlmService>> = match &config.openai_api_key {
        Some(key) => Some(Arc::new(OpenAiService::new(key.clone()))),
        None => {
            warn!("OPENAI_API_KEY not set, chatbots will answer from FAQs only");
            None
        }
    };

    Ok(AppState::new(config.clone(), repos, cache_store, llm))
}

pub fn build_cache_store(config: &Config) -> Result<Arc<dyn CacheStore>, StartupError> {
    match &config.cache_url {
        Some(url) => {
            info!("Using Redis cache");
            let store = RedisCacheStore::new(url).map_err(|e| StartupError::Cache(e.to_string()))?;
            Ok(Arc::new(store))
        }
        None => {
            info!("No cache URL configured, using in-process cache");
            Ok(Arc::new(MemoryCacheStore::new()))
        }
    }
}

pub async fn connect_repositories(config: &Config) -> Result<Repositories, StartupError> {
    let database_url = &config.database_url;

    if config.is_postgres() {
        info!("Initializing PostgreSQL connection...");

        let opts: PgConnectOptions = database_url.parse()?;
        let opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await?;

        run_postgres_migrations(&pool).await?;

        let activity = Arc::new(PostgresActivityRepo::new(pool.clone()));
        Ok(Repositories {
            tenants: Arc::new(PostgresTenantRepo::new(pool.clone())),
            users: Arc::new(PostgresUserRepo::new(pool.clone())),
            subscriptions: Arc::new(PostgresSubscriptionRepo::new(pool.clone())),
            chatbots: Arc::new(PostgresChatbotRepo::new(pool.clone())),
            faqs: Arc::new(PostgresFaqRepo::new(pool.clone())),
            payments: Arc::new(PostgresPaymentRepo::new(pool)),
            audit: activity.clone(),
            analytics: activity.clone(),
            health: activity,
        })
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        run_sqlite_migrations(&pool).await?;

        let activity = Arc::new(SqliteActivityRepo::new(pool.clone()));
        Ok(Repositories {
            tenants: Arc::new(SqliteTenantRepo::new(pool.clone())),
            users: Arc::new(SqliteUserRepo::new(pool.clone())),
            subscriptions: Arc::new(SqliteSubscriptionRepo::new(pool.clone())),
            chatbots: Arc::new(SqliteChatbotRepo::new(pool.clone())),
            faqs: Arc::new(SqliteFaqRepo::new(pool.clone())),
            payments: Arc::new(SqlitePaymentRepo::new(pool)),
            audit: activity.clone(),
            analytics: activity.clone(),
            health: activity,
        })
    }
}

async fn run_postgres_migrations(pool: &PgPool) -> Result<(), StartupError> {
    sqlx::migrate!("./migrations/postgres").run(pool).await?;
    Ok(())
}

async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), StartupError> {
    sqlx::migrate!("./migrations/sqlite").run(pool).await?;
    Ok(())
}
