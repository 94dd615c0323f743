use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::chatbot::{CHATBOT_MODELS, DEFAULT_MODEL};

const MIN_SECRET_LEN: usize = 32;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct RateLimitSettings {
    pub window: Duration,
    pub max_requests: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub jwt_expires_in: Duration,
    pub jwt_refresh_expires_in: Duration,
    pub cache_url: Option<String>,
    pub openai_api_key: Option<String>,
    /// Model given to chatbots created without one.
    pub openai_model: String,
    pub rate_limit: RateLimitSettings,
    pub max_request_bytes: u64,
    pub multi_tenant: bool,
    pub log_level: String,
    pub ip_blacklist: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let jwt_refresh_secret = var("JWT_REFRESH_SECRET").ok_or(ConfigError::Missing("JWT_REFRESH_SECRET"))?;
        validate_secrets(&jwt_secret, &jwt_refresh_secret)?;

        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: format!("'{}' is not a port number", raw),
            })?,
            None => 3001,
        };

        let openai_model = var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if !CHATBOT_MODELS.contains(&openai_model.as_str()) {
            return Err(ConfigError::Invalid {
                name: "OPENAI_MODEL",
                reason: format!("'{}' is not one of {}", openai_model, CHATBOT_MODELS.join(", ")),
            });
        }

        let window_ms: u64 = parse_number("RATE_LIMIT_WINDOW_MS", var("RATE_LIMIT_WINDOW_MS"), 900_000)?;
        let max_requests = parse_number("RATE_LIMIT_MAX_REQUESTS", var("RATE_LIMIT_MAX_REQUESTS"), 100)?;

        Ok(Self {
            port,
            database_url,
            cors_origins: split_list(var("CORS_ORIGINS").as_deref().unwrap_or("http://localhost:3000")),
            jwt_secret,
            jwt_refresh_secret,
            jwt_expires_in: parse_duration_var("JWT_EXPIRES_IN", var("JWT_EXPIRES_IN"), Duration::from_secs(15 * 60))?,
            jwt_refresh_expires_in: parse_duration_var(
                "JWT_REFRESH_EXPIRES_IN",
                var("JWT_REFRESH_EXPIRES_IN"),
                Duration::from_secs(7 * 24 * 3600),
            )?,
            cache_url: var("CACHE_URL").or_else(|| var("REDIS_URL")),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model,
            rate_limit: RateLimitSettings {
                window: Duration::from_millis(window_ms),
                max_requests,
            },
            max_request_bytes: parse_number("MAX_FILE_SIZE", var("MAX_FILE_SIZE"), 10 * 1024 * 1024)?,
            multi_tenant: var("MULTI_TENANT").map(|v| v != "false" && v != "0").unwrap_or(true),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            ip_blacklist: split_list(var("IP_BLACKLIST").as_deref().unwrap_or("")),
        })
    }

    pub fn is_postgres(&self) -> bool {
        self.database_url.starts_with("postgres://") || self.database_url.starts_with("postgresql://")
    }
}

fn validate_secrets(access: &str, refresh: &str) -> Result<(), ConfigError> {
    if access.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Invalid {
            name: "JWT_SECRET",
            reason: format!("must be at least {} bytes", MIN_SECRET_LEN),
        });
    }
    if refresh.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Invalid {
            name: "JWT_REFRESH_SECRET",
            reason: format!("must be at least {} bytes", MIN_SECRET_LEN),
        });
    }
    if access == refresh {
        return Err(ConfigError::Invalid {
            name: "JWT_REFRESH_SECRET",
            reason: "must differ from JWT_SECRET".to_string(),
        });
    }
    Ok(())
}

fn parse_number(name: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("'{}' is not a number", raw),
        }),
        None => Ok(default),
    }
}

fn parse_duration_var(name: &'static str, raw: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    match raw {
        Some(raw) => parse_duration(&raw).ok_or(ConfigError::Invalid {
            name,
            reason: format!("'{}' is not a duration (expected e.g. 30s, 15m, 12h, 7d)", raw),
        }),
        None => Ok(default),
    }
}

/// Parses `<n>s|m|h|d`, or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits.parse().ok()?;
    let secs = match unit {
        "" | "s" => value,
        "m" => value.checked_mul(60)?,
        "h" => value.checked_mul(3600)?,
        "d" => value.checked_mul(86_400)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const ACCESS: &str = "access-secret-access-secret-access-secret";
    const REFRESH: &str = "refresh-secret-refresh-secret-refresh-secret";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_duration("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_duration("7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("5w"), None);
    }

    #[test]
    fn test_missing_secrets_fail_startup() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "sqlite://x.db")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));

        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://x.db"),
            ("JWT_SECRET", ACCESS),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_REFRESH_SECRET"));
    }

    #[test]
    fn test_weak_or_shared_secrets_rejected() {
        let short = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://x.db"),
            ("JWT_SECRET", "short"),
            ("JWT_REFRESH_SECRET", REFRESH),
        ]));
        assert!(matches!(short, Err(ConfigError::Invalid { name: "JWT_SECRET", .. })));

        let shared = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://x.db"),
            ("JWT_SECRET", ACCESS),
            ("JWT_REFRESH_SECRET", ACCESS),
        ]));
        assert!(matches!(shared, Err(ConfigError::Invalid { name: "JWT_REFRESH_SECRET", .. })));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://x.db"),
            ("JWT_SECRET", ACCESS),
            ("JWT_REFRESH_SECRET", REFRESH),
            ("IP_BLACKLIST", "10.0.0.1, 10.0.0.2"),
        ]))
        .unwrap();

        assert_eq!(config.port, 3001);
        assert_eq!(config.jwt_expires_in, Duration::from_secs(900));
        assert_eq!(config.jwt_refresh_expires_in, Duration::from_secs(604_800));
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window, Duration::from_secs(900));
        assert_eq!(config.max_request_bytes, 10_485_760);
        assert!(config.multi_tenant);
        assert!(config.cache_url.is_none());
        assert!(!config.is_postgres());
        assert_eq!(config.ip_blacklist, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(config.openai_model, "gpt-4o-mini");
    }

    #[test]
    fn test_unknown_default_model_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://x.db"),
            ("JWT_SECRET", ACCESS),
            ("JWT_REFRESH_SECRET", REFRESH),
            ("OPENAI_MODEL", "gpt-2"),
        ]));
        assert!(matches!(err, Err(ConfigError::Invalid { name: "OPENAI_MODEL", .. })));
    }
}
