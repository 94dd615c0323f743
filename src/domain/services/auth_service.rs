use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::rngs::OsRng;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::models::{
    auth::{AccessClaims, RefreshClaims, TokenPair},
    user::User,
};
use crate::domain::ports::CacheUnavailable;
use crate::domain::services::cache_service::CacheService;
use crate::error::AppError;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("token verification failed")]
    Other,
}

pub struct AuthService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    cache: CacheService,
}

impl AuthService {
    pub fn new(config: &Config, cache: CacheService) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            access_ttl: config.jwt_expires_in,
            refresh_ttl: config.jwt_refresh_expires_in,
            cache,
        }
    }

    pub fn generate_tokens(&self, user: &User) -> Result<TokenPair, AppError> {
        let now = Utc::now().timestamp() as usize;

        let access = AccessClaims {
            user_id: user.id.clone(),
            role: user.role.clone(),
            iat: now,
            exp: now + self.access_ttl.as_secs() as usize,
        };
        let refresh = RefreshClaims {
            user_id: user.id.clone(),
            iat: now,
            exp: now + self.refresh_ttl.as_secs() as usize,
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::HS256);
        let access_token = encode(&header, &access, &self.access_encoding).map_err(|e| {
            error!("JWT encoding failed: {}", e);
            AppError::Internal
        })?;
        let refresh_token = encode(&header, &refresh, &self.refresh_encoding).map_err(|e| {
            error!("JWT encoding failed: {}", e);
            AppError::Internal
        })?;

        Ok(TokenPair { access_token, refresh_token })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        verify(token, &self.access_decoding)
    }

    /// Verifies against the refresh secret and the revocation list. An
    /// unreachable cache does not block the refresh.
    pub async fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = verify(token, &self.refresh_decoding)?;

        match self.cache.exists(&revocation_key(token)).await {
            Ok(true) => Err(TokenError::Invalid),
            Ok(false) => Ok(claims),
            Err(_) => {
                warn!(user_id = %claims.user_id, "Revocation list unavailable, accepting refresh token");
                Ok(claims)
            }
        }
    }

    /// Adds the token to the revocation list for the rest of its lifetime.
    pub async fn revoke_refresh_token(&self, token: &str) -> Result<(), CacheUnavailable> {
        let Ok(claims) = verify::<RefreshClaims>(token, &self.refresh_decoding) else {
            return Ok(());
        };
        let now = Utc::now().timestamp() as usize;
        let remaining = Duration::from_secs(claims.exp.saturating_sub(now).max(1) as u64);
        self.cache.set(&revocation_key(token), &true, Some(remaining)).await
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::InternalWithMsg(format!("password hashing failed: {}", e)))
    }

    pub fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(password_hash) else {
            warn!("Stored password hash is not in PHC format");
            return false;
        };
        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    }
}

fn verify<T: DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<T, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<T>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::ImmatureSignature
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => TokenError::Invalid,
            _ => TokenError::Other,
        })
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn revocation_key(token: &str) -> String {
    format!("revoked:{}", hash_token(token))
}
