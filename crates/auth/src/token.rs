//! Session token service: HS256-signed bearer tokens with a revocation set.
//!
//! Issuance is stateless. Validation checks, in order: signature/structure,
//! the claim time window, the revocation set, and finally the subject.

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::{debug, info, warn};

use expensegate_core::Username;

use crate::claims::{SessionClaims, TokenId, TokenValidationError, validate_claims};
use crate::revocation::{RevocationError, RevocationSet};

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Config with the default 30-minute lifetime.
    pub fn with_default_ttl(secret: impl Into<Vec<u8>>) -> Self {
        Self::new(secret, Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl core::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"***")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub access_token: String,
    pub token_id: TokenId,
    pub subject: Username,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub const TOKEN_TYPE: &'static str = "bearer";
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, undecodable structure or inconsistent time window.
    #[error("{0}")]
    Malformed(String),

    #[error("Signature has expired")]
    Expired,

    #[error("token has been revoked")]
    Revoked,

    #[error("token carries no subject")]
    MissingSubject,

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error(transparent)]
    Backend(#[from] RevocationError),
}

impl From<TokenValidationError> for TokenError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Expired => TokenError::Expired,
            other => TokenError::Malformed(other.to_string()),
        }
    }
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    revocations: Arc<dyn RevocationSet>,
}

impl TokenService {
    pub fn new(config: TokenConfig, revocations: Arc<dyn RevocationSet>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // The time window is checked against the caller's clock in `validate_claims`.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(&config.secret),
            decoding: DecodingKey::from_secret(&config.secret),
            validation,
            ttl: config.ttl,
            revocations,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a fresh token for `subject`, valid for `[now, now + ttl)`.
    pub fn issue(&self, subject: &Username, now: DateTime<Utc>) -> Result<SessionToken, TokenError> {
        let issued_at = now.trunc_subsecs(0);
        let claims = SessionClaims {
            sub: Some(subject.clone()),
            issued_at,
            expires_at: issued_at + self.ttl,
            jti: TokenId::new(),
        };

        let access_token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        debug!(subject = %subject, jti = %claims.jti, "session token issued");

        Ok(SessionToken {
            access_token,
            token_id: claims.jti,
            subject: subject.clone(),
            issued_at: claims.issued_at,
            expires_at: claims.expires_at,
        })
    }

    /// Verify `token` and return its subject.
    pub async fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Username, TokenError> {
        let claims = self.verified_claims(token, now).await?;
        claims.sub.ok_or(TokenError::MissingSubject)
    }

    /// Verify `token`, then add its identifier to the revocation set until it
    /// would have expired. Returns the subject.
    pub async fn revoke(&self, token: &str, now: DateTime<Utc>) -> Result<Username, TokenError> {
        let claims = self.verified_claims(token, now).await?;
        let subject = claims.sub.ok_or(TokenError::MissingSubject)?;

        let inserted = self
            .revocations
            .insert(claims.jti, claims.expires_at, now)
            .await?;
        if !inserted {
            // Lost a race against a concurrent logout of the same token.
            warn!(jti = %claims.jti, "token revoked concurrently");
            return Err(TokenError::Revoked);
        }

        info!(subject = %subject, jti = %claims.jti, "session token revoked");
        Ok(subject)
    }

    async fn verified_claims(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let claims = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        validate_claims(&claims, now)?;

        if self.revocations.contains(&claims.jti, now).await? {
            debug!(jti = %claims.jti, "presented token is revoked");
            return Err(TokenError::Revoked);
        }

        Ok(claims)
    }
}
