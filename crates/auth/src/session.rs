//! Login / verify / logout over a credential store and a token service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use expensegate_core::Username;

use crate::credentials::{AuthError, CredentialStore};
use crate::principal::Principal;
use crate::token::{SessionToken, TokenError, TokenService};

/// Access failures surfaced to callers of protected operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No bearer credential was presented.
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("invalid token: {0}")]
    InvalidToken(TokenError),

    /// Token is valid but its subject no longer resolves to a principal.
    #[error("User not found")]
    UnknownPrincipal,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for AccessError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Signing(msg) => AccessError::Internal(msg),
            TokenError::Backend(err) => AccessError::Internal(err.to_string()),
            other => AccessError::InvalidToken(other),
        }
    }
}

impl From<AuthError> for AccessError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => AccessError::InvalidCredentials,
            AuthError::NotFound => AccessError::UnknownPrincipal,
            AuthError::Store(err) => AccessError::Internal(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct Authenticator {
    credentials: Arc<CredentialStore>,
    tokens: Arc<TokenService>,
}

impl Authenticator {
    pub fn new(credentials: Arc<CredentialStore>, tokens: Arc<TokenService>) -> Self {
        Self { credentials, tokens }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Verify credentials and mint a session token for the principal.
    pub async fn login(
        &self,
        username: &Username,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(Principal, SessionToken), AccessError> {
        let principal = self.credentials.authenticate(username, password).await?;
        let token = self.tokens.issue(&principal.username, now)?;
        info!(username = %principal.username, jti = %token.token_id, "login succeeded");
        Ok((principal, token))
    }

    /// Resolve the bearer credential of a request to its identity.
    pub async fn verify(&self, bearer: Option<&str>, now: DateTime<Utc>) -> Result<Username, AccessError> {
        let token = bearer.ok_or(AccessError::NotAuthenticated)?;
        let subject = self
            .tokens
            .validate(token, now)
            .await
            .inspect_err(|e| warn!(error = %e, "bearer token rejected"))?;
        debug!(username = %subject, "bearer token verified");
        Ok(subject)
    }

    /// Revoke the presented credential. Returns the identity it belonged to.
    pub async fn logout(&self, bearer: Option<&str>, now: DateTime<Utc>) -> Result<Username, AccessError> {
        let token = bearer.ok_or(AccessError::NotAuthenticated)?;
        let subject = self
            .tokens
            .revoke(token, now)
            .await
            .inspect_err(|e| warn!(error = %e, "logout refused"))?;
        info!(username = %subject, "logout succeeded");
        Ok(subject)
    }
}
