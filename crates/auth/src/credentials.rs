//! Credential store: "does (username, secret) match a provisioned principal?"

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use expensegate_core::{DepartmentId, Username};

use crate::principal::{Principal, PrincipalRepository, PrincipalStoreError, Secret};

/// Compares a presented secret against the stored one.
///
/// The store's contract does not change with the verifier, so a salted-hash
/// implementation can replace [`PlaintextVerifier`] without touching callers.
pub trait SecretVerifier: Send + Sync {
    fn verify(&self, presented: &str, stored: &Secret) -> bool;
}

/// Exact, byte-for-byte comparison against a clear-text stored secret.
///
/// Matches how the bootstrap principals are provisioned today. Clear-text
/// storage is a known weakness and this verifier exists only to keep that
/// behaviour explicit.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextVerifier;

impl SecretVerifier for PlaintextVerifier {
    fn verify(&self, presented: &str, stored: &Secret) -> bool {
        presented == stored.expose()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown username or wrong secret (deliberately indistinguishable).
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("principal not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] PrincipalStoreError),
}

/// Read-only view over provisioned principals plus secret verification.
pub struct CredentialStore {
    principals: Arc<dyn PrincipalRepository>,
    verifier: Arc<dyn SecretVerifier>,
}

impl CredentialStore {
    pub fn new(principals: Arc<dyn PrincipalRepository>, verifier: Arc<dyn SecretVerifier>) -> Self {
        Self {
            principals,
            verifier,
        }
    }

    /// Store backed by [`PlaintextVerifier`].
    pub fn plaintext(principals: Arc<dyn PrincipalRepository>) -> Self {
        Self::new(principals, Arc::new(PlaintextVerifier))
    }

    pub fn principals(&self) -> &Arc<dyn PrincipalRepository> {
        &self.principals
    }

    pub async fn authenticate(&self, username: &Username, secret: &str) -> Result<Principal, AuthError> {
        let Some(principal) = self.principals.find_by_username(username).await? else {
            warn!(username = %username, "login attempt for unknown principal");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verifier.verify(secret, principal.secret()) {
            warn!(username = %username, "login attempt with wrong secret");
            return Err(AuthError::InvalidCredentials);
        }

        debug!(username = %username, user_id = %principal.user_id, "credentials accepted");
        Ok(principal)
    }

    pub async fn lookup(&self, username: &Username) -> Result<Principal, AuthError> {
        self.principals
            .find_by_username(username)
            .await?
            .ok_or(AuthError::NotFound)
    }

    pub async fn find_approver(&self, department: DepartmentId) -> Result<Principal, AuthError> {
        self.principals
            .find_approver(department)
            .await?
            .ok_or(AuthError::NotFound)
    }
}
