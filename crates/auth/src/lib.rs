//! `expensegate-auth` — credentials, session tokens and revocation.
//!
//! This crate is intentionally decoupled from HTTP and storage: repositories and
//! the revocation set are traits, with in-memory implementations for tests and
//! single-instance deployments.

pub mod claims;
pub mod credentials;
pub mod principal;
pub mod revocation;
pub mod session;
pub mod token;

pub use claims::{SessionClaims, TokenId, TokenValidationError, validate_claims};
pub use credentials::{AuthError, CredentialStore, PlaintextVerifier, SecretVerifier};
pub use principal::{
    InMemoryPrincipalRepository, Principal, PrincipalRepository, PrincipalStoreError, Secret,
};
pub use revocation::{InMemoryRevocationSet, RevocationError, RevocationSet};
pub use session::{AccessError, Authenticator};
pub use token::{SessionToken, TokenConfig, TokenError, TokenService, DEFAULT_TOKEN_TTL_MINUTES};
