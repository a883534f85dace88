use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use expensegate_core::{DepartmentId, Entity, UserId, Username};

/// Authentication secret as provisioned for a principal.
///
/// Opaque to everything except a [`crate::SecretVerifier`]; `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for Secret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// A provisioned principal (user) of the system.
///
/// # Invariants
/// - `username` and `user_id` are each unique within a credential store.
/// - Records are created at provisioning time and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: Username,
    pub display_name: String,
    pub department_id: DepartmentId,
    pub is_approver: bool,
    secret: Secret,
}

impl Principal {
    pub fn new(
        user_id: UserId,
        username: Username,
        display_name: impl Into<String>,
        department_id: DepartmentId,
        is_approver: bool,
        secret: Secret,
    ) -> Self {
        Self {
            user_id,
            username,
            display_name: display_name.into(),
            department_id,
            is_approver,
            secret,
        }
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

impl Entity for Principal {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.user_id
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrincipalStoreError {
    #[error("principal storage error: {0}")]
    Storage(String),
}

/// Repository of provisioned principals.
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Principal>, PrincipalStoreError>;

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<Principal>, PrincipalStoreError>;

    /// First principal of `department` carrying the approver flag.
    ///
    /// "First" is whatever deterministic order the backend iterates in; callers
    /// must not rely on which approver wins when several qualify.
    async fn find_approver(
        &self,
        department: DepartmentId,
    ) -> Result<Option<Principal>, PrincipalStoreError>;

    /// Store a principal unless its username or user id is already taken.
    ///
    /// Returns `false` when the record was skipped.
    async fn provision(&self, principal: Principal) -> Result<bool, PrincipalStoreError>;
}

/// In-memory principal repository, iterating in provisioning order.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalRepository {
    principals: RwLock<Vec<Principal>>,
}

impl InMemoryPrincipalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Principal>>, PrincipalStoreError> {
        self.principals
            .read()
            .map_err(|_| PrincipalStoreError::Storage("lock poisoned".to_string()))
    }

    fn find_where(
        &self,
        pred: impl Fn(&Principal) -> bool,
    ) -> Result<Option<Principal>, PrincipalStoreError> {
        Ok(self.read()?.iter().find(|p| pred(p)).cloned())
    }
}

#[async_trait]
impl PrincipalRepository for InMemoryPrincipalRepository {
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Principal>, PrincipalStoreError> {
        self.find_where(|p| &p.username == username)
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<Principal>, PrincipalStoreError> {
        self.find_where(|p| &p.user_id == user_id)
    }

    async fn find_approver(
        &self,
        department: DepartmentId,
    ) -> Result<Option<Principal>, PrincipalStoreError> {
        self.find_where(|p| p.department_id == department && p.is_approver)
    }

    async fn provision(&self, principal: Principal) -> Result<bool, PrincipalStoreError> {
        let mut principals = self
            .principals
            .write()
            .map_err(|_| PrincipalStoreError::Storage("lock poisoned".to_string()))?;

        let taken = principals
            .iter()
            .any(|p| p.username == principal.username || p.user_id == principal.user_id);
        if taken {
            return Ok(false);
        }

        principals.push(principal);
        Ok(true)
    }
}
