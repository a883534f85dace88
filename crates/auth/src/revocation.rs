//! Revocation set (logout blacklist).
//!
//! A shared set of token identifiers with a per-entry expiry. Entries lapse on
//! their own once the token they name would have expired anyway, so the set
//! only ever holds tokens that are still otherwise valid.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::claims::TokenId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RevocationError {
    #[error("revocation store unavailable: {0}")]
    Unavailable(String),
}

/// Backend-agnostic revocation set.
///
/// Implementations must make `insert` an atomic check-then-insert per token
/// identifier: of several concurrent inserts for the same id, exactly one
/// observes `true`.
#[async_trait]
pub trait RevocationSet: Send + Sync {
    /// Whether `token_id` is revoked (and its entry has not lapsed at `now`).
    async fn contains(&self, token_id: &TokenId, now: DateTime<Utc>) -> Result<bool, RevocationError>;

    /// Revoke `token_id` until `expires_at`.
    ///
    /// Returns `false` if the identifier was already revoked.
    async fn insert(
        &self,
        token_id: TokenId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, RevocationError>;
}

/// In-memory expiring map for single-instance deployments and tests.
///
/// Lapsed entries are swept on every insert.
#[derive(Debug, Default)]
pub struct InMemoryRevocationSet {
    entries: RwLock<HashMap<TokenId, DateTime<Utc>>>,
}

impl InMemoryRevocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries still live at `now`.
    pub fn live_entries(&self, now: DateTime<Utc>) -> usize {
        match self.entries.read() {
            Ok(map) => map.values().filter(|exp| **exp > now).count(),
            Err(_) => 0,
        }
    }
}

#[async_trait]
impl RevocationSet for InMemoryRevocationSet {
    async fn contains(&self, token_id: &TokenId, now: DateTime<Utc>) -> Result<bool, RevocationError> {
        let map = self
            .entries
            .read()
            .map_err(|_| RevocationError::Unavailable("lock poisoned".to_string()))?;
        Ok(map.get(token_id).is_some_and(|exp| *exp > now))
    }

    async fn insert(
        &self,
        token_id: TokenId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, RevocationError> {
        let mut map = self
            .entries
            .write()
            .map_err(|_| RevocationError::Unavailable("lock poisoned".to_string()))?;

        map.retain(|_, exp| *exp > now);

        if map.contains_key(&token_id) {
            return Ok(false);
        }
        if expires_at <= now {
            // Already moot: the token cannot validate anymore.
            return Ok(true);
        }

        map.insert(token_id, expires_at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn insert_is_check_then_insert() {
        let set = InMemoryRevocationSet::new();
        let id = TokenId::new();

        assert!(set.insert(id, t0() + Duration::minutes(30), t0()).await.unwrap());
        assert!(!set.insert(id, t0() + Duration::minutes(30), t0()).await.unwrap());
        assert!(set.contains(&id, t0()).await.unwrap());
    }

    #[tokio::test]
    async fn entries_lapse_at_their_expiry() {
        let set = InMemoryRevocationSet::new();
        let id = TokenId::new();
        let exp = t0() + Duration::minutes(10);

        set.insert(id, exp, t0()).await.unwrap();
        assert!(set.contains(&id, exp - Duration::seconds(1)).await.unwrap());
        assert!(!set.contains(&id, exp).await.unwrap());

        // Sweep happens on the next insert.
        set.insert(TokenId::new(), exp + Duration::minutes(5), exp).await.unwrap();
        assert_eq!(set.live_entries(exp), 1);
    }

    #[tokio::test]
    async fn already_expired_entries_are_not_stored() {
        let set = InMemoryRevocationSet::new();
        let id = TokenId::new();

        assert!(set.insert(id, t0(), t0()).await.unwrap());
        assert_eq!(set.live_entries(t0() - Duration::seconds(1)), 0);
    }

    #[tokio::test]
    async fn concurrent_inserts_have_a_single_winner() {
        let set = std::sync::Arc::new(InMemoryRevocationSet::new());
        let id = TokenId::new();
        let exp = t0() + Duration::minutes(30);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let set = set.clone();
            handles.push(tokio::spawn(async move { set.insert(id, exp, t0()).await.unwrap() }));
        }

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
