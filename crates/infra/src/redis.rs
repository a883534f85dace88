//! Redis-backed revocation set for multi-instance deployments.
//!
//! Each revoked token is one key, `<prefix><jti>`, set with `NX` and a `PX`
//! expiry equal to the token's remaining lifetime. `SET NX` gives the atomic
//! check-then-insert and Redis expires the entry on its own.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use expensegate_auth::{RevocationError, RevocationSet, TokenId};

/// Default key prefix for revoked token identifiers.
const DEFAULT_KEY_PREFIX: &str = "expensegate:revoked:";

#[derive(Debug, Clone)]
pub struct RedisRevocationSet {
    client: Arc<redis::Client>,
    key_prefix: String,
}

impl RedisRevocationSet {
    /// Create a revocation set on `redis_url` (e.g. "redis://localhost:6379").
    pub fn new(redis_url: impl AsRef<str>, key_prefix: Option<String>) -> Result<Self, RevocationError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RevocationError::Unavailable(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            key_prefix: key_prefix.unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
        })
    }

    fn key(&self, token_id: &TokenId) -> String {
        format!("{}{}", self.key_prefix, token_id)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, RevocationError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RevocationError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl RevocationSet for RedisRevocationSet {
    #[instrument(skip(self, _now), fields(jti = %token_id), err)]
    async fn contains(&self, token_id: &TokenId, _now: DateTime<Utc>) -> Result<bool, RevocationError> {
        let mut conn = self.connection().await?;
        let exists: bool = redis::cmd("EXISTS")
            .arg(self.key(token_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| RevocationError::Unavailable(e.to_string()))?;
        Ok(exists)
    }

    #[instrument(skip(self, now), fields(jti = %token_id, expires_at = %expires_at), err)]
    async fn insert(
        &self,
        token_id: TokenId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, RevocationError> {
        let ttl_ms = (expires_at - now).num_milliseconds();
        if ttl_ms <= 0 {
            debug!("token already expired; nothing to store");
            return Ok(true);
        }

        let mut conn = self.connection().await?;
        // Nil reply means the key already existed.
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key(&token_id))
            .arg(1)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| RevocationError::Unavailable(e.to_string()))?;
        Ok(reply.is_some())
    }
}
