//! `Dragonfly` (Redis-compatible) dispatch leases.
//!
//! Multi-instance deployments share one `Dragonfly` so that at most one
//! worker dispatches a given withdrawal at a time.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `dispatch:{payment_id}` | String | Holder token, expires with the lease |

use core::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;

use ocean_settlement::{DispatchLock, LockError, LockToken};
use ocean_types::PaymentId;

use crate::error::DbError;

/// Deletes the lease only if it still holds the caller's token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

fn lease_key(payment_id: PaymentId) -> String {
    format!("dispatch:{payment_id}")
}

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl core::fmt::Debug for DragonflyPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DragonflyPool").finish_non_exhaustive()
    }
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Return a reference to the underlying client.
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Close the connection gracefully.
    pub async fn close(&self) -> Result<(), DbError> {
        self.client.quit().await?;
        tracing::info!("Dragonfly connection closed");
        Ok(())
    }
}

/// [`DispatchLock`] shared across processes through `Dragonfly`.
///
/// Acquire is `SET key token NX PX ttl`; release is a compare-and-delete
/// script, so a holder whose lease expired cannot drop a newer holder's
/// lease.
#[derive(Debug, Clone)]
pub struct DragonflyDispatchLock {
    pool: DragonflyPool,
}

impl DragonflyDispatchLock {
    /// Build the lock over a connected pool.
    pub const fn new(pool: DragonflyPool) -> Self {
        Self { pool }
    }

    async fn set_if_absent(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, DbError> {
        let millis = i64::try_from(ttl.as_millis())
            .map_err(|e| DbError::Config(format!("lease ttl {ttl:?}: {e}")))?;
        let reply: Option<String> = self
            .pool
            .client()
            .set(
                key,
                token,
                Some(Expiration::PX(millis)),
                Some(SetOptions::NX),
                false,
            )
            .await?;
        Ok(reply.is_some())
    }

    async fn delete_if_held(&self, key: String, token: &str) -> Result<bool, DbError> {
        let deleted: i64 = self
            .pool
            .client()
            .eval(RELEASE_SCRIPT, vec![key], vec![token.to_owned()])
            .await?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl DispatchLock for DragonflyDispatchLock {
    async fn try_acquire(
        &self,
        payment_id: PaymentId,
        ttl: Duration,
    ) -> Result<Option<LockToken>, LockError> {
        let token = LockToken::new(payment_id);
        let acquired = self
            .set_if_absent(&lease_key(payment_id), &token.token, ttl)
            .await?;
        Ok(acquired.then_some(token))
    }

    async fn release(&self, token: &LockToken) -> Result<(), LockError> {
        let deleted = self
            .delete_if_held(lease_key(token.payment_id), &token.token)
            .await?;
        if !deleted {
            tracing::debug!(payment_id = %token.payment_id, "dispatch lease already gone");
        }
        Ok(())
    }
}
