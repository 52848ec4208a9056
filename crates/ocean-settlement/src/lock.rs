//! Per-payment dispatch lock.
//!
//! The worker holds a lease on a withdrawal for the length of one dispatch
//! attempt so that two cycles (in one process or several) never submit the
//! same withdrawal at once. Leases expire on their own, so a crashed
//! holder cannot block a payment forever. Release is token-checked: only
//! the holder that acquired a lease can drop it.
//!
//! [`InMemoryDispatchLock`] serves a single process. The Dragonfly-backed
//! lock for multi-instance deployments lives in `ocean-db`.

use core::time::Duration;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use ocean_types::PaymentId;

use crate::error::LockError;

/// Proof of holding a lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    /// The locked payment.
    pub payment_id: PaymentId,
    /// Random value identifying this holder.
    pub token: String,
}

impl LockToken {
    /// Mint a fresh token for `payment_id`.
    pub fn new(payment_id: PaymentId) -> Self {
        Self {
            payment_id,
            token: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Lease-based lock keyed by payment.
#[async_trait]
pub trait DispatchLock: Send + Sync + core::fmt::Debug {
    /// Take the lease if nobody holds it. `None` means it is held.
    async fn try_acquire(
        &self,
        payment_id: PaymentId,
        ttl: Duration,
    ) -> Result<Option<LockToken>, LockError>;

    /// Drop a lease. Releasing a lease that expired or was taken over is a
    /// no-op.
    async fn release(&self, token: &LockToken) -> Result<(), LockError>;
}

/// Process-local [`DispatchLock`].
#[derive(Debug, Default)]
pub struct InMemoryDispatchLock {
    leases: Mutex<HashMap<PaymentId, (String, Instant)>>,
}

impl InMemoryDispatchLock {
    /// Create a lock with no leases.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DispatchLock for InMemoryDispatchLock {
    async fn try_acquire(
        &self,
        payment_id: PaymentId,
        ttl: Duration,
    ) -> Result<Option<LockToken>, LockError> {
        let now = Instant::now();
        let mut leases = self.leases.lock().await;
        if let Some((_, expires)) = leases.get(&payment_id)
            && *expires > now
        {
            return Ok(None);
        }
        let expires = now
            .checked_add(ttl)
            .ok_or_else(|| LockError("lease ttl overflowed".to_owned()))?;
        let token = LockToken::new(payment_id);
        leases.insert(payment_id, (token.token.clone(), expires));
        Ok(Some(token))
    }

    async fn release(&self, token: &LockToken) -> Result<(), LockError> {
        let mut leases = self.leases.lock().await;
        if leases
            .get(&token.payment_id)
            .is_some_and(|(held, _)| *held == token.token)
        {
            leases.remove(&token.payment_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn second_acquire_is_refused_until_release() {
        let lock = InMemoryDispatchLock::new();
        let payment = PaymentId::new();

        let held = lock.try_acquire(payment, TTL).await.ok().flatten();
        assert!(held.is_some());
        assert_eq!(lock.try_acquire(payment, TTL).await, Ok(None));

        if let Some(token) = held {
            assert!(lock.release(&token).await.is_ok());
        }
        assert!(lock.try_acquire(payment, TTL).await.ok().flatten().is_some());
    }

    #[tokio::test]
    async fn stale_token_cannot_release() {
        let lock = InMemoryDispatchLock::new();
        let payment = PaymentId::new();
        let _held = lock.try_acquire(payment, TTL).await;

        let impostor = LockToken::new(payment);
        assert!(lock.release(&impostor).await.is_ok());
        assert_eq!(lock.try_acquire(payment, TTL).await, Ok(None));
    }

    #[tokio::test]
    async fn lease_expires() {
        let lock = InMemoryDispatchLock::new();
        let payment = PaymentId::new();
        let _held = lock.try_acquire(payment, Duration::from_millis(10)).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(lock.try_acquire(payment, TTL).await.ok().flatten().is_some());
    }

    #[tokio::test]
    async fn different_payments_do_not_contend() {
        let lock = InMemoryDispatchLock::new();
        let a = lock.try_acquire(PaymentId::new(), TTL).await.ok().flatten();
        let b = lock.try_acquire(PaymentId::new(), TTL).await.ok().flatten();
        assert!(a.is_some() && b.is_some());
    }
}
