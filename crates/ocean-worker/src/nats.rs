//! NATS bridge to the external transfer rail and to users.
//!
//! # Subject Convention
//!
//! - **Withdrawal dispatch (request/reply):** `rail.nats_subject`, default
//!   `rail.withdrawals.dispatch`. The request body is a JSON
//!   [`DispatchRequest`]; the reply is either `{"tx_hash": ...}` or
//!   `{"error": ...}`.
//! - **Inbound transfers (subscribe):** `infrastructure.inbound_subject`,
//!   default `rail.inbound`. Each message is one [`InboundMessage`].
//! - **Notifications (publish):** `{notification_prefix}.{user_id}`.

use core::time::Duration;

use async_trait::async_trait;
use futures::StreamExt as _;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use ocean_settlement::{
    DispatchReceipt, DispatchRequest, Notification, Notifier, NotifyError, PushOutcome,
    RailError, Reconciler, TransferRail,
};

use crate::error::WorkerError;

/// Connect to a NATS server.
pub async fn connect(url: &str) -> Result<async_nats::Client, WorkerError> {
    async_nats::connect(url)
        .await
        .map_err(|e| WorkerError::Nats {
            message: format!("failed to connect to NATS at {url}: {e}"),
        })
}

// ---------------------------------------------------------------------------
// Rail
// ---------------------------------------------------------------------------

/// Reply from the rail bridge.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RailReply {
    Accepted(DispatchReceipt),
    Refused { error: String },
}

/// Transfer rail reached through NATS request/reply.
pub struct NatsRail {
    client: async_nats::Client,
    subject: String,
    timeout: Duration,
}

impl core::fmt::Debug for NatsRail {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NatsRail")
            .field("subject", &self.subject)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl NatsRail {
    /// Create a rail over an existing client.
    pub const fn new(client: async_nats::Client, subject: String, timeout: Duration) -> Self {
        Self {
            client,
            subject,
            timeout,
        }
    }
}

/// Decode a rail bridge reply body.
fn decode_reply(payload: &[u8]) -> Result<DispatchReceipt, RailError> {
    match serde_json::from_slice::<RailReply>(payload) {
        Ok(RailReply::Accepted(receipt)) if !receipt.tx_hash.trim().is_empty() => Ok(receipt),
        Ok(RailReply::Accepted(_)) => Err(RailError::Malformed("empty tx_hash".to_owned())),
        Ok(RailReply::Refused { error }) => Err(RailError::Rejected(error)),
        Err(e) => Err(RailError::Malformed(e.to_string())),
    }
}

#[async_trait]
impl TransferRail for NatsRail {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReceipt, RailError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| RailError::Malformed(e.to_string()))?;
        let pending = self.client.request(self.subject.clone(), payload.into());
        let reply = match tokio::time::timeout(self.timeout, pending).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return Err(RailError::Unavailable(e.to_string())),
            Err(_elapsed) => return Err(RailError::Timeout),
        };
        decode_reply(&reply.payload)
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Publishes notifications on a per-user subject.
pub struct NatsNotifier {
    client: async_nats::Client,
    prefix: String,
}

impl core::fmt::Debug for NatsNotifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NatsNotifier")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl NatsNotifier {
    /// Create a notifier over an existing client.
    pub const fn new(client: async_nats::Client, prefix: String) -> Self {
        Self { client, prefix }
    }
}

fn notification_subject(prefix: &str, notification: &Notification) -> String {
    format!("{prefix}.{}", notification.user_id())
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload =
            serde_json::to_vec(notification).map_err(|e| NotifyError(e.to_string()))?;
        self.client
            .publish(notification_subject(&self.prefix, notification), payload.into())
            .await
            .map_err(|e| NotifyError(e.to_string()))?;
        debug!(kind = notification.kind(), "notification published");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Inbound transfers
// ---------------------------------------------------------------------------

/// One transfer observed on the rail.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    /// Rail transaction hash.
    pub tx_hash: String,
    /// Amount in base units.
    pub amount: Decimal,
    /// Memo attached by the sender.
    #[serde(default)]
    pub memo: Option<String>,
    /// Confirmations seen so far.
    #[serde(default)]
    pub confirmations: u32,
}

/// Feed one raw message into the reconciler.
///
/// Malformed or rejected messages are logged and dropped; the rail watcher
/// re-publishes as confirmations grow.
pub async fn handle_inbound(reconciler: &Reconciler, payload: &[u8]) -> Option<PushOutcome> {
    let message = match serde_json::from_slice::<InboundMessage>(payload) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "failed to deserialize inbound transfer");
            return None;
        }
    };
    match reconciler
        .push_inbound_transfer(
            &message.tx_hash,
            message.amount,
            message.memo.as_deref(),
            message.confirmations,
        )
        .await
    {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!(tx_hash = %message.tx_hash, error = %e, "inbound transfer rejected");
            None
        }
    }
}

/// Subscribe to `subject` and feed every message into the reconciler until
/// `shutdown` flips.
pub async fn run_inbound_subscriber(
    client: async_nats::Client,
    subject: String,
    reconciler: Reconciler,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), WorkerError> {
    let mut sub = client
        .subscribe(subject.clone())
        .await
        .map_err(|e| WorkerError::Nats {
            message: format!("failed to subscribe to {subject}: {e}"),
        })?;
    info!(subject = %subject, "Inbound transfer subscription started");

    loop {
        tokio::select! {
            msg = sub.next() => {
                let Some(msg) = msg else {
                    warn!("inbound transfer subscription closed");
                    break;
                };
                handle_inbound(&reconciler, &msg.payload).await;
            }
            _ = shutdown.changed() => break,
        }
    }

    if let Err(e) = sub.unsubscribe().await {
        debug!(error = %e, "inbound unsubscribe failed");
    }
    info!("Inbound transfer subscription stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ocean_events::EventLog;
    use ocean_settlement::{AlertStore, InMemorySettlementStore, LogNotifier, PaymentService};
    use ocean_types::{PaymentId, SystemClock, UserId};
    use tokio::sync::RwLock;

    use super::*;

    fn reconciler() -> Reconciler {
        let payments = PaymentService::new(
            Arc::new(InMemorySettlementStore::new()),
            Arc::new(SystemClock),
            Arc::new(EventLog::default()),
        );
        Reconciler::new(
            payments,
            Arc::new(LogNotifier),
            Arc::new(RwLock::new(AlertStore::new())),
            3,
        )
    }

    #[test]
    fn receipt_reply_decodes() {
        let receipt = decode_reply(br#"{"tx_hash":"0xabc"}"#);
        assert_eq!(
            receipt,
            Ok(DispatchReceipt {
                tx_hash: "0xabc".to_owned()
            })
        );
    }

    #[test]
    fn error_reply_is_rejection() {
        assert_eq!(
            decode_reply(br#"{"error":"address blocked"}"#),
            Err(RailError::Rejected("address blocked".to_owned()))
        );
    }

    #[test]
    fn garbage_reply_is_malformed() {
        assert!(matches!(decode_reply(b"not json"), Err(RailError::Malformed(_))));
        assert!(matches!(
            decode_reply(br#"{"tx_hash":"  "}"#),
            Err(RailError::Malformed(_))
        ));
    }

    #[test]
    fn notifications_go_to_user_subject() {
        let user_id = UserId::new();
        let note = Notification::DepositConfirmed {
            user_id,
            payment_id: PaymentId::new(),
            amount: Decimal::ONE,
        };
        assert_eq!(
            notification_subject("notifications", &note),
            format!("notifications.{user_id}")
        );
    }

    #[tokio::test]
    async fn inbound_message_is_buffered() {
        let reconciler = reconciler();
        let payload = br#"{"tx_hash":"0x1","amount":"500","memo":"m","confirmations":1}"#;
        let outcome = handle_inbound(&reconciler, payload).await;
        assert!(matches!(outcome, Some(PushOutcome::Buffered { .. })));
    }

    #[tokio::test]
    async fn bad_inbound_messages_are_dropped() {
        let reconciler = reconciler();
        assert_eq!(handle_inbound(&reconciler, b"{}").await, None);
        let zero = br#"{"tx_hash":"0x2","amount":"0"}"#;
        assert_eq!(handle_inbound(&reconciler, zero).await, None);
    }
}
