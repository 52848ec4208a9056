//! Derived, human-readable event log for the Ocean economy.
//!
//! Every successful lifecycle or payment transition is narrated into an
//! [`Event`]. The log is observational: nothing reads it back as state,
//! and losing it loses no money.
//!
//! # Modules
//!
//! - [`narrate`] -- One constructor per transition kind.
//!
//! The [`EventLog`] keeps the newest entries first and drops the oldest
//! once it reaches its capacity.

pub mod narrate;

use tokio::sync::RwLock;

use ocean_types::{Event, FishId, UserId};

/// Default number of events kept in memory.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Capped, newest-first in-memory event log.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    /// All retained events, newest first.
    events: RwLock<Vec<Event>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventLog {
    /// Create an empty log retaining at most `capacity` events.
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: RwLock::const_new(Vec::new()),
        }
    }

    /// Record an event, evicting the oldest if the log is full.
    pub async fn record(&self, event: Event) {
        tracing::debug!(kind = ?event.kind, message = %event.message, "event recorded");
        let mut events = self.events.write().await;
        events.insert(0, event);
        events.truncate(self.capacity);
    }

    /// The `limit` most recent events, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<Event> {
        self.events.read().await.iter().take(limit).cloned().collect()
    }

    /// Events touching `fish_id` as actor or counterpart, newest first.
    pub async fn for_fish(&self, fish_id: FishId, limit: usize) -> Vec<Event> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.fish_id == Some(fish_id) || e.counterpart_fish_id == Some(fish_id))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Events involving `user_id`, newest first.
    pub async fn for_user(&self, user_id: UserId, limit: usize) -> Vec<Event> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.user_id == Some(user_id))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of retained events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Whether the log holds no events.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}
