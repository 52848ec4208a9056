//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the economy has a strongly-typed ID so a fish id can
//! never be passed where a payment id is expected. All IDs use UUID v7
//! (time-ordered) for efficient database indexing.
//!
//! `UserId` values are minted by the external authentication service; the
//! core only ever receives them already verified.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl core::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a creature (fish) in the ocean.
    FishId
}

define_id! {
    /// Verified identifier of a participant, supplied by the auth service.
    UserId
}

define_id! {
    /// Unique identifier for a deposit or withdrawal payment.
    PaymentId
}

define_id! {
    /// Unique identifier for a ledger entry (signed balance movement).
    LedgerEntryId
}

define_id! {
    /// Unique identifier for an entry in the derived event log.
    EventId
}

define_id! {
    /// Unique identifier for an operator-facing worker alert.
    AlertId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let fish = FishId::new();
        let payment = PaymentId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(fish.into_inner(), Uuid::nil());
        assert_ne!(payment.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_parses_from_display() {
        let original = UserId::new();
        let parsed: Result<UserId, _> = original.to_string().parse();
        assert_eq!(parsed.ok(), Some(original));
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = FishId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{id}\""));
    }
}
