//! Strongly-typed identifiers for engine entities
//!
//! Every identifier wraps a UUID. Review and audit identifiers are minted as
//! UUID v7 so that their natural ordering follows creation time, which gives
//! review ids the "time-derived, collision-free" property the queue relies on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new time-ordered identifier (v7)
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

define_id!(ReviewId, "REV");
define_id!(AuditEventId, "AUD");
define_id!(DecisionId, "DEC");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_id_display() {
        let id = ReviewId::new();
        assert!(id.to_string().starts_with("REV-"));
    }

    #[test]
    fn test_id_parsing_with_and_without_prefix() {
        let original = ReviewId::new();
        let parsed: ReviewId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: ReviewId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, bare);
    }

    #[test]
    fn test_ids_are_time_ordered() {
        let first = ReviewId::new();
        let second = ReviewId::new();
        assert!(first < second);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::now_v7();
        let event_id = AuditEventId::from(uuid);
        let back: Uuid = event_id.into();
        assert_eq!(uuid, back);
    }
}
