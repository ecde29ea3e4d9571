//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all identifier namespaces in the decision engine.
//! You cannot pass a `DecisionId` where an `ApplicationId` is expected, and
//! an audit record id can never stand in for the decision it describes.
//!
//! ## Security Invariant
//!
//! Identifier confusion in this domain is an integrity defect: an audit
//! record bound to the wrong decision id would verify cleanly while
//! describing the wrong history. Type-level namespaces remove that
//! substitution class entirely.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! identifier {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

identifier!(
    /// Unique identifier for a hiring decision.
    DecisionId,
    "decision"
);

identifier!(
    /// Unique identifier for a candidate application.
    ApplicationId,
    "application"
);

identifier!(
    /// Unique identifier for an audit record.
    AuditRecordId,
    "audit"
);

identifier!(
    /// Unique identifier for an audit export.
    ExportId,
    "export"
);
