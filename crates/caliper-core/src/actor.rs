//! # Actor Model — Human and System Principals
//!
//! Defines `Actor`, the tagged principal type attached to every audit
//! record, and `ActorId`, the identifier namespace for human accounts.
//!
//! ## Design Decision
//!
//! The distinction between human and system principals is an enum, not a
//! `is_system_generated` boolean sitting next to a free-form name string.
//! With the flag representation, nothing stops a writer from marking a
//! record system-generated while attaching a human account — the anomaly
//! heuristic in the verifier exists to catch exactly that pairing in
//! ingested data. With the tagged type, in-process writers cannot produce
//! the mismatch at all; the heuristic remains for system principals whose
//! process name is not recognized.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a human account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    /// Generate a new random actor identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "actor:{}", self.0)
    }
}

/// A principal acting on a decision: a human account or a system process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    /// A human account resolved by the authentication collaborator.
    Human {
        /// The account identifier.
        id: ActorId,
        /// Display name, carried for audit readability.
        name: String,
    },
    /// An automated process acting on its own authority.
    System {
        /// The process name, e.g. `appeal-window-sweeper`.
        process: String,
    },
}

impl Actor {
    /// Construct a human actor.
    pub fn human(id: ActorId, name: impl Into<String>) -> Self {
        Self::Human {
            id,
            name: name.into(),
        }
    }

    /// Construct a system actor.
    pub fn system(process: impl Into<String>) -> Self {
        Self::System {
            process: process.into(),
        }
    }

    /// Whether this actor is a system process.
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }

    /// The human account id, if any.
    pub fn actor_id(&self) -> Option<ActorId> {
        match self {
            Self::Human { id, .. } => Some(*id),
            Self::System { .. } => None,
        }
    }

    /// The display name: account name for humans, process name for systems.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Human { name, .. } => name,
            Self::System { process } => process,
        }
    }

    /// A stable grouping key, used when correlating records by author.
    pub fn key(&self) -> String {
        match self {
            Self::Human { id, .. } => format!("human:{}", id.0),
            Self::System { process } => format!("system:{process}"),
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human { id, name } => write!(f, "{name} ({id})"),
            Self::System { process } => write!(f, "system/{process}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_actor() {
        let id = ActorId::new();
        let actor = Actor::human(id, "Dana Whitfield");
        assert!(!actor.is_system());
        assert_eq!(actor.actor_id(), Some(id));
        assert_eq!(actor.display_name(), "Dana Whitfield");
    }

    #[test]
    fn test_system_actor() {
        let actor = Actor::system("appeal-window-sweeper");
        assert!(actor.is_system());
        assert_eq!(actor.actor_id(), None);
        assert_eq!(actor.key(), "system:appeal-window-sweeper");
    }

    #[test]
    fn test_keys_distinguish_kinds() {
        let id = ActorId::new();
        let human = Actor::human(id, "x");
        let system = Actor::system("x");
        assert_ne!(human.key(), system.key());
    }

    #[test]
    fn test_serde_tagged_representation() {
        let actor = Actor::system("exporter");
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["kind"], "system");
        assert_eq!(json["process"], "exporter");

        let back: Actor = serde_json::from_value(json).unwrap();
        assert_eq!(actor, back);
    }
}
