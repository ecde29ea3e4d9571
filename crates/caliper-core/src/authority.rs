//! # Authority Hierarchy
//!
//! Defines `DecisionType`, the unit of authority validation, and
//! `AuthorityLevel`, the ordered role tier that gates which decision types
//! an actor may submit.
//!
//! The authority *assignments* (which actor holds which level) live in an
//! external table behind the `AuthorityDirectory` trait in
//! `caliper-decision`; this module owns only the level semantics, so the
//! gating rules are identical everywhere the levels are consulted.

use serde::{Deserialize, Serialize};

/// The outcome type of a submitted hiring decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    /// Candidate approved for hire.
    Approved,
    /// Candidate rejected.
    Rejected,
    /// Decision handed to a different approver.
    Delegated,
}

impl std::fmt::Display for DecisionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Delegated => "delegated",
        };
        f.write_str(s)
    }
}

/// Ordered authority tiers for decision approvers.
///
/// The discriminants give the ordering used for tier comparison; the
/// permitted decision types per tier are explicit in [`permits()`]
/// rather than derived from rank, because the two do not coincide (a
/// manager may delegate but not approve).
///
/// [`permits()`]: AuthorityLevel::permits
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AuthorityLevel {
    /// Line manager: may hand decisions up, not conclude them.
    Manager = 1,
    /// Senior manager: full approve/reject/delegate authority.
    SeniorManager = 2,
    /// Regional manager: senior authority plus appeal review.
    RegionalManager = 3,
    /// Administrator: unrestricted.
    Admin = 4,
}

impl AuthorityLevel {
    /// The numeric rank (1-4) of this tier.
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Whether this tier may submit the given decision type.
    pub fn permits(&self, decision_type: DecisionType) -> bool {
        match self {
            Self::Manager => matches!(decision_type, DecisionType::Delegated),
            Self::SeniorManager | Self::RegionalManager | Self::Admin => true,
        }
    }

    /// Whether this tier may review appeals of rejections.
    pub fn may_review_appeals(&self) -> bool {
        *self >= Self::RegionalManager
    }
}

impl std::fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Manager => "MANAGER",
            Self::SeniorManager => "SENIOR_MANAGER",
            Self::RegionalManager => "REGIONAL_MANAGER",
            Self::Admin => "ADMIN",
        };
        f.write_str(s)
    }
}
