//! # caliper-core — Foundational Types for the Decision Engine
//!
//! This crate is the leaf of the Caliper workspace DAG. It defines the
//! type-system primitives every other crate builds on: canonical byte
//! production for signature input, content digests, UTC-only timestamps,
//! identifier newtypes, the actor model, and the authority hierarchy.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `DecisionId`,
//!    `ApplicationId`, `AuditRecordId`, `ActorId` — all newtypes with their
//!    own namespaces. No bare strings or raw UUIDs cross a crate boundary.
//!
//! 2. **`CanonicalBytes` newtype.** All signature and digest computation
//!    flows through `CanonicalBytes::new()`. Two call sites serializing the
//!    same record differently would make every stored signature unverifiable,
//!    so the wrong-serialization path is unrepresentable by construction.
//!
//! 3. **Tagged actor type.** `Actor::Human` vs `Actor::System` is an enum,
//!    not a boolean flag next to a name string. The mismatch class of bugs
//!    a flag invites cannot be expressed.
//!
//! 4. **UTC-only timestamps.** `Timestamp` enforces UTC with Z suffix and
//!    seconds precision, matching the canonical serialization rules.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `caliper-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug` and `Clone`, and implement
//!   `Serialize`/`Deserialize` unless they hold secrets.

pub mod actor;
pub mod authority;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use actor::{Actor, ActorId};
pub use authority::{AuthorityLevel, DecisionType};
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, CoreError};
pub use identity::{ApplicationId, AuditRecordId, DecisionId, ExportId};
pub use temporal::Timestamp;
