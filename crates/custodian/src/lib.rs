//! # custodian: unified access-control decisions
//!
//! Composes five access-control models into one allow/deny decision with a
//! human-readable reason and the model that produced it.
//!
//! ```text
//!                 ┌───────┐   ┌───────┐   ┌───────┐   ┌───────┐   ┌───────┐
//! AccessRequest ─►│  MAC  │──►│ RuBAC │──►│ RBAC  │──►│ ABAC  │──►│  DAC  │──► decision
//!                 └───┬───┘   └───┬───┘   └───┬───┘   └───┬───┘   └───┬───┘
//!                     └───────────┴─── first denial ends ─┴───────────┘
//! ```
//!
//! | Gate  | Runs when                  | Crate              |
//! |-------|----------------------------|--------------------|
//! | MAC   | a resource is targeted     | `custodian-mac`    |
//! | RuBAC | always                     | `custodian-rubac`  |
//! | RBAC  | the call names a permission| `custodian-rbac`   |
//! | ABAC  | a resource is targeted     | `custodian-abac`   |
//! | DAC   | a resource is targeted     | `custodian-dac`    |
//!
//! When a resource is targeted the DAC verdict is final, except that a view
//! of a PUBLIC resource without a grant is allowed. Without a resource the
//! RBAC pass is the decision; with neither a resource nor a permission the
//! request is denied.
//!
//! Store failures, timeouts, and cancellation surface as [`EngineError`],
//! never as a denial.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use custodian::Engine;
//! use custodian_store::{Grant, GrantPermissions, MemoryStore};
//! use custodian_types::{AccessModel, Action, Actor, ResourceId, ResourceRecord, SecurityLevel};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let alice = Actor::new("alice", "r-emp", SecurityLevel::Confidential).with_department("Finance");
//! let store = MemoryStore::new()
//!     .with_actor(alice.clone())
//!     .with_resource(
//!         ResourceRecord::new("budget", "bob", SecurityLevel::Confidential).with_department("Finance"),
//!     )
//!     .with_grant(Grant::new("budget", "alice", GrantPermissions::view_only(), "bob"));
//!
//! let engine = Engine::new(Arc::new(store));
//! let budget = ResourceId::new("budget");
//!
//! let view = engine.decide(&alice, Some(&budget), Action::View, None).await.unwrap();
//! assert!(view.is_allowed());
//!
//! let edit = engine.decide(&alice, Some(&budget), Action::Edit, None).await.unwrap();
//! assert!(edit.is_denied());
//! assert_eq!(edit.model(), AccessModel::Dac);
//! # }
//! ```

mod audit;
mod clock;
mod engine;
mod error;
pub mod gate;
mod guard;
mod request;


pub use audit::{
    AuditError, AuditSink, DecisionEvent, DecisionStatus, MemoryAuditSink, Operation,
    TracingAuditSink,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{
    Engine, GrantChange, NO_CHECKS_PASSED_REASON, RESOURCE_NOT_FOUND_REASON,
    REVOKE_REQUIRES_OWNER_REASON, SHARE_REQUIRES_OWNER_REASON,
};
pub use error::{EngineError, Result};
pub use gate::{ATTRIBUTES_UNAVAILABLE_REASON, Gate, GateContext, GateOutcome, PUBLIC_RESOURCE_REASON};
pub use request::AccessRequest;
pub use tokio_util::sync::CancellationToken;
