//! # custodian-abac: Attribute-Based Access Control
//!
//! Policies are boolean predicates over three attribute categories:
//! - **Actor attributes**: department, location, employment status, job level
//! - **Resource attributes**: department, sensitivity
//! - **Environment attributes**: evaluation time, working-hours flag, network origin
//!
//! A policy that holds allows access ("Policy conditions met"); one that does
//! not denies it ("Policy conditions not met"). Policies compose with
//! [`evaluate_any`] (OR, first allowing policy wins) and [`evaluate_all`]
//! (AND, first denying policy wins).
//!
//! [`StandardPolicy`] is the built-in catalogue. Any
//! `Fn(&AttributeContext) -> bool` closure is a policy too.
//!
//! ```
//! use chrono::Utc;
//! use custodian_abac::{
//!     evaluate, AttributeContext, EnvironmentAttributes, ResourceAttributes, StandardPolicy,
//! };
//! use custodian_store::ActorAttributes;
//! use custodian_types::{EmploymentStatus, SecurityLevel};
//!
//! let ctx = AttributeContext::new(
//!     ActorAttributes {
//!         department: Some("IT".into()),
//!         location: None,
//!         employment_status: EmploymentStatus::Active,
//!         job_level: None,
//!     },
//!     EnvironmentAttributes::new(Utc::now(), true),
//! )
//! .with_resource(ResourceAttributes::new(SecurityLevel::Internal).with_department("HR"));
//!
//! assert!(evaluate(&ctx, &StandardPolicy::SameDepartment).is_denied());
//! assert!(evaluate(&ctx, &|c: &AttributeContext| c.actor.department.is_some()).is_allowed());
//! ```

mod attributes;
mod evaluator;
mod policy;

pub use attributes::{AttributeContext, EnvironmentAttributes, ResourceAttributes};
pub use evaluator::{
    ALL_ALLOWED_REASON, AbacError, CONDITIONS_MET_REASON, CONDITIONS_NOT_MET_REASON,
    NONE_ALLOWED_REASON, ONE_DENIED_REASON, Result, evaluate, evaluate_all, evaluate_any,
};
pub use policy::{AttributePolicy, StandardPolicy};
