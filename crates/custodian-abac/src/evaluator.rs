//! ABAC policy evaluation.

use custodian_store::StoreError;
use custodian_types::{AccessDecision, AccessModel, ActorId, InvalidInput, ResourceId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::attributes::AttributeContext;
use crate::policy::AttributePolicy;

pub const CONDITIONS_MET_REASON: &str = "Policy conditions met";
pub const CONDITIONS_NOT_MET_REASON: &str = "Policy conditions not met";
pub const NONE_ALLOWED_REASON: &str = "None of the policies allowed access";
pub const ONE_DENIED_REASON: &str = "One or more policies denied access";
pub const ALL_ALLOWED_REASON: &str = "All policies allowed access";

/// Error type for attribute loading and batch evaluation.
#[derive(Debug, Error)]
pub enum AbacError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// No attribute bundle is recorded for the actor.
    #[error("no attributes recorded for actor '{0}'")]
    ActorNotFound(ActorId),

    #[error("resource '{0}' not found")]
    ResourceNotFound(ResourceId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, AbacError>;

/// Evaluates a single policy.
pub fn evaluate<P>(ctx: &AttributeContext, policy: &P) -> AccessDecision
where
    P: AttributePolicy + ?Sized,
{
    if policy.holds(ctx) {
        debug!(policy = policy.name(), "Policy conditions met");
        AccessDecision::allow(AccessModel::Abac, CONDITIONS_MET_REASON)
    } else {
        warn!(policy = policy.name(), "Policy conditions not met");
        AccessDecision::deny(AccessModel::Abac, CONDITIONS_NOT_MET_REASON)
    }
}

/// OR composition: the first policy that holds allows.
pub fn evaluate_any(
    ctx: &AttributeContext,
    policies: &[&dyn AttributePolicy],
) -> Result<AccessDecision> {
    if policies.is_empty() {
        return Err(InvalidInput::Empty { field: "policies" }.into());
    }

    Ok(policies
        .iter()
        .map(|policy| evaluate(ctx, *policy))
        .find(AccessDecision::is_allowed)
        .unwrap_or_else(|| AccessDecision::deny(AccessModel::Abac, NONE_ALLOWED_REASON)))
}

/// AND composition: the first policy that does not hold denies.
pub fn evaluate_all(
    ctx: &AttributeContext,
    policies: &[&dyn AttributePolicy],
) -> Result<AccessDecision> {
    if policies.is_empty() {
        return Err(InvalidInput::Empty { field: "policies" }.into());
    }

    if policies.iter().all(|policy| policy.holds(ctx)) {
        Ok(AccessDecision::allow(AccessModel::Abac, ALL_ALLOWED_REASON))
    } else {
        Ok(AccessDecision::deny(AccessModel::Abac, ONE_DENIED_REASON))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{EnvironmentAttributes, ResourceAttributes};
    use crate::policy::StandardPolicy;
    use chrono::Utc;
    use custodian_store::ActorAttributes;
    use custodian_types::{EmploymentStatus, JobLevel, SecurityLevel};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn hr_manager_on_hr_doc() -> AttributeContext {
        AttributeContext::new(
            ActorAttributes {
                department: Some("HR".into()),
                location: Some("Berlin".into()),
                employment_status: EmploymentStatus::Active,
                job_level: Some(JobLevel::Manager),
            },
            EnvironmentAttributes::new(Utc::now(), false),
        )
        .with_resource(ResourceAttributes::new(SecurityLevel::Confidential).with_department("HR"))
    }

    #[test]
    fn single_policy_reasons() {
        let ctx = hr_manager_on_hr_doc();

        let met = evaluate(&ctx, &StandardPolicy::HrDepartment);
        assert!(met.is_allowed());
        assert_eq!(met.model(), AccessModel::Abac);
        assert_eq!(met.reason(), CONDITIONS_MET_REASON);

        let not_met = evaluate(&ctx, &StandardPolicy::FinancePayroll);
        assert!(not_met.is_denied());
        assert_eq!(not_met.reason(), CONDITIONS_NOT_MET_REASON);
    }

    #[test]
    fn closures_are_policies() {
        let ctx = hr_manager_on_hr_doc();
        let in_berlin = |c: &AttributeContext| c.actor.location.as_deref() == Some("Berlin");

        assert!(evaluate(&ctx, &in_berlin).is_allowed());
    }

    #[test]
    fn any_stops_at_first_allowing_policy() {
        let ctx = hr_manager_on_hr_doc();
        let calls = AtomicUsize::new(0);
        let counted = |_: &AttributeContext| {
            calls.fetch_add(1, Ordering::SeqCst);
            false
        };

        let decision =
            evaluate_any(&ctx, &[&StandardPolicy::HrDepartment, &counted]).unwrap();
        assert!(decision.is_allowed());
        assert_eq!(decision.reason(), CONDITIONS_MET_REASON);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn any_denies_when_nothing_holds() {
        let ctx = hr_manager_on_hr_doc();
        let decision = evaluate_any(
            &ctx,
            &[&StandardPolicy::FinancePayroll, &|_: &AttributeContext| false],
        )
        .unwrap();
        assert!(decision.is_denied());
        assert_eq!(decision.reason(), NONE_ALLOWED_REASON);
    }

    #[test]
    fn all_requires_every_policy() {
        let ctx = hr_manager_on_hr_doc();

        let allowed = evaluate_all(
            &ctx,
            &[
                &StandardPolicy::HrDepartment,
                &StandardPolicy::ActiveEmployee,
                &StandardPolicy::DepartmentManager,
            ],
        )
        .unwrap();
        assert_eq!(allowed.reason(), ALL_ALLOWED_REASON);

        let denied = evaluate_all(
            &ctx,
            &[&StandardPolicy::ActiveEmployee, &StandardPolicy::FinancePayroll],
        )
        .unwrap();
        assert!(denied.is_denied());
        assert_eq!(denied.reason(), ONE_DENIED_REASON);
    }

    #[test]
    fn empty_batches_are_rejected() {
        let ctx = hr_manager_on_hr_doc();
        assert!(matches!(
            evaluate_any(&ctx, &[]),
            Err(AbacError::InvalidInput(_))
        ));
        assert!(matches!(
            evaluate_all(&ctx, &[]),
            Err(AbacError::InvalidInput(_))
        ));
    }
}
