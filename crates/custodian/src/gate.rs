//! The evaluation gates and their shared interface.
//!
//! A gate wraps one access-control model. The engine runs its gates in a
//! fixed order and stops at the first gate that returns
//! [`GateOutcome::Stop`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use custodian_abac::{
    AbacError, AttributeContext, EnvironmentAttributes, StandardPolicy,
};
use custodian_rbac::RoleChecker;
use custodian_rubac::{RuleContext, RuleEvaluator, WorkingHours};
use custodian_store::PolicyStore;
use custodian_types::{AccessDecision, AccessModel, Action, ResourceRecord};
use tracing::{debug, warn};

use crate::engine::RESOURCE_NOT_FOUND_REASON;
use crate::error::Result;
use crate::request::AccessRequest;

/// Reason given when the view fallback allows a PUBLIC resource.
pub const PUBLIC_RESOURCE_REASON: &str = "Public resource";

/// Reason given when strict attribute handling finds no attribute bundle.
pub const ATTRIBUTES_UNAVAILABLE_REASON: &str = "Actor attributes unavailable";

/// What a gate sees of the request being decided.
pub struct GateContext<'a> {
    pub request: &'a AccessRequest,
    /// The targeted resource, already fetched.
    pub resource: Option<&'a ResourceRecord>,
    pub store: &'a dyn PolicyStore,
    pub now: DateTime<Utc>,
}

/// The result of running one gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The gate does not apply to this request.
    Skip,
    /// The gate allowed; evaluation continues.
    Pass(AccessDecision),
    /// Evaluation ends with this decision.
    Stop(AccessDecision),
}

impl GateOutcome {
    /// Stops on a denial, passes on an allow.
    fn from_decision(decision: AccessDecision) -> Self {
        if decision.is_allowed() {
            GateOutcome::Pass(decision)
        } else {
            GateOutcome::Stop(decision)
        }
    }
}

/// One step of the decision sequence.
#[async_trait]
pub trait Gate: Send + Sync {
    /// The model this gate enforces.
    fn model(&self) -> AccessModel;

    /// Whether a pass from this gate is a positive access check.
    ///
    /// When every gate has run without stopping, the last conclusive pass
    /// becomes the decision. A rule pass is not conclusive, because it only
    /// means no rule objected.
    fn conclusive(&self) -> bool {
        true
    }

    async fn evaluate(&self, cx: &GateContext<'_>) -> Result<GateOutcome>;
}

// ============================================================================
// MAC
// ============================================================================

/// Clearance against sensitivity. Runs whenever a resource is targeted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearanceGate;

#[async_trait]
impl Gate for ClearanceGate {
    fn model(&self) -> AccessModel {
        AccessModel::Mac
    }

    async fn evaluate(&self, cx: &GateContext<'_>) -> Result<GateOutcome> {
        let Some(resource) = cx.resource else {
            return Ok(GateOutcome::Skip);
        };
        Ok(GateOutcome::from_decision(custodian_mac::evaluate(
            cx.request.actor.clearance,
            resource.sensitivity,
        )))
    }
}

// ============================================================================
// RuBAC
// ============================================================================

/// The ordered rule set. Always runs.
#[derive(Debug, Clone, Default)]
pub struct RuleGate {
    evaluator: RuleEvaluator,
}

impl RuleGate {
    pub fn new(evaluator: RuleEvaluator) -> Self {
        Self { evaluator }
    }
}

#[async_trait]
impl Gate for RuleGate {
    fn model(&self) -> AccessModel {
        AccessModel::Rubac
    }

    fn conclusive(&self) -> bool {
        false
    }

    async fn evaluate(&self, cx: &GateContext<'_>) -> Result<GateOutcome> {
        let ctx = RuleContext {
            actor_department: cx.request.actor.department.clone(),
            resource_department: cx.resource.and_then(|r| r.department.clone()),
            network_origin: cx.request.network_origin.clone(),
            at: cx.now,
            extra: cx.request.extra.clone(),
        };
        let decision = self.evaluator.evaluate(cx.store, &ctx).await?;
        Ok(GateOutcome::from_decision(decision))
    }
}

// ============================================================================
// RBAC
// ============================================================================

/// Role permission check. Runs only when the call site names a permission.
#[derive(Debug, Clone, Default)]
pub struct RoleGate {
    checker: RoleChecker,
}

impl RoleGate {
    pub fn new(checker: RoleChecker) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl Gate for RoleGate {
    fn model(&self) -> AccessModel {
        AccessModel::Rbac
    }

    async fn evaluate(&self, cx: &GateContext<'_>) -> Result<GateOutcome> {
        let Some(permission) = &cx.request.permission else {
            return Ok(GateOutcome::Skip);
        };
        let decision = self
            .checker
            .evaluate(cx.store, &cx.request.actor.role, permission)
            .await?;
        Ok(GateOutcome::from_decision(decision))
    }
}

// ============================================================================
// ABAC
// ============================================================================

/// Same department unless the resource is PUBLIC. Runs when a resource is
/// targeted.
///
/// With `fail_open` set, failing to fetch attributes skips the gate instead
/// of failing the decision.
#[derive(Debug, Clone)]
pub struct AttributeGate {
    working_hours: WorkingHours,
    fail_open: bool,
}

impl Default for AttributeGate {
    fn default() -> Self {
        Self::new(WorkingHours::default(), true)
    }
}

impl AttributeGate {
    pub fn new(working_hours: WorkingHours, fail_open: bool) -> Self {
        Self {
            working_hours,
            fail_open,
        }
    }
}

#[async_trait]
impl Gate for AttributeGate {
    fn model(&self) -> AccessModel {
        AccessModel::Abac
    }

    async fn evaluate(&self, cx: &GateContext<'_>) -> Result<GateOutcome> {
        let Some(resource) = cx.resource else {
            return Ok(GateOutcome::Skip);
        };

        let mut environment =
            EnvironmentAttributes::new(cx.now, self.working_hours.contains(cx.now));
        environment.network_origin = cx.request.network_origin.clone();

        let ctx = match AttributeContext::for_resource(
            cx.store,
            &cx.request.actor.id,
            resource,
            environment,
        )
        .await
        {
            Ok(ctx) => ctx,
            Err(err) if self.fail_open => {
                warn!(actor = %cx.request.actor.id, error = %err, "Attribute lookup failed, skipping ABAC gate");
                return Ok(GateOutcome::Skip);
            }
            Err(err) => return missing_attributes(err).map(GateOutcome::Stop),
        };

        Ok(GateOutcome::from_decision(custodian_abac::evaluate(
            &ctx,
            &StandardPolicy::SameDepartmentUnlessPublic,
        )))
    }
}

/// Turns a failed attribute lookup into a deny when a record is missing.
/// Store failures stay errors.
pub(crate) fn missing_attributes(err: AbacError) -> Result<AccessDecision> {
    match err {
        AbacError::ActorNotFound(actor) => {
            warn!(actor = %actor, "No attributes for actor");
            Ok(AccessDecision::deny(
                AccessModel::Abac,
                ATTRIBUTES_UNAVAILABLE_REASON,
            ))
        }
        AbacError::ResourceNotFound(resource) => {
            debug!(resource = %resource, "Resource not found");
            Ok(AccessDecision::deny(
                AccessModel::Abac,
                RESOURCE_NOT_FOUND_REASON,
            ))
        }
        AbacError::InvalidInput(e) => Err(e.into()),
        AbacError::Store(e) => Err(e.into()),
    }
}

// ============================================================================
// DAC
// ============================================================================

/// Ownership and grants. The last gate: when a resource is targeted its
/// decision is final.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipGate;

#[async_trait]
impl Gate for OwnershipGate {
    fn model(&self) -> AccessModel {
        AccessModel::Dac
    }

    async fn evaluate(&self, cx: &GateContext<'_>) -> Result<GateOutcome> {
        let Some(resource) = cx.resource else {
            return Ok(GateOutcome::Skip);
        };
        let action = cx.request.action;
        let decision =
            custodian_dac::evaluate_record(cx.store, &cx.request.actor.id, resource, action)
                .await?;

        if decision.is_denied() && action == Action::View && resource.is_public() {
            debug!(resource = %resource.id, "PUBLIC resource viewable without a grant");
            return Ok(GateOutcome::Stop(AccessDecision::allow(
                AccessModel::Mac,
                PUBLIC_RESOURCE_REASON,
            )));
        }
        Ok(GateOutcome::Stop(decision))
    }
}

/// The standard gate sequence: MAC, RuBAC, RBAC, ABAC, DAC.
pub fn standard_gates(
    rules: RuleEvaluator,
    roles: RoleChecker,
    attributes: AttributeGate,
) -> Vec<Box<dyn Gate>> {
    vec![
        Box::new(ClearanceGate),
        Box::new(RuleGate::new(rules)),
        Box::new(RoleGate::new(roles)),
        Box::new(attributes),
        Box::new(OwnershipGate),
    ]
}
