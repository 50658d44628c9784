//! The unified decision engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use custodian_abac::{AttributeContext, AttributePolicy, EnvironmentAttributes};
use custodian_config::{CustodianConfig, DefaultEffect};
use custodian_rbac::RoleChecker;
use custodian_rubac::{CompanyNetwork, RuleContext, RuleEvaluator, WorkingHours};
use custodian_store::{Effect, GrantPermissions, PolicyStore};
use custodian_types::{
    AccessDecision, AccessModel, Action, Actor, ActorId, InvalidInput, PermissionName, ResourceId,
    ResourceRecord, RoleId, SecurityLevel,
};
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, info, instrument, warn};

use crate::audit::{AuditSink, DecisionEvent, Operation, TracingAuditSink};
use crate::clock::{Clock, SystemClock};
use crate::error::{EngineError, Result};
use crate::gate::{
    AttributeGate, Gate, GateContext, GateOutcome, missing_attributes, standard_gates,
};
use crate::guard::guarded;
use crate::request::AccessRequest;

/// Reason given when the targeted resource does not exist.
pub const RESOURCE_NOT_FOUND_REASON: &str = "Resource not found";

/// Reason given when no gate positively allowed the request.
pub const NO_CHECKS_PASSED_REASON: &str = "No access control checks passed";

pub const SHARE_REQUIRES_OWNER_REASON: &str = "Only the resource owner can share documents";
pub const REVOKE_REQUIRES_OWNER_REASON: &str = "Only the resource owner can revoke permissions";

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// The result of an owner-initiated grant change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantChange {
    /// The grant was written.
    Granted,
    /// The grant was removed; `existed` says whether there was one.
    Revoked { existed: bool },
    /// The actor may not change grants on this resource.
    Denied(AccessDecision),
}

/// Composes the five access-control models into one decision.
///
/// The engine holds no policy data. Everything it reads comes through the
/// store, and concurrent decisions share nothing mutable.
pub struct Engine {
    store: Arc<dyn PolicyStore>,
    gates: Vec<Box<dyn Gate>>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
    super_role: String,
    working_hours: WorkingHours,
    rules: RuleEvaluator,
    roles: RoleChecker,
}

impl Engine {
    /// Creates an engine with the built-in defaults.
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        let rules = RuleEvaluator::default();
        let roles = RoleChecker::default();
        let working_hours = WorkingHours::default();
        Self {
            store,
            gates: standard_gates(rules.clone(), roles.clone(), AttributeGate::default()),
            audit: Arc::new(TracingAuditSink),
            clock: Arc::new(SystemClock),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            super_role: roles.super_role().to_string(),
            working_hours,
            rules,
            roles,
        }
    }

    /// Creates an engine from loaded configuration.
    pub fn from_config(store: Arc<dyn PolicyStore>, config: &CustodianConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|err| InvalidInput::Other(err.to_string()))?;

        let working_hours = WorkingHours::new(
            config.rules.work_start_hour,
            config.rules.work_end_hour,
            config.rules.utc_offset_minutes,
        )?;
        let network = CompanyNetwork {
            prefixes: config.network.company_prefixes.clone(),
            hosts: config.network.company_hosts.clone(),
        };
        let default_effect = match config.rules.default_effect {
            DefaultEffect::Allow => Effect::Allow,
            DefaultEffect::Deny => Effect::Deny,
        };
        let rules = RuleEvaluator::new(working_hours, network, default_effect);
        let roles = RoleChecker::new(&config.engine.super_role);
        let attributes = AttributeGate::new(working_hours, config.attributes.fail_open_on_error);

        Ok(Self {
            store,
            gates: standard_gates(rules.clone(), roles.clone(), attributes),
            audit: Arc::new(TracingAuditSink),
            clock: Arc::new(SystemClock),
            store_timeout: config.engine.store_timeout(),
            super_role: config.engine.super_role.clone(),
            working_hours,
            rules,
            roles,
        })
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// The models consulted, in evaluation order.
    pub fn gate_order(&self) -> Vec<AccessModel> {
        self.gates.iter().map(|gate| gate.model()).collect()
    }

    // ========================================================================
    // Decisions
    // ========================================================================

    /// Decides whether `actor` may perform `action` on `target`.
    ///
    /// `permission` opts the call site into the RBAC gate.
    pub async fn decide(
        &self,
        actor: &Actor,
        target: Option<&ResourceId>,
        action: Action,
        permission: Option<&PermissionName>,
    ) -> Result<AccessDecision> {
        let mut request = AccessRequest::new(actor.clone(), action);
        request.resource = target.cloned();
        request.permission = permission.cloned();
        self.evaluate(&request, &CancellationToken::new()).await
    }

    /// Evaluates a request, giving up if `cancel` fires.
    ///
    /// `Ok` always carries a decision; `Err` means none was reached and must
    /// not be reported as a denial.
    #[instrument(skip_all, fields(actor = %request.actor.id, action = %request.action, resource))]
    pub async fn evaluate(
        &self,
        request: &AccessRequest,
        cancel: &CancellationToken,
    ) -> Result<AccessDecision> {
        request.validate()?;
        if let Some(resource) = &request.resource {
            Span::current().record("resource", resource.as_str());
        }

        let now = self.clock.now();
        let decision = self.run_gates(request, cancel, now).await?;

        if decision.is_allowed() {
            info!(model = %decision.model(), reason = decision.reason(), "Access granted");
        } else {
            warn!(model = %decision.model(), reason = decision.reason(), "Access denied");
        }

        let mut event = DecisionEvent::new(
            now,
            request.actor.id.clone(),
            Operation::Access {
                action: request.action,
            },
            decision.clone(),
        )
        .with_permission(request.permission.clone())
        .with_network_origin(request.network_origin.clone());
        if let Some(resource) = &request.resource {
            event = event.with_resource(resource.clone());
        }
        self.record(&event);

        Ok(decision)
    }

    async fn run_gates(
        &self,
        request: &AccessRequest,
        cancel: &CancellationToken,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<AccessDecision> {
        let resource = match &request.resource {
            Some(id) => match self.fetch_resource(id, cancel).await? {
                Some(record) => Some(record),
                None => {
                    warn!(resource = %id, "Targeted resource not found");
                    return Ok(AccessDecision::deny(
                        AccessModel::Unified,
                        RESOURCE_NOT_FOUND_REASON,
                    ));
                }
            },
            None => None,
        };

        let cx = GateContext {
            request,
            resource: resource.as_ref(),
            store: self.store.as_ref(),
            now,
        };

        let mut conclusive_pass = None;
        for gate in &self.gates {
            let model = gate.model();
            match self.guard(cancel, model.as_str(), gate.evaluate(&cx)).await? {
                GateOutcome::Skip => debug!(%model, "Gate skipped"),
                GateOutcome::Pass(decision) => {
                    debug!(%model, reason = decision.reason(), "Gate passed");
                    if gate.conclusive() {
                        conclusive_pass = Some(decision);
                    }
                }
                GateOutcome::Stop(decision) => return Ok(decision),
            }
        }

        Ok(conclusive_pass.unwrap_or_else(|| {
            AccessDecision::deny(AccessModel::Unified, NO_CHECKS_PASSED_REASON)
        }))
    }

    // ========================================================================
    // Owner-initiated grant changes
    // ========================================================================

    /// Grants `permissions` on `resource` to `grantee`. Only the owner may.
    ///
    /// Replaces any earlier grant for the same pair.
    #[instrument(skip_all, fields(owner = %owner.id, resource = %resource, grantee = %grantee))]
    pub async fn share(
        &self,
        owner: &Actor,
        resource: &ResourceId,
        grantee: &ActorId,
        permissions: GrantPermissions,
        cancel: &CancellationToken,
    ) -> Result<GrantChange> {
        validate_grant_change(owner, resource, grantee)?;
        let operation = Operation::Share {
            grantee: grantee.clone(),
        };

        if !self.owns(owner, resource, cancel).await? {
            return Ok(self.deny_grant_change(
                owner,
                resource,
                operation,
                SHARE_REQUIRES_OWNER_REASON,
            ));
        }

        let store = self.store.as_ref();
        self.guard(cancel, "grant", async {
            Ok(custodian_dac::grant(store, resource, grantee, permissions, &owner.id).await?)
        })
        .await?;

        self.record(
            &DecisionEvent::new(
                self.clock.now(),
                owner.id.clone(),
                operation,
                AccessDecision::allow(AccessModel::Dac, custodian_dac::OWNER_REASON),
            )
            .with_resource(resource.clone()),
        );
        Ok(GrantChange::Granted)
    }

    /// Removes `grantee`'s grant on `resource`. Only the owner may.
    ///
    /// Revoking a grant that does not exist succeeds with `existed: false`.
    #[instrument(skip_all, fields(owner = %owner.id, resource = %resource, grantee = %grantee))]
    pub async fn revoke(
        &self,
        owner: &Actor,
        resource: &ResourceId,
        grantee: &ActorId,
        cancel: &CancellationToken,
    ) -> Result<GrantChange> {
        validate_grant_change(owner, resource, grantee)?;
        let operation = Operation::Revoke {
            grantee: grantee.clone(),
        };

        if !self.owns(owner, resource, cancel).await? {
            return Ok(self.deny_grant_change(
                owner,
                resource,
                operation,
                REVOKE_REQUIRES_OWNER_REASON,
            ));
        }

        let store = self.store.as_ref();
        let existed = self
            .guard(cancel, "revoke", async {
                Ok(custodian_dac::revoke(store, resource, grantee).await?)
            })
            .await?;

        self.record(
            &DecisionEvent::new(
                self.clock.now(),
                owner.id.clone(),
                operation,
                AccessDecision::allow(AccessModel::Dac, custodian_dac::OWNER_REASON),
            )
            .with_resource(resource.clone()),
        );
        Ok(GrantChange::Revoked { existed })
    }

    async fn owns(
        &self,
        actor: &Actor,
        resource: &ResourceId,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let store = self.store.as_ref();
        self.guard(cancel, "ownership", async {
            Ok(custodian_dac::is_owner(store, &actor.id, resource).await?)
        })
        .await
    }

    fn deny_grant_change(
        &self,
        actor: &Actor,
        resource: &ResourceId,
        operation: Operation,
        reason: &str,
    ) -> GrantChange {
        warn!(actor = %actor.id, resource = %resource, reason, "Grant change denied");
        let decision = AccessDecision::deny(AccessModel::Dac, reason);
        self.record(
            &DecisionEvent::new(self.clock.now(), actor.id.clone(), operation, decision.clone())
                .with_resource(resource.clone()),
        );
        GrantChange::Denied(decision)
    }

    // ========================================================================
    // Single-model entry points
    // ========================================================================

    /// MAC verdict alone.
    pub fn check_clearance(clearance: SecurityLevel, sensitivity: SecurityLevel) -> AccessDecision {
        custodian_mac::evaluate(clearance, sensitivity)
    }

    /// Whether `actor` may reclassify resources (super role only).
    pub async fn can_modify_security_level(
        &self,
        actor: &Actor,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let store = self.store.as_ref();
        let role = self
            .guard(cancel, "role lookup", async {
                Ok(store.find_role(&actor.role).await?)
            })
            .await?;
        Ok(role.is_some_and(|role| {
            custodian_mac::can_modify_security_level(&role.name, &self.super_role)
        }))
    }

    /// DAC verdict alone, e.g. for a share endpoint.
    pub async fn check_ownership(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
        action: Action,
        cancel: &CancellationToken,
    ) -> Result<AccessDecision> {
        let store = self.store.as_ref();
        self.guard(cancel, "DAC", async {
            Ok(custodian_dac::evaluate(store, store, actor, resource, action).await?)
        })
        .await
    }

    /// RBAC verdict alone.
    pub async fn check_permission(
        &self,
        role: &RoleId,
        permission: &PermissionName,
        cancel: &CancellationToken,
    ) -> Result<AccessDecision> {
        let store = self.store.as_ref();
        self.guard(cancel, "RBAC", async {
            Ok(self.roles.evaluate(store, role, permission).await?)
        })
        .await
    }

    /// RuBAC verdict alone.
    pub async fn check_rules(
        &self,
        ctx: &RuleContext,
        cancel: &CancellationToken,
    ) -> Result<AccessDecision> {
        let store = self.store.as_ref();
        self.guard(cancel, "RuBAC", async {
            Ok(self.rules.evaluate(store, ctx).await?)
        })
        .await
    }

    /// ABAC verdict alone, for any policy.
    ///
    /// A missing actor or resource is a deny. Unlike the attribute gate,
    /// store failures are returned even when the engine fails open.
    pub async fn check_attributes<P>(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
        policy: &P,
        cancel: &CancellationToken,
    ) -> Result<AccessDecision>
    where
        P: AttributePolicy + ?Sized,
    {
        let store = self.store.as_ref();
        let now = self.clock.now();
        let environment = EnvironmentAttributes::new(now, self.working_hours.contains(now));
        let loaded = self
            .guard(cancel, "ABAC", async {
                Ok(AttributeContext::load(store, store, actor, resource, environment).await)
            })
            .await?;
        match loaded {
            Ok(ctx) => Ok(custodian_abac::evaluate(&ctx, policy)),
            Err(err) => missing_attributes(err),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn fetch_resource(
        &self,
        id: &ResourceId,
        cancel: &CancellationToken,
    ) -> Result<Option<ResourceRecord>> {
        let store = self.store.as_ref();
        self.guard(cancel, "resource lookup", async {
            Ok(store.find_resource(id).await?)
        })
        .await
    }

    async fn guard<T, F>(&self, cancel: &CancellationToken, stage: &'static str, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        guarded(cancel, stage, self.store_timeout, work).await
    }

    fn record(&self, event: &DecisionEvent) {
        if let Err(err) = self.audit.record(event) {
            warn!(event_id = %event.id, error = %err, "Audit sink rejected event");
        }
    }
}

fn validate_grant_change(
    owner: &Actor,
    resource: &ResourceId,
    grantee: &ActorId,
) -> std::result::Result<(), InvalidInput> {
    if owner.id.is_blank() {
        return Err(InvalidInput::Empty { field: "actor id" });
    }
    if resource.is_blank() {
        return Err(InvalidInput::Empty {
            field: "resource id",
        });
    }
    if grantee.is_blank() {
        return Err(InvalidInput::Empty {
            field: "grantee id",
        });
    }
    Ok(())
}
