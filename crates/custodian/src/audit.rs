//! Audit events and sinks.
//!
//! Every completed decision, and every owner-initiated share or revoke, is
//! handed to an [`AuditSink`]. Sinks are fire-and-forget: a sink failure is
//! logged and never changes the decision. Engine errors are not decisions
//! and are not audited.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use custodian_types::{AccessDecision, Action, ActorId, PermissionName, ResourceId};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Error type for audit sinks.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Whether the audited operation went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Success,
    Denied,
}

/// What the actor attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Operation {
    /// An access decision for `action`.
    Access { action: Action },
    /// The owner shared the resource with `grantee`.
    Share { grantee: ActorId },
    /// The owner revoked `grantee`'s grant.
    Revoke { grantee: ActorId },
}

/// One audited event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionEvent {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub actor: ActorId,
    pub resource: Option<ResourceId>,
    pub operation: Operation,
    pub permission: Option<PermissionName>,
    pub network_origin: Option<String>,
    pub status: DecisionStatus,
    pub decision: AccessDecision,
}

impl DecisionEvent {
    /// Builds an event. The status follows the decision.
    pub fn new(
        recorded_at: DateTime<Utc>,
        actor: ActorId,
        operation: Operation,
        decision: AccessDecision,
    ) -> Self {
        let status = if decision.is_allowed() {
            DecisionStatus::Success
        } else {
            DecisionStatus::Denied
        };
        Self {
            id: Uuid::new_v4(),
            recorded_at,
            actor,
            resource: None,
            operation,
            permission: None,
            network_origin: None,
            status,
            decision,
        }
    }

    pub fn with_resource(mut self, resource: ResourceId) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_permission(mut self, permission: Option<PermissionName>) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_network_origin(mut self, origin: Option<String>) -> Self {
        self.network_origin = origin;
        self
    }
}

/// Append-only recorder of decision events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &DecisionEvent) -> Result<(), AuditError>;
}

/// Keeps events in memory, for tests and inspection.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<DecisionEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DecisionEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &DecisionEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .map_err(|_| AuditError::Unavailable("memory audit sink lock poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

/// Emits one structured `info!` per event on the `custodian::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &DecisionEvent) -> Result<(), AuditError> {
        info!(
            target: "custodian::audit",
            event_id = %event.id,
            actor = %event.actor,
            resource = event.resource.as_ref().map(ResourceId::as_str),
            operation = ?event.operation,
            status = ?event.status,
            model = %event.decision.model(),
            reason = event.decision.reason(),
            "Access decision recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodian_types::AccessModel;

    fn denied_event() -> DecisionEvent {
        DecisionEvent::new(
            Utc::now(),
            ActorId::new("u-1"),
            Operation::Access {
                action: Action::Edit,
            },
            AccessDecision::deny(AccessModel::Dac, "No explicit permission granted for this resource"),
        )
        .with_resource(ResourceId::new("doc-1"))
    }

    #[test]
    fn status_follows_decision() {
        assert_eq!(denied_event().status, DecisionStatus::Denied);

        let allowed = DecisionEvent::new(
            Utc::now(),
            ActorId::new("u-1"),
            Operation::Share {
                grantee: ActorId::new("u-2"),
            },
            AccessDecision::allow(AccessModel::Dac, "User is the resource owner"),
        );
        assert_eq!(allowed.status, DecisionStatus::Success);
    }

    #[test]
    fn memory_sink_keeps_events_in_order() {
        let sink = MemoryAuditSink::new();
        let first = denied_event();
        let second = denied_event();

        sink.record(&first).unwrap();
        sink.record(&second).unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, first.id);
        assert_eq!(events[1].id, second.id);
        assert_ne!(first.id, second.id);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn event_serializes_with_tagged_operation() {
        let json = serde_json::to_value(denied_event()).unwrap();

        assert_eq!(json["operation"]["kind"], "access");
        assert_eq!(json["operation"]["action"], "edit");
        assert_eq!(json["status"], "DENIED");
        assert_eq!(json["decision"]["model"], "DAC");
        assert_eq!(json["decision"]["allowed"], false);
    }

    #[test]
    fn tracing_sink_accepts_events() {
        assert!(TracingAuditSink.record(&denied_event()).is_ok());
    }
}
