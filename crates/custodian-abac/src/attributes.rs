//! Attribute types for ABAC evaluation.

use chrono::{DateTime, Utc};
use custodian_store::{ActorAttributes, AttributeStore, ResourceStore};
use custodian_types::{ActorId, ResourceId, ResourceRecord, SecurityLevel};
use serde::{Deserialize, Serialize};

use crate::evaluator::{AbacError, Result};

// ============================================================================
// Resource Attributes
// ============================================================================

/// Attributes describing the resource being accessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttributes {
    pub department: Option<String>,
    pub sensitivity: SecurityLevel,
}

impl ResourceAttributes {
    pub fn new(sensitivity: SecurityLevel) -> Self {
        Self {
            department: None,
            sensitivity,
        }
    }

    pub fn with_department(mut self, department: &str) -> Self {
        self.department = Some(department.to_string());
        self
    }
}

impl From<&ResourceRecord> for ResourceAttributes {
    fn from(record: &ResourceRecord) -> Self {
        Self {
            department: record.department.clone(),
            sensitivity: record.sensitivity,
        }
    }
}

// ============================================================================
// Environment Attributes
// ============================================================================

/// Attributes of the request environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentAttributes {
    pub at: DateTime<Utc>,
    /// Whether `at` falls inside the organisation's working hours.
    pub in_working_hours: bool,
    pub network_origin: Option<String>,
}

impl EnvironmentAttributes {
    pub fn new(at: DateTime<Utc>, in_working_hours: bool) -> Self {
        Self {
            at,
            in_working_hours,
            network_origin: None,
        }
    }

    pub fn with_network_origin(mut self, origin: &str) -> Self {
        self.network_origin = Some(origin.to_string());
        self
    }
}

// ============================================================================
// Attribute Context
// ============================================================================

/// Everything a policy may inspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeContext {
    pub actor: ActorAttributes,
    /// `None` when the request does not target a resource.
    pub resource: Option<ResourceAttributes>,
    pub environment: EnvironmentAttributes,
}

impl AttributeContext {
    pub fn new(actor: ActorAttributes, environment: EnvironmentAttributes) -> Self {
        Self {
            actor,
            resource: None,
            environment,
        }
    }

    pub fn with_resource(mut self, resource: ResourceAttributes) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Department of the targeted resource, if any.
    pub fn resource_department(&self) -> Option<&str> {
        self.resource.as_ref()?.department.as_deref()
    }

    /// Assembles a context by fetching both attribute bundles.
    pub async fn load(
        attributes: &dyn AttributeStore,
        resources: &dyn ResourceStore,
        actor: &ActorId,
        resource: &ResourceId,
        environment: EnvironmentAttributes,
    ) -> Result<Self> {
        let record = resources
            .find_resource(resource)
            .await?
            .ok_or_else(|| AbacError::ResourceNotFound(resource.clone()))?;
        Self::for_resource(attributes, actor, &record, environment).await
    }

    /// Assembles a context for an already-fetched resource.
    pub async fn for_resource(
        attributes: &dyn AttributeStore,
        actor: &ActorId,
        resource: &ResourceRecord,
        environment: EnvironmentAttributes,
    ) -> Result<Self> {
        let actor_attrs = attributes
            .find_actor_attributes(actor)
            .await?
            .ok_or_else(|| AbacError::ActorNotFound(actor.clone()))?;
        Ok(Self::new(actor_attrs, environment).with_resource(resource.into()))
    }
}
