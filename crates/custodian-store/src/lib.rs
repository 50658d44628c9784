//! # custodian-store: policy data access
//!
//! The engine never owns policy data. Resources, roles, grants, rules and
//! actor attributes live in an external store reached through the narrow
//! repository traits defined here. Evaluators only hold `&dyn Trait`
//! references, so they carry no persistent or global state of their own.
//!
//! ```text
//! ┌──────────────┐   find_resource        ┌───────────────┐
//! │  Evaluators  │ ─────────────────────▶ │ ResourceStore │
//! │  (MAC, DAC,  │   find_role_permission │ RoleStore     │
//! │   RBAC,      │   find_grant           │ GrantStore    │
//! │   RuBAC,     │   list_active_rules    │ RuleStore     │
//! │   ABAC)      │   find_actor_attributes│ AttributeStore│
//! └──────────────┘                        └───────────────┘
//! ```
//!
//! Lookups report absence as `Ok(None)`. `Err` is reserved for failures
//! the caller must not mistake for a decision.
//!
//! [`MemoryStore`] implements every trait and backs tests and the CLI.

use async_trait::async_trait;
use custodian_types::{ActorId, PermissionName, ResourceId, ResourceRecord, RoleId, RuleId};

mod error;
mod memory;
pub mod records;

pub use error::{Result, StoreError};
pub use memory::{MemoryStore, StoreSnapshot};
pub use records::{
    ActorAttributes, DepartmentMatch, Effect, Grant, GrantPermissions, NetworkMatch, NewRule,
    Predicate, Role, RolePermission, Rule, RuleCondition, RuleUpdate, TimeWindow,
};

/// Resource metadata: owner, sensitivity and department.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn find_resource(&self, id: &ResourceId) -> Result<Option<ResourceRecord>>;
}

/// Roles and their permission rows.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_role(&self, id: &RoleId) -> Result<Option<Role>>;

    async fn find_role_permission(
        &self,
        role: &RoleId,
        permission: &PermissionName,
    ) -> Result<Option<RolePermission>>;

    /// Upserts the (role, permission) row.
    async fn assign_permission(
        &self,
        role: &RoleId,
        permission: &PermissionName,
        allowed: bool,
    ) -> Result<()>;

    /// Deletes the (role, permission) row. Returns whether it existed.
    async fn remove_permission(&self, role: &RoleId, permission: &PermissionName)
    -> Result<bool>;

    /// Names of permissions granted (`allowed = true`) to the role.
    async fn list_permissions(&self, role: &RoleId) -> Result<Vec<PermissionName>>;
}

/// Discretionary grants, at most one per (resource, grantee).
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn find_grant(&self, resource: &ResourceId, grantee: &ActorId)
    -> Result<Option<Grant>>;

    /// Inserts or replaces the grant for its (resource, grantee) pair.
    async fn upsert_grant(&self, grant: Grant) -> Result<()>;

    /// Deletes the grant. Returns whether one existed.
    async fn delete_grant(&self, resource: &ResourceId, grantee: &ActorId) -> Result<bool>;

    async fn list_grants(&self, resource: &ResourceId) -> Result<Vec<Grant>>;
}

/// The ordered rule set.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Active rules in creation order.
    async fn list_active_rules(&self) -> Result<Vec<Rule>>;

    /// All rules in creation order.
    async fn list_rules(&self) -> Result<Vec<Rule>>;

    async fn create_rule(&self, rule: NewRule) -> Result<Rule>;

    /// Fails with [`StoreError::NotFound`] if the rule does not exist.
    async fn update_rule(&self, id: &RuleId, update: RuleUpdate) -> Result<Rule>;
}

/// Actor attribute bundles for attribute-based policies.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    async fn find_actor_attributes(&self, actor: &ActorId) -> Result<Option<ActorAttributes>>;
}

/// Everything the unified engine reads from.
pub trait PolicyStore: ResourceStore + RoleStore + GrantStore + RuleStore + AttributeStore {}

impl<T> PolicyStore for T where T: ResourceStore + RoleStore + GrantStore + RuleStore + AttributeStore
{}
