//! In-memory implementation of every store trait.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use custodian_types::{Actor, ActorId, PermissionName, ResourceId, ResourceRecord, RoleId, RuleId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::records::{
    ActorAttributes, Grant, NewRule, Role, RolePermission, Rule, RuleUpdate,
};
use crate::{
    AttributeStore, GrantStore, ResourceStore, Result, RoleStore, RuleStore, StoreError,
};

/// A serialisable dump of store contents, used for fixtures and seeding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub roles: Vec<Role>,
    pub role_permissions: Vec<RolePermission>,
    pub actors: Vec<Actor>,
    pub resources: Vec<ResourceRecord>,
    pub grants: Vec<Grant>,
    /// Rules in evaluation order.
    pub rules: Vec<NewRule>,
}

#[derive(Debug, Default)]
struct Inner {
    roles: HashMap<RoleId, Role>,
    role_permissions: HashMap<(RoleId, PermissionName), bool>,
    actors: HashMap<ActorId, Actor>,
    resources: HashMap<ResourceId, ResourceRecord>,
    grants: BTreeMap<(ResourceId, ActorId), Grant>,
    rules: Vec<Rule>,
    next_sequence: u64,
}

impl Inner {
    fn push_rule(&mut self, rule: NewRule) -> Rule {
        self.next_sequence += 1;
        let stored = Rule {
            id: RuleId::new(format!("rule-{}", self.next_sequence)),
            name: rule.name,
            description: rule.description,
            active: rule.active,
            condition: rule.condition,
            effect: rule.effect,
            sequence: self.next_sequence,
        };
        self.rules.push(stored.clone());
        stored
    }
}

/// Thread-safe in-memory policy store.
///
/// Rules keep their insertion order; grants and role permissions are keyed
/// by their natural pair, so writes are upserts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a snapshot. Rules are created in snapshot order.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::new();
        {
            let inner = store.inner_mut();
            for role in snapshot.roles {
                inner.roles.insert(role.id.clone(), role);
            }
            for rp in snapshot.role_permissions {
                inner
                    .role_permissions
                    .insert((rp.role, rp.permission), rp.allowed);
            }
            for actor in snapshot.actors {
                inner.actors.insert(actor.id.clone(), actor);
            }
            for resource in snapshot.resources {
                inner.resources.insert(resource.id.clone(), resource);
            }
            for grant in snapshot.grants {
                inner
                    .grants
                    .insert((grant.resource.clone(), grant.grantee.clone()), grant);
            }
            for rule in snapshot.rules {
                inner.push_rule(rule);
            }
        }
        store
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.inner_mut().roles.insert(role.id.clone(), role);
        self
    }

    pub fn with_role_permission(mut self, role: &str, permission: PermissionName) -> Self {
        self.inner_mut()
            .role_permissions
            .insert((RoleId::new(role), permission), true);
        self
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.inner_mut().actors.insert(actor.id.clone(), actor);
        self
    }

    pub fn with_resource(mut self, resource: ResourceRecord) -> Self {
        self.inner_mut()
            .resources
            .insert(resource.id.clone(), resource);
        self
    }

    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.inner_mut()
            .grants
            .insert((grant.resource.clone(), grant.grantee.clone()), grant);
        self
    }

    pub fn with_rule(mut self, rule: NewRule) -> Self {
        self.inner_mut().push_rule(rule);
        self
    }

    /// Looks up a full actor profile (used by tooling that plays the
    /// authentication layer).
    pub fn actor(&self, id: &ActorId) -> Result<Option<Actor>> {
        Ok(self.read()?.actors.get(id).cloned())
    }

    fn inner_mut(&mut self) -> &mut Inner {
        self.inner.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn find_resource(&self, id: &ResourceId) -> Result<Option<ResourceRecord>> {
        Ok(self.read()?.resources.get(id).cloned())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_role(&self, id: &RoleId) -> Result<Option<Role>> {
        Ok(self.read()?.roles.get(id).cloned())
    }

    async fn find_role_permission(
        &self,
        role: &RoleId,
        permission: &PermissionName,
    ) -> Result<Option<RolePermission>> {
        let inner = self.read()?;
        Ok(inner
            .role_permissions
            .get(&(role.clone(), permission.clone()))
            .map(|allowed| RolePermission {
                role: role.clone(),
                permission: permission.clone(),
                allowed: *allowed,
            }))
    }

    async fn assign_permission(
        &self,
        role: &RoleId,
        permission: &PermissionName,
        allowed: bool,
    ) -> Result<()> {
        debug!(role = %role, permission = %permission, allowed, "Assigning role permission");
        self.write()?
            .role_permissions
            .insert((role.clone(), permission.clone()), allowed);
        Ok(())
    }

    async fn remove_permission(
        &self,
        role: &RoleId,
        permission: &PermissionName,
    ) -> Result<bool> {
        Ok(self
            .write()?
            .role_permissions
            .remove(&(role.clone(), permission.clone()))
            .is_some())
    }

    async fn list_permissions(&self, role: &RoleId) -> Result<Vec<PermissionName>> {
        let inner = self.read()?;
        let mut names: Vec<PermissionName> = inner
            .role_permissions
            .iter()
            .filter(|((r, _), allowed)| r == role && **allowed)
            .map(|((_, p), _)| p.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn find_grant(
        &self,
        resource: &ResourceId,
        grantee: &ActorId,
    ) -> Result<Option<Grant>> {
        Ok(self
            .read()?
            .grants
            .get(&(resource.clone(), grantee.clone()))
            .cloned())
    }

    async fn upsert_grant(&self, grant: Grant) -> Result<()> {
        debug!(resource = %grant.resource, grantee = %grant.grantee, "Upserting grant");
        self.write()?
            .grants
            .insert((grant.resource.clone(), grant.grantee.clone()), grant);
        Ok(())
    }

    async fn delete_grant(&self, resource: &ResourceId, grantee: &ActorId) -> Result<bool> {
        Ok(self
            .write()?
            .grants
            .remove(&(resource.clone(), grantee.clone()))
            .is_some())
    }

    async fn list_grants(&self, resource: &ResourceId) -> Result<Vec<Grant>> {
        Ok(self
            .read()?
            .grants
            .values()
            .filter(|g| &g.resource == resource)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn list_active_rules(&self) -> Result<Vec<Rule>> {
        Ok(self
            .read()?
            .rules
            .iter()
            .filter(|r| r.active)
            .cloned()
            .collect())
    }

    async fn list_rules(&self) -> Result<Vec<Rule>> {
        Ok(self.read()?.rules.clone())
    }

    async fn create_rule(&self, rule: NewRule) -> Result<Rule> {
        Ok(self.write()?.push_rule(rule))
    }

    async fn update_rule(&self, id: &RuleId, update: RuleUpdate) -> Result<Rule> {
        let mut inner = self.write()?;
        let rule = inner
            .rules
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "rule",
                id: id.to_string(),
            })?;
        update.apply(rule);
        Ok(rule.clone())
    }
}

#[async_trait]
impl AttributeStore for MemoryStore {
    async fn find_actor_attributes(&self, actor: &ActorId) -> Result<Option<ActorAttributes>> {
        Ok(self.read()?.actors.get(actor).map(|a| ActorAttributes {
            department: a.department.clone(),
            location: a.location.clone(),
            employment_status: a.employment_status,
            job_level: a.job_level,
        }))
    }
}
