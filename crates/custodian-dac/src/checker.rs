//! Ownership and grant checks.

use custodian_store::{Grant, GrantPermissions, GrantStore, ResourceStore, Result};
use custodian_types::{AccessDecision, AccessModel, Action, ActorId, ResourceId, ResourceRecord};
use tracing::{debug, info, warn};

pub const RESOURCE_NOT_FOUND_REASON: &str = "Resource not found";
pub const OWNER_REASON: &str = "User is the resource owner";
pub const NO_GRANT_REASON: &str = "No explicit permission granted for this resource";

/// Returns whether `permissions` cover `action`. Delete reuses the edit bit.
pub fn permits(permissions: &GrantPermissions, action: Action) -> bool {
    match action {
        Action::View => permissions.can_view,
        Action::Edit | Action::Delete => permissions.can_edit,
        Action::Share => permissions.can_share,
    }
}

/// Looks up the resource, then checks ownership and grants.
///
/// A missing resource is a denial, not an error.
pub async fn evaluate(
    resources: &dyn ResourceStore,
    grants: &dyn GrantStore,
    actor: &ActorId,
    resource: &ResourceId,
    action: Action,
) -> Result<AccessDecision> {
    match resources.find_resource(resource).await? {
        Some(record) => evaluate_record(grants, actor, &record, action).await,
        None => {
            warn!(resource = %resource, "DAC check on missing resource");
            Ok(AccessDecision::deny(
                AccessModel::Dac,
                RESOURCE_NOT_FOUND_REASON,
            ))
        }
    }
}

/// Checks ownership and grants for an already-fetched resource.
pub async fn evaluate_record(
    grants: &dyn GrantStore,
    actor: &ActorId,
    resource: &ResourceRecord,
    action: Action,
) -> Result<AccessDecision> {
    if &resource.owner == actor {
        debug!(actor = %actor, resource = %resource.id, "Owner access");
        return Ok(AccessDecision::allow(AccessModel::Dac, OWNER_REASON));
    }

    let Some(grant) = grants.find_grant(&resource.id, actor).await? else {
        warn!(actor = %actor, resource = %resource.id, %action, "No grant for resource");
        return Ok(AccessDecision::deny(AccessModel::Dac, NO_GRANT_REASON));
    };

    if permits(&grant.permissions, action) {
        debug!(actor = %actor, resource = %resource.id, %action, "Grant allows action");
        Ok(AccessDecision::allow(
            AccessModel::Dac,
            format!("User has {action} permission"),
        ))
    } else {
        warn!(actor = %actor, resource = %resource.id, %action, "Grant lacks capability");
        Ok(AccessDecision::deny(
            AccessModel::Dac,
            format!("User does not have {action} permission for this resource"),
        ))
    }
}

/// Returns whether `actor` owns `resource`. A missing resource has no owner.
pub async fn is_owner(
    resources: &dyn ResourceStore,
    actor: &ActorId,
    resource: &ResourceId,
) -> Result<bool> {
    Ok(resources
        .find_resource(resource)
        .await?
        .is_some_and(|r| &r.owner == actor))
}

/// Grants `permissions` on `resource` to `grantee`, replacing any earlier grant.
pub async fn grant(
    grants: &dyn GrantStore,
    resource: &ResourceId,
    grantee: &ActorId,
    permissions: GrantPermissions,
    granted_by: &ActorId,
) -> Result<()> {
    grants
        .upsert_grant(Grant::new(
            resource.clone(),
            grantee.clone(),
            permissions,
            granted_by.clone(),
        ))
        .await?;
    info!(
        resource = %resource,
        grantee = %grantee,
        granted_by = %granted_by,
        can_view = permissions.can_view,
        can_edit = permissions.can_edit,
        can_share = permissions.can_share,
        "Grant recorded"
    );
    Ok(())
}

/// Removes the grant for `(resource, grantee)`. Returns whether one existed.
pub async fn revoke(
    grants: &dyn GrantStore,
    resource: &ResourceId,
    grantee: &ActorId,
) -> Result<bool> {
    let existed = grants.delete_grant(resource, grantee).await?;
    info!(resource = %resource, grantee = %grantee, existed, "Grant revoked");
    Ok(existed)
}

/// Every grant on `resource`.
pub async fn list_grants(grants: &dyn GrantStore, resource: &ResourceId) -> Result<Vec<Grant>> {
    grants.list_grants(resource).await
}
