//! Role permission checks.

use custodian_store::{RoleStore, StoreError};
use custodian_types::{AccessDecision, AccessModel, InvalidInput, PermissionName, RoleId};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Role name that bypasses permission checks unless configured otherwise.
pub const DEFAULT_SUPER_ROLE: &str = "ADMIN";

const SUPER_ROLE_REASON: &str = "Admin role has all permissions";
const UNKNOWN_ROLE_REASON: &str = "Role not recognised";

/// Error type for role permission checks.
#[derive(Debug, Error)]
pub enum RbacError {
    /// The request was malformed (e.g. an empty permission list).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// The role store could not be reached.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for role permission checks.
pub type Result<T> = std::result::Result<T, RbacError>;

/// Answers "does this role hold that permission?".
///
/// Holds no policy data; every check reads through a [`RoleStore`].
#[derive(Debug, Clone)]
pub struct RoleChecker {
    super_role: String,
}

impl Default for RoleChecker {
    fn default() -> Self {
        Self::new(DEFAULT_SUPER_ROLE)
    }
}

impl RoleChecker {
    pub fn new(super_role: &str) -> Self {
        Self {
            super_role: super_role.to_string(),
        }
    }

    pub fn super_role(&self) -> &str {
        &self.super_role
    }

    /// Checks a single permission.
    ///
    /// Allowed iff the role is the super role, or a `(role, permission)` row
    /// exists with `allowed = true`. An unknown role is denied.
    pub async fn evaluate(
        &self,
        store: &dyn RoleStore,
        role: &RoleId,
        permission: &PermissionName,
    ) -> Result<AccessDecision> {
        match self.classify(store, role).await? {
            RoleKind::Super => return Ok(super_role_allow(role)),
            RoleKind::Unknown => return Ok(unknown_role_deny(role)),
            RoleKind::Regular => {}
        }

        if self.holds(store, role, permission).await? {
            debug!(role = %role, permission = %permission, "Role permission granted");
            Ok(AccessDecision::allow(
                AccessModel::Rbac,
                format!("Role has {permission} permission"),
            ))
        } else {
            warn!(role = %role, permission = %permission, "Role permission missing");
            Ok(AccessDecision::deny(
                AccessModel::Rbac,
                format!("Role does not have {permission} permission"),
            ))
        }
    }

    /// Allows if the role holds at least one of `permissions`.
    ///
    /// The first granted permission (in the given order) decides.
    pub async fn any(
        &self,
        store: &dyn RoleStore,
        role: &RoleId,
        permissions: &[PermissionName],
    ) -> Result<AccessDecision> {
        if permissions.is_empty() {
            return Err(InvalidInput::Empty {
                field: "permissions",
            }
            .into());
        }
        match self.classify(store, role).await? {
            RoleKind::Super => return Ok(super_role_allow(role)),
            RoleKind::Unknown => return Ok(unknown_role_deny(role)),
            RoleKind::Regular => {}
        }

        for permission in permissions {
            if self.holds(store, role, permission).await? {
                debug!(role = %role, permission = %permission, "Role permission granted");
                return Ok(AccessDecision::allow(
                    AccessModel::Rbac,
                    format!("Role has {permission} permission"),
                ));
            }
        }

        let names: Vec<&str> = permissions.iter().map(PermissionName::as_str).collect();
        warn!(role = %role, permissions = ?names, "Role holds none of the permissions");
        Ok(AccessDecision::deny(
            AccessModel::Rbac,
            format!(
                "Role does not have any of the required permissions: {}",
                names.join(", ")
            ),
        ))
    }

    /// Allows only if the role holds every one of `permissions`.
    ///
    /// Stops at the first missing permission.
    pub async fn all(
        &self,
        store: &dyn RoleStore,
        role: &RoleId,
        permissions: &[PermissionName],
    ) -> Result<AccessDecision> {
        if permissions.is_empty() {
            return Err(InvalidInput::Empty {
                field: "permissions",
            }
            .into());
        }
        match self.classify(store, role).await? {
            RoleKind::Super => return Ok(super_role_allow(role)),
            RoleKind::Unknown => return Ok(unknown_role_deny(role)),
            RoleKind::Regular => {}
        }

        for permission in permissions {
            if !self.holds(store, role, permission).await? {
                warn!(role = %role, permission = %permission, "Role permission missing");
                return Ok(AccessDecision::deny(
                    AccessModel::Rbac,
                    format!("Role missing required permission: {permission}"),
                ));
            }
        }

        debug!(role = %role, count = permissions.len(), "Role holds all permissions");
        Ok(AccessDecision::allow(
            AccessModel::Rbac,
            "Role has all required permissions",
        ))
    }

    /// Grants (or explicitly withholds) a permission for a role.
    pub async fn assign(
        &self,
        store: &dyn RoleStore,
        role: &RoleId,
        permission: &PermissionName,
        allowed: bool,
    ) -> Result<()> {
        store.assign_permission(role, permission, allowed).await?;
        info!(role = %role, permission = %permission, allowed, "Role permission assigned");
        Ok(())
    }

    /// Removes a permission row. Removing a missing row is not an error.
    ///
    /// Returns whether a row existed.
    pub async fn remove(
        &self,
        store: &dyn RoleStore,
        role: &RoleId,
        permission: &PermissionName,
    ) -> Result<bool> {
        let existed = store.remove_permission(role, permission).await?;
        info!(role = %role, permission = %permission, existed, "Role permission removed");
        Ok(existed)
    }

    /// Names of permissions granted to the role, sorted.
    pub async fn permissions(
        &self,
        store: &dyn RoleStore,
        role: &RoleId,
    ) -> Result<Vec<PermissionName>> {
        Ok(store.list_permissions(role).await?)
    }

    async fn classify(&self, store: &dyn RoleStore, role: &RoleId) -> Result<RoleKind> {
        Ok(match store.find_role(role).await? {
            None => RoleKind::Unknown,
            Some(r) if r.name == self.super_role => RoleKind::Super,
            Some(_) => RoleKind::Regular,
        })
    }

    async fn holds(
        &self,
        store: &dyn RoleStore,
        role: &RoleId,
        permission: &PermissionName,
    ) -> Result<bool> {
        Ok(store
            .find_role_permission(role, permission)
            .await?
            .is_some_and(|row| row.allowed))
    }
}

enum RoleKind {
    Super,
    Regular,
    Unknown,
}

fn super_role_allow(role: &RoleId) -> AccessDecision {
    debug!(role = %role, "Super role bypasses permission checks");
    AccessDecision::allow(AccessModel::Rbac, SUPER_ROLE_REASON)
}

fn unknown_role_deny(role: &RoleId) -> AccessDecision {
    warn!(role = %role, "Role not found");
    AccessDecision::deny(AccessModel::Rbac, UNKNOWN_ROLE_REASON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodian_store::{MemoryStore, Role};
    use test_case::test_case;

    fn perm(name: &str) -> PermissionName {
        PermissionName::new(name).unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_role(Role::new("r-admin", "ADMIN"))
            .with_role(Role::new("r-hr", "HR_MANAGER"))
            .with_role(Role::new("r-emp", "EMPLOYEE"))
            .with_role_permission("r-hr", perm("view_leave_requests"))
            .with_role_permission("r-hr", perm("approve_leave"))
            .with_role_permission("r-emp", perm("view_documents"))
    }

    #[test_case("r-hr", "approve_leave", true ; "granted row")]
    #[test_case("r-hr", "manage_rules", false ; "missing row")]
    #[test_case("r-emp", "approve_leave", false ; "other role's permission")]
    #[test_case("r-admin", "manage_rules", true ; "super role bypass")]
    #[tokio::test]
    async fn single_permission(role: &str, permission: &str, allowed: bool) {
        let decision = RoleChecker::default()
            .evaluate(&store(), &RoleId::new(role), &perm(permission))
            .await
            .unwrap();
        assert_eq!(decision.is_allowed(), allowed);
        assert_eq!(decision.model(), AccessModel::Rbac);
    }

    #[tokio::test]
    async fn reasons_name_the_permission() {
        let checker = RoleChecker::default();
        let store = store();

        let granted = checker
            .evaluate(&store, &RoleId::new("r-hr"), &perm("approve_leave"))
            .await
            .unwrap();
        assert_eq!(granted.reason(), "Role has approve_leave permission");

        let missing = checker
            .evaluate(&store, &RoleId::new("r-hr"), &perm("manage_rules"))
            .await
            .unwrap();
        assert_eq!(missing.reason(), "Role does not have manage_rules permission");

        let admin = checker
            .evaluate(&store, &RoleId::new("r-admin"), &perm("anything"))
            .await
            .unwrap();
        assert_eq!(admin.reason(), "Admin role has all permissions");
    }

    #[tokio::test]
    async fn withheld_row_denies() {
        let store = store();
        let checker = RoleChecker::default();
        let role = RoleId::new("r-emp");

        checker
            .assign(&store, &role, &perm("export_data"), false)
            .await
            .unwrap();

        let decision = checker
            .evaluate(&store, &role, &perm("export_data"))
            .await
            .unwrap();
        assert!(decision.is_denied());
    }

    #[tokio::test]
    async fn unknown_role_is_denied() {
        let decision = RoleChecker::default()
            .evaluate(&store(), &RoleId::new("r-ghost"), &perm("view_documents"))
            .await
            .unwrap();
        assert!(decision.is_denied());
        assert_eq!(decision.reason(), UNKNOWN_ROLE_REASON);
    }

    #[tokio::test]
    async fn super_role_is_configurable() {
        let checker = RoleChecker::new("HR_MANAGER");
        let store = store();

        let hr = checker
            .evaluate(&store, &RoleId::new("r-hr"), &perm("manage_rules"))
            .await
            .unwrap();
        assert!(hr.is_allowed());

        let admin = checker
            .evaluate(&store, &RoleId::new("r-admin"), &perm("manage_rules"))
            .await
            .unwrap();
        assert!(admin.is_denied());
    }

    #[tokio::test]
    async fn any_allows_on_first_granted() {
        let decision = RoleChecker::default()
            .any(
                &store(),
                &RoleId::new("r-hr"),
                &[perm("manage_rules"), perm("approve_leave")],
            )
            .await
            .unwrap();
        assert!(decision.is_allowed());
        assert_eq!(decision.reason(), "Role has approve_leave permission");
    }

    #[tokio::test]
    async fn any_lists_every_permission_on_denial() {
        let decision = RoleChecker::default()
            .any(
                &store(),
                &RoleId::new("r-emp"),
                &[perm("manage_rules"), perm("approve_leave")],
            )
            .await
            .unwrap();
        assert!(decision.is_denied());
        assert_eq!(
            decision.reason(),
            "Role does not have any of the required permissions: manage_rules, approve_leave"
        );
    }

    #[tokio::test]
    async fn all_stops_at_first_missing() {
        let checker = RoleChecker::default();
        let store = store();
        let role = RoleId::new("r-hr");

        let denied = checker
            .all(
                &store,
                &role,
                &[perm("view_leave_requests"), perm("manage_rules"), perm("nope")],
            )
            .await
            .unwrap();
        assert_eq!(denied.reason(), "Role missing required permission: manage_rules");

        let allowed = checker
            .all(&store, &role, &[perm("view_leave_requests"), perm("approve_leave")])
            .await
            .unwrap();
        assert!(allowed.is_allowed());
        assert_eq!(allowed.reason(), "Role has all required permissions");
    }

    #[tokio::test]
    async fn empty_batches_are_rejected() {
        let checker = RoleChecker::default();
        let store = store();
        let role = RoleId::new("r-hr");

        assert!(matches!(
            checker.any(&store, &role, &[]).await,
            Err(RbacError::InvalidInput(InvalidInput::Empty { .. }))
        ));
        assert!(matches!(
            checker.all(&store, &role, &[]).await,
            Err(RbacError::InvalidInput(InvalidInput::Empty { .. }))
        ));
    }

    #[tokio::test]
    async fn assign_and_remove_round_trip_through_listing() {
        let checker = RoleChecker::default();
        let store = store();
        let role = RoleId::new("r-emp");

        checker
            .assign(&store, &role, &perm("share_documents"), true)
            .await
            .unwrap();
        assert_eq!(
            checker.permissions(&store, &role).await.unwrap(),
            vec![perm("share_documents"), perm("view_documents")]
        );

        assert!(checker.remove(&store, &role, &perm("share_documents")).await.unwrap());
        assert!(!checker.remove(&store, &role, &perm("share_documents")).await.unwrap());
        assert_eq!(
            checker.permissions(&store, &role).await.unwrap(),
            vec![perm("view_documents")]
        );
    }
}
