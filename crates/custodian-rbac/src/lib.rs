//! # custodian-rbac: Role-Based Access Control
//!
//! Permissions are attached to roles, one `(role, permission) -> allowed`
//! row per pair. An actor holds exactly one role.
//!
//! One role, the *super role* (`ADMIN` unless configured otherwise), is
//! recognised by name and bypasses every permission check.
//!
//! ## Checks
//!
//! - [`RoleChecker::evaluate`] - a single permission
//! - [`RoleChecker::any`] - allow if at least one of the permissions is granted
//! - [`RoleChecker::all`] - deny on the first missing permission
//!
//! Batch checks walk permissions in the order the caller gives them.
//!
//! ## Example
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use custodian_rbac::RoleChecker;
//! use custodian_store::{MemoryStore, Role};
//! use custodian_types::{PermissionName, RoleId};
//!
//! let view = PermissionName::new("view_confidential").unwrap();
//! let store = MemoryStore::new()
//!     .with_role(Role::new("r-hr", "HR_MANAGER"))
//!     .with_role_permission("r-hr", view.clone());
//!
//! let decision = RoleChecker::default()
//!     .evaluate(&store, &RoleId::new("r-hr"), &view)
//!     .await
//!     .unwrap();
//! assert!(decision.is_allowed());
//! # }
//! ```

mod checker;

pub use checker::{DEFAULT_SUPER_ROLE, RbacError, Result, RoleChecker};
