//! # custodian-mac: Mandatory Access Control
//!
//! System-fixed security levels that no owner, role or rule can override.
//!
//! | Level        | Ordinal |
//! |--------------|---------|
//! | PUBLIC       | 1       |
//! | INTERNAL     | 2       |
//! | CONFIDENTIAL | 3       |
//!
//! An actor may access a resource iff `ordinal(clearance) >= ordinal(sensitivity)`.
//!
//! ```
//! use custodian_mac::evaluate;
//! use custodian_types::SecurityLevel;
//!
//! let decision = evaluate(SecurityLevel::Internal, SecurityLevel::Confidential);
//! assert!(decision.is_denied());
//! ```

use custodian_types::{AccessDecision, AccessModel, SecurityLevel};
use tracing::debug;

/// Compares an actor's clearance with a resource's sensitivity.
///
/// Pure: no I/O, never fails.
pub fn evaluate(clearance: SecurityLevel, sensitivity: SecurityLevel) -> AccessDecision {
    if clearance.dominates(sensitivity) {
        debug!(%clearance, %sensitivity, "Clearance sufficient");
        AccessDecision::allow(
            AccessModel::Mac,
            format!("User clearance level ({clearance}) meets resource security level ({sensitivity})"),
        )
    } else {
        debug!(%clearance, %sensitivity, "Clearance insufficient");
        AccessDecision::deny(
            AccessModel::Mac,
            format!(
                "User clearance level ({clearance}) is insufficient for resource security level ({sensitivity})"
            ),
        )
    }
}

/// Returns whether a role may reclassify resources. Only the super role can.
pub fn can_modify_security_level(role_name: &str, super_role: &str) -> bool {
    role_name == super_role
}
