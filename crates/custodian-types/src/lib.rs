//! # custodian-types: Core types for `Custodian`
//!
//! This crate contains the vocabulary shared by every access-control model:
//! - Entity IDs ([`ActorId`], [`ResourceId`], [`RoleId`], [`RuleId`])
//! - Classification ([`SecurityLevel`])
//! - Requests ([`Action`], [`PermissionName`])
//! - Subjects and objects ([`Actor`], [`ResourceRecord`])
//! - Outcomes ([`AccessModel`], [`AccessDecision`])
//! - Input validation ([`InvalidInput`])

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod error;

pub use error::InvalidInput;

// ============================================================================
// Entity IDs - opaque strings issued by the identity and resource services
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the id is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Unique identifier for an authenticated actor (a user or service account).
    ActorId
}

string_id! {
    /// Unique identifier for a protected resource.
    ResourceId
}

string_id! {
    /// Unique identifier for a role.
    RoleId
}

string_id! {
    /// Unique identifier for a rule in the rule set.
    RuleId
}

// ============================================================================
// Security Level
// ============================================================================

/// Clearance of an actor, or sensitivity of a resource.
///
/// The scale is strictly ordinal: `PUBLIC (1) < INTERNAL (2) < CONFIDENTIAL (3)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityLevel {
    /// Lowest level; readable by anyone who passes the other gates.
    Public,
    /// Internal to the organisation.
    Internal,
    /// Highest level.
    Confidential,
}

impl SecurityLevel {
    /// All levels from least to most sensitive.
    pub const ALL: [SecurityLevel; 3] = [
        SecurityLevel::Public,
        SecurityLevel::Internal,
        SecurityLevel::Confidential,
    ];

    /// Position on the fixed ordinal scale.
    pub fn ordinal(self) -> u8 {
        match self {
            SecurityLevel::Public => 1,
            SecurityLevel::Internal => 2,
            SecurityLevel::Confidential => 3,
        }
    }

    /// Returns `true` if a holder of `self` may read something classified `other`.
    pub fn dominates(self, other: SecurityLevel) -> bool {
        self.ordinal() >= other.ordinal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SecurityLevel::Public => "PUBLIC",
            SecurityLevel::Internal => "INTERNAL",
            SecurityLevel::Confidential => "CONFIDENTIAL",
        }
    }
}

impl Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityLevel {
    type Err = InvalidInput;

    /// Parses a level name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(SecurityLevel::Public),
            "INTERNAL" => Ok(SecurityLevel::Internal),
            "CONFIDENTIAL" => Ok(SecurityLevel::Confidential),
            _ => Err(InvalidInput::UnknownSecurityLevel(s.to_string())),
        }
    }
}

// ============================================================================
// Action
// ============================================================================

/// An operation an actor attempts on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Edit,
    Share,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Share => "share",
            Action::Delete => "delete",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Action::View),
            "edit" => Ok(Action::Edit),
            "share" => Ok(Action::Share),
            "delete" => Ok(Action::Delete),
            _ => Err(InvalidInput::UnknownAction(s.to_string())),
        }
    }
}

// ============================================================================
// Permission Name
// ============================================================================

/// Maximum length of a permission name.
pub const MAX_PERMISSION_NAME_LEN: usize = 128;

/// A validated RBAC permission name such as `view_confidential` or `manage_rules`.
///
/// Permission names are ASCII alphanumerics plus `_`, `-`, `.` and `:`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionName(String);

impl PermissionName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidInput> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidInput::PermissionName {
                name,
                reason: "must not be empty",
            });
        }
        if name.len() > MAX_PERMISSION_NAME_LEN {
            return Err(InvalidInput::PermissionName {
                name,
                reason: "exceeds 128 characters",
            });
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
        {
            return Err(InvalidInput::PermissionName {
                name,
                reason: "contains characters outside [A-Za-z0-9_.:-]",
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PermissionName {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PermissionName {
    type Error = InvalidInput;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionName> for String {
    fn from(name: PermissionName) -> Self {
        name.0
    }
}

// ============================================================================
// Actor Attributes
// ============================================================================

/// Employment status of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentStatus {
    Active,
    OnLeave,
    Suspended,
    Terminated,
}

impl Display for EmploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EmploymentStatus::Active => "ACTIVE",
            EmploymentStatus::OnLeave => "ON_LEAVE",
            EmploymentStatus::Suspended => "SUSPENDED",
            EmploymentStatus::Terminated => "TERMINATED",
        })
    }
}

/// Seniority of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobLevel {
    Junior,
    Senior,
    Manager,
    Executive,
}

impl Display for JobLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobLevel::Junior => "JUNIOR",
            JobLevel::Senior => "SENIOR",
            JobLevel::Manager => "MANAGER",
            JobLevel::Executive => "EXECUTIVE",
        })
    }
}

// ============================================================================
// Actor
// ============================================================================

/// The authenticated principal making a request.
///
/// Built once per request by the authentication layer and immutable for the
/// duration of a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: RoleId,
    pub clearance: SecurityLevel,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_employment_status")]
    pub employment_status: EmploymentStatus,
    #[serde(default)]
    pub job_level: Option<JobLevel>,
}

fn default_employment_status() -> EmploymentStatus {
    EmploymentStatus::Active
}

impl Actor {
    /// Creates an active actor with no department, location or job level.
    pub fn new(id: impl Into<ActorId>, role: impl Into<RoleId>, clearance: SecurityLevel) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            clearance,
            department: None,
            location: None,
            employment_status: EmploymentStatus::Active,
            job_level: None,
        }
    }

    pub fn with_department(mut self, department: &str) -> Self {
        self.department = Some(department.to_string());
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn with_employment_status(mut self, status: EmploymentStatus) -> Self {
        self.employment_status = status;
        self
    }

    pub fn with_job_level(mut self, level: JobLevel) -> Self {
        self.job_level = Some(level);
        self
    }
}

// ============================================================================
// Resource
// ============================================================================

/// The facts about a resource the engine needs: owner, sensitivity and department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: ResourceId,
    pub owner: ActorId,
    pub sensitivity: SecurityLevel,
    #[serde(default)]
    pub department: Option<String>,
}

impl ResourceRecord {
    pub fn new(
        id: impl Into<ResourceId>,
        owner: impl Into<ActorId>,
        sensitivity: SecurityLevel,
    ) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            sensitivity,
            department: None,
        }
    }

    pub fn with_department(mut self, department: &str) -> Self {
        self.department = Some(department.to_string());
        self
    }

    pub fn is_public(&self) -> bool {
        self.sensitivity == SecurityLevel::Public
    }
}

// ============================================================================
// Access Model
// ============================================================================

/// Identifies which evaluator produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessModel {
    #[serde(rename = "MAC")]
    Mac,
    #[serde(rename = "DAC")]
    Dac,
    #[serde(rename = "RBAC")]
    Rbac,
    #[serde(rename = "RuBAC")]
    Rubac,
    #[serde(rename = "ABAC")]
    Abac,
    /// The orchestrator itself (missing resource, nothing applicable).
    #[serde(rename = "UNIFIED")]
    Unified,
}

impl AccessModel {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessModel::Mac => "MAC",
            AccessModel::Dac => "DAC",
            AccessModel::Rbac => "RBAC",
            AccessModel::Rubac => "RuBAC",
            AccessModel::Abac => "ABAC",
            AccessModel::Unified => "UNIFIED",
        }
    }
}

impl Display for AccessModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Access Decision
// ============================================================================

/// Reason substituted when a denial is constructed without one.
const FALLBACK_DENY_REASON: &str = "Access denied";

/// The verdict of one evaluator, or of the whole engine.
///
/// A denial always carries a non-empty reason and the model that vetoed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    allowed: bool,
    model: AccessModel,
    reason: String,
}

impl AccessDecision {
    pub fn allow(model: AccessModel, reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            model,
            reason: reason.into(),
        }
    }

    /// Builds a denial. An empty reason is replaced with a generic one.
    pub fn deny(model: AccessModel, reason: impl Into<String>) -> Self {
        let mut reason = reason.into();
        if reason.trim().is_empty() {
            reason = FALLBACK_DENY_REASON.to_string();
        }
        Self {
            allowed: false,
            model,
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn is_denied(&self) -> bool {
        !self.allowed
    }

    pub fn model(&self) -> AccessModel {
        self.model
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.allowed { "allow" } else { "deny" };
        write!(f, "{verdict} [{}]: {}", self.model, self.reason)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("public", SecurityLevel::Public)]
    #[test_case("Internal", SecurityLevel::Internal)]
    #[test_case(" CONFIDENTIAL ", SecurityLevel::Confidential)]
    fn security_level_parses_case_insensitively(input: &str, expected: SecurityLevel) {
        assert_eq!(input.parse::<SecurityLevel>().unwrap(), expected);
    }

    #[test]
    fn unknown_security_level_is_rejected() {
        let err = "SECRET".parse::<SecurityLevel>().unwrap_err();
        assert!(matches!(err, InvalidInput::UnknownSecurityLevel(ref s) if s == "SECRET"));
    }

    #[test]
    fn security_level_ordinals_are_fixed() {
        assert_eq!(SecurityLevel::Public.ordinal(), 1);
        assert_eq!(SecurityLevel::Internal.ordinal(), 2);
        assert_eq!(SecurityLevel::Confidential.ordinal(), 3);
    }

    #[test]
    fn security_level_serializes_upper_case() {
        let json = serde_json::to_string(&SecurityLevel::Confidential).unwrap();
        assert_eq!(json, "\"CONFIDENTIAL\"");
    }

    #[test_case("view", Action::View)]
    #[test_case("edit", Action::Edit)]
    #[test_case("share", Action::Share)]
    #[test_case("delete", Action::Delete)]
    fn action_round_trips_through_str(input: &str, expected: Action) {
        let action: Action = input.parse().unwrap();
        assert_eq!(action, expected);
        assert_eq!(action.as_str(), input);
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(matches!(
            "download".parse::<Action>(),
            Err(InvalidInput::UnknownAction(_))
        ));
        // Actions are case-sensitive on the wire
        assert!("VIEW".parse::<Action>().is_err());
    }

    #[test_case("view_confidential" ; "underscore")]
    #[test_case("leave:approve" ; "colon")]
    #[test_case("logs.export-v2" ; "dot and dash")]
    fn valid_permission_names(name: &str) {
        assert_eq!(PermissionName::new(name).unwrap().as_str(), name);
    }

    #[test_case("" ; "empty")]
    #[test_case("view confidential" ; "space")]
    #[test_case("drop;table" ; "semicolon")]
    fn invalid_permission_names(name: &str) {
        assert!(matches!(
            PermissionName::new(name),
            Err(InvalidInput::PermissionName { .. })
        ));
    }

    #[test]
    fn overlong_permission_name_is_rejected() {
        let name = "p".repeat(MAX_PERMISSION_NAME_LEN + 1);
        assert!(PermissionName::new(name).is_err());
    }

    #[test]
    fn permission_name_deserialization_validates() {
        let ok: PermissionName = serde_json::from_str("\"manage_rules\"").unwrap();
        assert_eq!(ok.as_str(), "manage_rules");
        assert!(serde_json::from_str::<PermissionName>("\"bad name\"").is_err());
    }

    #[test]
    fn deny_never_has_empty_reason() {
        let decision = AccessDecision::deny(AccessModel::Dac, "   ");
        assert!(decision.is_denied());
        assert_eq!(decision.reason(), FALLBACK_DENY_REASON);
        assert_eq!(decision.model(), AccessModel::Dac);
    }

    #[test]
    fn access_model_serializes_with_display_names() {
        let decision = AccessDecision::allow(AccessModel::Rubac, "No matching rules");
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["model"], "RuBAC");
        assert_eq!(json["allowed"], true);
        assert_eq!(decision.to_string(), "allow [RuBAC]: No matching rules");
    }

    #[test]
    fn actor_builder_sets_optional_attributes() {
        let actor = Actor::new("u-1", "role-staff", SecurityLevel::Internal)
            .with_department("IT")
            .with_location("Berlin")
            .with_job_level(JobLevel::Manager)
            .with_employment_status(EmploymentStatus::OnLeave);

        assert_eq!(actor.id.as_str(), "u-1");
        assert_eq!(actor.department.as_deref(), Some("IT"));
        assert_eq!(actor.location.as_deref(), Some("Berlin"));
        assert_eq!(actor.job_level, Some(JobLevel::Manager));
        assert_eq!(actor.employment_status, EmploymentStatus::OnLeave);
    }

    #[test]
    fn blank_ids_are_detected() {
        assert!(ActorId::new("  ").is_blank());
        assert!(!ResourceId::new("doc-1").is_blank());
    }

    proptest! {
        #[test]
        fn dominates_matches_ordinal_comparison(a in 0usize..3, b in 0usize..3) {
            let (a, b) = (SecurityLevel::ALL[a], SecurityLevel::ALL[b]);
            prop_assert_eq!(a.dominates(b), a.ordinal() >= b.ordinal());
        }
    }
}
