//! Persisted policy records.
//!
//! These are the rows the external data store holds on behalf of the engine:
//! roles and their permissions, discretionary grants, and the ordered rule set.

use std::fmt;

use custodian_types::{
    ActorId, EmploymentStatus, JobLevel, PermissionName, ResourceId, RoleId, RuleId,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Roles
// ============================================================================

/// A named role an actor holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

impl Role {
    pub fn new(id: impl Into<RoleId>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
        }
    }
}

/// One (role, permission) row. At most one exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    pub role: RoleId,
    pub permission: PermissionName,
    #[serde(default = "default_true")]
    pub allowed: bool,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Discretionary Grants
// ============================================================================

/// The capability bits of a discretionary grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantPermissions {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_share: bool,
}

impl GrantPermissions {
    pub fn new(can_view: bool, can_edit: bool, can_share: bool) -> Self {
        Self {
            can_view,
            can_edit,
            can_share,
        }
    }

    pub fn view_only() -> Self {
        Self::new(true, false, false)
    }

    pub fn full() -> Self {
        Self::new(true, true, true)
    }
}

/// An explicit permission record for one (resource, grantee) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub resource: ResourceId,
    pub grantee: ActorId,
    #[serde(flatten)]
    pub permissions: GrantPermissions,
    pub granted_by: ActorId,
}

impl Grant {
    pub fn new(
        resource: impl Into<ResourceId>,
        grantee: impl Into<ActorId>,
        permissions: GrantPermissions,
        granted_by: impl Into<ActorId>,
    ) -> Self {
        Self {
            resource: resource.into(),
            grantee: grantee.into(),
            permissions,
            granted_by: granted_by.into(),
        }
    }
}

// ============================================================================
// Actor Attributes
// ============================================================================

/// The attribute bundle kept for an actor by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorAttributes {
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_status: EmploymentStatus,
    pub job_level: Option<JobLevel>,
}

// ============================================================================
// Rules
// ============================================================================

/// The effect of a rule: allow or deny access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    Allow,
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Effect::Allow => "ALLOW",
            Effect::Deny => "DENY",
        })
    }
}

/// Working-time window a rule can be conditioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeWindow {
    /// Inside the configured working hours.
    WorkHours,
    /// Outside the configured working hours.
    AfterHours,
}

/// Department condition: compare with the resource, or with a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DepartmentMatch {
    /// Actor department equals resource department (`"match"`).
    Match,
    /// Actor department equals this literal.
    Literal(String),
}

impl From<String> for DepartmentMatch {
    fn from(value: String) -> Self {
        if value == "match" {
            DepartmentMatch::Match
        } else {
            DepartmentMatch::Literal(value)
        }
    }
}

impl From<DepartmentMatch> for String {
    fn from(value: DepartmentMatch) -> Self {
        match value {
            DepartmentMatch::Match => "match".to_string(),
            DepartmentMatch::Literal(s) => s,
        }
    }
}

/// Network-origin condition: the company network, or an exact address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkMatch {
    /// Any address on the company network (`"companyNetwork"`).
    CompanyNetwork,
    /// Exactly this address.
    Exact(String),
}

impl From<String> for NetworkMatch {
    fn from(value: String) -> Self {
        if value == "companyNetwork" {
            NetworkMatch::CompanyNetwork
        } else {
            NetworkMatch::Exact(value)
        }
    }
}

impl From<NetworkMatch> for String {
    fn from(value: NetworkMatch) -> Self {
        match value {
            NetworkMatch::CompanyNetwork => "companyNetwork".to_string(),
            NetworkMatch::Exact(s) => s,
        }
    }
}

/// One term of a rule condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    Time(TimeWindow),
    Department(DepartmentMatch),
    Network(NetworkMatch),
    /// The request context value under `key` must equal `value`.
    Equals { key: String, value: String },
}

/// A rule condition: every predicate must hold (implicit AND).
///
/// An empty condition matches every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleCondition(Vec<Predicate>);

impl RuleCondition {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self(predicates)
    }

    /// A condition that matches everything.
    pub fn always() -> Self {
        Self(Vec::new())
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.0.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Predicate>> for RuleCondition {
    fn from(predicates: Vec<Predicate>) -> Self {
        Self(predicates)
    }
}

/// A stored rule. `sequence` is assigned at creation and fixes evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub condition: RuleCondition,
    pub effect: Effect,
    pub sequence: u64,
}

/// A rule to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub condition: RuleCondition,
    pub effect: Effect,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl NewRule {
    pub fn new(name: &str, condition: RuleCondition, effect: Effect) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            condition,
            effect,
            active: true,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// A partial update to a stored rule. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub condition: Option<RuleCondition>,
    pub effect: Option<Effect>,
    pub active: Option<bool>,
}

impl RuleUpdate {
    pub fn apply(self, rule: &mut Rule) {
        if let Some(name) = self.name {
            rule.name = name;
        }
        if let Some(description) = self.description {
            rule.description = Some(description);
        }
        if let Some(condition) = self.condition {
            rule.condition = condition;
        }
        if let Some(effect) = self.effect {
            rule.effect = effect;
        }
        if let Some(active) = self.active {
            rule.active = active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_serializes_as_tagged_predicates() {
        let condition = RuleCondition::always()
            .and(Predicate::Time(TimeWindow::AfterHours))
            .and(Predicate::Department(DepartmentMatch::Match))
            .and(Predicate::Network(NetworkMatch::CompanyNetwork));

        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "time": "afterHours" },
                { "department": "match" },
                { "network": "companyNetwork" }
            ])
        );
    }

    #[test]
    fn literal_department_and_network_round_trip() {
        let json = r#"[{"department":"Finance"},{"network":"203.0.113.7"},{"equals":{"key":"resourceType","value":"leave_request"}}]"#;
        let condition: RuleCondition = serde_json::from_str(json).unwrap();

        assert_eq!(
            condition.predicates(),
            &[
                Predicate::Department(DepartmentMatch::Literal("Finance".into())),
                Predicate::Network(NetworkMatch::Exact("203.0.113.7".into())),
                Predicate::Equals {
                    key: "resourceType".into(),
                    value: "leave_request".into()
                },
            ]
        );
    }

    #[test]
    fn rule_from_toml_defaults_to_active() {
        let rule: NewRule = toml::from_str(
            r#"
name = "after-hours-lockout"
effect = "DENY"
condition = [{ time = "afterHours" }]
"#,
        )
        .unwrap();

        assert!(rule.active);
        assert_eq!(rule.effect, Effect::Deny);
        assert_eq!(rule.condition.predicates().len(), 1);
    }

    #[test]
    fn grant_permissions_flatten_into_grant() {
        let grant: Grant = toml::from_str(
            r#"
resource = "doc-1"
grantee = "u-2"
granted_by = "u-1"
can_view = true
"#,
        )
        .unwrap();

        assert_eq!(grant.permissions, GrantPermissions::view_only());
    }

    #[test]
    fn rule_update_only_touches_given_fields() {
        let mut rule = Rule {
            id: RuleId::new("rule-1"),
            name: "original".into(),
            description: None,
            active: true,
            condition: RuleCondition::always(),
            effect: Effect::Allow,
            sequence: 1,
        };

        RuleUpdate {
            effect: Some(Effect::Deny),
            active: Some(false),
            ..Default::default()
        }
        .apply(&mut rule);

        assert_eq!(rule.name, "original");
        assert_eq!(rule.effect, Effect::Deny);
        assert!(!rule.active);
        assert_eq!(rule.sequence, 1);
    }
}
