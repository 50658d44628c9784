//! # custodian-rubac: Rule-Based Access Control
//!
//! Ordered allow/deny rules conditioned on the request environment.
//!
//! A rule condition is a conjunction of predicates:
//!
//! | Predicate                        | Holds when                                   |
//! |----------------------------------|----------------------------------------------|
//! | `time = "workHours"`             | evaluation time is inside working hours      |
//! | `time = "afterHours"`            | evaluation time is outside working hours     |
//! | `department = "match"`           | actor and resource departments are equal     |
//! | `department = "<name>"`          | actor department equals `<name>`             |
//! | `network = "companyNetwork"`     | origin is on the company network             |
//! | `network = "<addr>"`             | origin equals `<addr>`                       |
//! | `equals = { key, value }`        | context value under `key` equals `value`     |
//!
//! Active rules are tried in creation order and the **first** match decides.
//! When no rule matches, the evaluator's default effect applies (allow unless
//! configured otherwise).
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use custodian_rubac::{RuleContext, RuleEvaluator};
//! use custodian_store::{Effect, Predicate, Rule, RuleCondition, TimeWindow};
//! use custodian_types::RuleId;
//!
//! let lockout = Rule {
//!     id: RuleId::new("rule-1"),
//!     name: "after-hours-lockout".into(),
//!     description: None,
//!     active: true,
//!     condition: RuleCondition::always().and(Predicate::Time(TimeWindow::AfterHours)),
//!     effect: Effect::Deny,
//!     sequence: 1,
//! };
//!
//! let late = RuleContext::new(Utc.with_ymd_and_hms(2025, 1, 8, 23, 0, 0).unwrap());
//! let decision = RuleEvaluator::default().evaluate_rules(&[lockout], &late);
//! assert!(decision.is_denied());
//! ```

mod context;
mod evaluator;

pub use context::{
    CompanyNetwork, KEY_IP_ADDRESS, KEY_RESOURCE_DEPARTMENT, KEY_USER_DEPARTMENT, RuleContext,
    WorkingHours,
};
pub use evaluator::{NO_MATCH_REASON, RuleEvaluator};
