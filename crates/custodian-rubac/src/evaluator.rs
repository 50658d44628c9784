//! Rule evaluation.
//!
//! Active rules are checked in stored (creation) order and the first rule
//! whose condition matches decides. Rule order is therefore part of the
//! policy, not an accident of storage. When nothing matches, the configured
//! default effect applies.

use custodian_store::{
    DepartmentMatch, Effect, NetworkMatch, Predicate, Rule, RuleCondition, RuleStore, StoreError,
    TimeWindow,
};
use custodian_types::{AccessDecision, AccessModel};
use tracing::{debug, warn};

use crate::context::{CompanyNetwork, RuleContext, WorkingHours};

/// Reason attached when no active rule matched.
pub const NO_MATCH_REASON: &str = "No matching rules";

/// Evaluates rule conditions against a request context.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    working_hours: WorkingHours,
    company_network: CompanyNetwork,
    default_effect: Effect,
}

impl Default for RuleEvaluator {
    /// Default working hours and company network, and a fail-open default.
    fn default() -> Self {
        Self {
            working_hours: WorkingHours::default(),
            company_network: CompanyNetwork::default(),
            default_effect: Effect::Allow,
        }
    }
}

impl RuleEvaluator {
    pub fn new(
        working_hours: WorkingHours,
        company_network: CompanyNetwork,
        default_effect: Effect,
    ) -> Self {
        Self {
            working_hours,
            company_network,
            default_effect,
        }
    }

    pub fn with_default_effect(mut self, effect: Effect) -> Self {
        self.default_effect = effect;
        self
    }

    pub fn default_effect(&self) -> Effect {
        self.default_effect
    }

    /// Fetches the active rule set and evaluates it.
    pub async fn evaluate(
        &self,
        store: &dyn RuleStore,
        ctx: &RuleContext,
    ) -> Result<AccessDecision, StoreError> {
        let rules = store.list_active_rules().await?;
        Ok(self.evaluate_rules(&rules, ctx))
    }

    /// Evaluates `rules` in the given order; the first match wins.
    ///
    /// Inactive rules are skipped even if the caller passes them.
    pub fn evaluate_rules(&self, rules: &[Rule], ctx: &RuleContext) -> AccessDecision {
        let matched = rules
            .iter()
            .filter(|rule| rule.active)
            .find(|rule| self.matches(&rule.condition, ctx));

        match matched {
            Some(rule) => match rule.effect {
                Effect::Allow => {
                    debug!(rule = %rule.name, "Rule allowed access");
                    AccessDecision::allow(
                        AccessModel::Rubac,
                        format!("Access allowed by rule: {}", rule.name),
                    )
                }
                Effect::Deny => {
                    warn!(rule = %rule.name, "Rule denied access");
                    AccessDecision::deny(
                        AccessModel::Rubac,
                        format!("Access denied by rule: {}", rule.name),
                    )
                }
            },
            None => match self.default_effect {
                Effect::Allow => AccessDecision::allow(AccessModel::Rubac, NO_MATCH_REASON),
                Effect::Deny => AccessDecision::deny(AccessModel::Rubac, NO_MATCH_REASON),
            },
        }
    }

    /// Returns whether every predicate of `condition` holds for `ctx`.
    pub fn matches(&self, condition: &RuleCondition, ctx: &RuleContext) -> bool {
        condition
            .predicates()
            .iter()
            .all(|p| self.predicate_holds(p, ctx))
    }

    fn predicate_holds(&self, predicate: &Predicate, ctx: &RuleContext) -> bool {
        match predicate {
            Predicate::Time(TimeWindow::WorkHours) => self.working_hours.contains(ctx.at),
            Predicate::Time(TimeWindow::AfterHours) => !self.working_hours.contains(ctx.at),

            // Two missing departments are equal, so deny rules still fire.
            Predicate::Department(DepartmentMatch::Match) => {
                ctx.actor_department == ctx.resource_department
            }
            Predicate::Department(DepartmentMatch::Literal(dept)) => {
                ctx.actor_department.as_deref() == Some(dept.as_str())
            }

            Predicate::Network(NetworkMatch::CompanyNetwork) => ctx
                .network_origin
                .as_deref()
                .is_some_and(|origin| self.company_network.contains(origin)),
            Predicate::Network(NetworkMatch::Exact(addr)) => {
                ctx.network_origin.as_deref() == Some(addr.as_str())
            }

            Predicate::Equals { key, value } => ctx.value(key) == Some(value.as_str()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use custodian_store::{MemoryStore, NewRule};
    use custodian_types::RuleId;
    use proptest::prelude::*;

    fn rule(seq: u64, name: &str, condition: RuleCondition, effect: Effect) -> Rule {
        Rule {
            id: RuleId::new(format!("rule-{seq}")),
            name: name.to_string(),
            description: None,
            active: true,
            condition,
            effect,
            sequence: seq,
        }
    }

    fn midday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 8, 12, 0, 0).unwrap()
    }

    fn night() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 8, 22, 0, 0).unwrap()
    }

    #[test]
    fn no_rules_allows_by_default() {
        let decision = RuleEvaluator::default().evaluate_rules(&[], &RuleContext::new(midday()));
        assert!(decision.is_allowed());
        assert_eq!(decision.reason(), NO_MATCH_REASON);
        assert_eq!(decision.model(), AccessModel::Rubac);
    }

    #[test]
    fn strict_default_denies_unmatched_requests() {
        let evaluator = RuleEvaluator::default().with_default_effect(Effect::Deny);
        let decision = evaluator.evaluate_rules(&[], &RuleContext::new(midday()));
        assert!(decision.is_denied());
        assert_eq!(decision.reason(), NO_MATCH_REASON);
    }

    #[test]
    fn first_match_wins_and_order_flips_verdict() {
        let deny = rule(1, "r1-deny", RuleCondition::always(), Effect::Deny);
        let allow = rule(2, "r2-allow", RuleCondition::always(), Effect::Allow);
        let ctx = RuleContext::new(midday());
        let evaluator = RuleEvaluator::default();

        let decision = evaluator.evaluate_rules(&[deny.clone(), allow.clone()], &ctx);
        assert!(decision.is_denied());
        assert_eq!(decision.reason(), "Access denied by rule: r1-deny");

        let decision = evaluator.evaluate_rules(&[allow, deny], &ctx);
        assert!(decision.is_allowed());
        assert_eq!(decision.reason(), "Access allowed by rule: r2-allow");
    }

    #[test]
    fn non_matching_rule_is_skipped() {
        let rules = [
            rule(
                1,
                "hr-only",
                RuleCondition::always().and(Predicate::Department(DepartmentMatch::Literal(
                    "HR".into(),
                ))),
                Effect::Deny,
            ),
            rule(2, "catch-all", RuleCondition::always(), Effect::Allow),
        ];
        let ctx = RuleContext::new(midday()).with_actor_department("IT");

        let decision = RuleEvaluator::default().evaluate_rules(&rules, &ctx);
        assert_eq!(decision.reason(), "Access allowed by rule: catch-all");
    }

    #[test]
    fn inactive_rules_are_ignored() {
        let mut lockout = rule(1, "lockout", RuleCondition::always(), Effect::Deny);
        lockout.active = false;

        let decision =
            RuleEvaluator::default().evaluate_rules(&[lockout], &RuleContext::new(midday()));
        assert!(decision.is_allowed());
    }

    #[test]
    fn time_windows() {
        let evaluator = RuleEvaluator::default();
        let work = RuleCondition::always().and(Predicate::Time(TimeWindow::WorkHours));
        let after = RuleCondition::always().and(Predicate::Time(TimeWindow::AfterHours));

        assert!(evaluator.matches(&work, &RuleContext::new(midday())));
        assert!(!evaluator.matches(&work, &RuleContext::new(night())));
        assert!(!evaluator.matches(&after, &RuleContext::new(midday())));
        assert!(evaluator.matches(&after, &RuleContext::new(night())));
    }

    #[test]
    fn department_match_compares_both_sides() {
        let evaluator = RuleEvaluator::default();
        let cond = RuleCondition::always().and(Predicate::Department(DepartmentMatch::Match));

        let same = RuleContext::new(midday())
            .with_actor_department("IT")
            .with_resource_department("IT");
        let different = RuleContext::new(midday())
            .with_actor_department("IT")
            .with_resource_department("HR");
        let one_missing = RuleContext::new(midday()).with_actor_department("IT");
        let both_missing = RuleContext::new(midday());

        assert!(evaluator.matches(&cond, &same));
        assert!(!evaluator.matches(&cond, &different));
        assert!(!evaluator.matches(&cond, &one_missing));
        assert!(evaluator.matches(&cond, &both_missing));
    }

    #[test]
    fn network_predicates() {
        let evaluator = RuleEvaluator::default();
        let company = RuleCondition::always().and(Predicate::Network(NetworkMatch::CompanyNetwork));
        let exact = RuleCondition::always().and(Predicate::Network(NetworkMatch::Exact(
            "203.0.113.7".into(),
        )));

        let office = RuleContext::new(midday()).with_network_origin("192.168.1.4");
        let cafe = RuleContext::new(midday()).with_network_origin("203.0.113.7");
        let unknown = RuleContext::new(midday());

        assert!(evaluator.matches(&company, &office));
        assert!(!evaluator.matches(&company, &cafe));
        assert!(!evaluator.matches(&company, &unknown));
        assert!(evaluator.matches(&exact, &cafe));
        assert!(!evaluator.matches(&exact, &office));
    }

    #[test]
    fn every_equality_term_must_hold() {
        let evaluator = RuleEvaluator::default();
        let cond = RuleCondition::new(vec![
            Predicate::Equals {
                key: "resourceType".into(),
                value: "leave_request".into(),
            },
            Predicate::Equals {
                key: "userDepartment".into(),
                value: "HR".into(),
            },
        ]);

        let both = RuleContext::new(midday())
            .with_actor_department("HR")
            .with_value("resourceType", "leave_request");
        let one = RuleContext::new(midday())
            .with_actor_department("IT")
            .with_value("resourceType", "leave_request");
        let missing_key = RuleContext::new(midday()).with_actor_department("HR");

        assert!(evaluator.matches(&cond, &both));
        assert!(!evaluator.matches(&cond, &one));
        assert!(!evaluator.matches(&cond, &missing_key));
    }

    #[test]
    fn mixed_predicates_are_conjunctive() {
        let evaluator = RuleEvaluator::default();
        let cond = RuleCondition::new(vec![
            Predicate::Time(TimeWindow::AfterHours),
            Predicate::Network(NetworkMatch::CompanyNetwork),
        ]);

        let night_office = RuleContext::new(night()).with_network_origin("10.0.0.9");
        let night_home = RuleContext::new(night()).with_network_origin("198.51.100.2");
        let day_office = RuleContext::new(midday()).with_network_origin("10.0.0.9");

        assert!(evaluator.matches(&cond, &night_office));
        assert!(!evaluator.matches(&cond, &night_home));
        assert!(!evaluator.matches(&cond, &day_office));
    }

    #[tokio::test]
    async fn evaluates_active_rules_from_store() {
        let store = MemoryStore::new()
            .with_rule(
                NewRule::new("disabled-lockout", RuleCondition::always(), Effect::Deny).inactive(),
            )
            .with_rule(NewRule::new(
                "after-hours-lockout",
                RuleCondition::always().and(Predicate::Time(TimeWindow::AfterHours)),
                Effect::Deny,
            ));
        let evaluator = RuleEvaluator::default();

        let day = evaluator
            .evaluate(&store, &RuleContext::new(midday()))
            .await
            .unwrap();
        assert!(day.is_allowed());

        let late = evaluator
            .evaluate(&store, &RuleContext::new(night()))
            .await
            .unwrap();
        assert!(late.is_denied());
        assert_eq!(late.reason(), "Access denied by rule: after-hours-lockout");
    }

    proptest! {
        /// For any sequence of always/never rules, the verdict is the effect of
        /// the first "always" rule, or the default when there is none.
        #[test]
        fn verdict_is_effect_of_first_matching_rule(
            spec in prop::collection::vec((any::<bool>(), any::<bool>()), 0..12)
        ) {
            let never = RuleCondition::always()
                .and(Predicate::Equals { key: "k".into(), value: "absent".into() });
            let rules: Vec<Rule> = spec
                .iter()
                .enumerate()
                .map(|(i, (fires, allow))| {
                    let condition = if *fires { RuleCondition::always() } else { never.clone() };
                    let effect = if *allow { Effect::Allow } else { Effect::Deny };
                    rule(i as u64, &format!("r{i}"), condition, effect)
                })
                .collect();

            let decision = RuleEvaluator::default()
                .evaluate_rules(&rules, &RuleContext::new(midday()));

            match spec.iter().position(|(fires, _)| *fires) {
                Some(i) => {
                    prop_assert_eq!(decision.is_allowed(), spec[i].1);
                    let expected_suffix = format!("r{i}");
                    prop_assert!(decision.reason().ends_with(&expected_suffix));
                }
                None => {
                    prop_assert!(decision.is_allowed());
                    prop_assert_eq!(decision.reason(), NO_MATCH_REASON);
                }
            }
        }
    }
}
