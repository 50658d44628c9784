//! ABAC policy catalogue.

use std::fmt;

use custodian_types::{EmploymentStatus, JobLevel, SecurityLevel};
use serde::{Deserialize, Serialize};

use crate::attributes::AttributeContext;

/// A boolean predicate over an [`AttributeContext`].
pub trait AttributePolicy: Send + Sync {
    /// Returns `true` if the policy allows the request.
    fn holds(&self, ctx: &AttributeContext) -> bool;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> AttributePolicy for F
where
    F: Fn(&AttributeContext) -> bool + Send + Sync,
{
    fn holds(&self, ctx: &AttributeContext) -> bool {
        self(ctx)
    }
}

/// Built-in policies.
///
/// Department comparisons require both departments to be present; a missing
/// department never matches anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardPolicy {
    /// Actor and resource belong to the same department.
    SameDepartment,
    /// PUBLIC resources pass; anything else requires the same department.
    SameDepartmentUnlessPublic,
    /// The actor's employment status is ACTIVE.
    ActiveEmployee,
    /// A MANAGER accessing a resource of their own department.
    DepartmentManager,
    /// Both actor and resource belong to HR.
    HrDepartment,
    /// A Finance MANAGER during working hours.
    FinancePayroll,
}

impl StandardPolicy {
    pub const ALL: [StandardPolicy; 6] = [
        StandardPolicy::SameDepartment,
        StandardPolicy::SameDepartmentUnlessPublic,
        StandardPolicy::ActiveEmployee,
        StandardPolicy::DepartmentManager,
        StandardPolicy::HrDepartment,
        StandardPolicy::FinancePayroll,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StandardPolicy::SameDepartment => "same_department",
            StandardPolicy::SameDepartmentUnlessPublic => "same_department_unless_public",
            StandardPolicy::ActiveEmployee => "active_employee",
            StandardPolicy::DepartmentManager => "department_manager",
            StandardPolicy::HrDepartment => "hr_department",
            StandardPolicy::FinancePayroll => "finance_payroll",
        }
    }
}

impl fmt::Display for StandardPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AttributePolicy for StandardPolicy {
    fn holds(&self, ctx: &AttributeContext) -> bool {
        match self {
            StandardPolicy::SameDepartment => same_department(ctx),
            StandardPolicy::SameDepartmentUnlessPublic => {
                ctx.resource
                    .as_ref()
                    .is_some_and(|r| r.sensitivity == SecurityLevel::Public)
                    || same_department(ctx)
            }
            StandardPolicy::ActiveEmployee => {
                ctx.actor.employment_status == EmploymentStatus::Active
            }
            StandardPolicy::DepartmentManager => {
                ctx.actor.job_level == Some(JobLevel::Manager) && same_department(ctx)
            }
            StandardPolicy::HrDepartment => {
                ctx.actor.department.as_deref() == Some("HR")
                    && ctx.resource_department() == Some("HR")
            }
            StandardPolicy::FinancePayroll => {
                ctx.actor.department.as_deref() == Some("Finance")
                    && ctx.actor.job_level == Some(JobLevel::Manager)
                    && ctx.environment.in_working_hours
            }
        }
    }

    fn name(&self) -> &str {
        self.as_str()
    }
}

fn same_department(ctx: &AttributeContext) -> bool {
    match (ctx.actor.department.as_deref(), ctx.resource_department()) {
        (Some(actor), Some(resource)) => actor == resource,
        _ => false,
    }
}
