//! Role-scoped visibility
//!
//! Which users' rows a caller may see is a function of their role only:
//!
//! - EMPLOYEE sees their own rows
//! - MANAGER sees their own rows and those of their direct reports
//! - ADMIN sees everything in the company
//!
//! Every scope is pinned to the caller's company. `permits` answers the
//! question for one loaded row; `push_*_filter` renders the same rule into SQL
//! with bound parameters.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::UserRole;

/// Picks the latest approval step of an expense (aliased `s`)
pub(crate) const LATEST_STEP_ORDER: &str = "ORDER BY s.step_order DESC, s.created_at DESC LIMIT 1";

/// Visibility scope of the current caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseScope {
    Own { company_id: Uuid, user_id: Uuid },
    Team { company_id: Uuid, manager_id: Uuid },
    Company { company_id: Uuid },
}

/// Who an expense belongs to, as needed for visibility and approval checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpenseOwnership {
    pub company_id: Uuid,
    pub owner_id: Uuid,
    pub owner_manager_id: Option<Uuid>,
    /// Approver of the expense's open or decided approval step, if any
    pub approver_id: Option<Uuid>,
}

impl ExpenseScope {
    pub fn for_role(role: UserRole, user_id: Uuid, company_id: Uuid) -> Self {
        match role {
            UserRole::Admin => ExpenseScope::Company { company_id },
            UserRole::Manager => ExpenseScope::Team {
                company_id,
                manager_id: user_id,
            },
            UserRole::Employee => ExpenseScope::Own {
                company_id,
                user_id,
            },
        }
    }

    pub fn company_id(&self) -> Uuid {
        match self {
            ExpenseScope::Own { company_id, .. }
            | ExpenseScope::Team { company_id, .. }
            | ExpenseScope::Company { company_id } => *company_id,
        }
    }

    /// Whether a user's own record (or activity) is visible.
    pub fn permits_user(&self, company_id: Uuid, user_id: Uuid, manager_id: Option<Uuid>) -> bool {
        if company_id != self.company_id() {
            return false;
        }
        match *self {
            ExpenseScope::Own { user_id: me, .. } => user_id == me,
            ExpenseScope::Team { manager_id: me, .. } => user_id == me || manager_id == Some(me),
            ExpenseScope::Company { .. } => true,
        }
    }

    /// Whether an expense is visible. Managers additionally see expenses
    /// assigned to them for approval.
    pub fn permits(&self, expense: &ExpenseOwnership) -> bool {
        if self.permits_user(expense.company_id, expense.owner_id, expense.owner_manager_id) {
            return true;
        }
        match *self {
            ExpenseScope::Team { company_id, manager_id } => {
                expense.company_id == company_id && expense.approver_id == Some(manager_id)
            }
            _ => false,
        }
    }

    /// Push a boolean SQL condition restricting rows with a
    /// `<alias>.company_id` and a user column to this scope.
    pub fn push_user_filter(
        &self,
        qb: &mut QueryBuilder<'_, Postgres>,
        alias: &'static str,
        user_column: &'static str,
    ) {
        qb.push("(")
            .push(alias)
            .push(".company_id = ")
            .push_bind(self.company_id());

        match *self {
            ExpenseScope::Own { user_id, .. } => {
                qb.push(" AND ")
                    .push(alias)
                    .push(".")
                    .push(user_column)
                    .push(" = ")
                    .push_bind(user_id);
            }
            ExpenseScope::Team {
                company_id,
                manager_id,
            } => {
                qb.push(" AND (")
                    .push(alias)
                    .push(".")
                    .push(user_column)
                    .push(" = ")
                    .push_bind(manager_id)
                    .push(" OR ")
                    .push(alias)
                    .push(".")
                    .push(user_column)
                    .push(" IN (SELECT r.id FROM users r WHERE r.manager_id = ")
                    .push_bind(manager_id)
                    .push(" AND r.company_id = ")
                    .push_bind(company_id)
                    .push("))");
            }
            ExpenseScope::Company { .. } => {}
        }

        qb.push(")");
    }

    /// Push the expense visibility condition for an `expenses` row aliased
    /// as `alias`. Agrees with [`ExpenseScope::permits`]: only the approver
    /// of the latest step counts.
    pub fn push_expense_filter(&self, qb: &mut QueryBuilder<'_, Postgres>, alias: &'static str) {
        match *self {
            ExpenseScope::Team { manager_id, .. } => {
                qb.push("(");
                self.push_user_filter(qb, alias, "employee_id");
                qb.push(" OR (")
                    .push(alias)
                    .push(".company_id = ")
                    .push_bind(self.company_id())
                    .push(" AND (SELECT s.approver_id FROM approval_steps s WHERE s.expense_id = ")
                    .push(alias)
                    .push(".id ")
                    .push(LATEST_STEP_ORDER)
                    .push(") = ")
                    .push_bind(manager_id)
                    .push("))");
            }
            _ => self.push_user_filter(qb, alias, "employee_id"),
        }
    }
}
