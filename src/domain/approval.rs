//! Approval decisions and who may make them

use uuid::Uuid;

use super::expense::{ExpenseStatus, ExpenseTransition};
use super::scope::ExpenseOwnership;
use super::{DomainError, UserRole};

string_enum! {
    /// Status of a single approval step
    pub enum ApprovalStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

string_enum! {
    /// What an approver decided
    pub enum ApprovalDecision {
        Approve => "APPROVE",
        Reject => "REJECT",
    }
}

impl ApprovalDecision {
    pub fn transition(&self) -> ExpenseTransition {
        match self {
            ApprovalDecision::Approve => ExpenseTransition::Approve,
            ApprovalDecision::Reject => ExpenseTransition::Reject,
        }
    }

    /// Status the approval step is closed with
    pub fn step_status(&self) -> ApprovalStatus {
        match self {
            ApprovalDecision::Approve => ApprovalStatus::Approved,
            ApprovalDecision::Reject => ApprovalStatus::Rejected,
        }
    }

    /// Status of the expense once this decision applies to a pending expense
    pub fn expense_status(&self) -> ExpenseStatus {
        match self {
            ApprovalDecision::Approve => ExpenseStatus::Approved,
            ApprovalDecision::Reject => ExpenseStatus::Rejected,
        }
    }
}

/// Check that `actor` may approve or reject the expense described by `ownership`.
///
/// Admins may decide any expense of their company. Managers may decide
/// expenses of their direct reports and expenses assigned to them. Nobody
/// may decide their own expense.
pub fn authorize_decision(
    actor_id: Uuid,
    actor_role: UserRole,
    actor_company_id: Uuid,
    ownership: &ExpenseOwnership,
) -> Result<(), DomainError> {
    if !actor_role.can_approve() {
        return Err(DomainError::unauthorized(
            "only managers and admins can approve expenses",
        ));
    }

    if ownership.company_id != actor_company_id {
        return Err(DomainError::unauthorized("expense belongs to another company"));
    }

    if ownership.owner_id == actor_id {
        return Err(DomainError::SelfApproval);
    }

    match actor_role {
        UserRole::Admin => Ok(()),
        _ if ownership.owner_manager_id == Some(actor_id)
            || ownership.approver_id == Some(actor_id) =>
        {
            Ok(())
        }
        _ => Err(DomainError::unauthorized(
            "you can only decide expenses of your direct reports",
        )),
    }
}
