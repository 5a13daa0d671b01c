//! Expense lifecycle
//!
//! ```text
//!  DRAFT ──submit──▶ PENDING ──approve──▶ APPROVED
//!                       │
//!                       └────reject────▶ REJECTED
//! ```
//!
//! APPROVED and REJECTED are terminal. An expense can be edited or withdrawn by
//! its owner only while it is not terminal.

use super::DomainError;

string_enum! {
    /// Status of an expense
    pub enum ExpenseStatus {
        Draft => "DRAFT",
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

string_enum! {
    /// Spending category
    pub enum ExpenseCategory {
        Travel => "TRAVEL",
        Food => "FOOD",
        Office => "OFFICE",
        Equipment => "EQUIPMENT",
        Software => "SOFTWARE",
        Other => "OTHER",
    }
}

/// A requested change of expense status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseTransition {
    Submit,
    Approve,
    Reject,
}

impl ExpenseTransition {
    pub fn verb(&self) -> &'static str {
        match self {
            ExpenseTransition::Submit => "submit",
            ExpenseTransition::Approve => "approve",
            ExpenseTransition::Reject => "reject",
        }
    }
}

impl ExpenseStatus {
    /// Initial status of a newly created expense
    pub fn initial(draft: bool) -> Self {
        if draft {
            ExpenseStatus::Draft
        } else {
            ExpenseStatus::Pending
        }
    }

    /// APPROVED and REJECTED never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpenseStatus::Approved | ExpenseStatus::Rejected)
    }

    /// Whether the owner may still edit or delete the expense
    pub fn is_editable(&self) -> bool {
        !self.is_terminal()
    }

    /// Apply a transition, returning the next status.
    pub fn transition(self, transition: ExpenseTransition) -> Result<ExpenseStatus, DomainError> {
        use ExpenseStatus::*;
        use ExpenseTransition::*;

        match (self, transition) {
            (Draft, Submit) => Ok(Pending),
            (Pending, Approve) => Ok(Approved),
            (Pending, Reject) => Ok(Rejected),
            (from, transition) => Err(DomainError::InvalidTransition { from, transition }),
        }
    }

    /// Guard for edits and owner deletes
    pub fn ensure_editable(&self) -> Result<(), DomainError> {
        if self.is_editable() {
            Ok(())
        } else {
            Err(DomainError::NotEditable(*self))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_initial_status() {
        assert_eq!(ExpenseStatus::initial(false), ExpenseStatus::Pending);
        assert_eq!(ExpenseStatus::initial(true), ExpenseStatus::Draft);
    }

    #[test]
    fn test_allowed_transitions() {
        assert_eq!(
            ExpenseStatus::Draft.transition(ExpenseTransition::Submit),
            Ok(ExpenseStatus::Pending)
        );
        assert_eq!(
            ExpenseStatus::Pending.transition(ExpenseTransition::Approve),
            Ok(ExpenseStatus::Approved)
        );
        assert_eq!(
            ExpenseStatus::Pending.transition(ExpenseTransition::Reject),
            Ok(ExpenseStatus::Rejected)
        );
    }

    #[test]
    fn test_every_other_transition_is_rejected() {
        let allowed = [
            (ExpenseStatus::Draft, ExpenseTransition::Submit),
            (ExpenseStatus::Pending, ExpenseTransition::Approve),
            (ExpenseStatus::Pending, ExpenseTransition::Reject),
        ];
        let transitions = [
            ExpenseTransition::Submit,
            ExpenseTransition::Approve,
            ExpenseTransition::Reject,
        ];

        for status in ExpenseStatus::ALL {
            for transition in transitions {
                if allowed.contains(&(*status, transition)) {
                    continue;
                }
                assert_eq!(
                    status.transition(transition),
                    Err(DomainError::InvalidTransition {
                        from: *status,
                        transition
                    }),
                    "{} should not allow {:?}",
                    status,
                    transition
                );
            }
        }
    }

    #[test]
    fn test_drafts_cannot_be_approved_directly() {
        assert!(ExpenseStatus::Draft
            .transition(ExpenseTransition::Approve)
            .is_err());
    }

    #[test]
    fn test_terminal_states_are_not_editable() {
        assert!(ExpenseStatus::Draft.ensure_editable().is_ok());
        assert!(ExpenseStatus::Pending.ensure_editable().is_ok());
        assert_eq!(
            ExpenseStatus::Approved.ensure_editable(),
            Err(DomainError::NotEditable(ExpenseStatus::Approved))
        );
        assert!(ExpenseStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_category_round_trip_through_str() {
        for category in ExpenseCategory::ALL {
            assert_eq!(ExpenseCategory::from_str(category.as_str()).unwrap(), *category);
        }
        assert!(ExpenseCategory::from_str("lunch").is_err());
    }
}
