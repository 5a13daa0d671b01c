//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::expense::{ExpenseStatus, ExpenseTransition};
use super::money::MoneyError;

/// Business rule violations and domain invariant failures.
///
/// These are independent of the web/infrastructure layer; `AppError` maps them
/// onto HTTP status codes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid monetary amount (zero, negative, too precise, too large)
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    /// Malformed currency code
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// No exchange rate is known for the pair
    #[error("No exchange rate available from {from} to {to}")]
    UnsupportedCurrency { from: String, to: String },

    /// A string did not name any variant of a closed enum
    #[error("Invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    /// The expense status does not allow this transition
    #[error("Cannot {} an expense that is {from}", .transition.verb())]
    InvalidTransition {
        from: ExpenseStatus,
        transition: ExpenseTransition,
    },

    /// The expense can no longer be edited
    #[error("Expense is {0} and can no longer be modified")]
    NotEditable(ExpenseStatus),

    /// Approvers may not decide their own expenses
    #[error("You cannot approve or reject your own expense")]
    SelfApproval,

    /// Role or relationship does not allow the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Business rule violation
    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),
}

impl DomainError {
    /// Create an unauthorized error
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    /// Create a business rule violation
    pub fn rule(reason: impl Into<String>) -> Self {
        Self::BusinessRuleViolation(reason.into())
    }

    /// Check if this is a client input error
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_) | Self::InvalidCurrency(_) | Self::InvalidValue { .. }
        )
    }

    /// Check if this is a state conflict (the same request may succeed later)
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. } | Self::NotEditable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let err = DomainError::InvalidTransition {
            from: ExpenseStatus::Approved,
            transition: ExpenseTransition::Reject,
        };

        assert!(err.is_state_error());
        assert!(!err.is_validation_error());
        assert_eq!(err.to_string(), "Cannot reject an expense that is APPROVED");
    }

    #[test]
    fn test_invalid_value_is_validation() {
        let err = DomainError::InvalidValue {
            field: "ExpenseCategory",
            value: "CANDY".to_string(),
        };

        assert!(err.is_validation_error());
        assert!(err.to_string().contains("CANDY"));
    }

    #[test]
    fn test_money_error_converts() {
        let err: DomainError = MoneyError::NotPositive(rust_decimal::Decimal::ZERO).into();
        assert!(err.is_validation_error());
    }
}
