//! Persistent records
//!
//! Row structs mirror the tables and keep enum columns as strings; the public
//! models carry the typed domain values. Conversion happens once, at load time.

mod company;
mod expense;
mod user;

pub use company::Company;
pub use expense::{
    ApprovalStep, ApprovalStepRow, DecidedApproval, DecidedApprovalRow, EmployeeSummary, Expense,
    ExpenseFilter, ExpenseRow, EXPENSE_SELECT,
};
pub use user::{NewUser, User, UserRow, UserSummary, USER_COLUMNS};

use crate::domain::DomainError;
use crate::error::{AppError, AppResult};

/// Convert a loaded row into its model. The schema's CHECK constraints keep
/// enum columns valid, so a failure here means the database is out of sync.
pub(crate) fn from_row<R, T>(row: R) -> AppResult<T>
where
    T: TryFrom<R, Error = DomainError>,
{
    T::try_from(row).map_err(|e| AppError::Internal(format!("corrupt row: {}", e)))
}

pub(crate) fn from_rows<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = DomainError>,
{
    rows.into_iter().map(from_row).collect()
}
