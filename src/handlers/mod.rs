//! Command Handlers module
//!
//! Handlers orchestrate the state-changing operations. Each one validates its
//! command, checks the caller's rights and applies the change together with
//! its notifications and activity log entries in a single transaction.

mod approval_handler;
mod auth_handler;
mod commands;
mod expense_handler;
mod user_handler;
mod workflow;


pub use approval_handler::DecideApprovalHandler;
pub use auth_handler::{LoginHandler, RegisterHandler, DEFAULT_COUNTRY, DEFAULT_CURRENCY};
pub use commands::*;
pub use expense_handler::{
    load_with_steps, CreateExpenseHandler, DeleteExpenseHandler, SubmitExpenseHandler,
    UpdateExpenseHandler,
};
pub use user_handler::{CreateUserHandler, UpdateUserHandler};
