//! Command definitions
//!
//! Commands carry a caller's intent into a handler. `validate` trims and
//! checks the free-form fields before any database work starts.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{ApprovalDecision, ExpenseCategory, UserRole};
use crate::error::{AppError, AppResult};
use crate::models::{Company, User};

const MAX_NAME_LEN: usize = 100;
const MAX_COMPANY_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_COMMENTS_LEN: usize = 1000;
const MAX_TAGS: usize = 10;
const MAX_TAG_LEN: usize = 50;

/// Trimmed non-empty text no longer than `max` characters.
fn required(field: &str, value: &str, max: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidRequest(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(AppError::InvalidRequest(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// Like [`required`], but blank input becomes `None`.
fn optional(field: &str, value: Option<String>, max: usize) -> AppResult<Option<String>> {
    match value {
        Some(v) if !v.trim().is_empty() => required(field, &v, max).map(Some),
        _ => Ok(None),
    }
}

fn email(value: &str) -> AppResult<String> {
    let value = value.trim().to_lowercase();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || value.len() > 255 {
        return Err(AppError::InvalidRequest("A valid email is required".to_string()));
    }
    Ok(value)
}

fn tags(tags: Vec<String>) -> AppResult<Vec<String>> {
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.len() > MAX_TAGS {
        return Err(AppError::InvalidRequest(format!("At most {} tags are allowed", MAX_TAGS)));
    }
    if tags.iter().any(|t| t.chars().count() > MAX_TAG_LEN) {
        return Err(AppError::InvalidRequest(format!(
            "Tags must be at most {} characters",
            MAX_TAG_LEN
        )));
    }
    Ok(tags)
}

fn expense_date(date: NaiveDate, today: NaiveDate) -> AppResult<NaiveDate> {
    if date > today {
        return Err(AppError::InvalidRequest(
            "expense_date cannot be in the future".to_string(),
        ));
    }
    Ok(date)
}

/// Command to register a new company and its first administrator
#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub currency_code: Option<String>,
    pub country: Option<String>,
}

impl RegisterCommand {
    pub fn validate(self) -> AppResult<Self> {
        Ok(Self {
            email: email(&self.email)?,
            first_name: required("first_name", &self.first_name, MAX_NAME_LEN)?,
            last_name: required("last_name", &self.last_name, MAX_NAME_LEN)?,
            company_name: required("company_name", &self.company_name, MAX_COMPANY_NAME_LEN)?,
            currency_code: optional("currency_code", self.currency_code, 3)?,
            country: optional("country", self.country, MAX_NAME_LEN)?,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

/// Result of a successful login or registration
#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    pub user: User,
    pub company: Company,
    pub token: String,
}

/// Command to add a user to the caller's company
#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub manager_id: Option<Uuid>,
}

impl CreateUserCommand {
    pub fn validate(self) -> AppResult<Self> {
        Ok(Self {
            email: email(&self.email)?,
            first_name: required("first_name", &self.first_name, MAX_NAME_LEN)?,
            last_name: required("last_name", &self.last_name, MAX_NAME_LEN)?,
            ..self
        })
    }
}

/// Command to change a user. `None` leaves a field unchanged;
/// `manager_id: Some(None)` clears the manager.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateUserCommand {
    #[serde(skip)]
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<Option<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateUserCommand {
    pub fn validate(self) -> AppResult<Self> {
        Ok(Self {
            first_name: self
                .first_name
                .map(|v| required("first_name", &v, MAX_NAME_LEN))
                .transpose()?,
            last_name: self
                .last_name
                .map(|v| required("last_name", &v, MAX_NAME_LEN))
                .transpose()?,
            ..self
        })
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.role.is_none()
            && self.manager_id.is_none()
            && self.is_active.is_none()
    }
}

/// Command to file a new expense
#[derive(Debug, Clone)]
pub struct CreateExpenseCommand {
    pub amount: Decimal,
    pub original_currency: String,
    pub category: ExpenseCategory,
    pub subcategory: Option<String>,
    pub description: String,
    pub expense_date: NaiveDate,
    pub receipt_url: Option<String>,
    pub tags: Vec<String>,
    pub draft: bool,
}

impl CreateExpenseCommand {
    pub fn validate(self, today: NaiveDate) -> AppResult<Self> {
        Ok(Self {
            subcategory: optional("subcategory", self.subcategory, MAX_NAME_LEN)?,
            description: required("description", &self.description, MAX_DESCRIPTION_LEN)?,
            expense_date: expense_date(self.expense_date, today)?,
            receipt_url: optional("receipt_url", self.receipt_url, 2048)?,
            tags: tags(self.tags)?,
            ..self
        })
    }
}

/// Command to edit an expense that has not been decided yet
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateExpenseCommand {
    #[serde(skip)]
    pub expense_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ExpenseCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl UpdateExpenseCommand {
    pub fn validate(self, today: NaiveDate) -> AppResult<Self> {
        Ok(Self {
            subcategory: optional("subcategory", self.subcategory, MAX_NAME_LEN)?,
            description: self
                .description
                .map(|v| required("description", &v, MAX_DESCRIPTION_LEN))
                .transpose()?,
            expense_date: self
                .expense_date
                .map(|d| expense_date(d, today))
                .transpose()?,
            receipt_url: optional("receipt_url", self.receipt_url, 2048)?,
            tags: self.tags.map(tags).transpose()?,
            ..self
        })
    }

    /// Whether the converted amount has to be recomputed
    pub fn changes_money(&self) -> bool {
        self.amount.is_some() || self.original_currency.is_some()
    }
}

/// Command to approve or reject a PENDING expense
#[derive(Debug, Clone)]
pub struct DecideApprovalCommand {
    pub expense_id: Uuid,
    pub decision: ApprovalDecision,
    pub comments: Option<String>,
}

impl DecideApprovalCommand {
    pub fn new(expense_id: Uuid, decision: ApprovalDecision) -> Self {
        Self {
            expense_id,
            decision,
            comments: None,
        }
    }

    pub fn with_comments(mut self, comments: Option<String>) -> Self {
        self.comments = comments;
        self
    }

    /// A rejection must say why.
    pub fn validate(self) -> AppResult<Self> {
        let comments = optional("comments", self.comments, MAX_COMMENTS_LEN)?;
        if self.decision == ApprovalDecision::Reject && comments.is_none() {
            return Err(AppError::InvalidRequest(
                "Comments are required when rejecting an expense".to_string(),
            ));
        }
        Ok(Self { comments, ..self })
    }
}
