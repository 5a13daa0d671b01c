//! Expense lifecycle handlers: create, edit, submit and delete

use chrono::NaiveDate;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::audit::{ActivityAction, ActivityLogBuilder, ActivityLogService};
use crate::auth::AuthenticatedUser;
use crate::currency::{Conversion, ExchangeRateService};
use crate::domain::{
    CurrencyCode, ExpenseStatus, ExpenseTransition, Money, OperationContext, UserRole,
};
use crate::error::{AppError, AppResult};
use crate::models::{ApprovalStep, Expense};

use super::workflow::{open_approval, PendingExpense};
use super::{CreateExpenseCommand, UpdateExpenseCommand};

/// Load an expense visible to `actor` under a row lock.
/// Invisible and missing expenses look the same.
async fn lock_visible(
    conn: &mut PgConnection,
    actor: &AuthenticatedUser,
    expense_id: Uuid,
) -> AppResult<Expense> {
    let not_found = || AppError::ExpenseNotFound(expense_id.to_string());

    if !Expense::lock(&mut *conn, expense_id).await? {
        return Err(not_found());
    }
    let expense = Expense::find(&mut *conn, expense_id).await?.ok_or_else(not_found)?;

    if !actor.scope().permits(&expense.ownership()) {
        return Err(not_found());
    }
    Ok(expense)
}

fn ensure_owner(expense: &Expense, actor: &AuthenticatedUser, action: &str) -> AppResult<()> {
    if expense.owner_id() != actor.id() {
        return Err(AppError::Forbidden(format!(
            "Only the employee who filed an expense can {} it",
            action
        )));
    }
    Ok(())
}

/// Reload after commit, with approval steps attached.
pub async fn load_with_steps(pool: &PgPool, expense_id: Uuid) -> AppResult<Expense> {
    let mut expense = Expense::find(pool, expense_id)
        .await?
        .ok_or_else(|| AppError::ExpenseNotFound(expense_id.to_string()))?;
    expense.approval_steps = Some(ApprovalStep::list_for_expense(pool, expense_id).await?);
    Ok(expense)
}

async fn convert(
    rates: &ExchangeRateService,
    actor: &AuthenticatedUser,
    amount: rust_decimal::Decimal,
    currency: &str,
) -> AppResult<(CurrencyCode, Conversion)> {
    let money = Money::new(amount)?;
    let from = CurrencyCode::new(currency)?;
    let to = actor.company.currency()?;
    let conversion = rates.convert(money, &from, &to).await?;
    Ok((from, conversion))
}

/// Handler for filing expenses
pub struct CreateExpenseHandler {
    pool: PgPool,
    rates: ExchangeRateService,
}

impl CreateExpenseHandler {
    pub fn new(pool: PgPool, rates: ExchangeRateService) -> Self {
        Self { pool, rates }
    }

    /// Converts into the company currency and, unless drafted, routes the
    /// expense to its approver in the same transaction.
    pub async fn execute(
        &self,
        command: CreateExpenseCommand,
        actor: &AuthenticatedUser,
        context: &OperationContext,
        today: NaiveDate,
    ) -> AppResult<Expense> {
        let command = command.validate(today)?;
        let (currency, conversion) =
            convert(&self.rates, actor, command.amount, &command.original_currency).await?;
        let status = ExpenseStatus::initial(command.draft);
        let expense_id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, company_id, employee_id, amount, original_currency, converted_amount,
                exchange_rate, category, subcategory, description, expense_date, receipt_url,
                tags, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(expense_id)
        .bind(actor.company_id())
        .bind(actor.id())
        .bind(command.amount)
        .bind(currency.as_str())
        .bind(conversion.converted_amount)
        .bind(conversion.exchange_rate)
        .bind(command.category.as_str())
        .bind(&command.subcategory)
        .bind(&command.description)
        .bind(command.expense_date)
        .bind(&command.receipt_url)
        .bind(&command.tags)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;

        if status == ExpenseStatus::Pending {
            open_approval(
                &mut tx,
                &actor.user,
                PendingExpense {
                    id: expense_id,
                    description: &command.description,
                    converted_amount: conversion.converted_amount,
                    currency: &actor.company.currency_code,
                },
            )
            .await?;
        }

        ActivityLogService::log_in_tx(
            &mut tx,
            ActivityLogBuilder::new(ActivityAction::ExpenseCreated, actor.id(), actor.company_id())
                .expense(expense_id)
                .details(&json!({
                    "amount": command.amount,
                    "currency": currency,
                    "converted_amount": conversion.converted_amount,
                    "category": command.category,
                    "status": status,
                })),
            context,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            expense_id = %expense_id,
            employee_id = %actor.id(),
            status = %status,
            "Expense created"
        );

        load_with_steps(&self.pool, expense_id).await
    }
}

/// Handler for editing an undecided expense
pub struct UpdateExpenseHandler {
    pool: PgPool,
    rates: ExchangeRateService,
}

impl UpdateExpenseHandler {
    pub fn new(pool: PgPool, rates: ExchangeRateService) -> Self {
        Self { pool, rates }
    }

    pub async fn execute(
        &self,
        command: UpdateExpenseCommand,
        actor: &AuthenticatedUser,
        context: &OperationContext,
        today: NaiveDate,
    ) -> AppResult<Expense> {
        let command = command.validate(today)?;

        let mut tx = self.pool.begin().await?;
        let expense = lock_visible(&mut tx, actor, command.expense_id).await?;
        ensure_owner(&expense, actor, "edit")?;
        expense.status.ensure_editable()?;

        let (currency, conversion) = if command.changes_money() {
            let amount = command.amount.unwrap_or(expense.amount);
            let currency = command
                .original_currency
                .as_deref()
                .unwrap_or(&expense.original_currency);
            let (currency, conversion) = convert(&self.rates, actor, amount, currency).await?;
            (currency.to_string(), conversion)
        } else {
            (
                expense.original_currency.clone(),
                Conversion {
                    converted_amount: expense.converted_amount,
                    exchange_rate: expense.exchange_rate,
                },
            )
        };

        sqlx::query(
            r#"
            UPDATE expenses SET
                amount = COALESCE($2, amount),
                original_currency = $3,
                converted_amount = $4,
                exchange_rate = $5,
                category = COALESCE($6, category),
                subcategory = COALESCE($7, subcategory),
                description = COALESCE($8, description),
                expense_date = COALESCE($9, expense_date),
                receipt_url = COALESCE($10, receipt_url),
                tags = COALESCE($11, tags),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(expense.id)
        .bind(command.amount)
        .bind(&currency)
        .bind(conversion.converted_amount)
        .bind(conversion.exchange_rate)
        .bind(command.category.map(|c| c.as_str()))
        .bind(&command.subcategory)
        .bind(&command.description)
        .bind(command.expense_date)
        .bind(&command.receipt_url)
        .bind(&command.tags)
        .execute(&mut *tx)
        .await?;

        ActivityLogService::log_in_tx(
            &mut tx,
            ActivityLogBuilder::new(ActivityAction::ExpenseUpdated, actor.id(), actor.company_id())
                .expense(expense.id)
                .details(&json!({ "changes": command })),
            context,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(expense_id = %expense.id, "Expense updated");

        load_with_steps(&self.pool, expense.id).await
    }
}

/// Handler for sending a DRAFT expense for approval
pub struct SubmitExpenseHandler {
    pool: PgPool,
}

impl SubmitExpenseHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn execute(
        &self,
        expense_id: Uuid,
        actor: &AuthenticatedUser,
        context: &OperationContext,
    ) -> AppResult<Expense> {
        let mut tx = self.pool.begin().await?;
        let expense = lock_visible(&mut tx, actor, expense_id).await?;
        ensure_owner(&expense, actor, "submit")?;

        let next = expense.status.transition(ExpenseTransition::Submit)?;

        let updated = sqlx::query(
            "UPDATE expenses SET status = $2, updated_at = NOW() WHERE id = $1 AND status = $3",
        )
        .bind(expense.id)
        .bind(next.as_str())
        .bind(expense.status.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Expense status changed concurrently".to_string(),
            ));
        }

        let approver_id = open_approval(
            &mut tx,
            &actor.user,
            PendingExpense {
                id: expense.id,
                description: &expense.description,
                converted_amount: expense.converted_amount,
                currency: &actor.company.currency_code,
            },
        )
        .await?;

        ActivityLogService::log_in_tx(
            &mut tx,
            ActivityLogBuilder::new(ActivityAction::ExpenseSubmitted, actor.id(), actor.company_id())
                .expense(expense.id)
                .details(&json!({
                    "from": expense.status,
                    "to": next,
                    "approver_id": approver_id,
                })),
            context,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(expense_id = %expense.id, "Expense submitted");

        load_with_steps(&self.pool, expense.id).await
    }
}

/// Handler for deleting expenses
pub struct DeleteExpenseHandler {
    pool: PgPool,
}

impl DeleteExpenseHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Owners may delete while the expense is undecided; admins may delete
    /// any expense of their company.
    pub async fn execute(
        &self,
        expense_id: Uuid,
        actor: &AuthenticatedUser,
        context: &OperationContext,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let expense = lock_visible(&mut tx, actor, expense_id).await?;

        if actor.role() != UserRole::Admin {
            ensure_owner(&expense, actor, "delete")?;
            expense.status.ensure_editable()?;
        }

        // Written first: the expense_id reference is detached by the delete
        ActivityLogService::log_in_tx(
            &mut tx,
            ActivityLogBuilder::new(ActivityAction::ExpenseDeleted, actor.id(), actor.company_id())
                .expense(expense.id)
                .details(&json!({
                    "expense_id": expense.id,
                    "employee_id": expense.owner_id(),
                    "description": expense.description,
                    "amount": expense.amount,
                    "currency": expense.original_currency,
                    "status": expense.status,
                })),
            context,
        )
        .await?;

        sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(expense.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(expense_id = %expense.id, deleted_by = %actor.id(), "Expense deleted");

        Ok(())
    }
}
