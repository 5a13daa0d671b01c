//! Approval decisions
//!
//! A decision runs in one transaction: the expense row is locked, the actor
//! is authorized, the status moves PENDING -> APPROVED/REJECTED, the approval
//! step is closed, the employee is notified and the activity is logged.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{ActivityAction, ActivityLogBuilder, ActivityLogService};
use crate::auth::AuthenticatedUser;
use crate::domain::{authorize_decision, ApprovalDecision, ExpenseStatus, OperationContext, UserRole};
use crate::error::{AppError, AppResult};
use crate::models::Expense;
use crate::notifications::{NewNotification, NotificationService, NotificationType};

use super::expense_handler::load_with_steps;
use super::DecideApprovalCommand;

fn outcome(decision: ApprovalDecision) -> (ActivityAction, NotificationType, &'static str) {
    match decision {
        ApprovalDecision::Approve => (
            ActivityAction::ExpenseApproved,
            NotificationType::ExpenseApproved,
            "approved",
        ),
        ApprovalDecision::Reject => (
            ActivityAction::ExpenseRejected,
            NotificationType::ExpenseRejected,
            "rejected",
        ),
    }
}

/// Handler for approving and rejecting expenses
pub struct DecideApprovalHandler {
    pool: PgPool,
}

impl DecideApprovalHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn execute(
        &self,
        command: DecideApprovalCommand,
        actor: &AuthenticatedUser,
        context: &OperationContext,
    ) -> AppResult<Expense> {
        actor.require_role(&[UserRole::Admin, UserRole::Manager])?;
        let command = command.validate()?;
        let expense_id = command.expense_id;
        let not_found = || AppError::ExpenseNotFound(expense_id.to_string());

        let mut tx = self.pool.begin().await?;

        if !Expense::lock(&mut *tx, expense_id).await? {
            return Err(not_found());
        }
        let expense = Expense::find(&mut *tx, expense_id).await?.ok_or_else(not_found)?;

        // Other tenants' expenses do not exist for this caller
        if expense.company_id != actor.company_id() {
            return Err(not_found());
        }

        authorize_decision(
            actor.id(),
            actor.role(),
            actor.company_id(),
            &expense.ownership(),
        )?;

        let next = expense.status.transition(command.decision.transition())?;

        let updated = sqlx::query(
            "UPDATE expenses SET status = $2, updated_at = NOW() WHERE id = $1 AND status = $3",
        )
        .bind(expense.id)
        .bind(next.as_str())
        .bind(ExpenseStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Expense was decided by someone else".to_string(),
            ));
        }

        let step_status = command.decision.step_status();
        let closed = sqlx::query(
            r#"
            UPDATE approval_steps
            SET status = $2, approver_id = $3, comments = $4, decided_at = NOW()
            WHERE id = (
                SELECT id FROM approval_steps
                WHERE expense_id = $1 AND status = 'PENDING'
                ORDER BY step_order DESC
                LIMIT 1
            )
            "#,
        )
        .bind(expense.id)
        .bind(step_status.as_str())
        .bind(actor.id())
        .bind(&command.comments)
        .execute(&mut *tx)
        .await?;

        if closed.rows_affected() == 0 {
            sqlx::query(
                r#"
                INSERT INTO approval_steps (id, expense_id, approver_id, step_order, status, comments, decided_at)
                VALUES (
                    $1, $2, $3,
                    (SELECT COALESCE(MAX(step_order), 0) + 1 FROM approval_steps WHERE expense_id = $2),
                    $4, $5, NOW()
                )
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(expense.id)
            .bind(actor.id())
            .bind(step_status.as_str())
            .bind(&command.comments)
            .execute(&mut *tx)
            .await?;
        }

        let (action, kind, verb) = outcome(command.decision);
        let approver_name = actor.user.full_name();

        NotificationService::create_in_tx(
            &mut tx,
            NewNotification {
                user_id: expense.owner_id(),
                company_id: expense.company_id,
                kind,
                title: format!("Expense {}", verb),
                message: match &command.comments {
                    Some(comments) => format!(
                        "{} {} \"{}\": {}",
                        approver_name, verb, expense.description, comments
                    ),
                    None => format!("{} {} \"{}\"", approver_name, verb, expense.description),
                },
                data: json!({
                    "expense_id": expense.id,
                    "approver_id": actor.id(),
                    "status": next,
                    "comments": command.comments,
                }),
            },
        )
        .await?;

        ActivityLogService::log_in_tx(
            &mut tx,
            ActivityLogBuilder::new(action, actor.id(), actor.company_id())
                .expense(expense.id)
                .details(&json!({
                    "employee_id": expense.owner_id(),
                    "amount": expense.converted_amount,
                    "comments": command.comments,
                })),
            context,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            expense_id = %expense.id,
            approver_id = %actor.id(),
            status = %next,
            correlation_id = ?context.correlation_id,
            "Expense decided"
        );

        load_with_steps(&self.pool, expense.id).await
    }
}
