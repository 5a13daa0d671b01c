//! Routing of PENDING expenses to an approver

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::UserRole;
use crate::error::AppResult;
use crate::models::User;
use crate::notifications::{NewNotification, NotificationService, NotificationType};

/// What the approver is told about the expense
#[derive(Debug, Clone)]
pub(crate) struct PendingExpense<'a> {
    pub id: Uuid,
    pub description: &'a str,
    pub converted_amount: Decimal,
    pub currency: &'a str,
}

/// The company's first active manager by account age. The submitter is
/// skipped since nobody may decide their own expense.
pub(crate) async fn find_approver(conn: &mut PgConnection, employee: &User) -> AppResult<Option<Uuid>> {
    let approver: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM users
        WHERE company_id = $1 AND is_active = TRUE AND role = $2 AND id <> $3
        ORDER BY created_at ASC, id ASC
        LIMIT 1
        "#,
    )
    .bind(employee.company_id)
    .bind(UserRole::Manager.as_str())
    .bind(employee.id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(approver)
}

/// Open the approval step for a freshly PENDING expense and tell the
/// approver. Without an approver the company admins are told instead.
/// Returns the assigned approver.
pub(crate) async fn open_approval(
    conn: &mut PgConnection,
    employee: &User,
    expense: PendingExpense<'_>,
) -> AppResult<Option<Uuid>> {
    let data = json!({
        "expense_id": expense.id,
        "employee_id": employee.id,
        "amount": expense.converted_amount,
        "currency": expense.currency,
    });

    let Some(approver_id) = find_approver(&mut *conn, employee).await? else {
        tracing::warn!(
            expense_id = %expense.id,
            company_id = %employee.company_id,
            "No active approver found, notifying admins"
        );
        notify_admins(&mut *conn, employee, &expense, data).await?;
        return Ok(None);
    };

    sqlx::query(
        r#"
        INSERT INTO approval_steps (id, expense_id, approver_id, step_order, status)
        VALUES (
            $1, $2, $3,
            (SELECT COALESCE(MAX(step_order), 0) + 1 FROM approval_steps WHERE expense_id = $2),
            'PENDING'
        )
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(expense.id)
    .bind(approver_id)
    .execute(&mut *conn)
    .await?;

    NotificationService::create_in_tx(
        &mut *conn,
        NewNotification {
            user_id: approver_id,
            company_id: employee.company_id,
            kind: NotificationType::ApprovalRequired,
            title: "Expense approval required".to_string(),
            message: format!(
                "{} submitted \"{}\" for {} {}",
                employee.full_name(),
                expense.description,
                expense.converted_amount,
                expense.currency
            ),
            data,
        },
    )
    .await?;

    tracing::info!(
        expense_id = %expense.id,
        approver_id = %approver_id,
        "Expense routed for approval"
    );

    Ok(Some(approver_id))
}

async fn notify_admins(
    conn: &mut PgConnection,
    employee: &User,
    expense: &PendingExpense<'_>,
    data: serde_json::Value,
) -> AppResult<()> {
    let admins: Vec<Uuid> = sqlx::query_scalar(
        "SELECT id FROM users WHERE company_id = $1 AND role = $2 AND is_active = TRUE AND id <> $3",
    )
    .bind(employee.company_id)
    .bind(UserRole::Admin.as_str())
    .bind(employee.id)
    .fetch_all(&mut *conn)
    .await?;

    for admin_id in admins {
        NotificationService::create_in_tx(
            &mut *conn,
            NewNotification {
                user_id: admin_id,
                company_id: employee.company_id,
                kind: NotificationType::ExpenseSubmitted,
                title: "Expense submitted".to_string(),
                message: format!(
                    "{} submitted \"{}\" for {} {}",
                    employee.full_name(),
                    expense.description,
                    expense.converted_amount,
                    expense.currency
                ),
                data: data.clone(),
            },
        )
        .await?;
    }

    Ok(())
}
