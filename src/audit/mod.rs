//! Activity Log Service
//!
//! Records who did what to which expense. Entries tied to a state change are
//! written inside that change's transaction; incidental entries (logins) are
//! best-effort and never fail the request.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::{string_enum, DomainError, ExpenseScope, OperationContext, UserRole};
use crate::error::AppError;
use crate::models::from_rows;

string_enum! {
    /// Activity log action types
    pub enum ActivityAction {
        Login => "LOGIN",
        UserCreated => "USER_CREATED",
        UserUpdated => "USER_UPDATED",
        ExpenseCreated => "EXPENSE_CREATED",
        ExpenseUpdated => "EXPENSE_UPDATED",
        ExpenseSubmitted => "EXPENSE_SUBMITTED",
        ExpenseDeleted => "EXPENSE_DELETED",
        ExpenseApproved => "EXPENSE_APPROVED",
        ExpenseRejected => "EXPENSE_REJECTED",
    }
}

/// Builder for creating activity log entries
#[derive(Debug, Clone)]
pub struct ActivityLogBuilder {
    action: ActivityAction,
    user_id: Uuid,
    company_id: Uuid,
    expense_id: Option<Uuid>,
    details: Option<serde_json::Value>,
}

impl ActivityLogBuilder {
    pub fn new(action: ActivityAction, user_id: Uuid, company_id: Uuid) -> Self {
        Self {
            action,
            user_id,
            company_id,
            expense_id: None,
            details: None,
        }
    }

    pub fn expense(mut self, expense_id: Uuid) -> Self {
        self.expense_id = Some(expense_id);
        self
    }

    pub fn details<T: Serialize>(mut self, details: &T) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }
}

/// Optional filters for the history listing
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub user_id: Option<Uuid>,
    pub expense_id: Option<Uuid>,
    pub action: Option<ActivityAction>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ActivityEntryRow {
    pub id: Uuid,
    pub action: String,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub user_first_name: String,
    pub user_last_name: String,
    pub user_email: String,
    pub user_role: String,
    pub expense_id: Option<Uuid>,
    pub expense_description: Option<String>,
    pub expense_amount: Option<Decimal>,
    pub expense_currency: Option<String>,
    pub expense_status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityExpense {
    pub id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub original_currency: String,
    pub status: String,
}

/// Activity log entry as returned by the history listing
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub action: ActivityAction,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user: ActivityUser,
    pub expense: Option<ActivityExpense>,
}

impl TryFrom<ActivityEntryRow> for ActivityEntry {
    type Error = DomainError;

    fn try_from(row: ActivityEntryRow) -> Result<Self, Self::Error> {
        let expense = match (
            row.expense_id,
            row.expense_description,
            row.expense_amount,
            row.expense_currency,
            row.expense_status,
        ) {
            (Some(id), Some(description), Some(amount), Some(original_currency), Some(status)) => {
                Some(ActivityExpense {
                    id,
                    description,
                    amount,
                    original_currency,
                    status,
                })
            }
            _ => None,
        };

        Ok(Self {
            id: row.id,
            action: row.action.parse()?,
            details: row.details,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
            user: ActivityUser {
                id: row.user_id,
                first_name: row.user_first_name,
                last_name: row.user_last_name,
                email: row.user_email,
                role: row.user_role.parse()?,
            },
            expense,
        })
    }
}

/// Activity log errors
#[derive(Debug, thiserror::Error)]
pub enum ActivityLogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ActivityLogError> for AppError {
    fn from(err: ActivityLogError) -> Self {
        match err {
            ActivityLogError::Database(e) => AppError::Database(e),
        }
    }
}

/// Activity Log Service
#[derive(Debug, Clone)]
pub struct ActivityLogService {
    pool: PgPool,
}

impl ActivityLogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write an entry as part of an open transaction.
    pub async fn log_in_tx(
        conn: &mut PgConnection,
        builder: ActivityLogBuilder,
        context: &OperationContext,
    ) -> Result<Uuid, ActivityLogError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO activity_logs (
                id, user_id, company_id, expense_id, action, details, ip_address, user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(builder.user_id)
        .bind(builder.company_id)
        .bind(builder.expense_id)
        .bind(builder.action.as_str())
        .bind(&builder.details)
        .bind(&context.client_ip)
        .bind(&context.user_agent)
        .execute(&mut *conn)
        .await?;

        tracing::debug!(
            activity_id = %id,
            action = %builder.action,
            correlation_id = ?context.correlation_id,
            "Activity log entry created"
        );

        Ok(id)
    }

    /// Best-effort write outside any transaction. Failures are logged only.
    pub async fn log(&self, builder: ActivityLogBuilder, context: &OperationContext) -> Option<Uuid> {
        let action = builder.action;
        let result = match self.pool.acquire().await {
            Ok(mut conn) => Self::log_in_tx(&mut *conn, builder, context).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, action = %action, "Failed to write activity log");
                None
            }
        }
    }

    /// Entries visible under `scope`, newest first, with the total count.
    pub async fn history(
        &self,
        scope: ExpenseScope,
        filter: &ActivityFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ActivityEntry>, i64), AppError> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT l.id, l.action, l.details, l.ip_address, l.user_agent, l.created_at,
                   u.id AS user_id, u.first_name AS user_first_name,
                   u.last_name AS user_last_name, u.email AS user_email, u.role AS user_role,
                   x.id AS expense_id, x.description AS expense_description,
                   x.amount AS expense_amount, x.original_currency AS expense_currency,
                   x.status AS expense_status
            FROM activity_logs l
            JOIN users u ON u.id = l.user_id
            LEFT JOIN expenses x ON x.id = l.expense_id
            WHERE "#,
        );
        push_conditions(&mut query, scope, filter);
        query
            .push(" ORDER BY l.created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = query
            .build_query_as::<ActivityEntryRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM activity_logs l WHERE ");
        push_conditions(&mut count, scope, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        Ok((from_rows(rows)?, total))
    }

    /// Number of entries per action over the last `days` days.
    pub async fn stats(
        &self,
        company_id: Uuid,
        days: i32,
    ) -> Result<BTreeMap<String, i64>, ActivityLogError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT action, COUNT(*)
            FROM activity_logs
            WHERE company_id = $1 AND created_at >= NOW() - make_interval(days => $2)
            GROUP BY action
            "#,
        )
        .bind(company_id)
        .bind(days)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}

fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, scope: ExpenseScope, filter: &ActivityFilter) {
    scope.push_user_filter(qb, "l", "user_id");

    if let Some(user_id) = filter.user_id {
        qb.push(" AND l.user_id = ").push_bind(user_id);
    }
    if let Some(expense_id) = filter.expense_id {
        qb.push(" AND l.expense_id = ").push_bind(expense_id);
    }
    if let Some(action) = filter.action {
        qb.push(" AND l.action = ").push_bind(action.as_str());
    }
}
