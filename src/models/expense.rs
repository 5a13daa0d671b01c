use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::{
    ApprovalStatus, DomainError, ExpenseCategory, ExpenseOwnership, ExpenseScope, ExpenseStatus,
};
use crate::error::AppResult;

use super::{from_row, from_rows};

/// Expense columns joined with the owning employee and the most recent
/// approver. Callers append `WHERE` clauses against the `e` alias.
pub const EXPENSE_SELECT: &str = r#"
    SELECT
        e.id, e.company_id, e.employee_id, e.amount, e.original_currency,
        e.converted_amount, e.exchange_rate, e.category, e.subcategory,
        e.description, e.expense_date, e.receipt_url, e.tags, e.status,
        e.created_at, e.updated_at,
        u.first_name AS employee_first_name,
        u.last_name AS employee_last_name,
        u.email AS employee_email,
        u.manager_id AS employee_manager_id,
        (
            SELECT s.approver_id FROM approval_steps s
            WHERE s.expense_id = e.id
            ORDER BY s.step_order DESC, s.created_at DESC LIMIT 1
        ) AS approver_id
    FROM expenses e
    JOIN users u ON u.id = e.employee_id
"#;

#[derive(Debug, Clone, FromRow)]
pub struct ExpenseRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub amount: Decimal,
    pub original_currency: String,
    pub converted_amount: Decimal,
    pub exchange_rate: Decimal,
    pub category: String,
    pub subcategory: Option<String>,
    pub description: String,
    pub expense_date: NaiveDate,
    pub receipt_url: Option<String>,
    pub tags: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub employee_first_name: String,
    pub employee_last_name: String,
    pub employee_email: String,
    pub employee_manager_id: Option<Uuid>,
    pub approver_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Expense {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee: EmployeeSummary,
    pub amount: Decimal,
    pub original_currency: String,
    pub converted_amount: Decimal,
    pub exchange_rate: Decimal,
    pub category: ExpenseCategory,
    pub subcategory: Option<String>,
    pub description: String,
    pub expense_date: NaiveDate,
    pub receipt_url: Option<String>,
    pub tags: Vec<String>,
    pub status: ExpenseStatus,
    pub approver_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_steps: Option<Vec<ApprovalStep>>,
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = DomainError;

    fn try_from(row: ExpenseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            company_id: row.company_id,
            employee: EmployeeSummary {
                id: row.employee_id,
                first_name: row.employee_first_name,
                last_name: row.employee_last_name,
                email: row.employee_email,
                manager_id: row.employee_manager_id,
            },
            amount: row.amount,
            original_currency: row.original_currency,
            converted_amount: row.converted_amount,
            exchange_rate: row.exchange_rate,
            category: row.category.parse()?,
            subcategory: row.subcategory,
            description: row.description,
            expense_date: row.expense_date,
            receipt_url: row.receipt_url,
            tags: row.tags,
            status: row.status.parse()?,
            approver_id: row.approver_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            approval_steps: None,
        })
    }
}

impl Expense {
    pub fn owner_id(&self) -> Uuid {
        self.employee.id
    }

    pub fn ownership(&self) -> ExpenseOwnership {
        ExpenseOwnership {
            company_id: self.company_id,
            owner_id: self.employee.id,
            owner_manager_id: self.employee.manager_id,
            approver_id: self.approver_id,
        }
    }

    pub async fn find<'e, E>(executor: E, id: Uuid) -> AppResult<Option<Expense>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("{} WHERE e.id = $1", EXPENSE_SELECT);
        let row: Option<ExpenseRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        row.map(from_row).transpose()
    }

    /// Take a row lock on the expense for the rest of the transaction.
    /// Returns false when the expense does not exist.
    pub async fn lock<'e, E>(executor: E, id: Uuid) -> AppResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM expenses WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(locked.is_some())
    }

    /// One page of the expenses visible under `scope`, newest expense date
    /// first, with the total number of matches.
    pub async fn list(
        pool: &PgPool,
        scope: ExpenseScope,
        filter: &ExpenseFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Expense>, i64)> {
        let mut query = QueryBuilder::<Postgres>::new(EXPENSE_SELECT);
        query.push(" WHERE ");
        scope.push_expense_filter(&mut query, "e");
        filter.push_conditions(&mut query);
        query
            .push(" ORDER BY e.expense_date DESC, e.created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = query.build_query_as::<ExpenseRow>().fetch_all(pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM expenses e WHERE ");
        scope.push_expense_filter(&mut count, "e");
        filter.push_conditions(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        Ok((from_rows(rows)?, total))
    }

    /// PENDING expenses `approver_id` may decide under `scope`, oldest first.
    /// The approver's own expenses are never included.
    pub async fn pending_for(
        pool: &PgPool,
        scope: ExpenseScope,
        approver_id: Uuid,
    ) -> AppResult<Vec<Expense>> {
        let mut query = QueryBuilder::<Postgres>::new(EXPENSE_SELECT);
        query.push(" WHERE ");
        scope.push_expense_filter(&mut query, "e");
        query
            .push(" AND e.status = ")
            .push_bind(ExpenseStatus::Pending.as_str())
            .push(" AND e.employee_id <> ")
            .push_bind(approver_id)
            .push(" ORDER BY e.created_at ASC");

        let rows = query.build_query_as::<ExpenseRow>().fetch_all(pool).await?;
        from_rows(rows)
    }
}

/// Optional filters for the expense listing
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub status: Option<ExpenseStatus>,
    pub category: Option<ExpenseCategory>,
    pub employee_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
}

impl ExpenseFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND e.status = ").push_bind(status.as_str());
        }
        if let Some(category) = self.category {
            qb.push(" AND e.category = ").push_bind(category.as_str());
        }
        if let Some(employee_id) = self.employee_id {
            qb.push(" AND e.employee_id = ").push_bind(employee_id);
        }
        if let Some(from) = self.date_from {
            qb.push(" AND e.expense_date >= ").push_bind(from);
        }
        if let Some(to) = self.date_to {
            qb.push(" AND e.expense_date <= ").push_bind(to);
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND e.description ILIKE ")
                .push_bind(format!("%{}%", escape_like(search)));
        }
    }
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone, FromRow)]
pub struct ApprovalStepRow {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub approver_id: Uuid,
    pub step_order: i32,
    pub status: String,
    pub comments: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub approver_first_name: String,
    pub approver_last_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalStep {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub approver_id: Uuid,
    pub approver_name: String,
    pub step_order: i32,
    pub status: ApprovalStatus,
    pub comments: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ApprovalStepRow> for ApprovalStep {
    type Error = DomainError;

    fn try_from(row: ApprovalStepRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            expense_id: row.expense_id,
            approver_id: row.approver_id,
            approver_name: format!("{} {}", row.approver_first_name, row.approver_last_name),
            step_order: row.step_order,
            status: row.status.parse()?,
            comments: row.comments,
            decided_at: row.decided_at,
            created_at: row.created_at,
        })
    }
}

impl ApprovalStep {
    pub async fn list_for_expense<'e, E>(executor: E, expense_id: Uuid) -> AppResult<Vec<ApprovalStep>>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<ApprovalStepRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.expense_id, s.approver_id, s.step_order, s.status, s.comments,
                   s.decided_at, s.created_at,
                   a.first_name AS approver_first_name, a.last_name AS approver_last_name
            FROM approval_steps s
            JOIN users a ON a.id = s.approver_id
            WHERE s.expense_id = $1
            ORDER BY s.step_order, s.created_at
            "#,
        )
        .bind(expense_id)
        .fetch_all(executor)
        .await?;

        from_rows(rows)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DecidedApprovalRow {
    #[sqlx(flatten)]
    pub step: ApprovalStepRow,
    pub description: String,
    pub amount: Decimal,
    pub original_currency: String,
    pub converted_amount: Decimal,
    pub category: String,
    pub employee_id: Uuid,
    pub employee_first_name: String,
    pub employee_last_name: String,
}

/// A decided approval step together with the expense it decided
#[derive(Debug, Clone, Serialize)]
pub struct DecidedApproval {
    #[serde(flatten)]
    pub step: ApprovalStep,
    pub description: String,
    pub amount: Decimal,
    pub original_currency: String,
    pub converted_amount: Decimal,
    pub category: ExpenseCategory,
    pub employee_id: Uuid,
    pub employee_name: String,
}

impl TryFrom<DecidedApprovalRow> for DecidedApproval {
    type Error = DomainError;

    fn try_from(row: DecidedApprovalRow) -> Result<Self, Self::Error> {
        Ok(Self {
            step: ApprovalStep::try_from(row.step)?,
            description: row.description,
            amount: row.amount,
            original_currency: row.original_currency,
            converted_amount: row.converted_amount,
            category: row.category.parse()?,
            employee_id: row.employee_id,
            employee_name: format!("{} {}", row.employee_first_name, row.employee_last_name),
        })
    }
}

impl DecidedApproval {
    /// Decided steps in `company_id`, most recent decision first. With
    /// `decided_by` only that approver's decisions are returned.
    pub async fn history(
        pool: &PgPool,
        company_id: Uuid,
        decided_by: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<DecidedApproval>, i64)> {
        let rows: Vec<DecidedApprovalRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.expense_id, s.approver_id, s.step_order, s.status, s.comments,
                   s.decided_at, s.created_at,
                   a.first_name AS approver_first_name, a.last_name AS approver_last_name,
                   e.description, e.amount, e.original_currency, e.converted_amount, e.category,
                   u.id AS employee_id, u.first_name AS employee_first_name,
                   u.last_name AS employee_last_name
            FROM approval_steps s
            JOIN users a ON a.id = s.approver_id
            JOIN expenses e ON e.id = s.expense_id
            JOIN users u ON u.id = e.employee_id
            WHERE s.status <> 'PENDING'
              AND e.company_id = $1
              AND ($2::uuid IS NULL OR s.approver_id = $2)
            ORDER BY s.decided_at DESC NULLS LAST, s.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(company_id)
        .bind(decided_by)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM approval_steps s
            JOIN expenses e ON e.id = s.expense_id
            WHERE s.status <> 'PENDING'
              AND e.company_id = $1
              AND ($2::uuid IS NULL OR s.approver_id = $2)
            "#,
        )
        .bind(company_id)
        .bind(decided_by)
        .fetch_one(pool)
        .await?;

        Ok((from_rows(rows)?, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(status: &str) -> ExpenseRow {
        let now = Utc::now();
        ExpenseRow {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            amount: dec!(120.00),
            original_currency: "USD".to_string(),
            converted_amount: dec!(10020.00),
            exchange_rate: dec!(83.50000000),
            category: "TRAVEL".to_string(),
            subcategory: Some("Taxi".to_string()),
            description: "Airport taxi".to_string(),
            expense_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            receipt_url: None,
            tags: vec!["client-visit".to_string()],
            status: status.to_string(),
            created_at: now,
            updated_at: now,
            employee_first_name: "Rahul".to_string(),
            employee_last_name: "Verma".to_string(),
            employee_email: "rahul@techcorp.in".to_string(),
            employee_manager_id: Some(Uuid::new_v4()),
            approver_id: None,
        }
    }

    #[test]
    fn test_row_converts_to_typed_expense() {
        let row = row("PENDING");
        let manager = row.employee_manager_id;
        let expense = Expense::try_from(row).unwrap();

        assert_eq!(expense.status, ExpenseStatus::Pending);
        assert_eq!(expense.category, ExpenseCategory::Travel);
        assert_eq!(expense.ownership().owner_manager_id, manager);
        assert_eq!(expense.ownership().owner_id, expense.owner_id());
    }

    #[test]
    fn test_row_with_unknown_status_fails() {
        assert!(Expense::try_from(row("ARCHIVED")).is_err());
    }

    #[test]
    fn test_steps_are_omitted_until_loaded() {
        let expense = Expense::try_from(row("DRAFT")).unwrap();
        let json = serde_json::to_value(&expense).unwrap();

        assert!(json.get("approval_steps").is_none());
        assert_eq!(json["status"], "DRAFT");
        assert_eq!(json["employee"]["first_name"], "Rahul");
    }

    #[test]
    fn test_filter_conditions_are_bound() {
        use sqlx::Execute;

        let filter = ExpenseFilter {
            status: Some(ExpenseStatus::Pending),
            category: Some(ExpenseCategory::Food),
            search: Some("  lunch ".to_string()),
            ..Default::default()
        };

        let mut qb = QueryBuilder::<Postgres>::new("TRUE");
        filter.push_conditions(&mut qb);

        assert_eq!(
            qb.build().sql(),
            "TRUE AND e.status = $1 AND e.category = $2 AND e.description ILIKE $3"
        );
    }

    #[test]
    fn test_blank_search_is_ignored() {
        use sqlx::Execute;

        let filter = ExpenseFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("TRUE");
        filter.push_conditions(&mut qb);

        assert_eq!(qb.build().sql(), "TRUE");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("taxi"), "taxi");
    }
}
