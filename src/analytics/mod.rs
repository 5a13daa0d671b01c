//! Expense analytics
//!
//! Every figure is computed from `converted_amount`, i.e. in the company
//! currency, over the rows visible to the caller.

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::domain::ExpenseScope;
use crate::error::{AppError, AppResult};
use crate::models::{from_rows, Expense, ExpenseRow, EXPENSE_SELECT};

pub const DEFAULT_TREND_MONTHS: u32 = 6;
pub const MAX_TREND_MONTHS: u32 = 24;
const RECENT_EXPENSES: i64 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub count: i64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total: Bucket,
    pub current_month: Bucket,
    pub pending: Bucket,
    pub approved: Bucket,
    pub rejected: Bucket,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub count: i64,
    pub amount: Decimal,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusBreakdown {
    pub status: String,
    pub count: i64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub summary: Summary,
    pub by_category: Vec<CategoryBreakdown>,
    pub by_status: Vec<StatusBreakdown>,
    pub recent: Vec<Expense>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub count: i64,
    pub amount: Decimal,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    total_count: i64,
    total_amount: Decimal,
    month_count: i64,
    month_amount: Decimal,
    pending_count: i64,
    pending_amount: Decimal,
    approved_count: i64,
    approved_amount: Decimal,
    rejected_count: i64,
    rejected_amount: Decimal,
}

impl From<SummaryRow> for Summary {
    fn from(row: SummaryRow) -> Self {
        Self {
            total: Bucket { count: row.total_count, amount: row.total_amount },
            current_month: Bucket { count: row.month_count, amount: row.month_amount },
            pending: Bucket { count: row.pending_count, amount: row.pending_amount },
            approved: Bucket { count: row.approved_count, amount: row.approved_amount },
            rejected: Bucket { count: row.rejected_count, amount: row.rejected_amount },
        }
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    pool: PgPool,
}

impl AnalyticsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn dashboard(&self, scope: ExpenseScope, today: NaiveDate) -> AppResult<Dashboard> {
        let month_start = first_of_month(today);

        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total_count, ");
        query
            .push("COALESCE(SUM(e.converted_amount), 0) AS total_amount, ")
            .push("COUNT(*) FILTER (WHERE e.expense_date >= ")
            .push_bind(month_start)
            .push(") AS month_count, ")
            .push("COALESCE(SUM(e.converted_amount) FILTER (WHERE e.expense_date >= ")
            .push_bind(month_start)
            .push("), 0) AS month_amount, ");
        for status in ["PENDING", "APPROVED", "REJECTED"] {
            let column = status.to_ascii_lowercase();
            query
                .push("COUNT(*) FILTER (WHERE e.status = ")
                .push_bind(status)
                .push(format!(") AS {}_count, ", column))
                .push("COALESCE(SUM(e.converted_amount) FILTER (WHERE e.status = ")
                .push_bind(status)
                .push(format!("), 0) AS {}_amount", column));
            if status != "REJECTED" {
                query.push(", ");
            }
        }
        query.push(" FROM expenses e WHERE ");
        scope.push_expense_filter(&mut query, "e");

        let summary: Summary = query
            .build_query_as::<SummaryRow>()
            .fetch_one(&self.pool)
            .await?
            .into();

        let by_category = self.grouped(scope, "category").await?;
        let by_category = category_breakdown(by_category, summary.total.amount);

        let by_status = self
            .grouped(scope, "status")
            .await?
            .into_iter()
            .map(|(status, count, amount)| StatusBreakdown { status, count, amount })
            .collect();

        let mut recent = QueryBuilder::<Postgres>::new(EXPENSE_SELECT);
        recent.push(" WHERE ");
        scope.push_expense_filter(&mut recent, "e");
        recent
            .push(" ORDER BY e.created_at DESC LIMIT ")
            .push_bind(RECENT_EXPENSES);
        let recent = from_rows(
            recent
                .build_query_as::<ExpenseRow>()
                .fetch_all(&self.pool)
                .await?,
        )?;

        Ok(Dashboard {
            summary,
            by_category,
            by_status,
            recent,
        })
    }

    /// Monthly totals for the last `months` months including the current
    /// one, oldest first, with empty months reported as zero.
    pub async fn trends(
        &self,
        scope: ExpenseScope,
        months: u32,
        today: NaiveDate,
    ) -> AppResult<Vec<TrendPoint>> {
        if !(1..=MAX_TREND_MONTHS).contains(&months) {
            return Err(AppError::InvalidRequest(format!(
                "months must be between 1 and {}",
                MAX_TREND_MONTHS
            )));
        }

        let periods = month_periods(today, months);
        let start = period_start(today, months);

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT to_char(date_trunc('month', e.expense_date), 'YYYY-MM') AS period, \
             COUNT(*), COALESCE(SUM(e.converted_amount), 0) FROM expenses e WHERE ",
        );
        scope.push_expense_filter(&mut query, "e");
        query
            .push(" AND e.expense_date >= ")
            .push_bind(start)
            .push(" GROUP BY 1");

        let rows: Vec<(String, i64, Decimal)> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(fill_trend(&periods, rows))
    }

    async fn grouped(
        &self,
        scope: ExpenseScope,
        column: &'static str,
    ) -> AppResult<Vec<(String, i64, Decimal)>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT e.{column}, COUNT(*), COALESCE(SUM(e.converted_amount), 0) FROM expenses e WHERE "
        ));
        scope.push_expense_filter(&mut query, "e");
        query.push(format!(" GROUP BY e.{column} ORDER BY 3 DESC, 1"));

        Ok(query.build_query_as().fetch_all(&self.pool).await?)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the oldest month in a window of `months` months ending with
/// the month of `today`.
fn period_start(today: NaiveDate, months: u32) -> NaiveDate {
    let start = first_of_month(today);
    start
        .checked_sub_months(Months::new(months.saturating_sub(1)))
        .unwrap_or(start)
}

/// `YYYY-MM` labels for the window, oldest first.
fn month_periods(today: NaiveDate, months: u32) -> Vec<String> {
    let start = period_start(today, months);
    (0..months)
        .filter_map(|i| start.checked_add_months(Months::new(i)))
        .map(|d| d.format("%Y-%m").to_string())
        .collect()
}

fn fill_trend(periods: &[String], rows: Vec<(String, i64, Decimal)>) -> Vec<TrendPoint> {
    let found: HashMap<String, (i64, Decimal)> = rows
        .into_iter()
        .map(|(period, count, amount)| (period, (count, amount)))
        .collect();

    periods
        .iter()
        .map(|period| {
            let (count, amount) = found.get(period).copied().unwrap_or((0, Decimal::ZERO));
            TrendPoint {
                period: period.clone(),
                count,
                amount,
            }
        })
        .collect()
}

/// `part` as a percentage of `total`, two decimal places
fn percentage(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    (part * Decimal::ONE_HUNDRED / total)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn category_breakdown(rows: Vec<(String, i64, Decimal)>, total: Decimal) -> Vec<CategoryBreakdown> {
    rows.into_iter()
        .map(|(category, count, amount)| CategoryBreakdown {
            percentage: percentage(amount, total),
            category,
            count,
            amount,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_periods_cross_year() {
        let periods = month_periods(date(2025, 2, 17), 4);
        assert_eq!(periods, vec!["2024-11", "2024-12", "2025-01", "2025-02"]);
    }

    #[test]
    fn test_single_month_window() {
        assert_eq!(month_periods(date(2025, 10, 31), 1), vec!["2025-10"]);
        assert_eq!(period_start(date(2025, 10, 31), 1), date(2025, 10, 1));
    }

    #[test]
    fn test_period_start_for_default_window() {
        assert_eq!(period_start(date(2025, 10, 4), DEFAULT_TREND_MONTHS), date(2025, 5, 1));
    }

    #[test]
    fn test_fill_trend_zero_fills_missing_months() {
        let periods = month_periods(date(2025, 3, 1), 3);
        let rows = vec![("2025-02".to_string(), 2, dec!(1500.00))];

        let trend = fill_trend(&periods, rows);

        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0], TrendPoint { period: "2025-01".into(), count: 0, amount: Decimal::ZERO });
        assert_eq!(trend[1].amount, dec!(1500.00));
        assert_eq!(trend[2].count, 0);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(percentage(dec!(2), dec!(3)), dec!(66.67));
        assert_eq!(percentage(dec!(5), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_category_breakdown_adds_percentages() {
        let rows = vec![
            ("TRAVEL".to_string(), 3, dec!(750)),
            ("FOOD".to_string(), 1, dec!(250)),
        ];

        let breakdown = category_breakdown(rows, dec!(1000));
        assert_eq!(breakdown[0].percentage, dec!(75));
        assert_eq!(breakdown[1].percentage, dec!(25));
    }
}
