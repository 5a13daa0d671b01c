//! Expense endpoints

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::pagination::{PageRequest, Pagination};
use crate::auth::AuthenticatedUser;
use crate::domain::{ExpenseCategory, OperationContext};
use crate::error::{AppError, AppResult};
use crate::handlers::{
    load_with_steps, CreateExpenseCommand, CreateExpenseHandler, DeleteExpenseHandler,
    SubmitExpenseHandler, UpdateExpenseCommand, UpdateExpenseHandler,
};
use crate::models::{Expense, ExpenseFilter};
use crate::state::AppState;

use super::parse_param;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub amount: Decimal,
    pub original_currency: String,
    pub category: ExpenseCategory,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub description: String,
    pub expense_date: NaiveDate,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateExpenseRequest {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub original_currency: Option<String>,
    #[serde(default)]
    pub category: Option<ExpenseCategory>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expense_date: Option<NaiveDate>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpenseListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub employee_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
}

impl ExpenseListQuery {
    fn filter(&self) -> AppResult<ExpenseFilter> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(AppError::InvalidRequest(
                    "date_from must not be after date_to".to_string(),
                ));
            }
        }

        Ok(ExpenseFilter {
            status: parse_param(self.status.as_deref())?,
            category: parse_param(self.category.as_deref())?,
            employee_id: self.employee_id,
            date_from: self.date_from,
            date_to: self.date_to,
            search: self.search.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ExpenseListResponse {
    pub expenses: Vec<Expense>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route(
            "/:expense_id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
        .route("/:expense_id/submit", post(submit_expense))
}

/// Expenses visible to the caller, newest expense date first
async fn list_expenses(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Query(query): Query<ExpenseListQuery>,
) -> AppResult<Json<ExpenseListResponse>> {
    let page = PageRequest::new(query.page, query.limit, DEFAULT_LIMIT, MAX_LIMIT)?;
    let filter = query.filter()?;

    let (expenses, total) =
        Expense::list(&state.pool, actor.scope(), &filter, page.limit, page.offset()).await?;

    Ok(Json(ExpenseListResponse {
        expenses,
        pagination: page.pagination(total),
    }))
}

async fn create_expense(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<CreateExpenseRequest>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    let handler = CreateExpenseHandler::new(state.pool, state.rates);

    let command = CreateExpenseCommand {
        amount: request.amount,
        original_currency: request.original_currency,
        category: request.category,
        subcategory: request.subcategory,
        description: request.description,
        expense_date: request.expense_date,
        receipt_url: request.receipt_url,
        tags: request.tags,
        draft: request.draft,
    };

    let expense = handler
        .execute(command, &actor, &context, Utc::now().date_naive())
        .await?;

    Ok((StatusCode::CREATED, Json(expense)))
}

/// Rows outside the caller's scope are reported as missing.
async fn get_expense(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(expense_id): Path<Uuid>,
) -> AppResult<Json<Expense>> {
    let expense = load_with_steps(&state.pool, expense_id).await?;

    if !actor.scope().permits(&expense.ownership()) {
        return Err(AppError::ExpenseNotFound(expense_id.to_string()));
    }

    Ok(Json(expense))
}

async fn update_expense(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Extension(context): Extension<OperationContext>,
    Path(expense_id): Path<Uuid>,
    Json(request): Json<UpdateExpenseRequest>,
) -> AppResult<Json<Expense>> {
    let handler = UpdateExpenseHandler::new(state.pool, state.rates);

    let command = UpdateExpenseCommand {
        expense_id,
        amount: request.amount,
        original_currency: request.original_currency,
        category: request.category,
        subcategory: request.subcategory,
        description: request.description,
        expense_date: request.expense_date,
        receipt_url: request.receipt_url,
        tags: request.tags,
    };

    let expense = handler
        .execute(command, &actor, &context, Utc::now().date_naive())
        .await?;

    Ok(Json(expense))
}

async fn submit_expense(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Extension(context): Extension<OperationContext>,
    Path(expense_id): Path<Uuid>,
) -> AppResult<Json<Expense>> {
    let handler = SubmitExpenseHandler::new(state.pool);
    Ok(Json(handler.execute(expense_id, &actor, &context).await?))
}

async fn delete_expense(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Extension(context): Extension<OperationContext>,
    Path(expense_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let handler = DeleteExpenseHandler::new(state.pool);
    handler.execute(expense_id, &actor, &context).await?;

    Ok(Json(MessageResponse {
        message: "Expense deleted successfully",
    }))
}
