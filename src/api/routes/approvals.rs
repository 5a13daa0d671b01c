//! Approval queue and decisions

use axum::{
    extract::{Extension, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::pagination::{PageRequest, Pagination};
use crate::auth::AuthenticatedUser;
use crate::domain::{ApprovalDecision, OperationContext, UserRole};
use crate::error::AppResult;
use crate::handlers::{DecideApprovalCommand, DecideApprovalHandler};
use crate::models::{DecidedApproval, Expense};
use crate::state::AppState;

const APPROVER_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Manager];

#[derive(Debug, Default, Deserialize)]
pub struct CommentsRequest {
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub action: ApprovalDecision,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub expenses: Vec<Expense>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub approvals: Vec<DecidedApproval>,
    pub pagination: Pagination,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pending", get(pending))
        .route("/history", get(history))
        .route("/:expense_id/approve", post(approve))
        .route("/:expense_id/reject", post(reject))
        .route("/:expense_id/decide", post(decide))
}

/// PENDING expenses the caller may decide, oldest first
async fn pending(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
) -> AppResult<Json<PendingResponse>> {
    actor.require_role(APPROVER_ROLES)?;

    let expenses = Expense::pending_for(&state.pool, actor.scope(), actor.id()).await?;

    Ok(Json(PendingResponse {
        total: expenses.len(),
        expenses,
    }))
}

/// Admins see every decision in the company, managers their own.
async fn history(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<HistoryResponse>> {
    actor.require_role(APPROVER_ROLES)?;
    let page = PageRequest::new(query.page, query.limit, 10, 100)?;

    let decided_by = match actor.role() {
        UserRole::Admin => None,
        _ => Some(actor.id()),
    };

    let (approvals, total) = DecidedApproval::history(
        &state.pool,
        actor.company_id(),
        decided_by,
        page.limit,
        page.offset(),
    )
    .await?;

    Ok(Json(HistoryResponse {
        approvals,
        pagination: page.pagination(total),
    }))
}

async fn approve(
    state: State<AppState>,
    actor: Extension<AuthenticatedUser>,
    context: Extension<OperationContext>,
    Path(expense_id): Path<Uuid>,
    request: Option<Json<CommentsRequest>>,
) -> AppResult<Json<Expense>> {
    let comments = request.and_then(|Json(r)| r.comments);
    run_decision(state, actor, context, expense_id, ApprovalDecision::Approve, comments).await
}

async fn reject(
    state: State<AppState>,
    actor: Extension<AuthenticatedUser>,
    context: Extension<OperationContext>,
    Path(expense_id): Path<Uuid>,
    Json(request): Json<CommentsRequest>,
) -> AppResult<Json<Expense>> {
    run_decision(state, actor, context, expense_id, ApprovalDecision::Reject, request.comments).await
}

async fn decide(
    state: State<AppState>,
    actor: Extension<AuthenticatedUser>,
    context: Extension<OperationContext>,
    Path(expense_id): Path<Uuid>,
    Json(request): Json<DecideRequest>,
) -> AppResult<Json<Expense>> {
    run_decision(state, actor, context, expense_id, request.action, request.comments).await
}

async fn run_decision(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Extension(context): Extension<OperationContext>,
    expense_id: Uuid,
    decision: ApprovalDecision,
    comments: Option<String>,
) -> AppResult<Json<Expense>> {
    let handler = DecideApprovalHandler::new(state.pool);
    let command = DecideApprovalCommand::new(expense_id, decision).with_comments(comments);

    Ok(Json(handler.execute(command, &actor, &context).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_request_action() {
        let request: DecideRequest = serde_json::from_value(serde_json::json!({
            "action": "REJECT",
            "comments": "Duplicate of last week's claim"
        }))
        .unwrap();
        assert_eq!(request.action, ApprovalDecision::Reject);

        let unknown = serde_json::from_value::<DecideRequest>(serde_json::json!({ "action": "ESCALATE" }));
        assert!(unknown.is_err());
    }

    #[test]
    fn test_comments_are_optional() {
        let request: CommentsRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(request.comments.is_none());
    }
}
