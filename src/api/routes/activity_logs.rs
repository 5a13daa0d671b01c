//! Activity log queries

use std::collections::BTreeMap;

use axum::{
    extract::{Extension, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::pagination::{PageRequest, Pagination};
use crate::audit::{ActivityEntry, ActivityFilter, ActivityLogService};
use crate::auth::AuthenticatedUser;
use crate::domain::UserRole;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

use super::parse_param;

const DEFAULT_STATS_DAYS: i32 = 30;
const MAX_STATS_DAYS: i32 = 365;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub user_id: Option<Uuid>,
    pub expense_id: Option<Uuid>,
    pub action: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i32>,
}

impl StatsQuery {
    fn days(&self) -> AppResult<i32> {
        let days = self.days.unwrap_or(DEFAULT_STATS_DAYS);
        if !(1..=MAX_STATS_DAYS).contains(&days) {
            return Err(AppError::InvalidRequest(format!(
                "days must be between 1 and {}",
                MAX_STATS_DAYS
            )));
        }
        Ok(days)
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityListResponse {
    pub logs: Vec<ActivityEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ActivityStatsResponse {
    pub days: i32,
    pub total: i64,
    pub by_action: BTreeMap<String, i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_activity))
        .route("/stats", get(activity_stats))
}

/// Managers only see activity of themselves and their reports.
async fn list_activity(
    State(pool): State<PgPool>,
    Extension(actor): Extension<AuthenticatedUser>,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<ActivityListResponse>> {
    actor.require_role(&[UserRole::Admin, UserRole::Manager])?;
    let page = PageRequest::new(query.page, query.limit, 50, 100)?;

    let filter = ActivityFilter {
        user_id: query.user_id,
        expense_id: query.expense_id,
        action: parse_param(query.action.as_deref())?,
    };

    let (logs, total) = ActivityLogService::new(pool)
        .history(actor.scope(), &filter, page.limit, page.offset())
        .await?;

    Ok(Json(ActivityListResponse {
        logs,
        pagination: page.pagination(total),
    }))
}

async fn activity_stats(
    State(pool): State<PgPool>,
    Extension(actor): Extension<AuthenticatedUser>,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<ActivityStatsResponse>> {
    actor.require_role(&[UserRole::Admin])?;
    let days = query.days()?;

    let by_action = ActivityLogService::new(pool)
        .stats(actor.company_id(), days)
        .await?;

    Ok(Json(ActivityStatsResponse {
        days,
        total: by_action.values().sum(),
        by_action,
    }))
}
