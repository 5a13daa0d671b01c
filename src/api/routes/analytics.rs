//! Spending analytics over the caller's scope

use axum::{
    extract::{Extension, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::analytics::{AnalyticsService, Dashboard, TrendPoint, DEFAULT_TREND_MONTHS};
use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TrendResponse {
    pub months: u32,
    pub currency: String,
    pub trends: Vec<TrendPoint>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/trends", get(trends))
}

async fn dashboard(
    State(pool): State<PgPool>,
    Extension(actor): Extension<AuthenticatedUser>,
) -> AppResult<Json<Dashboard>> {
    let dashboard = AnalyticsService::new(pool)
        .dashboard(actor.scope(), Utc::now().date_naive())
        .await?;

    Ok(Json(dashboard))
}

async fn trends(
    State(pool): State<PgPool>,
    Extension(actor): Extension<AuthenticatedUser>,
    Query(query): Query<TrendQuery>,
) -> AppResult<Json<TrendResponse>> {
    let months = query.months.unwrap_or(DEFAULT_TREND_MONTHS);

    let trends = AnalyticsService::new(pool)
        .trends(actor.scope(), months, Utc::now().date_naive())
        .await?;

    Ok(Json(TrendResponse {
        months,
        currency: actor.company.currency_code,
        trends,
    }))
}
