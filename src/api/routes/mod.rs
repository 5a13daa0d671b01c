//! API Routes
//!
//! HTTP endpoint definitions, one module per resource.

mod activity_logs;
mod analytics;
mod approvals;
mod auth;
mod companies;
mod expenses;
mod notifications;
mod users;

use axum::Router;

use crate::state::AppState;

/// Routes reachable without a bearer token
pub fn public_router() -> Router<AppState> {
    auth::public_routes()
}

/// Routes behind the auth and rate limit middleware
pub fn protected_router() -> Router<AppState> {
    auth::routes()
        .nest("/expenses", expenses::routes())
        .nest("/approvals", approvals::routes())
        .nest("/users", users::routes())
        .nest("/companies", companies::routes())
        .nest("/notifications", notifications::routes())
        .nest("/activity-logs", activity_logs::routes())
        .nest("/analytics", analytics::routes())
}

/// Parse an optional case-insensitive enum query parameter.
fn parse_param<T>(value: Option<&str>) -> crate::error::AppResult<Option<T>>
where
    T: std::str::FromStr<Err = crate::domain::DomainError>,
{
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse)
        .transpose()
        .map_err(Into::into)
}
