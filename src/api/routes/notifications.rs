//! Notification inbox of the current user

use axum::{
    extract::{Extension, Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::pagination::{PageRequest, Pagination};
use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::notifications::{Notification, NotificationService};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/:notification_id/read", post(mark_read))
        .route("/:notification_id", delete(delete_notification))
}

async fn list_notifications(
    State(pool): State<PgPool>,
    Extension(actor): Extension<AuthenticatedUser>,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<NotificationListResponse>> {
    let page = PageRequest::new(query.page, query.limit, 20, 50)?;

    let result = NotificationService::new(pool)
        .list(actor.id(), query.unread_only, page.limit, page.offset())
        .await?;

    Ok(Json(NotificationListResponse {
        notifications: result.notifications,
        pagination: page.pagination(result.total),
        unread_count: result.unread_count,
    }))
}

async fn unread_count(
    State(pool): State<PgPool>,
    Extension(actor): Extension<AuthenticatedUser>,
) -> AppResult<Json<UnreadCountResponse>> {
    let unread_count = NotificationService::new(pool).unread_count(actor.id()).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

async fn mark_read(
    State(pool): State<PgPool>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    NotificationService::new(pool)
        .mark_read(actor.id(), notification_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Notification marked as read",
    }))
}

async fn mark_all_read(
    State(pool): State<PgPool>,
    Extension(actor): Extension<AuthenticatedUser>,
) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = NotificationService::new(pool).mark_all_read(actor.id()).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

async fn delete_notification(
    State(pool): State<PgPool>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    NotificationService::new(pool)
        .delete(actor.id(), notification_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Notification deleted",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query: NotificationQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!query.unread_only);

        let page = PageRequest::new(query.page, query.limit, 20, 50).unwrap();
        assert_eq!(page.limit, 20);
        assert!(PageRequest::new(None, Some(51), 20, 50).is_err());
    }
}
