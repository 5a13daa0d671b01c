//! In-app notifications
//!
//! Notifications are written inside the transaction of the change that
//! caused them, so a rolled-back approval never notifies anyone.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::string_enum;
use crate::error::AppError;

string_enum! {
    pub enum NotificationType {
        ExpenseSubmitted => "EXPENSE_SUBMITTED",
        ApprovalRequired => "APPROVAL_REQUIRED",
        ExpenseApproved => "EXPENSE_APPROVED",
        ExpenseRejected => "EXPENSE_REJECTED",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(id) => AppError::NotificationNotFound(id.to_string()),
            NotificationError::Database(e) => AppError::Database(e),
        }
    }
}

/// A notification to be written
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// One page of a user's notifications
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub total: i64,
    pub unread_count: i64,
}

#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
}

impl NotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write a notification as part of an open transaction.
    pub async fn create_in_tx(
        conn: &mut PgConnection,
        notification: NewNotification,
    ) -> Result<Uuid, NotificationError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, company_id, type, title, message, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(notification.user_id)
        .bind(notification.company_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.data)
        .execute(&mut *conn)
        .await?;

        tracing::debug!(
            notification_id = %id,
            user_id = %notification.user_id,
            kind = %notification.kind,
            "Notification queued"
        );

        Ok(id)
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<NotificationPage, NotificationError> {
        let notifications: Vec<Notification> = sqlx::query_as(
            r#"
            SELECT id, user_id, type, title, message, data, read, created_at
            FROM notifications
            WHERE user_id = $1 AND ($2 = FALSE OR read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND ($2 = FALSE OR read = FALSE)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        let unread_count = self.unread_count(user_id).await?;

        Ok(NotificationPage {
            notifications,
            total,
            unread_count,
        })
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, NotificationError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Mark one of the user's notifications read. Other users' notifications
    /// are reported as missing.
    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<(), NotificationError> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotFound(id));
        }
        Ok(())
    }

    /// Returns the number of notifications that changed.
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, NotificationError> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE")
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), NotificationError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_notification_type_strings() {
        assert_eq!(NotificationType::ApprovalRequired.as_str(), "APPROVAL_REQUIRED");
        assert_eq!(
            NotificationType::from_str("expense_rejected").unwrap(),
            NotificationType::ExpenseRejected
        );
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let id = Uuid::new_v4();
        let err: AppError = NotificationError::NotFound(id).into();
        assert!(matches!(err, AppError::NotificationNotFound(s) if s == id.to_string()));
    }

    #[test]
    fn test_notification_serializes_type_field() {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind: "EXPENSE_APPROVED".to_string(),
            title: "Expense approved".to_string(),
            message: "Your expense was approved".to_string(),
            data: None,
            read: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "EXPENSE_APPROVED");
        assert!(json.get("kind").is_none());
    }
}
