//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthError;
use crate::domain::{DomainError, MoneyError};

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),

    #[error("Notification not found: {0}")]
    NotificationNotFound(String),

    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    #[error("Email is already registered: {0}")]
    EmailTaken(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<MoneyError> for AppError {
    fn from(err: MoneyError) -> Self {
        AppError::Domain(DomainError::from(err))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// HTTP status, machine-readable code and optional details
    fn parts(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 401 / 400 / 500 depending on the auth failure
            AppError::Auth(auth_err) => match auth_err {
                AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "missing_token", None),
                AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
                AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired", None),
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "invalid_credentials", None)
                }
                AuthError::AccountDeactivated => {
                    (StatusCode::UNAUTHORIZED, "account_deactivated", None)
                }
                AuthError::UserInactive => (StatusCode::UNAUTHORIZED, "user_inactive", None),
                AuthError::WeakPassword => (StatusCode::BAD_REQUEST, "weak_password", None),
                AuthError::Hashing(msg) | AuthError::Encoding(msg) => {
                    tracing::error!("Auth internal error: {}", msg);
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
                }
            },

            // 403 Forbidden
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),

            // 404 Not Found
            AppError::UserNotFound(id) => {
                (StatusCode::NOT_FOUND, "user_not_found", Some(id.clone()))
            }
            AppError::ExpenseNotFound(id) => {
                (StatusCode::NOT_FOUND, "expense_not_found", Some(id.clone()))
            }
            AppError::NotificationNotFound(id) => {
                (StatusCode::NOT_FOUND, "notification_not_found", Some(id.clone()))
            }
            AppError::CompanyNotFound(id) => {
                (StatusCode::NOT_FOUND, "company_not_found", Some(id.clone()))
            }

            // 409 Conflict
            AppError::EmailTaken(_) => (StatusCode::CONFLICT, "email_taken", None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),

            // 429 Too Many Requests
            AppError::RateLimitExceeded => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded", None)
            }

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(domain_err) => {
                let details = Some(domain_err.to_string());
                match domain_err {
                    DomainError::InvalidAmount(_) => {
                        (StatusCode::BAD_REQUEST, "invalid_amount", details)
                    }
                    DomainError::InvalidCurrency(_) => {
                        (StatusCode::BAD_REQUEST, "invalid_currency", details)
                    }
                    DomainError::InvalidValue { .. } => {
                        (StatusCode::BAD_REQUEST, "invalid_value", details)
                    }
                    DomainError::UnsupportedCurrency { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "unsupported_currency", details)
                    }
                    DomainError::InvalidTransition { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition", details)
                    }
                    DomainError::NotEditable(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "not_editable", details)
                    }
                    DomainError::SelfApproval => (StatusCode::FORBIDDEN, "self_approval", None),
                    DomainError::Unauthorized(msg) => {
                        (StatusCode::FORBIDDEN, "unauthorized", Some(msg.clone()))
                    }
                    DomainError::BusinessRuleViolation(msg) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "business_rule_violation",
                        Some(msg.clone()),
                    ),
                }
            }

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = self.parts();

        // Server-side failures are logged above and never echoed
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Whether a database error is a unique-constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .map_or(false, |code| code == "23505")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExpenseStatus, ExpenseTransition};

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_auth_errors_are_unauthorized() {
        assert_eq!(status_of(AuthError::MissingToken.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::InvalidCredentials.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::AccountDeactivated.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::WeakPassword.into()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let transition = DomainError::InvalidTransition {
            from: ExpenseStatus::Approved,
            transition: ExpenseTransition::Approve,
        };
        assert_eq!(status_of(transition.into()), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_of(DomainError::SelfApproval.into()), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(DomainError::InvalidCurrency("XX".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                DomainError::UnsupportedCurrency {
                    from: "USD".into(),
                    to: "XYZ".into()
                }
                .into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_money_errors_propagate_as_invalid_amount() {
        fn parse(value: rust_decimal::Decimal) -> AppResult<crate::domain::Money> {
            Ok(crate::domain::Money::new(value)?)
        }

        let err = parse(rust_decimal::Decimal::ZERO).unwrap_err();
        let (status, code, _) = err.parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "invalid_amount");
    }

    #[test]
    fn test_conflicts_and_limits() {
        assert_eq!(status_of(AppError::EmailTaken("a@b.c".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(AppError::Conflict("raced".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(AppError::RateLimitExceeded), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_internal_errors_are_not_echoed() {
        let err = AppError::Internal("secret connection string".into());
        let (status, code, details) = err.parts();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "internal_error");
        assert!(details.is_none());
    }
}
