//! Authentication
//!
//! Passwords are stored as bcrypt hashes; sessions are stateless HS256 bearer
//! tokens. The auth middleware resolves a token into an [`AuthenticatedUser`].

mod password;
mod token;

pub use password::{PasswordHasher, BCRYPT_COST, MIN_PASSWORD_LENGTH};
pub use token::{Claims, TokenService};

use uuid::Uuid;

use crate::domain::{ExpenseScope, UserRole};
use crate::error::{AppError, AppResult};
use crate::models::{Company, User};

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("User not found or inactive")]
    UserInactive,

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters long")]
    WeakPassword,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// The caller of a protected route, inserted by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub company: Company,
}

impl AuthenticatedUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn company_id(&self) -> Uuid {
        self.user.company_id
    }

    pub fn role(&self) -> UserRole {
        self.user.role
    }

    /// Rows this caller may see
    pub fn scope(&self) -> ExpenseScope {
        ExpenseScope::for_role(self.user.role, self.user.id, self.user.company_id)
    }

    /// Fail with 403 unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[UserRole]) -> AppResult<()> {
        if roles.contains(&self.user.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn caller(role: UserRole) -> AuthenticatedUser {
        let now = Utc::now();
        let company_id = Uuid::new_v4();
        AuthenticatedUser {
            user: User {
                id: Uuid::new_v4(),
                company_id,
                email: "caller@techcorp.in".to_string(),
                password_hash: String::new(),
                first_name: "Cal".to_string(),
                last_name: "Ler".to_string(),
                role,
                manager_id: None,
                is_active: true,
                preferences: serde_json::json!({}),
                created_at: now,
                updated_at: now,
            },
            company: Company {
                id: company_id,
                name: "TechCorp".to_string(),
                currency_code: "INR".to_string(),
                country: "India".to_string(),
                settings: serde_json::json!({}),
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[test]
    fn test_require_role() {
        let employee = caller(UserRole::Employee);
        assert!(employee.require_role(&[UserRole::Employee]).is_ok());
        assert!(matches!(
            employee.require_role(&[UserRole::Admin, UserRole::Manager]),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_scope_follows_role() {
        let admin = caller(UserRole::Admin);
        assert_eq!(
            admin.scope(),
            ExpenseScope::Company {
                company_id: admin.company_id()
            }
        );
    }

    #[test]
    fn test_weak_password_message_names_minimum() {
        assert_eq!(
            AuthError::WeakPassword.to_string(),
            "Password must be at least 8 characters long"
        );
    }
}
