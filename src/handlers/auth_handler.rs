//! Registration and login

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{ActivityAction, ActivityLogBuilder, ActivityLogService};
use crate::auth::{AuthError, PasswordHasher, TokenService};
use crate::currency;
use crate::domain::{CurrencyCode, DomainError, OperationContext, UserRole};
use crate::error::{AppError, AppResult};
use crate::models::{Company, NewUser, User};

use super::{AuthResult, LoginCommand, RegisterCommand};

pub const DEFAULT_CURRENCY: &str = "INR";
pub const DEFAULT_COUNTRY: &str = "India";

/// Handler for self-service sign-up. Every registration founds a new
/// company whose first user is its administrator.
pub struct RegisterHandler {
    pool: PgPool,
    hasher: PasswordHasher,
    tokens: TokenService,
}

impl RegisterHandler {
    pub fn new(pool: PgPool, tokens: TokenService) -> Self {
        Self {
            pool,
            hasher: PasswordHasher::default(),
            tokens,
        }
    }

    pub async fn execute(
        &self,
        command: RegisterCommand,
        context: &OperationContext,
    ) -> AppResult<AuthResult> {
        let command = command.validate()?;

        let currency = CurrencyCode::new(command.currency_code.as_deref().unwrap_or(DEFAULT_CURRENCY))?;
        if !currency::is_supported(currency.as_str()) {
            return Err(DomainError::InvalidCurrency(currency.to_string()).into());
        }

        if User::find_by_email(&self.pool, &command.email).await?.is_some() {
            return Err(AppError::EmailTaken(command.email));
        }

        let password_hash = self.hasher.hash(&command.password).await?;

        let mut tx = self.pool.begin().await?;

        let company: Company = sqlx::query_as(
            r#"
            INSERT INTO companies (id, name, currency_code, country)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, currency_code, country, settings, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&command.company_name)
        .bind(currency.as_str())
        .bind(command.country.as_deref().unwrap_or(DEFAULT_COUNTRY))
        .fetch_one(&mut *tx)
        .await?;

        let user = User::insert(
            &mut tx,
            NewUser {
                company_id: company.id,
                email: command.email,
                password_hash,
                first_name: command.first_name,
                last_name: command.last_name,
                role: UserRole::Admin,
                manager_id: None,
            },
        )
        .await?;

        let context = context.clone().with_user(user.id, company.id);
        ActivityLogService::log_in_tx(
            &mut tx,
            ActivityLogBuilder::new(ActivityAction::UserCreated, user.id, company.id).details(&json!({
                "email": user.email,
                "role": user.role,
                "registration": true,
            })),
            &context,
        )
        .await?;

        tx.commit().await?;

        let token = self.tokens.issue(&user)?;

        tracing::info!(
            user_id = %user.id,
            company_id = %company.id,
            correlation_id = ?context.correlation_id,
            "Company registered"
        );

        Ok(AuthResult { user, company, token })
    }
}

/// Handler for password login
pub struct LoginHandler {
    pool: PgPool,
    hasher: PasswordHasher,
    tokens: TokenService,
}

impl LoginHandler {
    pub fn new(pool: PgPool, tokens: TokenService) -> Self {
        Self {
            pool,
            hasher: PasswordHasher::default(),
            tokens,
        }
    }

    /// Unknown e-mail and wrong password fail the same way.
    pub async fn execute(
        &self,
        command: LoginCommand,
        context: &OperationContext,
    ) -> AppResult<AuthResult> {
        let user = User::find_by_email(&self.pool, &command.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(&command.password, &user.password_hash).await? {
            tracing::warn!(user_id = %user.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials.into());
        }

        if !user.is_active {
            return Err(AuthError::AccountDeactivated.into());
        }

        let company = Company::find(&self.pool, user.company_id)
            .await?
            .ok_or_else(|| AppError::CompanyNotFound(user.company_id.to_string()))?;

        let token = self.tokens.issue(&user)?;

        let context = context.clone().with_user(user.id, company.id);
        ActivityLogService::new(self.pool.clone())
            .log(
                ActivityLogBuilder::new(ActivityAction::Login, user.id, company.id)
                    .details(&json!({ "email": user.email })),
                &context,
            )
            .await;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(AuthResult { user, company, token })
    }
}
