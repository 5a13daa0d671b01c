//! User administration handlers

use serde_json::json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::audit::{ActivityAction, ActivityLogBuilder, ActivityLogService};
use crate::auth::{AuthenticatedUser, PasswordHasher};
use crate::domain::{OperationContext, UserRole};
use crate::error::{AppError, AppResult};
use crate::models::{from_row, NewUser, User, UserRow, USER_COLUMNS};

use super::{CreateUserCommand, UpdateUserCommand};

/// A manager must be an active MANAGER or ADMIN of the same company.
async fn ensure_manager<'e, E>(executor: E, company_id: Uuid, manager_id: Uuid) -> AppResult<()>
where
    E: PgExecutor<'e>,
{
    let manager = User::find_in_company(executor, company_id, manager_id).await?;
    match manager {
        Some(m) if m.is_active && m.role.can_approve() => Ok(()),
        _ => Err(AppError::InvalidRequest(
            "manager_id must reference an active manager or admin in your company".to_string(),
        )),
    }
}

/// Handler for admins adding users to their company
pub struct CreateUserHandler {
    pool: PgPool,
    hasher: PasswordHasher,
}

impl CreateUserHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            hasher: PasswordHasher::default(),
        }
    }

    pub async fn execute(
        &self,
        command: CreateUserCommand,
        actor: &AuthenticatedUser,
        context: &OperationContext,
    ) -> AppResult<User> {
        actor.require_role(&[UserRole::Admin])?;
        let command = command.validate()?;
        let company_id = actor.company_id();

        if let Some(manager_id) = command.manager_id {
            ensure_manager(&self.pool, company_id, manager_id).await?;
        }

        if User::find_by_email(&self.pool, &command.email).await?.is_some() {
            return Err(AppError::EmailTaken(command.email));
        }

        let password_hash = self.hasher.hash(&command.password).await?;

        let mut tx = self.pool.begin().await?;

        let user = User::insert(
            &mut tx,
            NewUser {
                company_id,
                email: command.email,
                password_hash,
                first_name: command.first_name,
                last_name: command.last_name,
                role: command.role,
                manager_id: command.manager_id,
            },
        )
        .await?;

        ActivityLogService::log_in_tx(
            &mut tx,
            ActivityLogBuilder::new(ActivityAction::UserCreated, actor.id(), company_id).details(&json!({
                "user_id": user.id,
                "email": user.email,
                "role": user.role,
                "manager_id": user.manager_id,
            })),
            context,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user.id,
            role = %user.role,
            created_by = %actor.id(),
            "User created"
        );

        Ok(user)
    }
}

/// Handler for admins changing users of their company
pub struct UpdateUserHandler {
    pool: PgPool,
}

impl UpdateUserHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn execute(
        &self,
        command: UpdateUserCommand,
        actor: &AuthenticatedUser,
        context: &OperationContext,
    ) -> AppResult<User> {
        actor.require_role(&[UserRole::Admin])?;
        let command = command.validate()?;
        let company_id = actor.company_id();

        let target = User::find_in_company(&self.pool, company_id, command.user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(command.user_id.to_string()))?;

        if command.is_empty() {
            return Ok(target);
        }

        if let Some(Some(manager_id)) = command.manager_id {
            if manager_id == target.id {
                return Err(AppError::InvalidRequest(
                    "A user cannot be their own manager".to_string(),
                ));
            }
            ensure_manager(&self.pool, company_id, manager_id).await?;
        }

        if target.id == actor.id() {
            if command.is_active == Some(false) {
                return Err(AppError::InvalidRequest(
                    "You cannot deactivate your own account".to_string(),
                ));
            }
            if matches!(command.role, Some(role) if role != UserRole::Admin) {
                return Err(AppError::InvalidRequest(
                    "You cannot remove your own admin role".to_string(),
                ));
            }
        }

        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                role = COALESCE($5, role),
                manager_id = CASE WHEN $6 THEN $7 ELSE manager_id END,
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row: UserRow = sqlx::query_as(&sql)
            .bind(target.id)
            .bind(company_id)
            .bind(&command.first_name)
            .bind(&command.last_name)
            .bind(command.role.map(|r| r.as_str()))
            .bind(command.manager_id.is_some())
            .bind(command.manager_id.flatten())
            .bind(command.is_active)
            .fetch_one(&mut *tx)
            .await?;
        let user: User = from_row(row)?;

        ActivityLogService::log_in_tx(
            &mut tx,
            ActivityLogBuilder::new(ActivityAction::UserUpdated, actor.id(), company_id).details(&json!({
                "user_id": user.id,
                "changes": command,
            })),
            context,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, updated_by = %actor.id(), "User updated");

        Ok(user)
    }
}
