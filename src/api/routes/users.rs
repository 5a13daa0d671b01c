//! User management endpoints

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::domain::{OperationContext, UserRole};
use crate::error::{AppError, AppResult};
use crate::handlers::{CreateUserCommand, CreateUserHandler, UpdateUserCommand, UpdateUserHandler};
use crate::models::User;
use crate::state::AppState;

use super::parse_param;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub manager_id: Option<Uuid>,
}

/// `manager_id: null` clears the manager; an absent key leaves it alone.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default, deserialize_with = "double_option")]
    pub manager_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:user_id", get(get_user).patch(update_user))
}

/// Admins list the company, managers themselves and their reports.
async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<UserListResponse>> {
    actor.require_role(&[UserRole::Admin, UserRole::Manager])?;
    let role = parse_param(query.role.as_deref())?;

    let users = User::list(&state.pool, actor.scope(), role, query.active).await?;

    Ok(Json(UserListResponse {
        total: users.len(),
        users,
    }))
}

async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let not_found = || AppError::UserNotFound(user_id.to_string());

    let user = User::find_in_company(&state.pool, actor.company_id(), user_id)
        .await?
        .ok_or_else(not_found)?;

    if !actor.scope().permits_user(user.company_id, user.id, user.manager_id) {
        return Err(not_found());
    }

    Ok(Json(user))
}

async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let handler = CreateUserHandler::new(state.pool);

    let command = CreateUserCommand {
        email: request.email,
        password: request.password,
        first_name: request.first_name,
        last_name: request.last_name,
        role: request.role,
        manager_id: request.manager_id,
    };

    let user = handler.execute(command, &actor, &context).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    let handler = UpdateUserHandler::new(state.pool);

    let command = UpdateUserCommand {
        user_id,
        first_name: request.first_name,
        last_name: request.last_name,
        role: request.role,
        manager_id: request.manager_id,
        is_active: request.is_active,
    };

    Ok(Json(handler.execute(command, &actor, &context).await?))
}
