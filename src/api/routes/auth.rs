//! Registration, login and session endpoints

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthenticatedUser, TokenService};
use crate::domain::OperationContext;
use crate::error::AppResult;
use crate::handlers::{AuthResult, LoginCommand, LoginHandler, RegisterCommand, RegisterHandler};
use crate::models::{Company, User};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub company: Company,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

/// Create a company together with its first administrator
async fn register(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResult>)> {
    let handler = RegisterHandler::new(state.pool, state.tokens);

    let command = RegisterCommand {
        email: request.email,
        password: request.password,
        first_name: request.first_name,
        last_name: request.last_name,
        company_name: request.company_name,
        currency_code: request.currency_code,
        country: request.country,
    };

    let result = handler.execute(command, &context).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

async fn login(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<AuthResult>> {
    let handler = LoginHandler::new(state.pool, state.tokens);

    let command = LoginCommand {
        email: request.email,
        password: request.password,
    };

    Ok(Json(handler.execute(command, &context).await?))
}

async fn me(Extension(actor): Extension<AuthenticatedUser>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: actor.user,
        company: actor.company,
    })
}

async fn refresh(
    State(tokens): State<TokenService>,
    Extension(actor): Extension<AuthenticatedUser>,
) -> AppResult<Json<TokenResponse>> {
    let token = tokens.issue(&actor.user)?;
    Ok(Json(TokenResponse { token }))
}

/// Tokens are stateless; the client discards its copy.
async fn logout(Extension(actor): Extension<AuthenticatedUser>) -> Json<MessageResponse> {
    tracing::info!(user_id = %actor.id(), "User logged out");
    Json(MessageResponse {
        message: "Logged out successfully",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_optional_fields() {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "founder@acme.io",
            "password": "s3cure-pass",
            "first_name": "Meera",
            "last_name": "Nair",
            "company_name": "Acme Analytics"
        }))
        .unwrap();

        assert!(request.currency_code.is_none());
        assert!(request.country.is_none());
    }
}
