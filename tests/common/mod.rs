//! Common test utilities

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::util::ServiceExt;
use uuid::Uuid;

use swift_expense::auth::{PasswordHasher, TokenService};
use swift_expense::domain::UserRole;
use swift_expense::models::{NewUser, User};
use swift_expense::{build_router, AppState, Config};

pub const PASSWORD: &str = "password123";

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        database_max_connections: 5,
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        jwt_expiry_hours: 1,
        cors_origin: "http://localhost:3000".to_string(),
        rate_limit_per_minute: 1000,
        exchange_rate_cache_secs: 60,
        run_migrations: false,
    }
}

/// Router over a pool that never connects; enough for routes that fail
/// before touching the database.
pub fn lazy_app() -> Router {
    let config = test_config("postgres://postgres@localhost/unused");
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("Failed to build lazy pool");

    build_router(AppState::new(pool, config)).expect("Failed to build router")
}

/// A freshly seeded tenant: an admin, a manager and an employee reporting
/// to the manager, plus an employee outside the manager's team.
pub struct TestTenant {
    pub app: Router,
    pub pool: PgPool,
    pub company_id: Uuid,
    pub admin: User,
    pub manager: User,
    pub employee: User,
    pub outsider: User,
    pub admin_token: String,
    pub manager_token: String,
    pub employee_token: String,
    pub outsider_token: String,
}

/// Migrate the database and seed a new tenant. Every call uses fresh
/// e-mail addresses so tests can share one database.
pub async fn setup_test_db() -> TestTenant {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let config = test_config(&database_url);
    let tokens = TokenService::from_config(&config);
    let hasher = PasswordHasher::with_cost(4);
    let password_hash = hasher.hash(PASSWORD).await.expect("Failed to hash password");
    let run = Uuid::new_v4().simple().to_string();

    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    let company_id = Uuid::new_v4();
    sqlx::query("INSERT INTO companies (id, name, currency_code, country) VALUES ($1, $2, 'INR', 'India')")
        .bind(company_id)
        .bind(format!("Test Co {}", run))
        .execute(&mut *tx)
        .await
        .expect("Failed to seed company");

    let new_user = |name: &str, role: UserRole, manager_id: Option<Uuid>| NewUser {
        company_id,
        email: format!("{}-{}@test.example", name, run),
        password_hash: password_hash.clone(),
        first_name: name.to_string(),
        last_name: "Tester".to_string(),
        role,
        manager_id,
    };

    let admin = User::insert(&mut tx, new_user("admin", UserRole::Admin, None))
        .await
        .expect("Failed to seed admin");
    let manager = User::insert(&mut tx, new_user("manager", UserRole::Manager, None))
        .await
        .expect("Failed to seed manager");
    let employee = User::insert(&mut tx, new_user("employee", UserRole::Employee, Some(manager.id)))
        .await
        .expect("Failed to seed employee");
    let outsider = User::insert(&mut tx, new_user("outsider", UserRole::Employee, None))
        .await
        .expect("Failed to seed outsider");

    tx.commit().await.expect("Failed to commit transaction");

    let token = |user: &User| tokens.issue(user).expect("Failed to issue token");

    TestTenant {
        app: build_router(AppState::new(pool.clone(), config)).expect("Failed to build router"),
        company_id,
        admin_token: token(&admin),
        manager_token: token(&manager),
        employee_token: token(&employee),
        outsider_token: token(&outsider),
        pool,
        admin,
        manager,
        employee,
        outsider,
    }
}

/// Send a request and decode the JSON body (`Value::Null` when empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// File an expense in the company currency dated today; returns the body.
pub async fn file_expense(app: &Router, token: &str, amount: &str, category: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/expenses",
        Some(token),
        Some(serde_json::json!({
            "amount": amount,
            "original_currency": "INR",
            "category": category,
            "description": format!("{} expense", category),
            "expense_date": chrono::Utc::now().date_naive().to_string(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

/// Decimal amount serialized as a string
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a decimal: {value}"))
}
