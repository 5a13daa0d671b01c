//! API integration tests
//!
//! Tests marked `#[ignore]` need a PostgreSQL database in `DATABASE_URL`:
//! `cargo test -- --ignored`.

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

mod common;

use common::{decimal, file_expense, send, setup_test_db, PASSWORD};
use swift_expense::jobs::JobScheduler;

#[tokio::test]
async fn test_health_check() {
    let app = common::lazy_app();
    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = common::lazy_app();

    let (status, body) = send(&app, Method::GET, "/api/expenses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "missing_token");
}

#[tokio::test]
async fn test_protected_route_rejects_invalid_token() {
    let app = common::lazy_app();

    let (status, body) = send(&app, Method::GET, "/api/auth/me", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "invalid_token");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = common::lazy_app();
    let (status, _) = send(&app, Method::GET, "/api/ledger", None, None).await;
    assert!(status == StatusCode::NOT_FOUND || status == StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_register_login_and_profile() {
    let tenant = setup_test_db().await;
    let app = &tenant.app;
    let email = format!("founder-{}@acme.example", uuid::Uuid::new_v4().simple());

    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "s3cure-pass",
            "first_name": "Meera",
            "last_name": "Nair",
            "company_name": "Acme Analytics",
            "currency_code": "usd"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["role"], "ADMIN");
    assert_eq!(body["company"]["currency_code"], "USD");
    assert!(body["user"].get("password_hash").is_none());

    // Same e-mail again
    let (status, _) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "s3cure-pass",
            "first_name": "Meera",
            "last_name": "Nair",
            "company_name": "Acme Again"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "invalid_credentials");

    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "s3cure-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["company"]["name"], "Acme Analytics");
}

#[tokio::test]
#[ignore]
async fn test_expense_approval_flow() {
    let tenant = setup_test_db().await;
    let app = &tenant.app;

    // Employee files a USD expense; the company books in INR
    let (status, expense) = send(
        app,
        Method::POST,
        "/api/expenses",
        Some(&tenant.employee_token),
        Some(json!({
            "amount": "100.00",
            "original_currency": "USD",
            "category": "TRAVEL",
            "description": "Airport transfer",
            "expense_date": "2025-10-01",
            "tags": ["client"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{expense}");
    assert_eq!(expense["status"], "PENDING");
    assert_ne!(expense["converted_amount"], "100.00");
    let expense_id = expense["id"].as_str().unwrap().to_string();

    // The manager was asked to approve
    let (_, inbox) = send(app, Method::GET, "/api/notifications", Some(&tenant.manager_token), None).await;
    assert_eq!(inbox["notifications"][0]["type"], "APPROVAL_REQUIRED");
    assert_eq!(inbox["unread_count"], 1);

    let (status, pending) = send(app, Method::GET, "/api/approvals/pending", Some(&tenant.manager_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["expenses"][0]["id"], expense_id.as_str());

    // Employees have no approval queue
    let (status, _) = send(app, Method::GET, "/api/approvals/pending", Some(&tenant.employee_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A rejection without a reason is refused
    let (status, _) = send(
        app,
        Method::POST,
        &format!("/api/approvals/{}/reject", expense_id),
        Some(&tenant.manager_token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, decided) = send(
        app,
        Method::POST,
        &format!("/api/approvals/{}/approve", expense_id),
        Some(&tenant.manager_token),
        Some(json!({ "comments": "Fine" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{decided}");
    assert_eq!(decided["status"], "APPROVED");
    assert_eq!(decided["approval_steps"][0]["status"], "APPROVED");

    // Deciding twice is an invalid transition
    let (status, _) = send(
        app,
        Method::POST,
        &format!("/api/approvals/{}/approve", expense_id),
        Some(&tenant.manager_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Approved expenses can no longer be edited
    let (status, _) = send(
        app,
        Method::PUT,
        &format!("/api/expenses/{}", expense_id),
        Some(&tenant.employee_token),
        Some(json!({ "description": "Changed" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, inbox) = send(app, Method::GET, "/api/notifications", Some(&tenant.employee_token), None).await;
    assert_eq!(inbox["notifications"][0]["type"], "EXPENSE_APPROVED");

    let (_, history) = send(app, Method::GET, "/api/approvals/history", Some(&tenant.manager_token), None).await;
    assert_eq!(history["pagination"]["total"], 1);
}

#[tokio::test]
#[ignore]
async fn test_draft_submit_and_visibility() {
    let tenant = setup_test_db().await;
    let app = &tenant.app;

    let (status, draft) = send(
        app,
        Method::POST,
        "/api/expenses",
        Some(&tenant.employee_token),
        Some(json!({
            "amount": 450,
            "original_currency": "INR",
            "category": "FOOD",
            "description": "Team lunch",
            "expense_date": "2025-10-02",
            "draft": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(draft["status"], "DRAFT");
    let uri = format!("/api/expenses/{}", draft["id"].as_str().unwrap());

    // Drafts are not in anyone's queue
    let (_, pending) = send(app, Method::GET, "/api/approvals/pending", Some(&tenant.manager_token), None).await;
    assert_eq!(pending["total"], 0);

    // Outside the team the expense does not exist
    let (status, _) = send(app, Method::GET, &uri, Some(&tenant.outsider_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(app, Method::GET, &uri, Some(&tenant.manager_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, submitted) = send(
        app,
        Method::POST,
        &format!("{}/submit", uri),
        Some(&tenant.employee_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{submitted}");
    assert_eq!(submitted["status"], "PENDING");

    // Submitting again is an invalid transition
    let (status, _) = send(app, Method::POST, &format!("{}/submit", uri), Some(&tenant.employee_token), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, list) = send(app, Method::GET, "/api/expenses?status=pending", Some(&tenant.admin_token), None).await;
    assert_eq!(list["pagination"]["total"], 1);

    let (status, _) = send(app, Method::GET, "/api/expenses?limit=500", Some(&tenant.admin_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = send(app, Method::GET, "/api/expenses", Some(&tenant.outsider_token), None).await;
    assert_eq!(list["pagination"]["total"], 0);

    let (status, _) = send(app, Method::DELETE, &uri, Some(&tenant.employee_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, Method::GET, &uri, Some(&tenant.employee_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_user_management() {
    let tenant = setup_test_db().await;
    let app = &tenant.app;
    let email = format!("new-hire-{}@test.example", uuid::Uuid::new_v4().simple());

    let new_user = json!({
        "email": email,
        "password": PASSWORD,
        "first_name": "New",
        "last_name": "Hire",
        "role": "EMPLOYEE",
        "manager_id": tenant.manager.id
    });

    let (status, _) = send(app, Method::POST, "/api/users", Some(&tenant.manager_token), Some(new_user.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(app, Method::POST, "/api/users", Some(&tenant.admin_token), Some(new_user)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let user_uri = format!("/api/users/{}", created["id"].as_str().unwrap());

    // The manager now sees the new report
    let (_, team) = send(app, Method::GET, "/api/users", Some(&tenant.manager_token), None).await;
    assert_eq!(team["total"], 3);

    // A user cannot manage themselves
    let (status, _) = send(
        app,
        Method::PATCH,
        &user_uri,
        Some(&tenant.admin_token),
        Some(json!({ "manager_id": created["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = send(
        app,
        Method::PATCH,
        &user_uri,
        Some(&tenant.admin_token),
        Some(json!({ "manager_id": null, "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["manager_id"].is_null());
    assert_eq!(updated["is_active"], false);

    // An admin cannot demote themselves
    let (status, _) = send(
        app,
        Method::PATCH,
        &format!("/api/users/{}", tenant.admin.id),
        Some(&tenant.admin_token),
        Some(json!({ "role": "EMPLOYEE" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, stats) = send(app, Method::GET, "/api/activity-logs/stats", Some(&tenant.admin_token), None).await;
    assert_eq!(stats["by_action"]["USER_CREATED"], 1);
    assert_eq!(stats["by_action"]["USER_UPDATED"], 1);
}

#[tokio::test]
#[ignore]
async fn test_approver_is_first_active_manager() {
    let tenant = setup_test_db().await;
    let app = &tenant.app;
    let email = format!("direct-report-{}@test.example", Uuid::new_v4().simple());

    // Reports to the admin, but routing ignores the reporting line
    let (status, _) = send(
        app,
        Method::POST,
        "/api/users",
        Some(&tenant.admin_token),
        Some(json!({
            "email": email,
            "password": PASSWORD,
            "first_name": "Direct",
            "last_name": "Report",
            "role": "EMPLOYEE",
            "manager_id": tenant.admin.id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, login) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    let token = login["token"].as_str().unwrap().to_string();

    let expense = file_expense(app, &token, "1200.00", "OFFICE").await;
    assert_eq!(expense["approval_steps"][0]["approver_id"], tenant.manager.id.to_string());

    let outsider_expense = file_expense(app, &tenant.outsider_token, "80.00", "FOOD").await;
    assert_eq!(
        outsider_expense["approval_steps"][0]["approver_id"],
        tenant.manager.id.to_string()
    );

    let (_, inbox) = send(app, Method::GET, "/api/notifications/unread-count", Some(&tenant.admin_token), None).await;
    assert_eq!(inbox["unread_count"], 0);
}

#[tokio::test]
#[ignore]
async fn test_notifications_are_private_to_their_owner() {
    let tenant = setup_test_db().await;
    let app = &tenant.app;

    file_expense(app, &tenant.employee_token, "300.00", "FOOD").await;
    file_expense(app, &tenant.outsider_token, "450.00", "TRAVEL").await;

    let (_, inbox) = send(app, Method::GET, "/api/notifications", Some(&tenant.manager_token), None).await;
    assert_eq!(inbox["pagination"]["total"], 2);
    assert_eq!(inbox["unread_count"], 2);
    let first = inbox["notifications"][0]["id"].as_str().unwrap().to_string();

    // Someone else's notification does not exist
    let (status, _) = send(
        app,
        Method::POST,
        &format!("/api/notifications/{}/read", first),
        Some(&tenant.employee_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app,
        Method::DELETE,
        &format!("/api/notifications/{}", first),
        Some(&tenant.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app,
        Method::POST,
        &format!("/api/notifications/{}/read", first),
        Some(&tenant.manager_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, count) = send(app, Method::GET, "/api/notifications/unread-count", Some(&tenant.manager_token), None).await;
    assert_eq!(count["unread_count"], 1);

    let (_, unread) = send(app, Method::GET, "/api/notifications?unread_only=true", Some(&tenant.manager_token), None).await;
    assert_eq!(unread["pagination"]["total"], 1);

    let (status, body) = send(app, Method::POST, "/api/notifications/read-all", Some(&tenant.manager_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    let (_, count) = send(app, Method::GET, "/api/notifications/unread-count", Some(&tenant.manager_token), None).await;
    assert_eq!(count["unread_count"], 0);

    let (status, _) = send(
        app,
        Method::DELETE,
        &format!("/api/notifications/{}", first),
        Some(&tenant.manager_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, inbox) = send(app, Method::GET, "/api/notifications", Some(&tenant.manager_token), None).await;
    assert_eq!(inbox["pagination"]["total"], 1);
}

#[tokio::test]
#[ignore]
async fn test_dashboard_and_trends_follow_scope() {
    let tenant = setup_test_db().await;
    let app = &tenant.app;

    let travel = file_expense(app, &tenant.employee_token, "1000.00", "TRAVEL").await;
    file_expense(app, &tenant.employee_token, "500.00", "FOOD").await;

    let (status, _) = send(
        app,
        Method::POST,
        &format!("/api/approvals/{}/approve", travel["id"].as_str().unwrap()),
        Some(&tenant.manager_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, dashboard) = send(app, Method::GET, "/api/analytics/dashboard", Some(&tenant.employee_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let summary = &dashboard["summary"];
    assert_eq!(summary["total"]["count"], 2);
    assert_eq!(decimal(&summary["total"]["amount"]), dec!(1500));
    assert_eq!(summary["current_month"]["count"], 2);
    assert_eq!(summary["approved"]["count"], 1);
    assert_eq!(decimal(&summary["approved"]["amount"]), dec!(1000));
    assert_eq!(summary["pending"]["count"], 1);
    assert_eq!(summary["rejected"]["count"], 0);
    assert_eq!(dashboard["by_category"].as_array().unwrap().len(), 2);
    assert_eq!(dashboard["recent"].as_array().unwrap().len(), 2);

    // The manager's team includes the employee; the outsider sees nothing
    let (_, dashboard) = send(app, Method::GET, "/api/analytics/dashboard", Some(&tenant.manager_token), None).await;
    assert_eq!(dashboard["summary"]["total"]["count"], 2);

    let (_, dashboard) = send(app, Method::GET, "/api/analytics/dashboard", Some(&tenant.outsider_token), None).await;
    assert_eq!(dashboard["summary"]["total"]["count"], 0);
    assert_eq!(decimal(&dashboard["summary"]["total"]["amount"]), dec!(0));

    let (status, trends) = send(app, Method::GET, "/api/analytics/trends?months=3", Some(&tenant.admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trends["currency"], "INR");
    let points = trends["trends"].as_array().unwrap();
    assert_eq!(points.len(), 3);
    assert_eq!(points[0]["count"], 0);
    assert_eq!(points[2]["period"], chrono::Utc::now().format("%Y-%m").to_string());
    assert_eq!(points[2]["count"], 2);
    assert_eq!(decimal(&points[2]["amount"]), dec!(1500));

    let (status, _) = send(app, Method::GET, "/api/analytics/trends?months=0", Some(&tenant.admin_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_manager_activity_is_limited_to_team() {
    let tenant = setup_test_db().await;
    let app = &tenant.app;

    file_expense(app, &tenant.employee_token, "250.00", "OFFICE").await;
    file_expense(app, &tenant.outsider_token, "75.00", "FOOD").await;

    let (status, body) = send(app, Method::GET, "/api/activity-logs", Some(&tenant.manager_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["logs"][0]["action"], "EXPENSE_CREATED");
    assert_eq!(body["logs"][0]["user"]["id"], tenant.employee.id.to_string());

    let (_, body) = send(
        app,
        Method::GET,
        &format!("/api/activity-logs?user_id={}", tenant.outsider.id),
        Some(&tenant.manager_token),
        None,
    )
    .await;
    assert_eq!(body["pagination"]["total"], 0);

    let (_, body) = send(app, Method::GET, "/api/activity-logs", Some(&tenant.admin_token), None).await;
    assert_eq!(body["pagination"]["total"], 2);

    let (status, _) = send(app, Method::GET, "/api/activity-logs", Some(&tenant.employee_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(app, Method::GET, "/api/activity-logs/stats", Some(&tenant.manager_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_self_and_cross_tenant_decisions_are_refused() {
    let tenant = setup_test_db().await;
    let other = setup_test_db().await;
    let app = &tenant.app;

    // The only manager files: nobody else to route to, so admins hear about it
    let own = file_expense(app, &tenant.manager_token, "900.00", "TRAVEL").await;
    let own_id = own["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app,
        Method::POST,
        &format!("/api/approvals/{}/approve", own_id),
        Some(&tenant.manager_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "self_approval");

    let (_, inbox) = send(app, Method::GET, "/api/notifications", Some(&tenant.admin_token), None).await;
    assert_eq!(inbox["notifications"][0]["type"], "EXPENSE_SUBMITTED");

    let employee_expense = file_expense(app, &tenant.employee_token, "120.00", "FOOD").await;
    let uri = format!(
        "/api/approvals/{}/decide",
        employee_expense["id"].as_str().unwrap()
    );

    for token in [&other.manager_token, &other.admin_token] {
        let (status, _) = send(
            app,
            Method::POST,
            &uri,
            Some(token),
            Some(json!({ "action": "APPROVE" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, _) = send(
        app,
        Method::GET,
        &format!("/api/expenses/{}", employee_expense["id"].as_str().unwrap()),
        Some(&other.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Still undecided for its own tenant
    let (status, decided) = send(
        app,
        Method::POST,
        &uri,
        Some(&tenant.admin_token),
        Some(json!({ "action": "REJECT", "comments": "Missing receipt" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{decided}");
    assert_eq!(decided["status"], "REJECTED");

    let (status, decided) = send(
        app,
        Method::POST,
        &format!("/api/approvals/{}/approve", own_id),
        Some(&tenant.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{decided}");
    assert_eq!(decided["status"], "APPROVED");
}

#[tokio::test]
#[ignore]
async fn test_admin_deletes_decided_expense() {
    let tenant = setup_test_db().await;
    let app = &tenant.app;

    let expense = file_expense(app, &tenant.employee_token, "640.00", "EQUIPMENT").await;
    let id = expense["id"].as_str().unwrap().to_string();
    let uri = format!("/api/expenses/{}", id);

    let (status, _) = send(
        app,
        Method::POST,
        &format!("/api/approvals/{}/approve", id),
        Some(&tenant.manager_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, Method::DELETE, &uri, Some(&tenant.employee_token), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(app, Method::DELETE, &uri, Some(&tenant.manager_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(app, Method::DELETE, &uri, Some(&tenant.admin_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, Method::GET, &uri, Some(&tenant.admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, stats) = send(app, Method::GET, "/api/activity-logs/stats", Some(&tenant.admin_token), None).await;
    assert_eq!(stats["by_action"]["EXPENSE_DELETED"], 1);
}

#[tokio::test]
#[ignore]
async fn test_company_currency_is_fixed_once_expenses_exist() {
    let tenant = setup_test_db().await;
    let app = &tenant.app;

    let (status, company) = send(
        app,
        Method::PATCH,
        "/api/companies/current",
        Some(&tenant.admin_token),
        Some(json!({ "currency_code": "usd" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{company}");
    assert_eq!(company["currency_code"], "USD");

    let (status, _) = send(
        app,
        Method::PATCH,
        "/api/companies/current",
        Some(&tenant.admin_token),
        Some(json!({ "currency_code": "INR" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    file_expense(app, &tenant.employee_token, "100.00", "SOFTWARE").await;

    let (status, body) = send(
        app,
        Method::PATCH,
        "/api/companies/current",
        Some(&tenant.admin_token),
        Some(json!({ "currency_code": "EUR" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "conflict");

    // Restating the current currency is not a change
    let (status, company) = send(
        app,
        Method::PATCH,
        "/api/companies/current",
        Some(&tenant.admin_token),
        Some(json!({ "currency_code": "INR", "name": "Renamed Co" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(company["name"], "Renamed Co");
    assert_eq!(company["currency_code"], "INR");
}

#[tokio::test]
#[ignore]
async fn test_maintenance_purges_old_read_notifications() {
    let tenant = setup_test_db().await;

    let insert = |read: bool| {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, company_id, type, title, message, read, created_at)
            VALUES ($1, $2, $3, 'EXPENSE_APPROVED', 'Old', 'Old news', $4, NOW() - INTERVAL '120 days')
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant.employee.id)
        .bind(tenant.company_id)
        .bind(read)
    };
    insert(true).execute(&tenant.pool).await.unwrap();
    insert(false).execute(&tenant.pool).await.unwrap();

    let report = JobScheduler::new(tenant.pool.clone()).run_all_once().await;
    assert!(report.is_clean(), "{:?}", report.errors);
    assert!(report.notifications_purged >= 1);

    // Unread ones survive regardless of age
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
        .bind(tenant.employee.id)
        .fetch_one(&tenant.pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}
