//! Database module
//!
//! Connection checks and schema verification.

use sqlx::PgPool;

const REQUIRED_TABLES: &[&str] = &[
    "companies",
    "users",
    "expenses",
    "approval_steps",
    "notifications",
    "activity_logs",
    "rate_limit_buckets",
];

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if required tables and the rate limit function exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    let has_rate_limit_fn: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM pg_proc WHERE proname = 'check_and_increment_rate_limit')",
    )
    .fetch_one(pool)
    .await?;

    if !has_rate_limit_fn {
        tracing::error!("Function 'check_and_increment_rate_limit' does not exist");
        return Ok(false);
    }

    Ok(true)
}
