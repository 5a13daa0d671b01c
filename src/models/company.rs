use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::domain::{CurrencyCode, DomainError};
use crate::error::AppResult;

/// A tenant. `settings` holds workflow configuration as opaque JSON.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub currency_code: String,
    pub country: String,
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    /// Base currency of the company
    pub fn currency(&self) -> Result<CurrencyCode, DomainError> {
        CurrencyCode::new(&self.currency_code)
    }

    pub async fn find<'e, E>(executor: E, id: Uuid) -> AppResult<Option<Company>>
    where
        E: PgExecutor<'e>,
    {
        let company = sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, currency_code, country, settings, created_at, updated_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(company)
    }
}
