use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::{DomainError, ExpenseScope, UserRole};
use crate::error::{is_unique_violation, AppError, AppResult};

use super::{from_row, from_rows};

pub const USER_COLUMNS: &str = "id, company_id, email, password_hash, first_name, last_name, \
     role, manager_id, is_active, preferences, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub manager_id: Option<Uuid>,
    pub is_active: bool,
    pub preferences: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub manager_id: Option<Uuid>,
    pub is_active: bool,
    pub preferences: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            company_id: row.company_id,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role.parse()?,
            manager_id: row.manager_id,
            is_active: row.is_active,
            preferences: row.preferences,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
        }
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> AppResult<Option<User>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        row.map(from_row).transpose()
    }

    /// Look up by e-mail, compared case-insensitively.
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> AppResult<Option<User>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {} FROM users WHERE email = LOWER($1)", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email.trim())
            .fetch_optional(executor)
            .await?;

        row.map(from_row).transpose()
    }

    /// Load a user only if it belongs to `company_id`.
    pub async fn find_in_company<'e, E>(
        executor: E,
        company_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<User>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "SELECT {} FROM users WHERE id = $1 AND company_id = $2",
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(company_id)
            .fetch_optional(executor)
            .await?;

        row.map(from_row).transpose()
    }

    /// Insert a user inside an open transaction. A taken e-mail address
    /// surfaces as [`AppError::EmailTaken`].
    pub async fn insert(conn: &mut PgConnection, new: NewUser) -> AppResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, company_id, email, password_hash, first_name, last_name, role, manager_id)
            VALUES ($1, $2, LOWER($3), $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row: UserRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(new.company_id)
            .bind(new.email.trim())
            .bind(&new.password_hash)
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(new.role.as_str())
            .bind(new.manager_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::EmailTaken(new.email.clone())
                } else {
                    AppError::Database(e)
                }
            })?;

        from_row(row)
    }

    /// Users visible under `scope`, ordered by name.
    pub async fn list<'e, E>(
        executor: E,
        scope: ExpenseScope,
        role: Option<UserRole>,
        active: Option<bool>,
    ) -> AppResult<Vec<User>>
    where
        E: PgExecutor<'e>,
    {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users u WHERE ", USER_COLUMNS));
        scope.push_user_filter(&mut query, "u", "id");
        if let Some(role) = role {
            query.push(" AND u.role = ").push_bind(role.as_str());
        }
        if let Some(active) = active {
            query.push(" AND u.is_active = ").push_bind(active);
        }
        query.push(" ORDER BY u.first_name, u.last_name, u.email");

        let rows = query.build_query_as::<UserRow>().fetch_all(executor).await?;
        from_rows(rows)
    }
}

/// Fields of a user account about to be created
#[derive(Debug, Clone)]
pub struct NewUser {
    pub company_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub manager_id: Option<Uuid>,
}

/// Compact user reference embedded in other responses
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}
