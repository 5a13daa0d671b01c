//! Company settings and currency endpoints

use axum::{
    extract::{Extension, Query, State},
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticatedUser;
use crate::currency::{self, CurrencyInfo, ExchangeRateService};
use crate::domain::{CurrencyCode, DomainError, UserRole};
use crate::error::{AppError, AppResult};
use crate::models::Company;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCompanyRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

impl UpdateCompanyRequest {
    /// Trimmed values, with the currency upper-cased and checked against
    /// the supported list.
    fn validate(self) -> AppResult<Self> {
        let name = self.name.map(|n| n.trim().to_string());
        if let Some(name) = &name {
            if name.is_empty() || name.chars().count() > 200 {
                return Err(AppError::InvalidRequest(
                    "name must be between 1 and 200 characters".to_string(),
                ));
            }
        }

        let country = self.country.map(|c| c.trim().to_string());
        if let Some(country) = &country {
            if country.is_empty() || country.chars().count() > 100 {
                return Err(AppError::InvalidRequest(
                    "country must be between 1 and 100 characters".to_string(),
                ));
            }
        }

        let currency_code = self
            .currency_code
            .map(|c| CurrencyCode::new(&c))
            .transpose()?
            .map(|code| {
                if currency::is_supported(code.as_str()) {
                    Ok(code.to_string())
                } else {
                    Err(DomainError::InvalidCurrency(code.to_string()))
                }
            })
            .transpose()?;

        if matches!(&self.settings, Some(settings) if !settings.is_object()) {
            return Err(AppError::InvalidRequest(
                "settings must be a JSON object".to_string(),
            ));
        }

        Ok(Self {
            name,
            currency_code,
            country,
            settings: self.settings,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRateQuery {
    pub from: String,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompanyListResponse {
    pub companies: Vec<Company>,
}

#[derive(Debug, Serialize)]
pub struct CurrencyListResponse {
    pub currencies: &'static [CurrencyInfo],
}

#[derive(Debug, Serialize)]
pub struct ExchangeRateResponse {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: Decimal,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_companies))
        .route("/current", get(current_company).patch(update_company))
        .route("/currencies", get(list_currencies))
        .route("/exchange-rates", get(exchange_rate))
}

/// A caller only ever belongs to one company.
async fn list_companies(Extension(actor): Extension<AuthenticatedUser>) -> Json<CompanyListResponse> {
    Json(CompanyListResponse {
        companies: vec![actor.company],
    })
}

async fn current_company(Extension(actor): Extension<AuthenticatedUser>) -> Json<Company> {
    Json(actor.company)
}

async fn update_company(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(request): Json<UpdateCompanyRequest>,
) -> AppResult<Json<Company>> {
    actor.require_role(&[UserRole::Admin])?;
    let request = request.validate()?;

    let mut tx = state.pool.begin().await?;

    let current: Option<String> =
        sqlx::query_scalar("SELECT currency_code FROM companies WHERE id = $1 FOR UPDATE")
            .bind(actor.company_id())
            .fetch_optional(&mut *tx)
            .await?;
    let current = current.ok_or_else(|| AppError::CompanyNotFound(actor.company_id().to_string()))?;

    // Stored converted amounts are in the current currency
    if let Some(requested) = &request.currency_code {
        if *requested != current {
            let has_expenses: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM expenses WHERE company_id = $1)")
                    .bind(actor.company_id())
                    .fetch_one(&mut *tx)
                    .await?;

            if has_expenses {
                return Err(AppError::Conflict(format!(
                    "cannot change the company currency from {} to {} once expenses exist",
                    current, requested
                )));
            }
        }
    }

    let company: Option<Company> = sqlx::query_as(
        r#"
        UPDATE companies
        SET name = COALESCE($2, name),
            currency_code = COALESCE($3, currency_code),
            country = COALESCE($4, country),
            settings = COALESCE($5, settings),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, currency_code, country, settings, created_at, updated_at
        "#,
    )
    .bind(actor.company_id())
    .bind(&request.name)
    .bind(&request.currency_code)
    .bind(&request.country)
    .bind(&request.settings)
    .fetch_optional(&mut *tx)
    .await?;

    let company = company.ok_or_else(|| AppError::CompanyNotFound(actor.company_id().to_string()))?;
    tx.commit().await?;

    tracing::info!(
        company_id = %company.id,
        updated_by = %actor.id(),
        currency = %company.currency_code,
        "Company settings updated"
    );

    Ok(Json(company))
}

async fn list_currencies() -> Json<CurrencyListResponse> {
    Json(CurrencyListResponse {
        currencies: currency::supported_currencies(),
    })
}

/// `to` defaults to the company currency.
async fn exchange_rate(
    State(rates): State<ExchangeRateService>,
    Extension(actor): Extension<AuthenticatedUser>,
    Query(query): Query<ExchangeRateQuery>,
) -> AppResult<Json<ExchangeRateResponse>> {
    let from = CurrencyCode::new(&query.from)?;
    let to = match query.to.as_deref() {
        Some(code) => CurrencyCode::new(code)?,
        None => actor.company.currency()?,
    };

    let rate = rates.rate(&from, &to).await?;

    Ok(Json(ExchangeRateResponse { from, to, rate }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_normalizes_currency() {
        let request = UpdateCompanyRequest {
            currency_code: Some("usd".to_string()),
            name: Some("  Acme Analytics ".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(request.currency_code.as_deref(), Some("USD"));
        assert_eq!(request.name.as_deref(), Some("Acme Analytics"));
    }

    #[test]
    fn test_update_rejects_unsupported_currency() {
        let request = UpdateCompanyRequest {
            currency_code: Some("XYZ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            request.validate(),
            Err(AppError::Domain(DomainError::InvalidCurrency(_)))
        ));
    }

    #[test]
    fn test_update_rejects_non_object_settings() {
        let request = UpdateCompanyRequest {
            settings: Some(serde_json::json!(["auto-approve"])),
            ..Default::default()
        };
        assert!(request.validate().is_err());

        let blank = UpdateCompanyRequest {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }
}
