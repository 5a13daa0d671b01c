//! Cached exchange-rate lookups and conversion

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::domain::{CurrencyCode, DomainError, Money};

use super::source::{RateSource, RateTable};

/// Stored precision of converted amounts
const AMOUNT_DP: u32 = 2;

/// Stored precision of exchange rates
const RATE_DP: u32 = 8;

/// Largest value `expenses.converted_amount` (NUMERIC(18, 2)) can hold
const MAX_CONVERTED: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 2);

/// Result of converting an amount into another currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub converted_amount: Decimal,
    pub exchange_rate: Decimal,
}

struct CachedTable {
    table: RateTable,
    fetched_at: Instant,
}

/// Rate lookups with a per-base-currency TTL cache in front of a [`RateSource`].
#[derive(Clone)]
pub struct ExchangeRateService {
    source: Arc<dyn RateSource>,
    cache: Arc<RwLock<HashMap<CurrencyCode, CachedTable>>>,
    ttl: Duration,
}

impl std::fmt::Debug for ExchangeRateService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRateService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ExchangeRateService {
    pub fn new(source: Arc<dyn RateSource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Rate table for `base`, served from cache while fresh.
    pub async fn rates(&self, base: &CurrencyCode) -> Result<RateTable, DomainError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(base) {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(cached.table.clone());
                }
            }
        }

        let table = self.source.latest(base).ok_or_else(|| DomainError::UnsupportedCurrency {
            from: base.to_string(),
            to: base.to_string(),
        })?;

        tracing::debug!(base = %base, "Refreshed exchange rates");

        let mut cache = self.cache.write().await;
        cache.insert(
            base.clone(),
            CachedTable {
                table: table.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(table)
    }

    /// Rate for one unit of `from` in `to`, rounded to the stored precision.
    pub async fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal, DomainError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        let unsupported = || DomainError::UnsupportedCurrency {
            from: from.to_string(),
            to: to.to_string(),
        };

        let table = self.rates(from).await.map_err(|_| unsupported())?;
        let rate = table.rate(to).ok_or_else(unsupported)?;

        Ok(rate.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Convert `amount` from one currency to another. The converted amount is
    /// computed from the rounded rate so both stored values agree.
    pub async fn convert(
        &self,
        amount: Money,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Conversion, DomainError> {
        let exchange_rate = self.rate(from, to).await?;
        let converted_amount = (amount.value() * exchange_rate)
            .round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::MidpointAwayFromZero);

        if converted_amount > MAX_CONVERTED {
            return Err(DomainError::rule(format!(
                "{} {} is too large once converted to {}",
                from, amount, to
            )));
        }

        Ok(Conversion {
            converted_amount,
            exchange_rate,
        })
    }
}
