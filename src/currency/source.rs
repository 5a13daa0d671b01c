//! Exchange-rate sources

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::CurrencyCode;

/// Rates quoted against one base currency: 1 base = `rates[code]` code.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    pub base: CurrencyCode,
    pub rates: HashMap<String, Decimal>,
}

impl RateTable {
    pub fn rate(&self, to: &CurrencyCode) -> Option<Decimal> {
        self.rates.get(to.as_str()).copied()
    }
}

/// Something that can quote rates for a base currency.
pub trait RateSource: Send + Sync {
    /// Latest table for `base`, or `None` when the base is unknown.
    fn latest(&self, base: &CurrencyCode) -> Option<RateTable>;
}

/// Reference rates against USD
fn usd_rates() -> [(&'static str, Decimal); 8] {
    [
        ("USD", Decimal::ONE),
        ("INR", Decimal::new(8325, 2)),
        ("EUR", Decimal::new(92, 2)),
        ("GBP", Decimal::new(79, 2)),
        ("AUD", Decimal::new(152, 2)),
        ("CAD", Decimal::new(136, 2)),
        ("JPY", Decimal::new(14950, 2)),
        ("SGD", Decimal::new(134, 2)),
    ]
}

/// In-process reference table. Cross rates are derived through USD as
/// `rate[to] / rate[from]`.
#[derive(Debug, Clone)]
pub struct StaticRateSource {
    usd: HashMap<String, Decimal>,
}

impl Default for StaticRateSource {
    fn default() -> Self {
        Self {
            usd: usd_rates()
                .into_iter()
                .map(|(code, rate)| (code.to_string(), rate))
                .collect(),
        }
    }
}

impl StaticRateSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateSource for StaticRateSource {
    fn latest(&self, base: &CurrencyCode) -> Option<RateTable> {
        let base_rate = *self.usd.get(base.as_str())?;

        let rates = self
            .usd
            .iter()
            .map(|(code, rate)| (code.clone(), *rate / base_rate))
            .collect();

        Some(RateTable {
            base: base.clone(),
            rates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    #[test]
    fn test_usd_table_is_identity_for_usd() {
        let table = StaticRateSource::new().latest(&code("USD")).unwrap();
        assert_eq!(table.rate(&code("USD")), Some(dec!(1)));
        assert_eq!(table.rate(&code("INR")), Some(dec!(83.25)));
    }

    #[test]
    fn test_cross_rate_through_usd() {
        let table = StaticRateSource::new().latest(&code("EUR")).unwrap();
        let eur_to_gbp = table.rate(&code("GBP")).unwrap();

        assert_eq!(eur_to_gbp, dec!(0.79) / dec!(0.92));
        assert_eq!(table.rate(&code("EUR")), Some(dec!(1)));
    }

    #[test]
    fn test_unknown_base() {
        assert!(StaticRateSource::new().latest(&code("XYZ")).is_none());
        let table = StaticRateSource::new().latest(&code("USD")).unwrap();
        assert!(table.rate(&code("XYZ")).is_none());
    }
}
