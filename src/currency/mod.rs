//! Currency support
//!
//! Expenses are converted into the company currency when they are created or
//! edited. Rates come from a [`RateSource`] behind a TTL cache.

mod service;
mod source;

pub use service::{Conversion, ExchangeRateService};
pub use source::{RateSource, RateTable, StaticRateSource};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
}

const SUPPORTED: &[CurrencyInfo] = &[
    CurrencyInfo { code: "AUD", name: "Australian dollar", symbol: "A$" },
    CurrencyInfo { code: "CAD", name: "Canadian dollar", symbol: "C$" },
    CurrencyInfo { code: "EUR", name: "Euro", symbol: "€" },
    CurrencyInfo { code: "GBP", name: "British pound", symbol: "£" },
    CurrencyInfo { code: "INR", name: "Indian rupee", symbol: "₹" },
    CurrencyInfo { code: "JPY", name: "Japanese yen", symbol: "¥" },
    CurrencyInfo { code: "SGD", name: "Singapore dollar", symbol: "S$" },
    CurrencyInfo { code: "USD", name: "United States dollar", symbol: "$" },
];

/// Currencies that can be converted, sorted by code
pub fn supported_currencies() -> &'static [CurrencyInfo] {
    SUPPORTED
}

pub fn is_supported(code: &str) -> bool {
    SUPPORTED.iter().any(|c| c.code.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CurrencyCode;

    #[test]
    fn test_catalogue_is_sorted() {
        let codes: Vec<_> = supported_currencies().iter().map(|c| c.code).collect();
        let mut sorted = codes.clone();
        sorted.sort();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn test_every_listed_currency_has_rates() {
        let source = StaticRateSource::new();
        for currency in supported_currencies() {
            let code = CurrencyCode::new(currency.code).unwrap();
            assert!(source.latest(&code).is_some(), "{} has no rates", currency.code);
        }
        assert!(is_supported("inr"));
        assert!(!is_supported("XYZ"));
    }
}
