//! Currency conversion with remote rates and offline fallback.

mod catalog;
mod provider;
mod service;

pub use catalog::{find_currency, supported_currencies, Currency};
pub use provider::{HttpRateProvider, RateProvider};
pub use service::{CurrencyConversionResult, CurrencyService, ExchangeRates};
