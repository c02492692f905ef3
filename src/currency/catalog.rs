//! The fixed set of supported currencies.

use std::sync::OnceLock;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Currency {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    pub flag: Option<&'static str>,
}

const fn currency(
    code: &'static str,
    name: &'static str,
    symbol: &'static str,
    flag: Option<&'static str>,
) -> Currency {
    Currency {
        code,
        name,
        symbol,
        flag,
    }
}

static CURRENCIES: OnceLock<Vec<Currency>> = OnceLock::new();

pub fn supported_currencies() -> &'static [Currency] {
    CURRENCIES.get_or_init(|| {
        vec![
            currency("USD", "US Dollar", "$", Some("🇺🇸")),
            currency("EUR", "Euro", "€", Some("🇪🇺")),
            currency("GBP", "British Pound", "£", Some("🇬🇧")),
            currency("JPY", "Japanese Yen", "¥", Some("🇯🇵")),
            currency("CHF", "Swiss Franc", "Fr", Some("🇨🇭")),
            currency("CAD", "Canadian Dollar", "C$", Some("🇨🇦")),
            currency("AUD", "Australian Dollar", "A$", Some("🇦🇺")),
            currency("NZD", "New Zealand Dollar", "NZ$", Some("🇳🇿")),
            currency("CNY", "Chinese Yuan", "¥", Some("🇨🇳")),
            currency("HKD", "Hong Kong Dollar", "HK$", Some("🇭🇰")),
            currency("SGD", "Singapore Dollar", "S$", Some("🇸🇬")),
            currency("KRW", "South Korean Won", "₩", Some("🇰🇷")),
            currency("INR", "Indian Rupee", "₹", Some("🇮🇳")),
            currency("BRL", "Brazilian Real", "R$", Some("🇧🇷")),
            currency("MXN", "Mexican Peso", "Mex$", Some("🇲🇽")),
            currency("SEK", "Swedish Krona", "kr", Some("🇸🇪")),
            currency("NOK", "Norwegian Krone", "kr", Some("🇳🇴")),
            currency("DKK", "Danish Krone", "kr", Some("🇩🇰")),
            currency("PLN", "Polish Zloty", "zł", Some("🇵🇱")),
            currency("ZAR", "South African Rand", "R", Some("🇿🇦")),
        ]
    })
}

pub fn find_currency(code: &str) -> Option<&'static Currency> {
    let upper = code.to_ascii_uppercase();
    supported_currencies().iter().find(|c| c.code == upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_upper_ascii_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for currency in supported_currencies() {
            assert_eq!(currency.code, currency.code.to_ascii_uppercase());
            assert_eq!(currency.code.len(), 3);
            assert!(seen.insert(currency.code));
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(find_currency("usd").is_some());
        assert!(find_currency("Usd").is_some());
        assert!(find_currency("XYZ").is_none());
    }
}
