use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Currency {
    pub code: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
}

const fn c(code: &'static str, symbol: &'static str, name: &'static str) -> Currency {
    Currency { code, symbol, name }
}

/// Display order matches the currency picker.
pub static CURRENCIES: &[Currency] = &[
    c("USD", "$", "US Dollar"),
    c("EUR", "€", "Euro"),
    c("GBP", "£", "British Pound"),
    c("CAD", "C$", "Canadian Dollar"),
    c("AUD", "A$", "Australian Dollar"),
    c("JPY", "¥", "Japanese Yen"),
    c("CHF", "CHF", "Swiss Franc"),
    c("CNY", "¥", "Chinese Yuan"),
    c("INR", "₹", "Indian Rupee"),
    c("KRW", "₩", "South Korean Won"),
    c("SGD", "S$", "Singapore Dollar"),
    c("HKD", "HK$", "Hong Kong Dollar"),
    c("NOK", "kr", "Norwegian Krone"),
    c("SEK", "kr", "Swedish Krona"),
    c("DKK", "kr", "Danish Krone"),
    c("PLN", "zł", "Polish Zloty"),
    c("CZK", "Kč", "Czech Koruna"),
    c("HUF", "Ft", "Hungarian Forint"),
    c("RUB", "₽", "Russian Ruble"),
    c("BRL", "R$", "Brazilian Real"),
    c("MXN", "$", "Mexican Peso"),
    c("ZAR", "R", "South African Rand"),
    c("TRY", "₺", "Turkish Lira"),
    c("ILS", "₪", "Israeli Shekel"),
    c("AED", "د.إ", "UAE Dirham"),
    c("SAR", "﷼", "Saudi Riyal"),
    c("EGP", "£", "Egyptian Pound"),
    c("THB", "฿", "Thai Baht"),
    c("MYR", "RM", "Malaysian Ringgit"),
    c("IDR", "Rp", "Indonesian Rupiah"),
    c("PHP", "₱", "Philippine Peso"),
    c("VND", "₫", "Vietnamese Dong"),
    c("NZD", "NZ$", "New Zealand Dollar"),
];

/// Exact, case-sensitive code match.
pub fn find_currency(code: &str) -> Option<&'static Currency> {
    CURRENCIES.iter().find(|c| c.code == code)
}

/// Symbol for `code`, or an empty string when the code is unknown.
pub fn currency_symbol(code: &str) -> &'static str {
    find_currency(code).map(|c| c.symbol).unwrap_or("")
}
