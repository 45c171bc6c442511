// src/content/price.rs
//! `"<amount> <CODE>"` → `"<symbol><amount>"`, e.g. `"8.0 GBP"` → `"£8.0"`.

/// Known ISO codes and their display symbols.
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("GBP", "£"),
    ("EUR", "€"),
    ("USD", "$"),
    ("CAD", "C$"),
    ("AUD", "A$"),
    ("CHF", "CHF"),
    ("PLN", "zł"),
    ("CZK", "Kč"),
    ("SEK", "kr"),
    ("NOK", "kr"),
    ("DKK", "kr"),
];

pub fn currency_symbol(code: &str) -> Option<&'static str> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, s)| *s)
}

/// Replace a recognised trailing currency code with its symbol in front of
/// the amount. Anything unrecognised comes back unchanged.
pub fn format_price(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some((amount, code)) = trimmed.rsplit_once(char::is_whitespace) else {
        return raw.to_string();
    };
    let amount = amount.trim_end();
    if amount.is_empty() {
        return raw.to_string();
    }
    match currency_symbol(code) {
        Some(symbol) => format!("{symbol}{amount}"),
        None => raw.to_string(),
    }
}

/// `amount` + `code` from a listing record, formatted for display.
pub fn format_amount(amount: &str, code: &str) -> String {
    format_price(format!("{} {}", amount.trim(), code.trim()).trim())
}
