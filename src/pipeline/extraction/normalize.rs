//! Lenient converters from document text to canonical values.
//!
//! Money and decimals arrive in Brazilian notation ("R$ 1.234,56", "150,5 ha");
//! dates arrive as dd/mm/yyyy with `/`, `.` or `-` separators. Converters
//! never fail loudly: unparseable money is 0, unparseable dates are `None`.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;

static BR_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})").expect("invalid date regex")
});

static PERCENT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("invalid percent regex"));

static CLIENT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s]+[_-]\s*").expect("invalid client prefix regex"));

/// Parse a Brazilian-notation amount. Thousands dots are dropped and the
/// decimal comma becomes a point. Returns 0.0 when nothing numeric remains.
pub fn parse_money(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '-'))
        .collect();
    let normalized = cleaned.replacen(',', ".", 1);
    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Parse an area or percentage. Accepts either decimal separator; a dot is
/// a thousands separator only when a comma is also present.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replacen(',', ".", 1)
    } else {
        cleaned
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse the first dd/mm/yyyy date in `raw`.
pub fn parse_br_date(raw: &str) -> Option<NaiveDate> {
    let caps = BR_DATE.captures(raw)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Brazilian date, then ISO `yyyy-mm-dd`, then today.
pub fn parse_date_or_today(raw: &str) -> NaiveDate {
    parse_br_date(raw)
        .or_else(|| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
        .unwrap_or_else(|| Local::now().date_naive())
}

/// Strip every non-digit character (masks, spaces, punctuation).
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// First number in a percentage cell, without the `%` sign: "80%" → "80".
/// Decimal commas are kept as written.
pub fn percent_value(raw: &str) -> Option<String> {
    PERCENT_NUMBER.find(raw).map(|m| m.as_str().to_string())
}

/// Drop a leading numeric code from a client label: "123 - JOÃO" → "JOÃO".
pub fn clean_client_name(raw: &str) -> String {
    CLIENT_PREFIX.replace(raw.trim(), "").trim().to_string()
}

/// Collapse runs of whitespace into single spaces.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_brazilian_notation() {
        assert_eq!(parse_money("R$ 1.234,56"), 1234.56);
        assert_eq!(parse_money("150,00"), 150.0);
        assert_eq!(parse_money("50.000,00"), 50000.0);
        assert_eq!(parse_money("1234"), 1234.0);
    }

    #[test]
    fn money_garbage_is_zero() {
        assert_eq!(parse_money(""), 0.0);
        assert_eq!(parse_money("R$ ---"), 0.0);
        assert_eq!(parse_money("abc"), 0.0);
    }

    #[test]
    fn decimal_accepts_both_separators() {
        assert_eq!(parse_decimal("150,5"), Some(150.5));
        assert_eq!(parse_decimal("150.5"), Some(150.5));
        assert_eq!(parse_decimal("1.250,75 ha"), Some(1250.75));
        assert_eq!(parse_decimal("ha"), None);
    }

    #[test]
    fn br_date_separators() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 15);
        assert_eq!(parse_br_date("15/03/2025"), expected);
        assert_eq!(parse_br_date("15.03.2025"), expected);
        assert_eq!(parse_br_date("15-03-2025"), expected);
        assert_eq!(parse_br_date("vence em 15/03/2025"), expected);
    }

    #[test]
    fn invalid_br_date_is_none() {
        assert_eq!(parse_br_date("31/02/2025"), None);
        assert_eq!(parse_br_date("sem data"), None);
    }

    #[test]
    fn date_fallbacks() {
        assert_eq!(
            parse_date_or_today("2025-04-01"),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
        );
        assert_eq!(parse_date_or_today("???"), Local::now().date_naive());
    }

    #[test]
    fn digits_only_strips_masks() {
        assert_eq!(digits_only("123.456.789-09"), "12345678909");
        assert_eq!(digits_only("(11) 98765-4321"), "11987654321");
    }

    #[test]
    fn percent_value_strips_sign() {
        assert_eq!(percent_value("80%").as_deref(), Some("80"));
        assert_eq!(percent_value(" 12,5 % ").as_deref(), Some("12,5"));
        assert_eq!(percent_value("—"), None);
    }

    #[test]
    fn client_name_prefix_removed() {
        assert_eq!(clean_client_name("123 - JOÃO SILVA"), "JOÃO SILVA");
        assert_eq!(clean_client_name("0042_MARIA SOUZA"), "MARIA SOUZA");
        assert_eq!(clean_client_name("JOÃO SILVA"), "JOÃO SILVA");
    }

    #[test]
    fn whitespace_collapsed() {
        assert_eq!(collapse_whitespace("  Fazenda \n Boa   Vista "), "Fazenda Boa Vista");
    }
}
