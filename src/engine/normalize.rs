//! Value normalizers: currency amounts, employee ranges, years and counts.
//!
//! Each parser takes the raw page text and either produces a typed value or
//! a reason string the extractor records as a malformed-field outcome.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::Funding;

/// All normalized funding amounts are quoted in this currency.
pub const TARGET_CURRENCY: &str = "USD";

/// Ordered longest-prefix-first so "CN¥" wins over "¥" and "A$" over "$".
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("CN¥", "CNY"),
    ("HK$", "HKD"),
    ("A$", "AUD"),
    ("C$", "CAD"),
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("₹", "INR"),
    ("₣", "CHF"),
];

const MAGNITUDES: &[(&str, f64)] = &[("K", 1e3), ("M", 1e6), ("B", 1e9)];

/// Values the site renders where it has no data.
const SENTINELS: &[&str] = &["n/a", "unknown", "--", "—", ""];

/// Pure currency conversion, injected into the funding normalizer so tests
/// and callers control the rate source.
pub trait CurrencyConverter: Send + Sync {
    /// Convert `amount` from `from` to `to`, `None` when either code is
    /// unknown. Must be the identity (bit-for-bit) when `from == to`.
    fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64>;
}

/// Static rate table quoted as USD per one unit of each currency.
pub struct FixedRateConverter {
    usd_per_unit: HashMap<&'static str, f64>,
}

impl Default for FixedRateConverter {
    fn default() -> Self {
        let usd_per_unit = HashMap::from([
            ("USD", 1.0),
            ("EUR", 1.08),
            ("GBP", 1.27),
            ("JPY", 0.0067),
            ("CNY", 0.14),
            ("INR", 0.012),
            ("AUD", 0.66),
            ("CAD", 0.73),
            ("HKD", 0.128),
            ("CHF", 1.13),
        ]);
        Self { usd_per_unit }
    }
}

impl CurrencyConverter for FixedRateConverter {
    fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(amount);
        }
        let from_rate = self.usd_per_unit.get(from)?;
        let to_rate = self.usd_per_unit.get(to)?;
        Some(amount * from_rate / to_rate)
    }
}

/// Split a raw amount string into (currency code, remainder). Defaults to
/// USD when no known symbol prefixes the string.
pub fn detect_currency(raw: &str) -> (&'static str, &str) {
    let trimmed = raw.trim();
    for (symbol, code) in CURRENCY_SYMBOLS {
        if let Some(rest) = trimmed.strip_prefix(symbol) {
            return (code, rest.trim_start());
        }
    }
    ("USD", trimmed)
}

/// Parse an amount like "$5M", "CN¥100K" or "€1,500,000" into a numeric
/// value plus the detected currency code.
pub fn parse_money(raw: &str) -> Result<(f64, String), String> {
    let trimmed = raw.trim();
    if SENTINELS.contains(&trimmed.to_lowercase().as_str()) {
        return Err("placeholder value".to_string());
    }

    let (code, rest) = detect_currency(trimmed);
    let mut cleaned = rest.replace(',', "");

    let mut multiplier = 1.0;
    for (suffix, mult) in MAGNITUDES {
        if let Some(stripped) = cleaned
            .strip_suffix(suffix)
            .or_else(|| cleaned.strip_suffix(&suffix.to_lowercase()))
        {
            multiplier = *mult;
            cleaned = stripped.trim_end().to_string();
            break;
        }
    }

    let amount: f64 = cleaned
        .trim()
        .parse()
        .map_err(|_| format!("unparseable amount '{raw}'"))?;
    Ok((amount * multiplier, code.to_string()))
}

/// Normalize a raw funding string into the target currency, keeping the
/// original currency code on the record.
pub fn normalize_funding(raw: &str, fx: &dyn CurrencyConverter) -> Result<Funding, String> {
    let (amount, code) = parse_money(raw)?;
    let converted = fx
        .convert(amount, &code, TARGET_CURRENCY)
        .ok_or_else(|| format!("no conversion rate for '{code}'"))?;
    Ok(Funding {
        amount: converted,
        currency: code,
    })
}

static EMPLOYEE_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,6}(\s*[-–]\s*\d{1,6})?\+?$").expect("employee range pattern is valid")
});

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(1[89]\d{2}|20\d{2})\b").expect("year pattern is valid"));

/// Validate an employee-count range like "11-50" or "10001+". The value is
/// kept as displayed; only its shape is checked.
pub fn parse_employee_range(raw: &str) -> Result<String, String> {
    let cleaned = raw.trim().replace(',', "");
    if EMPLOYEE_RANGE_RE.is_match(&cleaned) {
        Ok(cleaned)
    } else {
        Err(format!("unrecognized employee range '{raw}'"))
    }
}

/// Pull the year out of a founded date like "Jan 1, 2015" or "2015".
pub fn parse_founded_year(raw: &str) -> Result<i32, String> {
    YEAR_RE
        .find_iter(raw)
        .last()
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| format!("no year in '{raw}'"))
}

/// Parse an integer count, tolerating thousands separators.
pub fn parse_count(raw: &str) -> Result<u32, String> {
    raw.trim()
        .replace(',', "")
        .parse()
        .map_err(|_| format!("not a count: '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("$5M", 5_000_000.0, "USD")]
    #[case("$1.5M", 1_500_000.0, "USD")]
    #[case("CN¥100K", 100_000.0, "CNY")]
    #[case("€2B", 2_000_000_000.0, "EUR")]
    #[case("£750k", 750_000.0, "GBP")]
    #[case("1,500,000", 1_500_000.0, "USD")]
    #[case("A$3M", 3_000_000.0, "AUD")]
    #[case("HK$9M", 9_000_000.0, "HKD")]
    fn parses_amounts_with_symbols_and_magnitudes(
        #[case] raw: &str,
        #[case] amount: f64,
        #[case] code: &str,
    ) {
        let (parsed, parsed_code) = parse_money(raw).unwrap();
        assert!((parsed - amount).abs() < 1e-6, "{raw}: got {parsed}");
        assert_eq!(parsed_code, code);
    }

    #[rstest]
    #[case("n/a")]
    #[case("Unknown")]
    #[case("--")]
    #[case("")]
    #[case("lots of money")]
    fn rejects_sentinels_and_garbage(#[case] raw: &str) {
        assert!(parse_money(raw).is_err());
    }

    #[test]
    fn identity_conversion_is_exact() {
        let fx = FixedRateConverter::default();
        let amount = 1234.5678901;
        // from == to must return the identical value, not a round trip
        // through the rate table.
        assert_eq!(fx.convert(amount, "USD", "USD"), Some(amount));
        assert_eq!(fx.convert(amount, "EUR", "EUR"), Some(amount));
    }

    #[test]
    fn funding_is_converted_but_keeps_the_original_code() {
        let fx = FixedRateConverter::default();
        let funding = normalize_funding("€1M", &fx).unwrap();
        assert_eq!(funding.currency, "EUR");
        assert!((funding.amount - 1_080_000.0).abs() < 1.0);

        let usd = normalize_funding("$5M", &fx).unwrap();
        assert_eq!(usd.currency, "USD");
        assert_eq!(usd.amount, 5_000_000.0);
    }

    #[test]
    fn unknown_currency_code_is_a_malformed_value_not_a_panic() {
        struct NoRates;
        impl CurrencyConverter for NoRates {
            fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
                (from == to).then_some(amount)
            }
        }
        let err = normalize_funding("€1M", &NoRates).unwrap_err();
        assert!(err.contains("EUR"));
    }

    #[rstest]
    #[case("11-50", "11-50")]
    #[case("10,001+", "10001+")]
    #[case(" 251 - 500 ", "251 - 500")]
    fn accepts_employee_ranges(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(parse_employee_range(raw).unwrap(), expected);
    }

    #[test]
    fn rejects_non_range_employee_text() {
        assert!(parse_employee_range("many").is_err());
    }

    #[rstest]
    #[case("Jan 1, 2015", 2015)]
    #[case("2009", 2009)]
    #[case("Founded Dec 2021", 2021)]
    fn extracts_founded_year(#[case] raw: &str, #[case] year: i32) {
        assert_eq!(parse_founded_year(raw).unwrap(), year);
    }

    #[test]
    fn counts_tolerate_separators() {
        assert_eq!(parse_count("1,204").unwrap(), 1_204);
        assert!(parse_count("a few").is_err());
    }
}
