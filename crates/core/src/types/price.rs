//! Type-safe price representation using decimal arithmetic.
//!
//! The shop sells in Indian Rupees, so [`CurrencyCode::INR`] is the default and
//! amounts are grouped the Indian way (`₹1,23,456.00`: the last three digits,
//! then pairs).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Amount in the currency's standard unit (rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in Indian Rupees.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Format with symbol and two decimals, e.g. `₹24,999.00`.
    #[must_use]
    pub fn format(&self) -> String {
        self.format_with(2)
    }

    /// Format with symbol and no decimals, e.g. `₹2,08,299`.
    #[must_use]
    pub fn format_whole(&self) -> String {
        self.format_with(0)
    }

    /// Format without the currency symbol, for input fields.
    #[must_use]
    pub fn format_plain(&self) -> String {
        group_digits(self.amount, 2, self.currency_code.grouping())
    }

    fn format_with(&self, decimals: u32) -> String {
        let body = group_digits(self.amount, decimals, self.currency_code.grouping());
        match body.strip_prefix('-') {
            Some(rest) => format!("-{}{rest}", self.currency_code.symbol()),
            None => format!("{}{body}", self.currency_code.symbol()),
        }
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::inr(Decimal::ZERO)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

/// How digits left of the decimal point are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grouping {
    /// 12,34,567
    Indian,
    /// 1,234,567
    Thousands,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    const fn grouping(self) -> Grouping {
        match self {
            Self::INR => Grouping::Indian,
            Self::USD | Self::EUR | Self::GBP => Grouping::Thousands,
        }
    }
}

/// Parse a displayed currency string back into an amount.
///
/// Currency symbols, commas and whitespace are ignored. Anything that still
/// fails to parse yields zero.
///
/// ```
/// use dream_collections_core::types::price::parse_currency;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_currency("₹1,23,456.50"), Decimal::new(12_345_650, 2));
/// assert_eq!(parse_currency("n/a"), Decimal::ZERO);
/// ```
#[must_use]
pub fn parse_currency(input: &str) -> Decimal {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<Decimal>().unwrap_or(Decimal::ZERO)
}

/// Whole-number percentage saved going from `original` to `discounted`.
///
/// Returns 0 unless `0 < discounted < original`.
#[must_use]
pub fn discount_percentage(original: Decimal, discounted: Decimal) -> u32 {
    if original <= Decimal::ZERO || discounted <= Decimal::ZERO || discounted >= original {
        return 0;
    }
    let pct = (original - discounted) / original * Decimal::ONE_HUNDRED;
    pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

/// Format a price range such as `₹1,082.50 - ₹3,332.50`.
///
/// Missing or zero bounds collapse the range: nothing at all yields an empty
/// string, and a missing or equal maximum yields just the minimum.
#[must_use]
pub fn format_price_range(min: Option<Decimal>, max: Option<Decimal>) -> String {
    let min = min.filter(|m| !m.is_zero());
    let max = max.filter(|m| !m.is_zero());
    match (min, max) {
        (None, None) => String::new(),
        (min, None) => Price::inr(min.unwrap_or_default()).format(),
        (Some(min), Some(max)) if min == max => Price::inr(min).format(),
        (min, Some(max)) => format!(
            "{} - {}",
            Price::inr(min.unwrap_or_default()).format(),
            Price::inr(max).format()
        ),
    }
}

fn group_digits(amount: Decimal, decimals: u32, grouping: Grouping) -> String {
    let rounded = amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let precision = usize::try_from(decimals).unwrap_or(2);
    let text = format!("{:.*}", precision, rounded.abs());

    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_owned(), Some(f.to_owned())),
        None => (text, None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut groups: Vec<String> = Vec::new();
    let mut end = digits.len();

    let first = end.min(3);
    groups.push(digits.iter().skip(end - first).take(first).collect());
    end -= first;

    let step = match grouping {
        Grouping::Indian => 2,
        Grouping::Thousands => 3,
    };
    while end > 0 {
        let take = end.min(step);
        groups.push(digits.iter().skip(end - take).take(take).collect());
        end -= take;
    }
    groups.reverse();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&groups.join(","));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(&frac);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_indian_grouping() {
        assert_eq!(Price::inr(dec("208299")).format(), "₹2,08,299.00");
        assert_eq!(Price::inr(dec("16649.5")).format(), "₹16,649.50");
        assert_eq!(Price::inr(dec("12345678.9")).format(), "₹1,23,45,678.90");
        assert_eq!(Price::inr(dec("999")).format(), "₹999.00");
        assert_eq!(Price::inr(Decimal::ZERO).format(), "₹0.00");
    }

    #[test]
    fn test_format_whole_rounds_half_up() {
        assert_eq!(Price::inr(dec("1082.50")).format_whole(), "₹1,083");
        assert_eq!(Price::inr(dec("74999.00")).format_whole(), "₹74,999");
    }

    #[test]
    fn test_format_other_currency_uses_thousands() {
        let price = Price::new(dec("1234567.5"), CurrencyCode::USD);
        assert_eq!(price.format(), "$1,234,567.50");
    }

    #[test]
    fn test_format_negative() {
        assert_eq!(Price::inr(dec("-1500")).format(), "-₹1,500.00");
    }

    #[test]
    fn test_format_plain() {
        assert_eq!(Price::inr(dec("24999")).format_plain(), "24,999.00");
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("₹ 24,999.00"), dec("24999.00"));
        assert_eq!(parse_currency(""), Decimal::ZERO);
        assert_eq!(parse_currency("abc"), Decimal::ZERO);
    }

    #[test]
    fn test_discount_percentage() {
        assert_eq!(discount_percentage(dec("1000"), dec("750")), 25);
        assert_eq!(discount_percentage(dec("3"), dec("2")), 33);
        assert_eq!(discount_percentage(dec("1000"), dec("1000")), 0);
        assert_eq!(discount_percentage(dec("1000"), dec("1200")), 0);
        assert_eq!(discount_percentage(Decimal::ZERO, dec("10")), 0);
        assert_eq!(discount_percentage(dec("10"), Decimal::ZERO), 0);
    }

    #[test]
    fn test_format_price_range() {
        assert_eq!(format_price_range(None, None), "");
        assert_eq!(format_price_range(Some(dec("1082.5")), None), "₹1,082.50");
        assert_eq!(
            format_price_range(Some(dec("100")), Some(dec("100"))),
            "₹100.00"
        );
        assert_eq!(
            format_price_range(Some(dec("1082.5")), Some(dec("3332.5"))),
            "₹1,082.50 - ₹3,332.50"
        );
    }
}
