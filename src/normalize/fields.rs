//! Normalizers for non-price fields. Each returns `None` when the text
//! cannot be read as the target type.

use super::money::Amount;
use super::number::{numeric_tokens, parse_number, DecimalStyle};
use chrono::NaiveDate;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%B %d, %Y", "%d %B %Y"];

/// Trims and collapses internal whitespace. Fails if longer than `max_len` chars.
pub fn text(raw: &str, max_len: Option<usize>) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    match max_len {
        Some(max) if collapsed.chars().count() > max => None,
        _ => Some(collapsed),
    }
}

/// First number in the text, which must be whole (`"2 beds"`, `"1,200 sqft"`, `"3+"`, `"-1"`).
pub fn integer(raw: &str, style: DecimalStyle) -> Option<i64> {
    decimal(raw, style)?.as_whole()
}

/// First number in the text as a fixed-point amount.
pub fn decimal(raw: &str, style: DecimalStyle) -> Option<Amount> {
    let token = numeric_tokens(raw).into_iter().next()?;
    parse_number(token.text, style)
}

pub fn boolean(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Dates in ISO or common European/English layouts.
pub fn date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Case-insensitive membership in `allowed`; an empty list accepts anything.
pub fn category(raw: &str, allowed: &[String]) -> Option<String> {
    let value = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if value.is_empty() {
        return None;
    }
    if allowed.is_empty() || allowed.iter().any(|a| a.to_lowercase() == value) {
        Some(value)
    } else {
        None
    }
}

/// Absolute URL with a host.
pub fn url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw.trim()).ok()?;
    parsed.host_str()?;
    Some(parsed.to_string())
}
