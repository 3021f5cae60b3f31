//! Numeric token extraction and decimal separator handling.

use super::money::Amount;
use serde::{Deserialize, Serialize};

/// How to read `.` and `,` inside a number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimalStyle {
    /// Guess per token (see [`parse_number`]).
    #[default]
    Auto,
    /// `1,234.56`
    Point,
    /// `1.234,56`
    Comma,
}

/// Characters that only ever group digits.
const GROUP_ONLY: [char; 3] = ['\'', '\u{a0}', '\u{202f}'];

fn is_inner_separator(c: char) -> bool {
    c == '.' || c == ',' || GROUP_ONLY.contains(&c)
}

/// A run of digits and inner separators within a larger text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericToken<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// A single ASCII space groups digits when exactly three digits follow it,
/// as in `"1 250 000"`.
fn is_space_group(chars: &[(usize, char)], j: usize) -> bool {
    chars[j].1 == ' '
        && (1..=3).all(|k| chars.get(j + k).is_some_and(|n| n.1.is_ascii_digit()))
        && !chars.get(j + 4).is_some_and(|n| n.1.is_ascii_digit())
}

/// A `-` directly before the first number is a sign unless it follows a
/// word character (`"A-17"`).
fn is_leading_minus(chars: &[(usize, char)], i: usize) -> bool {
    i > 0 && chars[i - 1].1 == '-' && (i < 2 || !chars[i - 2].1.is_alphanumeric())
}

/// Finds every numeric token. A separator belongs to a token only when a
/// digit follows it, so `"10."` yields `"10"`. Only the first token may carry
/// a leading minus sign; later ones are separated by range dashes.
pub fn numeric_tokens(text: &str) -> Vec<NumericToken<'_>> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (mut start, c) = chars[i];
        if !c.is_ascii_digit() {
            i += 1;
            continue;
        }
        if tokens.is_empty() && is_leading_minus(&chars, i) {
            start = chars[i - 1].0;
        }

        let mut j = i + 1;
        while j < chars.len() {
            let c = chars[j].1;
            if c.is_ascii_digit() {
                j += 1;
            } else if is_space_group(&chars, j) {
                j += 4;
            } else if is_inner_separator(c) && chars.get(j + 1).is_some_and(|n| n.1.is_ascii_digit())
            {
                j += 2;
            } else {
                break;
            }
        }

        let end = chars.get(j).map_or(text.len(), |(idx, _)| *idx);
        tokens.push(NumericToken { text: &text[start..end], start, end });
        i = j;
    }

    tokens
}

/// Parses one numeric token into a fixed-point amount.
///
/// In [`DecimalStyle::Auto`]: with both `.` and `,` present the last one is
/// the decimal mark; a repeated separator groups; a single separator followed
/// by exactly three digits groups unless the integer part is `0`; anything
/// else is a decimal mark.
pub fn parse_number(token: &str, style: DecimalStyle) -> Option<Amount> {
    let (negative, token) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let cleaned: String = token.chars().filter(|c| !GROUP_ONLY.contains(c) && *c != ' ').collect();

    let decimal = match style {
        DecimalStyle::Point => Some('.'),
        DecimalStyle::Comma => Some(','),
        DecimalStyle::Auto => guess_decimal(&cleaned),
    };

    let (int_part, frac_part) = match decimal {
        Some(mark) => match cleaned.rfind(mark) {
            Some(pos) => (&cleaned[..pos], &cleaned[pos + 1..]),
            None => (cleaned.as_str(), ""),
        },
        None => (cleaned.as_str(), ""),
    };

    // The decimal mark may appear once; the other separator only groups.
    if let Some(mark) = decimal {
        if int_part.contains(mark) {
            return None;
        }
    }

    let int_digits: String = int_part.chars().filter(|c| *c != '.' && *c != ',').collect();
    let amount = Amount::from_digits(&int_digits, frac_part)?;
    Some(if negative { amount.negated() } else { amount })
}

fn guess_decimal(token: &str) -> Option<char> {
    let last_dot = token.rfind('.');
    let last_comma = token.rfind(',');

    match (last_dot, last_comma) {
        (None, None) => None,
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (Some(pos), None) | (None, Some(pos)) => {
            let mark = token.as_bytes()[pos] as char;
            if token.matches(mark).count() > 1 {
                return None;
            }
            let int_part = &token[..pos];
            let digits_after = token.len() - pos - 1;
            if digits_after == 3 && int_part != "0" && !int_part.is_empty() {
                None
            } else {
                Some(mark)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Option<Amount> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn test_numeric_tokens() {
        let tokens = numeric_tokens("$1,250 - $1,400.50 per month");
        let texts: Vec<_> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["1,250", "1,400.50"]);
        assert_eq!(&"$1,250 - $1,400.50 per month"[tokens[0].end..tokens[1].start], " - $");
    }

    #[test]
    fn test_numeric_tokens_trailing_separator() {
        let texts: Vec<_> = numeric_tokens("10. or 20,").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["10", "20"]);
    }

    #[test]
    fn test_numeric_tokens_unicode() {
        let texts: Vec<_> = numeric_tokens("€800–950").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["800", "950"]);

        let texts: Vec<_> = numeric_tokens("1\u{a0}250 €¹").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["1\u{a0}250"]);
    }

    #[test]
    fn test_numeric_tokens_space_grouping() {
        let texts: Vec<_> = numeric_tokens("1 250 000 €").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["1 250 000"]);

        let texts: Vec<_> = numeric_tokens("1 250,50 €").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["1 250,50"]);

        // Two spaces, or a group that is not three digits, split the number
        let texts: Vec<_> = numeric_tokens("2  100").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["2", "100"]);
        let texts: Vec<_> = numeric_tokens("3 beds 12 m2").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["3", "12", "2"]);
        let texts: Vec<_> = numeric_tokens("10 2500").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["10", "2500"]);
    }

    #[test]
    fn test_numeric_tokens_leading_minus() {
        let texts: Vec<_> = numeric_tokens("-2").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["-2"]);

        let texts: Vec<_> = numeric_tokens("floor -1").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["-1"]);

        // Range dashes and identifiers keep their numbers positive
        let texts: Vec<_> = numeric_tokens("800-950").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["800", "950"]);
        let texts: Vec<_> = numeric_tokens("$10 -$20").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["10", "20"]);
        let texts: Vec<_> = numeric_tokens("A-17").iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["17"]);
    }

    #[test]
    fn test_parse_number_auto() {
        assert_eq!(parse_number("1,250", DecimalStyle::Auto), amount("1250"));
        assert_eq!(parse_number("1.250", DecimalStyle::Auto), amount("1250"));
        assert_eq!(parse_number("29,99", DecimalStyle::Auto), amount("29.99"));
        assert_eq!(parse_number("29.99", DecimalStyle::Auto), amount("29.99"));
        assert_eq!(parse_number("1,234.56", DecimalStyle::Auto), amount("1234.56"));
        assert_eq!(parse_number("1.234,56", DecimalStyle::Auto), amount("1234.56"));
        assert_eq!(parse_number("1,234,567", DecimalStyle::Auto), amount("1234567"));
        assert_eq!(parse_number("0.995", DecimalStyle::Auto), amount("1.00"));
        assert_eq!(parse_number("1'250.5", DecimalStyle::Auto), amount("1250.50"));
        assert_eq!(parse_number("800", DecimalStyle::Auto), amount("800"));
        assert_eq!(parse_number("1 250", DecimalStyle::Auto), amount("1250"));
        assert_eq!(parse_number("1 250,50", DecimalStyle::Auto), amount("1250.50"));
    }

    #[test]
    fn test_parse_number_negative() {
        assert_eq!(parse_number("-2", DecimalStyle::Auto), amount("-2"));
        assert_eq!(parse_number("-1,5", DecimalStyle::Auto), amount("-1.50"));
        assert_eq!(parse_number("-", DecimalStyle::Auto), None);
    }

    #[test]
    fn test_parse_number_explicit_styles() {
        assert_eq!(parse_number("1.250", DecimalStyle::Point), amount("1.25"));
        assert_eq!(parse_number("1,250", DecimalStyle::Comma), amount("1.25"));
        assert_eq!(parse_number("1.234,56", DecimalStyle::Comma), amount("1234.56"));
        assert_eq!(parse_number("1,234.56", DecimalStyle::Point), amount("1234.56"));
    }

    #[test]
    fn test_parse_number_rejects_double_decimal() {
        assert_eq!(parse_number("1.234.5", DecimalStyle::Point), None);
        assert_eq!(parse_number("1,2,3", DecimalStyle::Comma), None);
    }
}
