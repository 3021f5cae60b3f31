//! Price parsing as a chain of rules tried in priority order.

use super::money::{Amount, Currency, Price};
use super::number::{numeric_tokens, parse_number, DecimalStyle, NumericToken};
use super::{NormalizerConfig, RangePolicy};
use std::collections::BTreeMap;
use tracing::trace;

/// Built-in currency symbols. Longer symbols come first so `US$` wins over `$`.
const SYMBOLS: &[(&str, &str)] = &[
    ("US$", "USD"),
    ("C$", "CAD"),
    ("A$", "AUD"),
    ("R$", "BRL"),
    ("zł", "PLN"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("₹", "INR"),
    ("$", "USD"),
];

/// Well-known ISO codes, recognised anywhere in the text. Any other
/// three-letter uppercase word counts only when it sits next to an amount.
const CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CAD", "AUD", "CHF", "SEK", "NOK", "DKK", "PLN", "BRL", "MXN",
    "INR", "CZK", "HUF",
];

const RANGE_SEPARATORS: &[&str] = &["-", "–", "—", "~", "to"];

/// Amounts matched by a rule, before the range policy is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceMatch {
    Single(Amount),
    Range(Amount, Amount),
}

/// A single price parsing strategy.
pub trait PriceRule: Send + Sync {
    /// Returns a match, or `None` if this rule does not apply.
    fn apply(&self, text: &str, tokens: &[NumericToken<'_>], style: DecimalStyle)
        -> Option<PriceMatch>;

    /// Short name used in traces.
    fn name(&self) -> &'static str;
}

/// Two amounts joined by a range separator, e.g. `"€800–950"`.
pub struct RangeRule;

impl PriceRule for RangeRule {
    fn apply(
        &self,
        text: &str,
        tokens: &[NumericToken<'_>],
        style: DecimalStyle,
    ) -> Option<PriceMatch> {
        let [first, second, ..] = tokens else {
            return None;
        };

        if !is_range_gap(&text[first.end..second.start]) {
            return None;
        }

        let low = parse_number(first.text, style)?;
        let high = parse_number(second.text, style)?;
        Some(PriceMatch::Range(low, high))
    }

    fn name(&self) -> &'static str {
        "range"
    }
}

/// The first amount in the text; anything after it is ignored.
pub struct AmountRule;

impl PriceRule for AmountRule {
    fn apply(
        &self,
        _text: &str,
        tokens: &[NumericToken<'_>],
        style: DecimalStyle,
    ) -> Option<PriceMatch> {
        let first = tokens.first()?;
        parse_number(first.text, style).map(PriceMatch::Single)
    }

    fn name(&self) -> &'static str {
        "amount"
    }
}

fn is_code(word: &str) -> bool {
    word.len() == 3 && word.bytes().all(|b| b.is_ascii_uppercase())
}

/// Drops a currency code at either end of a range gap (`"EUR - "`, `" - NZD"`).
fn strip_codes(core: &str) -> &str {
    let core = core.get(..3).filter(|p| is_code(p)).map_or(core, |_| &core[3..]);
    match core.len().checked_sub(3).and_then(|at| core.get(at..).map(|s| (at, s))) {
        Some((at, suffix)) if is_code(suffix) => &core[..at],
        _ => core,
    }
}

fn is_range_gap(gap: &str) -> bool {
    let mut core: String = gap.chars().filter(|c| !c.is_whitespace()).collect();
    for (symbol, _) in SYMBOLS {
        core = core.replace(symbol, "");
    }
    let core = strip_codes(&core).to_lowercase();
    RANGE_SEPARATORS.contains(&core.as_str())
}

/// True when only whitespace separates `text[start..end]` from a digit.
fn next_to_amount(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].trim_end().ends_with(|c: char| c.is_ascii_digit());
    let after = text[end..].trim_start().starts_with(|c: char| c.is_ascii_digit());
    before || after
}

/// Ordered set of price rules plus the currency lookup table.
pub struct PriceParser {
    rules: Vec<Box<dyn PriceRule>>,
    symbols: Vec<(String, Currency)>,
    default_currency: Currency,
    style: DecimalStyle,
    range_policy: RangePolicy,
}

impl PriceParser {
    /// Builds the default rule chain for a configuration.
    ///
    /// Symbol overrides replace built-in mappings and may add new symbols.
    pub fn new(config: &NormalizerConfig, default_currency: Currency) -> Self {
        let mut table: BTreeMap<String, Currency> = SYMBOLS
            .iter()
            .filter_map(|(s, c)| Currency::new(c).map(|c| (s.to_string(), c)))
            .collect();
        for (symbol, code) in &config.symbols {
            table.insert(symbol.clone(), code.clone());
        }

        let mut symbols: Vec<(String, Currency)> = table.into_iter().collect();
        symbols.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));

        Self {
            rules: vec![Box::new(RangeRule), Box::new(AmountRule)],
            symbols,
            default_currency,
            style: config.decimal_style,
            range_policy: config.range_policy,
        }
    }

    /// Parses a price, or returns `None` when no rule matches.
    pub fn parse(&self, text: &str) -> Option<Price> {
        let tokens = numeric_tokens(text);
        if tokens.is_empty() {
            return None;
        }

        let matched = self.rules.iter().find_map(|rule| {
            let m = rule.apply(text, &tokens, self.style);
            if m.is_some() {
                trace!(rule = rule.name(), "price rule matched");
            }
            m
        })?;

        let currency = self.detect_currency(text).unwrap_or_else(|| self.default_currency.clone());

        Some(match matched {
            PriceMatch::Single(amount) => Price::simple(amount, currency),
            PriceMatch::Range(a, b) => match self.range_policy {
                RangePolicy::LowerBound => Price::simple(a.min(b), currency),
                RangePolicy::Both => Price::range(a, b, currency),
            },
        })
    }

    /// Finds an explicit currency symbol or ISO code in the text.
    pub fn detect_currency(&self, text: &str) -> Option<Currency> {
        let mut words = Vec::new();
        let mut start = None;
        for (i, c) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
            match (start, c.is_ascii_alphabetic()) {
                (None, true) => start = Some(i),
                (Some(s), false) => {
                    words.push((s, i));
                    start = None;
                }
                _ => {}
            }
        }

        let code = words.iter().find(|(s, e)| {
            let word = &text[*s..*e];
            is_code(word) && (CODES.contains(&word) || next_to_amount(text, *s, *e))
        });
        if let Some((s, e)) = code {
            return Currency::new(&text[*s..*e]);
        }

        self.symbols
            .iter()
            .find(|(symbol, _)| text.contains(symbol.as_str()))
            .map(|(_, currency)| currency.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PriceParser {
        parser_with(NormalizerConfig::default())
    }

    fn parser_with(config: NormalizerConfig) -> PriceParser {
        let default = Currency::new(&config.default_currency).unwrap();
        PriceParser::new(&config, default)
    }

    fn price(s: &str) -> String {
        parser().parse(s).map(|p| p.to_string()).unwrap_or_else(|| "unparseable".to_string())
    }

    #[test]
    fn test_parse_simple_prices() {
        assert_eq!(price("$1,250"), "1250.00 USD");
        assert_eq!(price("29,99 €"), "29.99 EUR");
        assert_eq!(price("£29.99"), "29.99 GBP");
        assert_eq!(price("¥2,999"), "2999.00 JPY");
        assert_eq!(price("1.234,56 EUR"), "1234.56 EUR");
        assert_eq!(price("CHF 1'250.50"), "1250.50 CHF");
    }

    #[test]
    fn test_default_currency_when_absent() {
        assert_eq!(price("1250"), "1250.00 USD");

        let config = NormalizerConfig { default_currency: "EUR".to_string(), ..Default::default() };
        let p = parser_with(config).parse("800").unwrap();
        assert_eq!(p.currency.code(), "EUR");
    }

    #[test]
    fn test_explicit_symbol_overrides_default() {
        let config = NormalizerConfig { default_currency: "EUR".to_string(), ..Default::default() };
        let p = parser_with(config).parse("$5").unwrap();
        assert_eq!(p.currency.code(), "USD");
    }

    #[test]
    fn test_longer_symbols_win() {
        assert_eq!(price("C$ 15"), "15.00 CAD");
        assert_eq!(price("US$15"), "15.00 USD");
        assert_eq!(price("R$ 99,90"), "99.90 BRL");
    }

    #[test]
    fn test_symbol_override() {
        let mut config = NormalizerConfig::default();
        config.symbols.insert("$".to_string(), Currency::new("CAD").unwrap());
        config.symbols.insert("kr".to_string(), Currency::new("SEK").unwrap());
        let parser = parser_with(config);

        assert_eq!(parser.parse("$10").unwrap().currency.code(), "CAD");
        assert_eq!(parser.parse("99 kr").unwrap().currency.code(), "SEK");
        assert_eq!(parser.parse("US$10").unwrap().currency.code(), "USD");
    }

    #[test]
    fn test_range_lower_bound() {
        assert_eq!(price("€800–950"), "800.00 EUR");
        assert_eq!(price("$10 - $20"), "10.00 USD");
        assert_eq!(price("10 to 20 GBP"), "10.00 GBP");
    }

    #[test]
    fn test_range_both_bounds() {
        let config = NormalizerConfig { range_policy: RangePolicy::Both, ..Default::default() };
        let parser = parser_with(config);

        assert_eq!(parser.parse("€800–950").unwrap().to_string(), "800.00-950.00 EUR");
        assert_eq!(parser.parse("$20 - $10").unwrap().to_string(), "10.00-20.00 USD");
    }

    #[test]
    fn test_footnotes_ignored() {
        assert_eq!(price("$1,250*"), "1250.00 USD");
        assert_eq!(price("$1,250¹"), "1250.00 USD");
        assert_eq!(price("$1,250 [2]"), "1250.00 USD");
        assert_eq!(price("  $ 1,250 † "), "1250.00 USD");
    }

    #[test]
    fn test_not_a_range() {
        // Two numbers without a range separator: the first one wins
        assert_eq!(price("$1,250 (3 months)"), "1250.00 USD");
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(price("Price on request"), "unparseable");
        assert_eq!(price("See price in cart"), "unparseable");
        assert_eq!(price("€"), "unparseable");
    }

    #[test]
    fn test_any_code_next_to_amount() {
        assert_eq!(price("500 NZD"), "500.00 NZD");
        assert_eq!(price("ZAR 1 250"), "1250.00 ZAR");
        assert_eq!(price("10 NZD - 20 NZD"), "10.00 NZD");

        // Unknown uppercase words away from the amount are not currencies
        assert_eq!(price("NEW listing: 500"), "500.00 USD");
    }

    #[test]
    fn test_space_grouped_thousands() {
        assert_eq!(price("1 250 €"), "1250.00 EUR");
        assert_eq!(price("1 250,50 €"), "1250.50 EUR");
        assert_eq!(price("€ 1 250 000"), "1250000.00 EUR");
    }

    #[test]
    fn test_negative_amount() {
        assert_eq!(price("-5"), "-5.00 USD");
        assert_eq!(price("800-950 EUR"), "800.00 EUR");
    }

    #[test]
    fn test_lowercase_code_is_not_currency() {
        // "eur" inside a word should not be picked up as a code
        assert_eq!(price("10 euros"), "10.00 USD");
    }
}
