//! Money amount parsing.
//!
//! Turns platform text such as `"€1,234"`, `"1 234 EUR"`, `"5k EUR"` or the
//! two-span markup `<span>1,234</span><span>EUR</span>` into an ISO-4217 code
//! plus a decimal string in major units. Parsing never fails: text that
//! matches no pattern yields a [`ParsedAmount`] with both fields unset.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// A number, optionally with comma / space / no-break-space thousands groups.
const NUMBER: &str = r"\d{1,3}(?:[,\u{a0}\u{202f} ]\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?";

static NESTED_SPANS: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"<span[^>]*>\s*({NUMBER})(?:\s*([kK])\b)?\s*</span>\s*<span[^>]*>\s*([A-Za-z]{{2,3}})\s*</span>"
    ))
});

static AMOUNT_THEN_CODE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"({NUMBER})(?:\s*([kK])\b)?\s*([A-Z]{{3}}|kr|Kr|KR)\b"
    ))
});

static SYMBOL_THEN_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"(AU\$|A\$|CA\$|C\$|NZ\$|US\$|€|\$|£|¥|₹)\s*({NUMBER})(?:\s*([kK])\b)?"
    ))
});

static COUNT: Lazy<Regex> = Lazy::new(|| compile(&format!(r"({NUMBER})(?:\s*([kK])\b)?")));

static TAGS: Lazy<Regex> = Lazy::new(|| compile(r"<[^>]*>"));

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("amount pattern is valid")
}

/// Result of parsing one amount.
///
/// `currency_code` and `amount_major_units` are either both set or both unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAmount {
    /// ISO-4217 code
    pub currency_code: Option<String>,
    /// Decimal string in major units, without thousands separators
    pub amount_major_units: Option<String>,
    /// Matched text, or the whole input when nothing matched
    pub raw_match_text: String,
}

impl ParsedAmount {
    fn not_found(text: &str) -> Self {
        Self {
            currency_code: None,
            amount_major_units: None,
            raw_match_text: text.to_string(),
        }
    }

    /// Whether a currency and amount were recognised.
    #[must_use]
    pub fn is_found(&self) -> bool {
        self.currency_code.is_some()
    }
}

/// Parse an amount-raised string. A `k` suffix is not expanded.
#[must_use]
pub fn parse_raised(text: &str) -> ParsedAmount {
    parse(text, false)
}

/// Parse a goal string. A `k` suffix multiplies by 1000, and anything after
/// a `·` or `•` separator is ignored.
#[must_use]
pub fn parse_target(text: &str) -> ParsedAmount {
    let head = text.split(['·', '•']).next().unwrap_or(text);
    let mut parsed = parse(head, true);
    if !parsed.is_found() {
        parsed.raw_match_text = text.to_string();
    }
    parsed
}

/// Parse a donation count such as `"1,234 donations"` or `"1.2K donations"`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_count(text: &str) -> Option<u64> {
    let text = strip_tags(text);
    let caps = COUNT.captures(&text)?;
    let value = parse_number(caps.get(1)?.as_str())?;
    let value = if caps.get(2).is_some() {
        value * 1000.0
    } else {
        value
    };
    Some(value.round() as u64)
}

/// Format a major-unit value, dropping a zero fraction (`1234.0` → `"1234"`).
#[must_use]
pub fn format_major_units(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}")
}

/// Convert minor units (cents) to a major-unit decimal string.
#[must_use]
pub fn format_minor_units(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let minor = minor.unsigned_abs();
    let (major, cents) = (minor / 100, minor % 100);
    match cents {
        0 => format!("{sign}{major}"),
        c if c % 10 == 0 => format!("{sign}{major}.{}", c / 10),
        c => format!("{sign}{major}.{c:02}"),
    }
}

fn parse(text: &str, expand_k: bool) -> ParsedAmount {
    if let Some(parsed) = match_nested_spans(text, expand_k) {
        return parsed;
    }

    let plain = strip_tags(text);
    if let Some(parsed) = match_amount_then_code(&plain, expand_k) {
        return parsed;
    }
    if let Some(parsed) = match_symbol_then_amount(&plain, expand_k) {
        return parsed;
    }

    ParsedAmount::not_found(text)
}

fn match_nested_spans(html: &str, expand_k: bool) -> Option<ParsedAmount> {
    NESTED_SPANS.captures_iter(html).find_map(|caps| {
        let code = code_to_iso(caps.get(3)?.as_str())?;
        build(&caps, 1, 2, code, expand_k)
    })
}

fn match_amount_then_code(text: &str, expand_k: bool) -> Option<ParsedAmount> {
    AMOUNT_THEN_CODE.captures_iter(text).find_map(|caps| {
        if continues_number(&text[..caps.get(1)?.start()]) {
            return None;
        }
        let code = code_to_iso(caps.get(3)?.as_str())?;
        build(&caps, 1, 2, code, expand_k)
    })
}

fn match_symbol_then_amount(text: &str, expand_k: bool) -> Option<ParsedAmount> {
    let caps = SYMBOL_THEN_AMOUNT.captures(text)?;
    let code = symbol_to_iso(caps.get(1)?.as_str())?;
    build(&caps, 2, 3, code.to_string(), expand_k)
}

fn build(
    caps: &Captures<'_>,
    number_group: usize,
    k_group: usize,
    code: String,
    expand_k: bool,
) -> Option<ParsedAmount> {
    let mut value = parse_number(caps.get(number_group)?.as_str())?;
    if expand_k && caps.get(k_group).is_some() {
        value *= 1000.0;
    }
    Some(ParsedAmount {
        currency_code: Some(code),
        amount_major_units: Some(format_major_units(value)),
        raw_match_text: caps.get(0)?.as_str().to_string(),
    })
}

/// Whether a match starting after `before` would be the tail of a longer
/// number, as `34` is in `12,34`.
fn continues_number(before: &str) -> bool {
    before
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_digit() || c == ',')
}

fn parse_number(raw: &str) -> Option<f64> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    digits.parse().ok()
}

fn strip_tags(text: &str) -> String {
    TAGS.replace_all(text, " ").replace("&nbsp;", " ")
}

/// Map a currency word or code token to ISO-4217.
fn code_to_iso(token: &str) -> Option<String> {
    match token {
        "kr" | "Kr" | "KR" => Some("SEK".to_string()),
        t if t.len() == 3 && t.chars().all(|c| c.is_ascii_uppercase()) => Some(t.to_string()),
        _ => None,
    }
}

/// Map a currency symbol to ISO-4217.
fn symbol_to_iso(symbol: &str) -> Option<&'static str> {
    match symbol {
        "€" => Some("EUR"),
        "$" | "US$" => Some("USD"),
        "£" => Some("GBP"),
        "¥" => Some("JPY"),
        "₹" => Some("INR"),
        "A$" | "AU$" => Some("AUD"),
        "C$" | "CA$" => Some("CAD"),
        "NZ$" => Some("NZD"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(parsed: &ParsedAmount) -> (Option<&str>, Option<&str>) {
        (
            parsed.currency_code.as_deref(),
            parsed.amount_major_units.as_deref(),
        )
    }

    #[test]
    fn test_separator_styles_agree() {
        for text in [
            "€1,234",
            "€1234",
            "1234 EUR",
            "1 234 EUR",
            "1,234 EUR",
            "1\u{a0}234 EUR",
            "<span>1,234</span><span>EUR</span>",
            "<span class=\"a\">1 234</span> <span class=\"b\">EUR</span>",
        ] {
            assert_eq!(
                pair(&parse_raised(text)),
                (Some("EUR"), Some("1234")),
                "input: {text}"
            );
        }
    }

    #[test]
    fn test_target_k_suffix_matches_explicit_thousands() {
        assert_eq!(pair(&parse_target("5k EUR")), (Some("EUR"), Some("5000")));
        assert_eq!(pair(&parse_target("5 000 EUR")), (Some("EUR"), Some("5000")));
        assert_eq!(pair(&parse_target("€5K")), (Some("EUR"), Some("5000")));
        assert_eq!(pair(&parse_target("$2.5k goal")), (Some("USD"), Some("2500")));
    }

    #[test]
    fn test_raised_ignores_k_suffix() {
        assert_eq!(pair(&parse_raised("5k EUR")), (Some("EUR"), Some("5")));
    }

    #[test]
    fn test_kr_maps_to_sek() {
        assert_eq!(pair(&parse_raised("50 kr")), (Some("SEK"), Some("50")));
        assert_eq!(pair(&parse_raised("1 500 KR")), (Some("SEK"), Some("1500")));
    }

    #[test]
    fn test_symbols() {
        assert_eq!(pair(&parse_raised("$50")), (Some("USD"), Some("50")));
        assert_eq!(pair(&parse_raised("£12.50 raised")), (Some("GBP"), Some("12.5")));
        assert_eq!(pair(&parse_raised("A$300")), (Some("AUD"), Some("300")));
        assert_eq!(pair(&parse_raised("CA$1,000")), (Some("CAD"), Some("1000")));
        assert_eq!(pair(&parse_raised("NZ$ 75")), (Some("NZD"), Some("75")));
    }

    #[test]
    fn test_unknown_uppercase_code_passes_through() {
        assert_eq!(pair(&parse_raised("2,000 CHF")), (Some("CHF"), Some("2000")));
    }

    #[test]
    fn test_nested_spans_win_over_text() {
        let html = "<div>$9 <span>1,234</span><span>EUR</span></div>";
        let parsed = parse_raised(html);
        assert_eq!(pair(&parsed), (Some("EUR"), Some("1234")));
        assert!(parsed.raw_match_text.starts_with("<span>"));
    }

    #[test]
    fn test_target_truncated_at_separator() {
        let parsed = parse_target("€10,000 goal · 120 donations 30 USD");
        assert_eq!(pair(&parsed), (Some("EUR"), Some("10000")));

        let parsed = parse_target("raised of 2k GBP • 45 donors");
        assert_eq!(pair(&parsed), (Some("GBP"), Some("2000")));
    }

    #[test]
    fn test_malformed_grouping_is_not_split() {
        let parsed = parse_raised("12,34 EUR");
        assert!(!parsed.is_found());
        assert_eq!(parsed.raw_match_text, "12,34 EUR");

        assert!(!parse_target("of 1,2345 EUR goal").is_found());
        assert_eq!(
            parse_raised("12,345 EUR").amount_major_units.as_deref(),
            Some("12345")
        );
    }

    #[test]
    fn test_no_match_returns_sentinel() {
        let parsed = parse_raised("Be the first to donate");
        assert!(!parsed.is_found());
        assert!(parsed.amount_major_units.is_none());
        assert_eq!(parsed.raw_match_text, "Be the first to donate");

        let parsed = parse_raised("1234");
        assert_eq!(pair(&parsed), (None, None));

        let parsed = parse_target("");
        assert!(!parsed.is_found());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,234 donations"), Some(1234));
        assert_eq!(parse_count("1.2K donations"), Some(1200));
        assert_eq!(parse_count("<span>17</span> donors"), Some(17));
        assert_eq!(parse_count("no donations"), None);
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_major_units(1234.0), "1234");
        assert_eq!(format_major_units(1234.5), "1234.5");
        assert_eq!(format_major_units(12.345 * 1000.0), "12345");
        assert_eq!(format_minor_units(123_456), "1234.56");
        assert_eq!(format_minor_units(123_450), "1234.5");
        assert_eq!(format_minor_units(500), "5");
        assert_eq!(format_minor_units(5), "0.05");
        assert_eq!(format_minor_units(0), "0");
    }
}
