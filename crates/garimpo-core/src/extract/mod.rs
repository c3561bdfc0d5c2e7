//! Product field extraction from OCR text.
//!
//! Pulls codes, prices and titles out of a text span (a line block or an
//! anchor window). Codes come from one of two pattern families, prices
//! get normalized to the canonical `R$ 1.234,56` form, and the title is
//! what remains after the matched fields are cut out.

mod confusables;
pub mod patterns;

pub use confusables::fix_digit_confusables;

use std::borrow::Cow;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::config::{ExtractionConfig, FieldPolicy, PricePolicy};

/// A product code match with its normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeMatch {
    /// Text exactly as matched.
    pub raw: String,

    /// Canonical form: uppercase, separator removed (e.g. `AB5560`).
    pub normalized: String,

    /// Byte span of the match in the source text.
    pub span: (usize, usize),
}

/// A price match with its normalized form and numeric value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceMatch {
    /// Text exactly as matched.
    pub raw: String,

    /// Canonical form, always `R$ 1.234,56` style.
    pub normalized: String,

    /// Numeric value with two decimal places.
    pub value: Decimal,

    /// Byte span of the match in the source text.
    pub span: (usize, usize),
}

/// Extracts product fields from text spans.
pub struct FieldExtractor {
    policy: FieldPolicy,
    price_policy: PricePolicy,
    keep_code_suffix: bool,
    fix_confusables: bool,
}

impl FieldExtractor {
    /// Build an extractor from configuration. `default_price_policy` is
    /// used when the config leaves the price policy unset, so each
    /// assembly strategy can carry its own default.
    pub fn from_config(config: &ExtractionConfig, default_price_policy: PricePolicy) -> Self {
        Self {
            policy: config.policy,
            price_policy: config.price_policy.unwrap_or(default_price_policy),
            keep_code_suffix: config.keep_code_suffix,
            fix_confusables: config.fix_confusables,
        }
    }

    fn code_pattern(&self) -> &'static Regex {
        match self.policy {
            FieldPolicy::Strict => &patterns::CODE_STRICT,
            FieldPolicy::Tolerant => &patterns::CODE_TOLERANT,
        }
    }

    /// Whether `text` on its own is a code anchor.
    pub fn is_code_anchor(&self, text: &str) -> bool {
        self.code_pattern().is_match(text)
    }

    /// First product code in reading order.
    pub fn extract_code(&self, text: &str) -> Option<CodeMatch> {
        self.code_pattern()
            .captures(text)
            .and_then(|caps| self.code_from_captures(&caps))
    }

    /// Every product code in the text, in reading order.
    pub fn extract_codes(&self, text: &str) -> Vec<CodeMatch> {
        self.code_pattern()
            .captures_iter(text)
            .filter_map(|caps| self.code_from_captures(&caps))
            .collect()
    }

    fn code_from_captures(&self, caps: &regex::Captures<'_>) -> Option<CodeMatch> {
        let whole = caps.get(0)?;

        let mut normalized = format!(
            "{}{}",
            caps.get(1)?.as_str().to_uppercase(),
            caps.get(2)?.as_str()
        );
        if self.keep_code_suffix {
            if let Some(suffix) = caps.get(3) {
                normalized.push_str(&suffix.as_str().to_uppercase());
            }
        }

        Some(CodeMatch {
            raw: whole.as_str().to_string(),
            normalized,
            span: (whole.start(), whole.end()),
        })
    }

    /// Extract a price according to the configured ambiguity policy.
    ///
    /// With confusable fixing on, matching runs over the substituted
    /// copy; substitutions are 1:1 ASCII swaps, so the returned span is
    /// valid in the original text too.
    pub fn extract_price(&self, text: &str) -> Option<PriceMatch> {
        let haystack: Cow<'_, str> = if self.fix_confusables {
            Cow::Owned(fix_digit_confusables(text))
        } else {
            Cow::Borrowed(text)
        };

        let mut best: Option<PriceMatch> = None;
        for m in patterns::PRICE.find_iter(&haystack) {
            // A span with no genuine digit in the source text only looks
            // numeric because of the substitutions; skip it.
            if !text.as_bytes()[m.start()..m.end()]
                .iter()
                .any(|b| b.is_ascii_digit())
            {
                continue;
            }
            let Some(value) = parse_price_value(m.as_str()) else {
                continue;
            };
            let candidate = PriceMatch {
                raw: m.as_str().to_string(),
                normalized: format_brl(value),
                value,
                span: (m.start(), m.end()),
            };
            match self.price_policy {
                PricePolicy::FirstMatch => return Some(candidate),
                PricePolicy::MaxValue => {
                    // Strict > keeps the first match on ties.
                    if best.as_ref().is_none_or(|b| candidate.value > b.value) {
                        best = Some(candidate);
                    }
                }
            }
        }
        best
    }

    /// Derive a title from what remains once code and price are removed.
    ///
    /// Matched spans are blanked, a dangling `R$` is dropped, whitespace
    /// collapses, edge punctuation is trimmed and the result is
    /// title-cased. Anything shorter than 3 characters is no title.
    pub fn derive_title(
        &self,
        text: &str,
        code: Option<&CodeMatch>,
        price: Option<&PriceMatch>,
    ) -> Option<String> {
        let mut bytes = text.as_bytes().to_vec();
        let spans = code
            .map(|c| c.span)
            .into_iter()
            .chain(price.map(|p| p.span));
        for (start, end) in spans {
            // Field matches are pure ASCII, so byte blanking is UTF-8 safe.
            for b in bytes.get_mut(start..end).unwrap_or(&mut []) {
                *b = b' ';
            }
        }

        let cleaned = String::from_utf8(bytes).ok()?;
        let cleaned = patterns::DANGLING_CURRENCY.replace_all(&cleaned, " ");
        let collapsed = patterns::WHITESPACE.replace_all(&cleaned, " ");
        let trimmed = collapsed
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | ',' | '.' | ';' | ':'));

        if trimmed.chars().count() < 3 {
            return None;
        }
        Some(title_case(trimmed))
    }
}

/// Parse a matched price string into a two-decimal value.
fn parse_price_value(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.'))
        .collect();

    // The last separator is the decimal mark, everything before it is
    // the integer part whatever its grouping.
    let sep = cleaned.rfind([',', '.'])?;
    let (int_raw, frac_raw) = cleaned.split_at(sep);
    let frac = &frac_raw[1..];
    if frac.len() != 2 {
        return None;
    }

    let int_digits: String = int_raw.chars().filter(char::is_ascii_digit).collect();
    let int_value: i64 = if int_digits.is_empty() {
        0
    } else {
        int_digits.parse().ok()?
    };
    let cents: i64 = frac.parse().ok()?;

    Some(Decimal::new(int_value * 100 + cents, 2))
}

/// Format a value as canonical Brazilian currency: `R$ 1.234,56`.
pub fn format_brl(value: Decimal) -> String {
    let total_cents = (value * Decimal::from(100)).round().to_i64().unwrap_or(0);
    let int_part = total_cents / 100;
    let cents = (total_cents % 100).abs();

    let digits = int_part.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if total_cents < 0 { "-" } else { "" };
    format!("R$ {sign}{grouped},{cents:02}")
}

/// Capitalize the first letter of each word, lowercase the rest.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extractor() -> FieldExtractor {
        FieldExtractor::from_config(&ExtractionConfig::default(), PricePolicy::FirstMatch)
    }

    fn strict() -> FieldExtractor {
        let config = ExtractionConfig {
            policy: FieldPolicy::Strict,
            ..Default::default()
        };
        FieldExtractor::from_config(&config, PricePolicy::FirstMatch)
    }

    #[test]
    fn test_code_normalization() {
        let m = extractor().extract_code("cód AB-5560 promoção").unwrap();
        assert_eq!(m.raw, "AB-5560");
        assert_eq!(m.normalized, "AB5560");
    }

    #[test]
    fn test_code_suffix_stripped_by_default() {
        let m = extractor().extract_code("CT3021-P").unwrap();
        assert_eq!(m.normalized, "CT3021");
    }

    #[test]
    fn test_code_suffix_kept_when_configured() {
        let config = ExtractionConfig {
            keep_code_suffix: true,
            ..Default::default()
        };
        let ex = FieldExtractor::from_config(&config, PricePolicy::FirstMatch);
        assert_eq!(ex.extract_code("CT3021-P").unwrap().normalized, "CT3021-P");
        assert_eq!(ex.extract_code("PRO-200/5").unwrap().normalized, "PRO200/5");
    }

    #[test]
    fn test_strict_rejects_tolerant_family() {
        assert!(strict().extract_code("AB-5560").is_none());
        assert_eq!(strict().extract_code("CT2092").unwrap().normalized, "CT2092");
    }

    #[test]
    fn test_price_normalization() {
        let cases = [
            ("12,90", "R$ 12,90"),
            ("12.90", "R$ 12,90"),
            ("1.234,56", "R$ 1.234,56"),
            ("R$ 4,70", "R$ 4,70"),
            ("R$4,70", "R$ 4,70"),
        ];
        let ex = extractor();
        for (input, expected) in cases {
            let m = ex.extract_price(input).unwrap();
            assert_eq!(m.normalized, expected, "input {input:?}");
        }
    }

    #[test]
    fn test_price_normalization_idempotent() {
        let ex = extractor();
        let first = ex.extract_price("preço 1.234,56").unwrap();
        let second = ex.extract_price(&first.normalized).unwrap();
        assert_eq!(second.normalized, first.normalized);
        assert_eq!(second.value, first.value);
    }

    #[test]
    fn test_price_confusable_prepass() {
        let m = extractor().extract_price("R$ 4,7O").unwrap();
        assert_eq!(m.normalized, "R$ 4,70");
    }

    #[test]
    fn test_extract_codes_in_reading_order() {
        let codes = extractor().extract_codes("CT1000 depois CT2000");
        let normalized: Vec<_> = codes.iter().map(|c| c.normalized.as_str()).collect();
        assert_eq!(normalized, vec!["CT1000", "CT2000"]);
    }

    #[test]
    fn test_price_requires_genuine_digit() {
        // "gel,so" turns into "ge1,50" under the substitution pass; an
        // all-letter span is OCR noise, not a price.
        assert!(extractor().extract_price("gel,so").is_none());
        let m = extractor().extract_price("caneca gel,so R$ 4,70").unwrap();
        assert_eq!(m.normalized, "R$ 4,70");
    }

    #[test]
    fn test_price_first_match_policy() {
        let m = extractor().extract_price("de R$ 9,90 por R$ 4,70").unwrap();
        assert_eq!(m.normalized, "R$ 9,90");
    }

    #[test]
    fn test_price_max_value_policy() {
        let config = ExtractionConfig {
            price_policy: Some(PricePolicy::MaxValue),
            ..Default::default()
        };
        let ex = FieldExtractor::from_config(&config, PricePolicy::FirstMatch);
        let m = ex.extract_price("R$ 4,70 antes R$ 9,90").unwrap();
        assert_eq!(m.normalized, "R$ 9,90");
    }

    #[test]
    fn test_title_derivation() {
        let ex = extractor();
        let text = "BORRIFADOR DIAMANTE SORTIDO CT2092 R$ 4,70";
        let code = ex.extract_code(text);
        let price = ex.extract_price(text);
        let title = ex.derive_title(text, code.as_ref(), price.as_ref()).unwrap();
        assert_eq!(title, "Borrifador Diamante Sortido");
    }

    #[test]
    fn test_title_too_short_is_none() {
        let ex = extractor();
        let text = "CT2092 R$ 4,70 -";
        let code = ex.extract_code(text);
        let price = ex.extract_price(text);
        assert_eq!(ex.derive_title(text, code.as_ref(), price.as_ref()), None);
    }

    #[test]
    fn test_title_keeps_accents() {
        let ex = extractor();
        let title = ex.derive_title("CANECA CERÂMICA", None, None).unwrap();
        assert_eq!(title, "Caneca Cerâmica");
    }

    #[test]
    fn test_format_brl_grouping() {
        assert_eq!(format_brl(Decimal::new(470, 2)), "R$ 4,70");
        assert_eq!(format_brl(Decimal::new(123_456, 2)), "R$ 1.234,56");
        assert_eq!(format_brl(Decimal::new(100_000_000, 2)), "R$ 1.000.000,00");
    }
}
