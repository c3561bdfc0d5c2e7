//! Compiled regex patterns for product field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Strict product code: exactly two letters followed by 3-6 digits.
    /// High precision, used where a false anchor is worse than a miss.
    pub static ref CODE_STRICT: Regex = Regex::new(r"\b([A-Z]{2})(\d{3,6})\b").unwrap();

    /// Tolerant product code family: 1-4 letters, optional separator,
    /// 2-6 digits, optional variant suffix (`-P`, `/5`, `-12`, `.3`).
    pub static ref CODE_TOLERANT: Regex = Regex::new(
        r"(?i)\b([A-Z]{1,4})[-. ]?(\d{2,6})(-\d{1,3}|/\d{1,3}|-[A-Z]|\.\d{1,3})?\b"
    )
    .unwrap();

    /// Brazilian price: optional `R$`, optional thousands groups with
    /// `.`, two decimal digits after `,` or `.`.
    pub static ref PRICE: Regex = Regex::new(
        r"(?:R\s*\$\s*)?(?:\d{1,3}(?:\.\d{3})+|\d+)[.,]\d{2}\b"
    )
    .unwrap();

    /// Currency marker left dangling after the price text is removed.
    pub static ref DANGLING_CURRENCY: Regex = Regex::new(r"(?i)R\s*\$").unwrap();

    /// Runs of whitespace, collapsed when rebuilding titles.
    pub static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_code() {
        assert!(CODE_STRICT.is_match("CT2092"));
        assert!(CODE_STRICT.is_match("AB123456"));
        assert!(!CODE_STRICT.is_match("A123"));
        assert!(!CODE_STRICT.is_match("ABC123"));
        assert!(!CODE_STRICT.is_match("CT12"));
    }

    #[test]
    fn test_tolerant_code_family() {
        for code in ["CT2092", "AB-5560", "CT3021-P", "PRO-200/5", "ABC.120", "x 1234"] {
            assert!(CODE_TOLERANT.is_match(code), "should match {code:?}");
        }
        assert!(!CODE_TOLERANT.is_match("12345"));
        assert!(!CODE_TOLERANT.is_match("ABCDE-123"));
    }

    #[test]
    fn test_price_variants() {
        for price in ["R$ 4,70", "R$4,70", "4,70", "12.90", "1.234,56", "R$ 1.234,56"] {
            assert!(PRICE.is_match(price), "should match {price:?}");
        }
        assert!(!PRICE.is_match("4,7"));
        assert!(!PRICE.is_match("R$"));
    }

    #[test]
    fn test_price_no_partial_thousands() {
        // "1.234" has no decimal part; the match must not stop at "1.23".
        assert!(!PRICE.is_match("valor 1.234 unidades"));
        let m = PRICE.find("total 1.234,56 ok").unwrap();
        assert_eq!(m.as_str(), "1.234,56");
    }
}
