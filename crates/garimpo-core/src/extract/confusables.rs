//! OCR digit-confusable substitution.
//!
//! Low-quality scans frequently read digits as lookalike letters inside
//! prices ("R$ 4,7O"). The fix maps each confusable letter to its digit
//! before price matching runs. Every substitution is a 1:1 ASCII swap,
//! so byte offsets in the fixed text line up with the original.

/// Replace digit-lookalike letters with the digits they usually stand for.
pub fn fix_digit_confusables(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'O' | 'o' => '0',
            'S' | 's' => '5',
            'I' | 'l' => '1',
            'E' | 'B' => '8',
            other => other,
        })
        .collect()
}
