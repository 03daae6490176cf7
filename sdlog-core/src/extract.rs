//! Numeric literal extraction from labelled fragments

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;

/// Optional sign, integer part and optional fractional part, or a bare
/// fraction such as `.5`
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[+-]?(?:\d+(?:\.\d*)?|\.\d+)").expect("numeric literal pattern is valid")
});

/// Returns the first signed decimal or integer literal in `fragment`
///
/// Units and labels around the literal are ignored, so `"22.5 C"`,
/// `"65%"` and `"Gas: 1234 Ohms"` yield `22.5`, `65.0` and `1234.0`.
pub fn extract_number(fragment: &str) -> Result<f64, ParseError> {
    let literal = NUMBER
        .find(fragment)
        .ok_or_else(|| ParseError::NoNumericLiteral(fragment.trim().to_string()))?;

    literal
        .as_str()
        .parse::<f64>()
        .map_err(|_| ParseError::NoNumericLiteral(fragment.trim().to_string()))
}
