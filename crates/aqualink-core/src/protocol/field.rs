use super::error::DecodeError;
use super::layout;

/// Parse one field token into a number.
///
/// Surrounding whitespace is ignored. The token must be an optional sign,
/// digits, an optional decimal point and more digits, with at least one digit
/// overall; exponents, `nan` and `inf` are rejected.
///
/// # Examples
/// ```
/// use aqualink_core::parse_field;
///
/// assert_eq!(parse_field(" 7.25 ").unwrap(), 7.25);
/// assert_eq!(parse_field("-.5").unwrap(), -0.5);
/// assert!(parse_field("1e3").is_err());
/// ```
///
/// # Errors
/// Returns `DecodeError::NotANumber` carrying the trimmed token.
pub fn parse_field(token: &str) -> Result<f64, DecodeError> {
    let trimmed = token.trim();
    if !is_decimal(trimmed) {
        return Err(not_a_number(trimmed));
    }
    trimmed.parse::<f64>().map_err(|_| not_a_number(trimmed))
}

fn is_decimal(token: &str) -> bool {
    let unsigned = token.strip_prefix(['+', '-']).unwrap_or(token);
    let (int_part, frac_part) = match unsigned.split_once(layout::DECIMAL_POINT) {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (unsigned, ""),
    };
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && all_digits(frac_part) && int_part.len() + frac_part.len() > 0
}

fn not_a_number(token: &str) -> DecodeError {
    DecodeError::NotANumber {
        token: token.to_string(),
    }
}
