use std::fmt;

/// Amounts are plain currency units as f64. The resolver keeps full
/// floating-point precision internally; rounding to two decimals happens
/// only at presentation boundaries (CLI tables, CSV export).
pub type Amount = f64;

/// Tolerance for zero-crossing decisions on currency amounts. A member
/// whose balance is within this range of zero counts as settled, and the
/// settlement matcher advances past parties whose remainder drops below it.
/// Both decisions must use the same constant or the matcher can loop or
/// emit stray near-zero transfers.
pub const SETTLEMENT_EPSILON: Amount = 0.01;

/// Format an amount as a human-readable currency string, rounded to two
/// decimals. Example: 50.0 -> "50.00", -12.345 -> "-12.35"
pub fn format_amount(amount: Amount) -> String {
    // Round away from the f64 representation first so -0.0004 prints as
    // "0.00", not "-0.00".
    let rounded = (amount * 100.0).round() / 100.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.2}", rounded)
}

/// Format an amount with an explicit leading sign. Example: 20.0 -> "+20.00"
pub fn format_signed_amount(amount: Amount) -> String {
    let formatted = format_amount(amount);
    if formatted.starts_with('-') {
        formatted
    } else {
        format!("+{}", formatted)
    }
}

/// Parse a decimal string into an amount.
/// Example: "50.00" -> 50.0, "12.5" -> 12.5, "100" -> 100.0
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }

    let unsigned = input.strip_prefix('-').unwrap_or(input);
    let parts: Vec<&str> = unsigned.split('.').collect();
    let valid = match parts.as_slice() {
        [units] => !units.is_empty() && units.bytes().all(|b| b.is_ascii_digit()),
        [units, decimals] => {
            (!units.is_empty() || !decimals.is_empty())
                && units.bytes().all(|b| b.is_ascii_digit())
                && decimals.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    };
    if !valid {
        return Err(ParseAmountError::InvalidFormat);
    }

    let amount: Amount = input.parse().map_err(|_| ParseAmountError::InvalidFormat)?;
    if !amount.is_finite() {
        return Err(ParseAmountError::OutOfRange);
    }
    Ok(amount)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
    OutOfRange,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid money format"),
            ParseAmountError::OutOfRange => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseAmountError {}
