use epay_core::amount::{parse_user_amount, AmountError};
use rust_decimal::Decimal;
use thiserror::Error;

/// Separator between the cosmetic display prefix and the real account number.
pub const DISPLAY_SEPARATOR: char = '-';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid amount: {0}")]
    Amount(#[from] AmountError),
    #[error("account number is empty")]
    EmptyAccountNumber,
}

pub fn amount(text: &str) -> Result<Decimal, InputError> {
    Ok(parse_user_amount(text)?)
}

/// Gateway lookup key for what the user typed: `35077-1-301025001` becomes `301025001`.
pub fn lookup_key(text: &str) -> Result<&str, InputError> {
    let trimmed = text.trim();
    let key = match trimmed.rfind(DISPLAY_SEPARATOR) {
        Some(idx) => trimmed[idx + DISPLAY_SEPARATOR.len_utf8()..].trim(),
        None => trimmed,
    };
    if key.is_empty() {
        return Err(InputError::EmptyAccountNumber);
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefix_is_stripped() {
        assert_eq!(lookup_key("35077-1-301025001"), Ok("301025001"));
        assert_eq!(lookup_key("301025001"), Ok("301025001"));
        assert_eq!(lookup_key("  35077-1- 301025001 "), Ok("301025001"));
    }

    #[test]
    fn nothing_after_separator_is_empty() {
        assert_eq!(lookup_key("35077-1-"), Err(InputError::EmptyAccountNumber));
        assert_eq!(lookup_key("   "), Err(InputError::EmptyAccountNumber));
    }

    #[test]
    fn amount_errors_wrap() {
        assert!(matches!(amount("abc"), Err(InputError::Amount(AmountError::NotANumber(_)))));
        assert_eq!(amount("1,5"), Ok(Decimal::new(15, 1)));
    }
}
