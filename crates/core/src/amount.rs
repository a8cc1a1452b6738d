use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Largest number of fractional digits the gateway accepts for BYN amounts.
pub const MAX_SCALE: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("`{0}` is not a number")]
    NotANumber(String),
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount has more than {MAX_SCALE} decimal places")]
    TooPrecise,
}

/// Parses an amount typed by a user. Both `25.50` and `25,50` are accepted.
pub fn parse_user_amount(input: &str) -> Result<Decimal, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    let normalized = trimmed.replace(',', ".");
    let amount = Decimal::from_str(&normalized)
        .map_err(|_| AmountError::NotANumber(trimmed.to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive);
    }
    if amount.normalize().scale() > MAX_SCALE {
        return Err(AmountError::TooPrecise);
    }
    Ok(amount)
}

/// Wire form for the gateway: two decimals, comma separator.
pub fn to_gateway_string(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(MAX_SCALE)).replace('.', ",")
}

/// Reads an amount string coming back from the gateway, which may use either separator.
pub fn parse_gateway_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim().replace(',', ".").as_str()).ok()
}
