use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Merchant-side invoice reference: `DDMMYY` followed by a zero-padded sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Account number as shown to users, with a cosmetic merchant prefix.
    pub fn display_with(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.0)
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Gateway-defined invoice states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    AwaitingPayment,
    Overdue,
    Paid,
    PartiallyPaid,
    Cancelled,
    PaidByCard,
    PaymentRefunded,
}

impl InvoiceStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::AwaitingPayment),
            2 => Some(Self::Overdue),
            3 => Some(Self::Paid),
            4 => Some(Self::PartiallyPaid),
            5 => Some(Self::Cancelled),
            6 => Some(Self::PaidByCard),
            7 => Some(Self::PaymentRefunded),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AwaitingPayment => "Awaiting payment",
            Self::Overdue => "Overdue",
            Self::Paid => "Paid",
            Self::PartiallyPaid => "Partially paid",
            Self::Cancelled => "Cancelled",
            Self::PaidByCard => "Paid by card",
            Self::PaymentRefunded => "Payment refunded",
        }
    }
}

/// Invoice as returned by the gateway. The bot never mutates these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvoiceRecord {
    #[serde(default)]
    pub invoice_no: Option<i64>,
    #[serde(default)]
    pub account_no: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<i32>,
    #[serde(default)]
    pub status: Option<i32>,
    /// Compact `YYYYMMDDHHMMSS` timestamp.
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub expiration: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
}

/// One settled payment from the gateway's payments listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentRecord {
    #[serde(default)]
    pub payment_no: Option<i64>,
    #[serde(default)]
    pub account_no: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
}

/// Aggregate of `Amount` across a payments listing. Entries without an amount count as zero.
pub fn payments_total(payments: &[PaymentRecord]) -> Decimal {
    payments.iter().filter_map(|p| p.amount).sum()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(Decimal),
    Text(String),
}

/// Accepts amounts as JSON numbers, dot strings, or the gateway's comma strings.
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawAmount> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawAmount::Number(d)) => Some(d),
        Some(RawAmount::Text(s)) => crate::amount::parse_gateway_amount(&s),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn invoice_record_accepts_numeric_and_comma_amounts() {
        let numeric: InvoiceRecord =
            serde_json::from_str(r#"{"InvoiceNo": 777, "AccountNo": "301025001", "Amount": 25.5}"#)
                .unwrap();
        assert_eq!(numeric.amount, Some(Decimal::from_str("25.5").unwrap()));

        let comma: InvoiceRecord =
            serde_json::from_str(r#"{"AccountNo": "301025001", "Amount": "25,50", "Status": 3}"#)
                .unwrap();
        assert_eq!(comma.amount, Some(Decimal::from_str("25.50").unwrap()));
        assert_eq!(comma.status, Some(3));
        assert_eq!(comma.invoice_no, None);
    }

    #[test]
    fn missing_fields_default() {
        let rec: InvoiceRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(rec, InvoiceRecord::default());
    }

    #[test]
    fn total_skips_missing_amounts() {
        let payments: Vec<PaymentRecord> = serde_json::from_str(
            r#"[{"Amount": 10.25}, {"Amount": "4,75"}, {"AccountNo": "x"}]"#,
        )
        .unwrap();
        assert_eq!(payments_total(&payments), Decimal::from_str("15.00").unwrap());
    }

    #[test]
    fn status_table_matches_gateway_codes() {
        assert_eq!(InvoiceStatus::from_code(3).map(|s| s.label()), Some("Paid"));
        assert_eq!(InvoiceStatus::from_code(7), Some(InvoiceStatus::PaymentRefunded));
        assert_eq!(InvoiceStatus::from_code(0), None);
        assert_eq!(InvoiceStatus::from_code(99), None);
    }
}
