use epay_core::models::lenient_amount;
use epay_core::reconcile::format_timestamp;
use epay_core::StatusLabel;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Form or JSON wrapper the gateway posts. `Data` is itself JSON text.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Data", default)]
    pub data: Option<String>,
    #[serde(rename = "Signature", default)]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    NewPayment,
    PaymentCancelled,
    StatusChanged,
    Other(i32),
}

/// Decoded `Data` of a payment notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentNotification {
    pub cmd_type: i32,
    #[serde(default)]
    pub account_no: Option<String>,
    #[serde(default)]
    pub invoice_no: Option<i64>,
    #[serde(default)]
    pub payment_no: Option<i64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub created: Option<String>,
}

impl PaymentNotification {
    pub fn kind(&self) -> NotificationKind {
        match self.cmd_type {
            1 => NotificationKind::NewPayment,
            2 => NotificationKind::PaymentCancelled,
            3 => NotificationKind::StatusChanged,
            other => NotificationKind::Other(other),
        }
    }

    /// Short chat-friendly text.
    pub fn summary(&self, currency_label: &str, display_prefix: &str) -> String {
        let account = self
            .account_no
            .as_deref()
            .map(|a| format!("{display_prefix}{a}"))
            .unwrap_or_else(|| "—".to_string());
        let amount = self
            .amount
            .map(|a| format!("{a} {currency_label}"))
            .unwrap_or_else(|| "—".to_string());
        let when = format_timestamp(self.created.as_deref());

        match self.kind() {
            NotificationKind::NewPayment => {
                format!("💰 Payment received\nAccount: {account}\nAmount: {amount}\nTime: {when}")
            }
            NotificationKind::PaymentCancelled => {
                format!("↩️ Payment cancelled\nAccount: {account}\nAmount: {amount}\nTime: {when}")
            }
            NotificationKind::StatusChanged => format!(
                "🔄 Invoice status changed\nAccount: {account}\nStatus: {}",
                StatusLabel::from_code(self.status).text()
            ),
            NotificationKind::Other(code) => {
                format!("ℹ️ Gateway notification (type {code})\nAccount: {account}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_payment_payload() {
        let n: PaymentNotification = serde_json::from_str(
            r#"{"CmdType":1,"AccountNo":"301025001","PaymentNo":42,"Amount":"25,50","Created":"20251030143005"}"#,
        )
        .unwrap();
        assert_eq!(n.kind(), NotificationKind::NewPayment);
        assert_eq!(n.amount, Some(Decimal::new(2550, 2)));
        let text = n.summary("BYN", "35077-1-");
        assert!(text.contains("35077-1-301025001"));
        assert!(text.contains("25.50 BYN"));
        assert!(text.contains("30.10.2025 14:30"));
    }

    #[test]
    fn status_change_uses_status_table() {
        let n: PaymentNotification =
            serde_json::from_str(r#"{"CmdType":3,"AccountNo":"301025001","Status":5}"#).unwrap();
        assert_eq!(n.kind(), NotificationKind::StatusChanged);
        assert!(n.summary("BYN", "").contains("Cancelled"));
    }

    #[test]
    fn cmd_type_is_required() {
        assert!(serde_json::from_str::<PaymentNotification>(r#"{"AccountNo":"1"}"#).is_err());
    }
}
