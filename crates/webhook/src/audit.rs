use crate::notification::{NotificationKind, PaymentNotification};
use crate::NotificationSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event_type: String,
    pub account_no: Option<String>,
    pub invoice_no: Option<i64>,
    pub payment_no: Option<i64>,
    pub amount: Option<String>,
    pub status: Option<i32>,
}

impl AuditEvent {
    pub fn new(event_type: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event_type: event_type.to_string(),
            account_no: None,
            invoice_no: None,
            payment_no: None,
            amount: None,
            status: None,
        }
    }

    pub fn from_notification(n: &PaymentNotification) -> Self {
        let event_type = match n.kind() {
            NotificationKind::NewPayment => "payment_received",
            NotificationKind::PaymentCancelled => "payment_cancelled",
            NotificationKind::StatusChanged => "invoice_status_changed",
            NotificationKind::Other(_) => "notification",
        };
        Self {
            account_no: n.account_no.clone(),
            invoice_no: n.invoice_no,
            payment_no: n.payment_no,
            amount: n.amount.map(|a| a.to_string()),
            status: n.status,
            ..Self::new(event_type)
        }
    }
}

/// Appends one JSON line per accepted notification.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn write(&self, event: &AuditEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open audit log {}", self.path.display()))?;

        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        tracing::debug!(
            event_type = %event.event_type,
            account_no = ?event.account_no,
            "Audit event written"
        );
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for AuditLog {
    async fn deliver(&self, notification: &PaymentNotification) -> Result<()> {
        self.write(&AuditEvent::from_notification(notification)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_one_line_per_notification() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("payments.jsonl"));
        let n: PaymentNotification =
            serde_json::from_str(r#"{"CmdType":1,"AccountNo":"301025001","Amount":10}"#).unwrap();

        log.deliver(&n).await.unwrap();
        log.deliver(&n).await.unwrap();

        let text = tokio::fs::read_to_string(dir.path().join("payments.jsonl"))
            .await
            .unwrap();
        let lines: Vec<AuditEvent> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].event_type, "payment_received");
        assert_eq!(lines[0].account_no.as_deref(), Some("301025001"));
        assert_eq!(lines[0].amount.as_deref(), Some("10"));
    }
}
