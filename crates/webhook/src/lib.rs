//! Inbound payment notifications: signature check, decoding and delivery.

use anyhow::Result;
use async_trait::async_trait;
use axum::http::StatusCode;
use std::sync::Arc;
use thiserror::Error;

mod verify;

pub mod audit;
pub mod notification;
pub mod receiver;

pub use notification::{NotificationKind, PaymentNotification};
pub use receiver::{router, WebhookState, NOTIFY_PATH};
pub use verify::{sign, verify};

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("notification has no Data")]
    MissingData,
    #[error("notification body could not be decoded: {0}")]
    Envelope(String),
    #[error("notification signature mismatch")]
    Signature,
    #[error("notification Data is not a payment payload: {0}")]
    Payload(serde_json::Error),
    #[error("notification could not be processed: {0:#}")]
    Sink(anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingData | WebhookError::Envelope(_) | WebhookError::Payload(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Signature => StatusCode::FORBIDDEN,
            WebhookError::Sink(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Destination for authenticated notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &PaymentNotification) -> Result<()>;
}

/// Delivers to every sink in order, stopping at the first failure.
pub struct Fanout(pub Vec<Arc<dyn NotificationSink>>);

#[async_trait]
impl NotificationSink for Fanout {
    async fn deliver(&self, notification: &PaymentNotification) -> Result<()> {
        for sink in &self.0 {
            sink.deliver(notification).await?;
        }
        Ok(())
    }
}
