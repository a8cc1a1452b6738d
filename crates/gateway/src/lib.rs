use async_trait::async_trait;
use chrono::NaiveDate;
use epay_core::{AccountNumber, InvoiceRecord, PaymentRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request to issue a new invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub account_no: AccountNumber,
    pub amount: Decimal,
    /// Numeric ISO 4217 code of the settlement currency.
    pub currency: u16,
    pub info: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedInvoice {
    pub invoice_no: i64,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway responded {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected gateway response ({status}): {body}")]
    Malformed { status: u16, body: String },
    #[error("gateway rejected the request ({status}): {message}")]
    Api { status: u16, message: String },
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Transport(e) => e.status().map(|s| s.as_u16()),
            GatewayError::Http { status, .. }
            | GatewayError::Malformed { status, .. }
            | GatewayError::Api { status, .. } => Some(*status),
        }
    }
}

/// Operations the bot needs from the payment gateway.
#[async_trait]
pub trait InvoiceGateway: Send + Sync {
    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<CreatedInvoice, GatewayError>;

    /// `Ok(None)` whenever the gateway does not answer 200 with a usable record.
    async fn get_invoice_details(
        &self,
        invoice_no: i64,
    ) -> Result<Option<InvoiceRecord>, GatewayError>;

    /// Invoices carrying `account_no`, in the order the gateway lists them.
    async fn list_invoices(&self, account_no: &str) -> Result<Vec<InvoiceRecord>, GatewayError>;

    async fn list_payments(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PaymentRecord>, GatewayError>;
}

pub mod expresspay;
pub mod mock;
