use super::{CreatedInvoice, GatewayError, InvoiceGateway, NewInvoice};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use epay_core::amount::to_gateway_string;
use epay_core::{InvoiceRecord, PaymentRecord};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
}

impl ApiError {
    fn into_gateway_error(self, status: StatusCode) -> GatewayError {
        let message = match (self.code, self.msg) {
            (Some(code), Some(msg)) => format!("{msg} (code {code})"),
            (None, Some(msg)) => msg,
            (Some(code), None) => format!("code {code}"),
            (None, None) => "unspecified error".to_string(),
        };
        GatewayError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateResponse {
    #[serde(default)]
    invoice_no: Option<i64>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", bound(deserialize = "T: Deserialize<'de>"))]
struct ItemsResponse<T> {
    #[serde(default)]
    items: Option<Vec<T>>,
    #[serde(default)]
    error: Option<ApiError>,
}

/// ExpressPay REST client. The API token travels as the `token` query parameter.
#[derive(Clone)]
pub struct ExpressPayClient {
    pub base_url: String,
    token: String,
    http_client: reqwest::Client,
}

impl ExpressPayClient {
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Arc<Self>> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Arc::new(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http_client,
        }))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Reads a listing body, turning every non-listing outcome into an error.
    async fn fetch_items<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<T>, GatewayError> {
        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ItemsResponse<T> =
            serde_json::from_str(&body).map_err(|_| GatewayError::Malformed {
                status: status.as_u16(),
                body: body.clone(),
            })?;

        if let Some(err) = parsed.error {
            return Err(err.into_gateway_error(status));
        }
        Ok(parsed.items.unwrap_or_default())
    }
}

#[async_trait]
impl InvoiceGateway for ExpressPayClient {
    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<CreatedInvoice, GatewayError> {
        let amount = to_gateway_string(invoice.amount);
        let currency = invoice.currency.to_string();
        let form = [
            ("AccountNo", invoice.account_no.as_str()),
            ("Amount", amount.as_str()),
            ("Currency", currency.as_str()),
            ("Info", invoice.info.as_str()),
        ];

        let resp = self
            .http_client
            .post(self.url("invoices"))
            .query(&[("token", self.token.as_str())])
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            tracing::warn!(
                account_no = %invoice.account_no,
                status = status.as_u16(),
                "ExpressPay rejected invoice creation"
            );
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CreateResponse =
            serde_json::from_str(&body).map_err(|_| GatewayError::Malformed {
                status: status.as_u16(),
                body: body.clone(),
            })?;

        if let Some(err) = parsed.error {
            return Err(err.into_gateway_error(status));
        }

        let invoice_no = parsed.invoice_no.ok_or_else(|| GatewayError::Malformed {
            status: status.as_u16(),
            body,
        })?;

        tracing::info!(
            account_no = %invoice.account_no,
            invoice_no,
            "Invoice created in ExpressPay"
        );

        Ok(CreatedInvoice { invoice_no })
    }

    async fn get_invoice_details(
        &self,
        invoice_no: i64,
    ) -> Result<Option<InvoiceRecord>, GatewayError> {
        let resp = self
            .http_client
            .get(self.url(&format!("invoices/{}", invoice_no)))
            .query(&[("token", self.token.as_str())])
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            tracing::warn!(
                invoice_no,
                status = resp.status().as_u16(),
                "Invoice details unavailable"
            );
            return Ok(None);
        }

        let body = resp.text().await?;
        match serde_json::from_str::<InvoiceRecord>(&body) {
            Ok(mut record) => {
                record.invoice_no.get_or_insert(invoice_no);
                Ok(Some(record))
            }
            Err(e) => {
                tracing::warn!(invoice_no, error = %e, "Invoice details body not understood");
                Ok(None)
            }
        }
    }

    async fn list_invoices(&self, account_no: &str) -> Result<Vec<InvoiceRecord>, GatewayError> {
        let request = self
            .http_client
            .get(self.url("invoices"))
            .query(&[("token", self.token.as_str()), ("AccountNo", account_no)]);

        let items = self.fetch_items(request).await?;
        tracing::debug!(account_no, count = items.len(), "Listed invoices");
        Ok(items)
    }

    async fn list_payments(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PaymentRecord>, GatewayError> {
        let from = from.format("%Y%m%d").to_string();
        let to = to.format("%Y%m%d").to_string();
        let request = self.http_client.get(self.url("payments")).query(&[
            ("token", self.token.as_str()),
            ("From", from.as_str()),
            ("To", to.as_str()),
        ]);

        let items = self.fetch_items(request).await?;
        tracing::debug!(%from, %to, count = items.len(), "Listed payments");
        Ok(items)
    }
}
