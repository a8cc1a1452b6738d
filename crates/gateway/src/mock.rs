use super::{CreatedInvoice, GatewayError, InvoiceGateway, NewInvoice};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use epay_core::{InvoiceRecord, PaymentRecord};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory gateway. Issues invoice numbers sequentially and keeps everything it is told.
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    next_invoice_no: i64,
    invoices: Vec<InvoiceRecord>,
    payments: Vec<PaymentRecord>,
    calls: Vec<String>,
    failure: Option<(u16, String)>,
    hide_details: bool,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Self::starting_at(1)
    }

    pub fn starting_at(first_invoice_no: i64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState {
                next_invoice_no: first_invoice_no,
                ..Default::default()
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_invoice(&self, record: InvoiceRecord) {
        self.state().invoices.push(record);
    }

    pub fn insert_payment(&self, record: PaymentRecord) {
        self.state().payments.push(record);
    }

    /// Every subsequent call answers with this HTTP status and body.
    pub fn fail_with(&self, status: u16, body: impl Into<String>) {
        self.state().failure = Some((status, body.into()));
    }

    /// Makes `get_invoice_details` behave like a non-200 response.
    pub fn hide_details(&self) {
        self.state().hide_details = true;
    }

    /// Names of the operations invoked so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    fn begin(&self, op: &str) -> Result<MutexGuard<'_, MockState>, GatewayError> {
        let mut state = self.state();
        state.calls.push(op.to_string());
        if let Some((status, body)) = state.failure.clone() {
            return Err(GatewayError::Http { status, body });
        }
        Ok(state)
    }
}

#[async_trait]
impl InvoiceGateway for MockGateway {
    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<CreatedInvoice, GatewayError> {
        let mut state = self.begin("create_invoice")?;
        let invoice_no = state.next_invoice_no;
        state.next_invoice_no += 1;
        state.invoices.push(InvoiceRecord {
            invoice_no: Some(invoice_no),
            account_no: invoice.account_no.to_string(),
            amount: Some(invoice.amount),
            currency: Some(i32::from(invoice.currency)),
            status: Some(1),
            created: Some(Local::now().format("%Y%m%d%H%M%S").to_string()),
            expiration: None,
            info: Some(invoice.info.clone()),
        });
        tracing::info!(account_no = %invoice.account_no, invoice_no, "Mock invoice created");
        Ok(CreatedInvoice { invoice_no })
    }

    async fn get_invoice_details(
        &self,
        invoice_no: i64,
    ) -> Result<Option<InvoiceRecord>, GatewayError> {
        let state = self.begin("get_invoice_details")?;
        if state.hide_details {
            return Ok(None);
        }
        Ok(state
            .invoices
            .iter()
            .find(|r| r.invoice_no == Some(invoice_no))
            .cloned())
    }

    async fn list_invoices(&self, account_no: &str) -> Result<Vec<InvoiceRecord>, GatewayError> {
        let state = self.begin("list_invoices")?;
        Ok(state
            .invoices
            .iter()
            .filter(|r| r.account_no == account_no)
            .cloned()
            .collect())
    }

    async fn list_payments(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PaymentRecord>, GatewayError> {
        let state = self.begin("list_payments")?;
        let from = from.format("%Y%m%d").to_string();
        let to = to.format("%Y%m%d").to_string();
        Ok(state
            .payments
            .iter()
            .filter(|p| match p.created.as_deref().and_then(|c| c.get(..8)) {
                Some(day) => day >= from.as_str() && day <= to.as_str(),
                None => true,
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epay_core::AccountNumber;
    use rust_decimal::Decimal;

    fn request(account: &str) -> NewInvoice {
        NewInvoice {
            account_no: AccountNumber::new(account),
            amount: Decimal::new(1000, 2),
            currency: 933,
            info: "test".into(),
        }
    }

    #[tokio::test]
    async fn created_invoices_are_listed_by_account() {
        let gw = MockGateway::starting_at(500);
        let first = gw.create_invoice(&request("301025001")).await.unwrap();
        let second = gw.create_invoice(&request("301025002")).await.unwrap();
        assert_eq!(first.invoice_no, 500);
        assert_eq!(second.invoice_no, 501);

        let listed = gw.list_invoices("301025002").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].invoice_no, Some(501));
        assert!(gw.list_invoices("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_applies_to_every_call() {
        let gw = MockGateway::new();
        gw.fail_with(502, "bad gateway");
        let err = gw.list_invoices("x").await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert_eq!(gw.calls(), vec!["list_invoices".to_string()]);
    }

    #[tokio::test]
    async fn payments_filtered_by_day() {
        let gw = MockGateway::new();
        gw.insert_payment(PaymentRecord {
            created: Some("20251030120000".into()),
            amount: Some(Decimal::from(5)),
            ..Default::default()
        });
        gw.insert_payment(PaymentRecord {
            created: Some("20251029120000".into()),
            amount: Some(Decimal::from(7)),
            ..Default::default()
        });
        let day = NaiveDate::from_ymd_opt(2025, 10, 30).unwrap();
        let payments = gw.list_payments(day, day).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, Some(Decimal::from(5)));
    }
}
