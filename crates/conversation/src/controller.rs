use crate::input::{self, InputError};
use crate::replies::{self, Formatter, Reply};
use chrono::{Local, NaiveDate};
use epay_core::{payments_total, resolve_with, AccountNumberGenerator, Selection, SequenceStore};
use gateway::{InvoiceGateway, NewInvoice};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type UserId = i64;

/// What the bot expects from a user's next text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    AwaitingAmount,
    AwaitingAccountNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Create,
    Check,
    Report,
}

impl MenuAction {
    pub const ALL: [MenuAction; 3] = [MenuAction::Create, MenuAction::Check, MenuAction::Report];

    /// Accepts button callback data as well as typed commands.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().trim_start_matches('/').to_ascii_lowercase();
        match word.as_str() {
            "create" => Some(MenuAction::Create),
            "check" => Some(MenuAction::Check),
            "report" => Some(MenuAction::Report),
            _ => None,
        }
    }

    pub fn callback_data(&self) -> &'static str {
        match self {
            MenuAction::Create => "create",
            MenuAction::Check => "check",
            MenuAction::Report => "report",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::Create => "🧾 Create invoice",
            MenuAction::Check => "🔍 Check status",
            MenuAction::Report => "📈 Today's payments",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub currency_code: u16,
    pub currency_label: String,
    pub display_prefix: String,
    pub invoice_info: String,
    pub selection: Selection,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            currency_code: 933,
            currency_label: "BYN".to_string(),
            display_prefix: String::new(),
            invoice_info: "Payment for services".to_string(),
            selection: Selection::Last,
        }
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Per-user dialogue state plus the calls each state transition triggers.
pub struct Controller {
    pending: Mutex<HashMap<UserId, PendingAction>>,
    generator: AccountNumberGenerator<Arc<dyn SequenceStore>>,
    gateway: Arc<dyn InvoiceGateway>,
    settings: ControllerSettings,
    today: fn() -> NaiveDate,
}

impl Controller {
    pub fn new(
        gateway: Arc<dyn InvoiceGateway>,
        store: Arc<dyn SequenceStore>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            generator: AccountNumberGenerator::new(store),
            gateway,
            settings,
            today: local_today,
        }
    }

    /// Replaces the calendar used for account numbers and reports.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub async fn pending_action(&self, user: UserId) -> Option<PendingAction> {
        self.pending.lock().await.get(&user).copied()
    }

    fn formatter(&self) -> Formatter<'_> {
        Formatter {
            currency_label: &self.settings.currency_label,
            display_prefix: &self.settings.display_prefix,
        }
    }

    async fn set_pending(&self, user: UserId, action: Option<PendingAction>) {
        let mut pending = self.pending.lock().await;
        match action {
            Some(a) => {
                pending.insert(user, a);
            }
            None => {
                pending.remove(&user);
            }
        }
    }

    /// A menu button was pressed.
    pub async fn select(&self, user: UserId, action: MenuAction) -> Reply {
        tracing::debug!(user_id = user, ?action, "menu action");
        match action {
            MenuAction::Create => {
                self.set_pending(user, Some(PendingAction::AwaitingAmount)).await;
                replies::prompt_for(action, &self.formatter())
            }
            MenuAction::Check => {
                self.set_pending(user, Some(PendingAction::AwaitingAccountNumber))
                    .await;
                replies::prompt_for(action, &self.formatter())
            }
            MenuAction::Report => {
                self.set_pending(user, None).await;
                self.payments_report().await
            }
        }
    }

    /// Free text from a user. Consumes whatever action was pending.
    pub async fn handle_text(&self, user: UserId, text: &str) -> Reply {
        let pending = self.pending.lock().await.remove(&user);
        match pending {
            None => match MenuAction::parse(text) {
                Some(action) => self.select(user, action).await,
                None => replies::main_menu(),
            },
            Some(PendingAction::AwaitingAmount) => self.create_invoice(user, text).await,
            Some(PendingAction::AwaitingAccountNumber) => self.check_status(user, text).await,
        }
    }

    async fn create_invoice(&self, user: UserId, text: &str) -> Reply {
        let amount = match input::amount(text) {
            Ok(a) => a,
            Err(e) => return self.reprompt(user, PendingAction::AwaitingAmount, &e).await,
        };

        let account_no = match self.generator.next_for((self.today)()) {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(user_id = user, error = %e, "could not issue account number");
                return replies::internal_failure();
            }
        };

        let request = NewInvoice {
            account_no: account_no.clone(),
            amount,
            currency: self.settings.currency_code,
            info: self.settings.invoice_info.clone(),
        };

        let created = match self.gateway.create_invoice(&request).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    user_id = user,
                    account_no = %account_no,
                    error = %e,
                    "invoice creation failed"
                );
                return replies::gateway_failure("creating the invoice", &e);
            }
        };

        let details = match self.gateway.get_invoice_details(created.invoice_no).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(
                    invoice_no = created.invoice_no,
                    error = %e,
                    "invoice details request failed"
                );
                None
            }
        };

        tracing::info!(
            user_id = user,
            account_no = %account_no,
            invoice_no = created.invoice_no,
            "invoice issued"
        );

        replies::invoice_created(
            created.invoice_no,
            account_no.as_str(),
            details.as_ref(),
            amount,
            &self.formatter(),
        )
    }

    async fn check_status(&self, user: UserId, text: &str) -> Reply {
        let key = match input::lookup_key(text) {
            Ok(k) => k,
            Err(e) => return self.reprompt(user, PendingAction::AwaitingAccountNumber, &e).await,
        };
        let shown_as = format!("{}{}", self.settings.display_prefix, key);

        match self.gateway.list_invoices(key).await {
            Ok(records) => {
                let status = resolve_with(&records, self.settings.selection);
                tracing::info!(
                    user_id = user,
                    account_no = key,
                    matches = records.len(),
                    status = status.status_text(),
                    "status checked"
                );
                replies::invoice_status(&shown_as, &status, &self.formatter())
            }
            Err(e) => {
                tracing::warn!(user_id = user, account_no = key, error = %e, "status check failed");
                replies::gateway_failure("checking the status", &e)
            }
        }
    }

    async fn payments_report(&self) -> Reply {
        let today = (self.today)();
        match self.gateway.list_payments(today, today).await {
            Ok(payments) => {
                let total: Decimal = payments_total(&payments);
                replies::payments_report(payments.len(), total, &self.formatter())
            }
            Err(e) => {
                tracing::warn!(error = %e, "payments report failed");
                replies::gateway_failure("loading payments", &e)
            }
        }
    }

    async fn reprompt(&self, user: UserId, keep: PendingAction, err: &InputError) -> Reply {
        tracing::debug!(user_id = user, error = %err, "input rejected");
        self.set_pending(user, Some(keep)).await;
        replies::invalid_input(err, &self.formatter())
    }
}
