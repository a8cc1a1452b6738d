use crate::input::InputError;
use crate::MenuAction;
use epay_core::amount::AmountError;
use epay_core::{DisplayStatus, InvoiceRecord, StatusLabel};
use gateway::GatewayError;
use rust_decimal::Decimal;

const MISSING: &str = "—";

/// Text to send back plus whether the main menu should be attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub show_menu: bool,
}

impl Reply {
    pub fn menu(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            show_menu: true,
        }
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            show_menu: false,
        }
    }
}

/// Shared formatting inputs.
pub(crate) struct Formatter<'a> {
    pub currency_label: &'a str,
    pub display_prefix: &'a str,
}

pub(crate) fn main_menu() -> Reply {
    Reply::menu("Choose an action:")
}

pub(crate) fn prompt_for(action: MenuAction, f: &Formatter<'_>) -> Reply {
    match action {
        MenuAction::Create => Reply::prompt(format!(
            "Enter the invoice amount in {} (for example 25.50):",
            f.currency_label
        )),
        MenuAction::Check => Reply::prompt(format!(
            "Enter the account number (for example {}301025001):",
            f.display_prefix
        )),
        MenuAction::Report => main_menu(),
    }
}

pub(crate) fn invalid_input(err: &InputError, f: &Formatter<'_>) -> Reply {
    let text = match err {
        InputError::Amount(AmountError::TooPrecise) => {
            "⚠️ Use at most two decimal places, for example 25.50.".to_string()
        }
        InputError::Amount(AmountError::NotPositive) => {
            "⚠️ The amount must be greater than zero.".to_string()
        }
        InputError::Amount(_) => format!(
            "⚠️ Please enter a number, for example 25.50 ({}).",
            f.currency_label
        ),
        InputError::EmptyAccountNumber => "⚠️ Please enter an account number.".to_string(),
    };
    Reply::prompt(text)
}

fn amount_text(amount: Option<Decimal>, f: &Formatter<'_>) -> String {
    match amount {
        Some(a) => format!("{} {}", a, f.currency_label),
        None => MISSING.to_string(),
    }
}

pub(crate) fn invoice_created(
    invoice_no: i64,
    account_no: &str,
    details: Option<&InvoiceRecord>,
    requested: Decimal,
    f: &Formatter<'_>,
) -> Reply {
    let mut text = format!(
        "✅ Invoice created\n\nInvoice No: {}\nAccount No: {}{}",
        invoice_no, f.display_prefix, account_no
    );
    match details {
        Some(rec) => {
            text.push_str(&format!(
                "\nAmount: {}\nStatus: {}",
                amount_text(rec.amount.or(Some(requested)), f),
                StatusLabel::from_code(rec.status).text()
            ));
        }
        None => {
            text.push_str(&format!(
                "\nAmount: {}\n(invoice details are not available yet)",
                amount_text(Some(requested), f)
            ));
        }
    }
    Reply::menu(text)
}

pub(crate) fn invoice_status(shown_as: &str, status: &DisplayStatus, f: &Formatter<'_>) -> Reply {
    match status {
        DisplayStatus::NotFound => {
            Reply::menu(format!("❌ Invoice with number {} was not found.", shown_as))
        }
        DisplayStatus::Found(report) => Reply::menu(format!(
            "📊 Invoice status\n\nNumber: {}\nStatus: {}\nAmount: {}\nIssued: {}",
            shown_as,
            report.status.text(),
            amount_text(report.amount, f),
            report.created
        )),
    }
}

pub(crate) fn payments_report(count: usize, total: Decimal, f: &Formatter<'_>) -> Reply {
    if count == 0 {
        return Reply::menu("📈 No payments received today.");
    }
    Reply::menu(format!(
        "📈 Payments today: {}\nTotal: {:.2} {}",
        count, total, f.currency_label
    ))
}

pub(crate) fn gateway_failure(doing: &str, err: &GatewayError) -> Reply {
    Reply::menu(format!("❌ Gateway error while {}:\n{}", doing, err))
}

pub(crate) fn internal_failure() -> Reply {
    Reply::menu("⚠️ Something went wrong on our side. Please try again later.")
}
