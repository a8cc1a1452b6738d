//! Domain types and the stateful bits of the invoice bot: day-scoped account
//! numbers and mapping gateway invoice listings to a displayable status.

pub mod account;
pub mod amount;
pub mod models;
pub mod reconcile;

pub use account::{
    AccountNumberGenerator, FileSequenceStore, MemorySequenceStore, SequenceError, SequenceStore,
};
pub use models::{payments_total, AccountNumber, InvoiceRecord, InvoiceStatus, PaymentRecord};
pub use reconcile::{resolve, resolve_with, DisplayStatus, Selection, StatusLabel, StatusReport};
