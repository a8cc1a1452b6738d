//! Day-scoped account number sequencing.
//!
//! The last issued number is kept in a single slot. Reading and writing that
//! slot is an unsynchronized read-modify-write: two callers racing on the same
//! store can be handed the same number. Callers that need uniqueness under
//! concurrency must serialize access themselves or plug in a locking store.

use crate::models::AccountNumber;
use chrono::{Local, NaiveDate};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

const DAY_PREFIX_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("sequence store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("stored account number `{0}` has a non-numeric sequence")]
    Corrupt(String),
}

/// Single-slot storage for the last issued account number.
pub trait SequenceStore: Send + Sync {
    /// Returns the stored value, or an empty string when nothing was stored yet.
    fn load(&self) -> io::Result<String>;
    /// Replaces the slot with `value`.
    fn save(&self, value: &str) -> io::Result<()>;
}

/// Flat-file store. No locking, no history.
#[derive(Debug, Clone)]
pub struct FileSequenceStore {
    path: PathBuf,
}

impl FileSequenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SequenceStore for FileSequenceStore {
    fn load(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(s.trim().to_string()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    fn save(&self, value: &str) -> io::Result<()> {
        fs::write(&self.path, value)
    }
}

#[derive(Debug, Default)]
pub struct MemorySequenceStore {
    slot: Mutex<String>,
}

impl MemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(value.into()),
        }
    }
}

impl SequenceStore for MemorySequenceStore {
    fn load(&self) -> io::Result<String> {
        Ok(self
            .slot
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "sequence slot poisoned"))?
            .clone())
    }

    fn save(&self, value: &str) -> io::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "sequence slot poisoned"))?;
        *slot = value.to_string();
        Ok(())
    }
}

impl<T: SequenceStore + ?Sized> SequenceStore for std::sync::Arc<T> {
    fn load(&self) -> io::Result<String> {
        (**self).load()
    }

    fn save(&self, value: &str) -> io::Result<()> {
        (**self).save(value)
    }
}

pub struct AccountNumberGenerator<S> {
    store: S,
}

impl<S: SequenceStore> AccountNumberGenerator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Issues the next account number for the local calendar day.
    pub fn next_account_number(&self) -> Result<AccountNumber, SequenceError> {
        self.next_for(Local::now().date_naive())
    }

    pub fn next_for(&self, today: NaiveDate) -> Result<AccountNumber, SequenceError> {
        let prefix = day_prefix(today);
        let last = self.store.load()?;

        let seq = match last.get(..DAY_PREFIX_LEN) {
            Some(stored) if stored == prefix => {
                let tail = &last[DAY_PREFIX_LEN..];
                if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(SequenceError::Corrupt(last.clone()));
                }
                tail
                    .parse::<u32>()
                    .ok()
                    .and_then(|n| n.checked_add(1))
                    .ok_or_else(|| SequenceError::Corrupt(last.clone()))?
            }
            _ => 1,
        };

        let next = format!("{}{:03}", prefix, seq);
        self.store.save(&next)?;
        tracing::debug!(account_no = %next, "issued account number");
        Ok(AccountNumber::new(next))
    }
}

/// `DDMMYY` for the given date.
pub fn day_prefix(date: NaiveDate) -> String {
    date.format("%d%m%y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sequence_counts_up_within_a_day() {
        let gen = AccountNumberGenerator::new(MemorySequenceStore::new());
        let today = day(2025, 10, 30);
        for n in 1..=12 {
            let acc = gen.next_for(today).unwrap();
            assert_eq!(acc.as_str(), format!("301025{:03}", n));
        }
        assert_eq!(gen.store().load().unwrap(), "301025012");
    }

    #[test]
    fn new_day_resets_sequence() {
        let gen = AccountNumberGenerator::new(MemorySequenceStore::with_value("291025047"));
        let acc = gen.next_for(day(2025, 10, 30)).unwrap();
        assert_eq!(acc.as_str(), "301025001");
    }

    #[test]
    fn same_day_in_another_year_is_not_today() {
        let gen = AccountNumberGenerator::new(MemorySequenceStore::with_value("301024005"));
        assert_eq!(gen.next_for(day(2025, 10, 30)).unwrap().as_str(), "301025001");
    }

    #[test]
    fn sequence_grows_past_three_digits() {
        let gen = AccountNumberGenerator::new(MemorySequenceStore::with_value("301025999"));
        let today = day(2025, 10, 30);
        assert_eq!(gen.next_for(today).unwrap().as_str(), "3010251000");
        assert_eq!(gen.next_for(today).unwrap().as_str(), "3010251001");
    }

    #[test]
    fn garbage_with_todays_prefix_is_reported() {
        let gen = AccountNumberGenerator::new(MemorySequenceStore::with_value("301025abc"));
        let err = gen.next_for(day(2025, 10, 30)).unwrap_err();
        assert!(matches!(err, SequenceError::Corrupt(v) if v == "301025abc"));
    }

    #[test]
    fn signed_tail_is_reported() {
        let gen = AccountNumberGenerator::new(MemorySequenceStore::with_value("301025+5"));
        let err = gen.next_for(day(2025, 10, 30)).unwrap_err();
        assert!(matches!(err, SequenceError::Corrupt(v) if v == "301025+5"));
    }

    #[test]
    fn exhausted_sequence_is_reported_instead_of_wrapping() {
        let stored = format!("301025{}", u32::MAX);
        let gen = AccountNumberGenerator::new(MemorySequenceStore::with_value(stored.clone()));
        let err = gen.next_for(day(2025, 10, 30)).unwrap_err();
        assert!(matches!(err, SequenceError::Corrupt(v) if v == stored));
        assert_eq!(gen.store().load().unwrap(), stored);
    }

    #[test]
    fn short_stored_value_resets() {
        let gen = AccountNumberGenerator::new(MemorySequenceStore::with_value("42"));
        assert_eq!(gen.next_for(day(2025, 1, 2)).unwrap().as_str(), "020125001");
    }
}
