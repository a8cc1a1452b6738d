use crate::models::{InvoiceRecord, InvoiceStatus};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_PLACEHOLDER: &str = "—";

const COMPACT_TIMESTAMP: &str = "%Y%m%d%H%M%S";
const DISPLAY_TIMESTAMP: &str = "%d.%m.%Y %H:%M";

/// Which record wins when several invoices share an account number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Last element in the order the gateway returned them.
    #[default]
    Last,
    /// Greatest `Created` timestamp; list position breaks ties and covers unparseable stamps.
    NewestCreated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLabel {
    Known(InvoiceStatus),
    Unknown(Option<i32>),
}

impl StatusLabel {
    pub fn from_code(code: Option<i32>) -> Self {
        code.and_then(InvoiceStatus::from_code)
            .map(StatusLabel::Known)
            .unwrap_or(StatusLabel::Unknown(code))
    }

    pub fn text(&self) -> &'static str {
        match self {
            StatusLabel::Known(status) => status.label(),
            StatusLabel::Unknown(_) => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub invoice_no: Option<i64>,
    pub account_no: String,
    pub status: StatusLabel,
    pub amount: Option<Decimal>,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayStatus {
    NotFound,
    Found(StatusReport),
}

impl DisplayStatus {
    pub fn status_text(&self) -> &'static str {
        match self {
            DisplayStatus::NotFound => "Not found",
            DisplayStatus::Found(report) => report.status.text(),
        }
    }
}

pub fn resolve(records: &[InvoiceRecord]) -> DisplayStatus {
    resolve_with(records, Selection::Last)
}

pub fn resolve_with(records: &[InvoiceRecord], selection: Selection) -> DisplayStatus {
    let chosen = match selection {
        Selection::Last => records.last(),
        Selection::NewestCreated => newest_created(records),
    };

    match chosen {
        None => DisplayStatus::NotFound,
        Some(rec) => DisplayStatus::Found(StatusReport {
            invoice_no: rec.invoice_no,
            account_no: rec.account_no.clone(),
            status: StatusLabel::from_code(rec.status),
            amount: rec.amount,
            created: format_timestamp(rec.created.as_deref()),
        }),
    }
}

fn newest_created(records: &[InvoiceRecord]) -> Option<&InvoiceRecord> {
    // max_by_key keeps the last of equal keys, so position decides ties.
    records
        .iter()
        .max_by_key(|r| r.created.as_deref().and_then(parse_compact))
}

fn parse_compact(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), COMPACT_TIMESTAMP).ok()
}

/// `20251030143005` becomes `30.10.2025 14:30`; anything else becomes the placeholder.
pub fn format_timestamp(raw: Option<&str>) -> String {
    raw.and_then(parse_compact)
        .map(|ts| ts.format(DISPLAY_TIMESTAMP).to_string())
        .unwrap_or_else(|| TIMESTAMP_PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(no: i64, status: Option<i32>, created: Option<&str>) -> InvoiceRecord {
        InvoiceRecord {
            invoice_no: Some(no),
            account_no: "301025001".into(),
            status,
            created: created.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn empty_is_not_found() {
        assert_eq!(resolve(&[]), DisplayStatus::NotFound);
        assert_eq!(resolve_with(&[], Selection::NewestCreated), DisplayStatus::NotFound);
    }

    #[test]
    fn paid_code_maps_to_paid() {
        let out = resolve(&[rec(1, Some(3), Some("20251030143005"))]);
        assert_eq!(out.status_text(), "Paid");
        match out {
            DisplayStatus::Found(r) => assert_eq!(r.created, "30.10.2025 14:30"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unmapped_code_is_unknown() {
        let out = resolve(&[rec(1, Some(99), None)]);
        match out {
            DisplayStatus::Found(r) => {
                assert_eq!(r.status, StatusLabel::Unknown(Some(99)));
                assert_eq!(r.status.text(), "Unknown");
                assert_eq!(r.created, TIMESTAMP_PLACEHOLDER);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(resolve(&[rec(1, None, None)]).status_text(), "Unknown");
    }

    #[test]
    fn last_record_wins_by_default() {
        let records = [
            rec(10, Some(5), Some("20251030100000")),
            rec(11, Some(1), Some("20251029100000")),
        ];
        match resolve(&records) {
            DisplayStatus::Found(r) => assert_eq!(r.invoice_no, Some(11)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn newest_created_picks_by_timestamp() {
        let records = [
            rec(10, Some(5), Some("20251030100000")),
            rec(11, Some(1), Some("20251029100000")),
            rec(12, Some(1), Some("garbage")),
        ];
        match resolve_with(&records, Selection::NewestCreated) {
            DisplayStatus::Found(r) => assert_eq!(r.invoice_no, Some(10)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn newest_created_falls_back_to_position() {
        let records = [rec(10, Some(5), None), rec(11, Some(1), None)];
        match resolve_with(&records, Selection::NewestCreated) {
            DisplayStatus::Found(r) => assert_eq!(r.invoice_no, Some(11)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn timestamp_formatting() {
        assert_eq!(format_timestamp(Some("20250102030405")), "02.01.2025 03:04");
        assert_eq!(format_timestamp(Some("2025-01-02")), TIMESTAMP_PLACEHOLDER);
        assert_eq!(format_timestamp(Some("")), TIMESTAMP_PLACEHOLDER);
        assert_eq!(format_timestamp(None), TIMESTAMP_PLACEHOLDER);
    }
}
