//! Reading progress.
//!
//! [`ProgressState`] tracks the highest page reached for the current
//! document; it only moves forward until [`ProgressState::reset`] is called
//! for a new document. Each completed page produces one [`ProgressReport`],
//! which the [`ProgressReporter`] hands to a background worker over a
//! bounded queue. A full queue drops the report.

pub mod reporter;

pub use reporter::{HttpProgressTransport, ProgressReporter, ProgressTransport};

use crate::config::{DocumentReference, PageField};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};

/// Highest page reached and total pages for the current document.
#[derive(Debug, Default)]
pub struct ProgressState {
    highest: AtomicU32,
    total: AtomicU32,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new document.
    pub fn reset(&self, total: u32) {
        self.highest.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    /// Record that `page` finished; returns the highest page reached.
    pub fn record(&self, page: u32) -> u32 {
        let previous = self.highest.fetch_max(page, Ordering::SeqCst);
        previous.max(page)
    }

    pub fn highest(&self) -> u32 {
        self.highest.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u32 {
        self.total.load(Ordering::SeqCst)
    }

    /// `Page {n} of {total}`
    pub fn label(&self) -> String {
        format!("Page {} of {}", self.highest(), self.total())
    }
}

/// One progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub email: String,
    pub document: String,
    pub pages_read: u32,
    pub total_pages: u32,
    pub timestamp: DateTime<Utc>,
    pub page_field: PageField,
    pub reference: DocumentReference,
}

impl ProgressReport {
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl Serialize for ProgressReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("email", &self.email)?;
        let reference_key = match self.reference {
            DocumentReference::FileId => "fileId",
            DocumentReference::PdfUrl => "pdfUrl",
        };
        map.serialize_entry(reference_key, &self.document)?;
        let page_key = match self.page_field {
            PageField::PagesRead => "pagesRead",
            PageField::PageViewed => "pageViewed",
        };
        map.serialize_entry(page_key, &self.pages_read)?;
        map.serialize_entry("totalPages", &self.total_pages)?;
        map.serialize_entry("timestamp", &self.timestamp_iso())?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    #[test]
    fn test_record_is_monotonic() {
        let state = ProgressState::new();
        state.reset(5);
        assert_eq!(state.record(3), 3);
        assert_eq!(state.record(1), 3);
        assert_eq!(state.record(5), 5);
        assert_eq!(state.highest(), 5);
        assert_eq!(state.label(), "Page 5 of 5");
    }

    #[test]
    fn test_reset_starts_over() {
        let state = ProgressState::new();
        state.reset(3);
        state.record(3);
        state.reset(2);
        assert_eq!(state.highest(), 0);
        assert_eq!(state.total(), 2);
        assert_eq!(state.label(), "Page 0 of 2");
    }

    #[test]
    fn test_concurrent_records_keep_maximum() {
        let state = Arc::new(ProgressState::new());
        state.reset(64);

        let handles: Vec<_> = (1..=64)
            .map(|page| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || state.record(page))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(state.highest(), 64);
    }

    fn report(page_field: PageField, reference: DocumentReference) -> ProgressReport {
        ProgressReport {
            email: "a@b.com".to_string(),
            document: "abc".to_string(),
            pages_read: 2,
            total_pages: 3,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
            page_field,
            reference,
        }
    }

    #[test]
    fn test_report_serializes_default_field_names() {
        let json = serde_json::to_value(report(PageField::PagesRead, DocumentReference::FileId)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "email": "a@b.com",
                "fileId": "abc",
                "pagesRead": 2,
                "totalPages": 3,
                "timestamp": "2025-03-14T09:26:53.000Z"
            })
        );
    }

    #[test]
    fn test_report_alternate_field_names() {
        let json = serde_json::to_value(report(PageField::PageViewed, DocumentReference::PdfUrl)).unwrap();
        assert_eq!(json["pageViewed"], 2);
        assert_eq!(json["pdfUrl"], "abc");
        assert!(json.get("pagesRead").is_none());
        assert!(json.get("fileId").is_none());
    }
}
