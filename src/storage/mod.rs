mod rows;
mod sheets;
mod stub;

pub use rows::{header_row, master_rows, report_tab_rows, report_tab_title};
pub use sheets::SheetsSink;
pub use stub::StubSink;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::report::{PartDamage, ReportRecord};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("Sheets API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Parse(String),
}

/// Where finished reports are written.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Appends one row per part to the shared master log.
    async fn append_master(
        &self,
        record: &ReportRecord,
        parts: &[PartDamage],
    ) -> Result<(), StorageError>;

    /// Creates a dedicated tab for this report and returns its locator URL.
    async fn create_report_tab(
        &self,
        record: &ReportRecord,
        parts: &[PartDamage],
    ) -> Result<String, StorageError>;

    fn master_url(&self) -> String;

    fn backend_name(&self) -> &str;
}

pub fn new_record() -> ReportRecord {
    ReportRecord {
        report_id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
    }
}

pub fn build_sink(config: &Config) -> Result<Arc<dyn ReportSink>, StorageError> {
    match (&config.spreadsheet_id, &config.sheets_access_token) {
        (Some(spreadsheet_id), Some(token)) => Ok(Arc::new(SheetsSink::new(
            spreadsheet_id.clone(),
            token.clone(),
            config.master_sheet_name.clone(),
            config.sheets_timeout,
        )?)),
        _ => {
            tracing::warn!(
                "Missing GOOGLE_SHEETS_SPREADSHEET_ID or GOOGLE_SHEETS_ACCESS_TOKEN; running in stub mode"
            );
            Ok(Arc::new(StubSink::new(config.spreadsheet_id.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_get_fresh_uuid() {
        let a = new_record();
        let b = new_record();
        assert_ne!(a.report_id, b.report_id);
        assert!(Uuid::parse_str(&a.report_id).is_ok());
        assert_eq!(a.short_id().len(), 8);
    }

    #[test]
    fn stub_selected_without_token() {
        let config = Config::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "GOOGLE_SHEETS_SPREADSHEET_ID" => Some("sheet123".to_string()),
            _ => None,
        })
        .unwrap();
        let sink = build_sink(&config).unwrap();
        assert_eq!(sink.backend_name(), "stub");
        assert_eq!(
            sink.master_url(),
            "https://docs.google.com/spreadsheets/d/sheet123/edit"
        );
    }

    #[test]
    fn sheets_selected_with_id_and_token() {
        let config = Config::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "GOOGLE_SHEETS_SPREADSHEET_ID" => Some("sheet123".to_string()),
            "GOOGLE_SHEETS_ACCESS_TOKEN" => Some("ya29.token".to_string()),
            _ => None,
        })
        .unwrap();
        let sink = build_sink(&config).unwrap();
        assert_eq!(sink.backend_name(), "google-sheets");
    }
}
