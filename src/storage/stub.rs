use async_trait::async_trait;
use tracing::info;

use super::{ReportSink, StorageError};
use crate::report::{PartDamage, ReportRecord};

/// Sink used when no Sheets backend is configured. Writes nothing, only logs.
pub struct StubSink {
    spreadsheet_id: Option<String>,
}

impl StubSink {
    pub fn new(spreadsheet_id: Option<String>) -> Self {
        Self { spreadsheet_id }
    }
}

#[async_trait]
impl ReportSink for StubSink {
    async fn append_master(
        &self,
        record: &ReportRecord,
        parts: &[PartDamage],
    ) -> Result<(), StorageError> {
        info!(
            "STUB: would log report {} with {} part(s)",
            record.report_id,
            parts.len()
        );
        Ok(())
    }

    async fn create_report_tab(
        &self,
        record: &ReportRecord,
        _parts: &[PartDamage],
    ) -> Result<String, StorageError> {
        info!("STUB: would create tab Report_{}", record.short_id());
        Ok(self.master_url())
    }

    fn master_url(&self) -> String {
        match &self.spreadsheet_id {
            Some(id) => format!("https://docs.google.com/spreadsheets/d/{}/edit", id),
            None => "https://docs.google.com/spreadsheets".to_string(),
        }
    }

    fn backend_name(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::new_record;

    #[tokio::test]
    async fn stub_writes_nothing_and_returns_generic_url() {
        let sink = StubSink::new(None);
        let record = new_record();
        sink.append_master(&record, &[]).await.unwrap();
        assert_eq!(
            sink.create_report_tab(&record, &[]).await.unwrap(),
            "https://docs.google.com/spreadsheets"
        );
    }
}
