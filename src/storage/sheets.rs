use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

use super::rows::{header_row, master_rows, report_tab_rows, report_tab_title};
use super::{ReportSink, StorageError};
use crate::report::{PartDamage, ReportRecord};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets v4 REST backend.
pub struct SheetsSink {
    client: Client,
    spreadsheet_id: String,
    access_token: String,
    master_sheet: String,
}

impl SheetsSink {
    pub fn new(
        spreadsheet_id: String,
        access_token: String,
        master_sheet: String,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Request(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            spreadsheet_id,
            access_token,
            master_sheet,
        })
    }

    /// `.../spreadsheets/{id}/values/{range}{suffix}` with the range percent-encoded.
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, StorageError> {
        let target = format!("{}{}", range, suffix);
        let mut url = Url::parse(SHEETS_API).map_err(|e| StorageError::Request(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::Request("invalid Sheets API base URL".to_string()))?
            .extend([self.spreadsheet_id.as_str(), "values", target.as_str()]);
        Ok(url)
    }

    async fn call(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, StorageError> {
        let response = self
            .client
            .request(method, url)
            .bearer_auth(&self.access_token)
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StorageError::Request(format!("response read failed: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| StorageError::Parse(e.to_string()))
    }

    async fn append_rows(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<(), StorageError> {
        let url = self.values_url(range, ":append")?;
        self.call(
            Method::POST,
            url,
            &[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ],
            &json!({ "values": rows }),
        )
        .await?;
        Ok(())
    }

    async fn add_sheet(&self, title: &str) -> Result<i64, StorageError> {
        let url = Url::parse(&format!("{}/{}:batchUpdate", SHEETS_API, self.spreadsheet_id))
            .map_err(|e| StorageError::Request(e.to_string()))?;
        let reply = self
            .call(
                Method::POST,
                url,
                &[],
                &json!({
                    "requests": [{ "addSheet": { "properties": { "title": title } } }]
                }),
            )
            .await?;

        reply["replies"][0]["addSheet"]["properties"]["sheetId"]
            .as_i64()
            .ok_or_else(|| StorageError::Parse("addSheet reply has no sheetId".to_string()))
    }
}

#[async_trait]
impl ReportSink for SheetsSink {
    async fn append_master(
        &self,
        record: &ReportRecord,
        parts: &[PartDamage],
    ) -> Result<(), StorageError> {
        let range = a1_range(&self.master_sheet, "A2");
        self.append_rows(&range, master_rows(record, parts)).await?;
        info!(
            "Appended {} part row(s) for report {} to {}",
            parts.len(),
            record.report_id,
            self.master_sheet
        );
        Ok(())
    }

    async fn create_report_tab(
        &self,
        record: &ReportRecord,
        parts: &[PartDamage],
    ) -> Result<String, StorageError> {
        let title = report_tab_title(record);
        let sheet_id = self.add_sheet(&title).await?;

        let header_url = self.values_url(&a1_range(&title, "A1"), "")?;
        self.call(
            Method::PUT,
            header_url,
            &[("valueInputOption", "RAW")],
            &json!({ "values": [header_row()] }),
        )
        .await?;

        self.append_rows(&a1_range(&title, "A2"), report_tab_rows(record, parts))
            .await?;

        info!("Created report tab {} (gid {})", title, sheet_id);
        Ok(format!(
            "https://docs.google.com/spreadsheets/d/{}/edit#gid={}",
            self.spreadsheet_id, sheet_id
        ))
    }

    fn master_url(&self) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}/edit",
            self.spreadsheet_id
        )
    }

    fn backend_name(&self) -> &str {
        "google-sheets"
    }
}

/// A1 notation with the sheet name quoted, so names with spaces or
/// punctuation resolve. Embedded quotes are doubled.
fn a1_range(sheet: &str, cell: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> SheetsSink {
        SheetsSink::new(
            "abc123".to_string(),
            "token".to_string(),
            "Damage Reports".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn values_url_encodes_range() {
        let url = sink()
            .values_url(&a1_range("Damage Reports", "A2"), ":append")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/'Damage%20Reports'!A2:append"
        );
    }

    #[test]
    fn a1_range_quotes_sheet_name() {
        assert_eq!(a1_range("Damage Reports", "A2"), "'Damage Reports'!A2");
        assert_eq!(a1_range("Report_1b4e28ba", "A1"), "'Report_1b4e28ba'!A1");
        assert_eq!(a1_range("O'Brien", "A1"), "'O''Brien'!A1");
    }

    #[test]
    fn master_url_points_at_spreadsheet() {
        assert_eq!(
            sink().master_url(),
            "https://docs.google.com/spreadsheets/d/abc123/edit"
        );
    }
}
