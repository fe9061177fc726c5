use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use super::model::{DamageReport, PartDamage, ReportRecord};
use super::normalize::normalize;
use super::recovery::{recover, UnrecoverableFormat};
use crate::agents::{VisionModel, ESTIMATOR_PROMPT};
use crate::error::ReportError;
use crate::images::{self, ImageError, ValidatedImage};
use crate::storage::{new_record, ReportSink};

#[derive(Debug, Serialize)]
pub struct ReportOutcome {
    pub report_id: String,
    pub sheet_url: String,
    pub damage_report: DamageReport,
}

/// Runs one estimate: validate, ask the model, recover, normalize, persist.
pub struct ReportService {
    vision: Arc<dyn VisionModel>,
    sink: Arc<dyn ReportSink>,
    model_timeout: Duration,
    storage_timeout: Duration,
}

impl ReportService {
    pub fn new(
        vision: Arc<dyn VisionModel>,
        sink: Arc<dyn ReportSink>,
        model_timeout: Duration,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            vision,
            sink,
            model_timeout,
            storage_timeout,
        }
    }

    pub fn model_name(&self) -> &str {
        self.vision.model_name()
    }

    pub fn sink_backend(&self) -> &str {
        self.sink.backend_name()
    }

    pub async fn produce_report(
        &self,
        images: Vec<Vec<u8>>,
        vehicle_hint: Option<String>,
    ) -> Result<ReportOutcome, ReportError> {
        if images.is_empty() {
            return Err(ReportError::EmptyInput);
        }
        let images = validate_all(images)?;

        let hint = vehicle_hint
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty());

        let raw = match timeout(
            self.model_timeout,
            self.vision.complete(&images, ESTIMATOR_PROMPT, hint),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(ReportError::ModelInvocationFailed(e.to_string())),
            Err(_) => {
                return Err(ReportError::ModelInvocationFailed(format!(
                    "no response from {} within {}s",
                    self.vision.model_name(),
                    self.model_timeout.as_secs()
                )))
            }
        };

        let recovered = recover(&raw)?;
        let report: DamageReport = serde_json::from_value(recovered.value)
            .map_err(|e| UnrecoverableFormat::new(&raw, e.to_string()))?;

        if !report.is_car {
            info!("Model says the upload is not a car: {}", report.notes);
            return Err(ReportError::NotACar {
                notes: report.notes,
            });
        }

        let report = normalize(report);
        let record = new_record();
        info!(
            "Report {}: {} part(s), total {} (json {})",
            record.report_id,
            report.parts.len(),
            report.overall_estimated_repair_cost,
            recovered.tier.as_str()
        );

        let sheet_url = self.persist(&record, &report.parts).await?;

        Ok(ReportOutcome {
            report_id: record.report_id,
            sheet_url,
            damage_report: report,
        })
    }

    /// Master-log failure is fatal; report-tab failure falls back to the master URL.
    async fn persist(
        &self,
        record: &ReportRecord,
        parts: &[PartDamage],
    ) -> Result<String, ReportError> {
        if parts.is_empty() {
            info!("Report {} has no damaged parts; nothing to write", record.report_id);
            return Ok(self.sink.master_url());
        }

        match timeout(self.storage_timeout, self.sink.append_master(record, parts)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ReportError::PersistenceFailed(e.to_string())),
            Err(_) => {
                return Err(ReportError::PersistenceFailed(format!(
                    "master log append timed out after {}s",
                    self.storage_timeout.as_secs()
                )))
            }
        }

        match timeout(
            self.storage_timeout,
            self.sink.create_report_tab(record, parts),
        )
        .await
        {
            Ok(Ok(url)) => Ok(url),
            Ok(Err(e)) => {
                warn!(
                    "Failed to create report tab for {}: {}; using master log only",
                    record.report_id, e
                );
                Ok(self.sink.master_url())
            }
            Err(_) => {
                warn!(
                    "Report tab creation for {} timed out; using master log only",
                    record.report_id
                );
                Ok(self.sink.master_url())
            }
        }
    }
}

fn validate_all(uploads: Vec<Vec<u8>>) -> Result<Vec<ValidatedImage>, ReportError> {
    uploads
        .into_iter()
        .enumerate()
        .map(|(index, bytes)| {
            images::validate(bytes).map_err(|e| match e {
                ImageError::Empty => ReportError::EmptyFile { index },
                other => ReportError::InvalidImage {
                    index,
                    reason: other.to_string(),
                },
            })
        })
        .collect()
}
