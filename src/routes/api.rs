use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ReportError;
use crate::report::ReportOutcome;
use crate::state::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Car damage API is running"
    }))
}

/// `POST /analyze`: every `files`/`file` part is one image of the same vehicle;
/// an optional `vehicle_hint` (or `car_info`) text part describes it.
pub async fn analyze_images(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ReportOutcome>, ReportError> {
    let mut images: Vec<Vec<u8>> = Vec::new();
    let mut vehicle_hint: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ReportError::InvalidUpload(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "files" | "file" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ReportError::InvalidUpload(e.to_string()))?;
                images.push(data.to_vec());
            }
            "vehicle_hint" | "car_info" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ReportError::InvalidUpload(e.to_string()))?;
                vehicle_hint = Some(text);
            }
            _ => {}
        }
    }

    tracing::info!("Received {} image(s) for analysis", images.len());
    let outcome = state.reports.produce_report(images, vehicle_hint).await?;
    Ok(Json(outcome))
}
