use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::report::UnrecoverableFormat;

const NOT_A_CAR_DEFAULT: &str = "The uploaded image does not appear to be a car.";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No images were uploaded.")]
    EmptyInput,

    #[error("Uploaded file #{} is empty.", .index + 1)]
    EmptyFile { index: usize },

    #[error("Uploaded file #{} is not a valid image: {}", .index + 1, .reason)]
    InvalidImage { index: usize, reason: String },

    #[error("Malformed upload: {0}")]
    InvalidUpload(String),

    #[error("Model analysis failed: {0}")]
    ModelInvocationFailed(String),

    #[error(transparent)]
    UnrecoverableFormat(#[from] UnrecoverableFormat),

    #[error("{}", not_a_car_message(.notes))]
    NotACar { notes: String },

    #[error("Writing the report failed: {0}")]
    PersistenceFailed(String),
}

fn not_a_car_message(notes: &str) -> &str {
    if notes.trim().is_empty() {
        NOT_A_CAR_DEFAULT
    } else {
        notes
    }
}

impl ReportError {
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::EmptyInput => "empty_input",
            ReportError::EmptyFile { .. } => "empty_file",
            ReportError::InvalidImage { .. } => "invalid_image",
            ReportError::InvalidUpload(_) => "invalid_upload",
            ReportError::ModelInvocationFailed(_) => "model_invocation_failed",
            ReportError::UnrecoverableFormat(_) => "unrecoverable_format",
            ReportError::NotACar { .. } => "not_a_car",
            ReportError::PersistenceFailed(_) => "persistence_failed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ReportError::EmptyInput
            | ReportError::EmptyFile { .. }
            | ReportError::InvalidImage { .. }
            | ReportError::InvalidUpload(_)
            | ReportError::NotACar { .. } => StatusCode::BAD_REQUEST,
            ReportError::ModelInvocationFailed(_)
            | ReportError::UnrecoverableFormat(_)
            | ReportError::PersistenceFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{} ({})", self, self.kind());
        }
        if let ReportError::UnrecoverableFormat(e) = &self {
            tracing::error!("Unparseable model output excerpt: {}", e.excerpt);
        }

        (
            status,
            Json(json!({ "error": self.kind(), "detail": self.to_string() })),
        )
            .into_response()
    }
}
