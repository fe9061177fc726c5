use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::{AgentError, VisionModel};
use crate::images::ValidatedImage;

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: Vec<InputMessage>,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct InputMessage {
    role: &'static str,
    content: Vec<InputContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputContent {
    InputText { text: String },
    InputImage { image_url: String },
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    status: Option<String>,
    incomplete_details: Option<IncompleteDetails>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct IncompleteDetails {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// OpenAI Responses API client for image + text input.
pub struct OpenAiVision {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_output_tokens: u32,
}

impl OpenAiVision {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        max_output_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Request(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url,
            max_output_tokens,
        })
    }
}

#[async_trait]
impl VisionModel for OpenAiVision {
    async fn complete(
        &self,
        images: &[ValidatedImage],
        prompt: &str,
        hint: Option<&str>,
    ) -> Result<String, AgentError> {
        info!(
            "Requesting damage estimate from {} ({} image(s))",
            self.model,
            images.len()
        );

        let mut content = vec![InputContent::InputText {
            text: user_instruction(images.len(), hint),
        }];
        content.extend(images.iter().map(|img| InputContent::InputImage {
            image_url: img.data_url(),
        }));

        let body = ResponsesRequest {
            model: &self.model,
            instructions: prompt,
            input: vec![InputMessage {
                role: "user",
                content,
            }],
            temperature: 0.0,
            max_output_tokens: self.max_output_tokens,
        };

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::Request(format!("response read failed: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or(text);
            return Err(match status.as_u16() {
                401 | 403 => AgentError::Auth(message),
                429 => AgentError::RateLimited(message),
                code => AgentError::Api {
                    status: code,
                    message,
                },
            });
        }

        extract_output_text(&text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn user_instruction(image_count: usize, hint: Option<&str>) -> String {
    let mut text = if image_count == 1 {
        "Analyze the damage in this vehicle image and respond with JSON only.".to_string()
    } else {
        format!(
            "Analyze the damage across these {} images of the same vehicle and respond with a single JSON report only.",
            image_count
        )
    };
    if let Some(hint) = hint {
        text.push_str("\n\nVehicle details provided by the user: ");
        text.push_str(hint);
    }
    text
}

/// Concatenates the `output_text` blocks of every message in a Responses payload.
fn extract_output_text(body: &str) -> Result<String, AgentError> {
    let parsed: ResponsesResponse =
        serde_json::from_str(body).map_err(|e| AgentError::Parse(e.to_string()))?;

    if parsed.status.as_deref() == Some("incomplete") {
        let reason = parsed
            .incomplete_details
            .and_then(|d| d.reason)
            .unwrap_or_else(|| "unknown".to_string());
        warn!("Model response is incomplete ({}); output may be truncated", reason);
    }

    let text: String = parsed
        .output
        .iter()
        .filter(|item| item.item_type == "message")
        .flat_map(|item| item.content.iter())
        .filter(|c| c.content_type == "output_text")
        .filter_map(|c| c.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(AgentError::EmptyResponse);
    }
    Ok(text)
}
