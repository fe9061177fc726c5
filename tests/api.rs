use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use dentlog::agents::{AgentError, VisionModel};
use dentlog::config::Config;
use dentlog::images::ValidatedImage;
use dentlog::report::{PartDamage, ReportRecord, ReportService};
use dentlog::routes::build_router;
use dentlog::state::AppState;
use dentlog::storage::{ReportSink, StorageError};

const BOUNDARY: &str = "dentlog-test-boundary";

struct CannedVision {
    reply: String,
    calls: AtomicUsize,
}

#[async_trait]
impl VisionModel for CannedVision {
    async fn complete(
        &self,
        _images: &[ValidatedImage],
        _prompt: &str,
        _hint: Option<&str>,
    ) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

#[derive(Default)]
struct CountingSink {
    rows: AtomicUsize,
}

#[async_trait]
impl ReportSink for CountingSink {
    async fn append_master(
        &self,
        _record: &ReportRecord,
        parts: &[PartDamage],
    ) -> Result<(), StorageError> {
        self.rows.fetch_add(parts.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn create_report_tab(
        &self,
        record: &ReportRecord,
        _parts: &[PartDamage],
    ) -> Result<String, StorageError> {
        Ok(format!(
            "https://docs.google.com/spreadsheets/d/test/edit#gid={}",
            record.short_id()
        ))
    }

    fn master_url(&self) -> String {
        "https://docs.google.com/spreadsheets/d/test/edit".to_string()
    }

    fn backend_name(&self) -> &str {
        "counting"
    }
}

struct Harness {
    app: axum::Router,
    vision: Arc<CannedVision>,
    sink: Arc<CountingSink>,
}

fn harness(reply: &str) -> Harness {
    let config = Config::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("sk-test".to_string()),
        _ => None,
    })
    .unwrap();

    let vision = Arc::new(CannedVision {
        reply: reply.to_string(),
        calls: AtomicUsize::new(0),
    });
    let sink = Arc::new(CountingSink::default());
    let reports = ReportService::new(
        vision.clone(),
        sink.clone(),
        Duration::from_secs(2),
        Duration::from_secs(2),
    );

    let state = Arc::new(AppState {
        config: Arc::new(config),
        reports: Arc::new(reports),
    });

    Harness {
        app: build_router(state),
        vision,
        sink,
    }
}

fn jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(24, 24, image::Rgb([90u8, 90, 200]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageOutputFormat::Jpeg(85))
        .unwrap();
    buf.into_inner()
}

enum Part<'a> {
    File(&'a str, Vec<u8>),
    Text(&'a str, &'a str),
}

fn analyze_request(parts: Vec<Part>) -> Request<Body> {
    let mut body = Vec::new();
    for (i, part) in parts.into_iter().enumerate() {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File(name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"car{}.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
                        name, i
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&data);
            }
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn response_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "JSON parse error: {}. Body: {:?}",
            e,
            String::from_utf8_lossy(&bytes)
        )
    })
}

const BUMPER_REPLY: &str = r#"{
  "is_car": true,
  "notes": "Front bumper impact",
  "overall_estimated_repair_cost": 5,
  "parts": [
    {
      "part_id": "front_bumper",
      "part_name": "Front Bumper",
      "damage_description": "Cracked and scraped on the right side.",
      "severity": 4,
      "estimated_material_cost": 600,
      "estimated_paint_cost": 300,
      "estimated_structural_cost": 0
    }
  ]
}"#;

#[tokio::test]
async fn test_health_endpoint() {
    let h = harness(BUMPER_REPLY);
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = h.app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_analyze_single_image() {
    let h = harness(BUMPER_REPLY);
    let response = h
        .app
        .oneshot(analyze_request(vec![Part::File("file", jpeg())]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert!(body["report_id"].as_str().unwrap().len() >= 32);
    assert!(body["sheet_url"].as_str().unwrap().contains("#gid="));
    assert_eq!(body["damage_report"]["is_car"], true);
    assert_eq!(body["damage_report"]["overall_estimated_repair_cost"], 900.0);
    assert_eq!(
        body["damage_report"]["parts"][0]["estimated_total_part_cost"],
        900.0
    );
    assert_eq!(h.sink.rows.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_analyze_multiple_images_with_hint() {
    let fenced = format!("```json\n{}\n```", BUMPER_REPLY);
    let h = harness(&fenced);
    let response = h
        .app
        .oneshot(analyze_request(vec![
            Part::File("files", jpeg()),
            Part::File("files", jpeg()),
            Part::Text("vehicle_hint", "2016 Toyota Camry"),
        ]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.vision.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_analyze_without_files() {
    let h = harness(BUMPER_REPLY);
    let response = h
        .app
        .oneshot(analyze_request(vec![Part::Text("vehicle_hint", "sedan")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["error"], "empty_input");
    assert_eq!(h.vision.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_analyze_rejects_non_image() {
    let h = harness(BUMPER_REPLY);
    let response = h
        .app
        .oneshot(analyze_request(vec![Part::File(
            "file",
            b"%PDF-1.4 not an image".to_vec(),
        )]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["error"], "invalid_image");
}

#[tokio::test]
async fn test_analyze_not_a_car() {
    let h = harness(r#"{"is_car": false, "notes": "This is a houseplant.", "parts": []}"#);
    let response = h
        .app
        .oneshot(analyze_request(vec![Part::File("file", jpeg())]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["error"], "not_a_car");
    assert_eq!(body["detail"], "This is a houseplant.");
    assert_eq!(h.sink.rows.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_analyze_unparseable_model_output() {
    let h = harness("Sorry, I cannot help with that request.");
    let response = h
        .app
        .oneshot(analyze_request(vec![Part::File("file", jpeg())]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response_json(response).await;
    assert_eq!(body["error"], "unrecoverable_format");
}
